use crate::{
    error::{Error, MajorFlags, NameStage, StatusCode},
    oid::{NameType, Oid, GSS_MECH_KRB5},
    provider::Provider,
};
use std::fmt;
use tracing::{debug, instrument, warn};

/// A name owned by us, released through the provider when dropped.
pub struct Name<'a, P: Provider> {
    provider: &'a P,
    raw: Option<P::Name>,
}

impl<'a, P: Provider> Drop for Name<'a, P> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            if let Err(status) = self.provider.release_name(raw) {
                warn!(%status, "failed to release name");
            }
        }
    }
}

impl<'a, P: Provider> fmt::Debug for Name<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        match self.display() {
            Ok(s) => write!(f, "{}", s),
            Err(_) => write!(f, "<name can't be displayed>"),
        }
    }
}

impl<'a, P: Provider> fmt::Display for Name<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        fmt::Debug::fmt(self, f)
    }
}

impl<'a, P: Provider> Name<'a, P> {
    pub(crate) fn from_raw(provider: &'a P, raw: P::Name) -> Self {
        Name { provider, raw: Some(raw) }
    }

    /// only `release` and `drop` take the handle, so this never fails
    /// for a name anyone can still reach
    pub(crate) fn raw(&self) -> Result<&P::Name, StatusCode> {
        self.raw.as_ref().ok_or(StatusCode::major(MajorFlags::GSS_S_BAD_NAME))
    }

    /// parse `s` as a name of type `kind`. The result is not
    /// canonical, see `canonical`.
    pub fn import(provider: &'a P, s: &str, kind: &Oid) -> Result<Self, Error> {
        provider
            .import_name(s.as_bytes(), kind)
            .map(|raw| Name::from_raw(provider, raw))
            .map_err(|status| Error::NameResolution { stage: NameStage::Import, status })
    }

    /// canonicalize this name for `mech`. This makes a new name, self
    /// is unchanged.
    pub fn canonicalize(&self, mech: &Oid) -> Result<Self, Error> {
        self.raw()
            .and_then(|raw| self.provider.canonicalize_name(raw, mech))
            .map(|raw| Name::from_raw(self.provider, raw))
            .map_err(|status| Error::NameResolution {
                stage: NameStage::Canonicalize,
                status,
            })
    }

    /// Import `s` as `kind` and canonicalize it for kerberos 5. The
    /// intermediate imported name is always released.
    #[instrument(level = "debug", skip(provider))]
    pub fn canonical(provider: &'a P, s: &str, kind: NameType) -> Result<Self, Error> {
        let imported = Name::import(provider, s, kind.oid())?;
        let name = imported.canonicalize(&GSS_MECH_KRB5)?;
        debug!("canonicalized name");
        Ok(name)
    }

    pub fn display(&self) -> Result<String, Error> {
        let buf = self
            .raw()
            .and_then(|raw| self.provider.display_name(raw))
            .map_err(|status| Error::NameResolution { stage: NameStage::Display, status })?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }

    /// Release the name now, reporting any failure instead of logging
    /// it.
    pub fn release(mut self) -> Result<(), Error> {
        match self.raw.take() {
            None => Ok(()),
            Some(raw) => self
                .provider
                .release_name(raw)
                .map_err(|status| Error::Release { what: "name", status }),
        }
    }
}

/// Import `text` as `kind` and canonicalize it against kerberos 5.
pub fn canonicalize_principal<'a, P: Provider>(
    provider: &'a P,
    text: &str,
    kind: NameType,
) -> Result<Name<'a, P>, Error> {
    Name::canonical(provider, text, kind)
}
