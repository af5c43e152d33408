use crate::{
    error::{Error, NameStage},
    name::Name,
    oid::NameType,
    provider::{CredUsage, Provider},
};
use std::fmt;
use tracing::{debug, instrument, warn};

/// gssapi credentials. A `Cred` either owns a credential handle, or is
/// the default credential, in which case the provider picks one (e.g.
/// from the ticket cache) when a context is initialized.
pub struct Cred<'a, P: Provider> {
    provider: &'a P,
    raw: Option<P::Cred>,
    principal: Option<String>,
    usage: CredUsage,
}

impl<'a, P: Provider> Drop for Cred<'a, P> {
    fn drop(&mut self) {
        if let Some(raw) = self.raw.take() {
            if let Err(status) = self.provider.release_cred(raw) {
                warn!(%status, "failed to release credential");
            }
        }
    }
}

impl<'a, P: Provider> fmt::Debug for Cred<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_struct("Cred")
            .field("default", &self.is_default())
            .field("principal", &self.principal)
            .field("usage", &self.usage)
            .finish()
    }
}

impl<'a, P: Provider> Cred<'a, P> {
    /// The default credential. No provider call is made.
    pub fn default_for(provider: &'a P, usage: CredUsage) -> Self {
        Cred { provider, raw: None, principal: None, usage }
    }

    /// Acquire credentials for `principal`, parsed as `kind`.
    ///
    /// With no principal this is the default credential, and the
    /// password is ignored. With a password the credential is obtained
    /// from the KDC using it, otherwise it must already be in the
    /// credential store. The lifetime is always as long as possible,
    /// and the default mechanism set is used.
    #[instrument(level = "debug", skip(provider, password), fields(with_password = password.is_some()))]
    pub fn acquire(
        provider: &'a P,
        principal: Option<&str>,
        password: Option<&str>,
        kind: NameType,
        usage: CredUsage,
    ) -> Result<Self, Error> {
        let principal = match principal {
            None => {
                debug!("using the default credential");
                return Ok(Cred::default_for(provider, usage));
            }
            Some(p) => p,
        };
        let name = Name::canonical(provider, principal, kind)?;
        let res = name.raw().and_then(|raw| match password {
            Some(password) => {
                provider.acquire_cred_with_password(raw, password.as_bytes(), None, usage)
            }
            None => provider.acquire_cred(Some(raw), None, usage),
        });
        drop(name);
        let raw = res.map_err(Error::CredentialAcquisition)?;
        debug!("acquired credential");
        Ok(Cred {
            provider,
            raw: Some(raw),
            principal: Some(principal.to_owned()),
            usage,
        })
    }

    pub fn is_default(&self) -> bool {
        self.raw.is_none()
    }

    pub fn usage(&self) -> CredUsage {
        self.usage
    }

    /// The principal this credential was acquired for, as given by the
    /// caller. `None` for the default credential.
    pub fn principal(&self) -> Option<&str> {
        self.principal.as_deref()
    }

    pub(crate) fn raw(&self) -> Option<&P::Cred> {
        self.raw.as_ref()
    }

    /// The name bound to this credential, as the provider sees it.
    pub fn name(&self) -> Result<Name<'a, P>, Error> {
        self.provider
            .inquire_cred_name(self.raw.as_ref())
            .map(|raw| Name::from_raw(self.provider, raw))
            .map_err(Error::Inquiry)
    }

    /// The display form of the name bound to this credential.
    pub fn display_name(&self) -> Result<String, Error> {
        let name = self.name()?;
        name.display().map_err(|e| match e {
            Error::NameResolution { stage: NameStage::Display, status } => {
                Error::Inquiry(status)
            }
            e => e,
        })
    }

    /// Release the credential now, reporting any failure. Releasing
    /// the default credential does nothing.
    pub fn release(mut self) -> Result<(), Error> {
        match self.raw.take() {
            None => Ok(()),
            Some(raw) => self
                .provider
                .release_cred(raw)
                .map_err(|status| Error::Release { what: "credential", status }),
        }
    }
}

pub fn acquire_credential<'a, P: Provider>(
    provider: &'a P,
    principal: Option<&str>,
    password: Option<&str>,
    kind: NameType,
    usage: CredUsage,
) -> Result<Cred<'a, P>, Error> {
    Cred::acquire(provider, principal, password, kind, usage)
}

pub fn credential_display_name<P: Provider>(cred: &Cred<'_, P>) -> Result<String, Error> {
    cred.display_name()
}
