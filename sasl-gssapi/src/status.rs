//! Turn a two level status code into the provider's own text.
use crate::{
    error::{Error, StatusCode},
    provider::{Provider, StatusClass},
};
use std::iter::FusedIterator;
use tracing::trace;

/// The segments describing one status code, pulled lazily from the
/// provider. If the mechanism code is non zero it is the one
/// described, otherwise the major code is.
pub struct StatusMessages<'a, P: Provider> {
    provider: &'a P,
    code: u32,
    class: StatusClass,
    message_context: u32,
    done: bool,
}

impl<'a, P: Provider> StatusMessages<'a, P> {
    pub fn new(provider: &'a P, status: StatusCode) -> Self {
        let (code, class) = if status.minor != 0 {
            (status.minor, StatusClass::Mech)
        } else {
            (status.major.bits(), StatusClass::Gss)
        };
        StatusMessages { provider, code, class, message_context: 0, done: false }
    }
}

impl<'a, P: Provider> Iterator for StatusMessages<'a, P> {
    type Item = Result<String, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let res =
            self.provider.display_status(self.code, self.class, &mut self.message_context);
        match res {
            Err(e) => {
                self.done = true;
                Some(Err(Error::Description(e)))
            }
            Ok(buf) => {
                trace!(class = ?self.class, more = self.message_context, "status segment");
                if self.message_context == 0 {
                    self.done = true;
                }
                Some(Ok(String::from_utf8_lossy(&buf).into_owned()))
            }
        }
    }
}

impl<'a, P: Provider> FusedIterator for StatusMessages<'a, P> {}

impl StatusCode {
    pub fn messages<'a, P: Provider>(&self, provider: &'a P) -> StatusMessages<'a, P> {
        StatusMessages::new(provider, *self)
    }
}

/// Every segment describing `status`, in order.
pub fn describe<P: Provider>(provider: &P, status: StatusCode) -> Result<Vec<String>, Error> {
    status.messages(provider).collect()
}

/// The provider's full description of (`major`, `minor`), suitable for
/// logging verbatim.
pub fn describe_status<P: Provider>(provider: &P, major: u32, minor: u32) -> Result<String, Error> {
    status_text(provider, StatusCode::new(major, minor))
}

pub(crate) fn status_text<P: Provider>(provider: &P, status: StatusCode) -> Result<String, Error> {
    let mut text = String::new();
    for segment in status.messages(provider) {
        text.push_str(&segment?);
    }
    Ok(text)
}

impl Error {
    /// The provider's description of the status attached to this
    /// error.
    pub fn describe<P: Provider>(&self, provider: &P) -> Result<String, Error> {
        status_text(provider, self.status())
    }
}
