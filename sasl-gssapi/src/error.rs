use bytes::Bytes;
use std::fmt;
use thiserror::Error;

pub(crate) const CALLING_ERROR_OFFSET: u32 = 24;
pub(crate) const ROUTINE_ERROR_OFFSET: u32 = 16;
pub(crate) const CALLING_ERROR_MASK: u32 = 0o377;
pub(crate) const ROUTINE_ERROR_MASK: u32 = 0o377;

bitflags! {
    /// The major status word returned by every gssapi routine. Calling
    /// errors live in bits 24-31, routine errors in bits 16-23 and
    /// supplementary information in the low 16 bits.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct MajorFlags: u32 {
        const GSS_S_CALL_INACCESSIBLE_READ = 1 << CALLING_ERROR_OFFSET;
        const GSS_S_CALL_INACCESSIBLE_WRITE = 2 << CALLING_ERROR_OFFSET;
        const GSS_S_CALL_BAD_STRUCTURE = 3 << CALLING_ERROR_OFFSET;
        const GSS_S_BAD_MECH = 1 << ROUTINE_ERROR_OFFSET;
        const GSS_S_BAD_NAME = 2 << ROUTINE_ERROR_OFFSET;
        const GSS_S_BAD_NAMETYPE = 3 << ROUTINE_ERROR_OFFSET;
        const GSS_S_BAD_BINDINGS = 4 << ROUTINE_ERROR_OFFSET;
        const GSS_S_BAD_STATUS = 5 << ROUTINE_ERROR_OFFSET;
        const GSS_S_BAD_SIG = 6 << ROUTINE_ERROR_OFFSET;
        const GSS_S_BAD_MIC = 6 << ROUTINE_ERROR_OFFSET;
        const GSS_S_NO_CRED = 7 << ROUTINE_ERROR_OFFSET;
        const GSS_S_NO_CONTEXT = 8 << ROUTINE_ERROR_OFFSET;
        const GSS_S_DEFECTIVE_TOKEN = 9 << ROUTINE_ERROR_OFFSET;
        const GSS_S_DEFECTIVE_CREDENTIAL = 10 << ROUTINE_ERROR_OFFSET;
        const GSS_S_CREDENTIALS_EXPIRED = 11 << ROUTINE_ERROR_OFFSET;
        const GSS_S_CONTEXT_EXPIRED = 12 << ROUTINE_ERROR_OFFSET;
        const GSS_S_FAILURE = 13 << ROUTINE_ERROR_OFFSET;
        const GSS_S_BAD_QOP = 14 << ROUTINE_ERROR_OFFSET;
        const GSS_S_UNAUTHORIZED = 15 << ROUTINE_ERROR_OFFSET;
        const GSS_S_UNAVAILABLE = 16 << ROUTINE_ERROR_OFFSET;
        const GSS_S_DUPLICATE_ELEMENT = 17 << ROUTINE_ERROR_OFFSET;
        const GSS_S_NAME_NOT_MN = 18 << ROUTINE_ERROR_OFFSET;
        const GSS_S_BAD_MECH_ATTR = 19 << ROUTINE_ERROR_OFFSET;
        const GSS_S_CONTINUE_NEEDED = 1 << 0;
        const GSS_S_DUPLICATE_TOKEN = 1 << 1;
        const GSS_S_OLD_TOKEN = 1 << 2;
        const GSS_S_UNSEQ_TOKEN = 1 << 3;
        const GSS_S_GAP_TOKEN = 1 << 4;
    }
}

impl MajorFlags {
    pub const GSS_S_COMPLETE: MajorFlags = MajorFlags::empty();

    /// The calling and routine error fields, zero when the call did
    /// not fail. This is the `GSS_ERROR` macro.
    pub fn error_bits(&self) -> u32 {
        gss_error(self.bits())
    }

    fn routine_name(&self) -> Option<&'static str> {
        let routine = (self.bits() >> ROUTINE_ERROR_OFFSET) & ROUTINE_ERROR_MASK;
        let name = match routine {
            0 => return None,
            1 => "bad mechanism",
            2 => "bad name",
            3 => "bad name type",
            4 => "bad channel bindings",
            5 => "bad status",
            6 => "bad signature",
            7 => "no credential",
            8 => "no context",
            9 => "defective token",
            10 => "defective credential",
            11 => "credentials expired",
            12 => "context expired",
            13 => "failure",
            14 => "bad qop",
            15 => "unauthorized",
            16 => "unavailable",
            17 => "duplicate element",
            18 => "name not a mechanism name",
            19 => "bad mechanism attribute",
            _ => return None,
        };
        Some(name)
    }
}

pub(crate) fn gss_error(x: u32) -> u32 {
    x & ((CALLING_ERROR_MASK << CALLING_ERROR_OFFSET)
        | (ROUTINE_ERROR_MASK << ROUTINE_ERROR_OFFSET))
}

/// A two level gssapi status. `minor` is mechanism specific and only
/// carries information when it is non zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StatusCode {
    pub major: MajorFlags,
    pub minor: u32,
}

impl StatusCode {
    pub fn new(major: u32, minor: u32) -> StatusCode {
        StatusCode { major: MajorFlags::from_bits_retain(major), minor }
    }

    pub(crate) fn major(major: MajorFlags) -> StatusCode {
        StatusCode { major, minor: 0 }
    }

    pub fn is_error(&self) -> bool {
        self.major.error_bits() > 0
    }

    pub fn continue_needed(&self) -> bool {
        self.major.contains(MajorFlags::GSS_S_CONTINUE_NEEDED)
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "major {:#010x}", self.major.bits())?;
        if let Some(name) = self.major.routine_name() {
            write!(f, " ({})", name)?;
        }
        write!(f, ", minor {}", self.minor)
    }
}

/// Which step of name resolution failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameStage {
    Import,
    Canonicalize,
    Display,
}

impl fmt::Display for NameStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameStage::Import => write!(f, "import"),
            NameStage::Canonicalize => write!(f, "canonicalize"),
            NameStage::Display => write!(f, "display"),
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("unable to {stage} name: {status}")]
    NameResolution { stage: NameStage, status: StatusCode },
    #[error("unable to acquire credential: {0}")]
    CredentialAcquisition(StatusCode),
    #[error("unable to get credential name: {0}")]
    Inquiry(StatusCode),
    /// The provider failed a negotiation step. `token`, if present, is
    /// a final error token that should still be sent to the peer.
    #[error("unable to initialize security context: {status}")]
    Negotiation { status: StatusCode, token: Option<Bytes> },
    #[error("unable to wrap message: {0}")]
    Wrap(StatusCode),
    #[error("unable to unwrap message: {0}")]
    Unwrap(StatusCode),
    /// Rendering a status code failed. The attached status is that of
    /// the failed display call, not the one being described.
    #[error("unable to describe status: {0}")]
    Description(StatusCode),
    #[error("unable to release {what}: {status}")]
    Release { what: &'static str, status: StatusCode },
}

impl Error {
    pub fn status(&self) -> StatusCode {
        match self {
            Error::NameResolution { status, .. }
            | Error::Negotiation { status, .. }
            | Error::Release { status, .. } => *status,
            Error::CredentialAcquisition(s)
            | Error::Inquiry(s)
            | Error::Wrap(s)
            | Error::Unwrap(s)
            | Error::Description(s) => *s,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supplementary_bits_are_not_errors() {
        let s = StatusCode::new(MajorFlags::GSS_S_CONTINUE_NEEDED.bits(), 0);
        assert!(!s.is_error());
        assert!(s.continue_needed());
        let s = StatusCode::new(
            (MajorFlags::GSS_S_OLD_TOKEN | MajorFlags::GSS_S_DUPLICATE_TOKEN).bits(),
            0,
        );
        assert!(!s.is_error());
    }

    #[test]
    fn routine_and_calling_errors() {
        assert!(StatusCode::major(MajorFlags::GSS_S_FAILURE).is_error());
        assert!(StatusCode::major(MajorFlags::GSS_S_CALL_BAD_STRUCTURE).is_error());
        let both = MajorFlags::GSS_S_NO_CONTEXT | MajorFlags::GSS_S_CONTINUE_NEEDED;
        assert_eq!(both.error_bits(), MajorFlags::GSS_S_NO_CONTEXT.bits());
        assert!(!StatusCode::major(MajorFlags::GSS_S_COMPLETE).is_error());
    }

    #[test]
    fn display_names_routine_error() {
        let s = StatusCode { major: MajorFlags::GSS_S_NO_CRED, minor: 42 };
        assert_eq!(s.to_string(), "major 0x00070000 (no credential), minor 42");
        let e = Error::Wrap(s);
        assert_eq!(e.status(), s);
        assert!(e.to_string().starts_with("unable to wrap message"));
    }
}
