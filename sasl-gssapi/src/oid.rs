/// Oids are BER encoded and defined in the various RFCs
use std::{
    cmp::{Eq, Ord, Ordering, PartialEq, PartialOrd},
    fmt,
    hash::{Hash, Hasher},
    ops::Deref,
    slice,
};

pub static GSS_NT_USER_NAME: Oid =
    Oid::from_slice(b"\x2a\x86\x48\x86\xf7\x12\x01\x02\x01\x01");

pub static GSS_NT_HOSTBASED_SERVICE: Oid =
    Oid::from_slice(b"\x2a\x86\x48\x86\xf7\x12\x01\x02\x01\x04");

pub static GSS_NT_ANONYMOUS: Oid = Oid::from_slice(b"\x2b\x06\x01\x05\x06\x03");

pub static GSS_NT_EXPORT_NAME: Oid = Oid::from_slice(b"\x2b\x06\x01\x05\x06\x04");

pub static GSS_KRB5_NT_PRINCIPAL_NAME: Oid =
    Oid::from_slice(b"\x2a\x86\x48\x86\xf7\x12\x01\x02\x02\x01");

pub static GSS_MECH_KRB5: Oid = Oid::from_slice(b"\x2a\x86\x48\x86\xf7\x12\x01\x02\x02");

// this mirrors the C struct, but has a proper const pointer AS
// SPECIFIED in the standard.
#[repr(C)]
pub struct Oid {
    length: u32,
    elements: *const u8,
}

unsafe impl Sync for Oid {}
unsafe impl Send for Oid {}

impl Deref for Oid {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        unsafe { slice::from_raw_parts(self.elements, self.length as usize) }
    }
}

impl PartialEq for Oid {
    fn eq(&self, other: &Oid) -> bool {
        **self == **other
    }
}

impl Eq for Oid {}

impl PartialOrd for Oid {
    fn partial_cmp(&self, other: &Oid) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Oid {
    fn cmp(&self, other: &Oid) -> Ordering {
        (**self).cmp(&**other)
    }
}

impl Hash for Oid {
    fn hash<H>(&self, state: &mut H)
    where
        H: Hasher,
    {
        (**self).hash(state)
    }
}

impl fmt::Debug for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known = [
            (&GSS_NT_USER_NAME, "GSS_NT_USER_NAME"),
            (&GSS_NT_HOSTBASED_SERVICE, "GSS_NT_HOSTBASED_SERVICE"),
            (&GSS_NT_ANONYMOUS, "GSS_NT_ANONYMOUS"),
            (&GSS_NT_EXPORT_NAME, "GSS_NT_EXPORT_NAME"),
            (&GSS_KRB5_NT_PRINCIPAL_NAME, "GSS_KRB5_NT_PRINCIPAL_NAME"),
            (&GSS_MECH_KRB5, "GSS_MECH_KRB5"),
        ];
        match known.iter().find(|(oid, _)| *oid == self) {
            Some((_, name)) => write!(f, "{}", name),
            None => write!(f, "{:x?}", &**self),
        }
    }
}

impl Oid {
    #[cfg(feature = "krb5")]
    pub(crate) fn to_c(&self) -> libgssapi_sys::gss_OID {
        self as *const Oid as libgssapi_sys::gss_OID
    }

    pub const fn from_slice(ber: &'static [u8]) -> Oid {
        Oid { length: ber.len() as u32, elements: ber.as_ptr() }
    }
}

/// The kinds of names this client knows how to import.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NameType {
    /// A user name, e.g. `alice` or `alice@EXAMPLE.COM`
    User,
    /// `service@host`
    HostBasedService,
    /// A kerberos principal, `primary/instance@REALM`
    KrbPrincipal,
    Anonymous,
    Export,
}

impl NameType {
    pub fn oid(&self) -> &'static Oid {
        match self {
            NameType::User => &GSS_NT_USER_NAME,
            NameType::HostBasedService => &GSS_NT_HOSTBASED_SERVICE,
            NameType::KrbPrincipal => &GSS_KRB5_NT_PRINCIPAL_NAME,
            NameType::Anonymous => &GSS_NT_ANONYMOUS,
            NameType::Export => &GSS_NT_EXPORT_NAME,
        }
    }
}
