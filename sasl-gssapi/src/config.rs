use crate::{
    context::{ClientCtx, CtxFlags, Step},
    credential::Cred,
    error::Error,
    oid::NameType,
    provider::{CredUsage, Provider},
};
use serde::Deserialize;
use std::fmt;

/// Configuration for the client side of the GSSAPI mechanism.
#[derive(Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// the authorization identity to request, if different from the
    /// authenticated one
    pub authz: Option<String>,
    /// the principal to authenticate as. If not set the principal of
    /// the default credential (e.g. the TGT in the ticket cache) is
    /// used.
    pub username: Option<String>,
    /// the password of `username`. If not set there must already be a
    /// ticket for `username` in the credential store.
    pub password: Option<String>,
    /// the service name of the target, e.g. `ldap`
    pub service_name: String,
    /// the fully qualified host name of the target
    pub service_fqdn: String,
    /// ask for our credentials to be delegated to the service
    pub delegate: bool,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("authz", &self.authz)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("service_name", &self.service_name)
            .field("service_fqdn", &self.service_fqdn)
            .field("delegate", &self.delegate)
            .finish()
    }
}

impl ClientConfig {
    pub fn new(service_name: &str, service_fqdn: &str) -> Self {
        ClientConfig {
            service_name: service_name.to_owned(),
            service_fqdn: service_fqdn.to_owned(),
            ..ClientConfig::default()
        }
    }

    /// The host based service name of the target, `service@host`.
    pub fn target(&self) -> String {
        format!("{}@{}", self.service_name, self.service_fqdn)
    }

    /// Mutual authentication and sequencing are always requested.
    pub fn flags(&self) -> CtxFlags {
        let mut flags = CtxFlags::GSS_C_MUTUAL_FLAG | CtxFlags::GSS_C_SEQUENCE_FLAG;
        if self.delegate {
            flags |= CtxFlags::GSS_C_DELEG_FLAG;
        }
        flags
    }

    /// Acquire the initiator credential this configuration describes.
    /// Empty strings count as not set.
    pub fn acquire_credential<'a, P: Provider>(&self, provider: &'a P) -> Result<Cred<'a, P>, Error> {
        let username = self.username.as_deref().filter(|s| !s.is_empty());
        let password = self.password.as_deref().filter(|s| !s.is_empty());
        Cred::acquire(provider, username, password, NameType::User, CredUsage::Initiate)
    }

    /// Run one negotiation step for the configured target.
    pub fn step<P: Provider>(
        &self,
        cred: &Cred<'_, P>,
        ctx: &mut ClientCtx<'_, P>,
        input: Option<&[u8]>,
    ) -> Result<Step, Error> {
        ctx.step(cred, &self.target(), self.flags(), input)
    }

    /// The identity to present: the user name the credential was
    /// acquired for if there is one, otherwise the credential's own
    /// name.
    pub fn principal<P: Provider>(&self, cred: &Cred<'_, P>) -> Result<String, Error> {
        match cred.principal() {
            Some(p) => Ok(p.to_owned()),
            None => cred.display_name(),
        }
    }

    /// The authorization identity to request. When `authz` is not set
    /// (or empty) it is the authenticated identity, see `principal`.
    pub fn authz_identity<P: Provider>(&self, cred: &Cred<'_, P>) -> Result<String, Error> {
        match self.authz.as_deref().filter(|s| !s.is_empty()) {
            Some(authz) => Ok(authz.to_owned()),
            None => self.principal(cred),
        }
    }
}
