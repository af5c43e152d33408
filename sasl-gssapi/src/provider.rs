//! The operations this crate needs from a gssapi implementation.
//!
//! Handles handed out by a `Provider` are owned by the caller, and
//! must be given back through the matching release call exactly once.
//! The wrappers in `name`, `credential` and `context` take care of
//! that, so code outside this crate should rarely call these methods
//! directly.
use crate::{context::CtxFlags, error::StatusCode, oid::Oid};
use std::{ops::Deref, time::Duration};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CredUsage {
    Accept,
    Initiate,
    Both,
}

/// Which table `display_status` should look a code up in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusClass {
    /// a major status
    Gss,
    /// a mechanism specific minor status
    Mech,
}

/// The result of one call to `init_context`. `status` may carry
/// `GSS_S_CONTINUE_NEEDED`, which is not an error. `token`, if any,
/// must be sent to the peer whatever the status.
#[derive(Debug)]
pub struct InitOutput<B> {
    pub status: StatusCode,
    pub token: Option<B>,
}

pub trait Provider {
    type Name;
    type Cred;
    type Context;
    /// A buffer allocated by the provider, released when dropped.
    type Buffer: Deref<Target = [u8]>;

    fn import_name(&self, text: &[u8], kind: &Oid) -> Result<Self::Name, StatusCode>;

    fn canonicalize_name(
        &self,
        name: &Self::Name,
        mech: &Oid,
    ) -> Result<Self::Name, StatusCode>;

    fn display_name(&self, name: &Self::Name) -> Result<Self::Buffer, StatusCode>;

    fn release_name(&self, name: Self::Name) -> Result<(), StatusCode>;

    /// Acquire a credential for `name` (or the default name) from the
    /// credential store, e.g. a ticket cache or keytab. `lifetime` of
    /// `None` is indefinite. The default mechanism set is used.
    fn acquire_cred(
        &self,
        name: Option<&Self::Name>,
        lifetime: Option<Duration>,
        usage: CredUsage,
    ) -> Result<Self::Cred, StatusCode>;

    fn acquire_cred_with_password(
        &self,
        name: &Self::Name,
        password: &[u8],
        lifetime: Option<Duration>,
        usage: CredUsage,
    ) -> Result<Self::Cred, StatusCode>;

    fn release_cred(&self, cred: Self::Cred) -> Result<(), StatusCode>;

    /// The name bound to `cred`, or to the default credential if
    /// `cred` is `None`.
    fn inquire_cred_name(&self, cred: Option<&Self::Cred>) -> Result<Self::Name, StatusCode>;

    /// One step of context establishment. `ctx` is `None` on the first
    /// call, and the provider may fill it in (or replace it) even when
    /// the call fails.
    #[allow(clippy::too_many_arguments)]
    fn init_context(
        &self,
        cred: Option<&Self::Cred>,
        ctx: &mut Option<Self::Context>,
        target: &Self::Name,
        mech: Option<&Oid>,
        flags: CtxFlags,
        lifetime: Option<Duration>,
        input: Option<&[u8]>,
    ) -> InitOutput<Self::Buffer>;

    fn delete_context(&self, ctx: Self::Context) -> Result<(), StatusCode>;

    fn wrap(
        &self,
        ctx: &Self::Context,
        encrypt: bool,
        msg: &[u8],
    ) -> Result<Self::Buffer, StatusCode>;

    fn unwrap(&self, ctx: &Self::Context, msg: &[u8]) -> Result<Self::Buffer, StatusCode>;

    /// Render one segment of `code`. `message_context` starts at 0 and
    /// is updated by the provider; when it comes back as 0 there are
    /// no more segments.
    fn display_status(
        &self,
        code: u32,
        class: StatusClass,
        message_context: &mut u32,
    ) -> Result<Self::Buffer, StatusCode>;
}
