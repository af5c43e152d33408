use crate::{
    credential::Cred,
    error::{Error, MajorFlags, NameStage, StatusCode},
    name::Name,
    oid::NameType,
    provider::Provider,
    util::{copy_out, copy_token},
};
use bytes::Bytes;
use std::{fmt, mem};
use tracing::{debug, instrument, warn};

bitflags! {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct CtxFlags: u32 {
        const GSS_C_DELEG_FLAG = 1;
        const GSS_C_MUTUAL_FLAG = 2;
        const GSS_C_REPLAY_FLAG = 4;
        const GSS_C_SEQUENCE_FLAG = 8;
        const GSS_C_CONF_FLAG = 16;
        const GSS_C_INTEG_FLAG = 32;
        const GSS_C_ANON_FLAG = 64;
        const GSS_C_PROT_READY_FLAG = 128;
        const GSS_C_TRANS_FLAG = 256;
        const GSS_C_DELEG_POLICY_FLAG = 32768;
    }
}

/// Where a client context is in its life.
///
/// `Empty` -> `Negotiating` (any number of round trips) -> `Established`
/// or `Failed`. `delete` takes any state back to `Empty`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CtxState {
    Empty,
    Negotiating,
    Established,
    Failed,
}

/// The verdict of one successful negotiation step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Step {
    /// Send the token to the peer, and feed its reply to the next
    /// call to `step`.
    Continue(Bytes),
    /// The context is established. If there is a token it must still
    /// be sent to the peer.
    Complete(Option<Bytes>),
}

enum ClientCtxInner<C> {
    Empty,
    Partial(C),
    Complete(C),
    Failed(StatusCode),
}

/// The initiator side of a security context.
pub struct ClientCtx<'a, P: Provider> {
    provider: &'a P,
    inner: ClientCtxInner<P::Context>,
}

impl<'a, P: Provider> Drop for ClientCtx<'a, P> {
    fn drop(&mut self) {
        if let Err(e) = self.delete() {
            warn!(status = %e.status(), "failed to delete security context");
        }
    }
}

impl<'a, P: Provider> fmt::Debug for ClientCtx<'a, P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> Result<(), fmt::Error> {
        f.debug_struct("ClientCtx").field("state", &self.state()).finish()
    }
}

impl<'a, P: Provider> ClientCtx<'a, P> {
    pub fn new(provider: &'a P) -> Self {
        ClientCtx { provider, inner: ClientCtxInner::Empty }
    }

    pub fn state(&self) -> CtxState {
        match self.inner {
            ClientCtxInner::Empty => CtxState::Empty,
            ClientCtxInner::Partial(_) => CtxState::Negotiating,
            ClientCtxInner::Complete(_) => CtxState::Established,
            ClientCtxInner::Failed(_) => CtxState::Failed,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == CtxState::Established
    }

    /// Perform one step of context initialization against the service
    /// `target` (`service@host`). `input` is the token received from
    /// the peer, and must be `None` on the first call.
    ///
    /// The target is resolved on every call, and released before this
    /// returns. If the provider fails, any partial context is deleted
    /// right away, the context becomes `Failed`, and a final error
    /// token (if the mechanism produced one) is returned inside the
    /// error. If `target` can't be resolved the state doesn't change.
    #[instrument(level = "debug", skip(self, cred, input), fields(state = ?self.state()))]
    pub fn step(
        &mut self,
        cred: &Cred<'_, P>,
        target: &str,
        flags: CtxFlags,
        input: Option<&[u8]>,
    ) -> Result<Step, Error> {
        match self.inner {
            ClientCtxInner::Complete(_) => return Ok(Step::Complete(None)),
            ClientCtxInner::Failed(status) => {
                return Err(Error::Negotiation { status, token: None })
            }
            ClientCtxInner::Empty | ClientCtxInner::Partial(_) => (),
        }
        let target = Name::canonical(self.provider, target, NameType::HostBasedService)?;
        let target_raw = target
            .raw()
            .map_err(|status| Error::NameResolution { stage: NameStage::Canonicalize, status })?;
        let mut ctx = match mem::replace(&mut self.inner, ClientCtxInner::Empty) {
            ClientCtxInner::Partial(ctx) => Some(ctx),
            _ => None,
        };
        let out = self.provider.init_context(
            cred.raw(),
            &mut ctx,
            target_raw,
            None,
            flags,
            None,
            input,
        );
        drop(target);
        let token = copy_token(out.token);
        let ctx = match ctx {
            Some(ctx) if !out.status.is_error() => ctx,
            ctx => {
                let status = if out.status.is_error() {
                    out.status
                } else {
                    StatusCode::major(MajorFlags::GSS_S_NO_CONTEXT)
                };
                if let Some(ctx) = ctx {
                    if let Err(status) = self.provider.delete_context(ctx) {
                        warn!(%status, "failed to delete partial security context");
                    }
                }
                debug!(%status, "negotiation failed");
                self.inner = ClientCtxInner::Failed(status);
                return Err(Error::Negotiation { status, token });
            }
        };
        if out.status.continue_needed() {
            let token = token.unwrap_or_default();
            debug!(token_len = token.len(), "negotiation continues");
            self.inner = ClientCtxInner::Partial(ctx);
            Ok(Step::Continue(token))
        } else {
            debug!(token_len = token.as_ref().map_or(0, |t| t.len()), "negotiation complete");
            self.inner = ClientCtxInner::Complete(ctx);
            Ok(Step::Complete(token))
        }
    }

    /// Delete the context and go back to `Empty`. Deleting an `Empty`
    /// or `Failed` context does nothing.
    pub fn delete(&mut self) -> Result<(), Error> {
        match mem::replace(&mut self.inner, ClientCtxInner::Empty) {
            ClientCtxInner::Empty | ClientCtxInner::Failed(_) => Ok(()),
            ClientCtxInner::Partial(ctx) | ClientCtxInner::Complete(ctx) => {
                debug!("deleting security context");
                self.provider
                    .delete_context(ctx)
                    .map_err(|status| Error::Release { what: "security context", status })
            }
        }
    }

    fn raw(&self) -> Result<&P::Context, StatusCode> {
        match &self.inner {
            ClientCtxInner::Partial(ctx) | ClientCtxInner::Complete(ctx) => Ok(ctx),
            ClientCtxInner::Empty | ClientCtxInner::Failed(_) => {
                Err(StatusCode::major(MajorFlags::GSS_S_NO_CONTEXT))
            }
        }
    }

    /// Wrap `msg` with the default quality of protection, using
    /// whatever protection was negotiated. The context should be
    /// established, otherwise what happens is up to the provider.
    pub fn wrap(&self, msg: &[u8]) -> Result<Bytes, Error> {
        self.wrap_with(false, msg)
    }

    /// Wrap `msg`, requesting confidentiality if `encrypt` is true.
    pub fn wrap_with(&self, encrypt: bool, msg: &[u8]) -> Result<Bytes, Error> {
        let ctx = self.raw().map_err(Error::Wrap)?;
        self.provider.wrap(ctx, encrypt, msg).map(copy_out).map_err(Error::Wrap)
    }

    /// Verify and, if it was encrypted, decrypt a message wrapped by
    /// the peer.
    pub fn unwrap(&self, msg: &[u8]) -> Result<Bytes, Error> {
        let ctx = self.raw().map_err(Error::Unwrap)?;
        self.provider.unwrap(ctx, msg).map(copy_out).map_err(Error::Unwrap)
    }
}

pub fn negotiate<P: Provider>(
    cred: &Cred<'_, P>,
    ctx: &mut ClientCtx<'_, P>,
    target: &str,
    flags: CtxFlags,
    input: Option<&[u8]>,
) -> Result<Step, Error> {
    ctx.step(cred, target, flags, input)
}

pub fn delete_context<P: Provider>(ctx: &mut ClientCtx<'_, P>) -> Result<(), Error> {
    ctx.delete()
}

pub fn wrap_message<P: Provider>(ctx: &ClientCtx<'_, P>, payload: &[u8]) -> Result<Bytes, Error> {
    ctx.wrap(payload)
}
