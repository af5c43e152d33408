//! A `Provider` backed by the system gssapi library (MIT kerberos or
//! Heimdal), through `libgssapi-sys`.
use crate::{
    context::CtxFlags,
    error::StatusCode,
    oid::Oid,
    provider::{CredUsage, InitOutput, Provider, StatusClass},
    util::{Buf, BufRef},
};
use libgssapi_sys::{
    gss_OID, gss_OID_set, gss_acquire_cred, gss_acquire_cred_with_password,
    gss_buffer_desc, gss_canonicalize_name, gss_channel_bindings_struct, gss_cred_id_t,
    gss_cred_usage_t, gss_ctx_id_t, gss_delete_sec_context, gss_display_name,
    gss_display_status, gss_import_name, gss_init_sec_context, gss_inquire_cred,
    gss_name_t, gss_release_cred, gss_release_name, gss_unwrap, gss_wrap, OM_uint32,
    GSS_C_ACCEPT, GSS_C_BOTH, GSS_C_GSS_CODE, GSS_C_INITIATE, GSS_C_MECH_CODE,
    GSS_C_QOP_DEFAULT, GSS_S_COMPLETE, _GSS_C_INDEFINITE,
};
use std::{ptr, time::Duration};
use tracing::warn;

const NO_OID_SET: gss_OID_set = ptr::null_mut();
const NO_OID: gss_OID = ptr::null_mut();

/// The system gssapi library.
#[derive(Clone, Copy, Debug, Default)]
pub struct Gssapi;

pub struct GssName(gss_name_t);
pub struct GssCred(gss_cred_id_t);
pub struct GssCtx(gss_ctx_id_t);

// gssapi handles are not tied to the thread that created them
unsafe impl Send for GssName {}
unsafe impl Sync for GssName {}
unsafe impl Send for GssCred {}
unsafe impl Sync for GssCred {}
unsafe impl Send for GssCtx {}
unsafe impl Sync for GssCtx {}

fn time_req(lifetime: Option<Duration>) -> OM_uint32 {
    lifetime
        .map(|d| d.as_secs().min(u32::MAX as u64) as OM_uint32)
        .unwrap_or(_GSS_C_INDEFINITE)
}

fn usage_to_c(usage: CredUsage) -> gss_cred_usage_t {
    let usage = match usage {
        CredUsage::Both => GSS_C_BOTH,
        CredUsage::Initiate => GSS_C_INITIATE,
        CredUsage::Accept => GSS_C_ACCEPT,
    };
    usage as gss_cred_usage_t
}

fn check(major: OM_uint32, minor: OM_uint32) -> Result<(), StatusCode> {
    let status = StatusCode::new(major, minor);
    if status.is_error() {
        Err(status)
    } else {
        Ok(())
    }
}

impl Provider for Gssapi {
    type Name = GssName;
    type Cred = GssCred;
    type Context = GssCtx;
    type Buffer = Buf;

    fn import_name(&self, text: &[u8], kind: &Oid) -> Result<GssName, StatusCode> {
        let mut buf = BufRef::from(text);
        let mut minor = GSS_S_COMPLETE;
        let mut name: gss_name_t = ptr::null_mut();
        let major = unsafe {
            gss_import_name(
                &mut minor as *mut OM_uint32,
                buf.to_c(),
                kind.to_c(),
                &mut name as *mut gss_name_t,
            )
        };
        check(major, minor).map(|()| GssName(name))
    }

    fn canonicalize_name(&self, name: &GssName, mech: &Oid) -> Result<GssName, StatusCode> {
        let mut minor = GSS_S_COMPLETE;
        let mut out: gss_name_t = ptr::null_mut();
        let major = unsafe {
            gss_canonicalize_name(
                &mut minor as *mut OM_uint32,
                name.0,
                mech.to_c(),
                &mut out as *mut gss_name_t,
            )
        };
        check(major, minor).map(|()| GssName(out))
    }

    fn display_name(&self, name: &GssName) -> Result<Buf, StatusCode> {
        let mut minor = GSS_S_COMPLETE;
        let mut out = Buf::empty();
        let mut oid: gss_OID = ptr::null_mut();
        let major = unsafe {
            gss_display_name(
                &mut minor as *mut OM_uint32,
                name.0,
                out.to_c(),
                &mut oid as *mut gss_OID,
            )
        };
        check(major, minor).map(|()| out)
    }

    fn release_name(&self, mut name: GssName) -> Result<(), StatusCode> {
        if name.0.is_null() {
            return Ok(());
        }
        let mut minor = GSS_S_COMPLETE;
        let major = unsafe {
            gss_release_name(&mut minor as *mut OM_uint32, &mut name.0 as *mut gss_name_t)
        };
        check(major, minor)
    }

    fn acquire_cred(
        &self,
        name: Option<&GssName>,
        lifetime: Option<Duration>,
        usage: CredUsage,
    ) -> Result<GssCred, StatusCode> {
        let mut minor = GSS_S_COMPLETE;
        let mut cred: gss_cred_id_t = ptr::null_mut();
        let major = unsafe {
            gss_acquire_cred(
                &mut minor as *mut OM_uint32,
                name.map_or(ptr::null_mut(), |n| n.0),
                time_req(lifetime),
                NO_OID_SET,
                usage_to_c(usage),
                &mut cred as *mut gss_cred_id_t,
                ptr::null_mut::<gss_OID_set>(),
                ptr::null_mut::<OM_uint32>(),
            )
        };
        check(major, minor).map(|()| GssCred(cred))
    }

    fn acquire_cred_with_password(
        &self,
        name: &GssName,
        password: &[u8],
        lifetime: Option<Duration>,
        usage: CredUsage,
    ) -> Result<GssCred, StatusCode> {
        let mut minor = GSS_S_COMPLETE;
        let mut password = BufRef::from(password);
        let mut cred: gss_cred_id_t = ptr::null_mut();
        let major = unsafe {
            gss_acquire_cred_with_password(
                &mut minor as *mut OM_uint32,
                name.0,
                password.to_c(),
                time_req(lifetime),
                NO_OID_SET,
                usage_to_c(usage),
                &mut cred as *mut gss_cred_id_t,
                ptr::null_mut::<gss_OID_set>(),
                ptr::null_mut::<OM_uint32>(),
            )
        };
        check(major, minor).map(|()| GssCred(cred))
    }

    fn release_cred(&self, mut cred: GssCred) -> Result<(), StatusCode> {
        if cred.0.is_null() {
            return Ok(());
        }
        let mut minor = GSS_S_COMPLETE;
        let major = unsafe {
            gss_release_cred(&mut minor as *mut OM_uint32, &mut cred.0 as *mut gss_cred_id_t)
        };
        check(major, minor)
    }

    fn inquire_cred_name(&self, cred: Option<&GssCred>) -> Result<GssName, StatusCode> {
        let mut minor = GSS_S_COMPLETE;
        let mut name: gss_name_t = ptr::null_mut();
        let major = unsafe {
            gss_inquire_cred(
                &mut minor as *mut OM_uint32,
                cred.map_or(ptr::null_mut(), |c| c.0),
                &mut name as *mut gss_name_t,
                ptr::null_mut::<OM_uint32>(),
                ptr::null_mut::<gss_cred_usage_t>(),
                ptr::null_mut::<gss_OID_set>(),
            )
        };
        match check(major, minor) {
            Ok(()) => Ok(GssName(name)),
            Err(e) => {
                // make sure we free anything that was successfully built
                if let Err(status) = self.release_name(GssName(name)) {
                    warn!(%status, "failed to release name of failed inquiry");
                }
                Err(e)
            }
        }
    }

    fn init_context(
        &self,
        cred: Option<&GssCred>,
        ctx: &mut Option<GssCtx>,
        target: &GssName,
        mech: Option<&Oid>,
        flags: CtxFlags,
        lifetime: Option<Duration>,
        input: Option<&[u8]>,
    ) -> InitOutput<Buf> {
        let mut minor = GSS_S_COMPLETE;
        let mut raw: gss_ctx_id_t = ctx.as_ref().map_or(ptr::null_mut(), |c| c.0);
        let mut input = input.map(BufRef::from);
        let mut out_tok = Buf::empty();
        let major = unsafe {
            gss_init_sec_context(
                &mut minor as *mut OM_uint32,
                cred.map_or(ptr::null_mut(), |c| c.0),
                &mut raw as *mut gss_ctx_id_t,
                target.0,
                mech.map_or(NO_OID, |m| m.to_c()),
                flags.bits(),
                time_req(lifetime),
                ptr::null_mut::<gss_channel_bindings_struct>(),
                match input {
                    None => ptr::null_mut::<gss_buffer_desc>(),
                    Some(ref mut tok) => tok.to_c(),
                },
                ptr::null_mut::<gss_OID>(),
                out_tok.to_c(),
                ptr::null_mut::<OM_uint32>(),
                ptr::null_mut::<OM_uint32>(),
            )
        };
        *ctx = if raw.is_null() { None } else { Some(GssCtx(raw)) };
        InitOutput { status: StatusCode::new(major, minor), token: Some(out_tok) }
    }

    fn delete_context(&self, mut ctx: GssCtx) -> Result<(), StatusCode> {
        if ctx.0.is_null() {
            return Ok(());
        }
        let mut minor = GSS_S_COMPLETE;
        let major = unsafe {
            gss_delete_sec_context(
                &mut minor as *mut OM_uint32,
                &mut ctx.0 as *mut gss_ctx_id_t,
                ptr::null_mut::<gss_buffer_desc>(),
            )
        };
        check(major, minor)
    }

    fn wrap(&self, ctx: &GssCtx, encrypt: bool, msg: &[u8]) -> Result<Buf, StatusCode> {
        let mut minor = GSS_S_COMPLETE;
        let mut msg = BufRef::from(msg);
        let mut enc_msg = Buf::empty();
        let major = unsafe {
            gss_wrap(
                &mut minor as *mut OM_uint32,
                ctx.0,
                if encrypt { 1 } else { 0 },
                GSS_C_QOP_DEFAULT as _,
                msg.to_c(),
                ptr::null_mut(),
                enc_msg.to_c(),
            )
        };
        // on failure enc_msg is dropped, releasing anything gssapi put there
        check(major, minor).map(|()| enc_msg)
    }

    fn unwrap(&self, ctx: &GssCtx, msg: &[u8]) -> Result<Buf, StatusCode> {
        let mut minor = GSS_S_COMPLETE;
        let mut msg = BufRef::from(msg);
        let mut out = Buf::empty();
        let major = unsafe {
            gss_unwrap(
                &mut minor as *mut OM_uint32,
                ctx.0,
                msg.to_c(),
                out.to_c(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        check(major, minor).map(|()| out)
    }

    fn display_status(
        &self,
        code: u32,
        class: StatusClass,
        message_context: &mut u32,
    ) -> Result<Buf, StatusCode> {
        let class = match class {
            StatusClass::Gss => GSS_C_GSS_CODE,
            StatusClass::Mech => GSS_C_MECH_CODE,
        };
        let mut minor = GSS_S_COMPLETE;
        let mut buf = Buf::empty();
        let major = unsafe {
            gss_display_status(
                &mut minor as *mut OM_uint32,
                code,
                class as i32,
                NO_OID,
                message_context as *mut OM_uint32,
                buf.to_c(),
            )
        };
        check(major, minor).map(|()| buf)
    }
}
