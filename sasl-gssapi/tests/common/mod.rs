#![allow(dead_code)]
//! A scripted, recording stand in for a gssapi library.
use parking_lot::Mutex;
use sasl_gssapi::{
    oid::{Oid, GSS_MECH_KRB5, GSS_NT_HOSTBASED_SERVICE},
    CredUsage, CtxFlags, InitOutput, MajorFlags, Provider, StatusClass, StatusCode,
};
use std::{
    collections::{HashSet, VecDeque},
    ops::Deref,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

pub const REALM: &str = "EXAMPLE.COM";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Call {
    ImportName { text: String, kind: String },
    CanonicalizeName { name: u64 },
    DisplayName { name: u64 },
    ReleaseName { name: u64 },
    AcquireCred { name: Option<String>, lifetime: Option<Duration>, usage: CredUsage },
    AcquireCredWithPassword { name: String, password: String, usage: CredUsage },
    ReleaseCred { cred: u64 },
    InquireCredName { cred: Option<u64> },
    InitContext {
        cred: Option<u64>,
        ctx: Option<u64>,
        target: String,
        flags: CtxFlags,
        input: Option<Vec<u8>>,
    },
    DeleteContext { ctx: u64 },
    Wrap { ctx: u64, encrypt: bool, len: usize },
    Unwrap { ctx: u64, len: usize },
    DisplayStatus { code: u32, class: StatusClass },
}

pub struct FakeName {
    id: u64,
    text: String,
}

pub struct FakeCred {
    id: u64,
    principal: String,
}

pub struct FakeCtx {
    id: u64,
}

/// A provider allocated buffer. The number of live ones is tracked so
/// tests can check that none leak.
pub struct FakeBuf {
    data: Vec<u8>,
    live: Arc<AtomicUsize>,
}

impl Deref for FakeBuf {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for FakeBuf {
    fn drop(&mut self) {
        self.live.fetch_sub(1, Ordering::SeqCst);
    }
}

/// One scripted answer from `init_context`.
pub struct Reply {
    pub major: MajorFlags,
    pub minor: u32,
    pub token: Vec<u8>,
}

impl Reply {
    pub fn cont(token: &[u8]) -> Reply {
        Reply { major: MajorFlags::GSS_S_CONTINUE_NEEDED, minor: 0, token: token.to_vec() }
    }

    pub fn complete(token: &[u8]) -> Reply {
        Reply { major: MajorFlags::GSS_S_COMPLETE, minor: 0, token: token.to_vec() }
    }

    pub fn fail(major: MajorFlags, minor: u32, token: &[u8]) -> Reply {
        Reply { major, minor, token: token.to_vec() }
    }
}

#[derive(Default)]
pub struct State {
    pub calls: Vec<Call>,
    next_id: u64,
    pub live_names: HashSet<u64>,
    pub live_creds: HashSet<u64>,
    pub live_ctxs: HashSet<u64>,
    pub script: VecDeque<Reply>,
    pub status_segments: Vec<String>,
    pub fail_display_status_at: Option<usize>,
    pub fail_canonicalize: bool,
    pub fail_inquire: bool,
    pub fail_display_name: bool,
    /// `init_context` succeeds without handing out a context
    pub no_ctx: bool,
    pub fail_wrap: bool,
    pub fail_release_cred: bool,
    pub fail_delete_context: bool,
}

impl State {
    fn id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

#[derive(Default)]
pub struct FakeProvider {
    pub state: Mutex<State>,
    live_buffers: Arc<AtomicUsize>,
}

pub fn status(major: MajorFlags, minor: u32) -> StatusCode {
    StatusCode { major, minor }
}

impl FakeProvider {
    pub fn new() -> Self {
        FakeProvider::default()
    }

    pub fn with_script(replies: Vec<Reply>) -> Self {
        let p = FakeProvider::new();
        p.state.lock().script = replies.into();
        p
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state.lock().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn live_names(&self) -> usize {
        self.state.lock().live_names.len()
    }

    pub fn live_creds(&self) -> usize {
        self.state.lock().live_creds.len()
    }

    pub fn live_ctxs(&self) -> usize {
        self.state.lock().live_ctxs.len()
    }

    pub fn live_buffers(&self) -> usize {
        self.live_buffers.load(Ordering::SeqCst)
    }

    fn buf(&self, data: Vec<u8>) -> FakeBuf {
        self.live_buffers.fetch_add(1, Ordering::SeqCst);
        FakeBuf { data, live: Arc::clone(&self.live_buffers) }
    }

    fn name(st: &mut State, text: String) -> FakeName {
        let id = st.id();
        st.live_names.insert(id);
        FakeName { id, text }
    }
}

fn kind_name(kind: &Oid) -> String {
    format!("{:?}", kind)
}

impl Provider for FakeProvider {
    type Name = FakeName;
    type Cred = FakeCred;
    type Context = FakeCtx;
    type Buffer = FakeBuf;

    fn import_name(&self, text: &[u8], kind: &Oid) -> Result<FakeName, StatusCode> {
        let mut st = self.state.lock();
        let text = String::from_utf8_lossy(text).into_owned();
        st.calls.push(Call::ImportName { text: text.clone(), kind: kind_name(kind) });
        if text.is_empty() || text.contains(' ') {
            return Err(status(MajorFlags::GSS_S_BAD_NAME, 0));
        }
        let text = if kind == &GSS_NT_HOSTBASED_SERVICE {
            text.replacen('@', "/", 1)
        } else {
            text
        };
        Ok(FakeProvider::name(&mut st, text))
    }

    fn canonicalize_name(&self, name: &FakeName, mech: &Oid) -> Result<FakeName, StatusCode> {
        let mut st = self.state.lock();
        st.calls.push(Call::CanonicalizeName { name: name.id });
        assert_eq!(mech, &GSS_MECH_KRB5);
        if st.fail_canonicalize || name.text.starts_with("unknown") {
            return Err(status(MajorFlags::GSS_S_BAD_NAME, 0x96c73a8e));
        }
        let text = if name.text.contains('@') {
            name.text.clone()
        } else {
            format!("{}@{}", name.text, REALM)
        };
        Ok(FakeProvider::name(&mut st, text))
    }

    fn display_name(&self, name: &FakeName) -> Result<FakeBuf, StatusCode> {
        let fail = {
            let mut st = self.state.lock();
            st.calls.push(Call::DisplayName { name: name.id });
            st.fail_display_name
        };
        if fail {
            return Err(status(MajorFlags::GSS_S_BAD_NAME, 5));
        }
        Ok(self.buf(name.text.clone().into_bytes()))
    }

    fn release_name(&self, name: FakeName) -> Result<(), StatusCode> {
        let mut st = self.state.lock();
        st.calls.push(Call::ReleaseName { name: name.id });
        assert!(st.live_names.remove(&name.id), "name {} released twice", name.id);
        Ok(())
    }

    fn acquire_cred(
        &self,
        name: Option<&FakeName>,
        lifetime: Option<Duration>,
        usage: CredUsage,
    ) -> Result<FakeCred, StatusCode> {
        let mut st = self.state.lock();
        let principal = name.map(|n| n.text.clone());
        st.calls.push(Call::AcquireCred { name: principal.clone(), lifetime, usage });
        match principal {
            Some(p) if p.starts_with("nocache") => {
                Err(status(MajorFlags::GSS_S_NO_CRED, 0x96c73a0d))
            }
            p => {
                let id = st.id();
                st.live_creds.insert(id);
                let principal = p.unwrap_or_else(|| format!("default@{}", REALM));
                Ok(FakeCred { id, principal })
            }
        }
    }

    fn acquire_cred_with_password(
        &self,
        name: &FakeName,
        password: &[u8],
        _lifetime: Option<Duration>,
        usage: CredUsage,
    ) -> Result<FakeCred, StatusCode> {
        let mut st = self.state.lock();
        let password = String::from_utf8_lossy(password).into_owned();
        st.calls.push(Call::AcquireCredWithPassword {
            name: name.text.clone(),
            password: password.clone(),
            usage,
        });
        if password == "wrong" {
            return Err(status(MajorFlags::GSS_S_FAILURE, 0x96c73a24));
        }
        let id = st.id();
        st.live_creds.insert(id);
        Ok(FakeCred { id, principal: name.text.clone() })
    }

    fn release_cred(&self, cred: FakeCred) -> Result<(), StatusCode> {
        let mut st = self.state.lock();
        st.calls.push(Call::ReleaseCred { cred: cred.id });
        assert!(st.live_creds.remove(&cred.id), "credential {} released twice", cred.id);
        if st.fail_release_cred {
            Err(status(MajorFlags::GSS_S_NO_CRED, 0))
        } else {
            Ok(())
        }
    }

    fn inquire_cred_name(&self, cred: Option<&FakeCred>) -> Result<FakeName, StatusCode> {
        let mut st = self.state.lock();
        st.calls.push(Call::InquireCredName { cred: cred.map(|c| c.id) });
        if st.fail_inquire {
            return Err(status(MajorFlags::GSS_S_NO_CRED, 0x96c73a10));
        }
        let text = cred.map_or_else(|| format!("default@{}", REALM), |c| c.principal.clone());
        Ok(FakeProvider::name(&mut st, text))
    }

    fn init_context(
        &self,
        cred: Option<&FakeCred>,
        ctx: &mut Option<FakeCtx>,
        target: &FakeName,
        mech: Option<&Oid>,
        flags: CtxFlags,
        lifetime: Option<Duration>,
        input: Option<&[u8]>,
    ) -> InitOutput<FakeBuf> {
        assert!(mech.is_none());
        assert!(lifetime.is_none());
        let reply = {
            let mut st = self.state.lock();
            st.calls.push(Call::InitContext {
                cred: cred.map(|c| c.id),
                ctx: ctx.as_ref().map(|c| c.id),
                target: target.text.clone(),
                flags,
                input: input.map(|i| i.to_vec()),
            });
            assert!(st.live_names.contains(&target.id));
            if ctx.is_none() && !st.no_ctx {
                let id = st.id();
                st.live_ctxs.insert(id);
                *ctx = Some(FakeCtx { id });
            }
            st.script.pop_front().expect("init_context called more times than scripted")
        };
        InitOutput {
            status: status(reply.major, reply.minor),
            token: if reply.token.is_empty() { None } else { Some(self.buf(reply.token)) },
        }
    }

    fn delete_context(&self, ctx: FakeCtx) -> Result<(), StatusCode> {
        let mut st = self.state.lock();
        st.calls.push(Call::DeleteContext { ctx: ctx.id });
        assert!(st.live_ctxs.remove(&ctx.id), "context {} deleted twice", ctx.id);
        if st.fail_delete_context {
            Err(status(MajorFlags::GSS_S_NO_CONTEXT, 0))
        } else {
            Ok(())
        }
    }

    fn wrap(&self, ctx: &FakeCtx, encrypt: bool, msg: &[u8]) -> Result<FakeBuf, StatusCode> {
        let fail = {
            let mut st = self.state.lock();
            st.calls.push(Call::Wrap { ctx: ctx.id, encrypt, len: msg.len() });
            st.fail_wrap
        };
        // the output is allocated before the failure is noticed
        let mut out = self.buf(Vec::new());
        if fail {
            return Err(status(MajorFlags::GSS_S_CONTEXT_EXPIRED, 0));
        }
        if !msg.is_empty() {
            out.data = [b"W1".as_slice(), msg].concat();
        }
        Ok(out)
    }

    fn unwrap(&self, ctx: &FakeCtx, msg: &[u8]) -> Result<FakeBuf, StatusCode> {
        self.state.lock().calls.push(Call::Unwrap { ctx: ctx.id, len: msg.len() });
        match msg.strip_prefix(b"W1".as_slice()) {
            Some(data) => Ok(self.buf(data.to_vec())),
            None if msg.is_empty() => Ok(self.buf(Vec::new())),
            None => Err(status(MajorFlags::GSS_S_DEFECTIVE_TOKEN, 0)),
        }
    }

    fn display_status(
        &self,
        code: u32,
        class: StatusClass,
        message_context: &mut u32,
    ) -> Result<FakeBuf, StatusCode> {
        let segment = {
            let mut st = self.state.lock();
            st.calls.push(Call::DisplayStatus { code, class });
            let i = *message_context as usize;
            if st.fail_display_status_at == Some(i) {
                return Err(status(MajorFlags::GSS_S_BAD_STATUS, 0));
            }
            let segment = st.status_segments.get(i).cloned().unwrap_or_default();
            *message_context = if i + 1 < st.status_segments.len() { (i + 1) as u32 } else { 0 };
            segment
        };
        Ok(self.buf(segment.into_bytes()))
    }
}
