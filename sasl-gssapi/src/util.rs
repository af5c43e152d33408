use bytes::Bytes;
use std::ops::Deref;

/// Copy a provider owned buffer into memory we own. The provider
/// buffer is released (dropped) before this returns.
pub(crate) fn copy_out<B>(buf: B) -> Bytes
where
    B: Deref<Target = [u8]>,
{
    if buf.is_empty() {
        Bytes::new()
    } else {
        Bytes::copy_from_slice(&buf)
    }
}

/// Like `copy_out`, but an absent or empty buffer becomes `None`.
pub(crate) fn copy_token<B>(buf: Option<B>) -> Option<Bytes>
where
    B: Deref<Target = [u8]>,
{
    buf.map(copy_out).filter(|b| !b.is_empty())
}

#[cfg(feature = "krb5")]
pub use self::gss::Buf;
#[cfg(feature = "krb5")]
pub(crate) use self::gss::BufRef;

#[cfg(feature = "krb5")]
mod gss {
    use libgssapi_sys::{
        gss_buffer_desc, gss_buffer_desc_struct, gss_buffer_t, gss_release_buffer,
        OM_uint32, GSS_S_COMPLETE,
    };
    use std::{
        ffi,
        marker::PhantomData,
        ops::{Deref, Drop},
        ptr, slice,
    };

    /* Only pass this to gssapi functions that treat the buffer as
     * input, C can't be stopped from writing through the pointer. */
    #[repr(transparent)]
    #[derive(Debug)]
    pub(crate) struct BufRef<'a>(gss_buffer_desc_struct, PhantomData<&'a [u8]>);

    impl<'a> From<&'a [u8]> for BufRef<'a> {
        fn from(s: &[u8]) -> Self {
            let gss_buf = gss_buffer_desc_struct {
                length: s.len() as _,
                value: s.as_ptr() as *mut ffi::c_void,
            };
            BufRef(gss_buf, PhantomData)
        }
    }

    impl<'a> BufRef<'a> {
        pub(crate) fn to_c(&mut self) -> gss_buffer_t {
            &mut self.0 as gss_buffer_t
        }
    }

    /// An owned buffer we got from gssapi, it will be deallocated via
    /// the library routine when it is dropped.
    #[repr(transparent)]
    #[derive(Debug)]
    pub struct Buf(gss_buffer_desc);

    unsafe impl Send for Buf {}
    unsafe impl Sync for Buf {}

    impl Deref for Buf {
        type Target = [u8];

        fn deref(&self) -> &Self::Target {
            if self.0.value.is_null() || self.0.length == 0 {
                &[]
            } else {
                unsafe { slice::from_raw_parts(self.0.value.cast(), self.0.length as usize) }
            }
        }
    }

    impl Drop for Buf {
        fn drop(&mut self) {
            if !self.0.value.is_null() {
                let mut minor = GSS_S_COMPLETE;
                let _major = unsafe {
                    gss_release_buffer(&mut minor as *mut OM_uint32, &mut self.0 as gss_buffer_t)
                };
            }
        }
    }

    impl Buf {
        pub(crate) fn empty() -> Buf {
            Buf(gss_buffer_desc { length: 0 as _, value: ptr::null_mut() })
        }

        pub(crate) fn to_c(&mut self) -> gss_buffer_t {
            &mut self.0 as gss_buffer_t
        }
    }
}
