//! Windows named-pipe endpoints with overlapped I/O.
//!
//! The entry points are [`EndpointOptions`], which creates server-side pipe instances, and
//! [`PipeEndpoint::open_only`], which connects to an existing one. Reads and writes are
//! submitted in overlapped form through an [`AsyncRequest`] and resolved to an
//! [`Outcome`](crate::Outcome).

mod async_request;
mod c_wrappers;
mod endpoint;
mod file_handle;

pub use {async_request::*, endpoint::*};
pub(crate) use file_handle::*;

pub(crate) mod winprelude {
    pub(crate) use super::{AsRawHandleExt as _, HANDLEExt as _};
    pub(crate) use std::os::windows::prelude::*;
    pub(crate) use windows_sys::Win32::Foundation::{HANDLE, INVALID_HANDLE_VALUE};
}
use winprelude::*;

use crate::{Outcome, RawOsErrorExt};
use std::io;
use windows_sys::Win32::Foundation::{
    ERROR_BROKEN_PIPE, ERROR_NO_DATA, ERROR_PIPE_NOT_CONNECTED,
};

pub(crate) trait AsRawHandleExt: AsRawHandle {
    #[inline(always)]
    #[allow(clippy::as_conversions)]
    fn as_int_handle(&self) -> HANDLE { self.as_raw_handle() as HANDLE }
}
impl<T: AsRawHandle + ?Sized> AsRawHandleExt for T {}

pub(crate) trait HANDLEExt {
    fn to_std(self) -> RawHandle;
}
impl HANDLEExt for HANDLE {
    #[inline(always)]
    #[allow(clippy::as_conversions)]
    fn to_std(self) -> RawHandle { self as RawHandle }
}

/// Whether the error means that the peer went away. `ERROR_NO_DATA` is how writes to a pipe
/// whose peer has disconnected fail.
pub(crate) fn is_disconnect(e: &io::Error) -> bool {
    e.raw_os_error().eeq(ERROR_BROKEN_PIPE)
        || e.raw_os_error().eeq(ERROR_PIPE_NOT_CONNECTED)
        || e.raw_os_error().eeq(ERROR_NO_DATA)
}

impl Outcome {
    /// Translates a native failure into an outcome. Never returns `Success` or `MoreData`:
    /// those are decided by the submission and resolution paths, not by the failure code alone.
    pub(crate) fn from_error(e: &io::Error) -> Self {
        if is_disconnect(e) {
            Self::Disconnected
        } else {
            #[allow(clippy::cast_sign_loss)] // Win32 status codes are bit patterns
            Self::Error(e.raw_os_error().unwrap_or_default() as u32)
        }
    }
}
