use super::{winprelude::*, FileHandle};
use crate::{AsMutPtr, HandleOrErrno, OrErrno, PipeMode, SubUsizeExt};
use std::{io, ptr};
use widestring::U16CStr;
use windows_sys::Win32::{
    Foundation::{GENERIC_READ, GENERIC_WRITE},
    Storage::FileSystem::{CreateFileW, FILE_FLAG_OVERLAPPED, OPEN_EXISTING},
    System::{
        Pipes::{
            CreateNamedPipeW, DisconnectNamedPipe, GetNamedPipeInfo, PeekNamedPipe,
            SetNamedPipeHandleState, PIPE_READMODE_BYTE, PIPE_READMODE_MESSAGE, PIPE_TYPE_BYTE,
            PIPE_TYPE_MESSAGE,
        },
        Threading::{CreateEventW, ResetEvent},
    },
};

impl PipeMode {
    pub(crate) const fn to_pipe_type(self) -> u32 {
        match self {
            Self::Bytes => PIPE_TYPE_BYTE,
            Self::Messages => PIPE_TYPE_MESSAGE,
        }
    }
    pub(crate) const fn to_readmode(self) -> u32 {
        match self {
            Self::Bytes => PIPE_READMODE_BYTE,
            Self::Messages => PIPE_READMODE_MESSAGE,
        }
    }
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn create_named_pipe(
    path: &U16CStr,
    open_mode: u32,
    pipe_mode: u32,
    instance_limit: u32,
    output_buffer_size: u32,
    input_buffer_size: u32,
    default_timeout: u32,
) -> io::Result<FileHandle> {
    unsafe {
        CreateNamedPipeW(
            path.as_ptr(),
            open_mode,
            pipe_mode,
            instance_limit,
            output_buffer_size,
            input_buffer_size,
            default_timeout,
            ptr::null(),
        )
        .handle_or_errno()
        // SAFETY: we just created this handle
        .map(|h| FileHandle::from(OwnedHandle::from_raw_handle(h.to_std())))
    }
}

pub(crate) fn open_existing(path: &U16CStr) -> io::Result<FileHandle> {
    unsafe {
        CreateFileW(
            path.as_ptr(),
            GENERIC_READ | GENERIC_WRITE,
            0,
            ptr::null(),
            OPEN_EXISTING,
            FILE_FLAG_OVERLAPPED,
            0,
        )
        .handle_or_errno()
        // SAFETY: we just opened this handle
        .map(|h| FileHandle::from(OwnedHandle::from_raw_handle(h.to_std())))
    }
}

pub(crate) fn set_readmode(handle: BorrowedHandle<'_>, mode: PipeMode) -> io::Result<()> {
    let mode = mode.to_readmode();
    unsafe {
        SetNamedPipeHandleState(handle.as_int_handle(), &mode, ptr::null(), ptr::null())
    }
    .true_val_or_errno(())
}

/// Peeks the number of bytes left in the current message without consuming anything.
pub(crate) fn peek_msg_len(handle: BorrowedHandle<'_>) -> io::Result<usize> {
    let mut msglen: u32 = 0;
    unsafe {
        PeekNamedPipe(
            handle.as_int_handle(),
            ptr::null_mut(),
            0,
            ptr::null_mut(),
            ptr::null_mut(),
            msglen.as_mut_ptr(),
        )
    }
    .true_val_or_errno(msglen.to_usize())
}

/// Peeks the total number of bytes buffered across all messages without consuming anything.
pub(crate) fn peek_total_len(handle: BorrowedHandle<'_>) -> io::Result<usize> {
    let mut total: u32 = 0;
    unsafe {
        PeekNamedPipe(
            handle.as_int_handle(),
            ptr::null_mut(),
            0,
            ptr::null_mut(),
            total.as_mut_ptr(),
            ptr::null_mut(),
        )
    }
    .true_val_or_errno(total.to_usize())
}

/// Queries the flag word of a pipe handle, which carries the pipe type and end bits.
pub(crate) fn get_np_flags(handle: BorrowedHandle<'_>) -> io::Result<u32> {
    let mut flags: u32 = 0;
    unsafe {
        GetNamedPipeInfo(
            handle.as_int_handle(),
            flags.as_mut_ptr(),
            ptr::null_mut(),
            ptr::null_mut(),
            ptr::null_mut(),
        )
    }
    .true_val_or_errno(flags)
}

pub(crate) fn disconnect(handle: BorrowedHandle<'_>) -> io::Result<()> {
    unsafe { DisconnectNamedPipe(handle.as_int_handle()) }.true_val_or_errno(())
}

pub(crate) fn create_manual_reset_event() -> io::Result<OwnedHandle> {
    let handle = unsafe { CreateEventW(ptr::null(), 1, 0, ptr::null()) };
    // CreateEventW reports failure with a null handle, not INVALID_HANDLE_VALUE.
    (handle != 0)
        // SAFETY: we just created this handle
        .true_or_errno(|| unsafe { OwnedHandle::from_raw_handle(handle.to_std()) })
}

pub(crate) fn reset_event(handle: BorrowedHandle<'_>) -> io::Result<()> {
    unsafe { ResetEvent(handle.as_int_handle()) }.true_val_or_errno(())
}
