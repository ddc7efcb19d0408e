use super::{c_wrappers, winprelude::*};
use crate::{AsMutPtr, DebugExpectExt, Outcome, RawOsErrorExt, SubUsizeExt};
use std::{io, mem};
use windows_sys::Win32::{
    Foundation::{ERROR_IO_INCOMPLETE, ERROR_MORE_DATA, ERROR_NOT_FOUND},
    System::IO::{CancelIoEx, GetOverlappedResult, OVERLAPPED},
};

/// One in-flight overlapped I/O operation on a pipe endpoint.
///
/// A request is created lazily by [`read`](super::PipeEndpoint::read)/
/// [`write`](super::PipeEndpoint::write) when the caller passes `None`, or up front with
/// [`new`](Self::new). It borrows the handle of the endpoint it operates on, which pins it to
/// that endpoint's lifetime: outstanding requests cannot outlive the handle their completion is
/// tied to.
///
/// After a submission reports [`Success`](Outcome::Success) or [`MoreData`](Outcome::MoreData),
/// the request is *valid* – an operation is outstanding and must be resolved through
/// [`wait`](Self::wait), [`try_result`](Self::try_result) or [`cancel`](Self::cancel) before the
/// request is reused. Submitting a second operation in the same direction while one is still
/// valid is a caller error which this type does not guard against.
///
/// Dropping a valid request cancels the operation and drains its completion first, so the OS
/// never writes through a freed completion descriptor.
pub struct AsyncRequest<'handle> {
    handle: BorrowedHandle<'handle>,
    // Boxed so that the kernel-visible address stays put while the request moves around.
    overlapped: Box<OVERLAPPED>,
    event: OwnedHandle,
    valid: bool,
}

impl<'handle> AsyncRequest<'handle> {
    /// Creates an idle request bound to the given pipe handle, allocating the completion event.
    pub fn new(handle: BorrowedHandle<'handle>) -> io::Result<Self> {
        let event = c_wrappers::create_manual_reset_event()?;
        // SAFETY: OVERLAPPED is a plain-data struct for which zeroes are the documented idle
        // state.
        let mut overlapped: Box<OVERLAPPED> = Box::new(unsafe { mem::zeroed() });
        overlapped.hEvent = event.as_int_handle();
        Ok(Self { handle, overlapped, event, valid: false })
    }

    /// Whether an operation has been submitted on this request and not yet resolved or
    /// cancelled.
    #[inline]
    pub fn is_valid(&self) -> bool { self.valid }

    /// The completion event of this request, signaled when the outstanding operation finishes.
    ///
    /// This is the hook for callers that drive their own waiting or polling; the event is
    /// owned by the request and reset on reuse.
    #[inline]
    pub fn event(&self) -> BorrowedHandle<'_> { self.event.as_handle() }

    pub(crate) fn rebind(&mut self, handle: BorrowedHandle<'handle>) { self.handle = handle; }

    /// Returns the request to the idle state in preparation for a new submission.
    pub(crate) fn reset(&mut self) {
        let event = self.overlapped.hEvent;
        // SAFETY: as in new()
        *self.overlapped = unsafe { mem::zeroed() };
        self.overlapped.hEvent = event;
        c_wrappers::reset_event(self.event.as_handle())
            .debug_expect("failed to reset completion event");
        self.valid = false;
    }

    pub(crate) fn set_valid(&mut self) { self.valid = true; }

    #[inline]
    pub(crate) fn overlapped_ptr(&mut self) -> *mut OVERLAPPED { (*self.overlapped).as_mut_ptr() }

    /// Blocks until the outstanding operation resolves, consuming the resolution.
    ///
    /// Returns the transferred byte count on success. A partial message-mode read (the
    /// [`MoreData`](Outcome::MoreData) submission outcome) also resolves through the `Ok` arm:
    /// the buffer-sized chunk was transferred and the remainder is drained by further reads.
    /// The `Err` arm only ever carries [`Disconnected`](Outcome::Disconnected) or
    /// [`Error`](Outcome::Error).
    ///
    /// Must only be called after a submission marked the request valid.
    pub fn wait(&mut self) -> Result<usize, Outcome> {
        match self.resolve(true) {
            Some(resolution) => resolution,
            // Unreachable with an infinite wait, kept as a non-panicking fallback.
            None => Err(Outcome::Error(ERROR_IO_INCOMPLETE)),
        }
    }

    /// Polls the outstanding operation without blocking.
    ///
    /// Returns `None` while the operation is still pending; otherwise consumes the resolution
    /// exactly like [`wait`](Self::wait).
    pub fn try_result(&mut self) -> Option<Result<usize, Outcome>> { self.resolve(false) }

    fn resolve(&mut self, wait: bool) -> Option<Result<usize, Outcome>> {
        let mut transferred: u32 = 0;
        let ok = unsafe {
            GetOverlappedResult(
                self.handle.as_int_handle(),
                &*self.overlapped,
                transferred.as_mut_ptr(),
                wait as i32,
            )
        } != 0;
        if ok {
            self.valid = false;
            return Some(Ok(transferred.to_usize()));
        }
        let e = io::Error::last_os_error();
        if !wait && e.raw_os_error().eeq(ERROR_IO_INCOMPLETE) {
            return None;
        }
        self.valid = false;
        Some(if e.raw_os_error().eeq(ERROR_MORE_DATA) {
            Ok(transferred.to_usize())
        } else {
            Err(Outcome::from_error(&e))
        })
    }

    /// Cancels the in-flight operation, if any, releasing the OS-side resources tied to the
    /// completion descriptor. Idempotent: cancelling a request with nothing outstanding is a
    /// no-op.
    pub fn cancel(&mut self) {
        let ok = unsafe { CancelIoEx(self.handle.as_int_handle(), &*self.overlapped) } != 0;
        if !ok {
            let e = io::Error::last_os_error();
            // Nothing to cancel.
            if !e.raw_os_error().eeq(ERROR_NOT_FOUND) {
                debug_assert!(false, "CancelIoEx failed: {e}");
            }
        }
        if self.valid {
            // Drain the completion so the kernel is done with the OVERLAPPED before reuse.
            let mut transferred: u32 = 0;
            unsafe {
                GetOverlappedResult(
                    self.handle.as_int_handle(),
                    &*self.overlapped,
                    transferred.as_mut_ptr(),
                    1,
                )
            };
        }
        self.valid = false;
    }
}

impl Drop for AsyncRequest<'_> {
    fn drop(&mut self) {
        if self.valid {
            self.cancel();
        }
    }
}

// SAFETY: the OVERLAPPED structure is exclusively owned and only handed to the kernel, and the
// raw pointers inside it are not dereferenced by this type.
unsafe impl Send for AsyncRequest<'_> {}

impl std::fmt::Debug for AsyncRequest<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncRequest")
            .field("handle", &self.handle.as_raw_handle())
            .field("event", &self.event.as_raw_handle())
            .field("valid", &self.valid)
            .finish_non_exhaustive()
    }
}
