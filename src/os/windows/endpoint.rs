use super::{c_wrappers, is_disconnect, winprelude::*, AsyncRequest, FileHandle};
use crate::{
    name::{self, UNLIMITED_INSTANCES},
    Outcome, PipeMode, RawOsErrorExt,
};
use std::{
    borrow::Cow,
    fmt::{self, Debug, Formatter},
    io, ptr,
};
use widestring::U16CString;
use windows_sys::Win32::{
    Foundation::{ERROR_ACCESS_DENIED, ERROR_IO_PENDING, ERROR_MORE_DATA, ERROR_PIPE_BUSY},
    Storage::FileSystem::{
        ReadFile, WriteFile, FILE_FLAG_FIRST_PIPE_INSTANCE, FILE_FLAG_OVERLAPPED,
        FILE_FLAG_WRITE_THROUGH, PIPE_ACCESS_DUPLEX,
    },
    System::Pipes::{PIPE_TYPE_MESSAGE, PIPE_WAIT},
};

/// Allows for customization of [`PipeEndpoint`]s during create-style construction.
///
/// The buffer sizes and the connection wait timeout have fixed, stated defaults and rarely need
/// to be touched; the rest mirrors the parameters of the native creation primitive.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub struct EndpointOptions<'a> {
    /// The endpoint name. Validated and normalized into the local pipe namespace before any OS
    /// call; see the [`name`](crate::name) module for the rules.
    pub name: Cow<'a, str>,
    /// How data written into the pipe is framed.
    pub mode: PipeMode,
    /// How data is read back out of the pipe on this end.
    pub read_mode: PipeMode,
    /// The maximum number of concurrent instances of the pipe,
    /// `1..=`[`UNLIMITED_INSTANCES`].
    pub instance_limit: u32,
    /// Refuses creation if an instance of the pipe already exists, making this endpoint the
    /// sole instance for its name.
    pub unique: bool,
    /// Size of the inbound kernel buffer, in bytes.
    pub input_buffer_size: u32,
    /// Size of the outbound kernel buffer, in bytes.
    pub output_buffer_size: u32,
    /// The default timeout, in milliseconds, applied by the OS when a client waits for an
    /// instance of this pipe to become available. Does not affect data transfer.
    pub wait_timeout_ms: u32,
}

macro_rules! genset {
    ($($name:ident : $ty:ty),+ $(,)?) => {$(
        #[doc = concat!("Sets the [`", stringify!($name), "`](#structfield.", stringify!($name), ") parameter to the specified value.")]
        #[must_use = "builder setters take the entire structure and return the result"]
        pub fn $name(mut self, $name: impl Into<$ty>) -> Self {
            self.$name = $name.into();
            self
        }
    )+};
}

impl<'a> EndpointOptions<'a> {
    /// Default size of each kernel buffer, in bytes.
    pub const DEFAULT_BUFFER_SIZE: u32 = 65535;
    /// Default instance-availability wait timeout, in milliseconds.
    pub const DEFAULT_WAIT_TIMEOUT_MS: u32 = 100;

    /// Creates an option table for the given endpoint name with default options: message pipe
    /// type and read mode, no instance limit, non-unique, 65535-byte buffers, 100 ms wait
    /// timeout.
    pub fn new(name: impl Into<Cow<'a, str>>) -> Self {
        Self {
            name: name.into(),
            mode: PipeMode::Messages,
            read_mode: PipeMode::Messages,
            instance_limit: UNLIMITED_INSTANCES,
            unique: false,
            input_buffer_size: Self::DEFAULT_BUFFER_SIZE,
            output_buffer_size: Self::DEFAULT_BUFFER_SIZE,
            wait_timeout_ms: Self::DEFAULT_WAIT_TIMEOUT_MS,
        }
    }

    genset!(
        name: Cow<'a, str>,
        mode: PipeMode,
        read_mode: PipeMode,
        instance_limit: u32,
        unique: bool,
        input_buffer_size: u32,
        output_buffer_size: u32,
        wait_timeout_ms: u32,
    );

    /// Creates a new pipe instance, failing if the OS refuses – including when `unique` is set
    /// and an instance already exists. Never falls back to opening.
    ///
    /// # Errors
    /// [`InvalidInput`](io::ErrorKind::InvalidInput) if the parameters fail validation (before
    /// any OS call); otherwise the native error of the creation primitive.
    pub fn create_only(&self) -> io::Result<PipeEndpoint> { self.create(false) }

    /// Creates a new pipe instance, falling back to opening the existing one if creation fails
    /// because an instance already exists.
    ///
    /// This handles the race where two processes both believe they are the first to establish
    /// the endpoint: one of them creates it, the other ends up opening it.
    pub fn create_or_open(&self) -> io::Result<PipeEndpoint> { self.create(true) }

    fn create(&self, open_fallback: bool) -> io::Result<PipeEndpoint> {
        name::validate_create(&self.name, self.instance_limit)?;
        let path = encode_path(&self.name)?;
        match c_wrappers::create_named_pipe(
            &path,
            self.to_open_mode(),
            self.to_pipe_mode(),
            self.instance_limit,
            self.output_buffer_size,
            self.input_buffer_size,
            self.wait_timeout_ms,
        ) {
            Ok(handle) => Ok(PipeEndpoint {
                handle,
                mode: self.mode,
                read_mode: self.read_mode,
                unique: self.unique,
            }),
            Err(e) if open_fallback && instance_already_exists(&e) => {
                let handle = c_wrappers::open_existing(&path)?;
                if self.read_mode == PipeMode::Messages {
                    c_wrappers::set_readmode(handle.as_handle(), PipeMode::Messages)?;
                }
                Ok(PipeEndpoint {
                    handle,
                    mode: self.mode,
                    read_mode: self.read_mode,
                    unique: false,
                })
            }
            Err(e) => Err(e),
        }
    }

    fn to_open_mode(&self) -> u32 {
        let mut open_mode = PIPE_ACCESS_DUPLEX | FILE_FLAG_WRITE_THROUGH | FILE_FLAG_OVERLAPPED;
        if self.unique {
            open_mode |= FILE_FLAG_FIRST_PIPE_INSTANCE;
        }
        open_mode
    }
    fn to_pipe_mode(&self) -> u32 {
        self.mode.to_pipe_type() | self.read_mode.to_readmode() | PIPE_WAIT
    }
}

fn encode_path(pipe_name: &str) -> io::Result<U16CString> {
    U16CString::from_str(name::to_pipe_path(pipe_name))
        .map_err(|_| io::Error::from(name::EndpointParamError::NameContainsNul))
}

fn instance_already_exists(e: &io::Error) -> bool {
    // The first-instance flag surfaces as an access-denied refusal; a busy pipe means all
    // instances are taken but the name is established either way.
    e.raw_os_error().eeq(ERROR_ACCESS_DENIED) || e.raw_os_error().eeq(ERROR_PIPE_BUSY)
}

/// A named, bidirectional pipe endpoint with overlapped I/O.
///
/// The endpoint exclusively owns its OS handle: when it goes out of scope, any connected peer
/// is disconnected and the handle is released, once, on every exit path. Requests produced by
/// [`read`](Self::read) and [`write`](Self::write) borrow the handle and therefore cannot
/// outlive the endpoint.
pub struct PipeEndpoint {
    handle: FileHandle,
    mode: PipeMode,
    read_mode: PipeMode,
    unique: bool,
}

impl PipeEndpoint {
    /// Opens an existing instance of the named pipe, failing if none exists.
    ///
    /// The given read mode is applied to the opened handle; the pipe type is queried from the
    /// server side of the connection.
    pub fn open_only(pipe_name: &str, read_mode: PipeMode) -> io::Result<Self> {
        name::validate_open(pipe_name)?;
        let path = encode_path(pipe_name)?;
        let handle = c_wrappers::open_existing(&path)?;
        if read_mode == PipeMode::Messages {
            c_wrappers::set_readmode(handle.as_handle(), PipeMode::Messages)?;
        }
        let flags = c_wrappers::get_np_flags(handle.as_handle())?;
        let mode = if flags & PIPE_TYPE_MESSAGE != 0 {
            PipeMode::Messages
        } else {
            PipeMode::Bytes
        };
        Ok(Self { handle, mode, read_mode, unique: false })
    }

    /// How data written into the pipe is framed.
    #[inline]
    pub fn mode(&self) -> PipeMode { self.mode }
    /// How data is read back out of the pipe on this end.
    #[inline]
    pub fn read_mode(&self) -> PipeMode { self.read_mode }
    /// Whether this endpoint was created as the sole instance for its name.
    #[inline]
    pub fn is_unique(&self) -> bool { self.unique }

    /// Peeks the number of bytes left in the current message, without consuming data or
    /// blocking.
    ///
    /// An empty buffer and a buffer with a zero-length message at its head both report `Ok(0)`.
    /// The `Err` arm only ever carries [`Disconnected`](Outcome::Disconnected) or
    /// [`Error`](Outcome::Error).
    pub fn available(&self) -> Result<usize, Outcome> {
        c_wrappers::peek_msg_len(self.handle.as_handle()).map_err(|e| Outcome::from_error(&e))
    }

    /// Peeks the total number of bytes buffered across all messages, without consuming data or
    /// blocking. Same outcome contract as [`available`](Self::available).
    pub fn total_available(&self) -> Result<usize, Outcome> {
        c_wrappers::peek_total_len(self.handle.as_handle()).map_err(|e| Outcome::from_error(&e))
    }

    /// Submits an overlapped read into `buf`.
    ///
    /// A `None` request is replaced with a freshly created one bound to this endpoint; a
    /// `Some` request is rebound and reused, which requires its previous operation to have been
    /// resolved or cancelled. [`Success`](Outcome::Success) means *accepted for asynchronous
    /// execution* – the final byte count comes from the request. [`MoreData`](Outcome::MoreData)
    /// means the buffer was shorter than the message at the head of the pipe; the request still
    /// resolves with the buffer-sized chunk and the remainder is drained by further reads.
    ///
    /// # Safety
    /// The OS writes through `buf` until the request resolves: `buf` must not be moved, freed
    /// or reused before the request reports a resolution through
    /// [`wait`](AsyncRequest::wait)/[`try_result`](AsyncRequest::try_result), is
    /// [`cancel`](AsyncRequest::cancel)led, or is dropped.
    pub unsafe fn read<'a>(
        &'a self,
        request: &mut Option<AsyncRequest<'a>>,
        buf: &mut [u8],
    ) -> Outcome {
        let req = match self.bind_request(request) {
            Ok(req) => req,
            Err(e) => return Outcome::from_error(&e),
        };
        let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        let ok = unsafe {
            ReadFile(
                self.handle.as_int_handle(),
                buf.as_mut_ptr(),
                len,
                ptr::null_mut(),
                req.overlapped_ptr(),
            )
        } != 0;
        submission_outcome(req, ok)
    }

    /// Submits an overlapped write of `buf`.
    ///
    /// Request handling and outcome semantics are the same as for [`read`](Self::read).
    ///
    /// # Safety
    /// The OS reads from `buf` until the request resolves: `buf` must not be moved, freed or
    /// overwritten before the request reports a resolution, is cancelled, or is dropped.
    pub unsafe fn write<'a>(
        &'a self,
        request: &mut Option<AsyncRequest<'a>>,
        buf: &[u8],
    ) -> Outcome {
        let req = match self.bind_request(request) {
            Ok(req) => req,
            Err(e) => return Outcome::from_error(&e),
        };
        let len = u32::try_from(buf.len()).unwrap_or(u32::MAX);
        let ok = unsafe {
            WriteFile(
                self.handle.as_int_handle(),
                buf.as_ptr(),
                len,
                ptr::null_mut(),
                req.overlapped_ptr(),
            )
        } != 0;
        submission_outcome(req, ok)
    }

    fn bind_request<'a, 'r>(
        &'a self,
        request: &'r mut Option<AsyncRequest<'a>>,
    ) -> io::Result<&'r mut AsyncRequest<'a>> {
        match request {
            Some(req) => {
                debug_assert!(
                    !req.is_valid(),
                    "submitted a new operation on a request whose previous operation is still \
                     outstanding"
                );
                req.rebind(self.handle.as_handle());
                req.reset();
                Ok(req)
            }
            None => Ok(request.insert(AsyncRequest::new(self.handle.as_handle())?)),
        }
    }
}

fn submission_outcome(req: &mut AsyncRequest<'_>, ok: bool) -> Outcome {
    if ok {
        // Completed synchronously; the completion event is signaled and the request resolves
        // immediately.
        req.set_valid();
        return Outcome::Success;
    }
    let e = io::Error::last_os_error();
    if e.raw_os_error().eeq(ERROR_IO_PENDING) {
        // The expected path: all I/O on this endpoint is overlapped.
        req.set_valid();
        Outcome::Success
    } else if e.raw_os_error().eeq(ERROR_MORE_DATA) {
        // The data is already there, just bigger than the caller's buffer.
        req.set_valid();
        Outcome::MoreData
    } else if is_disconnect(&e) {
        Outcome::Disconnected
    } else {
        req.cancel();
        Outcome::from_error(&e)
    }
}

impl Drop for PipeEndpoint {
    fn drop(&mut self) {
        // Disconnecting a never-connected or already-disconnected handle merely reports an
        // error, which is discarded; the handle itself is released by OwnedHandle.
        let _ = c_wrappers::disconnect(self.handle.as_handle());
    }
}

impl AsHandle for PipeEndpoint {
    #[inline]
    fn as_handle(&self) -> BorrowedHandle<'_> { self.handle.as_handle() }
}
impl AsRawHandle for PipeEndpoint {
    #[inline]
    fn as_raw_handle(&self) -> RawHandle { self.handle.as_raw_handle() }
}

impl Debug for PipeEndpoint {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipeEndpoint")
            .field("handle", &self.handle)
            .field("mode", &self.mode)
            .field("read_mode", &self.read_mode)
            .field("unique", &self.unique)
            .finish()
    }
}
