/// Specifies the mode for a pipe or for one direction of it.
///
/// The *type* of a pipe (chosen at creation) controls how data written into it is framed, while
/// the *read mode* (chosen per handle) controls how that data comes back out. Message-type pipes
/// can be read in either mode; byte-type pipes can only be read as a byte stream.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum PipeMode {
    /// The pipe works in byte stream mode, erasing the boundaries of separate write calls.
    Bytes,
    /// The pipe works in message stream mode, preserving the boundaries of separate write calls
    /// on the read side.
    Messages,
}

/// What an overlapped submission or a peek resolved to.
///
/// Returned by value rather than through `Result` because only two of the variants are failures:
/// `Success` and `MoreData` are expected signals the caller branches on, not errors.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[must_use = "an unexamined outcome may hide a disconnect or a failed submission"]
pub enum Outcome {
    /// The operation completed or was accepted for asynchronous execution.
    ///
    /// For a `read` or `write` submission this means *queued*, not *bytes transferred* – the
    /// final byte count comes from waiting on or polling the request.
    Success,
    /// A message-mode read found a message larger than the provided buffer. The buffer was
    /// filled; the rest of the message is drained with a larger buffer or further reads.
    MoreData,
    /// The peer has disconnected. This is a normal end-of-session signal, never folded into
    /// [`Error`](Outcome::Error).
    Disconnected,
    /// Any other native failure, carrying the OS status code for diagnostics.
    Error(u32),
}

impl Outcome {
    /// Whether the outcome is [`Success`](Outcome::Success).
    #[inline]
    pub const fn is_success(self) -> bool { matches!(self, Self::Success) }
    /// The native status code if the outcome is [`Error`](Outcome::Error).
    #[inline]
    pub const fn raw_os_error(self) -> Option<u32> {
        match self {
            Self::Error(code) => Some(code),
            _ => None,
        }
    }
}
