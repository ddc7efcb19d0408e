//! Validation and normalization of pipe endpoint names.
//!
//! Names are plain UTF-8 strings addressing a pipe on the local machine. Before they are handed
//! to the OS, every backslash is replaced with a forward slash and the [`NAMESPACE_PREFIX`] is
//! prepended; UTF-16 encoding and the explicit nul terminator come after that, on the Windows
//! side of the crate. Everything in this module is pure and runs on every platform.

use std::{borrow::Cow, error::Error, fmt, io};

/// The local-machine pipe namespace prefix prepended to every normalized name.
pub const NAMESPACE_PREFIX: &str = r"\\.\pipe\";

// Windows MAX_PATH. Kept local so that name handling stays platform-independent.
const MAX_PATH: usize = 260;

/// The maximum length of an endpoint name, in bytes: the platform path-length budget minus the
/// namespace prefix.
pub const MAX_NAME_LEN: usize = MAX_PATH - NAMESPACE_PREFIX.len() - 1;

/// The instance-limit sentinel that places no limit on the number of concurrent instances.
///
/// Numerically equal to `PIPE_UNLIMITED_INSTANCES`.
pub const UNLIMITED_INSTANCES: u32 = 255;

/// An argument error produced by endpoint parameter validation, before any OS call is made.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum EndpointParamError {
    /// The endpoint name is empty.
    EmptyName,
    /// The endpoint name exceeds [`MAX_NAME_LEN`].
    NameTooLong,
    /// The endpoint name contains an interior nul byte and cannot be encoded for the OS.
    NameContainsNul,
    /// The instance limit is zero.
    ZeroInstanceLimit,
    /// The instance limit exceeds [`UNLIMITED_INSTANCES`].
    InstanceLimitTooLarge,
}
impl fmt::Display for EndpointParamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyName => f.write_str("endpoint name cannot be empty"),
            Self::NameTooLong => {
                write!(f, "endpoint name cannot be longer than {MAX_NAME_LEN} bytes")
            }
            Self::NameContainsNul => f.write_str("endpoint name cannot contain nul bytes"),
            Self::ZeroInstanceLimit => f.write_str("instance limit cannot be zero"),
            Self::InstanceLimitTooLarge => {
                write!(f, "instance limit cannot be greater than {UNLIMITED_INSTANCES}")
            }
        }
    }
}
impl Error for EndpointParamError {}
impl From<EndpointParamError> for io::Error {
    fn from(e: EndpointParamError) -> Self { io::Error::new(io::ErrorKind::InvalidInput, e) }
}

/// Replaces every backslash in the name with a forward slash.
///
/// Idempotent: normalizing an already-normalized name returns it unchanged (and unallocated).
pub fn normalize(name: &str) -> Cow<'_, str> {
    if name.contains('\\') {
        Cow::Owned(name.replace('\\', "/"))
    } else {
        Cow::Borrowed(name)
    }
}

/// Normalizes the name and prepends the [`NAMESPACE_PREFIX`], producing the full path the OS
/// understands.
pub fn to_pipe_path(name: &str) -> String {
    let normalized = normalize(name);
    let mut path = String::with_capacity(NAMESPACE_PREFIX.len().saturating_add(normalized.len()));
    path.push_str(NAMESPACE_PREFIX);
    path.push_str(&normalized);
    path
}

/// Validates the parameters of a create-style construction: the name and the instance limit.
pub fn validate_create(name: &str, instance_limit: u32) -> Result<(), EndpointParamError> {
    validate_open(name)?;
    if instance_limit == 0 {
        Err(EndpointParamError::ZeroInstanceLimit)
    } else if instance_limit > UNLIMITED_INSTANCES {
        Err(EndpointParamError::InstanceLimitTooLarge)
    } else {
        Ok(())
    }
}

/// Validates an endpoint name for open-style construction.
pub fn validate_open(name: &str) -> Result<(), EndpointParamError> {
    if name.is_empty() {
        Err(EndpointParamError::EmptyName)
    } else if name.len() > MAX_NAME_LEN {
        Err(EndpointParamError::NameTooLong)
    } else if name.contains('\0') {
        Err(EndpointParamError::NameContainsNul)
    } else {
        Ok(())
    }
}
