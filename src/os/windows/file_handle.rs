use super::winprelude::*;
use std::fmt::{self, Debug, Formatter};

/// Newtype wrapper which ties pipe operations to an owned handle.
#[repr(transparent)]
pub(crate) struct FileHandle(OwnedHandle);

impl From<OwnedHandle> for FileHandle {
    #[inline]
    fn from(h: OwnedHandle) -> Self { Self(h) }
}
impl AsHandle for FileHandle {
    #[inline]
    fn as_handle(&self) -> BorrowedHandle<'_> { self.0.as_handle() }
}
impl AsRawHandle for FileHandle {
    #[inline]
    fn as_raw_handle(&self) -> RawHandle { self.0.as_raw_handle() }
}
impl Debug for FileHandle {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileHandle").field(&self.0.as_raw_handle()).finish()
    }
}
