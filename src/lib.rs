#![doc = include_str!("../README.md")]
#![warn(
    missing_docs,
    clippy::panic_in_result_fn,
    clippy::missing_assert_message,
    clippy::indexing_slicing,
    clippy::arithmetic_side_effects
)]

mod enums;
pub use enums::*;

pub mod name;

/// Platform-specific functionality.
///
/// Only the `windows` module exists at the moment, since overlapped I/O on named pipes is a
/// Windows facility. The pure parts of the crate ([`name`](crate::name), [`PipeMode`],
/// [`Outcome`]) are available on every platform.
pub mod os {
    #[cfg(windows)]
    pub mod windows;
}

mod misc;
#[cfg_attr(not(windows), allow(unused_imports))]
pub(crate) use misc::*;
