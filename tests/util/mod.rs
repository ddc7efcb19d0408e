//! Shared test plumbing: error reporting and unique pipe-name generation.
#![allow(dead_code)]

use std::{
    sync::Mutex,
    time::{SystemTime, UNIX_EPOCH},
};

pub type TestResult<T = ()> = color_eyre::eyre::Result<T>;

static COLOR_EYRE_INSTALLED: Mutex<bool> = Mutex::new(false);
pub fn testinit() {
    let mut lock = COLOR_EYRE_INSTALLED.lock().unwrap();
    if !*lock {
        let _ = color_eyre::install();
        *lock = true;
    }
}

/// The 32-bit variant of the Xorshift PRNG algorithm.
///
/// Didn't feel like pulling in the `rand` crate, so have this here beauty instead.
#[repr(transparent)]
#[derive(Copy, Clone, Debug)]
pub struct Xorshift32(pub u32);
impl Xorshift32 {
    pub fn from_id(id: &str) -> Self {
        let dur = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_else(|e| e.duration());
        let mut seed = dur.subsec_nanos();
        for b in id.bytes() {
            seed = seed.rotate_left(7) ^ u32::from(b);
        }
        Self(seed | 1)
    }
    pub fn next(&mut self) -> u32 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 17;
        self.0 ^= self.0 << 5;
        self.0
    }
}

/// An infinite iterator of pipe names unlikely to collide with anything else on the machine.
#[derive(Copy, Clone, Debug)]
pub struct NameGen {
    rng: Xorshift32,
}
impl NameGen {
    pub fn new(id: &'static str) -> Self { Self { rng: Xorshift32::from_id(id) } }
}
impl Iterator for NameGen {
    type Item = String;
    fn next(&mut self) -> Option<Self::Item> {
        Some(format!("overlapped-pipe-test-{:08x}", self.rng.next()))
    }
}

macro_rules! make_id {
    () => {
        concat!(file!(), line!(), column!())
    };
}
