#![deny(clippy::all, clippy::pedantic)]
#![deny(clippy::unwrap_used, clippy::expect_used)]

//! Minimal host for running WebAssembly modules compiled from C test
//! programs: a fixed linear memory, a small libc-style import surface, and a
//! classification of how each run ended.

pub mod cli;
pub mod error;
pub mod harness;
pub mod logging;
pub mod runtime;

pub use error::{Error, Result};
pub use harness::Harness;
pub use runtime::{Fault, HostOptions, RunOutcome, RunReport};
