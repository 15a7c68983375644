#![cfg_attr(not(any(test, doctest, feature = "std")), no_std)]
#![doc = include_str!("../README.md")]

extern crate alloc;

mod error;
pub use error::*;
mod fixed;
pub use fixed::*;
mod pole;
pub use pole::*;
mod coefficients;
pub use coefficients::*;
mod lookahead;
pub use lookahead::*;
pub mod reference;
mod export;
pub use export::*;
mod config;
pub use config::*;

#[cfg(test)]
pub mod testing;
