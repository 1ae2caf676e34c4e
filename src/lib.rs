#![doc = include_str!("../README.md")]

pub mod api;
pub mod batch;
pub mod cli;
pub mod client;
pub mod error;
pub mod log;
pub mod normalize;
pub mod runtime;
pub mod session;
pub mod types;

mod tests;

pub use error::*;
pub use types::*;
