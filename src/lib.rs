#![doc = include_str!("../README.md")]

pub mod aggregate;
pub mod api;
pub mod assemble;
pub mod cache;
pub mod cli;
pub mod error;
pub mod fetch;
pub mod handicap;
pub mod log;
pub mod markers;
pub mod parse;
pub mod resolve;
pub mod types;

pub use error::*;
pub use handicap::{Favored, Handicap};
pub use types::*;
