#![doc = include_str!("../README.md")]

mod client;
mod error;
mod page_iterator;
mod paginator;
mod pool;
mod sync;
#[cfg(test)]
mod testing;

pub use crate::client::*;
pub use crate::error::*;
pub use crate::page_iterator::*;
pub use crate::paginator::*;
pub use crate::pool::*;
pub use crate::sync::*;
