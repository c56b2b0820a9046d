#![doc = include_str!("../README.md")]

mod client;
mod error;
mod filter;
mod model;
mod paginator;
mod store;

pub use crate::client::*;
pub use crate::error::*;
pub use crate::model::*;
pub use crate::paginator::*;
