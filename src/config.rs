//! Configuration loader and schema types.
//!
//! This module exposes the settings schema that drives the relay (chunking,
//! delivery bounds, loop policy, library scan, logging) and helpers to load it.

mod load;
mod schema;

pub use load::InvalidSettings;
pub use schema::*;
