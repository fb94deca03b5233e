//! Library module: track descriptors, directory scanning and the providers
//! that resolve a track's path into bytes and tags.

mod model;
mod provider;
mod scan;

#[cfg(test)]
pub(crate) mod memory;

pub use model::*;
pub use provider::*;
pub use scan::scan;

#[cfg(test)]
mod tests;
