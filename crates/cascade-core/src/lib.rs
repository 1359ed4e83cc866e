//! Cascade Core
//!
//! Domain types, host ports, and error handling shared by the Cascade crates.
//! The host (job storage, build queue, SCM clients) lives behind the traits in
//! [`ports`]; everything here is plain data.

pub mod build;
pub mod cause;
pub mod error;
pub mod ids;
pub mod ports;
pub mod result;

pub use error::{Error, Result};
pub use ids::*;
pub use result::BuildResult;
