//! Common types for the CareHub client crates

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
