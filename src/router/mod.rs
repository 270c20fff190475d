//! Router web admin integration module
//!
//! - `band`: frequency bands and their wire ordinals
//! - `parse`: page parsers, one per endpoint
//! - `session`: authenticated session and Wi-Fi operations

pub mod band;
pub mod parse;
pub mod session;

#[cfg(test)]
pub(crate) mod test_support;

pub use band::FrequencyBand;
pub use session::RouterSession;
