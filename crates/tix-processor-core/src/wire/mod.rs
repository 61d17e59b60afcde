//! Binary observation codec.
//!
//! Reports carry their observations as a base64 string wrapping a block of
//! fixed-width big-endian records. This module decodes that block into
//! `Observation` values and re-encodes it byte-exactly for round-trips.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::WireError;
pub use parser::{deserialize_observations, serialize_observations};
