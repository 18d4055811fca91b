//! Access to the coordination backend over HTTP.
//!
//! All endpoints answer with a `{ data, message }` envelope. The
//! [`ApiClient`] unwraps it, normalises the records it carries, and maps
//! every failure into a single [`Error`] whose `Display` is the message to
//! show the user.

mod client;
pub use client::{ApiClient, CacheEntry, Geolocation, ImageAnalysis, NearbyQuery};

mod envelope;

mod error;
pub use error::Error;

#[cfg(test)]
pub(crate) mod stub;
