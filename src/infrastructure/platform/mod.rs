//! Platform HTTP access

pub mod error;
pub mod transport;

pub use error::TransportError;
pub use transport::{PlatformTransport, TransportResponse};
