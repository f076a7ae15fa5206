//! Resource client for the project REST API
//!
//! Everything the console knows about the server goes through a
//! [`Transport`]. The HTTP transport talks to a real server; the memory
//! transport stands in for it in tests.

pub mod client;
pub mod error;
pub mod http;
#[cfg(test)]
pub mod memory;
pub mod transport;

pub use client::{ApiClient, ConversionReceipt, ListFilter, Resource, TestReceipt, DEFAULT_API_PREFIX};
pub use error::{ApiError, ErrorClass};
pub use http::HttpTransport;
#[cfg(test)]
pub use memory::MemoryTransport;
pub use transport::{ApiRequest, ApiResponse, Method, Transport};
