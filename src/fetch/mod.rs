//! Network fetches tagged with lifecycle status.

mod adapter;
mod error;
mod transport;

pub use adapter::{configure_simple_fetch, SimpleFetch};
pub use error::FetchError;
pub use transport::{
    json_headers, simple_fetch, HttpTransport, RequestOptions, Transport, JSON_HEADER,
};
