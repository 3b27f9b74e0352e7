//! Port traits defining external boundaries.
//!
//! Each trait represents a boundary between the commit core and an external
//! system (the GitHub API, the local disk). Implementations live in
//! `src/adapters/`.

pub mod filesystem;
pub mod http;

pub use filesystem::FileSystem;
pub use http::{
    encode_path, HttpFuture, HttpRequest, HttpResponse, HttpTransport, Method, TransportError,
};
