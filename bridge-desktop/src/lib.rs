//! # Desktop Bridge Implementations
//!
//! Desktop implementations of the bridge traits:
//! - [`ReqwestHttpClient`] - HTTP operations via reqwest with retry support
//! - [`TokioFileSystem`] - Local file access via tokio

pub mod filesystem;
pub mod http;

pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
