//! # Box Provider
//!
//! Implements the `DocumentStorage` trait for the Box content API.
//!
//! ## Overview
//!
//! This module provides:
//! - Folder item listing with offset pagination
//! - Folder creation with structured name-conflict classification
//! - Multipart content uploads and new-version uploads
//! - Current-user lookup for connectivity verification
//! - Rate limiting and exponential backoff
//!
//! Authentication is the host's concern: the connector takes an already
//! acquired access token and attaches it as a bearer header.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::BoxConnector;
pub use error::{BoxError, Result};
