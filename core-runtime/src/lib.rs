//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the certification media
//! upload core:
//! - Logging and tracing infrastructure
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities the other crates depend on. It
//! establishes the logging conventions and the event broadcasting mechanism
//! through which the background upload worker reports progress back to its
//! host.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
