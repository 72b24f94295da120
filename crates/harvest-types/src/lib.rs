//! Common types module for the harvest order tooling.
//!
//! This module defines the data types shared by the lifecycle policy, the
//! order API clients, configuration and the command-line front end. Keeping
//! them in one crate gives every component the same canonical order status.

/// API envelope and error response types used by the marketplace REST API.
pub mod api;
/// Order wire model, update requests and list queries.
pub mod order;
/// Registry trait for self-registering client implementations.
pub mod registry;
/// Secret string wrapper for access tokens.
pub mod secret_string;
/// Canonical order status, buyer projection and acting roles.
pub mod status;
/// Configuration validation types for implementation-specific TOML tables.
pub mod validation;

pub use api::*;
pub use order::*;
pub use registry::ImplementationRegistry;
pub use secret_string::SecretString;
pub use status::*;
pub use validation::*;
