//! Order service client module for the harvest tooling.
//!
//! This module defines the [`OrderApi`] interface through which every order
//! read and status update reaches the external order service. Callers hold
//! it as `Arc<dyn OrderApi>`, which keeps the lifecycle policy free of I/O and
//! lets tests substitute an in-memory or mocked backend.

use async_trait::async_trait;
use harvest_types::{Actor, ConfigSchema, ImplementationRegistry, Order, OrderQuery, OrderUpdate};
use std::collections::HashMap;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod memory;
}

/// Errors that can occur while talking to the order service.
#[derive(Debug, Error)]
pub enum ClientError {
	/// The request could not be sent or the connection failed.
	#[error("Network error: {0}")]
	Network(String),
	/// The access token is missing, expired or invalid.
	#[error("Unauthorized: {0}")]
	Unauthorized(String),
	/// The order does not exist or is not visible to the actor.
	#[error("Order not found: {0}")]
	NotFound(String),
	/// The service refused the request.
	#[error("{message}")]
	Rejected { status: u16, message: String },
	/// The response body could not be decoded.
	#[error("Failed to decode response: {0}")]
	Decode(String),
	/// The backend configuration is invalid.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Interface to the external order service.
///
/// `update_order` is the only call that changes an order. Implementations
/// send exactly one update per invocation and never retry.
#[async_trait]
pub trait OrderApi: Send + Sync {
	/// Returns the configuration schema for this implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Fetches a single order as seen by `actor`.
	async fn get_order(&self, actor: Actor, order_id: &str) -> Result<Order, ClientError>;

	/// Lists the seller's orders.
	async fn list_orders(&self, actor: Actor, query: &OrderQuery)
		-> Result<Vec<Order>, ClientError>;

	/// Issues a partial update and returns the order as stored afterwards.
	async fn update_order(
		&self,
		actor: Actor,
		order_id: &str,
		update: &OrderUpdate,
	) -> Result<Order, ClientError>;
}

/// Type alias for client factory functions.
pub type OrderApiFactory = fn(&toml::Value) -> Result<Box<dyn OrderApi>, ClientError>;

/// Registry trait for client implementations.
pub trait OrderApiRegistry: ImplementationRegistry<Factory = OrderApiFactory> {}

/// Get all registered client implementations.
///
/// Returns a vector of (name, factory) tuples for all available implementations.
pub fn get_all_implementations() -> Vec<(&'static str, OrderApiFactory)> {
	use implementations::{http, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Builds the implementation named `primary` from its configuration table.
pub fn create_order_api(
	primary: &str,
	implementations: &HashMap<String, toml::Value>,
) -> Result<Box<dyn OrderApi>, ClientError> {
	let config = implementations.get(primary).ok_or_else(|| {
		ClientError::Configuration(format!("No configuration for client '{}'", primary))
	})?;

	let factory = get_all_implementations()
		.into_iter()
		.find(|(name, _)| *name == primary)
		.map(|(_, factory)| factory)
		.ok_or_else(|| {
			ClientError::Configuration(format!("Unknown client implementation '{}'", primary))
		})?;

	tracing::info!(client = primary, "Creating order client");
	factory(config)
}
