//! In-memory order service for tests and offline dry runs.
//!
//! Orders are kept in a map behind a read-write lock. Updates are applied as
//! sent, with no transition checks, so callers see exactly what their own
//! validation let through.

use crate::{ClientError, OrderApi};
use async_trait::async_trait;
use chrono::Utc;
use harvest_types::{
	Actor, ConfigSchema, Field, FieldType, Order, OrderQuery, OrderStatus, OrderUpdate, Schema,
	ValidationError,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-memory order store.
pub struct MemoryOrderApi {
	orders: Arc<RwLock<HashMap<String, Order>>>,
}

impl MemoryOrderApi {
	pub fn new() -> Self {
		Self {
			orders: Arc::new(RwLock::new(HashMap::new())),
		}
	}

	/// Creates a store holding the given orders.
	pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
		let map = orders
			.into_iter()
			.map(|order| (order.id.clone(), order))
			.collect();
		Self {
			orders: Arc::new(RwLock::new(map)),
		}
	}

	/// Adds or replaces an order.
	pub async fn insert(&self, order: Order) {
		self.orders.write().await.insert(order.id.clone(), order);
	}
}

impl Default for MemoryOrderApi {
	fn default() -> Self {
		Self::new()
	}
}

#[async_trait]
impl OrderApi for MemoryOrderApi {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryOrderApiSchema)
	}

	async fn get_order(&self, _actor: Actor, order_id: &str) -> Result<Order, ClientError> {
		self.orders
			.read()
			.await
			.get(order_id)
			.cloned()
			.ok_or_else(|| ClientError::NotFound(order_id.to_string()))
	}

	async fn list_orders(
		&self,
		_actor: Actor,
		query: &OrderQuery,
	) -> Result<Vec<Order>, ClientError> {
		let orders = self.orders.read().await;
		let mut matching: Vec<Order> = orders
			.values()
			.filter(|order| query.status.matches(&order.status))
			.cloned()
			.collect();
		matching.sort_by(|a, b| a.id.cmp(&b.id));

		let limit = query.limit.max(1) as usize;
		let skip = (query.page.max(1) as usize - 1) * limit;
		Ok(matching.into_iter().skip(skip).take(limit).collect())
	}

	async fn update_order(
		&self,
		_actor: Actor,
		order_id: &str,
		update: &OrderUpdate,
	) -> Result<Order, ClientError> {
		let mut orders = self.orders.write().await;
		let order = orders
			.get_mut(order_id)
			.ok_or_else(|| ClientError::NotFound(order_id.to_string()))?;

		let now = Utc::now();
		order.status = update.status.as_str().to_string();
		if update.tracking_number.is_some() {
			order.tracking_number = update.tracking_number.clone();
		}
		if update.estimated_arrival.is_some() {
			order.estimated_arrival = update.estimated_arrival;
		}
		if update.status == OrderStatus::Cancelled {
			order.cancelled_at = Some(now);
			if update.cancelled_reason.is_some() {
				order.cancelled_reason = update.cancelled_reason.clone();
			}
		}
		order.updated_at = Some(now);

		Ok(order.clone())
	}
}

/// Configuration schema for MemoryOrderApi.
pub struct MemoryOrderApiSchema;

impl MemoryOrderApiSchema {
	fn schema() -> Schema {
		let seed_order = Schema::new(
			vec![
				Field::new("id", FieldType::String),
				Field::new("status", FieldType::String).with_validator(|v| {
					let raw = v.as_str().unwrap_or_default();
					raw.parse::<OrderStatus>()
						.map(|_| ())
						.map_err(|e| e.to_string())
				}),
			],
			vec![Field::new("order_number", FieldType::String)],
		);
		Schema::new(
			vec![],
			vec![Field::new(
				"orders",
				FieldType::Array(Box::new(FieldType::Table(seed_order))),
			)],
		)
	}
}

impl ConfigSchema for MemoryOrderApiSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Self::schema().validate(config)
	}
}

/// Factory function to create the memory client from configuration.
///
/// Configuration parameters:
/// - `orders` (optional): seed orders, each with `id`, `status` and optionally `order_number`
pub fn create_order_api(config: &toml::Value) -> Result<Box<dyn OrderApi>, ClientError> {
	MemoryOrderApiSchema
		.validate(config)
		.map_err(|e| ClientError::Configuration(format!("Invalid memory configuration: {}", e)))?;

	let mut seeded = Vec::new();
	if let Some(entries) = config.get("orders").and_then(|v| v.as_array()) {
		for entry in entries {
			let id = entry.get("id").and_then(|v| v.as_str()).unwrap_or_default();
			let status: OrderStatus = entry
				.get("status")
				.and_then(|v| v.as_str())
				.unwrap_or_default()
				.parse()
				.map_err(|e| ClientError::Configuration(format!("{}", e)))?;
			let mut order = Order::new(id, status);
			order.order_number = entry
				.get("order_number")
				.and_then(|v| v.as_str())
				.map(str::to_string);
			seeded.push(order);
		}
	}

	tracing::debug!(orders = seeded.len(), "Seeded memory order client");
	Ok(Box::new(MemoryOrderApi::with_orders(seeded)))
}

/// Registry for the memory client implementation.
pub struct Registry;

impl harvest_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = crate::OrderApiFactory;

	fn factory() -> Self::Factory {
		create_order_api
	}
}

impl crate::OrderApiRegistry for Registry {}
