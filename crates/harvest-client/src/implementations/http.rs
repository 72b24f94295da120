//! HTTP client for the marketplace REST API.
//!
//! Sellers read and update orders under `/farmer/orders`. Buyers read under
//! `/orders` and can only cancel, through `/orders/{id}/cancel`. Every
//! response is wrapped in the `{ status, message, data }` envelope.

use crate::{ClientError, OrderApi};
use async_trait::async_trait;
use harvest_types::{
	Actor, ApiEnvelope, ConfigSchema, Field, FieldType, Order, OrderQuery, OrderStatus,
	OrderUpdate, Schema, SecretString, ValidationError,
};
use reqwest::{RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

/// Order list payloads differ between the seller and buyer endpoints.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OrderList {
	Flat(Vec<Order>),
	Wrapped { orders: Vec<Order> },
}

impl From<OrderList> for Vec<Order> {
	fn from(list: OrderList) -> Self {
		match list {
			OrderList::Flat(orders) | OrderList::Wrapped { orders } => orders,
		}
	}
}

#[derive(Debug, Serialize)]
struct CancelRequest<'a> {
	reason: &'a str,
}

/// REST client for the order service.
pub struct HttpOrderApi {
	client: reqwest::Client,
	base_url: Url,
	access_token: Option<SecretString>,
}

impl HttpOrderApi {
	/// Creates a client for `base_url` (e.g. `https://market.example.com/api/v1`).
	pub fn new(
		base_url: &str,
		access_token: Option<SecretString>,
		timeout: Duration,
	) -> Result<Self, ClientError> {
		let client = reqwest::Client::builder()
			.pool_idle_timeout(Duration::from_secs(90))
			.timeout(timeout)
			.build()
			.map_err(|e| ClientError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

		let base_url = Url::parse(base_url)
			.ok()
			.filter(|url| !url.cannot_be_a_base())
			.ok_or_else(|| ClientError::Configuration(format!("Invalid base_url: {}", base_url)))?;

		Ok(Self {
			client,
			base_url,
			access_token: access_token.filter(|token| !token.is_empty()),
		})
	}

	/// Whether requests carry a bearer token.
	pub fn is_authenticated(&self) -> bool {
		self.access_token.is_some()
	}

	/// Appends path segments to the base URL, percent-encoding each one.
	fn endpoint(&self, segments: &[&str]) -> Url {
		let mut url = self.base_url.clone();
		if let Ok(mut path) = url.path_segments_mut() {
			path.pop_if_empty().extend(segments);
		}
		url
	}

	fn list_url(&self, actor: Actor) -> Url {
		match actor {
			Actor::Farmer => self.endpoint(&["farmer", "orders"]),
			Actor::Buyer => self.endpoint(&["orders"]),
		}
	}

	/// URL of one order, optionally followed by an action such as `cancel`.
	///
	/// The id is always a single path segment. Ids that are empty or a dot
	/// segment would address a different resource, so they are refused.
	fn order_url(&self, actor: Actor, order_id: &str, action: Option<&str>) -> Result<Url, ClientError> {
		if order_id.is_empty() || order_id == "." || order_id == ".." {
			return Err(ClientError::NotFound(order_id.to_string()));
		}
		let mut url = self.list_url(actor);
		if let Ok(mut path) = url.path_segments_mut() {
			path.push(order_id);
			if let Some(action) = action {
				path.push(action);
			}
		}
		Ok(url)
	}

	/// Sends the request and unwraps the envelope's `data`.
	async fn send<T: DeserializeOwned>(
		&self,
		request: RequestBuilder,
		order_id: &str,
	) -> Result<T, ClientError> {
		self.send_envelope(request, order_id)
			.await?
			.data
			.ok_or_else(|| ClientError::Decode("Response envelope has no data".to_string()))
	}

	/// Sends the request and returns the envelope of a successful response.
	async fn send_envelope<T: DeserializeOwned>(
		&self,
		request: RequestBuilder,
		order_id: &str,
	) -> Result<ApiEnvelope<T>, ClientError> {
		let request = match &self.access_token {
			Some(token) => request.header(reqwest::header::AUTHORIZATION, token.bearer_header()),
			None => request,
		};

		let response = request
			.send()
			.await
			.map_err(|e| ClientError::Network(e.to_string()))?;
		let status = response.status();
		let body = response
			.bytes()
			.await
			.map_err(|e| ClientError::Network(e.to_string()))?;

		if !status.is_success() {
			let message = serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(&body)
				.ok()
				.and_then(|envelope| envelope.message)
				.unwrap_or_else(|| {
					status
						.canonical_reason()
						.unwrap_or("Request failed")
						.to_string()
				});
			return Err(match status {
				StatusCode::UNAUTHORIZED => ClientError::Unauthorized(message),
				StatusCode::NOT_FOUND => ClientError::NotFound(order_id.to_string()),
				_ => ClientError::Rejected {
					status: status.as_u16(),
					message,
				},
			});
		}

		let envelope: ApiEnvelope<T> =
			serde_json::from_slice(&body).map_err(|e| ClientError::Decode(e.to_string()))?;
		if let Some(message) = envelope.error_message() {
			return Err(ClientError::Rejected {
				status: status.as_u16(),
				message: message.to_string(),
			});
		}
		Ok(envelope)
	}
}

#[async_trait]
impl OrderApi for HttpOrderApi {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpOrderApiSchema)
	}

	async fn get_order(&self, actor: Actor, order_id: &str) -> Result<Order, ClientError> {
		let url = self.order_url(actor, order_id, None)?;
		tracing::debug!(%url, "Fetching order");
		self.send(self.client.get(url), order_id).await
	}

	async fn list_orders(
		&self,
		actor: Actor,
		query: &OrderQuery,
	) -> Result<Vec<Order>, ClientError> {
		let url = self.list_url(actor);
		tracing::debug!(%url, page = query.page, status = %query.status, "Listing orders");
		let request = self.client.get(url).query(&[
			("page", query.page.to_string()),
			("limit", query.limit.to_string()),
			("status", query.status.to_string()),
		]);
		let list: OrderList = self.send(request, "").await?;
		Ok(list.into())
	}

	async fn update_order(
		&self,
		actor: Actor,
		order_id: &str,
		update: &OrderUpdate,
	) -> Result<Order, ClientError> {
		match actor {
			Actor::Farmer => {
				let url = self.order_url(actor, order_id, None)?;
				tracing::debug!(%url, status = %update.status, "Updating order");
				self.send(self.client.patch(url).json(update), order_id)
					.await
			},
			Actor::Buyer => {
				if update.status != OrderStatus::Cancelled {
					return Err(ClientError::Rejected {
						status: StatusCode::FORBIDDEN.as_u16(),
						message: "Buyers can only cancel orders".to_string(),
					});
				}
				let url = self.order_url(actor, order_id, Some("cancel"))?;
				let reason = update.cancelled_reason.as_deref().unwrap_or_default();
				tracing::debug!(%url, "Cancelling order");
				let envelope: ApiEnvelope<serde_json::Value> = self
					.send_envelope(
						self.client.patch(url).json(&CancelRequest { reason }),
						order_id,
					)
					.await?;

				// The cancel response only carries the id, status and refund,
				// so read the full order back. The cancel already happened: a
				// failed read falls back to what the cancel response said.
				match self.get_order(actor, order_id).await {
					Ok(order) => Ok(order),
					Err(e) => {
						tracing::warn!(order_id, "Order cancelled but could not be re-read: {}", e);
						let mut order = envelope
							.data
							.and_then(|data| serde_json::from_value::<Order>(data).ok())
							.unwrap_or_else(|| Order::new(order_id, OrderStatus::Cancelled));
						if order.cancelled_reason.is_none() && !reason.is_empty() {
							order.cancelled_reason = Some(reason.to_string());
						}
						Ok(order)
					},
				}
			},
		}
	}
}

/// Configuration schema for HttpOrderApi.
pub struct HttpOrderApiSchema;

impl HttpOrderApiSchema {
	fn schema() -> Schema {
		Schema::new(
			vec![Field::new("base_url", FieldType::String).with_validator(|v| {
				let url = v.as_str().unwrap_or_default();
				if url.starts_with("http://") || url.starts_with("https://") {
					Ok(())
				} else {
					Err("must start with http:// or https://".to_string())
				}
			})],
			vec![
				Field::new("access_token", FieldType::String),
				Field::new(
					"timeout_seconds",
					FieldType::Integer {
						min: Some(1),
						max: Some(300),
					},
				),
			],
		)
	}
}

impl ConfigSchema for HttpOrderApiSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Self::schema().validate(config)
	}
}

/// Factory function to create the HTTP client from configuration.
///
/// Configuration parameters:
/// - `base_url`: API root, e.g. `https://market.example.com/api/v1`
/// - `access_token` (optional): bearer token sent with every request
/// - `timeout_seconds` (optional): request timeout, default 30
pub fn create_order_api(config: &toml::Value) -> Result<Box<dyn OrderApi>, ClientError> {
	HttpOrderApiSchema
		.validate(config)
		.map_err(|e| ClientError::Configuration(format!("Invalid http configuration: {}", e)))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| ClientError::Configuration("base_url is required".to_string()))?;
	let access_token = config
		.get("access_token")
		.and_then(|v| v.as_str())
		.map(SecretString::from);
	let timeout = config
		.get("timeout_seconds")
		.and_then(|v| v.as_integer())
		.map(|secs| secs as u64)
		.unwrap_or(DEFAULT_TIMEOUT_SECONDS);

	let api = HttpOrderApi::new(base_url, access_token, Duration::from_secs(timeout))?;
	if !api.is_authenticated() {
		tracing::warn!("No access_token configured; requests will be unauthenticated");
	}

	Ok(Box::new(api))
}

/// Registry for the HTTP client implementation.
pub struct Registry;

impl harvest_types::ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = crate::OrderApiFactory;

	fn factory() -> Self::Factory {
		create_order_api
	}
}

impl crate::OrderApiRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		extract::{Path, Query},
		http::{HeaderMap, StatusCode as AxumStatus},
		routing::{get, patch},
		Json, Router,
	};
	use serde_json::{json, Value};
	use std::collections::HashMap;
	use std::sync::{Arc, Mutex};
	use tokio::net::TcpListener;

	/// Bodies received by the fake service, keyed by path.
	type Received = Arc<Mutex<Vec<(String, Value)>>>;

	fn authorized(headers: &HeaderMap) -> bool {
		headers
			.get("authorization")
			.and_then(|v| v.to_str().ok())
			.is_some_and(|v| v == "Bearer test-token")
	}

	async fn spawn_service(received: Received) -> String {
		let seller_get = |Path(id): Path<String>, headers: HeaderMap| async move {
			if !authorized(&headers) {
				return (
					AxumStatus::UNAUTHORIZED,
					Json(json!({ "status": "error", "message": "Unauthorized" })),
				);
			}
			if id == "missing" {
				return (
					AxumStatus::NOT_FOUND,
					Json(json!({ "status": "error", "message": "Order not found" })),
				);
			}
			(
				AxumStatus::OK,
				Json(json!({
					"status": "success",
					"data": { "id": id, "order_number": "ORD-1", "status": "processing" }
				})),
			)
		};

		let seller_patch = {
			let received = received.clone();
			move |Path(id): Path<String>, Json(body): Json<Value>| {
				let received = received.clone();
				async move {
					received
						.lock()
						.unwrap()
						.push((format!("/farmer/orders/{}", id), body.clone()));
					if body["status"] == "delivered" {
						return (
							AxumStatus::BAD_REQUEST,
							Json(json!({
								"status": "error",
								"message": "Cannot transition from processing to delivered"
							})),
						);
					}
					(
						AxumStatus::OK,
						Json(json!({
							"status": "success",
							"message": "Order updated successfully",
							"data": {
								"id": id,
								"status": body["status"],
								"tracking_number": body.get("tracking_number"),
							}
						})),
					)
				}
			}
		};

		let seller_list = |Query(params): Query<HashMap<String, String>>| async move {
			let status = params.get("status").cloned().unwrap_or_default();
			Json(json!({
				"status": "success",
				"data": [{ "id": "ord-1", "status": status }],
				"pagination": { "current_page": 1 }
			}))
		};

		let buyer_get = |Path(id): Path<String>| async move {
			Json(json!({
				"status": "success",
				"data": { "order_id": id, "status": "cancelled", "cancelled_reason": "Changed my mind" }
			}))
		};

		let buyer_cancel = {
			let received = received.clone();
			move |Path(id): Path<String>, Json(body): Json<Value>| {
				let received = received.clone();
				async move {
					received
						.lock()
						.unwrap()
						.push((format!("/orders/{}/cancel", id), body));
					Json(json!({
						"status": "success",
						"data": { "order_id": id, "status": "cancelled", "refund": null }
					}))
				}
			}
		};

		let app = Router::new()
			.route("/api/v1/farmer/orders", get(seller_list))
			.route("/api/v1/farmer/orders/{id}", get(seller_get).patch(seller_patch))
			.route("/api/v1/orders/{id}", get(buyer_get))
			.route("/api/v1/orders/{id}/cancel", patch(buyer_cancel));

		serve(app).await
	}

	async fn serve(app: Router) -> String {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			axum::serve(listener, app).await.unwrap();
		});
		format!("http://{}/api/v1/", addr)
	}

	fn client(base_url: &str, token: Option<&str>) -> HttpOrderApi {
		HttpOrderApi::new(base_url, token.map(SecretString::from), Duration::from_secs(5)).unwrap()
	}

	#[tokio::test]
	async fn test_get_order_as_seller() {
		let base = spawn_service(Received::default()).await;
		let api = client(&base, Some("test-token"));

		let order = api.get_order(Actor::Farmer, "ord-1").await.unwrap();
		assert_eq!(order.id, "ord-1");
		assert_eq!(order.status(), Ok(OrderStatus::Processing));
		assert_eq!(order.order_number.as_deref(), Some("ORD-1"));
	}

	#[tokio::test]
	async fn test_missing_token_is_unauthorized() {
		let base = spawn_service(Received::default()).await;
		let api = client(&base, None);

		let result = api.get_order(Actor::Farmer, "ord-1").await;
		assert!(matches!(result, Err(ClientError::Unauthorized(msg)) if msg == "Unauthorized"));
	}

	#[tokio::test]
	async fn test_not_found() {
		let base = spawn_service(Received::default()).await;
		let api = client(&base, Some("test-token"));

		let result = api.get_order(Actor::Farmer, "missing").await;
		assert!(matches!(result, Err(ClientError::NotFound(id)) if id == "missing"));
	}

	#[tokio::test]
	async fn test_seller_update_sends_body() {
		let received = Received::default();
		let base = spawn_service(received.clone()).await;
		let api = client(&base, Some("test-token"));

		let update = OrderUpdate {
			tracking_number: Some("TRK123".into()),
			..OrderUpdate::status(OrderStatus::Shipped)
		};
		let order = api.update_order(Actor::Farmer, "ord-1", &update).await.unwrap();
		assert_eq!(order.status, "shipped");
		assert_eq!(order.tracking_number.as_deref(), Some("TRK123"));

		let received = received.lock().unwrap();
		assert_eq!(received.len(), 1);
		assert_eq!(received[0].0, "/farmer/orders/ord-1");
		assert_eq!(
			received[0].1,
			json!({ "status": "shipped", "tracking_number": "TRK123" })
		);
	}

	#[tokio::test]
	async fn test_backend_rejection_carries_message() {
		let base = spawn_service(Received::default()).await;
		let api = client(&base, Some("test-token"));

		let result = api
			.update_order(
				Actor::Farmer,
				"ord-1",
				&OrderUpdate::status(OrderStatus::Delivered),
			)
			.await;
		match result {
			Err(ClientError::Rejected { status, message }) => {
				assert_eq!(status, 400);
				assert_eq!(message, "Cannot transition from processing to delivered");
			},
			other => panic!("expected rejection, got {:?}", other.map(|o| o.status)),
		}
	}

	#[tokio::test]
	async fn test_buyer_cancel_then_refetch() {
		let received = Received::default();
		let base = spawn_service(received.clone()).await;
		let api = client(&base, Some("test-token"));

		let update = OrderUpdate {
			cancelled_reason: Some("Changed my mind".into()),
			..OrderUpdate::status(OrderStatus::Cancelled)
		};
		let order = api.update_order(Actor::Buyer, "ord-9", &update).await.unwrap();
		assert_eq!(order.id, "ord-9");
		assert_eq!(order.status(), Ok(OrderStatus::Cancelled));

		let received = received.lock().unwrap();
		assert_eq!(received[0].0, "/orders/ord-9/cancel");
		assert_eq!(received[0].1, json!({ "reason": "Changed my mind" }));
	}

	#[tokio::test]
	async fn test_buyer_cannot_send_other_updates() {
		let received = Received::default();
		let base = spawn_service(received.clone()).await;
		let api = client(&base, Some("test-token"));

		let result = api
			.update_order(
				Actor::Buyer,
				"ord-9",
				&OrderUpdate::status(OrderStatus::Confirmed),
			)
			.await;
		assert!(matches!(result, Err(ClientError::Rejected { status: 403, .. })));
		assert!(received.lock().unwrap().is_empty());
	}

	#[tokio::test]
	async fn test_list_orders_passes_filter() {
		let base = spawn_service(Received::default()).await;
		let api = client(&base, Some("test-token"));

		let query = OrderQuery {
			status: harvest_types::StatusFilter::Only(OrderStatus::Shipped),
			..OrderQuery::default()
		};
		let orders = api.list_orders(Actor::Farmer, &query).await.unwrap();
		assert_eq!(orders.len(), 1);
		assert_eq!(orders[0].status, "shipped");
	}

	#[test]
	fn test_factory_validates_config() {
		let config: toml::Value = toml::from_str(r#"base_url = "market.example.com""#).unwrap();
		assert!(matches!(
			create_order_api(&config),
			Err(ClientError::Configuration(_))
		));

		let config: toml::Value = toml::from_str(
			r#"
			base_url = "https://market.example.com/api/v1"
			access_token = "abc"
			timeout_seconds = 10
			"#,
		)
		.unwrap();
		assert!(create_order_api(&config).is_ok());
	}

	#[tokio::test]
	async fn test_cancel_survives_failed_read_back() {
		let app = Router::new()
			.route(
				"/api/v1/orders/{id}",
				get(|| async {
					(
						AxumStatus::INTERNAL_SERVER_ERROR,
						Json(json!({ "status": "error", "message": "Failed to fetch order" })),
					)
				}),
			)
			.route(
				"/api/v1/orders/{id}/cancel",
				patch(|Path(id): Path<String>| async move {
					Json(json!({
						"status": "success",
						"data": { "order_id": id, "status": "cancelled", "refund": null }
					}))
				}),
			);
		let base = serve(app).await;
		let api = client(&base, Some("test-token"));

		let update = OrderUpdate {
			cancelled_reason: Some("Changed my mind".into()),
			..OrderUpdate::status(OrderStatus::Cancelled)
		};
		let order = api.update_order(Actor::Buyer, "ord-7", &update).await.unwrap();
		assert_eq!(order.id, "ord-7");
		assert_eq!(order.status(), Ok(OrderStatus::Cancelled));
		assert_eq!(order.cancelled_reason.as_deref(), Some("Changed my mind"));
	}

	#[tokio::test]
	async fn test_order_id_stays_one_path_segment() {
		let received = Received::default();
		let base = spawn_service(received.clone()).await;
		let api = client(&base, Some("test-token"));

		let order = api.get_order(Actor::Farmer, "a/b?c").await.unwrap();
		assert_eq!(order.id, "a/b?c");

		api.update_order(
			Actor::Farmer,
			"../../admin/orders/ord-1?x=",
			&OrderUpdate::status(OrderStatus::Confirmed),
		)
		.await
		.unwrap();
		let received = received.lock().unwrap();
		assert_eq!(received[0].0, "/farmer/orders/../../admin/orders/ord-1?x=");
	}

	#[tokio::test]
	async fn test_dot_segment_ids_are_refused() {
		let api = client("http://127.0.0.1:9/api/v1", None);
		for id in ["", ".", ".."] {
			let result = api.get_order(Actor::Farmer, id).await;
			assert!(matches!(result, Err(ClientError::NotFound(_))), "id {:?}", id);
		}
	}

	#[test]
	fn test_blank_token_is_unauthenticated() {
		assert!(!client("https://market.example.com/api/v1", Some("   ")).is_authenticated());
		assert!(!client("https://market.example.com/api/v1", None).is_authenticated());
		assert!(client("https://market.example.com/api/v1", Some("abc")).is_authenticated());

		let config: toml::Value = toml::from_str(
			r#"
			base_url = "https://market.example.com/api/v1"
			access_token = ""
			"#,
		)
		.unwrap();
		assert!(create_order_api(&config).is_ok());
	}
}
