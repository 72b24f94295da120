//! Order state machine implementation.
//!
//! Checks every requested status change against the lifecycle table before
//! anything is sent, then issues exactly one update call through the injected
//! [`OrderApi`]. A rejected transition never reaches the network.

use chrono::{DateTime, Utc};
use harvest_client::{ClientError, OrderApi};
use harvest_types::{Actor, Order, OrderQuery, OrderStatus, OrderUpdate};
use std::sync::Arc;
use thiserror::Error;

use crate::lifecycle::{self, TransitionError};

/// Errors that can occur while changing an order's status.
#[derive(Debug, Error)]
pub enum OrderStateError {
	/// The lifecycle table does not allow the move.
	#[error(transparent)]
	Transition(#[from] TransitionError),
	/// The order's status has no advance action.
	#[error("No next step is available for a {0} order")]
	NoAdvanceAction(String),
	/// Buyers must say why they cancel.
	#[error("Please provide a reason for cancellation")]
	ReasonRequired,
	/// The order service failed or refused the request.
	#[error(transparent)]
	Client(#[from] ClientError),
}

/// Optional data carried along with a transition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransitionExtras {
	/// Attached only when shipping.
	pub tracking_number: Option<String>,
	/// Attached only when shipping.
	pub estimated_arrival: Option<DateTime<Utc>>,
	/// Attached only when cancelling.
	pub cancelled_reason: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
	value
		.map(|v| v.trim().to_string())
		.filter(|v| !v.is_empty())
}

/// Validates and issues order status changes for one actor.
pub struct OrderStateMachine {
	api: Arc<dyn OrderApi>,
	actor: Actor,
}

impl OrderStateMachine {
	pub fn new(api: Arc<dyn OrderApi>, actor: Actor) -> Self {
		Self { api, actor }
	}

	pub fn actor(&self) -> Actor {
		self.actor
	}

	/// Gets an order by ID
	pub async fn get_order(&self, order_id: &str) -> Result<Order, OrderStateError> {
		Ok(self.api.get_order(self.actor, order_id).await?)
	}

	pub async fn list_orders(&self, query: &OrderQuery) -> Result<Vec<Order>, OrderStateError> {
		Ok(self.api.list_orders(self.actor, query).await?)
	}

	/// Checks whether this actor may move `order` to `requested`.
	///
	/// Returns the order's current status on success. An order whose status
	/// is not recognized can't be moved anywhere.
	pub fn check_transition(
		&self,
		order: &Order,
		requested: OrderStatus,
	) -> Result<OrderStatus, TransitionError> {
		let current = order
			.status()
			.map_err(|_| TransitionError::InvalidTransition {
				from: order.status.clone(),
				to: requested.to_string(),
			})?;
		lifecycle::validate_transition_for(self.actor, current, requested)?;
		Ok(current)
	}

	/// Builds the update body, keeping only the extras that belong to this move.
	pub fn build_update(
		current: OrderStatus,
		requested: OrderStatus,
		extras: TransitionExtras,
	) -> OrderUpdate {
		let mut update = OrderUpdate::status(requested);
		if lifecycle::auxiliary_input(current, requested).is_some() {
			update.tracking_number = non_blank(extras.tracking_number);
			update.estimated_arrival = extras.estimated_arrival;
		}
		if requested == OrderStatus::Cancelled {
			update.cancelled_reason = non_blank(extras.cancelled_reason);
		}
		update
	}

	/// Transitions an order to a new status with validation.
	pub async fn transition(
		&self,
		order: &Order,
		requested: OrderStatus,
		extras: TransitionExtras,
	) -> Result<Order, OrderStateError> {
		let current = match self.check_transition(order, requested) {
			Ok(current) => current,
			Err(e) => {
				tracing::warn!(order_id = %order.id, actor = %self.actor, "{}", e);
				return Err(e.into());
			},
		};

		let update = Self::build_update(current, requested, extras);
		tracing::info!(
			order_id = %order.id,
			actor = %self.actor,
			from = %current,
			to = %requested,
			"Updating order status"
		);

		self.api
			.update_order(self.actor, &order.id, &update)
			.await
			.map_err(|e| {
				tracing::warn!(order_id = %order.id, "Order update failed: {}", e);
				OrderStateError::Client(e)
			})
	}

	/// Performs the order's advance action, e.g. "Confirm Order" on a pending order.
	pub async fn advance(
		&self,
		order: &Order,
		tracking_number: Option<String>,
	) -> Result<Order, OrderStateError> {
		let next = order
			.status()
			.ok()
			.and_then(lifecycle::next_status)
			.ok_or_else(|| OrderStateError::NoAdvanceAction(order.status.clone()))?;

		let extras = TransitionExtras {
			tracking_number,
			..Default::default()
		};
		self.transition(order, next, extras).await
	}

	/// Cancels the order. Buyers must give a reason.
	pub async fn cancel(
		&self,
		order: &Order,
		reason: Option<String>,
	) -> Result<Order, OrderStateError> {
		self.check_transition(order, OrderStatus::Cancelled)?;

		let reason = non_blank(reason);
		if self.actor == Actor::Buyer && reason.is_none() {
			return Err(OrderStateError::ReasonRequired);
		}

		let extras = TransitionExtras {
			cancelled_reason: reason,
			..Default::default()
		};
		self.transition(order, OrderStatus::Cancelled, extras).await
	}
}

#[cfg(test)]
pub(crate) mod tests {
	use super::*;
	use async_trait::async_trait;
	use harvest_client::implementations::memory::MemoryOrderApi;
	use harvest_types::ConfigSchema;
	use mockall::{mock, predicate::*};

	mock! {
		pub Api {}

		#[async_trait]
		impl OrderApi for Api {
			fn config_schema(&self) -> Box<dyn ConfigSchema>;
			async fn get_order(&self, actor: Actor, order_id: &str) -> Result<Order, ClientError>;
			async fn list_orders(&self, actor: Actor, query: &OrderQuery) -> Result<Vec<Order>, ClientError>;
			async fn update_order(
				&self,
				actor: Actor,
				order_id: &str,
				update: &OrderUpdate,
			) -> Result<Order, ClientError>;
		}
	}

	fn farmer(api: impl OrderApi + 'static) -> OrderStateMachine {
		OrderStateMachine::new(Arc::new(api), Actor::Farmer)
	}

	#[tokio::test]
	async fn test_rejected_transition_makes_no_call() {
		let mut api = MockApi::new();
		api.expect_update_order().never();
		let machine = farmer(api);

		let order = Order::new("ord-1", OrderStatus::Pending);
		let result = machine
			.transition(&order, OrderStatus::Shipped, TransitionExtras::default())
			.await;

		assert!(matches!(
			result,
			Err(OrderStateError::Transition(TransitionError::InvalidTransition { .. }))
		));
	}

	#[tokio::test]
	async fn test_unknown_status_is_never_sent() {
		let mut api = MockApi::new();
		api.expect_update_order().never();
		let machine = farmer(api);

		let mut order = Order::new("ord-1", OrderStatus::Pending);
		order.status = "on_hold".to_string();
		let result = machine
			.transition(&order, OrderStatus::Cancelled, TransitionExtras::default())
			.await;

		match result {
			Err(OrderStateError::Transition(TransitionError::InvalidTransition { from, to })) => {
				assert_eq!(from, "on_hold");
				assert_eq!(to, "cancelled");
			},
			other => panic!("unexpected result: {:?}", other),
		}
	}

	#[tokio::test]
	async fn test_allowed_transition_issues_one_update() {
		let mut api = MockApi::new();
		api.expect_update_order()
			.with(
				eq(Actor::Farmer),
				eq("ord-1"),
				eq(OrderUpdate::status(OrderStatus::Confirmed)),
			)
			.times(1)
			.returning(|_, id, update| {
				let mut order = Order::new(id, update.status);
				order.order_number = Some("ORD-1".into());
				Ok(order)
			});
		let machine = farmer(api);

		let order = Order::new("ord-1", OrderStatus::Pending);
		let updated = machine
			.transition(&order, OrderStatus::Confirmed, TransitionExtras::default())
			.await
			.unwrap();
		assert_eq!(updated.status(), Ok(OrderStatus::Confirmed));
	}

	#[tokio::test]
	async fn test_backend_rejection_is_not_retried() {
		let mut api = MockApi::new();
		api.expect_update_order().times(1).returning(|_, _, _| {
			Err(ClientError::Rejected {
				status: 409,
				message: "Order was modified by another user".into(),
			})
		});
		let machine = farmer(api);

		let order = Order::new("ord-1", OrderStatus::Confirmed);
		let result = machine
			.transition(&order, OrderStatus::Processing, TransitionExtras::default())
			.await;

		let err = result.unwrap_err();
		assert_eq!(err.to_string(), "Order was modified by another user");
	}

	#[test]
	fn test_build_update_keeps_only_relevant_extras() {
		let extras = TransitionExtras {
			tracking_number: Some("  TRK123 ".into()),
			estimated_arrival: None,
			cancelled_reason: Some("not needed".into()),
		};

		let ship = OrderStateMachine::build_update(
			OrderStatus::Processing,
			OrderStatus::Shipped,
			extras.clone(),
		);
		assert_eq!(ship.tracking_number.as_deref(), Some("TRK123"));
		assert_eq!(ship.cancelled_reason, None);

		let confirm =
			OrderStateMachine::build_update(OrderStatus::Pending, OrderStatus::Confirmed, extras);
		assert_eq!(confirm, OrderUpdate::status(OrderStatus::Confirmed));
	}

	#[test]
	fn test_blank_tracking_number_is_dropped() {
		let update = OrderStateMachine::build_update(
			OrderStatus::Processing,
			OrderStatus::Shipped,
			TransitionExtras {
				tracking_number: Some("   ".into()),
				..Default::default()
			},
		);
		assert_eq!(update, OrderUpdate::status(OrderStatus::Shipped));
	}

	#[tokio::test]
	async fn test_advance_follows_action_table() {
		let api = MemoryOrderApi::with_orders([Order::new("ord-1", OrderStatus::Shipped)]);
		let machine = farmer(api);

		let order = machine.get_order("ord-1").await.unwrap();
		let order = machine.advance(&order, None).await.unwrap();
		assert_eq!(order.status(), Ok(OrderStatus::Delivered));
		let order = machine.advance(&order, None).await.unwrap();
		assert_eq!(order.status(), Ok(OrderStatus::Completed));

		let result = machine.advance(&order, None).await;
		assert!(matches!(result, Err(OrderStateError::NoAdvanceAction(s)) if s == "completed"));
	}

	#[tokio::test]
	async fn test_pending_payment_has_no_advance() {
		let mut api = MockApi::new();
		api.expect_update_order().never();
		let machine = farmer(api);

		let order = Order::new("ord-1", OrderStatus::PendingPayment);
		let result = machine.advance(&order, None).await;
		assert!(matches!(result, Err(OrderStateError::NoAdvanceAction(_))));
	}

	#[tokio::test]
	async fn test_buyer_cancel_requires_reason() {
		let mut api = MockApi::new();
		api.expect_update_order().never();
		let machine = OrderStateMachine::new(Arc::new(api), Actor::Buyer);

		let order = Order::new("ord-1", OrderStatus::Confirmed);
		let result = machine.cancel(&order, Some("  ".into())).await;
		assert!(matches!(result, Err(OrderStateError::ReasonRequired)));
	}

	#[tokio::test]
	async fn test_buyer_cannot_cancel_after_processing() {
		let mut api = MockApi::new();
		api.expect_update_order().never();
		let machine = OrderStateMachine::new(Arc::new(api), Actor::Buyer);

		let order = Order::new("ord-1", OrderStatus::Processing);
		let result = machine.cancel(&order, Some("Too slow".into())).await;
		assert!(matches!(result, Err(OrderStateError::Transition(_))));
	}

	#[tokio::test]
	async fn test_buyer_cannot_advance() {
		let mut api = MockApi::new();
		api.expect_update_order().never();
		let machine = OrderStateMachine::new(Arc::new(api), Actor::Buyer);

		let order = Order::new("ord-1", OrderStatus::Pending);
		let result = machine.advance(&order, None).await;
		assert!(matches!(result, Err(OrderStateError::Transition(_))));
	}

	#[tokio::test]
	async fn test_farmer_cancel_carries_optional_reason() {
		let api = MemoryOrderApi::with_orders([Order::new("ord-1", OrderStatus::PendingPayment)]);
		let machine = farmer(api);

		let order = machine.get_order("ord-1").await.unwrap();
		let cancelled = machine.cancel(&order, None).await.unwrap();
		assert_eq!(cancelled.status(), Ok(OrderStatus::Cancelled));
		assert!(cancelled.cancelled_reason.is_none());
		assert!(cancelled.cancelled_at.is_some());
	}
}
