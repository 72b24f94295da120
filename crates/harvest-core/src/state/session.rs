//! View state for a single order.
//!
//! An `OrderSession` is what an order detail screen holds: the order as
//! last confirmed by the service and at most one error message. A failed
//! action leaves the order untouched and records the message until it is
//! dismissed or the next action succeeds. Nothing is retried.

use chrono::{DateTime, Utc};
use harvest_types::{Order, OrderStatus};

use super::order::{OrderStateError, OrderStateMachine, TransitionExtras};
use crate::lifecycle::{self, OrderActions};

/// The order being viewed plus its dismissible error.
pub struct OrderSession {
	machine: OrderStateMachine,
	order: Order,
	error: Option<String>,
}

impl OrderSession {
	pub fn new(machine: OrderStateMachine, order: Order) -> Self {
		Self {
			machine,
			order,
			error: None,
		}
	}

	/// Fetches the order and opens a session on it.
	pub async fn load(machine: OrderStateMachine, order_id: &str) -> Result<Self, OrderStateError> {
		let order = machine.get_order(order_id).await?;
		Ok(Self::new(machine, order))
	}

	pub fn order(&self) -> &Order {
		&self.order
	}

	/// Message from the last failed action, if not yet dismissed.
	pub fn error(&self) -> Option<&str> {
		self.error.as_deref()
	}

	pub fn dismiss_error(&mut self) {
		self.error = None;
	}

	/// Controls to render for the current status. `None` when the service
	/// reported a status this crate does not know.
	pub fn available_actions(&self) -> Option<OrderActions> {
		self.order
			.status()
			.ok()
			.map(|status| lifecycle::actions_for(self.machine.actor(), status))
	}

	/// Re-reads the order from the service.
	pub async fn refresh(&mut self) -> Result<&Order, OrderStateError> {
		let result = self.machine.get_order(&self.order.id).await;
		self.apply(result)
	}

	pub async fn transition(
		&mut self,
		requested: OrderStatus,
		extras: TransitionExtras,
	) -> Result<&Order, OrderStateError> {
		let result = self.machine.transition(&self.order, requested, extras).await;
		self.apply(result)
	}

	/// Runs the advance action, attaching a tracking number when shipping.
	pub async fn advance(&mut self, tracking_number: Option<String>) -> Result<&Order, OrderStateError> {
		let result = self.machine.advance(&self.order, tracking_number).await;
		self.apply(result)
	}

	/// Ships the order with an optional tracking number and arrival estimate.
	pub async fn ship(
		&mut self,
		tracking_number: Option<String>,
		estimated_arrival: Option<DateTime<Utc>>,
	) -> Result<&Order, OrderStateError> {
		let extras = TransitionExtras {
			tracking_number,
			estimated_arrival,
			..Default::default()
		};
		self.transition(OrderStatus::Shipped, extras).await
	}

	pub async fn cancel(&mut self, reason: Option<String>) -> Result<&Order, OrderStateError> {
		let result = self.machine.cancel(&self.order, reason).await;
		self.apply(result)
	}

	fn apply(&mut self, result: Result<Order, OrderStateError>) -> Result<&Order, OrderStateError> {
		match result {
			Ok(order) => {
				self.order = order;
				self.error = None;
				Ok(&self.order)
			},
			Err(e) => {
				self.error = Some(e.to_string());
				Err(e)
			},
		}
	}
}
