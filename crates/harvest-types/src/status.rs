//! Order status types.
//!
//! `OrderStatus` is the single canonical lifecycle type. The buyer-facing
//! uppercase states are a projection of it (`BuyerStatus`) rather than a
//! second table, so both views always agree on what an order can do.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a string does not name a known status or actor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseStatusError {
	#[error("Unknown order status: {0}")]
	UnknownStatus(String),
	#[error("Unknown actor: {0}")]
	UnknownActor(String),
}

/// Lifecycle stage of an order.
///
/// Serialized in lowercase snake_case, which is what the seller-side API
/// returns. Parsing is ASCII case-insensitive so the buyer-side uppercase
/// spelling (`PENDING_PAYMENT`, `SHIPPED`, ...) maps to the same state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
	/// Placed but waiting for the buyer to pay.
	#[serde(alias = "PENDING_PAYMENT")]
	PendingPayment,
	/// Placed and waiting for the seller to confirm.
	#[serde(alias = "PENDING")]
	Pending,
	/// Accepted by the seller.
	#[serde(alias = "CONFIRMED")]
	Confirmed,
	/// Being prepared for shipment.
	#[serde(alias = "PROCESSING")]
	Processing,
	/// Handed to the carrier.
	#[serde(alias = "SHIPPED")]
	Shipped,
	/// Received by the buyer.
	#[serde(alias = "DELIVERED")]
	Delivered,
	/// Closed after delivery.
	#[serde(alias = "COMPLETED")]
	Completed,
	/// Cancelled by either party.
	#[serde(alias = "CANCELLED")]
	Cancelled,
	/// Payment returned to the buyer. Only ever set by the backend.
	#[serde(alias = "REFUNDED")]
	Refunded,
}

impl OrderStatus {
	/// Every status, in lifecycle order.
	pub const ALL: [OrderStatus; 9] = [
		OrderStatus::PendingPayment,
		OrderStatus::Pending,
		OrderStatus::Confirmed,
		OrderStatus::Processing,
		OrderStatus::Shipped,
		OrderStatus::Delivered,
		OrderStatus::Completed,
		OrderStatus::Cancelled,
		OrderStatus::Refunded,
	];

	/// Returns the wire representation of the status.
	pub fn as_str(&self) -> &'static str {
		match self {
			OrderStatus::PendingPayment => "pending_payment",
			OrderStatus::Pending => "pending",
			OrderStatus::Confirmed => "confirmed",
			OrderStatus::Processing => "processing",
			OrderStatus::Shipped => "shipped",
			OrderStatus::Delivered => "delivered",
			OrderStatus::Completed => "completed",
			OrderStatus::Cancelled => "cancelled",
			OrderStatus::Refunded => "refunded",
		}
	}

	/// Human-readable form, e.g. "pending payment".
	pub fn display_name(&self) -> String {
		self.as_str().replace('_', " ")
	}
}

impl fmt::Display for OrderStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for OrderStatus {
	type Err = ParseStatusError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		OrderStatus::ALL
			.into_iter()
			.find(|status| status.as_str().eq_ignore_ascii_case(trimmed))
			.ok_or_else(|| ParseStatusError::UnknownStatus(s.to_string()))
	}
}

/// Buyer-facing view of an order status.
///
/// Buyers see a five-step progress bar plus the two closed states. Payment
/// and post-delivery bookkeeping are folded into the neighbouring step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuyerStatus {
	Pending,
	Confirmed,
	Processing,
	Shipped,
	Delivered,
	Cancelled,
	Refunded,
}

impl BuyerStatus {
	/// Progress steps shown to buyers, in order.
	pub const STEPS: [BuyerStatus; 5] = [
		BuyerStatus::Pending,
		BuyerStatus::Confirmed,
		BuyerStatus::Processing,
		BuyerStatus::Shipped,
		BuyerStatus::Delivered,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			BuyerStatus::Pending => "PENDING",
			BuyerStatus::Confirmed => "CONFIRMED",
			BuyerStatus::Processing => "PROCESSING",
			BuyerStatus::Shipped => "SHIPPED",
			BuyerStatus::Delivered => "DELIVERED",
			BuyerStatus::Cancelled => "CANCELLED",
			BuyerStatus::Refunded => "REFUNDED",
		}
	}

	/// Badge label for the status.
	pub fn label(&self) -> &'static str {
		match self {
			BuyerStatus::Pending => "Pending",
			BuyerStatus::Confirmed => "Confirmed",
			BuyerStatus::Processing => "Processing",
			BuyerStatus::Shipped => "Shipped",
			BuyerStatus::Delivered => "Delivered",
			BuyerStatus::Cancelled => "Cancelled",
			BuyerStatus::Refunded => "Refunded",
		}
	}

	/// Label of the progress step, or `None` for closed orders.
	pub fn step_label(&self) -> Option<&'static str> {
		match self {
			BuyerStatus::Pending => Some("Order Placed"),
			BuyerStatus::Cancelled | BuyerStatus::Refunded => None,
			other => Some(other.label()),
		}
	}

	/// Index into [`BuyerStatus::STEPS`], or `None` for closed orders.
	pub fn progress_step(&self) -> Option<usize> {
		Self::STEPS.iter().position(|step| step == self)
	}

	/// Width of the progress bar in percent.
	pub fn progress_percent(&self) -> u8 {
		match self.progress_step() {
			Some(step) => (step * 100 / (Self::STEPS.len() - 1)) as u8,
			None => 0,
		}
	}

	/// Buyers may cancel only before processing starts.
	pub fn can_cancel(&self) -> bool {
		matches!(self, BuyerStatus::Pending | BuyerStatus::Confirmed)
	}

	/// Whether the order was closed without being fulfilled.
	pub fn is_cancelled(&self) -> bool {
		matches!(self, BuyerStatus::Cancelled | BuyerStatus::Refunded)
	}
}

impl From<OrderStatus> for BuyerStatus {
	fn from(status: OrderStatus) -> Self {
		match status {
			OrderStatus::PendingPayment | OrderStatus::Pending => BuyerStatus::Pending,
			OrderStatus::Confirmed => BuyerStatus::Confirmed,
			OrderStatus::Processing => BuyerStatus::Processing,
			OrderStatus::Shipped => BuyerStatus::Shipped,
			OrderStatus::Delivered | OrderStatus::Completed => BuyerStatus::Delivered,
			OrderStatus::Cancelled => BuyerStatus::Cancelled,
			OrderStatus::Refunded => BuyerStatus::Refunded,
		}
	}
}

impl fmt::Display for BuyerStatus {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Who is acting on an order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
	/// The seller, who drives the full lifecycle.
	#[default]
	#[serde(alias = "seller")]
	Farmer,
	/// The purchaser, who may only cancel.
	Buyer,
}

impl Actor {
	pub fn as_str(&self) -> &'static str {
		match self {
			Actor::Farmer => "farmer",
			Actor::Buyer => "buyer",
		}
	}
}

impl fmt::Display for Actor {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Actor {
	type Err = ParseStatusError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_lowercase().as_str() {
			"farmer" | "seller" => Ok(Actor::Farmer),
			"buyer" => Ok(Actor::Buyer),
			_ => Err(ParseStatusError::UnknownActor(s.to_string())),
		}
	}
}
