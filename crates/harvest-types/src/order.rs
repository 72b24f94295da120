//! Order types exchanged with the marketplace order service.
//!
//! The service owns orders. This crate only mirrors the fields that the
//! lifecycle tooling reads or writes, and ignores everything else in the
//! payload (items, pricing, addresses).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{OrderStatus, ParseStatusError};

/// An order as returned by the order service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
	/// Order identifier. The buyer endpoint calls this `order_id`.
	#[serde(alias = "order_id")]
	pub id: String,
	/// Human-facing order number, if assigned.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub order_number: Option<String>,
	/// Status exactly as the service reported it.
	///
	/// Kept as a string so an order with a status this crate does not know
	/// still loads; the policy then permits no transitions for it.
	pub status: String,
	/// Carrier tracking number, set when the order ships.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tracking_number: Option<String>,
	/// Estimated arrival supplied by the seller.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub estimated_arrival: Option<DateTime<Utc>>,
	/// Reason given when the order was cancelled.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cancelled_reason: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cancelled_at: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub updated_at: Option<DateTime<Utc>>,
}

impl Order {
	/// Creates an order with only an id and a status.
	pub fn new(id: impl Into<String>, status: OrderStatus) -> Self {
		Self {
			id: id.into(),
			order_number: None,
			status: status.as_str().to_string(),
			tracking_number: None,
			estimated_arrival: None,
			cancelled_reason: None,
			cancelled_at: None,
			updated_at: None,
		}
	}

	/// Parses the reported status into the canonical type.
	pub fn status(&self) -> Result<OrderStatus, ParseStatusError> {
		self.status.parse()
	}
}

/// Body of the partial update call issued for a status transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderUpdate {
	pub status: OrderStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tracking_number: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub estimated_arrival: Option<DateTime<Utc>>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub cancelled_reason: Option<String>,
}

impl OrderUpdate {
	/// Creates an update that only changes the status.
	pub fn status(status: OrderStatus) -> Self {
		Self {
			status,
			tracking_number: None,
			estimated_arrival: None,
			cancelled_reason: None,
		}
	}
}

/// Status filter for order listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
	#[default]
	All,
	Only(OrderStatus),
}

impl StatusFilter {
	pub fn as_str(&self) -> &'static str {
		match self {
			StatusFilter::All => "all",
			StatusFilter::Only(status) => status.as_str(),
		}
	}

	pub fn matches(&self, status: &str) -> bool {
		match self {
			StatusFilter::All => true,
			StatusFilter::Only(expected) => status.parse::<OrderStatus>() == Ok(*expected),
		}
	}
}

impl fmt::Display for StatusFilter {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for StatusFilter {
	type Err = ParseStatusError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.trim().eq_ignore_ascii_case("all") {
			return Ok(StatusFilter::All);
		}
		s.parse().map(StatusFilter::Only)
	}
}

/// Paging and filtering for the seller's order list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderQuery {
	/// 1-based page number.
	pub page: u32,
	pub limit: u32,
	pub status: StatusFilter,
}

impl Default for OrderQuery {
	fn default() -> Self {
		Self {
			page: 1,
			limit: 20,
			status: StatusFilter::All,
		}
	}
}
