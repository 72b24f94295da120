//! Order lifecycle policy.
//!
//! The single transition table for orders, plus the UI decisions derived
//! from it: which transitions an actor may request, the label of the
//! one-step "advance" action, whether cancelling is offered and which extra
//! input travels with a transition. Everything here is a pure function of
//! the statuses involved.

use harvest_types::{Actor, BuyerStatus, OrderStatus};
use serde::Serialize;
use thiserror::Error;

use OrderStatus::*;

/// Raised when the table does not permit a move.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransitionError {
	#[error("Cannot transition from {from} to {to}")]
	InvalidTransition { from: String, to: String },
}

impl TransitionError {
	fn invalid(from: impl ToString, to: impl ToString) -> Self {
		TransitionError::InvalidTransition {
			from: from.to_string(),
			to: to.to_string(),
		}
	}
}

/// Extra input that may accompany a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FieldSpec {
	/// Field name in the update body.
	pub name: &'static str,
	/// Prompt shown next to the input.
	pub label: &'static str,
	/// Whether the transition must be refused without it.
	pub required: bool,
}

/// Tracking number offered when an order ships.
pub const TRACKING_NUMBER: FieldSpec = FieldSpec {
	name: "tracking_number",
	label: "Tracking number",
	required: false,
};

/// Statuses each status may move to, in display order.
pub fn allowed_transitions(status: OrderStatus) -> &'static [OrderStatus] {
	match status {
		Pending => &[Confirmed, Cancelled],
		PendingPayment => &[Pending, Cancelled],
		Confirmed => &[Processing, Cancelled],
		Processing => &[Shipped],
		Shipped => &[Delivered],
		Delivered => &[Completed],
		Completed | Cancelled | Refunded => &[],
	}
}

/// Like [`allowed_transitions`], for a status string as reported by the
/// order service. An unrecognized status permits nothing.
pub fn allowed_transitions_raw(status: &str) -> &'static [OrderStatus] {
	status.parse().map(allowed_transitions).unwrap_or(&[])
}

/// The subset of the table an actor may request. Buyers only get the
/// cancellation edge, and only while [`can_cancel`] holds.
pub fn allowed_transitions_for(actor: Actor, status: OrderStatus) -> &'static [OrderStatus] {
	match actor {
		Actor::Farmer => allowed_transitions(status),
		Actor::Buyer if can_cancel(status) => &[Cancelled],
		Actor::Buyer => &[],
	}
}

pub fn is_terminal(status: OrderStatus) -> bool {
	allowed_transitions(status).is_empty()
}

/// Checks a requested move against the table.
pub fn validate_transition(
	current: OrderStatus,
	requested: OrderStatus,
) -> Result<OrderStatus, TransitionError> {
	if allowed_transitions(current).contains(&requested) {
		Ok(requested)
	} else {
		Err(TransitionError::invalid(current, requested))
	}
}

/// Checks a requested move given as raw status strings. Unknown statuses on
/// either side are rejected.
pub fn validate_raw_transition(current: &str, requested: &str) -> Result<OrderStatus, TransitionError> {
	match requested.parse::<OrderStatus>() {
		Ok(to) if allowed_transitions_raw(current).contains(&to) => Ok(to),
		_ => Err(TransitionError::invalid(current, requested)),
	}
}

/// Checks a move requested by `actor`.
pub fn validate_transition_for(
	actor: Actor,
	current: OrderStatus,
	requested: OrderStatus,
) -> Result<OrderStatus, TransitionError> {
	if allowed_transitions_for(actor, current).contains(&requested) {
		Ok(requested)
	} else {
		Err(TransitionError::invalid(current, requested))
	}
}

/// The single forward step offered as a button, if any.
///
/// `pending_payment` has none because the buyer has to pay first.
fn advance(status: OrderStatus) -> Option<(OrderStatus, &'static str)> {
	match status {
		Pending => Some((Confirmed, "Confirm Order")),
		Confirmed => Some((Processing, "Start Processing")),
		Processing => Some((Shipped, "Ship Order")),
		Shipped => Some((Delivered, "Mark as Delivered")),
		Delivered => Some((Completed, "Complete Order")),
		PendingPayment | Completed | Cancelled | Refunded => None,
	}
}

pub fn next_action_label(status: OrderStatus) -> Option<&'static str> {
	advance(status).map(|(_, label)| label)
}

/// Target of the advance action.
pub fn next_status(status: OrderStatus) -> Option<OrderStatus> {
	advance(status).map(|(next, _)| next)
}

/// Input that may be attached to the update for this move.
///
/// Only shipping carries one: an optional tracking number.
pub fn auxiliary_input(current: OrderStatus, requested: OrderStatus) -> Option<FieldSpec> {
	match (current, requested) {
		(Processing, Shipped) => Some(TRACKING_NUMBER),
		_ => None,
	}
}

/// Whether the order can still be cancelled.
pub fn can_cancel(status: OrderStatus) -> bool {
	matches!(status, Pending | PendingPayment | Confirmed)
}

/// The advance button: what it says and where it leads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NextAction {
	pub label: &'static str,
	pub target: OrderStatus,
}

/// Everything a front end needs to render the controls for one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderActions {
	pub status: OrderStatus,
	pub buyer_status: BuyerStatus,
	pub next_action: Option<NextAction>,
	pub can_cancel: bool,
	pub allowed: &'static [OrderStatus],
	/// Extra input for the advance action.
	pub auxiliary_input: Option<FieldSpec>,
}

/// Derives the controls shown to `actor` for an order in `status`.
pub fn actions_for(actor: Actor, status: OrderStatus) -> OrderActions {
	let buyer_status = BuyerStatus::from(status);
	let next_action = match actor {
		Actor::Farmer => advance(status).map(|(target, label)| NextAction { label, target }),
		Actor::Buyer => None,
	};
	let can_cancel = match actor {
		Actor::Farmer => can_cancel(status),
		Actor::Buyer => buyer_status.can_cancel(),
	};

	OrderActions {
		status,
		buyer_status,
		next_action,
		can_cancel,
		allowed: allowed_transitions_for(actor, status),
		auxiliary_input: next_action.and_then(|action| auxiliary_input(status, action.target)),
	}
}
