//! Order lifecycle policy for the harvest marketplace.
//!
//! [`lifecycle`] is the single source of truth for which status changes are
//! legal, which advance action each status offers, and when an order may be
//! cancelled. [`state`] applies that policy to real orders through an
//! injected [`harvest_client::OrderApi`], so an invalid request is refused
//! locally and never reaches the order service.

pub mod lifecycle;
pub mod state;

pub use lifecycle::{
	actions_for, allowed_transitions, allowed_transitions_for, can_cancel, next_action_label,
	validate_transition, NextAction, OrderActions, TransitionError,
};
pub use state::{OrderSession, OrderStateError, OrderStateMachine, TransitionExtras};
