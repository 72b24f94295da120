//! State management for a single order.
//!
//! `order` holds the state machine that validates a status change before
//! sending it; `session` keeps the last confirmed order and the current error
//! for a detail view.

pub mod order;
pub mod session;

pub use order::{OrderStateError, OrderStateMachine, TransitionExtras};
pub use session::OrderSession;
