//! Text and JSON output for the `harvest` commands.

use harvest_core::lifecycle::{allowed_transitions, OrderActions};
use harvest_types::{BuyerStatus, Order, OrderStatus};
use serde::Serialize;

/// An order together with the controls available for it.
#[derive(Debug, Serialize)]
pub struct OrderView<'a> {
	pub order: &'a Order,
	pub actions: Option<OrderActions>,
}

fn join_statuses(statuses: &[OrderStatus]) -> String {
	if statuses.is_empty() {
		return "(none)".to_string();
	}
	statuses
		.iter()
		.map(OrderStatus::as_str)
		.collect::<Vec<_>>()
		.join(", ")
}

fn yes_no(value: bool) -> &'static str {
	if value {
		"yes"
	} else {
		"no"
	}
}

/// Describes what the lifecycle allows from one status.
pub fn transitions(actions: &OrderActions) -> String {
	let status = actions.status;
	let mut lines = vec![
		format!("status:       {}", status),
		format!("allowed:      {}", join_statuses(actions.allowed)),
	];
	if actions.allowed != allowed_transitions(status) {
		lines.push(format!(
			"full table:   {}",
			join_statuses(allowed_transitions(status))
		));
	}
	lines.push(match actions.next_action {
		Some(action) => format!("next action:  {} -> {}", action.label, action.target),
		None => "next action:  (none)".to_string(),
	});
	lines.push(format!("can cancel:   {}", yes_no(actions.can_cancel)));
	if let Some(field) = actions.auxiliary_input {
		lines.push(format!(
			"extra input:  {} ({})",
			field.name,
			if field.required { "required" } else { "optional" }
		));
	}
	lines.push(format!("buyer view:   {}", buyer_line(actions.buyer_status)));
	lines.join("\n")
}

fn buyer_line(buyer: BuyerStatus) -> String {
	match buyer.step_label() {
		Some(step) => format!("{} ({}, {}%)", buyer, step, buyer.progress_percent()),
		None => format!("{} ({})", buyer, buyer.label()),
	}
}

/// Full detail of one order.
pub fn order(view: &OrderView<'_>) -> String {
	let order = view.order;
	let mut lines = vec![format!(
		"order {}{}",
		order.id,
		order
			.order_number
			.as_deref()
			.map(|n| format!(" ({})", n))
			.unwrap_or_default()
	)];
	lines.push(format!("status:       {}", order.status));
	if let Some(tracking) = &order.tracking_number {
		lines.push(format!("tracking:     {}", tracking));
	}
	if let Some(arrival) = order.estimated_arrival {
		lines.push(format!("arrives:      {}", arrival.to_rfc3339()));
	}
	if let Some(reason) = &order.cancelled_reason {
		lines.push(format!("cancelled:    {}", reason));
	}
	match &view.actions {
		Some(actions) => {
			lines.push(match actions.next_action {
				Some(action) => format!("next action:  {}", action.label),
				None => "next action:  (none)".to_string(),
			});
			lines.push(format!("can cancel:   {}", yes_no(actions.can_cancel)));
		},
		None => lines.push("actions:      (unrecognized status)".to_string()),
	}
	lines.join("\n")
}

/// One line per order.
pub fn order_list(orders: &[Order]) -> String {
	if orders.is_empty() {
		return "no orders".to_string();
	}
	orders
		.iter()
		.map(|order| {
			format!(
				"{:<16} {:<16} {}",
				order.id,
				order.status,
				order.order_number.as_deref().unwrap_or("-")
			)
		})
		.collect::<Vec<_>>()
		.join("\n")
}
