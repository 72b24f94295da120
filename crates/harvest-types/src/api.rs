//! Response envelope used by the marketplace REST API.
//!
//! Every endpoint answers with `{ "status": "success" | "error", "message", "data" }`.

use serde::{Deserialize, Serialize};

/// Outcome marker carried in every response envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
	Success,
	Error,
}

/// Standard response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEnvelope<T> {
	pub status: EnvelopeStatus,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub message: Option<String>,
	#[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
	pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
	pub fn success(data: T) -> Self {
		Self {
			status: EnvelopeStatus::Success,
			message: None,
			data: Some(data),
		}
	}

	pub fn error(message: impl Into<String>) -> Self {
		Self {
			status: EnvelopeStatus::Error,
			message: Some(message.into()),
			data: None,
		}
	}

	/// Message to show when the call failed.
	pub fn error_message(&self) -> Option<&str> {
		match self.status {
			EnvelopeStatus::Error => Some(self.message.as_deref().unwrap_or("Request failed")),
			EnvelopeStatus::Success => None,
		}
	}
}
