//! Configuration module for the harvest order tools.
//!
//! This module provides structures and utilities for loading configuration from
//! TOML files. Environment variables referenced as `${VAR}` or `${VAR:-default}`
//! are resolved before parsing, and the result is validated so that the
//! selected order client is always one of the configured implementations.

use harvest_types::Actor;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Who is acting on orders.
	#[serde(default)]
	pub session: SessionConfig,
	/// Order service client selection and settings.
	pub client: ClientConfig,
}

/// Settings for the acting user.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
	/// Role used for every request. Defaults to farmer.
	#[serde(default)]
	pub actor: Actor,
}

/// Configuration for the order service client.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
	/// Which implementation to use.
	pub primary: String,
	/// Map of client implementation names to their configurations.
	/// Each implementation validates its own table when it is built.
	pub implementations: HashMap<String, toml::Value>,
}

/// Largest configuration text accepted, in bytes.
const MAX_CONFIG_SIZE: usize = 1024 * 1024;

/// Expands `${NAME}` and `${NAME:-fallback}` references.
///
/// The text is copied in one forward pass, so a substituted value is never
/// expanded again. An unset variable without a fallback is reported with the
/// line it appears on.
pub fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	if input.len() > MAX_CONFIG_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_CONFIG_SIZE
		)));
	}

	let reference = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut resolved = String::with_capacity(input.len());
	let mut copied = 0;
	for caps in reference.captures_iter(input) {
		let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
			continue;
		};
		let fallback = caps.get(2).map(|m| m.as_str());
		let value = lookup_var(name.as_str(), fallback).ok_or_else(|| {
			let line = input[..whole.start()].matches('\n').count() + 1;
			ConfigError::Validation(format!(
				"Environment variable '{}' is not set (line {})",
				name.as_str(),
				line
			))
		})?;

		resolved.push_str(&input[copied..whole.start()]);
		resolved.push_str(&value);
		copied = whole.end();
	}
	resolved.push_str(&input[copied..]);

	Ok(resolved)
}

fn lookup_var(name: &str, fallback: Option<&str>) -> Option<String> {
	std::env::var(name)
		.ok()
		.or_else(|| fallback.map(str::to_string))
}

impl Config {
	/// Loads configuration from a file, resolving environment variables.
	pub async fn from_file(path: &str) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path).await.map_err(|e| {
			ConfigError::Io(std::io::Error::new(
				e.kind(),
				format!("Cannot read config file {}: {}", path, e),
			))
		})?;
		content.parse()
	}

	/// The configuration table of the selected client implementation.
	pub fn primary_client(&self) -> Option<&toml::Value> {
		self.client.implementations.get(&self.client.primary)
	}

	/// Checks that a client implementation is configured and selected.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.client.implementations.is_empty() {
			return Err(ConfigError::Validation(
				"At least one client implementation must be configured".into(),
			));
		}
		if self.client.primary.trim().is_empty() {
			return Err(ConfigError::Validation(
				"Client primary implementation cannot be empty".into(),
			));
		}
		if !self
			.client
			.implementations
			.contains_key(&self.client.primary)
		{
			return Err(ConfigError::Validation(format!(
				"Primary client '{}' not found in implementations",
				self.client.primary
			)));
		}
		for (name, value) in &self.client.implementations {
			if !value.is_table() {
				return Err(ConfigError::Validation(format!(
					"Client implementation '{}' must be a table",
					name
				)));
			}
		}
		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved first and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
