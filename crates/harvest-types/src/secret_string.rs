//! Redacting wrapper for bearer tokens.
//!
//! Access tokens end up in configuration structs that are logged at debug
//! level. `SecretString` keeps them out of `Debug`, `Display` and serialized
//! output, and wipes the buffer when dropped.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use zeroize::Zeroizing;

const REDACTED: &str = "***REDACTED***";

/// A string that never prints its contents.
#[derive(Clone)]
pub struct SecretString(Zeroizing<String>);

impl SecretString {
	pub fn new(s: String) -> Self {
		Self(Zeroizing::new(s))
	}

	/// Returns the secret. Callers must not log the result.
	pub fn expose_secret(&self) -> &str {
		&self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.trim().is_empty()
	}

	/// Formats the value as an HTTP `Authorization` header value.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.expose_secret())
	}
}

impl fmt::Debug for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "SecretString({})", REDACTED)
	}
}

impl fmt::Display for SecretString {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(REDACTED)
	}
}

impl From<String> for SecretString {
	fn from(s: String) -> Self {
		Self::new(s)
	}
}

impl From<&str> for SecretString {
	fn from(s: &str) -> Self {
		Self::new(s.to_string())
	}
}

impl PartialEq for SecretString {
	fn eq(&self, other: &Self) -> bool {
		self.0.as_str() == other.0.as_str()
	}
}

impl Eq for SecretString {}

impl Serialize for SecretString {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(REDACTED)
	}
}

impl<'de> Deserialize<'de> for SecretString {
	fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
	where
		D: Deserializer<'de>,
	{
		String::deserialize(deserializer).map(SecretString::new)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_token_is_redacted() {
		let token = SecretString::from("eyJhbGciOiJIUzI1NiJ9.payload");
		assert_eq!(format!("{:?}", token), "SecretString(***REDACTED***)");
		assert_eq!(token.to_string(), "***REDACTED***");
		assert_eq!(
			serde_json::to_string(&token).unwrap(),
			"\"***REDACTED***\""
		);
	}

	#[test]
	fn test_bearer_header() {
		let token = SecretString::from("abc");
		assert_eq!(token.bearer_header(), "Bearer abc");
		assert_eq!(token.expose_secret(), "abc");
	}

	#[test]
	fn test_blank_token_is_empty() {
		assert!(SecretString::from("   ").is_empty());
		assert!(!SecretString::from("t").is_empty());
	}
}
