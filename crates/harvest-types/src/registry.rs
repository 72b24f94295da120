//! Registry trait for self-registering implementations.

/// Ties a configuration name to the factory that builds the implementation.
///
/// Each backend module exposes a `Registry` type implementing this trait, so
/// the name used under `[client.implementations.<name>]` and the factory
/// cannot drift apart.
pub trait ImplementationRegistry {
	/// Key of the implementation's table in the configuration file.
	const NAME: &'static str;

	/// Factory function type for this kind of implementation.
	type Factory;

	/// Returns the factory function.
	fn factory() -> Self::Factory;
}
