//! Naming contract for pluggable backends.

/// Implemented by every backend module that can be selected from configuration.
///
/// `NAME` is the key used under the configuration section, for example
/// `"memory"` for `[storage.implementations.memory]`.
pub trait ImplementationRegistry {
	const NAME: &'static str;

	type Factory;

	fn factory() -> Self::Factory;
}
