//! Outbound ports (driven side): interfaces implemented by outbound adapters.
//!
//! These contracts describe infrastructure dependencies: durable storage,
//! event consumers and the time source.

pub mod clock;
pub mod notifier;
pub mod store;
