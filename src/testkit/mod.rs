//! Shared test utilities available to both unit and integration tests.
//!
//! Enabled via `#[cfg(test)]` (unit tests) or the `testkit` feature
//! (integration tests).
//!
//! # Modules
//!
//! - [`clock`] - [`ManualClock`](clock::ManualClock), a settable time source.
//! - [`domain`] - Builders for markets and identifiers.
//! - [`engine`] - [`TestEngine`](engine::TestEngine): an engine over a
//!   memory store with a manual clock and an attached event receiver.

pub mod clock;
pub mod domain;
pub mod engine;
