//! Scenario-aware mock of the operation registry.
//!
//! [`MockEngine`] implements [`bridge_core::Invoke`], the same trait the
//! bridge proxy implements, so code under test calls it exactly as it would
//! call the real bridge. Each call resolves against a [`MockEntry`]: the
//! active scenario if one is selected, else the per-test override, else the
//! registered default. Handlers read and write a typed fixture state `S`
//! held in the engine's [`MockContext`].
//!
//! To mock beneath the bridge instead, [`bridge::mock_bridge`] serves the
//! engine through a real dispatch bridge.
//!
//! [`fixtures::studio_engine`] registers stateful handlers for every studio
//! operation over a seeded [`fixtures::StudioFixtures`].

pub mod bridge;
pub mod context;
pub mod engine;
pub mod entry;
pub mod error;
pub mod fixtures;
pub mod scenarios;
pub mod simulate;

pub use bridge::mock_bridge;
pub use context::{MockContext, RecordedCall};
pub use engine::{MockEngine, MockEngineBuilder};
pub use entry::MockEntry;
pub use error::MockError;

#[cfg(test)]
mod tests;
