//! Market Data Providers
//!
//! - [`DemoProvider`]: randomized quotes around fixed base levels
//! - [`NullProvider`]: always empty
//! - [`FixtureProvider`]: scripted tables with failure and latency
//!   injection, for tests and local wiring checks

mod demo;
mod fixture;
mod null;

pub use demo::DemoProvider;
pub use fixture::FixtureProvider;
pub use null::NullProvider;
