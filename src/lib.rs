// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod choreography;
pub mod clock;
pub mod config;
pub mod corpus;
pub mod error;
pub mod footprints;
pub mod haptics;
pub mod input_policy;
pub mod map_feed;
pub mod motion;
pub mod reveal;
pub mod runtime;
pub mod selector;
pub mod session;
pub mod sim;
