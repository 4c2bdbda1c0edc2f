//! HTTP API handlers for onair-sync
//!
//! REST endpoints for cold start, history and device registration, plus the
//! SSE push channel.

pub mod devices;
pub mod health;
pub mod history;
pub mod sse;
pub mod status;

pub use devices::device_routes;
pub use health::health_routes;
pub use history::history_routes;
pub use sse::event_stream;
pub use status::status_routes;
