//! # onair Common Library
//!
//! Shared code for the onair station-status services including:
//! - Station status snapshot model
//! - Transition and push-channel event types, subscriber registry (EventBus)
//! - API request/response types
//! - Configuration loading
//! - SSE helpers
//! - Device token storage

pub mod api;
pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod error;
pub mod events;
pub mod sse;
pub mod status;

pub use error::{Error, FailureKind, Result};
pub use status::{NowPlaying, OnlineState, SourceMode, StationStatus, Track};
