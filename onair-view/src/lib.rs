//! onair-view library interface
//!
//! Client side of the onair service: follows a sync server over SSE and
//! keeps a now-playing view, falling back to polling when push is down.

pub mod client;
pub mod error;
pub mod runner;
pub mod sse_parser;
pub mod view;

pub use client::SyncClient;
pub use error::{ClientError, Result};
pub use runner::ViewRunner;
pub use view::{ConnectionMode, NowPlayingView};
