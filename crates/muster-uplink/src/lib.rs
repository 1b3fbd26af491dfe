//! Muster Uplink - Backend connectivity for the console
//!
//! Two halves: an HTTP planning client implementing
//! [`muster_core::PlannerApi`], and a push feed supervisor that mirrors
//! partial snapshots from the backend into the session store. Both are
//! wired to the session's live flag so teardown stops them cleanly.

#![deny(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod client;
pub mod config;
pub mod dto;
pub mod supervisor;

// Re-export commonly used types for convenience
pub use client::HttpPlanner;
pub use config::ConsoleConfig;
pub use dto::FeedFrame;
pub use supervisor::{ingest_frame, FeedSupervisor, LinkHandle, LinkState};

pub use muster_core::{ConsoleError, Result};

/// Default backend origin
pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";

/// Default push feed endpoint
pub const DEFAULT_FEED_URL: &str = "ws://127.0.0.1:8000/ws";
