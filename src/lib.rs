//! # Brook
//!
//! A feed-reading client that keeps a local cache in sync with a remote
//! feed service.
//!
//! ## Architecture
//!
//! ```text
//! CLI / scheduler → RefreshCoordinator → SyncApi → CacheStore → SQLite
//! ```
//!
//! A sync attempt snapshots the cache, lets the API client write fresh
//! collections into it, then either stamps the result or restores the
//! snapshot. Reading an article runs an independent dwell timer that marks
//! it read on the server.
//!
//! ## Quick Start
//!
//! ```bash
//! # Pull feeds, tags and articles
//! brook sync
//!
//! # Unread articles
//! brook list --unread
//!
//! # Keep syncing every 15 minutes
//! brook watch --interval 15m
//!
//! # Open an article; it is marked read after two seconds
//! brook read <article-id>
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together the cache,
/// API client, sync coordinator and reader timer.
pub mod app;

/// Command-line interface using clap.
///
/// - `sync` - Run one manual sync
/// - `list [--articles] [--unread]` - List cached feeds or articles
/// - `tags` - List cached tags
/// - `watch` - Background sync until interrupted
/// - `read <id>` - Open an article and mark it read after the dwell delay
pub mod cli;

/// Remote API traits and the reqwest-based client.
pub mod client;

/// Loads `~/.config/brook/config.toml`.
pub mod config;

/// Interval-driven background sync.
pub mod daemon;

/// Core domain models.
///
/// - [`Feed`](domain::Feed), [`Article`](domain::Article), [`Tag`](domain::Tag)
/// - [`SyncAttempt`](domain::SyncAttempt) and the server's
///   [`SyncResponse`](domain::SyncResponse)
pub mod domain;

/// Toast notifications and the sinks that deliver them.
pub mod notify;

/// Auto mark-as-read timer.
pub mod reader;

/// In-memory cache, snapshots and the SQLite offline copy.
pub mod store;

/// Sync coordination: debounce gate, skeleton flags, error classification.
pub mod sync;
