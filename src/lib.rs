//! # tabdeck
//!
//! Workspace store for new-tab dashboards.
//!
//! A workspace is one background plus a set of widgets. Live settings are
//! observable; the workspace tracks every nested observable and keeps a
//! single dirty flag that a commit clears. The [`index::WorkspaceIndex`]
//! persists workspaces through a pluggable key-value [`storage::Storage`]
//! engine (memory, a JSON file, or Postgres) and recovers from bad reads.

pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod instance;
pub mod lazy;
pub mod observable;
pub mod settings;
pub mod storage;
pub mod telemetry;
pub mod tracker;
pub mod workspace;
