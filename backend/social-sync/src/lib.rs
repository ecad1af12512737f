//! Konnekt realtime sync and aggregation engine
//!
//! - Direct messages: canonical channel addressing and ordered snapshot
//!   streams per conversation
//! - Feed: newest-first pagination with comment, reaction and author joins
//! - Mutations: love toggles, comments and posts, reconciled into the
//!   session's cached feed
//!
//! All remote state lives behind [`doc_store::DocumentStore`]; media uploads
//! go through [`services::media::MediaHost`].

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod services;
pub mod state;

pub use config::Config;
pub use error::{SyncError, SyncResult};
pub use state::SessionState;
