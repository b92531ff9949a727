//! Writable per-tenant memory for business knowledge.
//!
//! Entries are embedded and stored per scope. New facts pass through
//! conflict detection and a staged resolver before they are written, so a
//! changed fact supersedes the old one instead of sitting next to it.

pub mod api;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod intelligence;
pub mod llm;
pub mod migration;
pub mod models;
pub mod retry;
pub mod search;
pub mod services;

pub use error::{ErrorKind, FactbaseError, Result};
