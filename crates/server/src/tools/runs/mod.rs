//! Run store MCP tools.
//!
//! This module provides tools for inspecting and pruning stored runs.

pub mod get;
pub mod list;
pub mod purge;

pub use get::{RunGetParams, get_impl};
pub use list::{RunListParams, list_impl};
pub use purge::{RunPurgeParams, purge_impl};
