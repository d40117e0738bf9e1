//! Outio pulse backend: culture-diagnosis survey ingest and aggregation.
//!
//! Pipeline: validated submissions land in an append-only response store;
//! the aggregator recomputes a per-company culture profile wholesale from
//! the full response set; the profile store keeps the latest result for the
//! dashboard to read.

pub mod db;
pub mod domain;
pub mod middleware;
pub mod pseudonym;
pub mod services;
pub mod state;
pub mod store;
pub mod web;
