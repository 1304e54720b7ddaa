//! Read counting and "most popular content" ranking over daily counters.
//!
//! Reads are ingested through an anti-forgery gate, stored as one counter per
//! (content, day) in sled, and aggregated on demand over any resolved period.

pub mod auth;
pub mod config;
pub mod constants;
pub mod extractors;
pub mod ingest;
pub mod logging;
pub mod middleware;
pub mod options;
pub mod period;
pub mod ranking;
pub mod response;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;
