//! Screener Library
//!
//! A read-through cache over a market data provider, served as a JSON API.
//! The binary in `main.rs` wires these modules together; integration tests
//! drive the router directly.

pub mod api;
pub mod batch;
pub mod cache;
pub mod cli;
pub mod data;
pub mod policy;
pub mod service;
pub mod telemetry;
