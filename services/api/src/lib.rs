//! services/api/src/lib.rs
//!
//! The memory wall service: adapters for the core ports, configuration, and the
//! HTTP and WebSocket surface.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
