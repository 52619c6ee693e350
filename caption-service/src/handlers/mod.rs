//! HTTP handlers for the caption service.
//!
//! `routes` serves the public API; `health` serves the operational listener.

pub mod generate;
pub mod health;
pub mod routes;
