//! Public API module.
//!
//! This module contains the high-level user-facing API for the `dualnet` crate.

pub mod builders;
pub mod connection_manager;
pub mod connector;
pub mod models;
