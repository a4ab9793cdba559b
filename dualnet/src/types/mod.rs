//! Type definitions and constants.
//!
//! This module contains result codes, user-facing messages and timeouts.

pub(crate) mod constants;
