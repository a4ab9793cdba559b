//! Core internal logic for link arbitration.
//!
//! This module contains the slot bookkeeping, the translation of platform
//! events, link classification, notification delivery and waiting.

pub(crate) mod classifier;
pub(crate) mod dispatcher;
pub(crate) mod events;
pub(crate) mod manager;
pub(crate) mod slot;
pub(crate) mod state_wait;
