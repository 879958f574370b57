//! Command handlers.

pub(crate) mod config;
pub(crate) mod interact;
pub(crate) mod simulate;
