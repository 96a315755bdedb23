//! Utilities.

pub mod disposer;
