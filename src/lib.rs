#![forbid(unsafe_code)]

//! Freeform dashboard layout engine
//!
//! Frames live on a board of fixed width and unbounded height. In edit mode
//! they can be dragged and resized with grid and edge snapping; overlapping
//! results are rolled back. Edits are held locally until saved, cancelled or
//! discarded.

pub mod catalog;
pub mod config;
pub mod console;
pub mod constants;
pub mod error;
pub mod interaction;
pub mod ipc;
pub mod layout;
pub mod session;
pub mod snapping;
pub mod store;
pub mod types;
