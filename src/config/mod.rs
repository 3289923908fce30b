//! Configuration management for the dashboard console

pub mod console;

pub use console::{BoardSettings, ConsoleConfig, StoreBackendKind, StoreSettings};
