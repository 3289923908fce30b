//! IPC message types for console ↔ store server communication

use serde::{Deserialize, Serialize};

use crate::store::{LayoutDocument, SaveRequest};

/// Requests sent from a console to the store server
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum StoreRequest {
    /// Fetch the whole layout document
    Load,

    /// Replace the stored layout
    Save(SaveRequest),

    /// Health check
    Ping,
}

/// Responses sent from the store server to a console
#[derive(Serialize, Deserialize, Debug, Clone)]
pub enum StoreResponse {
    /// Reply to Load
    Document(LayoutDocument),

    /// Reply to Save
    Saved,

    /// Health check response
    Pong,

    /// Request failed on the server side
    Error(String),
}
