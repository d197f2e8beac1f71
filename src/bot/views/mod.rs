//! View layer for bot UI components
//!
//! Contains keyboards, messages, and formatting for Telegram UI.

pub mod link;

pub use link::*;
