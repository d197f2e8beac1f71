#![deny(missing_docs)]
//! Telegram bot that shortens links or turns them into QR codes.

/// Telegram-specific handlers and views.
pub mod bot;
/// Settings loaded from files and environment.
pub mod config;
/// Transport-independent URL workflow.
pub mod conversation;
/// Logging setup with credential redaction.
pub mod logging;
/// QR code rendering.
pub mod qr;
/// Telegram runtime entrypoint.
pub mod runner;
/// Pending URL storage.
pub mod session;
/// Link shortening client.
pub mod shortener;
/// URL acceptance check.
pub mod validator;
