//! Link workflow UI components
//!
//! Contains the action keyboard and every text the bot sends.

use crate::conversation::Action;
use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup};

/// File name attached to uploaded QR codes
pub const QR_FILE_NAME: &str = "qr.png";

// ─────────────────────────────────────────────────────────────────────────────
// Trait definition
// ─────────────────────────────────────────────────────────────────────────────

/// Trait for link workflow view rendering
pub trait LinkView {
    /// Reply to `/start`
    fn welcome_message() -> &'static str;

    /// Text that is not an http(s) URL
    fn invalid_url() -> &'static str;

    /// Prompt shown above the action buttons
    fn choose_action() -> &'static str;

    /// Button press without a pending URL
    fn no_url_found() -> &'static str;

    /// Transient status while the action runs
    fn action_in_progress(action: Action) -> &'static str;

    /// Successful shortening
    fn shortened(short_url: &str) -> String;

    /// Shortening failed for any reason
    fn shorten_failed() -> &'static str;

    /// Caption of the QR code photo
    fn qr_caption() -> &'static str;

    /// QR rendering or upload failed
    fn qr_failed() -> &'static str;

    /// Reply to `/cancel` when a URL was dropped
    fn pending_cleared() -> &'static str;

    /// Reply to `/cancel` when nothing was pending
    fn nothing_pending() -> &'static str;
}

// ─────────────────────────────────────────────────────────────────────────────
// Default implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Default English-language implementation of `LinkView`
pub struct DefaultLinkView;

impl LinkView for DefaultLinkView {
    fn welcome_message() -> &'static str {
        "Send me any URL and I'll either shorten it or generate a QR code."
    }

    fn invalid_url() -> &'static str {
        "❌ Please send a valid URL starting with http:// or https://"
    }

    fn choose_action() -> &'static str {
        "What would you like to do with this URL?"
    }

    fn no_url_found() -> &'static str {
        "❌ No URL found. Please send a new one."
    }

    fn action_in_progress(action: Action) -> &'static str {
        match action {
            Action::Shorten => "⏳ Shortening your link...",
            Action::Qr => "⏳ Generating QR code...",
        }
    }

    fn shortened(short_url: &str) -> String {
        format!("✅ Here is your shortened URL:\n{short_url}")
    }

    fn shorten_failed() -> &'static str {
        "❌ Failed to shorten the link."
    }

    fn qr_caption() -> &'static str {
        "✅ Here is your QR code."
    }

    fn qr_failed() -> &'static str {
        "❌ Failed to generate QR code."
    }

    fn pending_cleared() -> &'static str {
        "🗑 Pending URL cleared."
    }

    fn nothing_pending() -> &'static str {
        "There is no pending URL."
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Keyboards
// ─────────────────────────────────────────────────────────────────────────────

/// Inline keyboard offering both actions on one row
///
/// # Examples
///
/// ```
/// use linkqr_bot::bot::views::link_action_keyboard;
/// let keyboard = link_action_keyboard();
/// assert_eq!(keyboard.inline_keyboard[0].len(), 2);
/// ```
#[must_use]
pub fn link_action_keyboard() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup::new(vec![vec![
        InlineKeyboardButton::callback("Shorten it", Action::Shorten.callback_data()),
        InlineKeyboardButton::callback("Generate QR Code", Action::Qr.callback_data()),
    ]])
}
