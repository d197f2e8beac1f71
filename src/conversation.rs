//! URL workflow: accept a link, remember it, then shorten it or draw a QR code.
//!
//! This layer knows nothing about Telegram. It returns outcomes that the
//! transport turns into messages, keyboards and photos.

use crate::qr::QrEncoder;
use crate::session::SessionStore;
use crate::shortener::Shortener;
use crate::validator::is_supported_url;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Callback data of the "shorten" button
pub const CALLBACK_SHORTEN: &str = "shorten";
/// Callback data of the "QR code" button
pub const CALLBACK_QR: &str = "qr";

/// What the user asked to do with the pending URL
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Shorten via the link shortening service
    Shorten,
    /// Render as a QR code image
    Qr,
}

impl Action {
    /// Parses inline button callback data.
    #[must_use]
    pub fn from_callback_data(data: &str) -> Option<Self> {
        match data {
            CALLBACK_SHORTEN => Some(Self::Shorten),
            CALLBACK_QR => Some(Self::Qr),
            _ => None,
        }
    }

    /// Callback data carried by the matching inline button.
    #[must_use]
    pub const fn callback_data(self) -> &'static str {
        match self {
            Self::Shorten => CALLBACK_SHORTEN,
            Self::Qr => CALLBACK_QR,
        }
    }
}

/// Result of submitting a text message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submission {
    /// Text is a usable URL and is now pending for the user
    Accepted(String),
    /// Text is not a URL; nothing was stored
    Rejected,
}

/// An action bound to the URL it will operate on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    /// Requested action
    pub action: Action,
    /// URL read from the session store
    pub url: String,
    /// User who pressed the button
    pub user_id: i64,
}

/// Final result of an action, ready to be rendered for the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// Shortened link returned by the service
    Shortened(String),
    /// Shortening failed; cause has been logged
    ShortenFailed,
    /// PNG bytes of the QR code
    QrCode(Vec<u8>),
    /// QR rendering failed; cause has been logged
    QrFailed,
}

/// Orchestrates validation, session storage and the two outbound actions.
#[derive(Clone)]
pub struct ConversationHandler {
    sessions: Arc<dyn SessionStore>,
    shortener: Arc<dyn Shortener>,
    qr: Arc<dyn QrEncoder>,
}

impl ConversationHandler {
    /// Creates a handler over the given collaborators.
    #[must_use]
    pub fn new(
        sessions: Arc<dyn SessionStore>,
        shortener: Arc<dyn Shortener>,
        qr: Arc<dyn QrEncoder>,
    ) -> Self {
        Self {
            sessions,
            shortener,
            qr,
        }
    }

    /// Handles free text from a user.
    ///
    /// Valid URLs replace whatever the user had pending before.
    pub async fn submit(&self, user_id: i64, text: &str) -> Submission {
        let url = text.trim();
        if !is_supported_url(url) {
            info!(user_id, "Rejected non-URL text");
            return Submission::Rejected;
        }

        self.sessions.put(user_id, url.to_string()).await;
        info!(user_id, "Accepted URL, awaiting action");
        Submission::Accepted(url.to_string())
    }

    /// Looks up the pending URL for a button press.
    ///
    /// `None` means the session is absent or expired; no outbound call should follow.
    pub async fn begin(&self, user_id: i64, action: Action) -> Option<PendingAction> {
        let url = self.pending_url(user_id).await?;
        Some(PendingAction {
            action,
            url,
            user_id,
        })
    }

    /// URL the user submitted last, if it is still live.
    pub async fn pending_url(&self, user_id: i64) -> Option<String> {
        let url = self.sessions.get(user_id).await;
        if url.is_none() {
            info!(user_id, "No pending URL for button press");
        }
        url
    }

    /// Runs the outbound call for a pending action, exactly once.
    pub async fn complete(&self, pending: PendingAction) -> ActionOutcome {
        let PendingAction {
            action,
            url,
            user_id,
        } = pending;

        match action {
            Action::Shorten => match self.shortener.shorten(&url).await {
                Ok(short_url) => {
                    info!(user_id, "URL shortened");
                    ActionOutcome::Shortened(short_url)
                }
                Err(e) => {
                    warn!(user_id, "Error shortening URL: {e}");
                    ActionOutcome::ShortenFailed
                }
            },
            Action::Qr => {
                let qr = Arc::clone(&self.qr);
                match tokio::task::spawn_blocking(move || qr.encode_png(&url)).await {
                    Ok(Ok(png)) => {
                        info!(user_id, bytes = png.len(), "QR code generated");
                        ActionOutcome::QrCode(png)
                    }
                    Ok(Err(e)) => {
                        error!(user_id, "Error generating QR code: {e}");
                        ActionOutcome::QrFailed
                    }
                    Err(e) => {
                        error!(user_id, "QR encoding task failed: {e}");
                        ActionOutcome::QrFailed
                    }
                }
            }
        }
    }

    /// Forgets the pending URL. Returns `true` if there was one.
    pub async fn cancel(&self, user_id: i64) -> bool {
        let had_pending = self.sessions.get(user_id).await.is_some();
        self.sessions.clear(user_id).await;
        had_pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qr::{MockQrEncoder, PngQrEncoder, QrError};
    use crate::session::{MockSessionStore, MokaSessionStore};
    use crate::shortener::{MockShortener, ShortenError};
    use mockall::predicate::eq;

    fn handler_with(shortener: MockShortener, qr: MockQrEncoder) -> ConversationHandler {
        ConversationHandler::new(
            Arc::new(MokaSessionStore::new(60, 100)),
            Arc::new(shortener),
            Arc::new(qr),
        )
    }

    #[test]
    fn test_action_callback_data() {
        assert_eq!(Action::from_callback_data("shorten"), Some(Action::Shorten));
        assert_eq!(Action::from_callback_data("qr"), Some(Action::Qr));
        assert_eq!(Action::from_callback_data("retry"), None);
        assert_eq!(Action::Qr.callback_data(), CALLBACK_QR);
    }

    #[tokio::test]
    async fn test_rejected_text_does_not_touch_store() {
        let mut sessions = MockSessionStore::new();
        sessions.expect_put().never();

        let handler = ConversationHandler::new(
            Arc::new(sessions),
            Arc::new(MockShortener::new()),
            Arc::new(MockQrEncoder::new()),
        );

        for text in ["hello", "example.com", "ftp://example.com", "   "] {
            assert_eq!(handler.submit(7, text).await, Submission::Rejected);
        }
    }

    #[tokio::test]
    async fn test_accepted_url_is_trimmed_and_stored() {
        let store = Arc::new(MokaSessionStore::new(60, 100));
        let handler = ConversationHandler::new(
            store.clone(),
            Arc::new(MockShortener::new()),
            Arc::new(MockQrEncoder::new()),
        );

        let result = handler.submit(7, "  https://example.com/a \n").await;

        assert_eq!(
            result,
            Submission::Accepted("https://example.com/a".to_string())
        );
        assert_eq!(store.get(7).await.as_deref(), Some("https://example.com/a"));
    }

    #[tokio::test]
    async fn test_button_without_session_makes_no_outbound_call() {
        let mut shortener = MockShortener::new();
        shortener.expect_shorten().never();
        let mut qr = MockQrEncoder::new();
        qr.expect_encode_png().never();

        let handler = handler_with(shortener, qr);

        assert_eq!(handler.begin(7, Action::Shorten).await, None);
        assert_eq!(handler.begin(7, Action::Qr).await, None);
    }

    #[tokio::test]
    async fn test_shorten_success_returns_short_url() {
        let mut shortener = MockShortener::new();
        shortener
            .expect_shorten()
            .with(eq("https://example.com/long"))
            .times(1)
            .returning(|_| Ok("https://tiny.one/abc".to_string()));

        let handler = handler_with(shortener, MockQrEncoder::new());
        handler.submit(7, "https://example.com/long").await;

        let pending = handler
            .begin(7, Action::Shorten)
            .await
            .expect("URL was submitted");
        assert_eq!(
            handler.complete(pending).await,
            ActionOutcome::Shortened("https://tiny.one/abc".to_string())
        );
    }

    #[tokio::test]
    async fn test_shorten_failure_is_generic() {
        let mut shortener = MockShortener::new();
        shortener
            .expect_shorten()
            .times(1)
            .returning(|_| Err(ShortenError::Timeout(std::time::Duration::from_secs(10))));

        let handler = handler_with(shortener, MockQrEncoder::new());
        handler.submit(7, "https://example.com").await;

        let pending = handler
            .begin(7, Action::Shorten)
            .await
            .expect("URL was submitted");
        let outcome = handler.complete(pending).await;
        assert_eq!(outcome, ActionOutcome::ShortenFailed);
    }

    #[tokio::test]
    async fn test_qr_uses_latest_submission() {
        let mut qr = MockQrEncoder::new();
        qr.expect_encode_png()
            .with(eq("https://second.example"))
            .times(1)
            .returning(|payload| Ok(payload.as_bytes().to_vec()));

        let handler = handler_with(MockShortener::new(), qr);
        handler.submit(7, "https://first.example").await;
        handler.submit(7, "https://second.example").await;

        let pending = handler
            .begin(7, Action::Qr)
            .await
            .expect("URL was submitted");
        let outcome = handler.complete(pending).await;
        assert_eq!(
            outcome,
            ActionOutcome::QrCode(b"https://second.example".to_vec())
        );
    }

    #[tokio::test]
    async fn test_qr_failure_is_generic() {
        let mut qr = MockQrEncoder::new();
        qr.expect_encode_png()
            .times(1)
            .returning(|_| Err(QrError::Encode(qrcode::types::QrError::DataTooLong)));

        let handler = handler_with(MockShortener::new(), qr);
        handler.submit(7, "https://example.com").await;

        let pending = handler
            .begin(7, Action::Qr)
            .await
            .expect("URL was submitted");
        let outcome = handler.complete(pending).await;
        assert_eq!(outcome, ActionOutcome::QrFailed);
    }

    #[tokio::test]
    async fn test_real_encoder_produces_png() {
        let handler = ConversationHandler::new(
            Arc::new(MokaSessionStore::new(60, 100)),
            Arc::new(MockShortener::new()),
            Arc::new(PngQrEncoder::default()),
        );
        handler.submit(7, "https://example.com").await;

        let pending = handler
            .begin(7, Action::Qr)
            .await
            .expect("URL was submitted");
        let outcome = handler.complete(pending).await;
        assert!(matches!(outcome, ActionOutcome::QrCode(png) if !png.is_empty()));
    }

    #[tokio::test]
    async fn test_session_survives_action_until_cancelled() {
        let mut shortener = MockShortener::new();
        shortener
            .expect_shorten()
            .returning(|_| Ok("https://tiny.one/x".to_string()));

        let handler = handler_with(shortener, MockQrEncoder::new());
        handler.submit(7, "https://example.com").await;

        if let Some(pending) = handler.begin(7, Action::Shorten).await {
            handler.complete(pending).await;
        }
        assert!(handler.begin(7, Action::Qr).await.is_some());

        assert!(handler.cancel(7).await);
        assert!(!handler.cancel(7).await);
        assert_eq!(handler.begin(7, Action::Qr).await, None);
    }
}
