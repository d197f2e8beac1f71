use async_trait::async_trait;
use linkqr_bot::conversation::{Action, ActionOutcome, ConversationHandler, Submission};
use linkqr_bot::qr::{PngQrEncoder, QrEncoder};
use linkqr_bot::session::{MokaSessionStore, SessionStore};
use linkqr_bot::shortener::{ShortenError, Shortener};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Records every URL it is asked to shorten.
#[derive(Default)]
struct RecordingShortener {
    calls: AtomicUsize,
    seen: Mutex<Vec<String>>,
    fail: bool,
}

impl RecordingShortener {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Shortener for RecordingShortener {
    async fn shorten(&self, url: &str) -> Result<String, ShortenError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut seen) = self.seen.lock() {
            seen.push(url.to_string());
        }
        if self.fail {
            Err(ShortenError::Timeout(Duration::from_secs(10)))
        } else {
            Ok("https://tiny.one/abc".to_string())
        }
    }
}

fn handler(
    store: Arc<dyn SessionStore>,
    shortener: Arc<RecordingShortener>,
) -> ConversationHandler {
    ConversationHandler::new(store, shortener, Arc::new(PngQrEncoder::default()))
}

fn decode_qr(png: &[u8]) -> Result<String, Box<dyn std::error::Error>> {
    let img = image::load_from_memory(png)?.to_luma8();
    let (w, h) = img.dimensions();
    let mut prepared = rqrr::PreparedImage::prepare_from_greyscale(w as usize, h as usize, |x, y| {
        img.get_pixel(x as u32, y as u32).0[0]
    });
    let grids = prepared.detect_grids();
    let grid = grids.first().ok_or("no QR grid detected")?;
    let (_meta, content) = grid
        .decode()
        .map_err(|e| format!("QR decode failed: {e:?}"))?;
    Ok(content)
}

#[tokio::test]
async fn test_full_shorten_flow() {
    let store = Arc::new(MokaSessionStore::new(60, 100));
    let shortener = Arc::new(RecordingShortener::default());
    let conversation = handler(store.clone(), shortener.clone());

    let submitted = conversation.submit(42, "https://example.com/long").await;
    assert_eq!(
        submitted,
        Submission::Accepted("https://example.com/long".to_string())
    );
    assert_eq!(
        store.get(42).await.as_deref(),
        Some("https://example.com/long")
    );

    let pending = conversation
        .begin(42, Action::Shorten)
        .await
        .expect("URL is pending");
    let outcome = conversation.complete(pending).await;

    assert_eq!(
        outcome,
        ActionOutcome::Shortened("https://tiny.one/abc".to_string())
    );
    assert_eq!(shortener.calls(), 1);
}

#[tokio::test]
async fn test_invalid_text_creates_no_session() {
    let store = Arc::new(MokaSessionStore::new(60, 100));
    let conversation = handler(store.clone(), Arc::new(RecordingShortener::default()));

    for text in ["hello", "www.example.com", "mailto:a@b.c", "/start"] {
        assert_eq!(conversation.submit(42, text).await, Submission::Rejected);
    }
    assert_eq!(store.get(42).await, None);
}

#[tokio::test]
async fn test_restart_loses_sessions_without_outbound_call() {
    let shortener = Arc::new(RecordingShortener::default());

    let before = handler(
        Arc::new(MokaSessionStore::new(60, 100)),
        shortener.clone(),
    );
    before.submit(42, "https://example.com").await;

    // A restart starts from an empty store
    let after = handler(
        Arc::new(MokaSessionStore::new(60, 100)),
        shortener.clone(),
    );

    assert!(after.begin(42, Action::Shorten).await.is_none());
    assert!(after.begin(42, Action::Qr).await.is_none());
    assert_eq!(shortener.calls(), 0);
}

#[tokio::test]
async fn test_failed_shortening_is_reported_generically() {
    let shortener = Arc::new(RecordingShortener::failing());
    let conversation = handler(Arc::new(MokaSessionStore::new(60, 100)), shortener.clone());

    conversation.submit(42, "https://example.com").await;
    let pending = conversation
        .begin(42, Action::Shorten)
        .await
        .expect("URL is pending");

    assert_eq!(
        conversation.complete(pending).await,
        ActionOutcome::ShortenFailed
    );
    assert_eq!(shortener.calls(), 1);
}

#[tokio::test]
async fn test_latest_submission_wins() -> Result<(), Box<dyn std::error::Error>> {
    let shortener = Arc::new(RecordingShortener::default());
    let conversation = handler(Arc::new(MokaSessionStore::new(60, 100)), shortener.clone());

    conversation.submit(42, "https://first.example").await;
    conversation.submit(42, "https://second.example").await;

    let pending = conversation
        .begin(42, Action::Shorten)
        .await
        .ok_or("URL is pending")?;
    conversation.complete(pending).await;

    let seen = shortener.seen.lock().map_err(|e| e.to_string())?.clone();
    assert_eq!(seen, vec!["https://second.example".to_string()]);
    Ok(())
}

#[tokio::test]
async fn test_qr_flow_round_trips_payload() -> Result<(), Box<dyn std::error::Error>> {
    let conversation = handler(
        Arc::new(MokaSessionStore::new(60, 100)),
        Arc::new(RecordingShortener::default()),
    );
    let url = "https://example.com/path?a=1&b=two";
    conversation.submit(42, url).await;

    let pending = conversation
        .begin(42, Action::Qr)
        .await
        .ok_or("URL is pending")?;

    match conversation.complete(pending).await {
        ActionOutcome::QrCode(png) => {
            assert!(!png.is_empty());
            assert_eq!(decode_qr(&png)?, url);
        }
        other => return Err(format!("unexpected outcome: {other:?}").into()),
    }
    Ok(())
}

#[tokio::test]
async fn test_pending_url_expires() {
    let shortener = Arc::new(RecordingShortener::default());
    let conversation = handler(Arc::new(MokaSessionStore::new(1, 100)), shortener.clone());

    conversation.submit(42, "https://example.com").await;
    tokio::time::sleep(Duration::from_millis(1_200)).await;

    assert!(conversation.begin(42, Action::Shorten).await.is_none());
    assert_eq!(shortener.calls(), 0);
}

#[test]
fn test_encoder_is_object_safe() -> Result<(), Box<dyn std::error::Error>> {
    let encoder: Arc<dyn QrEncoder> = Arc::new(PngQrEncoder::new(2));
    assert!(!encoder.encode_png("http://x.y")?.is_empty());
    Ok(())
}
