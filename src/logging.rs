//! Logging setup with credential redaction
//!
//! Every formatted log line passes through [`RedactionPatterns`] before it is
//! written, so bot tokens inside request URLs or error messages never reach
//! the log sink.

use regex::Regex;
use std::io::{self, Write};
use std::sync::Arc;
use tracing_subscriber::{fmt::MakeWriter, prelude::*, EnvFilter};

/// Default filter used when neither `RUST_LOG` nor `DEBUG_MODE` is set.
const DEFAULT_FILTER: &str = "linkqr_bot=info,teloxide=info,hyper=warn,h2=error,reqwest=warn,tokio=warn,tower=warn";

/// Regex patterns for redacting sensitive data
pub struct RedactionPatterns {
    bot_url_token: Regex,
    bare_token: Regex,
    bot_prefixed_token: Regex,
    bearer: Regex,
    tinyurl_env: Regex,
}

impl RedactionPatterns {
    /// Initialize all regex patterns
    ///
    /// # Errors
    ///
    /// Returns an error if any regex pattern is invalid
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            bot_url_token: Regex::new(r"(https?://[^/]+/bot)([0-9]+:[A-Za-z0-9_-]+)(/['\s]*)")?,
            bare_token: Regex::new(r"([0-9]{8,10}:[A-Za-z0-9_-]{35})")?,
            bot_prefixed_token: Regex::new(r"(bot[0-9]{8,10}:)[A-Za-z0-9_-]+")?,
            bearer: Regex::new(r"(?i)(bearer\s+)[A-Za-z0-9._~+/=-]+")?,
            tinyurl_env: Regex::new(r"TINYURL_TOKEN=[^\s&]+")?,
        })
    }

    /// Returns `input` with every known credential shape masked.
    #[must_use]
    pub fn redact(&self, input: &str) -> String {
        let mut output = self
            .bot_url_token
            .replace_all(input, "$1[TELEGRAM_TOKEN]$3")
            .into_owned();
        output = self
            .bare_token
            .replace_all(&output, "[TELEGRAM_TOKEN]")
            .into_owned();
        output = self
            .bot_prefixed_token
            .replace_all(&output, "$1[TELEGRAM_TOKEN]")
            .into_owned();
        output = self.bearer.replace_all(&output, "${1}[MASKED]").into_owned();
        output = self
            .tinyurl_env
            .replace_all(&output, "TINYURL_TOKEN=[MASKED]")
            .into_owned();
        output
    }
}

/// Masks credentials in each formatted event before handing it to `inner`.
struct RedactingWriter<W> {
    inner: W,
    patterns: Arc<RedactionPatterns>,
}

impl<W: Write> Write for RedactingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let redacted = self.patterns.redact(&String::from_utf8_lossy(buf));
        self.inner.write_all(redacted.as_bytes())?;
        // Callers track progress against their own buffer, not the masked copy
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Hands the fmt layer a redacting stderr writer per event.
struct StderrRedactor(Arc<RedactionPatterns>);

impl<'a> MakeWriter<'a> for StderrRedactor {
    type Writer = RedactingWriter<io::Stderr>;

    fn make_writer(&'a self) -> Self::Writer {
        RedactingWriter {
            inner: io::stderr(),
            patterns: Arc::clone(&self.0),
        }
    }
}

/// Filter directives used when `RUST_LOG` is unset.
fn fallback_filter(debug_mode: Option<&str>) -> &'static str {
    match debug_mode {
        Some("true" | "1") => "debug",
        _ => DEFAULT_FILTER,
    }
}

/// Installs the global subscriber writing redacted output to stderr.
///
/// `RUST_LOG` wins when set. Otherwise `DEBUG_MODE=true|1` enables `debug`
/// for everything, and the default is a quiet per-crate filter.
pub fn init_logging(patterns: Arc<RedactionPatterns>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(fallback_filter(std::env::var("DEBUG_MODE").ok().as_deref()))
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(StderrRedactor(patterns)))
        .init();
}
