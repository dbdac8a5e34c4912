//! Endpoint liveness probing.
//!
//! A probe short-circuits at the first decisive signal: HTTP status, then the
//! declared content type, then a transport-stream signature sniffed from the
//! first bytes of the body. Every failure mode maps to a dead verdict.

use crate::domain::model::{ChannelRecord, DeadReason, LiveSignal, ValidationOutcome, Verdict};
use crate::utils::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::{Client, Response};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

/// MPEG-TS sync byte, repeated every 188 bytes in a real stream.
pub const TS_SYNC_BYTE: u8 = 0x47;
pub const DEFAULT_PREFIX_LEN: usize = 2048;
pub const DEFAULT_SYNC_THRESHOLD: usize = 5;
const MAX_REDIRECTS: usize = 10;

const PLAYLIST_MIME_TYPES: [&str; 6] = [
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
    "application/dash+xml",
    "application/octet-stream",
];

const REJECTED_MIME_TYPES: [&str; 2] = ["text/html", "application/json"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MimeClass {
    Good,
    Bad,
    Ambiguous,
}

pub fn classify_content_type(content_type: Option<&str>) -> MimeClass {
    let Some(raw) = content_type else {
        return MimeClass::Ambiguous;
    };
    let essence = raw
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    if REJECTED_MIME_TYPES.contains(&essence.as_str()) || essence.starts_with("image/") {
        MimeClass::Bad
    } else if essence.starts_with("video/") || PLAYLIST_MIME_TYPES.contains(&essence.as_str()) {
        MimeClass::Good
    } else {
        MimeClass::Ambiguous
    }
}

pub fn looks_like_transport_stream(prefix: &[u8], threshold: usize) -> bool {
    prefix.iter().filter(|&&b| b == TS_SYNC_BYTE).count() > threshold
}

#[derive(Debug, Clone)]
pub struct ProbeSettings {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_concurrent: usize,
    pub prefix_len: usize,
    pub sync_threshold: usize,
}

impl ProbeSettings {
    pub fn new(user_agent: impl Into<String>, timeout: Duration, max_concurrent: usize) -> Self {
        Self {
            user_agent: user_agent.into(),
            timeout,
            max_concurrent,
            prefix_len: DEFAULT_PREFIX_LEN,
            sync_threshold: DEFAULT_SYNC_THRESHOLD,
        }
    }
}

pub struct EndpointValidator {
    client: Client,
    limiter: Arc<Semaphore>,
    prefix_len: usize,
    sync_threshold: usize,
}

impl EndpointValidator {
    pub fn new(settings: ProbeSettings) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = Client::builder()
            .user_agent(settings.user_agent.as_str())
            .default_headers(headers)
            .timeout(settings.timeout)
            .redirect(Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self {
            client,
            limiter: Arc::new(Semaphore::new(
                settings.max_concurrent.clamp(1, Semaphore::MAX_PERMITS),
            )),
            prefix_len: settings.prefix_len,
            sync_threshold: settings.sync_threshold,
        })
    }

    pub fn available_slots(&self) -> usize {
        self.limiter.available_permits()
    }

    /// 在全域併發上限內探測一個頻道；永遠回傳結果，不會失敗
    pub async fn validate(&self, record: ChannelRecord) -> ValidationOutcome {
        let verdict = match self.limiter.acquire().await {
            Ok(_permit) => self.probe(&record.stream_uri).await,
            Err(_) => Verdict::Dead(DeadReason::Transport("probe limiter closed".to_string())),
        };

        match &verdict {
            Verdict::Live(signal) => {
                tracing::debug!("✅ {} ({:?}): {}", record.display_name, signal, record.stream_uri)
            }
            Verdict::Dead(reason) => {
                tracing::debug!("💀 {} ({:?}): {}", record.display_name, reason, record.stream_uri)
            }
        }

        ValidationOutcome { record, verdict }
    }

    async fn probe(&self, uri: &str) -> Verdict {
        // 許多 IPTV 伺服器不支援 HEAD
        let response = match self.client.get(uri).send().await {
            Ok(response) => response,
            Err(e) => return Verdict::Dead(DeadReason::Transport(e.to_string())),
        };

        let status = response.status().as_u16();
        if !(200..400).contains(&status) {
            return Verdict::Dead(DeadReason::Status(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match classify_content_type(content_type.as_deref()) {
            MimeClass::Bad => Verdict::Dead(DeadReason::ContentType(content_type.unwrap_or_default())),
            MimeClass::Good => Verdict::Live(LiveSignal::ContentType),
            MimeClass::Ambiguous => match self.read_prefix(response).await {
                Ok(prefix) if looks_like_transport_stream(&prefix, self.sync_threshold) => {
                    Verdict::Live(LiveSignal::TransportStreamSignature)
                }
                Ok(_) => Verdict::Dead(DeadReason::NoSignature),
                Err(e) => Verdict::Dead(DeadReason::Transport(e.to_string())),
            },
        }
    }

    /// 只讀取開頭固定長度，直播串流的 body 不會結束
    async fn read_prefix(&self, mut response: Response) -> reqwest::Result<Vec<u8>> {
        let mut prefix = Vec::with_capacity(self.prefix_len);
        while prefix.len() < self.prefix_len {
            match response.chunk().await? {
                Some(chunk) => {
                    let take = (self.prefix_len - prefix.len()).min(chunk.len());
                    prefix.extend_from_slice(&chunk[..take]);
                }
                None => break,
            }
        }
        Ok(prefix)
    }
}
