use crate::domain::model::{FetchError, FetchResult, SourceDescriptor};
use crate::utils::error::Result;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use std::time::Duration;

/// 來源清單的大小上限；超過多半是把串流網址誤當成清單
pub const DEFAULT_MAX_SOURCE_BYTES: usize = 16 * 1024 * 1024;

/// 下載來源播放清單。每個來源互不影響，失敗以 `FetchError` 回傳。
pub struct SourceFetcher {
    client: Client,
    max_body_bytes: usize,
}

impl SourceFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            max_body_bytes: DEFAULT_MAX_SOURCE_BYTES,
        })
    }

    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// 並行下載所有來源，回傳順序與輸入順序一致
    pub async fn fetch_all(&self, descriptors: &[SourceDescriptor]) -> Vec<FetchResult> {
        let fetches = descriptors.iter().map(|descriptor| self.fetch(descriptor));
        futures::future::join_all(fetches).await
    }

    pub async fn fetch(&self, descriptor: &SourceDescriptor) -> FetchResult {
        tracing::info!("⬇️  Fetching [{}]: {}", descriptor.name, descriptor.location);

        let outcome = self.fetch_body(&descriptor.location).await;
        match &outcome {
            Ok(body) => tracing::debug!(
                "Fetched [{}]: {} bytes",
                descriptor.name,
                body.len()
            ),
            Err(e) => tracing::warn!("❌ Source [{}] failed: {}", descriptor.name, e),
        }

        FetchResult {
            descriptor: descriptor.clone(),
            outcome,
        }
    }

    async fn fetch_body(&self, location: &str) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(location)
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        if !is_acceptable_status(status.as_u16()) {
            return Err(FetchError::Unreachable {
                status: status.as_u16(),
            });
        }

        let bytes = self.read_limited(response).await?;
        let body = String::from_utf8_lossy(&bytes).into_owned();

        if looks_like_html(&body) {
            return Err(FetchError::NotAPlaylist);
        }

        Ok(body)
    }

    async fn read_limited(
        &self,
        mut response: Response,
    ) -> std::result::Result<Vec<u8>, FetchError> {
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(transport_failure)? {
            if body.len() + chunk.len() > self.max_body_bytes {
                return Err(FetchError::TooLarge {
                    limit: self.max_body_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

fn transport_failure(e: reqwest::Error) -> FetchError {
    FetchError::TransportFailure {
        cause: e.to_string(),
    }
}

pub(crate) fn is_acceptable_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// 有些伺服器把錯誤頁面包成 200 OK 回傳
pub fn looks_like_html(body: &str) -> bool {
    let head: String = body
        .trim_start_matches('\u{feff}')
        .trim_start()
        .chars()
        .take(16)
        .collect::<String>()
        .to_ascii_lowercase();
    head.starts_with("<!doctype html") || head.starts_with("<html")
}
