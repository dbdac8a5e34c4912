use crate::core::validator::EndpointValidator;
use crate::domain::model::{AggregateDocument, ChannelRecord, ValidationOutcome};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;
use url::Url;

/// 去重用的網址鍵：小寫 scheme/host、移除預設埠
pub fn normalize_uri(uri: &str) -> String {
    let trimmed = uri.trim();
    match Url::parse(trimmed) {
        Ok(url) => url.to_string(),
        Err(_) => trimmed.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClaimResult {
    /// 第一次看到此網址
    Claimed,
    /// 取代了輸入順序較後面的候選
    Replaced,
    Duplicate,
    Dead,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub probed: usize,
    pub live: usize,
    pub dead: usize,
    pub duplicates: usize,
}

struct Claim {
    index: usize,
    record: ChannelRecord,
}

/// 驗證結果的共享收集器。
///
/// Many validation tasks finish concurrently; each live outcome is offered
/// here together with its position in the candidate list. For a given
/// normalized URI the lowest position wins, so the result does not depend
/// on which probe happened to finish first.
#[derive(Default)]
pub struct AggregationContext {
    claims: Mutex<HashMap<String, Claim>>,
    probed: AtomicUsize,
    live: AtomicUsize,
    dead: AtomicUsize,
    duplicates: AtomicUsize,
}

impl AggregationContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_outcome(&self, index: usize, outcome: ValidationOutcome) -> ClaimResult {
        self.probed.fetch_add(1, Ordering::Relaxed);

        if !outcome.is_live() {
            self.dead.fetch_add(1, Ordering::Relaxed);
            return ClaimResult::Dead;
        }
        self.live.fetch_add(1, Ordering::Relaxed);

        let key = normalize_uri(&outcome.record.stream_uri);
        let mut claims = self.claims.lock().unwrap_or_else(PoisonError::into_inner);

        let result = match claims.get(&key) {
            None => ClaimResult::Claimed,
            Some(existing) if index < existing.index => ClaimResult::Replaced,
            Some(_) => ClaimResult::Duplicate,
        };

        if result != ClaimResult::Duplicate {
            claims.insert(
                key,
                Claim {
                    index,
                    record: outcome.record,
                },
            );
        }
        if result != ClaimResult::Claimed {
            self.duplicates.fetch_add(1, Ordering::Relaxed);
        }

        result
    }

    pub fn stats(&self) -> ValidationStats {
        ValidationStats {
            probed: self.probed.load(Ordering::Relaxed),
            live: self.live.load(Ordering::Relaxed),
            dead: self.dead.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
        }
    }

    /// 取出目前保留的頻道並分組排序
    pub fn take_document(&self) -> AggregateDocument {
        let claims = {
            let mut guard = self.claims.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *guard)
        };
        AggregateDocument::from_records(claims.into_values().map(|claim| claim.record))
    }
}

/// 每個候選一個 task，實際併發量由 validator 的 semaphore 限制
pub async fn validate_all(
    validator: Arc<EndpointValidator>,
    candidates: Vec<ChannelRecord>,
) -> (AggregateDocument, ValidationStats) {
    let context = Arc::new(AggregationContext::new());
    let mut tasks = JoinSet::new();

    for (index, candidate) in candidates.into_iter().enumerate() {
        let validator = Arc::clone(&validator);
        let context = Arc::clone(&context);
        tasks.spawn(async move {
            let outcome = validator.validate(candidate).await;
            context.record_outcome(index, outcome);
        });
    }

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            tracing::error!("Validation task aborted: {}", e);
        }
    }

    let stats = context.stats();
    (context.take_document(), stats)
}
