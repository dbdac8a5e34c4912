use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 沒有 group-title 時使用的分類
pub const UNCATEGORIZED: &str = "uncategorized";

/// 沒有名稱的頻道
pub const UNTITLED: &str = "Untitled";

/// 一個要下載的遠端播放清單
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceDescriptor {
    pub name: String,
    #[serde(rename = "url")]
    pub location: String,
}

impl SourceDescriptor {
    pub fn new(name: impl Into<String>, location: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            location: location.into(),
        }
    }

    /// 未命名來源的預設名稱 (從 1 開始)
    pub fn default_name(position: usize) -> String {
        format!("Playlist {}", position)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelRecord {
    pub display_name: String,
    pub stream_uri: String,
    pub category: String,
}

impl ChannelRecord {
    pub fn new(
        display_name: impl Into<String>,
        stream_uri: impl Into<String>,
        category: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            stream_uri: stream_uri.into(),
            category: category.into(),
        }
    }

    pub fn has_explicit_category(&self) -> bool {
        self.category != UNCATEGORIZED
    }
}

/// 單一來源下載失敗的原因；以值的形式保存，不會中斷整個流程
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchError {
    #[error("source unreachable (HTTP {status})")]
    Unreachable { status: u16 },

    #[error("transport failure: {cause}")]
    TransportFailure { cause: String },

    #[error("body is an HTML page, not a playlist")]
    NotAPlaylist,

    #[error("body exceeds {limit} bytes, not a playlist")]
    TooLarge { limit: usize },
}

#[derive(Debug, Clone)]
pub struct FetchResult {
    pub descriptor: SourceDescriptor,
    /// 成功時為寬鬆解碼後的文字內容
    pub outcome: Result<String, FetchError>,
}

impl FetchResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiveSignal {
    ContentType,
    TransportStreamSignature,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeadReason {
    Status(u16),
    ContentType(String),
    NoSignature,
    Transport(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Live(LiveSignal),
    Dead(DeadReason),
}

#[derive(Debug, Clone)]
pub struct ValidationOutcome {
    pub record: ChannelRecord,
    pub verdict: Verdict,
}

impl ValidationOutcome {
    pub fn is_live(&self) -> bool {
        matches!(self.verdict, Verdict::Live(_))
    }
}

/// 如何決定輸出的分類名稱
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "snake_case")]
pub enum CategoryMode {
    /// 保留來源內的 group-title
    Group,
    /// 以來源名稱分類
    Source,
    /// 來源名稱 + group-title
    #[default]
    Combined,
}

impl CategoryMode {
    pub fn categorize(self, source: &SourceDescriptor, mut record: ChannelRecord) -> ChannelRecord {
        record.category = match self {
            CategoryMode::Group => record.category,
            CategoryMode::Source => source.name.clone(),
            CategoryMode::Combined if record.has_explicit_category() => {
                format!("{} / {}", source.name, record.category)
            }
            CategoryMode::Combined => source.name.clone(),
        };
        record
    }
}

/// 最終輸出：分類名稱 → 依名稱排序的頻道
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregateDocument {
    groups: BTreeMap<String, Vec<ChannelRecord>>,
}

impl AggregateDocument {
    pub fn from_records(records: impl IntoIterator<Item = ChannelRecord>) -> Self {
        let mut groups: BTreeMap<String, Vec<ChannelRecord>> = BTreeMap::new();
        for record in records {
            groups.entry(record.category.clone()).or_default().push(record);
        }
        for channels in groups.values_mut() {
            channels.sort_by(|a, b| {
                a.display_name
                    .cmp(&b.display_name)
                    .then_with(|| a.stream_uri.cmp(&b.stream_uri))
            });
        }
        Self { groups }
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.groups.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ChannelRecord])> {
        self.groups
            .iter()
            .map(|(category, channels)| (category.as_str(), channels.as_slice()))
    }

    pub fn records(&self) -> impl Iterator<Item = &ChannelRecord> {
        self.groups.values().flatten()
    }

    pub fn category_count(&self) -> usize {
        self.groups.len()
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceReport {
    pub name: String,
    pub location: String,
    pub channels: usize,
    pub error: Option<FetchError>,
}

#[derive(Debug, Clone, Default)]
pub struct ExtractResult {
    pub candidates: Vec<ChannelRecord>,
    pub sources: Vec<SourceReport>,
}

impl ExtractResult {
    pub fn failed_sources(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}

#[derive(Debug, Clone)]
pub struct TransformResult {
    pub document: AggregateDocument,
    pub playlist_output: String,
    pub report: RunReport,
}

/// 一次執行的統計，供呼叫端輸出摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub generated_at: DateTime<Utc>,
    pub output_path: Option<String>,
    pub sources: Vec<SourceReport>,
    pub candidates: usize,
    pub probed: usize,
    pub live: usize,
    pub dead: usize,
    pub duplicates: usize,
    pub written: usize,
    pub categories: usize,
}

impl RunReport {
    pub fn sources_failed(&self) -> usize {
        self.sources.iter().filter(|s| s.error.is_some()).count()
    }
}
