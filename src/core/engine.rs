use crate::core::{Pipeline, RunReport};
use crate::utils::error::{MergeError, Result};

pub struct MergeEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> MergeEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// 執行 fetch → parse → validate → dedup → group → write。
    ///
    /// The playlist is always written, even when it only holds the header;
    /// an empty result is then reported as `NoChannelsAvailable`.
    pub async fn run(&self) -> Result<RunReport> {
        tracing::info!("🚀 Starting playlist merge");

        let extracted = self.pipeline.extract().await?;
        let sources_attempted = extracted.sources.len();
        let sources_failed = extracted.failed_sources();
        let candidates = extracted.candidates.len();

        if sources_attempted > 0 && sources_failed == sources_attempted {
            tracing::error!("❌ All {} sources failed to download", sources_attempted);
        }

        let result = self.pipeline.transform(extracted).await?;
        let output_path = self.pipeline.load(&result).await?;

        if result.document.is_empty() {
            return Err(MergeError::NoChannelsAvailable {
                sources_attempted,
                sources_failed,
                candidates,
            });
        }

        let mut report = result.report;
        report.output_path = Some(output_path);

        tracing::info!(
            "🎉 Merge complete: {} channels in {} categories from {} sources",
            report.written,
            report.categories,
            sources_attempted - sources_failed
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{
        AggregateDocument, ChannelRecord, ExtractResult, FetchError, SourceReport, TransformResult,
    };
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct StubPipeline {
        extracted: ExtractResult,
        live: Vec<ChannelRecord>,
        loaded: AtomicBool,
    }

    impl StubPipeline {
        fn new(sources: Vec<SourceReport>, live: Vec<ChannelRecord>) -> Self {
            Self {
                extracted: ExtractResult {
                    candidates: live.clone(),
                    sources,
                },
                live,
                loaded: AtomicBool::new(false),
            }
        }
    }

    fn source(name: &str, error: Option<FetchError>) -> SourceReport {
        SourceReport {
            name: name.to_string(),
            location: format!("http://example.com/{}.m3u", name),
            channels: 0,
            error,
        }
    }

    #[async_trait::async_trait]
    impl Pipeline for StubPipeline {
        async fn extract(&self) -> Result<ExtractResult> {
            Ok(self.extracted.clone())
        }

        async fn transform(&self, extracted: ExtractResult) -> Result<TransformResult> {
            let document = AggregateDocument::from_records(self.live.clone());
            Ok(TransformResult {
                playlist_output: crate::core::serializer::render(&document),
                report: RunReport {
                    generated_at: Utc::now(),
                    output_path: None,
                    sources: extracted.sources,
                    candidates: extracted.candidates.len(),
                    probed: extracted.candidates.len(),
                    live: document.len(),
                    dead: 0,
                    duplicates: 0,
                    written: document.len(),
                    categories: document.category_count(),
                },
                document,
            })
        }

        async fn load(&self, _result: &TransformResult) -> Result<String> {
            self.loaded.store(true, Ordering::SeqCst);
            Ok("/tmp/merged.m3u".to_string())
        }
    }

    #[tokio::test]
    async fn test_run_returns_report_with_output_path() {
        let engine = MergeEngine::new(StubPipeline::new(
            vec![source("a", None)],
            vec![ChannelRecord::new("One", "http://a/1", "a")],
        ));

        let report = engine.run().await.unwrap();
        assert_eq!(report.output_path.as_deref(), Some("/tmp/merged.m3u"));
        assert_eq!(report.written, 1);
    }

    #[tokio::test]
    async fn test_all_sources_failing_writes_header_and_errors() {
        let engine = MergeEngine::new(StubPipeline::new(
            vec![
                source("a", Some(FetchError::Unreachable { status: 503 })),
                source("b", Some(FetchError::NotAPlaylist)),
            ],
            vec![],
        ));

        let err = engine.run().await.unwrap_err();
        assert!(engine.pipeline.loaded.load(Ordering::SeqCst));
        match err {
            MergeError::NoChannelsAvailable {
                sources_attempted,
                sources_failed,
                candidates,
            } => {
                assert_eq!(sources_attempted, 2);
                assert_eq!(sources_failed, 2);
                assert_eq!(candidates, 0);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
