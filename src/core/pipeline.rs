use crate::core::aggregate::validate_all;
use crate::core::fetcher::SourceFetcher;
use crate::core::validator::{EndpointValidator, ProbeSettings};
use crate::core::{parser, serializer};
use crate::core::{
    ConfigProvider, ExtractResult, FetchResult, Pipeline, RunReport, SourceReport, Storage,
    TransformResult,
};
use crate::utils::error::Result;
use chrono::Utc;
use std::sync::Arc;

pub struct MergePipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    fetcher: SourceFetcher,
    validator: Arc<EndpointValidator>,
}

impl<S: Storage, C: ConfigProvider> MergePipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let fetcher = SourceFetcher::new(config.user_agent(), config.fetch_timeout())?;
        let validator = EndpointValidator::new(ProbeSettings::new(
            config.user_agent(),
            config.probe_timeout(),
            config.max_concurrent_probes(),
        ))?;

        Ok(Self {
            storage,
            config,
            fetcher,
            validator: Arc::new(validator),
        })
    }

    pub fn config(&self) -> &C {
        &self.config
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for MergePipeline<S, C> {
    async fn extract(&self) -> Result<ExtractResult> {
        let sources = self.config.sources();
        tracing::info!("📡 Fetching {} sources", sources.len());

        let mode = self.config.category_mode();
        let mut extracted = ExtractResult::default();

        for FetchResult { descriptor, outcome } in self.fetcher.fetch_all(sources).await {
            let mut report = SourceReport {
                name: descriptor.name.clone(),
                location: descriptor.location.clone(),
                channels: 0,
                error: None,
            };

            match outcome {
                Ok(body) => {
                    let channels = parser::parse(&body);
                    if channels.is_empty() {
                        tracing::warn!("⚠️  Source [{}] is empty or not recognised", descriptor.name);
                    } else {
                        tracing::info!("✅ Source [{}]: {} channels", descriptor.name, channels.len());
                    }
                    report.channels = channels.len();
                    extracted.candidates.extend(
                        channels
                            .into_iter()
                            .map(|record| mode.categorize(&descriptor, record)),
                    );
                }
                Err(error) => report.error = Some(error),
            }

            extracted.sources.push(report);
        }

        tracing::info!(
            "📊 Extracted {} candidates ({} of {} sources failed)",
            extracted.candidates.len(),
            extracted.failed_sources(),
            extracted.sources.len()
        );
        Ok(extracted)
    }

    async fn transform(&self, extracted: ExtractResult) -> Result<TransformResult> {
        let candidates = extracted.candidates.len();
        tracing::info!(
            "🔍 Validating {} candidates (max {} in flight)",
            candidates,
            self.config.max_concurrent_probes()
        );

        let (document, stats) = validate_all(Arc::clone(&self.validator), extracted.candidates).await;

        tracing::info!(
            "✅ {} live, {} dead, {} duplicates dropped",
            stats.live,
            stats.dead,
            stats.duplicates
        );

        let playlist_output = serializer::render(&document);
        let report = RunReport {
            generated_at: Utc::now(),
            output_path: None,
            sources: extracted.sources,
            candidates,
            probed: stats.probed,
            live: stats.live,
            dead: stats.dead,
            duplicates: stats.duplicates,
            written: document.len(),
            categories: document.category_count(),
        };

        Ok(TransformResult {
            document,
            playlist_output,
            report,
        })
    }

    async fn load(&self, result: &TransformResult) -> Result<String> {
        let output_file = self.config.output_file();
        let output_path = self.storage.location_of(output_file);

        tracing::debug!(
            "Writing {} channels in {} categories",
            result.document.len(),
            result.document.category_count()
        );
        self.storage
            .write_file(output_file, result.playlist_output.as_bytes())
            .await?;

        if let Some(report_file) = self.config.report_file() {
            let mut report = result.report.clone();
            report.output_path = Some(output_path.clone());
            let json = serde_json::to_string_pretty(&report)?;
            self.storage.write_file(report_file, json.as_bytes()).await?;
            tracing::debug!("Run report written to {}", self.storage.location_of(report_file));
        }

        tracing::info!("💾 Playlist saved: {}", output_path);
        Ok(output_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CategoryMode, SourceDescriptor};
    use crate::domain::model::FetchError;
    use httpmock::prelude::*;
    use std::collections::HashMap;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn location_of(&self, path: &str) -> String {
            format!("mock/{}", path)
        }
    }

    struct MockConfig {
        sources: Vec<SourceDescriptor>,
        report_file: Option<String>,
        category_mode: CategoryMode,
    }

    impl MockConfig {
        fn new(sources: Vec<SourceDescriptor>) -> Self {
            Self {
                sources,
                report_file: None,
                category_mode: CategoryMode::Source,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn sources(&self) -> &[SourceDescriptor] {
            &self.sources
        }

        fn output_path(&self) -> &str {
            "mock"
        }

        fn output_file(&self) -> &str {
            "merged.m3u"
        }

        fn report_file(&self) -> Option<&str> {
            self.report_file.as_deref()
        }

        fn fetch_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn probe_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn max_concurrent_probes(&self) -> usize {
            4
        }

        fn user_agent(&self) -> &str {
            "test-agent"
        }

        fn category_mode(&self) -> CategoryMode {
            self.category_mode
        }
    }

    #[tokio::test]
    async fn test_extract_isolates_failed_sources() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/good.m3u");
            then.status(200).body(format!(
                "#EXTM3U\n#EXTINF:-1 group-title=\"News\",One\n{}\n",
                server.url("/1.ts")
            ));
        });
        server.mock(|when, then| {
            when.method(GET).path("/html.m3u");
            then.status(200).body("<!DOCTYPE html><html></html>");
        });

        let config = MockConfig::new(vec![
            SourceDescriptor::new("Good", server.url("/good.m3u")),
            SourceDescriptor::new("Html", server.url("/html.m3u")),
        ]);
        let pipeline = MergePipeline::new(MockStorage::new(), config).unwrap();

        let extracted = pipeline.extract().await.unwrap();

        assert_eq!(extracted.candidates.len(), 1);
        assert_eq!(extracted.candidates[0].category, "Good");
        assert_eq!(extracted.sources[0].channels, 1);
        assert_eq!(extracted.sources[1].error, Some(FetchError::NotAPlaylist));
        assert_eq!(extracted.failed_sources(), 1);
    }

    #[tokio::test]
    async fn test_transform_renders_only_live_channels() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/live.ts");
            then.status(200).header("content-type", "video/mp2t").body("x");
        });
        server.mock(|when, then| {
            when.method(GET).path("/dead.ts");
            then.status(500);
        });

        let pipeline = MergePipeline::new(MockStorage::new(), MockConfig::new(vec![])).unwrap();
        let extracted = ExtractResult {
            candidates: vec![
                crate::core::ChannelRecord::new("Live", server.url("/live.ts"), "Src"),
                crate::core::ChannelRecord::new("Dead", server.url("/dead.ts"), "Src"),
            ],
            sources: vec![],
        };

        let result = pipeline.transform(extracted).await.unwrap();

        assert_eq!(result.report.candidates, 2);
        assert_eq!(result.report.live, 1);
        assert_eq!(result.report.dead, 1);
        assert_eq!(result.report.written, 1);
        assert_eq!(
            result.playlist_output,
            format!(
                "#EXTM3U\n#EXTINF:-1 group-title=\"Src\",Live\n{}\n",
                server.url("/live.ts")
            )
        );
    }

    #[tokio::test]
    async fn test_load_writes_playlist_and_report() {
        let storage = MockStorage::new();
        let mut config = MockConfig::new(vec![]);
        config.report_file = Some("report.json".to_string());
        let pipeline = MergePipeline::new(storage.clone(), config).unwrap();

        let result = pipeline.transform(ExtractResult::default()).await.unwrap();
        let output_path = pipeline.load(&result).await.unwrap();

        assert_eq!(output_path, "mock/merged.m3u");
        assert_eq!(storage.get_file("merged.m3u").await.unwrap(), b"#EXTM3U\n");

        let report: serde_json::Value =
            serde_json::from_slice(&storage.get_file("report.json").await.unwrap()).unwrap();
        assert_eq!(report["output_path"], "mock/merged.m3u");
        assert_eq!(report["written"], 0);
    }
}
