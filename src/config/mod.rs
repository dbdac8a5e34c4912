pub mod cli;
pub mod sources;
pub mod toml_config;

pub const DEFAULT_SOURCES_FILE: &str = "sources.txt";
pub const DEFAULT_OUTPUT_FILE: &str = "master_playlist.m3u";
/// 偽裝成 VLC，部分伺服器會封鎖批次下載工具
pub const DEFAULT_USER_AGENT: &str = "VLC/3.0.18 LibVLC/3.0.18";
pub const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;
pub const DEFAULT_MAX_CONCURRENT_PROBES: usize = 150;

#[cfg(feature = "cli")]
pub use cli_config::CliConfig;

#[cfg(feature = "cli")]
mod cli_config {
    use super::*;
    use crate::core::{CategoryMode, ConfigProvider, SourceDescriptor};
    use crate::utils::error::Result;
    use crate::utils::validation::{validate_merge_settings, Validate};
    use clap::Parser;
    use std::time::Duration;

    #[derive(Debug, Clone, Parser)]
    #[command(name = "m3u-merge")]
    #[command(about = "Merge IPTV playlists into one validated, deduplicated playlist")]
    pub struct CliConfig {
        /// File listing one source per line (`url` or `name,url`)
        #[arg(long, default_value = DEFAULT_SOURCES_FILE)]
        pub sources_file: String,

        /// Additional source, `url` or `name,url` (repeatable)
        #[arg(long = "source")]
        pub extra_sources: Vec<String>,

        #[arg(long, default_value = ".")]
        pub output_path: String,

        #[arg(long, default_value = DEFAULT_OUTPUT_FILE)]
        pub output_file: String,

        /// Write a JSON run report next to the playlist
        #[arg(long)]
        pub report_file: Option<String>,

        #[arg(long, default_value_t = DEFAULT_MAX_CONCURRENT_PROBES)]
        pub max_concurrent_probes: usize,

        #[arg(long, default_value_t = DEFAULT_FETCH_TIMEOUT_SECS)]
        pub fetch_timeout_secs: u64,

        #[arg(long, default_value_t = DEFAULT_PROBE_TIMEOUT_SECS)]
        pub probe_timeout_secs: u64,

        #[arg(long, default_value = DEFAULT_USER_AGENT)]
        pub user_agent: String,

        #[arg(long, value_enum, default_value_t = CategoryMode::Combined)]
        pub category_mode: CategoryMode,

        #[arg(short, long, help = "Enable verbose output")]
        pub verbose: bool,

        #[arg(long, help = "Emit logs as JSON")]
        pub json_logs: bool,

        #[arg(skip)]
        pub sources: Vec<SourceDescriptor>,
    }

    impl CliConfig {
        /// 讀取來源清單檔，並附加 `--source` 參數
        pub fn resolve_sources(&mut self) -> Result<()> {
            let mut sources = super::sources::load_sources_file(&self.sources_file, 1)?;
            for entry in &self.extra_sources {
                if let Some(source) = super::sources::parse_source_entry(entry, sources.len() + 1) {
                    sources.push(source);
                }
            }
            self.sources = sources;
            Ok(())
        }
    }

    impl ConfigProvider for CliConfig {
        fn sources(&self) -> &[SourceDescriptor] {
            &self.sources
        }

        fn output_path(&self) -> &str {
            &self.output_path
        }

        fn output_file(&self) -> &str {
            &self.output_file
        }

        fn report_file(&self) -> Option<&str> {
            self.report_file.as_deref()
        }

        fn fetch_timeout(&self) -> Duration {
            Duration::from_secs(self.fetch_timeout_secs)
        }

        fn probe_timeout(&self) -> Duration {
            Duration::from_secs(self.probe_timeout_secs)
        }

        fn max_concurrent_probes(&self) -> usize {
            self.max_concurrent_probes
        }

        fn user_agent(&self) -> &str {
            &self.user_agent
        }

        fn category_mode(&self) -> CategoryMode {
            self.category_mode
        }
    }

    impl Validate for CliConfig {
        fn validate(&self) -> Result<()> {
            validate_merge_settings(self)
        }
    }

}
