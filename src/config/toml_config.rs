use super::{
    DEFAULT_FETCH_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_PROBES, DEFAULT_OUTPUT_FILE,
    DEFAULT_PROBE_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use crate::core::{CategoryMode, ConfigProvider, SourceDescriptor};
use crate::utils::error::{MergeError, Result};
use crate::utils::validation::{validate_merge_settings, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;
use std::time::Duration;

static ENV_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TomlConfig {
    pub merge: MergeConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub probe: ProbeConfig,
    #[serde(default)]
    pub grouping: GroupingConfig,
    #[serde(default)]
    pub sources: Vec<SourceEntry>,
    #[serde(skip)]
    resolved_sources: Vec<SourceDescriptor>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeConfig {
    pub name: String,
    pub description: Option<String>,
    /// 額外的來源清單檔 (每行一個)
    pub sources_file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    pub path: String,
    pub file: Option<String>,
    pub report_file: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchConfig {
    pub timeout_seconds: Option<u64>,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeConfig {
    pub max_concurrent: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GroupingConfig {
    pub mode: Option<CategoryMode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceEntry {
    pub name: Option<String>,
    pub url: String,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);

        let mut config: TomlConfig =
            toml::from_str(&processed_content).map_err(|e| MergeError::ConfigValidationError {
                field: "toml_parsing".to_string(),
                message: format!("TOML parsing error: {}", e),
            })?;
        config.resolve_sources()?;
        Ok(config)
    }

    /// 替換環境變數 (例如 ${PROVIDER_TOKEN})，未定義的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_PLACEHOLDER
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }

    /// [[sources]] 在前，來源清單檔接續編號
    fn resolve_sources(&mut self) -> Result<()> {
        let mut resolved: Vec<SourceDescriptor> = self
            .sources
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                let name = entry
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|name| !name.is_empty())
                    .map(str::to_string)
                    .unwrap_or_else(|| SourceDescriptor::default_name(index + 1));
                SourceDescriptor::new(name, entry.url.trim())
            })
            .collect();

        if let Some(file) = &self.merge.sources_file {
            let from_file = super::sources::load_sources_file(file, resolved.len() + 1)?;
            resolved.extend(from_file);
        }

        self.resolved_sources = resolved;
        Ok(())
    }
}

impl ConfigProvider for TomlConfig {
    fn sources(&self) -> &[SourceDescriptor] {
        &self.resolved_sources
    }

    fn output_path(&self) -> &str {
        &self.output.path
    }

    fn output_file(&self) -> &str {
        self.output.file.as_deref().unwrap_or(DEFAULT_OUTPUT_FILE)
    }

    fn report_file(&self) -> Option<&str> {
        self.output.report_file.as_deref()
    }

    fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch.timeout_seconds.unwrap_or(DEFAULT_FETCH_TIMEOUT_SECS))
    }

    fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe.timeout_seconds.unwrap_or(DEFAULT_PROBE_TIMEOUT_SECS))
    }

    fn max_concurrent_probes(&self) -> usize {
        self.probe
            .max_concurrent
            .unwrap_or(DEFAULT_MAX_CONCURRENT_PROBES)
    }

    fn user_agent(&self) -> &str {
        self.fetch.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    fn category_mode(&self) -> CategoryMode {
        self.grouping.mode.unwrap_or_default()
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        validate_merge_settings(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_minimal_config_uses_defaults() {
        let toml_content = r#"
[merge]
name = "home"

[output]
path = "./out"

[[sources]]
url = "https://example.com/a.m3u"

[[sources]]
name = "Sports"
url = "https://example.com/sports.m3u"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.merge.name, "home");
        assert_eq!(config.output_file(), "master_playlist.m3u");
        assert_eq!(config.user_agent(), "VLC/3.0.18 LibVLC/3.0.18");
        assert_eq!(config.max_concurrent_probes(), 150);
        assert_eq!(config.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.category_mode(), CategoryMode::Combined);
        assert_eq!(
            config.sources(),
            &[
                SourceDescriptor::new("Playlist 1", "https://example.com/a.m3u"),
                SourceDescriptor::new("Sports", "https://example.com/sports.m3u"),
            ]
        );
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_config() {
        let toml_content = r#"
[merge]
name = "full"

[output]
path = "./out"
file = "all.m3u"
report_file = "all.json"

[fetch]
timeout_seconds = 10
user_agent = "Kodi/20.0"

[probe]
max_concurrent = 50
timeout_seconds = 3

[grouping]
mode = "group"

[[sources]]
url = "https://example.com/a.m3u"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.output_file(), "all.m3u");
        assert_eq!(config.report_file(), Some("all.json"));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(10));
        assert_eq!(config.user_agent(), "Kodi/20.0");
        assert_eq!(config.max_concurrent_probes(), 50);
        assert_eq!(config.category_mode(), CategoryMode::Group);
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("M3U_MERGE_TEST_HOST", "https://iptv.example.org");

        let toml_content = r#"
[merge]
name = "env"

[output]
path = "./out"

[[sources]]
url = "${M3U_MERGE_TEST_HOST}/list.m3u"

[[sources]]
url = "https://example.com/${M3U_MERGE_UNDEFINED_VAR}.m3u"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.sources()[0].location, "https://iptv.example.org/list.m3u");
        assert_eq!(
            config.sources()[1].location,
            "https://example.com/${M3U_MERGE_UNDEFINED_VAR}.m3u"
        );

        std::env::remove_var("M3U_MERGE_TEST_HOST");
    }

    #[test]
    fn test_config_validation() {
        let no_sources = r#"
[merge]
name = "empty"

[output]
path = "./out"
"#;
        let config = TomlConfig::from_toml_str(no_sources).unwrap();
        assert!(matches!(
            config.validate(),
            Err(MergeError::MissingConfigError { .. })
        ));

        let bad_probe = r#"
[merge]
name = "bad"

[output]
path = "./out"

[probe]
max_concurrent = 0

[[sources]]
url = "https://example.com/a.m3u"
"#;
        let config = TomlConfig::from_toml_str(bad_probe).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_report_cannot_overwrite_playlist() {
        let toml_content = r#"
[merge]
name = "clash"

[output]
path = "./out"
file = "tv.m3u"
report_file = "tv.m3u"

[[sources]]
url = "https://example.com/a.m3u"
"#;
        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(MergeError::InvalidConfigValueError { field, .. }) if field == "report_file"
        ));
    }

    #[test]
    fn test_sources_file_entries_follow_inline_sources() {
        let mut list = NamedTempFile::new().unwrap();
        writeln!(list, "https://example.com/from-file.m3u").unwrap();

        let toml_content = format!(
            r#"
[merge]
name = "mixed"
sources_file = "{}"

[output]
path = "./out"

[[sources]]
url = "https://example.com/inline.m3u"
"#,
            list.path().display().to_string().replace('\\', "/")
        );

        let config = TomlConfig::from_toml_str(&toml_content).unwrap();
        assert_eq!(config.sources().len(), 2);
        assert_eq!(config.sources()[1].name, "Playlist 2");
        assert_eq!(config.sources()[1].location, "https://example.com/from-file.m3u");
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(
                b"[merge]\nname = \"file-test\"\n\n[output]\npath = \"./out\"\n\n[[sources]]\nurl = \"https://example.com/a.m3u\"\n",
            )
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.merge.name, "file-test");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[merge\nname=").unwrap_err();
        assert!(matches!(err, MergeError::ConfigValidationError { .. }));
    }
}
