use crate::domain::model::SourceDescriptor;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{MergeError, Result};
use reqwest::header::HeaderValue;
use std::time::Duration;
use url::Url;

pub const MAX_PROBE_CONCURRENCY: usize = 1000;
pub const MAX_TIMEOUT_SECS: u64 = 600;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field: &str, value: impl ToString, reason: impl Into<String>) -> MergeError {
    MergeError::InvalidConfigValueError {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

/// 來源必須是可用 HTTP 下載的播放清單
pub fn validate_source(index: usize, source: &SourceDescriptor) -> Result<()> {
    if source.name.trim().is_empty() {
        return Err(invalid(
            &format!("sources[{}].name", index),
            &source.name,
            "Source name cannot be blank",
        ));
    }

    let field = format!("sources[{}].url", index);
    let url = Url::parse(source.location.trim())
        .map_err(|e| invalid(&field, &source.location, format!("Invalid URL format: {}", e)))?;

    match url.scheme() {
        "http" | "https" => {}
        // 串流網址要放在清單裡，不能當成來源
        "rtmp" | "udp" => {
            return Err(invalid(
                &field,
                &source.location,
                "This is a stream address; sources must be playlists served over http(s)",
            ))
        }
        scheme => {
            return Err(invalid(
                &field,
                &source.location,
                format!("Unsupported URL scheme: {}", scheme),
            ))
        }
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid(&field, &source.location, "Source URL has no host"));
    }

    Ok(())
}

/// 輸出目錄或檔名
pub fn validate_output_target(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(field, value, "Output location cannot be empty"));
    }
    if value.contains('\0') {
        return Err(invalid(field, value, "Output location contains null bytes"));
    }
    Ok(())
}

pub fn validate_timeout(field: &str, timeout: Duration) -> Result<()> {
    let secs = timeout.as_secs();
    if !(1..=MAX_TIMEOUT_SECS).contains(&secs) {
        return Err(invalid(
            field,
            format!("{}s", secs),
            format!("Timeout must be between 1 and {} seconds", MAX_TIMEOUT_SECS),
        ));
    }
    Ok(())
}

pub fn validate_probe_concurrency(max_concurrent: usize) -> Result<()> {
    if !(1..=MAX_PROBE_CONCURRENCY).contains(&max_concurrent) {
        return Err(invalid(
            "max_concurrent_probes",
            max_concurrent,
            format!("Probe concurrency must be between 1 and {}", MAX_PROBE_CONCURRENCY),
        ));
    }
    Ok(())
}

/// User-Agent 會原樣放進每個請求標頭
pub fn validate_user_agent(user_agent: &str) -> Result<()> {
    if user_agent.trim().is_empty() {
        return Err(invalid("user_agent", user_agent, "User agent cannot be blank"));
    }
    if HeaderValue::from_str(user_agent).is_err() {
        return Err(invalid(
            "user_agent",
            user_agent,
            "User agent contains characters not allowed in an HTTP header",
        ));
    }
    Ok(())
}

/// 所有設定來源共用的檢查
pub fn validate_merge_settings<C: ConfigProvider + ?Sized>(config: &C) -> Result<()> {
    if config.sources().is_empty() {
        return Err(MergeError::MissingConfigError {
            field: "sources".to_string(),
        });
    }
    for (index, source) in config.sources().iter().enumerate() {
        validate_source(index, source)?;
    }

    validate_output_target("output_path", config.output_path())?;
    validate_output_target("output_file", config.output_file())?;
    if let Some(report) = config.report_file() {
        validate_output_target("report_file", report)?;
        if report == config.output_file() {
            return Err(invalid(
                "report_file",
                report,
                "Report would overwrite the playlist; choose a different file name",
            ));
        }
    }

    validate_probe_concurrency(config.max_concurrent_probes())?;
    validate_timeout("fetch_timeout", config.fetch_timeout())?;
    validate_timeout("probe_timeout", config.probe_timeout())?;
    validate_user_agent(config.user_agent())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(location: &str) -> SourceDescriptor {
        SourceDescriptor::new("Provider", location)
    }

    #[test]
    fn test_validate_source() {
        assert!(validate_source(0, &source("https://example.com/list.m3u")).is_ok());
        assert!(validate_source(0, &source("http://example.com")).is_ok());
        assert!(validate_source(0, &source("")).is_err());
        assert!(validate_source(0, &source("invalid-url")).is_err());
        assert!(validate_source(0, &source("ftp://example.com/list.m3u")).is_err());
        assert!(validate_source(0, &SourceDescriptor::new("  ", "http://example.com")).is_err());
    }

    #[test]
    fn test_stream_address_is_not_a_source() {
        let err = validate_source(2, &source("rtmp://example.com/live")).unwrap_err();
        match err {
            MergeError::InvalidConfigValueError { field, reason, .. } => {
                assert_eq!(field, "sources[2].url");
                assert!(reason.contains("stream address"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validate_timeout_and_concurrency() {
        assert!(validate_timeout("probe_timeout", Duration::from_secs(5)).is_ok());
        assert!(validate_timeout("probe_timeout", Duration::from_millis(500)).is_err());
        assert!(validate_timeout("fetch_timeout", Duration::from_secs(601)).is_err());

        assert!(validate_probe_concurrency(150).is_ok());
        assert!(validate_probe_concurrency(0).is_err());
        assert!(validate_probe_concurrency(5000).is_err());
    }

    #[test]
    fn test_validate_output_target() {
        assert!(validate_output_target("output_path", "./out").is_ok());
        assert!(validate_output_target("output_path", "").is_err());
        assert!(validate_output_target("output_file", "bad\0name.m3u").is_err());
    }

    #[test]
    fn test_validate_user_agent() {
        assert!(validate_user_agent("VLC/3.0.18 LibVLC/3.0.18").is_ok());
        assert!(validate_user_agent("   ").is_err());
        assert!(validate_user_agent("VLC\n3.0").is_err());
    }
}
