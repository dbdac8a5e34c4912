//! Source-list file: one playlist per line.
//!
//! ```text
//! # comments and blank lines are ignored
//! https://example.com/plain.m3u
//! Sports,https://example.com/sports.m3u
//! "https://example.com/quoted.m3u"
//! ```

use crate::domain::model::SourceDescriptor;
use crate::utils::error::Result;
use std::path::Path;

/// 解析單行來源；`position` 為未命名時使用的編號
pub fn parse_source_entry(line: &str, position: usize) -> Option<SourceDescriptor> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let cleaned = line.replace(['"', '\''], "");
    let cleaned = cleaned.trim();

    let (name, url) = match cleaned.split_once(',') {
        // 逗號出現在網址內時不當作名稱分隔
        Some((name, url)) if !name.contains("://") => (name.trim(), url.trim()),
        _ => ("", cleaned),
    };

    if url.is_empty() {
        return None;
    }

    let name = if name.is_empty() {
        SourceDescriptor::default_name(position)
    } else {
        name.to_string()
    };

    Some(SourceDescriptor::new(name, url))
}

/// `first_position` 讓多個來源清單接續編號
pub fn parse_sources_list(content: &str, first_position: usize) -> Vec<SourceDescriptor> {
    let mut sources = Vec::new();
    for line in content.lines() {
        if let Some(source) = parse_source_entry(line, first_position + sources.len()) {
            sources.push(source);
        }
    }
    sources
}

/// 檔案不存在時回傳空清單
pub fn load_sources_file<P: AsRef<Path>>(
    path: P,
    first_position: usize,
) -> Result<Vec<SourceDescriptor>> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::warn!("Source list {} not found", path.display());
        return Ok(Vec::new());
    }

    let content = std::fs::read_to_string(path)?;
    let sources = parse_sources_list(&content, first_position);
    tracing::debug!("Loaded {} sources from {}", sources.len(), path.display());
    Ok(sources)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_sources_list() {
        let content = r#"
# my sources
https://example.com/a.m3u

Sports, https://example.com/sports.m3u
"https://example.com/quoted.m3u"
'Movies','https://example.com/movies.m3u'
"#;
        let sources = parse_sources_list(content, 1);

        assert_eq!(
            sources,
            vec![
                SourceDescriptor::new("Playlist 1", "https://example.com/a.m3u"),
                SourceDescriptor::new("Sports", "https://example.com/sports.m3u"),
                SourceDescriptor::new("Playlist 3", "https://example.com/quoted.m3u"),
                SourceDescriptor::new("Movies", "https://example.com/movies.m3u"),
            ]
        );
    }

    #[test]
    fn test_comma_inside_url_is_not_a_name() {
        let source = parse_source_entry("http://example.com/get.php?a=1,2", 7).unwrap();
        assert_eq!(source.name, "Playlist 7");
        assert_eq!(source.location, "http://example.com/get.php?a=1,2");
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let sources = load_sources_file("/definitely/not/here/sources.txt", 1).unwrap();
        assert!(sources.is_empty());
    }

    #[test]
    fn test_load_sources_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "https://example.com/one.m3u").unwrap();
        writeln!(file, "# skipped").unwrap();
        writeln!(file, "Two,https://example.com/two.m3u").unwrap();

        let sources = load_sources_file(file.path(), 3).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "Playlist 3");
        assert_eq!(sources[1].name, "Two");
    }
}
