use crate::domain::model::{AggregateDocument, ChannelRecord};

pub const HEADER: &str = "#EXTM3U";

/// 換行與逗號改為空白，連續空白合併
fn neutralize(value: &str) -> String {
    value
        .replace([',', '\r', '\n'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn metadata_line(record: &ChannelRecord) -> String {
    let category = neutralize(&record.category).replace('"', "'");
    format!(
        "#EXTINF:-1 group-title=\"{}\",{}",
        category,
        neutralize(&record.display_name)
    )
}

pub fn render(document: &AggregateDocument) -> String {
    let mut lines = vec![HEADER.to_string()];
    for (_, channels) in document.iter() {
        for record in channels {
            lines.push(metadata_line(record));
            lines.push(record.stream_uri.trim().to_string());
        }
    }
    let mut output = lines.join("\n");
    output.push('\n');
    output
}
