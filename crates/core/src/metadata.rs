use crate::media::MediaFile;
use anyhow::Result;
use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MetadataSource {
    Exif,
    RawJpegExif,
    FallbackFileCreated,
}

/// ひとつのリーダが読み取れた範囲のメタデータ。
#[derive(Debug, Clone, Default)]
pub struct PartialMetadata {
    pub taken_at: Option<DateTime<Local>>,
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub source: MetadataSource,
    pub taken_at: DateTime<Local>,
    pub camera_photo: bool,
}

/// メタデータ読み取り能力。テストではスタブ実装を差し込める。
pub trait MetadataReader: Send + Sync {
    fn source(&self) -> MetadataSource;
    fn supports(&self, file: &MediaFile) -> bool;
    fn read(&self, file: &MediaFile) -> Result<PartialMetadata>;
}

pub fn normalize(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn parse_timestamp(input: &str) -> Option<DateTime<Local>> {
    let normalized = input.trim();

    let candidates = [
        "%Y:%m:%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%:z",
        "%Y-%m-%dT%H:%M:%S%.f%:z",
    ];

    for fmt in candidates {
        if let Ok(dt) = DateTime::parse_from_str(normalized, fmt) {
            return Some(dt.with_timezone(&Local));
        }
        if let Ok(naive) = NaiveDateTime::parse_from_str(normalized, fmt) {
            if let Some(local) = Local.from_local_datetime(&naive).single() {
                return Some(local);
            }
        }
    }

    None
}
