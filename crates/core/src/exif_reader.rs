use crate::media::MediaFile;
use crate::metadata::{normalize, parse_timestamp, MetadataReader, MetadataSource, PartialMetadata};
use anyhow::{Context, Result};
use exif::{In, Reader, Tag};
use std::fs::File;
use std::io::BufReader;

/// kamadak-exif によるコンテナ経由の読み取り。PNG/JPEGの両方を扱える。
pub struct ExifReader;

impl MetadataReader for ExifReader {
    fn source(&self) -> MetadataSource {
        MetadataSource::Exif
    }

    fn supports(&self, _file: &MediaFile) -> bool {
        true
    }

    fn read(&self, file: &MediaFile) -> Result<PartialMetadata> {
        let handle = File::open(&file.path).with_context(|| {
            format!(
                "EXIF読み込み対象を開けませんでした: {}",
                file.path.display()
            )
        })?;
        let mut buf = BufReader::new(handle);
        let exif = Reader::new()
            .read_from_container(&mut buf)
            .with_context(|| format!("EXIFを解析できませんでした: {}", file.path.display()))?;

        let taken_at = field_value(&exif, Tag::DateTimeOriginal)
            .as_deref()
            .and_then(parse_timestamp);
        let model = normalize(field_value(&exif, Tag::Model));

        Ok(PartialMetadata { taken_at, model })
    }
}

fn field_value(exif: &exif::Exif, tag: Tag) -> Option<String> {
    exif.get_field(tag, In::PRIMARY)
        .map(|field| field.display_value().to_string())
}
