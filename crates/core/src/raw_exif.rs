use crate::media::MediaFile;
use crate::metadata::{normalize, parse_timestamp, MetadataReader, MetadataSource, PartialMetadata};
use crate::namer::normalize_extension;
use anyhow::{bail, Context, Result};
use std::fs;

const MARKER_APP1: u8 = 0xE1;
const TAG_EXIF_IFD_POINTER: u16 = 0x8769;
const TAG_DATETIME_ORIGINAL: u16 = 0x9003;
const TAG_LENS_MODEL: u16 = 0xA434;

/// APP1セグメントのTIFF構造を直接歩く簡易リーダ。JPEG系のみ対象。
/// 高水準リーダが日時を返さないファイルでも、Exif IFD直下のタグだけは
/// 拾えることがあるための二段目。
pub struct RawJpegReader;

impl MetadataReader for RawJpegReader {
    fn source(&self) -> MetadataSource {
        MetadataSource::RawJpegExif
    }

    fn supports(&self, file: &MediaFile) -> bool {
        normalize_extension(&file.extension) == ".jpg"
    }

    fn read(&self, file: &MediaFile) -> Result<PartialMetadata> {
        let bytes = fs::read(&file.path)
            .with_context(|| format!("JPEGを開けませんでした: {}", file.path.display()))?;
        let strings = match find_exif_payload(&bytes)? {
            Some(tiff) => read_exif_strings(tiff).unwrap_or_default(),
            None => ExifStrings::default(),
        };

        Ok(PartialMetadata {
            taken_at: strings
                .datetime_original
                .as_deref()
                .and_then(parse_timestamp),
            model: normalize(strings.lens_model),
        })
    }
}

#[derive(Debug, Default)]
struct ExifStrings {
    datetime_original: Option<String>,
    lens_model: Option<String>,
}

#[derive(Debug, Clone, Copy)]
enum ByteOrder {
    Little,
    Big,
}

struct IfdEntry {
    kind: u16,
    count: u32,
    raw: [u8; 4],
}

/// SOIからセグメントを順に辿り、"Exif\0\0" で始まるAPP1のTIFF本体を返す。
fn find_exif_payload(bytes: &[u8]) -> Result<Option<&[u8]>> {
    if bytes.len() < 4 || bytes[0] != 0xFF || bytes[1] != 0xD8 {
        bail!("JPEGではありません");
    }

    let mut cursor = 2usize;
    while cursor + 4 <= bytes.len() {
        if bytes[cursor] != 0xFF {
            break;
        }
        let marker = bytes[cursor + 1];
        // RST/TEMなどの単独マーカーは長さを持たない
        if marker == 0x01 || (0xD0..=0xD8).contains(&marker) {
            cursor += 2;
            continue;
        }
        // SOS以降は圧縮データ
        if marker == 0xD9 || marker == 0xDA {
            break;
        }
        let length = u16::from_be_bytes([bytes[cursor + 2], bytes[cursor + 3]]) as usize;
        if length < 2 || cursor + 2 + length > bytes.len() {
            break;
        }
        let payload = &bytes[cursor + 4..cursor + 2 + length];
        if marker == MARKER_APP1 && payload.len() > 6 && &payload[..6] == b"Exif\0\0" {
            return Ok(Some(&payload[6..]));
        }
        cursor += 2 + length;
    }

    Ok(None)
}

fn read_exif_strings(tiff: &[u8]) -> Option<ExifStrings> {
    let head = tiff.get(..2)?;
    let order = if head == b"II" {
        ByteOrder::Little
    } else if head == b"MM" {
        ByteOrder::Big
    } else {
        return None;
    };
    if read_u16(tiff, 2, order)? != 42 {
        return None;
    }

    let ifd0 = read_u32(tiff, 4, order)? as usize;
    let exif_ifd = find_ifd_entry(tiff, ifd0, order, TAG_EXIF_IFD_POINTER)
        .and_then(|entry| entry_u32(&entry, order))? as usize;

    Some(ExifStrings {
        datetime_original: find_ifd_entry(tiff, exif_ifd, order, TAG_DATETIME_ORIGINAL)
            .and_then(|entry| entry_ascii(tiff, &entry, order)),
        lens_model: find_ifd_entry(tiff, exif_ifd, order, TAG_LENS_MODEL)
            .and_then(|entry| entry_ascii(tiff, &entry, order)),
    })
}

fn find_ifd_entry(tiff: &[u8], offset: usize, order: ByteOrder, tag: u16) -> Option<IfdEntry> {
    let count = read_u16(tiff, offset, order)? as usize;
    for index in 0..count {
        let base = offset + 2 + index * 12;
        if read_u16(tiff, base, order)? != tag {
            continue;
        }
        let kind = read_u16(tiff, base + 2, order)?;
        let value_count = read_u32(tiff, base + 4, order)?;
        let raw: [u8; 4] = tiff.get(base + 8..base + 12)?.try_into().ok()?;
        return Some(IfdEntry {
            kind,
            count: value_count,
            raw,
        });
    }
    None
}

fn entry_u32(entry: &IfdEntry, order: ByteOrder) -> Option<u32> {
    // LONG型のみ。Exif IFDポインタはLONGで格納される。
    if entry.kind != 4 {
        return None;
    }
    Some(match order {
        ByteOrder::Little => u32::from_le_bytes(entry.raw),
        ByteOrder::Big => u32::from_be_bytes(entry.raw),
    })
}

fn entry_ascii(tiff: &[u8], entry: &IfdEntry, order: ByteOrder) -> Option<String> {
    if entry.kind != 2 {
        return None;
    }
    let count = entry.count as usize;
    let data = if count <= 4 {
        entry.raw.get(..count)?
    } else {
        let offset = match order {
            ByteOrder::Little => u32::from_le_bytes(entry.raw),
            ByteOrder::Big => u32::from_be_bytes(entry.raw),
        } as usize;
        tiff.get(offset..offset + count)?
    };

    let text = data.split(|b| *b == 0).next()?;
    let text = String::from_utf8_lossy(text).trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

fn read_u16(tiff: &[u8], offset: usize, order: ByteOrder) -> Option<u16> {
    let raw: [u8; 2] = tiff.get(offset..offset + 2)?.try_into().ok()?;
    Some(match order {
        ByteOrder::Little => u16::from_le_bytes(raw),
        ByteOrder::Big => u16::from_be_bytes(raw),
    })
}

fn read_u32(tiff: &[u8], offset: usize, order: ByteOrder) -> Option<u32> {
    let raw: [u8; 4] = tiff.get(offset..offset + 4)?.try_into().ok()?;
    Some(match order {
        ByteOrder::Little => u32::from_le_bytes(raw),
        ByteOrder::Big => u32::from_be_bytes(raw),
    })
}
