use crate::exif_reader::ExifReader;
use crate::media::{MediaClass, MediaFile, TypeTag};
use crate::metadata::{MetadataReader, MetadataSource, ResolvedMetadata};
use crate::raw_exif::RawJpegReader;
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs;

/// 既定の読み取り順。高水準EXIF → JPEG生バイト走査。
pub fn default_readers() -> Vec<Box<dyn MetadataReader>> {
    vec![Box::new(ExifReader), Box::new(RawJpegReader)]
}

/// 多段フォールバックで日時と分類を確定する。
/// メタデータ由来の失敗は次段に流れ、最終的にファイル作成日時で必ず決まる。
/// statまで失敗した場合だけ、そのファイル単体のエラーとして返す。
pub fn resolve(
    file: &MediaFile,
    class: MediaClass,
    readers: &[Box<dyn MetadataReader>],
) -> Result<(ResolvedMetadata, TypeTag)> {
    // 動画は埋め込みメタデータを読まず、常にファイル作成日時を使う
    if class == MediaClass::Movies {
        let taken_at = file_created_to_local(file)?;
        return Ok((
            ResolvedMetadata {
                source: MetadataSource::FallbackFileCreated,
                taken_at,
                camera_photo: false,
            },
            TypeTag::Movie,
        ));
    }

    for reader in readers {
        if !reader.supports(file) {
            continue;
        }
        match reader.read(file) {
            Ok(partial) => {
                if let Some(taken_at) = partial.taken_at {
                    // スクリーンショットにはモデルタグがない
                    let camera_photo = partial.model.is_some();
                    return Ok((
                        ResolvedMetadata {
                            source: reader.source(),
                            taken_at,
                            camera_photo,
                        },
                        TypeTag::for_media(class, camera_photo),
                    ));
                }
            }
            Err(err) => {
                eprintln!(
                    "メタデータ読み取りに失敗しました: {} ({err:#})",
                    file.path.display()
                );
            }
        }
    }

    let taken_at = file_created_to_local(file)?;
    Ok((
        ResolvedMetadata {
            source: MetadataSource::FallbackFileCreated,
            taken_at,
            camera_photo: false,
        },
        TypeTag::for_media(class, false),
    ))
}

fn file_created_to_local(file: &MediaFile) -> Result<DateTime<Local>> {
    let meta = fs::metadata(&file.path).with_context(|| {
        format!(
            "ファイル情報を取得できませんでした: {}",
            file.path.display()
        )
    })?;
    let created = meta
        .created()
        .with_context(|| format!("作成日時を取得できませんでした: {}", file.path.display()))?;
    Ok(DateTime::from(created))
}
