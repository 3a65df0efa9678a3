use crate::media::{MediaClass, MediaFile, TypeTag};
use crate::metadata::{MetadataReader, ResolvedMetadata};
use crate::namer::{skip_prefix, synthesize};
use crate::resolver::{default_readers, resolve};
use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameCandidate {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub type_tag: TypeTag,
    pub ordinal: usize,
    pub metadata: ResolvedMetadata,
    /// 序数を含まない `タグ_日時_` の先頭部分。再実行時のスキップ判定に使う。
    pub skip_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanFailure {
    pub path: PathBuf,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PlanStats {
    pub discovered: usize,
    pub planned: usize,
    pub unresolved: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenamePlan {
    pub class: MediaClass,
    pub candidates: Vec<RenameCandidate>,
    pub failures: Vec<PlanFailure>,
    pub stats: PlanStats,
}

pub fn generate_plan(base_dir: &Path, class: MediaClass) -> Result<RenamePlan> {
    generate_plan_with_readers(base_dir, class, &default_readers())
}

/// 発見順に序数を確定してから、メタデータ解決だけを並列に行う。
/// 解決結果は発見順に戻してから出力名を合成する。
pub fn generate_plan_with_readers(
    base_dir: &Path,
    class: MediaClass,
    readers: &[Box<dyn MetadataReader>],
) -> Result<RenamePlan> {
    if !base_dir.is_dir() {
        anyhow::bail!("ベースフォルダが存在しません: {}", base_dir.display());
    }

    let files = collect_media_files(base_dir, class)?;
    let batch_size = files.len();

    let resolved: Vec<_> = files
        .par_iter()
        .map(|file| resolve(file, class, readers))
        .collect();

    let mut candidates = Vec::with_capacity(batch_size);
    let mut failures = Vec::new();

    for (index, (file, outcome)) in files.iter().zip(resolved).enumerate() {
        let ordinal = index + 1;
        match outcome {
            Ok((metadata, type_tag)) => {
                let file_name = synthesize(
                    type_tag,
                    &metadata.taken_at,
                    ordinal,
                    batch_size,
                    &file.extension,
                );
                let prefix = skip_prefix(type_tag, &metadata.taken_at);
                candidates.push(RenameCandidate {
                    input_path: file.path.clone(),
                    output_path: file.directory.join(file_name),
                    type_tag,
                    ordinal,
                    metadata,
                    skip_prefix: prefix,
                });
            }
            Err(err) => {
                eprintln!("処理をスキップします: {} ({err:#})", file.path.display());
                failures.push(PlanFailure {
                    path: file.path.clone(),
                    message: format!("{err:#}"),
                });
            }
        }
    }

    let stats = PlanStats {
        discovered: batch_size,
        planned: candidates.len(),
        unresolved: failures.len(),
    };

    Ok(RenamePlan {
        class,
        candidates,
        failures,
        stats,
    })
}

/// 直下のみを列挙する。拡張子は大文字小文字を区別し、パス順で安定化する。
fn collect_media_files(base_dir: &Path, class: MediaClass) -> Result<Vec<MediaFile>> {
    let mut out = Vec::new();

    for entry in fs::read_dir(base_dir)
        .with_context(|| format!("フォルダを読めませんでした: {}", base_dir.display()))?
    {
        let entry = entry.with_context(|| format!("エントリ読み取り失敗: {}", base_dir.display()))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(extension) = path.extension().and_then(|v| v.to_str()) else {
            continue;
        };
        if !class.extensions().contains(&extension) {
            continue;
        }
        if let Some(file) = MediaFile::from_path(&path) {
            out.push(file);
        }
    }

    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::{generate_plan, generate_plan_with_readers};
    use crate::media::{MediaClass, MediaFile, TypeTag};
    use crate::metadata::{MetadataReader, MetadataSource, PartialMetadata};
    use anyhow::Result;
    use chrono::{DateTime, Local, TimeZone};
    use std::collections::HashSet;
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    /// ファイル名先頭が一致したときだけ日時とモデルを返すスタブ。
    struct NamedStub {
        prefix: &'static str,
        taken_at: DateTime<Local>,
        model: Option<&'static str>,
    }

    impl MetadataReader for NamedStub {
        fn source(&self) -> MetadataSource {
            MetadataSource::Exif
        }

        fn supports(&self, _file: &MediaFile) -> bool {
            true
        }

        fn read(&self, file: &MediaFile) -> Result<PartialMetadata> {
            if !file.base_name.starts_with(self.prefix) {
                return Ok(PartialMetadata::default());
            }
            Ok(PartialMetadata {
                taken_at: Some(self.taken_at),
                model: self.model.map(str::to_string),
            })
        }
    }

    fn boxed(readers: Vec<NamedStub>) -> Vec<Box<dyn MetadataReader>> {
        readers
            .into_iter()
            .map(|r| Box::new(r) as Box<dyn MetadataReader>)
            .collect()
    }

    fn touch(path: &Path) {
        fs::write(path, b"x").expect("file must be creatable");
    }

    #[test]
    fn collects_case_sensitive_extensions_non_recursively() {
        let temp = tempdir().expect("tempdir");
        touch(&temp.path().join("a.jpg"));
        touch(&temp.path().join("b.JPEG"));
        touch(&temp.path().join("c.Jpg"));
        touch(&temp.path().join("d.txt"));
        fs::create_dir(temp.path().join("nested")).expect("nested dir");
        touch(&temp.path().join("nested").join("e.jpg"));

        let plan = generate_plan(temp.path(), MediaClass::Images).expect("plan");
        let names: Vec<String> = plan
            .candidates
            .iter()
            .map(|c| {
                c.input_path
                    .file_name()
                    .expect("file name")
                    .to_string_lossy()
                    .to_string()
            })
            .collect();
        assert_eq!(names, vec!["a.jpg".to_string(), "b.JPEG".to_string()]);
        assert_eq!(plan.stats.discovered, 2);
    }

    #[test]
    fn ordinals_follow_discovery_order_and_outputs_are_unique() {
        let temp = tempdir().expect("tempdir");
        for name in ["a.jpg", "b.jpg", "c.jpg"] {
            touch(&temp.path().join(name));
        }
        let readers = boxed(vec![NamedStub {
            prefix: "",
            taken_at: Local.with_ymd_and_hms(2021, 5, 1, 10, 0, 0).unwrap(),
            model: Some("X-T5"),
        }]);

        let plan =
            generate_plan_with_readers(temp.path(), MediaClass::Images, &readers).expect("plan");
        let ordinals: Vec<usize> = plan.candidates.iter().map(|c| c.ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);

        let outputs: HashSet<_> = plan.candidates.iter().map(|c| &c.output_path).collect();
        assert_eq!(outputs.len(), 3);
    }

    #[test]
    fn camera_photo_and_screenshot_get_expected_names() {
        let temp = tempdir().expect("tempdir");
        touch(&temp.path().join("a.jpg"));
        touch(&temp.path().join("b.jpg"));
        let readers = boxed(vec![NamedStub {
            prefix: "a",
            taken_at: Local.with_ymd_and_hms(2021, 5, 1, 10, 0, 0).unwrap(),
            model: Some("iPhone"),
        }]);

        let plan =
            generate_plan_with_readers(temp.path(), MediaClass::Images, &readers).expect("plan");
        assert_eq!(plan.candidates.len(), 2);

        let first = &plan.candidates[0];
        let first_name = first.output_path.file_name().unwrap().to_string_lossy();
        assert_eq!(first.type_tag, TypeTag::CameraImage);
        assert!(first_name.starts_with("I_20210501_100000_00001_"));
        assert!(first_name.ends_with(".jpg"));

        // bはメタデータなし → ファイル作成日時でWタグ
        let second = &plan.candidates[1];
        let second_name = second.output_path.file_name().unwrap().to_string_lossy();
        assert_eq!(second.type_tag, TypeTag::NonCameraImage);
        assert_eq!(second.metadata.source, MetadataSource::FallbackFileCreated);
        assert!(second_name.starts_with("W_"));
        assert!(second_name.contains("_00002_"));
    }

    #[test]
    fn jpeg_extension_normalizes_in_output() {
        let temp = tempdir().expect("tempdir");
        touch(&temp.path().join("photo.JPEG"));
        let readers = boxed(vec![NamedStub {
            prefix: "",
            taken_at: Local.with_ymd_and_hms(2021, 5, 1, 10, 0, 0).unwrap(),
            model: None,
        }]);

        let plan =
            generate_plan_with_readers(temp.path(), MediaClass::Images, &readers).expect("plan");
        let name = plan.candidates[0]
            .output_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .to_string();
        assert!(name.ends_with(".jpg"));
        assert!(!name.ends_with(".JPEG"));
        assert!(!name.ends_with(".jpeg"));
    }

    #[test]
    fn movies_plan_with_m_tag_only() {
        let temp = tempdir().expect("tempdir");
        touch(&temp.path().join("clip.MP4"));
        touch(&temp.path().join("video.mov"));

        let plan = generate_plan(temp.path(), MediaClass::Movies).expect("plan");
        assert_eq!(plan.candidates.len(), 2);
        for candidate in &plan.candidates {
            assert_eq!(candidate.type_tag, TypeTag::Movie);
            assert_eq!(
                candidate.metadata.source,
                MetadataSource::FallbackFileCreated
            );
            let name = candidate.output_path.file_name().unwrap().to_string_lossy();
            assert!(name.starts_with("M_"));
        }
    }

    #[test]
    fn missing_base_dir_is_an_error() {
        let temp = tempdir().expect("tempdir");
        let missing = temp.path().join("missing");
        assert!(generate_plan(&missing, MediaClass::Images).is_err());
    }
}
