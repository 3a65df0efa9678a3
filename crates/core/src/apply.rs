use crate::planner::{RenameCandidate, RenamePlan};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SkipReason {
    /// 入力と出力が同一パス。
    AlreadyTarget,
    /// ファイル名が既に `タグ_日時_` のプレフィックスで始まっている。
    CanonicalName,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum RenameOutcome {
    Renamed,
    Skipped { reason: SkipReason },
    Failed { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub outcome: RenameOutcome,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ApplyResult {
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub reports: Vec<FileReport>,
}

#[derive(Debug, Error)]
enum CommitError {
    #[error("リネーム先が既に存在します: {0}")]
    TargetExists(PathBuf),
    #[error("一時リネームに失敗しました: {path}: {source}")]
    Stage {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("最終リネームに失敗しました: {path}: {source}")]
    Commit {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("{message} (復元にも失敗しました: {source})")]
    Restore {
        message: String,
        source: std::io::Error,
    },
}

/// 計画を逐次適用する。失敗は常にファイル単位で、バッチ全体は最後まで進む。
///
/// 衝突回避は二段階で行う: まず対象を全て一時名に退避し、そのうえで
/// 確定名への移動を行う。バッチ内で「Aの出力名 == Bの現在名」のような
/// 連鎖があっても上書きは起こらない。確定時に出力先が既に存在していた
/// 場合は元の名前に戻して失敗として記録する。
pub fn apply_plan(plan: &RenamePlan) -> ApplyResult {
    let mut reports: Vec<Option<FileReport>> = vec![None; plan.candidates.len()];
    let mut staged: Vec<(usize, PathBuf)> = Vec::new();

    // 退避は発見順の逆から行う
    for (index, candidate) in plan.candidates.iter().enumerate().rev() {
        if let Some(reason) = skip_reason(candidate) {
            println!("スキップ: {} (既に正規名)", candidate.input_path.display());
            reports[index] = Some(report(candidate, RenameOutcome::Skipped { reason }));
            continue;
        }

        let temp_path = temp_path_for(&candidate.input_path, index);
        match fs::rename(&candidate.input_path, &temp_path) {
            Ok(()) => staged.push((index, temp_path)),
            Err(source) => {
                let err = CommitError::Stage {
                    path: candidate.input_path.clone(),
                    source,
                };
                eprintln!("{err}");
                reports[index] = Some(report(
                    candidate,
                    RenameOutcome::Failed {
                        message: err.to_string(),
                    },
                ));
            }
        }
    }

    for (index, temp_path) in &staged {
        let candidate = &plan.candidates[*index];
        let outcome = match commit_rename(candidate, temp_path) {
            Ok(()) => {
                println!(
                    "リネーム: {} -> {}",
                    candidate.input_path.display(),
                    candidate.output_path.display()
                );
                RenameOutcome::Renamed
            }
            Err(err) => {
                eprintln!("{err}");
                RenameOutcome::Failed {
                    message: err.to_string(),
                }
            }
        };
        reports[*index] = Some(report(candidate, outcome));
    }

    let reports: Vec<FileReport> = reports.into_iter().flatten().collect();
    let mut result = ApplyResult::default();
    for entry in &reports {
        match entry.outcome {
            RenameOutcome::Renamed => result.renamed += 1,
            RenameOutcome::Skipped { .. } => result.skipped += 1,
            RenameOutcome::Failed { .. } => result.failed += 1,
        }
    }
    result.reports = reports;
    result
}

fn commit_rename(candidate: &RenameCandidate, temp_path: &Path) -> Result<(), CommitError> {
    if candidate.output_path.exists() {
        let err = CommitError::TargetExists(candidate.output_path.clone());
        return Err(restore_input(candidate, temp_path, err));
    }

    match fs::rename(temp_path, &candidate.output_path) {
        Ok(()) => Ok(()),
        Err(source) => {
            let err = CommitError::Commit {
                path: candidate.output_path.clone(),
                source,
            };
            Err(restore_input(candidate, temp_path, err))
        }
    }
}

fn restore_input(candidate: &RenameCandidate, temp_path: &Path, cause: CommitError) -> CommitError {
    match fs::rename(temp_path, &candidate.input_path) {
        Ok(()) => cause,
        Err(source) => CommitError::Restore {
            message: cause.to_string(),
            source,
        },
    }
}

fn skip_reason(candidate: &RenameCandidate) -> Option<SkipReason> {
    if candidate.input_path == candidate.output_path {
        return Some(SkipReason::AlreadyTarget);
    }
    let name = candidate.input_path.file_name()?.to_string_lossy();
    if name.starts_with(&candidate.skip_prefix) {
        return Some(SkipReason::CanonicalName);
    }
    None
}

fn report(candidate: &RenameCandidate, outcome: RenameOutcome) -> FileReport {
    FileReport {
        input_path: candidate.input_path.clone(),
        output_path: candidate.output_path.clone(),
        outcome,
    }
}

fn temp_path_for(input_path: &Path, index: usize) -> PathBuf {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or(0);
    let parent = input_path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = input_path
        .file_name()
        .map(|v| v.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    parent.join(format!(".fmedia_tmp_{}_{}_{}", now, index, file_name))
}
