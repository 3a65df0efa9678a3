use anyhow::Result;
use clap::{Parser, ValueEnum};
use fmedia_renamer_core::{apply_plan, generate_plan, MediaClass, RenamePlan};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "fmedia-renamer-cli")]
#[command(about = "写真と動画のファイル名を撮影日時ベースの正規名へ一括リネームします")]
struct Cli {
    /// 対象フォルダ(直下のみ)
    base_dir: PathBuf,
    /// 計画の表示のみで実ファイルを変更しない
    #[arg(long, default_value_t = false)]
    dry_run: bool,
    #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    for class in [MediaClass::Images, MediaClass::Movies] {
        let plan = generate_plan(&cli.base_dir, class)?;

        match cli.output {
            OutputFormat::Json => {
                println!("{}", serde_json::to_string_pretty(&plan)?);
            }
            OutputFormat::Table => {
                print_table(&plan);
            }
        }

        if cli.dry_run {
            eprintln!("dry-runモード: 実ファイルは変更していません。");
            continue;
        }

        let result = apply_plan(&plan);
        eprintln!(
            "適用完了 ({}): リネーム {}件 / スキップ {}件 / 失敗 {}件",
            class.label(),
            result.renamed,
            result.skipped,
            result.failed
        );
    }

    Ok(())
}

fn print_table(plan: &RenamePlan) {
    println!("元ファイル -> 新ファイル (source)");
    for candidate in &plan.candidates {
        println!(
            "{} -> {} ({:?})",
            candidate.input_path.display(),
            candidate.output_path.display(),
            candidate.metadata.source
        );
    }

    println!(
        "\n集計 ({}): discovered={} planned={} unresolved={}",
        plan.class.label(),
        plan.stats.discovered,
        plan.stats.planned,
        plan.stats.unresolved
    );
}
