use crate::media::TypeTag;
use chrono::{DateTime, Local};
use sha2::{Digest, Sha256};

/// 序数の桁数。小さいバッチでも幅が揺れないよう最低5桁とする。
pub fn pad_width(batch_size: usize) -> usize {
    batch_size.max(1).to_string().len().max(5)
}

/// `.jpeg` は `.jpg` に寄せ、それ以外は小文字化する。
pub fn normalize_extension(extension: &str) -> String {
    let lower = extension.to_ascii_lowercase();
    if lower == ".jpeg" {
        ".jpg".to_string()
    } else {
        lower
    }
}

pub fn format_timestamp(taken_at: &DateTime<Local>) -> String {
    taken_at.format("%Y%m%d_%H%M%S").to_string()
}

/// `I_20210501_100000_` の形。既に正規名かどうかの判定はこの単位で行う。
/// 序数はバッチ構成のたびに振り直されるため、判定に含めない。
pub fn skip_prefix(tag: TypeTag, taken_at: &DateTime<Local>) -> String {
    format!("{}_{}_", tag.letter(), format_timestamp(taken_at))
}

/// `I_20210501_100000_00001_` の形。合成名の先頭部分。
pub fn canonical_prefix(
    tag: TypeTag,
    taken_at: &DateTime<Local>,
    ordinal: usize,
    batch_size: usize,
) -> String {
    format!(
        "{}{:0width$}_",
        skip_prefix(tag, taken_at),
        ordinal,
        width = pad_width(batch_size)
    )
}

/// 決定的なファイル名合成。同じ論理入力は常に同じ名前になる。
pub fn synthesize(
    tag: TypeTag,
    taken_at: &DateTime<Local>,
    ordinal: usize,
    batch_size: usize,
    extension: &str,
) -> String {
    let prefix = canonical_prefix(tag, taken_at, ordinal, batch_size);
    let extension = normalize_extension(extension);
    let seed = format!("{prefix}{extension}");
    format!("{}{}{}", prefix, fingerprint(&seed), extension)
}

fn fingerprint(seed: &str) -> String {
    let digest = Sha256::digest(seed.as_bytes());
    hex::encode(&digest[..3])
}
