use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MediaClass {
    Images,
    Movies,
}

impl MediaClass {
    /// 拡張子は大文字小文字を区別して照合する。
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            MediaClass::Images => &["png", "PNG", "jpg", "JPG", "jpeg", "JPEG"],
            MediaClass::Movies => &["mov", "MOV", "mp4", "MP4"],
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            MediaClass::Images => "画像",
            MediaClass::Movies => "動画",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TypeTag {
    CameraImage,
    NonCameraImage,
    Movie,
}

impl TypeTag {
    pub fn for_media(class: MediaClass, camera_photo: bool) -> Self {
        match class {
            MediaClass::Movies => TypeTag::Movie,
            MediaClass::Images if camera_photo => TypeTag::CameraImage,
            MediaClass::Images => TypeTag::NonCameraImage,
        }
    }

    pub fn letter(&self) -> char {
        match self {
            TypeTag::CameraImage => 'I',
            TypeTag::NonCameraImage => 'W',
            TypeTag::Movie => 'M',
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    pub directory: PathBuf,
    pub base_name: String,
    pub extension: String,
}

impl MediaFile {
    /// パス文字列だけから構成する。拡張子は元の大文字小文字のまま保持する。
    pub fn from_path(path: &Path) -> Option<Self> {
        let directory = path.parent()?.to_path_buf();
        let base_name = path.file_stem()?.to_string_lossy().to_string();
        let extension = path
            .extension()
            .and_then(|v| v.to_str())
            .map(|v| format!(".{v}"))?;
        Some(Self {
            path: path.to_path_buf(),
            directory,
            base_name,
            extension,
        })
    }

    pub fn file_name(&self) -> String {
        format!("{}{}", self.base_name, self.extension)
    }
}
