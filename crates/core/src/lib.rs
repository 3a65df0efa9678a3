mod apply;
mod exif_reader;
mod media;
mod metadata;
mod namer;
mod planner;
mod raw_exif;
mod resolver;

pub use apply::{apply_plan, ApplyResult, FileReport, RenameOutcome, SkipReason};
pub use exif_reader::ExifReader;
pub use media::{MediaClass, MediaFile, TypeTag};
pub use metadata::{MetadataReader, MetadataSource, PartialMetadata, ResolvedMetadata};
pub use namer::{canonical_prefix, normalize_extension, pad_width, skip_prefix, synthesize};
pub use planner::{
    generate_plan, generate_plan_with_readers, PlanFailure, PlanStats, RenameCandidate, RenamePlan,
};
pub use raw_exif::RawJpegReader;
pub use resolver::{default_readers, resolve};
