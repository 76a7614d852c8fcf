/// Voice comment media handling
///
/// - `storage`: where processed recordings live (local disk or a public bucket)
/// - `transform`: the pitch shift applied to every recording
/// - `pipeline`: placeholder-to-finalized processing of an upload

pub mod pipeline;
pub mod storage;
pub mod transform;

pub use pipeline::{VoicePipeline, VoiceUpload};
pub use storage::{BucketStorage, LocalStorage, StorageBackend, StoredObject};
pub use transform::{AudioTransform, FfmpegPitchShift};
