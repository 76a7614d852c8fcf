/// Voice comment pipeline
///
/// Runs after the audio placeholder has been created and the client has been
/// answered:
///
/// 1. Write the uploaded recording to the work directory
/// 2. Pitch-shift it to WAV
/// 3. Upload the WAV under the comment ID
/// 4. Attach the public URL to the placeholder
///
/// Temp files are removed whatever the outcome. When a background run fails
/// the placeholder is deleted so no comment stays empty forever.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::storage::StorageBackend;
use super::transform::AudioTransform;
use crate::error::{StoreError, StoreResult};
use crate::models::comment::Comment;
use crate::store::CommentStore;

/// Content type of processed recordings
pub const VOICE_CONTENT_TYPE: &str = "audio/wav";

/// An uploaded recording
#[derive(Debug, Clone)]
pub struct VoiceUpload {
    /// Raw file bytes
    pub data: Bytes,

    /// Original file name, used only for its extension
    pub file_name: Option<String>,
}

/// Extension to give the temp input file
///
/// ffmpeg sniffs the container, so this only needs to be harmless.
pub fn input_extension(file_name: Option<&str>) -> String {
    file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| ext.to_ascii_lowercase())
        .unwrap_or_else(|| "bin".to_string())
}

/// Background processor for voice comments
#[derive(Clone)]
pub struct VoicePipeline {
    comments: CommentStore,
    storage: Arc<dyn StorageBackend>,
    transform: Arc<dyn AudioTransform>,
    work_dir: PathBuf,
}

impl VoicePipeline {
    pub fn new(
        comments: CommentStore,
        storage: Arc<dyn StorageBackend>,
        transform: Arc<dyn AudioTransform>,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            comments,
            storage,
            transform,
            work_dir: work_dir.into(),
        }
    }

    /// Processes one recording for an existing placeholder
    ///
    /// Returns the finalized comment, or `None` if the comment was deleted
    /// while the recording was being processed.
    pub async fn process(&self, comment_id: Uuid, upload: VoiceUpload) -> StoreResult<Option<Comment>> {
        let input = self.work_dir.join(format!(
            "{}.{}",
            comment_id,
            input_extension(upload.file_name.as_deref())
        ));
        let output = self.work_dir.join(format!("{}.wav", comment_id));

        let result = self.run(comment_id, &upload.data, &input, &output).await;

        remove_quietly(&input).await;
        remove_quietly(&output).await;

        result
    }

    async fn run(
        &self,
        comment_id: Uuid,
        data: &Bytes,
        input: &Path,
        output: &Path,
    ) -> StoreResult<Option<Comment>> {
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| StoreError::Media(format!("failed to create work dir: {}", e)))?;
        tokio::fs::write(input, data)
            .await
            .map_err(|e| StoreError::Media(format!("failed to write upload: {}", e)))?;

        self.transform.pitch_shift(input, output).await?;

        let wav = tokio::fs::read(output)
            .await
            .map_err(|e| StoreError::Media(format!("failed to read transformed audio: {}", e)))?;

        let key = comment_id.to_string();
        let stored = self
            .storage
            .upload(&key, Bytes::from(wav), VOICE_CONTENT_TYPE)
            .await?;

        let comment = self.comments.finalize_audio(comment_id, &stored.url).await?;
        if comment.is_none() {
            // nothing references the object any more
            if let Err(e) = self.storage.delete(&key).await {
                warn!(comment_id = %comment_id, error = %e, "Failed to remove orphaned recording");
            }
        }

        Ok(comment)
    }

    /// Runs `process` on a background task
    ///
    /// On failure the placeholder is deleted.
    pub fn spawn(&self, comment_id: Uuid, upload: VoiceUpload) -> JoinHandle<()> {
        let pipeline = self.clone();

        tokio::spawn(async move {
            match pipeline.process(comment_id, upload).await {
                Ok(Some(comment)) => {
                    info!(comment_id = %comment.id, url = %comment.content, "Voice comment processed");
                }
                Ok(None) => {
                    debug!(comment_id = %comment_id, "Voice comment deleted during processing");
                }
                Err(e) => {
                    error!(comment_id = %comment_id, error = %e, "Voice comment processing failed");
                    match pipeline.comments.delete(comment_id).await {
                        Ok(()) | Err(StoreError::NotFound(_)) => {}
                        Err(e) => {
                            error!(comment_id = %comment_id, error = %e, "Failed to remove voice placeholder");
                        }
                    }
                }
            }
        })
    }
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove temp file");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_extension() {
        assert_eq!(input_extension(Some("voice.m4a")), "m4a");
        assert_eq!(input_extension(Some("VOICE.MP3")), "mp3");
        assert_eq!(input_extension(Some("no_extension")), "bin");
        assert_eq!(input_extension(Some("evil.sh;rm")), "bin");
        assert_eq!(input_extension(None), "bin");
    }

    #[tokio::test]
    async fn test_remove_quietly_ignores_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gone.wav");
        remove_quietly(&path).await;

        tokio::fs::write(&path, b"x").await.unwrap();
        remove_quietly(&path).await;
        assert!(!path.exists());
    }
}
