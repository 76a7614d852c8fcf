/// Audio transform for voice comments
///
/// Voices are disguised by raising the pitch: the recording is relabelled
/// with a higher sample rate (which speeds it up and raises the pitch) and
/// then resampled to 44.1 kHz WAV.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};

/// Output sample rate
pub const OUTPUT_SAMPLE_RATE: u32 = 44_100;

/// Default pitch raise, in octaves of a 1.5 base
pub const DEFAULT_OCTAVES: f64 = 0.5;

/// Turns an uploaded recording into the stored voice comment
#[async_trait]
pub trait AudioTransform: Send + Sync {
    /// Reads `input` and writes a WAV file to `output`
    async fn pitch_shift(&self, input: &Path, output: &Path) -> StoreResult<()>;
}

/// Sample rate the input is relabelled with before resampling
pub fn shifted_rate(source_rate: u32, octaves: f64) -> u32 {
    (f64::from(source_rate) * 1.5f64.powf(octaves)) as u32
}

/// ffmpeg audio filter for a given shifted rate
pub fn pitch_filter(shifted_rate: u32) -> String {
    format!("asetrate={},aresample={}", shifted_rate, OUTPUT_SAMPLE_RATE)
}

/// Parses the sample rate printed by ffprobe
pub fn parse_sample_rate(stdout: &str) -> StoreResult<u32> {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .and_then(|line| line.parse::<u32>().ok())
        .filter(|rate| *rate > 0)
        .ok_or_else(|| StoreError::Media(format!("could not read sample rate from {:?}", stdout.trim())))
}

/// Pitch shift with the ffmpeg command line tools
#[derive(Debug, Clone)]
pub struct FfmpegPitchShift {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
    octaves: f64,
    timeout: Duration,
}

impl FfmpegPitchShift {
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
            octaves: DEFAULT_OCTAVES,
            timeout,
        }
    }

    /// Sets the pitch raise
    pub fn with_octaves(mut self, octaves: f64) -> Self {
        self.octaves = octaves;
        self
    }

    fn probe_args(input: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "-v",
            "error",
            "-select_streams",
            "a:0",
            "-show_entries",
            "stream=sample_rate",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ]
        .into_iter()
        .map(OsString::from)
        .collect();
        args.push(input.as_os_str().to_owned());
        args
    }

    fn ffmpeg_args(input: &Path, output: &Path, shifted_rate: u32) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-hide_banner".into(), "-y".into(), "-i".into()];
        args.push(input.as_os_str().to_owned());
        args.push("-vn".into());
        args.push("-af".into());
        args.push(pitch_filter(shifted_rate).into());
        args.push("-f".into());
        args.push("wav".into());
        args.push(output.as_os_str().to_owned());
        args
    }

    async fn run(&self, program: &Path, args: Vec<OsString>) -> StoreResult<Vec<u8>> {
        let mut command = Command::new(program);
        command.args(&args).kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| {
                warn!(program = %program.display(), timeout = ?self.timeout, "Audio tool timed out");
                StoreError::Media(format!("{} timed out after {:?}", program.display(), self.timeout))
            })?
            .map_err(|e| StoreError::Media(format!("failed to run {}: {}", program.display(), e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(program = %program.display(), status = %output.status, "Audio tool failed");
            return Err(StoreError::Media(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl AudioTransform for FfmpegPitchShift {
    async fn pitch_shift(&self, input: &Path, output: &Path) -> StoreResult<()> {
        let stdout = self.run(&self.ffprobe, Self::probe_args(input)).await?;
        let source_rate = parse_sample_rate(&String::from_utf8_lossy(&stdout))?;
        let rate = shifted_rate(source_rate, self.octaves);

        self.run(&self.ffmpeg, Self::ffmpeg_args(input, output, rate)).await?;

        debug!(source_rate, shifted_rate = rate, output = %output.display(), "Pitch-shifted recording");
        Ok(())
    }
}
