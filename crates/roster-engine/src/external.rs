//! Collaborators implemented as external programs.
//!
//! The frame is written to a scratch PNG and its path appended as the last
//! argument. The face extractor prints a JSON array of
//! `{"bbox": {...}, "embedding": [...]}` objects on stdout (empty array when
//! no face is found); the text recognizer prints plain text.

use roster_core::{
    DetectedFace, ExtractError, FaceExtractor, RawImage, RecognizeError, TextRecognizer,
};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// A program plus leading arguments, parsed from a whitespace-separated
/// command line. No shell quoting is interpreted.
#[derive(Debug, Clone)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    pub fn parse(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts.next()?;
        Some(Self {
            program,
            args: parts.collect(),
        })
    }

    fn run_on(&self, image: &Path) -> std::io::Result<Output> {
        Command::new(&self.program)
            .args(&self.args)
            .arg(image)
            .output()
    }
}

/// Scratch image file removed on drop, whatever path the caller takes.
struct ScratchImage {
    path: PathBuf,
}

impl ScratchImage {
    fn write(dir: &Path, frame: &RawImage) -> Result<Self, String> {
        let path = dir.join(format!("roster-frame-{}.png", uuid::Uuid::new_v4()));
        roster_hw::save_image(frame, &path).map_err(|e| e.to_string())?;
        Ok(Self { path })
    }
}

impl Drop for ScratchImage {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.path) {
            tracing::debug!(path = %self.path.display(), error = %e, "scratch image not removed");
        }
    }
}

/// Runs an external face-embedding program per frame.
#[derive(Debug, Clone)]
pub struct CommandExtractor {
    command: CommandLine,
    scratch_dir: PathBuf,
}

impl CommandExtractor {
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            scratch_dir: std::env::temp_dir(),
        }
    }

    pub fn with_scratch_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_dir = dir.into();
        self
    }
}

impl FaceExtractor for CommandExtractor {
    fn extract_faces(&mut self, image: &RawImage) -> Result<Vec<DetectedFace>, ExtractError> {
        let scratch = ScratchImage::write(&self.scratch_dir, image).map_err(ExtractError::Encode)?;

        let output = self
            .command
            .run_on(&scratch.path)
            .map_err(|e| ExtractError::Spawn(format!("{}: {e}", self.command.program)))?;

        if !output.status.success() {
            return Err(ExtractError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let faces = parse_faces(&output.stdout)?;
        tracing::debug!(faces = faces.len(), "extractor finished");
        Ok(faces)
    }
}

/// Parse extractor stdout. Blank output counts as "no faces".
pub fn parse_faces(stdout: &[u8]) -> Result<Vec<DetectedFace>, ExtractError> {
    if stdout.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    serde_json::from_slice(stdout).map_err(|e| ExtractError::MalformedOutput(e.to_string()))
}

/// Runs an external OCR program per image.
#[derive(Debug, Clone)]
pub struct CommandRecognizer {
    command: CommandLine,
    scratch_dir: PathBuf,
}

impl CommandRecognizer {
    pub fn new(command: CommandLine) -> Self {
        Self {
            command,
            scratch_dir: std::env::temp_dir(),
        }
    }
}

impl TextRecognizer for CommandRecognizer {
    fn recognize_text(&mut self, image: &RawImage) -> Result<String, RecognizeError> {
        let scratch =
            ScratchImage::write(&self.scratch_dir, image).map_err(RecognizeError::Failed)?;

        let output = self
            .command
            .run_on(&scratch.path)
            .map_err(|e| RecognizeError::Failed(format!("{}: {e}", self.command.program)))?;

        if !output.status.success() {
            return Err(RecognizeError::Failed(format!(
                "exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}
