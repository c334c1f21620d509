//! Text recognition over an external engine.
//!
//! The capture pipeline treats recognition as an opaque service: an image
//! plus optional language hints go in, recognized lines with bounding boxes
//! and confidences come out. [`RecognitionEngine`] is the seam; the shipped
//! implementation drives a `tesseract` binary over stdin/stdout.
//!
//! Empty language hints mean "let the engine decide" and are passed through
//! unmodified; the core neither selects nor validates languages.

use crate::error::{AppError, Result};
use crate::geometry::PixelRect;
use crate::image_processing::ImageProcessor;
use image::DynamicImage;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// One recognized line of text, located in the pixel space of the image the
/// engine was given (i.e. the cropped selection, not the full snapshot).
#[derive(Debug, Clone, PartialEq)]
pub struct RecognizedLine {
    pub text: String,
    pub bounding_box: PixelRect,
    /// Engine confidence normalized to `0.0..=1.0`.
    pub confidence: f32,
}

/// Joins recognized lines into the plain-text form handed to delivery sinks.
pub fn joined_text(lines: &[RecognizedLine]) -> String {
    lines
        .iter()
        .map(|line| line.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// An asynchronous text-recognition service.
pub trait RecognitionEngine: Send + Sync {
    fn recognize<'a>(
        &'a self,
        image: &'a DynamicImage,
        language_hints: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RecognizedLine>>> + Send + 'a>>;
}

/// Recognition engine backed by a local `tesseract` binary.
///
/// The image is piped to the process as PNG and the TSV output mode is
/// parsed back into [`RecognizedLine`]s grouped by text line.
pub struct TesseractEngine {
    binary: PathBuf,
}

impl TesseractEngine {
    /// Locates `tesseract` on the `PATH`.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::EngineNotFound`] when the binary is missing,
    /// with an install hint in the message.
    pub fn locate() -> Result<Self> {
        let binary = which::which("tesseract").map_err(|_| {
            AppError::EngineNotFound(
                "tesseract not found on PATH (install it via your package manager)".into(),
            )
        })?;
        log::debug!("using recognition engine at {}", binary.display());
        Ok(Self { binary })
    }

    /// Uses an explicit engine binary, e.g. from a config override.
    pub fn with_binary(binary: PathBuf) -> Self {
        Self { binary }
    }

    async fn run(&self, png: Vec<u8>, language_hints: &[String]) -> Result<Vec<RecognizedLine>> {
        let mut command = Command::new(&self.binary);
        command
            .arg("stdin")
            .arg("stdout")
            .args(["--psm", "6"])
            .arg("tsv");
        if !language_hints.is_empty() {
            command.arg("-l").arg(language_hints.join("+"));
        }

        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| AppError::recognition("engine stdin unavailable"))?;
        stdin.write_all(&png).await?;
        drop(stdin);

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::recognition(format!(
                "engine exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Ok(parse_tsv(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl RecognitionEngine for TesseractEngine {
    fn recognize<'a>(
        &'a self,
        image: &'a DynamicImage,
        language_hints: &'a [String],
    ) -> Pin<Box<dyn Future<Output = Result<Vec<RecognizedLine>>> + Send + 'a>> {
        Box::pin(async move {
            let png = ImageProcessor::encode_png(image)?;
            self.run(png, language_hints).await
        })
    }
}

/// Parses tesseract TSV output into per-line results.
///
/// Word rows (level 5) sharing a `(page, block, paragraph, line)` key are
/// merged: text joined with spaces, bounding boxes unioned, confidence
/// averaged. Header rows, structural rows and words with negative
/// confidence are skipped.
fn parse_tsv(tsv: &str) -> Vec<RecognizedLine> {
    struct LineAccumulator {
        key: (u32, u32, u32, u32),
        words: Vec<String>,
        left: u32,
        top: u32,
        right: u32,
        bottom: u32,
        confidence_sum: f32,
    }

    impl LineAccumulator {
        fn finish(self) -> RecognizedLine {
            let count = self.words.len() as f32;
            RecognizedLine {
                text: self.words.join(" "),
                bounding_box: PixelRect::new(
                    self.left,
                    self.top,
                    self.right - self.left,
                    self.bottom - self.top,
                ),
                confidence: (self.confidence_sum / count / 100.0).clamp(0.0, 1.0),
            }
        }
    }

    let mut lines: Vec<RecognizedLine> = Vec::new();
    let mut current: Option<LineAccumulator> = None;

    for row in tsv.lines() {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 || fields[0] != "5" {
            continue;
        }

        let parsed: Option<(u32, u32, u32, u32, u32, u32, u32, u32, f32)> = (|| {
            Some((
                fields[1].parse().ok()?,
                fields[2].parse().ok()?,
                fields[3].parse().ok()?,
                fields[4].parse().ok()?,
                fields[6].parse().ok()?,
                fields[7].parse().ok()?,
                fields[8].parse().ok()?,
                fields[9].parse().ok()?,
                fields[10].parse().ok()?,
            ))
        })();
        let Some((page, block, par, line, left, top, width, height, conf)) = parsed else {
            continue;
        };
        let text = fields[11].trim();
        if conf < 0.0 || text.is_empty() {
            continue;
        }

        let key = (page, block, par, line);
        if current.as_ref().map(|acc| acc.key) != Some(key) {
            if let Some(done) = current.take() {
                lines.push(done.finish());
            }
            current = Some(LineAccumulator {
                key,
                words: Vec::new(),
                left,
                top,
                right: left + width,
                bottom: top + height,
                confidence_sum: 0.0,
            });
        }

        let acc = current.as_mut().unwrap();
        acc.words.push(text.to_string());
        acc.left = acc.left.min(left);
        acc.top = acc.top.min(top);
        acc.right = acc.right.max(left + width);
        acc.bottom = acc.bottom.max(top + height);
        acc.confidence_sum += conf;
    }

    if let Some(done) = current {
        lines.push(done.finish());
    }
    lines
}
