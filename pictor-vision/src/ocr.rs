use std::{io::ErrorKind, path::PathBuf, process::Stdio};

use async_trait::async_trait;
use image::{DynamicImage, GrayImage};
use pictor_core::{Error, ImageKind, Result, config::OcrConfig, loader};
use tokio::{io::AsyncWriteExt, process::Command};
use tracing::instrument;

#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize(&self, image: &GrayImage) -> Result<String>;
}

/// Runs the `tesseract` executable once per request, piping a PNG through
/// stdin and reading plain text from stdout.
#[derive(Debug, Clone)]
pub struct Tesseract {
    command: PathBuf,
    language: String,
}

impl Tesseract {
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            language: config.language.clone(),
        }
    }
}

#[async_trait]
impl TextRecognizer for Tesseract {
    #[instrument(level = "debug", skip_all, fields(language = %self.language))]
    async fn recognize(&self, image: &GrayImage) -> Result<String> {
        let image = DynamicImage::ImageLuma8(image.clone());
        let png = tokio::task::spawn_blocking(move || loader::encode(&image, ImageKind::Png))
            .await??;

        let mut child = Command::new(&self.command)
            .args(["stdin", "stdout", "-l", &self.language])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| match err.kind() {
                ErrorKind::NotFound => Error::EngineUnavailable(format!(
                    "OCR engine not found: {}",
                    self.command.display()
                )),
                _ => Error::EngineUnavailable(format!("Failed to start OCR engine: {err}")),
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::EngineUnavailable("OCR engine stdin unavailable".to_string()))?;
        let feed = async move {
            stdin.write_all(&png).await?;
            stdin.shutdown().await
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());

        let output = output.map_err(|err| Error::transform(format!("OCR engine failed: {err}")))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::transform(format!(
                "OCR engine exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }
        fed.map_err(|err| Error::transform(format!("Failed to send image to OCR engine: {err}")))?;

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        tracing::debug!(chars = text.len(), "recognized text");
        Ok(text)
    }
}
