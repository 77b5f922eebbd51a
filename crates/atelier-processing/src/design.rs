//! Design-file thumbnailer
//!
//! Rasterizes vector/layered formats (psd, ai, eps, svg) into a bounded PNG
//! via ImageMagick. A failed or empty rasterization is a sub-task failure,
//! never a fatal ingest error, and no fallback rasterizer is attempted.

use anyhow::{anyhow, Context, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

#[derive(Clone)]
pub struct DesignRasterizer {
    magick_path: String,
    timeout: Duration,
}

impl DesignRasterizer {
    pub fn new(magick_path: String, timeout: Duration) -> Self {
        Self {
            magick_path,
            timeout,
        }
    }

    pub fn is_available(&self) -> bool {
        which::which(&self.magick_path).is_ok()
    }

    /// Rasterize the composite (first) view into a PNG bounded by
    /// `max_dimension`, preserving aspect ratio.
    #[tracing::instrument(skip(self, data), fields(input_bytes = data.len()))]
    pub async fn rasterize(&self, data: &[u8], extension: &str, max_dimension: u32) -> Result<Vec<u8>> {
        if !self.is_available() {
            return Err(anyhow!("Rasterizer binary {} not found", self.magick_path));
        }

        let dir = tempfile::tempdir().context("Failed to create temp dir")?;
        let input_path = dir.path().join(format!("input.{}", extension));
        let output_path = dir.path().join("output.png");

        tokio::fs::write(&input_path, data)
            .await
            .context("Failed to write rasterizer input")?;

        // [0] selects the composite/first layer; `>` only shrinks.
        let input_arg = format!("{}[0]", input_path.to_string_lossy());
        let args = vec![
            input_arg,
            "-flatten".to_string(),
            "-thumbnail".to_string(),
            format!("{}x{}>", max_dimension, max_dimension),
            format!("png:{}", output_path.to_string_lossy()),
        ];

        let child = Command::new(&self.magick_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .context("Failed to spawn rasterizer")?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| {
                anyhow!(
                    "Rasterizer timed out after {} seconds",
                    self.timeout.as_secs()
                )
            })?
            .context("Failed to wait for rasterizer")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!("Rasterizer failed: {}", stderr));
        }

        let rendered = tokio::fs::read(&output_path)
            .await
            .context("Rasterizer produced no output file")?;

        if rendered.is_empty() {
            return Err(anyhow!("Rasterizer produced zero bytes"));
        }

        tracing::info!(output_bytes = rendered.len(), "Design file rasterized");

        Ok(rendered)
    }
}
