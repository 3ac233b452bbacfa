//! Image text extraction
//!
//! OCR is CPU-bound, so it runs in a spawned `tesseract` process instead of
//! on the event loop. The binary reads the image from stdin and writes plain
//! text to stdout. A missing binary or a failed run surfaces as an error the
//! caller turns into the "no text found" reply.

use anyhow::{bail, Context, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Run OCR over raw image bytes and return the extracted text, trimmed.
pub async fn extract_text(tesseract_bin: &str, image: &[u8]) -> Result<String> {
    let mut child = Command::new(tesseract_bin)
        .arg("-") // image from stdin
        .arg("-") // text to stdout
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .with_context(|| format!("failed to spawn {}", tesseract_bin))?;

    let mut stdin = child
        .stdin
        .take()
        .context("tesseract stdin unavailable")?;
    stdin.write_all(image).await?;
    drop(stdin);

    let output = child.wait_with_output().await?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!("tesseract exited with {}: {}", output.status, stderr.trim());
    }

    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    debug!(chars = text.len(), "ocr extracted text");
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_binary_is_error() {
        let result = extract_text("definitely-not-a-real-ocr-binary", b"bytes").await;
        assert!(result.is_err());
    }
}
