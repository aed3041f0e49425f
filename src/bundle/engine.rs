//! Typst rendering engine.
//!
//! Handles the low-level details of writing Typst source to temporary files,
//! invoking the compiler, and reading back the output PDF.

use std::fs;
use std::process::Command;
use tempfile::tempdir;
use tempfile::TempDir;

use super::traits::DocumentRenderer;
use super::RenderError;

const SOURCE_FILE: &str = "bundle.typ";
const OUTPUT_FILE: &str = "bundle.pdf";

/// Renders Typst sources with the `typst` CLI found on `PATH` (or at `binary`).
#[derive(Debug, Clone)]
pub struct TypstRenderEngine {
    binary: String,
}

impl Default for TypstRenderEngine {
    fn default() -> Self {
        Self {
            binary: "typst".to_string(),
        }
    }
}

impl TypstRenderEngine {
    pub fn with_binary(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl DocumentRenderer for TypstRenderEngine {
    fn render(&self, typst_source: &str) -> Result<Vec<u8>, RenderError> {
        // Create temp directory for compilation context
        let temp_dir = tempdir().map_err(RenderError::TempDir)?;
        let typ_path = temp_dir.path().join(SOURCE_FILE);

        fs::write(&typ_path, typst_source).map_err(RenderError::WriteTypst)?;

        compile_typst_to_pdf(&self.binary, &temp_dir)
    }
}

/// Compile the source file in `temp_dir` to PDF.
fn compile_typst_to_pdf(binary: &str, temp_dir: &TempDir) -> Result<Vec<u8>, RenderError> {
    let typ_path = temp_dir.path().join(SOURCE_FILE);
    let output_path = temp_dir.path().join(OUTPUT_FILE);

    let output = Command::new(binary)
        .arg("compile")
        .arg(&typ_path)
        .arg(&output_path)
        .current_dir(temp_dir.path())
        .output()
        .map_err(RenderError::TypstIo)?;

    if !output.status.success() {
        let code = output.status.code().unwrap_or(-1);
        let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
        log::error!("typst compile failed with status {}: {}", code, stderr);
        return Err(RenderError::TypstExit { code, stderr });
    }

    fs::read(&output_path).map_err(RenderError::ReadPdf)
}
