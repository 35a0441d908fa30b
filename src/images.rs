use anyhow::{Context, Result};
use base64::Engine;
use std::path::{Path, PathBuf};
use tracing::debug;

/// A decoded image ready to hand to the inference backend, carried as a
/// base64 data URL so HTTP backends can embed it directly.
#[derive(Debug, Clone)]
pub struct ImageAttachment {
    pub path: PathBuf,
    pub data_url: String,
}

/// Lists every file in an image directory, in directory-listing order.
/// No extension filtering; unreadable files are left to fail at load time.
pub fn list_image_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read image directory: {}", dir.display()))?
    {
        let entry = entry?;
        let path = entry.path();
        if path.is_file() {
            files.push(path);
        }
    }
    debug!("Found {} files in {}", files.len(), dir.display());
    Ok(files)
}

/// Reads and decodes one image file. Decoding validates the bytes; the
/// original bytes are what gets encoded into the data URL.
pub fn load_image(path: &Path) -> Result<ImageAttachment> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read image file: {}", path.display()))?;

    let format = image::guess_format(&bytes)
        .with_context(|| format!("Unrecognized image format: {}", path.display()))?;

    image::load_from_memory_with_format(&bytes, format)
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;

    let encoded = base64::engine::general_purpose::STANDARD.encode(&bytes);
    let data_url = format!("data:{};base64,{}", format.to_mime_type(), encoded);

    Ok(ImageAttachment {
        path: path.to_path_buf(),
        data_url,
    })
}
