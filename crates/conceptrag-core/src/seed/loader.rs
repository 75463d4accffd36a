//! Document loading seam
//!
//! PDF/EPUB extraction and OCR live outside this system; documents
//! arrive as extracted text or markdown. The trait keeps ingestion
//! testable and leaves room for richer loaders.

use crate::error::Result;
use std::path::Path;

/// Loads a document's text content
pub trait DocumentLoader: Send + Sync {
    fn load(&self, path: &Path) -> Result<String>;

    /// Whether this loader handles the file
    fn accepts(&self, path: &Path) -> bool;
}

/// Plain text / markdown loader
#[derive(Debug, Clone, Copy, Default)]
pub struct TextLoader;

impl DocumentLoader for TextLoader {
    fn load(&self, path: &Path) -> Result<String> {
        let bytes = std::fs::read(path)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn accepts(&self, path: &Path) -> bool {
        matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("txt" | "md" | "markdown" | "text")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_text_like_extensions() {
        let loader = TextLoader;
        assert!(loader.accepts(Path::new("a.txt")));
        assert!(loader.accepts(Path::new("dir/b.md")));
        assert!(!loader.accepts(Path::new("c.pdf")));
        assert!(!loader.accepts(Path::new("no_extension")));
    }

    #[test]
    fn test_load_is_lossy_on_bad_utf8() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("bad.txt");
        std::fs::write(&path, [b'o', b'k', 0xff, b'!']).unwrap();
        let text = TextLoader.load(&path).unwrap();
        assert!(text.starts_with("ok"));
    }
}
