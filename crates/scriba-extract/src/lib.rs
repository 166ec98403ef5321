//! Text extraction from uploaded article files.
//!
//! PDF and plain-text uploads are supported. Extracted text is sanitized
//! before it reaches the pipeline: NUL and replacement characters (common
//! artifacts of PDF text extraction) are stripped and the length is capped so
//! a single oversized article cannot blow the completion-service context.

use std::path::Path;

use scriba_types::{Result, ScribaError};

/// Character cap applied to extracted article text.
pub const MAX_TEXT_LENGTH: usize = 50_000;

const ALLOWED_EXTENSIONS: [&str; 2] = ["pdf", "txt"];

/// Whether the filename carries a supported extension.
pub fn allowed_file(filename: &str) -> bool {
    extension_of(filename)
        .map(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .unwrap_or(false)
}

fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Extract raw text from a file, dispatching on its extension.
pub fn extract_text(path: &Path) -> Result<String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let text = match ext.as_str() {
        "pdf" => extract_text_from_pdf(path)?,
        "txt" => std::fs::read_to_string(path)?,
        other => {
            return Err(ScribaError::ExtractionFailed {
                path: path.display().to_string(),
                message: format!("unsupported file extension '{other}'"),
            })
        }
    };

    tracing::info!(path = %path.display(), chars = text.len(), "Text extracted");
    Ok(text)
}

fn extract_text_from_pdf(path: &Path) -> Result<String> {
    pdf_extract::extract_text(path).map_err(|e| ScribaError::ExtractionFailed {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Strip extraction artifacts and cap the length.
///
/// The cap counts characters, not bytes, and the cut falls on a char
/// boundary, so multi-byte Cyrillic text never gets split mid-character.
pub fn sanitize_text(text: &str, max_length: usize) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| *c != '\0' && *c != '\u{fffd}')
        .collect();

    let char_count = cleaned.chars().count();
    if char_count > max_length {
        tracing::warn!(
            from = char_count,
            to = max_length,
            "Article text truncated"
        );
        cleaned
            .chars()
            .take(max_length)
            .collect::<String>()
            .trim()
            .to_string()
    } else {
        cleaned.trim().to_string()
    }
}

/// Extract and sanitize in one step, applying the default cap.
pub fn extract_article_text(path: &Path) -> Result<String> {
    let raw = extract_text(path)?;
    Ok(sanitize_text(&raw, MAX_TEXT_LENGTH))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    // 1. Extension allowlist
    #[test]
    fn allowed_file_checks_extension() {
        assert!(allowed_file("paper.pdf"));
        assert!(allowed_file("paper.PDF"));
        assert!(allowed_file("notes.txt"));
        assert!(!allowed_file("image.png"));
        assert!(!allowed_file("no_extension"));
        assert!(!allowed_file(""));
    }

    // 2. TXT round-trip through a temp file
    #[test]
    fn extracts_txt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("article.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "Текст научной статьи").unwrap();

        let text = extract_text(&path).unwrap();
        assert_eq!(text, "Текст научной статьи");
    }

    // 3. Unsupported extension is a typed error
    #[test]
    fn unsupported_extension_fails() {
        let result = extract_text(Path::new("article.docx"));
        assert!(matches!(
            result,
            Err(ScribaError::ExtractionFailed { .. })
        ));
    }

    // 4. Missing txt file surfaces as Io
    #[test]
    fn missing_txt_file_is_io_error() {
        let result = extract_text(Path::new("/nonexistent/article.txt"));
        assert!(matches!(result, Err(ScribaError::Io(_))));
    }

    // 5. Control and replacement characters are stripped
    #[test]
    fn sanitize_strips_artifacts() {
        let dirty = "нача\u{0}ло \u{fffd}середина конец";
        assert_eq!(sanitize_text(dirty, 1000), "начало середина конец");
    }

    // 6. Cap counts characters and lands on a boundary
    #[test]
    fn sanitize_truncates_by_chars() {
        let text = "абвгдежзик";
        let out = sanitize_text(text, 5);
        assert_eq!(out, "абвгд");
    }

    // 7. Whitespace is trimmed
    #[test]
    fn sanitize_trims_whitespace() {
        assert_eq!(sanitize_text("  текст  \n", 1000), "текст");
    }

    // 8. Text under the cap is untouched apart from trimming
    #[test]
    fn sanitize_leaves_short_text_alone() {
        assert_eq!(sanitize_text("короткий текст", 1000), "короткий текст");
    }

    // 9. End-to-end helper applies the default cap
    #[test]
    fn extract_article_text_sanitizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("article.txt");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "  текст с арте\u{0}фактом  ").unwrap();

        let text = extract_article_text(&path).unwrap();
        assert_eq!(text, "текст с артефактом");
    }
}
