//! Readers for the non-PDF formats. Neither emits progress events.

use cvtext_core::{BackendError, DocumentFile, DocxConverter, ExtractionError};

const BOM: char = '\u{FEFF}';

/// Decode a `.txt` file as UTF-8. Invalid sequences become U+FFFD and a
/// leading byte-order mark is dropped; the content is otherwise unchanged.
pub async fn read_plain_text(file: &DocumentFile) -> Result<String, ExtractionError> {
    let bytes = file
        .read_bytes()
        .await
        .map_err(|e| read_failure(file, BackendError::Io(e)))?;

    let text = String::from_utf8_lossy(&bytes);
    let text = text.strip_prefix(BOM).unwrap_or(&text).to_string();
    tracing::debug!(filename = file.name(), chars = text.len(), "read plain text");
    Ok(text)
}

/// Hand a DOCX/DOC file to the document converter for its raw text.
pub async fn read_document(
    file: &DocumentFile,
    converter: &dyn DocxConverter,
) -> Result<String, ExtractionError> {
    let bytes = file
        .read_bytes()
        .await
        .map_err(|e| read_failure(file, BackendError::Io(e)))?;

    let text = converter
        .extract_raw_text(&bytes)
        .await
        .map_err(|e| read_failure(file, e))?;
    tracing::debug!(filename = file.name(), chars = text.len(), "converted document");
    Ok(text)
}

fn read_failure(file: &DocumentFile, cause: BackendError) -> ExtractionError {
    tracing::warn!(filename = file.name(), error = %cause, "failed to read file");
    ExtractionError::ReadFailure {
        filename: file.name().to_string(),
        cause,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn plain_text_is_returned_verbatim() {
        let file = DocumentFile::from_bytes("notes.txt", "  Jane Smith\n\nRust\n".as_bytes());
        assert_eq!(read_plain_text(&file).await.unwrap(), "  Jane Smith\n\nRust\n");
    }

    #[tokio::test]
    async fn bom_is_stripped_and_invalid_utf8_replaced() {
        let mut bytes = "\u{FEFF}Résumé ".as_bytes().to_vec();
        bytes.push(0xFF);
        let file = DocumentFile::from_bytes("notes.txt", bytes);
        assert_eq!(read_plain_text(&file).await.unwrap(), "Résumé \u{FFFD}");
    }

    #[tokio::test]
    async fn unreadable_file_is_read_failure() {
        let file = DocumentFile::from_path("/nonexistent/cvtext/notes.txt");
        let err = read_plain_text(&file).await.unwrap_err();
        assert!(matches!(
            err,
            ExtractionError::ReadFailure {
                cause: BackendError::Io(_),
                ..
            }
        ));
        assert!(err.to_string().starts_with("Failed to read file: notes.txt"));
    }
}
