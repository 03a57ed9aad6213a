//! Batch limits checked before any extraction starts.

use cvtext_ingest::DocumentFormat;

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

/// Reject batches larger than `max_batch` files.
pub fn check_batch(count: usize, max_batch: usize) -> Result<(), String> {
    if count > max_batch {
        return Err(format!(
            "Maximum {} resumes per upload. You selected {}.",
            max_batch, count
        ));
    }
    Ok(())
}

/// Size first, then type. `size_bytes` is `None` when the size could not be
/// read; the extraction step then reports the read error itself.
pub fn check_file(name: &str, size_bytes: Option<u64>, max_file_size_mb: u64) -> Result<(), String> {
    if let Some(size) = size_bytes {
        let size_mb = size as f64 / BYTES_PER_MB;
        if size_mb > max_file_size_mb as f64 {
            return Err(format!(
                "{}: File too large ({:.1}MB, max {}MB)",
                name, size_mb, max_file_size_mb
            ));
        }
    }

    if DocumentFormat::from_filename(name).is_none() {
        return Err(format!(
            "{}: Unsupported file type. Supported: PDF, DOCX, TXT",
            name
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_limit_is_inclusive() {
        assert!(check_batch(50, 50).is_ok());
        assert_eq!(
            check_batch(51, 50).unwrap_err(),
            "Maximum 50 resumes per upload. You selected 51."
        );
    }

    #[test]
    fn oversized_file_rejected_with_size() {
        let twelve_mb = 12 * 1024 * 1024;
        assert_eq!(
            check_file("big.pdf", Some(twelve_mb), 10).unwrap_err(),
            "big.pdf: File too large (12.0MB, max 10MB)"
        );
        assert!(check_file("exact.pdf", Some(10 * 1024 * 1024), 10).is_ok());
    }

    #[test]
    fn size_checked_before_type() {
        let err = check_file("huge.xlsx", Some(20 * 1024 * 1024), 10).unwrap_err();
        assert!(err.contains("File too large"));
    }

    #[test]
    fn unsupported_type_rejected() {
        assert_eq!(
            check_file("notes.xlsx", Some(100), 10).unwrap_err(),
            "notes.xlsx: Unsupported file type. Supported: PDF, DOCX, TXT"
        );
        assert!(check_file("Resume.DOCX", Some(100), 10).is_ok());
        assert!(check_file("cv.pdf", None, 10).is_ok());
    }
}
