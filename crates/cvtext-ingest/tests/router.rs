use std::sync::Arc;

use cvtext_core::mock::{MockConverter, MockLoader, MockOcr, MockOcrResponse, MockPage, RecordingSink};
use cvtext_core::BackendError;
use cvtext_ingest::{DocumentFile, ExtractionError, PdfExtractor, Stage, TextExtractor};

const RESUME_TEXT: &str =
    "Jane Smith - Staff Engineer - ten years building payment systems in Rust and Go";

struct Harness {
    loader: Arc<MockLoader>,
    ocr: Arc<MockOcr>,
    converter: Arc<MockConverter>,
    extractor: TextExtractor,
}

fn harness(pages: Vec<MockPage>, converter: MockConverter) -> Harness {
    let loader = Arc::new(MockLoader::new(pages));
    let ocr = Arc::new(MockOcr::new(MockOcrResponse::text("ocr text")));
    let converter = Arc::new(converter);
    let extractor = TextExtractor::new(
        PdfExtractor::new(loader.clone(), ocr.clone()),
        converter.clone(),
    );
    Harness {
        loader,
        ocr,
        converter,
        extractor,
    }
}

fn default_harness() -> Harness {
    harness(
        vec![MockPage::text(&[RESUME_TEXT])],
        MockConverter::text("converted docx"),
    )
}

#[tokio::test]
async fn uppercase_pdf_extension_routes_to_pdf_engine() {
    let h = default_harness();
    let sink = RecordingSink::default();

    let lower = h
        .extractor
        .extract_text(&DocumentFile::from_bytes("resume.pdf", b"%PDF-".to_vec()), None)
        .await
        .unwrap();
    let upper = h
        .extractor
        .extract_text(
            &DocumentFile::from_bytes("resume.PDF", b"%PDF-".to_vec()),
            Some(&sink),
        )
        .await
        .unwrap();

    assert_eq!(lower, RESUME_TEXT);
    assert_eq!(upper, lower);
    assert_eq!(h.loader.open_calls(), 2);
    assert_eq!(
        sink.stages(),
        vec![Stage::Loading, Stage::Extracting, Stage::Complete]
    );
}

#[tokio::test]
async fn unsupported_extension_touches_no_collaborator() {
    let h = default_harness();
    let sink = RecordingSink::default();

    let err = h
        .extractor
        .extract_text(
            &DocumentFile::from_bytes("notes.xlsx", b"PK\x03\x04".to_vec()),
            Some(&sink),
        )
        .await
        .unwrap_err();

    assert!(matches!(err, ExtractionError::UnsupportedFormat { .. }));
    assert_eq!(err.to_string(), "Unsupported file type: notes.xlsx");
    assert_eq!(h.loader.open_calls(), 0);
    assert_eq!(h.ocr.call_count(), 0);
    assert_eq!(h.converter.call_count(), 0);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn missing_extension_is_unsupported() {
    let h = default_harness();
    let err = h
        .extractor
        .extract_text(&DocumentFile::from_bytes("resume", b"text".to_vec()), None)
        .await
        .unwrap_err();
    assert_eq!(err.filename(), "resume");
    assert!(matches!(err, ExtractionError::UnsupportedFormat { .. }));
}

#[tokio::test]
async fn plain_text_emits_no_progress() {
    let h = default_harness();
    let sink = RecordingSink::default();
    let text = h
        .extractor
        .extract_text(
            &DocumentFile::from_bytes("notes.txt", "Skills: Rust".as_bytes()),
            Some(&sink),
        )
        .await
        .unwrap();

    assert_eq!(text, "Skills: Rust");
    assert!(sink.events().is_empty());
    assert_eq!(h.loader.open_calls(), 0);
    assert_eq!(h.converter.call_count(), 0);
}

#[tokio::test]
async fn docx_and_doc_go_to_converter() {
    let h = default_harness();
    for name in ["resume.docx", "resume.DOC"] {
        let text = h
            .extractor
            .extract_text(&DocumentFile::from_bytes(name, b"PK\x03\x04".to_vec()), None)
            .await
            .unwrap();
        assert_eq!(text, "converted docx");
    }
    assert_eq!(h.converter.call_count(), 2);
    assert_eq!(h.loader.open_calls(), 0);
}

#[tokio::test]
async fn converter_failure_is_read_failure() {
    let h = harness(vec![], MockConverter::failing("corrupt archive"));
    let err = h
        .extractor
        .extract_text(
            &DocumentFile::from_bytes("broken.docx", b"garbage".to_vec()),
            None,
        )
        .await
        .unwrap_err();

    match &err {
        ExtractionError::ReadFailure { filename, cause } => {
            assert_eq!(filename, "broken.docx");
            assert!(matches!(cause, BackendError::Convert(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(err.to_string().starts_with("Failed to read file: broken.docx"));
}

#[tokio::test]
async fn files_on_disk_are_read_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cover_letter.txt");
    std::fs::write(&path, "Dear hiring manager").unwrap();

    let h = default_harness();
    let text = h
        .extractor
        .extract_text(&DocumentFile::from_path(&path), None)
        .await
        .unwrap();
    assert_eq!(text, "Dear hiring manager");
}

#[tokio::test]
async fn missing_pdf_on_disk_is_pdf_parse_failure() {
    let h = default_harness();
    let err = h
        .extractor
        .extract_text(&DocumentFile::from_path("/nonexistent/cvtext/cv.pdf"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractionError::PdfParseFailure { .. }));
    assert_eq!(h.loader.open_calls(), 0);
}

#[tokio::test]
async fn scanned_pdf_routes_through_ocr() {
    let h = harness(
        vec![MockPage::blank(), MockPage::blank()],
        MockConverter::text("unused"),
    );
    let sink = RecordingSink::default();
    let text = h
        .extractor
        .extract_text(
            &DocumentFile::from_bytes("scan.pdf", b"%PDF-".to_vec()),
            Some(&sink),
        )
        .await
        .unwrap();

    assert_eq!(text, "ocr text\n\nocr text");
    assert_eq!(h.ocr.call_count(), 2);
    assert_eq!(
        sink.stages(),
        vec![Stage::Loading, Stage::Extracting, Stage::Ocr, Stage::Complete]
    );
}
