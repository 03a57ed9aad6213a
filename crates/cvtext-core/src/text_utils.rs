/// Join a page's text-layer fragments with single spaces and trim the result.
pub fn join_fragments<S: AsRef<str>>(fragments: &[S]) -> String {
    fragments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ")
        .trim()
        .to_string()
}

/// Page-ordered concatenation of per-page text, separated by a blank line.
/// Pages that are empty after trimming contribute nothing.
pub fn join_pages<I, S>(pages: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out = String::new();
    for page in pages {
        let text = page.as_ref().trim();
        if text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push_str("\n\n");
        }
        out.push_str(text);
    }
    out
}

/// Whether the text layer carries enough text to skip OCR: strictly more than
/// `min_chars` characters once trimmed.
pub fn has_usable_text(aggregate: &str, min_chars: usize) -> bool {
    aggregate.trim().chars().count() > min_chars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fragments_joined_with_spaces() {
        assert_eq!(join_fragments(&["  John", "Doe", "Engineer  "]), "John Doe Engineer");
        assert_eq!(join_fragments::<&str>(&[]), "");
    }

    #[test]
    fn empty_pages_add_no_padding() {
        assert_eq!(join_pages(["Alpha", "", "  ", "Gamma"]), "Alpha\n\nGamma");
        assert_eq!(join_pages(["", ""]), "");
    }

    #[test]
    fn threshold_is_strict() {
        let fifty = "x".repeat(50);
        assert!(!has_usable_text(&fifty, 50));
        assert!(has_usable_text(&format!("{fifty}y"), 50));
        assert!(!has_usable_text(&format!("   {fifty}\n\n"), 50));
    }

    #[test]
    fn threshold_counts_chars_not_bytes() {
        // 30 two-byte characters: 60 bytes but only 30 chars.
        let text = "é".repeat(30);
        assert!(!has_usable_text(&text, 50));
    }
}
