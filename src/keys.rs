//! Storage-key helpers.
//!
//! Keys are `/`-separated. A key's *base* is its file name without the
//! directory part and without the final extension; both output keys of a
//! conversion derive from it.

use crate::config::PipelineConfig;

/// Last path segment of `key`.
pub fn file_name(key: &str) -> &str {
    key.rsplit('/').next().unwrap_or(key)
}

/// Extension of the file name, without the dot.
///
/// A leading dot does not start an extension: `.hidden` has none.
pub fn extension(key: &str) -> Option<&str> {
    let name = file_name(key);
    match name.rfind('.') {
        Some(0) | None => None,
        Some(i) => Some(&name[i + 1..]),
    }
}

/// File name without its extension.
pub fn base_name(key: &str) -> &str {
    let name = file_name(key);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(i) => &name[..i],
    }
}

/// `true` if the extension equals `ext`, ignoring ASCII case.
pub fn has_extension(key: &str, ext: &str) -> bool {
    extension(key).is_some_and(|e| e.eq_ignore_ascii_case(ext))
}

/// `{pdf_prefix}{base}.pdf`
pub fn pdf_key(config: &PipelineConfig, source_key: &str) -> String {
    format!("{}{}.pdf", config.pdf_prefix, base_name(source_key))
}

/// `{metadata_prefix}{base}.json`
pub fn metadata_key(config: &PipelineConfig, source_key: &str) -> String {
    format!("{}{}.json", config.metadata_prefix, base_name(source_key))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_directory_and_extension() {
        assert_eq!(file_name("pptxs/team/Q3 Review.pptx"), "Q3 Review.pptx");
        assert_eq!(file_name("deck.pptx"), "deck.pptx");
        assert_eq!(base_name("pptxs/team/Q3 Review.pptx"), "Q3 Review");
        assert_eq!(base_name("pptxs/archive.v2.PPTX"), "archive.v2");
        assert_eq!(extension("pptxs/archive.v2.PPTX"), Some("PPTX"));
        assert_eq!(extension("pptxs/README"), None);
        assert_eq!(extension("pptxs/.pptx"), None);
        assert_eq!(base_name("pptxs/.pptx"), ".pptx");
    }

    #[test]
    fn output_keys_share_the_base() {
        let config = PipelineConfig::default();
        assert_eq!(pdf_key(&config, "pptxs/q3_review.PPTX"), "pdfs/q3_review.pdf");
        assert_eq!(metadata_key(&config, "pptxs/q3_review.pptx"), "metadata/q3_review.json");
    }

    #[test]
    fn extension_match_ignores_case() {
        assert!(has_extension("metadata/a.JSON", "json"));
        assert!(!has_extension("metadata/a.json.bak", "json"));
    }
}
