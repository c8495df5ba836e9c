//! PDF text extraction via lopdf.
//!
//! Pages are walked in document order; text runs within a page are joined
//! with single spaces, pages are joined with newlines.

use lopdf::Document;

use super::ExtractError;

pub fn extract_pdf_text(bytes: &[u8]) -> Result<String, ExtractError> {
    let doc = Document::load_mem(bytes).map_err(|e| ExtractError::Pdf(e.to_string()))?;

    let mut pages = Vec::new();
    // get_pages is a BTreeMap keyed by page number, so iteration is ordered
    for (page_number, _) in doc.get_pages() {
        let page_text = doc
            .extract_text(&[page_number])
            .map_err(|e| ExtractError::Pdf(format!("page {}: {}", page_number, e)))?;
        pages.push(normalize_page(&page_text));
    }

    Ok(pages.join("\n"))
}

/// Collapse a page's text runs into space-separated form.
fn normalize_page(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Object, Stream};

    /// Build a minimal single-page PDF containing the given text.
    fn one_page_pdf(text: &str) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Courier",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! { "F1" => font_id },
        });

        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(text)]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            dictionary! {},
            content.encode().expect("encode content stream"),
        ));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut buf = Vec::new();
        doc.save_to(&mut buf).expect("serialize pdf");
        buf
    }

    #[test]
    fn test_extracts_page_text() {
        let bytes = one_page_pdf("Hello searchable world");
        let text = extract_pdf_text(&bytes).unwrap();
        assert!(text.contains("Hello searchable world"), "got: {text:?}");
    }

    #[test]
    fn test_corrupt_bytes_error() {
        assert!(extract_pdf_text(&[0x25, 0x50, 0x44, 0x46, 0x00]).is_err());
    }

    #[test]
    fn test_normalize_page_collapses_runs() {
        assert_eq!(normalize_page("a\nb\n  c "), "a b c");
    }
}
