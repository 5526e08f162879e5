#[cfg(test)]
mod unit_tests {
    use super::super::*;

    #[test]
    fn test_sanitize_markup_removes_scripts() {
        let html = r#"<p>Hello</p><script>alert('XSS')</script><p>World</p>"#;
        let sanitized = sanitize::sanitize_markup(html);
        assert!(!sanitized.contains("<script"));
        assert!(!sanitized.contains("alert"));
        assert!(sanitized.contains("Hello"));
        assert!(sanitized.contains("World"));
    }

    #[test]
    fn test_sanitize_removes_dangerous_attributes() {
        let html = r#"<a href="javascript:alert('XSS')" onclick="x()">Click me</a>"#;
        let sanitized = sanitize::sanitize_markup(html);
        assert!(!sanitized.contains("javascript:"));
        assert!(!sanitized.contains("onclick"));
    }

    #[test]
    fn test_sanitize_keeps_codec_attributes() {
        let html = r#"<p style="text-align: center">c</p><ol start="2"><li>x</li></ol><a href="https://x.io" target="_blank">l</a>"#;
        let sanitized = sanitize::sanitize_markup(html);
        assert!(sanitized.contains("text-align: center"));
        assert!(sanitized.contains(r#"start="2""#));
        assert!(sanitized.contains(r#"target="_blank""#));
        assert!(!sanitized.contains("rel="));
    }

    #[test]
    fn test_deserialize_then_serialize_is_stable() {
        let markup = "<h1>Notes</h1><p>Some <u>underlined</u> and <s>struck</s> text</p><ol><li>first</li><li>second<ol><li>inner</li></ol></li></ol>";
        let once = serialize(&deserialize(markup));
        assert_eq!(once, markup);
        let twice = serialize(&deserialize(&once));
        assert_eq!(twice, once);
    }

    #[test]
    fn test_tree_round_trip_canonicalizes_marks() {
        let marks = Marks::default().with(Mark::Italic, true).with(Mark::Underline, true);
        let doc = Document::new(vec![Node::paragraph(vec![
            Node::marked("a", marks),
            Node::text(" b"),
        ])]);
        let back = deserialize(&serialize(&doc));
        assert_eq!(back, doc);
    }

    #[test]
    fn test_operations_then_normalize_keep_invariants() {
        let mut doc = deserialize("<p>ab</p>");
        doc.apply(&Operation::SplitNode {
            path: Path::new(vec![0, 0]),
            position: 1,
        })
        .unwrap();
        doc.apply(&Operation::SetNode {
            path: Path::new(vec![0, 1]),
            properties: Properties::Text(Marks::default().with(Mark::Bold, true)),
        })
        .unwrap();
        doc.normalize();
        insta::assert_snapshot!(serialize(&doc), @"<p>a<strong>b</strong></p>");

        doc.apply(&Operation::SetNode {
            path: Path::new(vec![0, 1]),
            properties: Properties::Text(Marks::default()),
        })
        .unwrap();
        doc.normalize();
        assert_eq!(doc, deserialize("<p>ab</p>"));
    }

    #[test]
    fn test_next_fix_is_none_for_valid_documents() {
        let doc = deserialize(r#"<p>x <a href="https://x.io">y</a> z</p><ul><li>i</li></ul>"#);
        assert!(next_fix(&doc).is_none());
    }
}
