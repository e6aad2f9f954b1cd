use chrono::{TimeZone, Utc};
use plist_serde::{
    Date, Dictionary, Format, MAX_DEPTH, Node, load, load_from_slice, save, save_to_string, writer,
    xml,
};
use std::io::Cursor;

const APPLE_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE plist PUBLIC "-//Apple//DTD PLIST 1.0//EN" "http://www.apple.com/DTDs/PropertyList-1.0.dtd">
<plist version="1.0">
<dict>
	<key>CFBundleName</key>
	<string>Demo &amp; Co</string>
	<key>Count</key>
	<integer>-3</integer>
	<key>Enabled</key>
	<false/>
	<key>Payload</key>
	<data>
	SGVsbG8=
	</data>
	<key>Items</key>
	<array>
		<real>2.5</real>
		<date>2024-05-01T12:00:00Z</date>
	</array>
	<key>$top</key>
	<dict>
		<key>root</key>
		<dict>
			<key>CF$UID</key>
			<integer>1</integer>
		</dict>
	</dict>
</dict>
</plist>
"#;

// ── Writing ────────────────────────────────────────────────────────────────

#[test]
fn test_fragment_layout() {
    let root: Node = [("a", Node::Boolean(true)), ("b", Node::Integer(1))]
        .into_iter()
        .collect();
    let xml = save_to_string(&root, false).unwrap();
    assert_eq!(
        xml,
        "<dict>\n\t<key>a</key>\n\t<true/>\n\t<key>b</key>\n\t<integer>1</integer>\n</dict>\n"
    );
}

#[test]
fn test_booleans_have_no_space_before_slash() {
    let root = Node::Array(vec![Node::Boolean(true), Node::Boolean(false)]);
    let xml = save_to_string(&root, true).unwrap();
    assert!(xml.contains("<true/>"));
    assert!(xml.contains("<false/>"));
    assert!(!xml.contains("<true />"));
    assert!(!xml.contains("<false />"));
}

#[test]
fn test_document_meta() {
    let root = Node::from("hi");
    let full = save_to_string(&root, true).unwrap();
    assert!(full.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n"));
    assert!(full.contains("<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\""));
    assert!(full.contains("<plist version=\"1.0\">\n<string>hi</string>\n</plist>"));
    assert!(full.ends_with("</plist>\n"));

    let bare = save_to_string(&root, false).unwrap();
    assert_eq!(bare, "<string>hi</string>\n");
}

#[test]
fn test_empty_containers() {
    let root = Node::Array(vec![Node::Array(Vec::new()), Node::Dictionary(Dictionary::new())]);
    let xml = save_to_string(&root, false).unwrap();
    assert_eq!(xml, "<array>\n\t<array/>\n\t<dict/>\n</array>\n");
    assert_eq!(xml::from_str(&xml).unwrap(), root);
}

#[test]
fn test_text_is_escaped() {
    let xml = save_to_string(&Node::from("a<b&c>"), false).unwrap();
    assert_eq!(xml, "<string>a&lt;b&amp;c&gt;</string>\n");
    assert_eq!(xml::from_str(&xml).unwrap(), Node::from("a<b&c>"));
}

#[test]
fn test_scalar_text_forms() {
    let date = Date::from(Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap());
    let cases = [
        (Node::Data(vec![0, 1, 2]), "<data>AAEC</data>\n"),
        (Node::Date(date), "<date>2001-01-01T00:00:00Z</date>\n"),
        (Node::Real(1.5), "<real>1.5</real>\n"),
        (Node::Real(f64::NAN), "<real>nan</real>\n"),
        (Node::Real(f64::INFINITY), "<real>+infinity</real>\n"),
        (Node::Real(f64::NEG_INFINITY), "<real>-infinity</real>\n"),
        (Node::Integer(-42), "<integer>-42</integer>\n"),
    ];
    for (node, expected) in cases {
        assert_eq!(save_to_string(&node, false).unwrap(), expected);
        assert_eq!(xml::from_str(expected).unwrap(), node);
    }
}

#[test]
fn test_uid_layout() {
    let xml = save_to_string(&Node::Uid(7), false).unwrap();
    assert_eq!(
        xml,
        "<dict>\n\t<key>CF$UID</key>\n\t<integer>7</integer>\n</dict>\n"
    );
    assert_eq!(xml::from_str(&xml).unwrap(), Node::Uid(7));
}

#[test]
fn test_carriage_returns_survive() {
    let root: Node = [("line\r", Node::from("a\rb\r\nc"))].into_iter().collect();
    let xml = save_to_string(&root, false).unwrap();
    assert!(xml.contains("<string>a&#13;b&#13;\nc</string>"));

    let mut doc = Vec::new();
    save(&root, &mut doc, Format::Xml).unwrap();
    assert_eq!(load_from_slice(&doc).unwrap(), root);
}

#[test]
fn test_unwritable_characters() {
    for text in ["a\u{1}b", "\u{0}", "end\u{FFFF}"] {
        let err = save_to_string(&Node::from(text), true).unwrap_err();
        assert!(err.is_format(), "{:?} gave {:?}", text, err);
    }
    let key: Node = [("\u{8}", Node::Integer(1))].into_iter().collect();
    assert!(save_to_string(&key, false).unwrap_err().is_format());

    // tabs and line feeds are fine
    let xml = save_to_string(&Node::from("a\tb\nc"), false).unwrap();
    assert_eq!(xml::from_str(&xml).unwrap(), Node::from("a\tb\nc"));
}

#[test]
fn test_large_uid_roundtrip() {
    let root = Node::Array(vec![Node::Uid(u64::MAX), Node::Uid(0)]);
    let xml = save_to_string(&root, true).unwrap();
    assert!(xml.contains("<integer>18446744073709551615</integer>"));
    assert_eq!(xml::from_str(&xml).unwrap(), root);
}

#[test]
fn test_nesting_is_capped() {
    let mut deep = Node::Integer(0);
    for _ in 0..=MAX_DEPTH {
        deep = Node::Array(vec![deep]);
    }
    assert!(save_to_string(&deep, true).unwrap_err().is_format());

    let text = format!("{}{}", "<array>".repeat(MAX_DEPTH + 1), "</array>".repeat(MAX_DEPTH + 1));
    assert!(xml::from_str(&text).unwrap_err().is_format());
}

// ── Reading ────────────────────────────────────────────────────────────────

#[test]
fn test_apple_sample() {
    let root = xml::from_str(APPLE_SAMPLE).unwrap();
    assert_eq!(root.get("CFBundleName").and_then(Node::as_str), Some("Demo & Co"));
    assert_eq!(root.get("Count"), Some(&Node::Integer(-3)));
    assert_eq!(root.get("Enabled"), Some(&Node::Boolean(false)));
    assert_eq!(root.get("Payload").and_then(Node::as_data), Some(&b"Hello"[..]));

    let items = root.get("Items").and_then(Node::as_array).unwrap();
    assert_eq!(items[0], Node::Real(2.5));
    let when = items[1].as_date().and_then(|d| d.to_datetime()).unwrap();
    assert_eq!(when, Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap());

    let uid = root.get("$top").and_then(|top| top.get("root"));
    assert_eq!(uid, Some(&Node::Uid(1)));

    let keys: Vec<&String> = root.as_dictionary().unwrap().keys().collect();
    assert_eq!(keys, ["CFBundleName", "Count", "Enabled", "Payload", "Items", "$top"]);
}

#[test]
fn test_bare_root_element() {
    let root = xml::from_str("<dict><key>a</key><string>b</string></dict>").unwrap();
    assert_eq!(root.get("a").and_then(Node::as_str), Some("b"));
}

#[test]
fn test_hex_integer() {
    assert_eq!(xml::from_str("<integer>0x1F</integer>").unwrap(), Node::Integer(31));
}

#[test]
fn test_cf_uid_needs_single_integer_entry() {
    let xml = "<dict><key>CF$UID</key><integer>1</integer><key>x</key><true/></dict>";
    let root = xml::from_str(xml).unwrap();
    assert_eq!(root.get("CF$UID"), Some(&Node::Integer(1)));

    let xml = "<dict><key>CF$UID</key><string>1</string></dict>";
    assert_eq!(xml::from_str(xml).unwrap().get("CF$UID"), Some(&Node::from("1")));

    // a negative value is not a UID
    let xml = "<dict><key>CF$UID</key><integer>-1</integer></dict>";
    assert_eq!(xml::from_str(xml).unwrap().get("CF$UID"), Some(&Node::Integer(-1)));
}

#[test]
fn test_malformed_documents() {
    for text in [
        "<plist version=\"1.0\"></plist>",
        "<dict><key>a</key></dict>",
        "<dict><string>a</string><true/></dict>",
        "<widget/>",
        "<integer>twelve</integer>",
        "<date>yesterday</date>",
        "<data>!!!</data>",
        "<dict><key>a</key>",
    ] {
        let err = xml::from_str(text).unwrap_err();
        assert!(err.is_format(), "{:?} gave {:?}", text, err);
    }
}

#[test]
fn test_invalid_utf8() {
    let err = xml::read(&mut Cursor::new(b"<string>\xFF</string>")).unwrap_err();
    assert!(err.is_format());
}

// ── Across formats ─────────────────────────────────────────────────────────

#[test]
fn test_xml_and_binary_agree() {
    let root = xml::from_str(APPLE_SAMPLE).unwrap();
    let binary = writer::to_vec(&root).unwrap();
    assert_eq!(load_from_slice(&binary).unwrap(), root);

    let xml = save_to_string(&root, true).unwrap();
    let reparsed = xml::from_str(&xml).unwrap();
    assert_eq!(reparsed, root);
    assert_eq!(writer::to_vec(&reparsed).unwrap(), binary);
}

#[test]
fn test_format_detection() {
    let root: Node = [("name", Node::from("x"))].into_iter().collect();

    let mut xml = Vec::new();
    save(&root, &mut xml, Format::Xml).unwrap();
    let mut cursor = Cursor::new(xml);
    assert_eq!(plist_serde::plist::detect_format(&mut cursor).unwrap(), Format::Xml);
    assert_eq!(load(&mut cursor).unwrap(), root);

    let mut binary = Cursor::new(writer::to_vec(&root).unwrap());
    assert_eq!(plist_serde::plist::detect_format(&mut binary).unwrap(), Format::Binary);
    assert_eq!(load(&mut binary).unwrap(), root);
}
