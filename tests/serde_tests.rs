use chrono::{DateTime, TimeZone, Utc};
use plist_serde::{
    Date, Error, Format, Node, NodeKind, from_bytes, from_node, from_reader, from_xml_str,
    to_bytes, to_node, to_writer, to_writer_with_format, to_xml_string,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Cursor;

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct AppInfo {
    name: String,
    version: u32,
    beta: bool,
    scale: f64,
    tags: Vec<String>,
    homepage: Option<String>,
}

fn sample_info() -> AppInfo {
    AppInfo {
        name: "Demo".to_string(),
        version: 12,
        beta: false,
        scale: 1.25,
        tags: vec!["one".to_string(), "two".to_string()],
        homepage: None,
    }
}

// ── Primitives ─────────────────────────────────────────────────────────────

#[test]
fn test_primitive_nodes() {
    assert_eq!(to_node(&true).unwrap(), Node::Boolean(true));
    assert_eq!(to_node(&-5i8).unwrap(), Node::Integer(-5));
    assert_eq!(to_node(&u32::MAX).unwrap(), Node::Integer(u32::MAX as i64));
    assert_eq!(to_node(&0.5f32).unwrap(), Node::Real(0.5));
    assert_eq!(to_node(&'x').unwrap(), Node::from("x"));
    assert_eq!(to_node("hello").unwrap(), Node::from("hello"));
}

#[test]
fn test_u64_range() {
    let max = i64::MAX as u64;
    assert_eq!(from_bytes::<u64>(&to_bytes(&max).unwrap()).unwrap(), max);
    assert!(matches!(to_node(&(max + 1)), Err(Error::Message(_))));
}

#[test]
fn test_integer_narrowing() {
    let bytes = to_bytes(&300u32).unwrap();
    assert_eq!(from_bytes::<u16>(&bytes).unwrap(), 300);
    assert!(matches!(from_bytes::<u8>(&bytes), Err(Error::Message(_))));
    assert_eq!(from_bytes::<f64>(&bytes).unwrap(), 300.0);
}

#[test]
fn test_root_must_have_a_value() {
    assert!(matches!(to_node(&Option::<u32>::None), Err(Error::Unsupported(_))));
    assert!(matches!(to_node(&()), Err(Error::Unsupported(_))));
    assert_eq!(to_node(&Some(3u8)).unwrap(), Node::Integer(3));
}

// ── Structs and collections ────────────────────────────────────────────────

#[test]
fn test_struct_binary_roundtrip() {
    let info = sample_info();
    let bytes = to_bytes(&info).unwrap();
    assert_eq!(&bytes[..8], b"bplist00");
    assert_eq!(from_bytes::<AppInfo>(&bytes).unwrap(), info);
}

#[test]
fn test_struct_xml_roundtrip() {
    let mut info = sample_info();
    info.homepage = Some("https://example.com/?a=1&b=2".to_string());
    let xml = to_xml_string(&info).unwrap();
    assert!(xml.contains("<key>homepage</key>"));
    assert!(xml.contains("a=1&amp;b=2"));
    assert_eq!(from_xml_str::<AppInfo>(&xml).unwrap(), info);
}

#[test]
fn test_struct_field_order_is_kept() {
    let node = to_node(&sample_info()).unwrap();
    let keys: Vec<&String> = node.as_dictionary().unwrap().keys().collect();
    assert_eq!(keys, ["name", "version", "beta", "scale", "tags"]);
}

#[test]
fn test_none_fields_are_left_out() {
    let node = to_node(&sample_info()).unwrap();
    assert!(node.get("homepage").is_none());
    assert_eq!(from_node::<AppInfo>(&node).unwrap().homepage, None);
}

#[test]
fn test_none_inside_array_is_rejected() {
    let items = vec![Some(1), None, Some(3)];
    assert!(matches!(to_node(&items), Err(Error::Unsupported(_))));
}

#[test]
fn test_maps() {
    let mut map = BTreeMap::new();
    map.insert("b".to_string(), 2);
    map.insert("a".to_string(), 1);
    let node = to_node(&map).unwrap();
    assert_eq!(node.get("a"), Some(&Node::Integer(1)));
    assert_eq!(from_node::<BTreeMap<String, i32>>(&node).unwrap(), map);

    let mut numbered = BTreeMap::new();
    numbered.insert(1, "one");
    assert!(matches!(to_node(&numbered), Err(Error::Message(_))));
}

#[test]
fn test_tuples() {
    let value = (1u8, "two".to_string(), 3.5f64);
    let node = to_node(&value).unwrap();
    assert_eq!(node.as_array().map(Vec::len), Some(3));
    assert_eq!(from_node::<(u8, String, f64)>(&node).unwrap(), value);

    // leftover elements are an error
    assert!(from_node::<(u8, String)>(&node).is_err());
}

#[test]
fn test_bytes_fields() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Blob {
        #[serde(with = "serde_bytes")]
        payload: Vec<u8>,
    }

    let blob = Blob { payload: vec![0xCA, 0xFE] };
    let node = to_node(&blob).unwrap();
    assert_eq!(node.get("payload"), Some(&Node::Data(vec![0xCA, 0xFE])));
    assert_eq!(from_bytes::<Blob>(&to_bytes(&blob).unwrap()).unwrap(), blob);
}

#[test]
fn test_unit_fields_are_left_out() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Marker;

    #[derive(Debug, PartialEq, Serialize)]
    struct Tagged {
        id: u8,
        marker: Marker,
    }

    let node = to_node(&Tagged { id: 1, marker: Marker }).unwrap();
    assert_eq!(node.as_dictionary().map(|d| d.len()), Some(1));
}

// ── Enums ──────────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq, Serialize, Deserialize)]
enum Shape {
    Empty,
    Circle(f64),
    Line(i32, i32),
    Rect { width: u32, height: u32 },
}

#[test]
fn test_enum_representations() {
    assert_eq!(to_node(&Shape::Empty).unwrap(), Node::from("Empty"));

    let circle = to_node(&Shape::Circle(2.0)).unwrap();
    assert_eq!(circle.get("Circle"), Some(&Node::Real(2.0)));

    let line = to_node(&Shape::Line(1, -1)).unwrap();
    assert_eq!(
        line.get("Line"),
        Some(&Node::Array(vec![Node::Integer(1), Node::Integer(-1)]))
    );

    let rect = to_node(&Shape::Rect { width: 3, height: 4 }).unwrap();
    assert_eq!(rect.get("Rect").and_then(|r| r.get("height")), Some(&Node::Integer(4)));
}

#[test]
fn test_enum_roundtrip() {
    let shapes = vec![
        Shape::Empty,
        Shape::Circle(0.5),
        Shape::Line(7, 8),
        Shape::Rect { width: 1, height: 2 },
    ];
    let bytes = to_bytes(&shapes).unwrap();
    assert_eq!(from_bytes::<Vec<Shape>>(&bytes).unwrap(), shapes);
}

#[test]
fn test_enum_shape_errors() {
    assert!(from_node::<Shape>(&Node::Integer(1)).is_err());
    assert!(from_node::<Shape>(&Node::from("Hexagon")).is_err());

    let two_keys: Node = [("Circle", Node::Real(1.0)), ("Empty", Node::from(""))]
        .into_iter()
        .collect();
    assert!(from_node::<Shape>(&two_keys).is_err());
}

// ── UID and date helpers ───────────────────────────────────────────────────

#[derive(Debug, PartialEq, Serialize, Deserialize)]
struct Archive {
    #[serde(with = "plist_serde::uid")]
    root: u64,
    #[serde(with = "plist_serde::date")]
    created: DateTime<Utc>,
    version: u64,
}

fn sample_archive() -> Archive {
    Archive {
        root: 1,
        created: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        version: 100_000,
    }
}

#[test]
fn test_uid_and_date_nodes() {
    let node = to_node(&sample_archive()).unwrap();
    assert_eq!(node.get("root"), Some(&Node::Uid(1)));
    assert_eq!(node.get("created").map(Node::kind), Some(NodeKind::Date));
    assert_eq!(node.get("version"), Some(&Node::Integer(100_000)));
}

#[test]
fn test_uid_and_date_roundtrip() {
    let archive = sample_archive();

    let bytes = to_bytes(&archive).unwrap();
    assert_eq!(from_bytes::<Archive>(&bytes).unwrap(), archive);

    let xml = to_xml_string(&archive).unwrap();
    assert!(xml.contains("<key>CF$UID</key>"));
    assert!(xml.contains("<date>2024-05-01T12:30:00Z</date>"));
    assert_eq!(from_xml_str::<Archive>(&xml).unwrap(), archive);
}

#[test]
fn test_helpers_accept_plain_values() {
    let node: Node = [
        ("root", Node::Integer(4)),
        ("created", Node::from("2024-05-01T12:30:00Z")),
        ("version", Node::Integer(100_000)),
    ]
    .into_iter()
    .collect();
    let archive: Archive = from_node(&node).unwrap();
    assert_eq!(archive.root, 4);
    assert_eq!(archive.created, sample_archive().created);
}

#[test]
fn test_plain_fields_see_uid_and_date_values() {
    #[derive(Deserialize)]
    struct Plain {
        root: u64,
        created: String,
    }

    let node = to_node(&sample_archive()).unwrap();
    let plain: Plain = from_node(&node).unwrap();
    assert_eq!(plain.root, 1);
    assert_eq!(plain.created, "2024-05-01T12:30:00Z");
}

#[test]
fn test_date_type_roundtrip() {
    let date = Date::from_reference_seconds(12345.5);
    assert_eq!(to_node(&date).unwrap(), Node::Date(date));
    assert_eq!(from_node::<Date>(&Node::Date(date)).unwrap(), date);
}

// ── Node itself ────────────────────────────────────────────────────────────

#[test]
fn test_node_serializes_to_itself() {
    let tree: Node = [
        ("uid", Node::Uid(9)),
        ("when", Node::Date(Date::from_reference_seconds(-1.0))),
        ("blob", Node::Data(vec![1, 2, 3])),
        ("list", Node::Array(vec![Node::Boolean(true), Node::Real(0.1)])),
    ]
    .into_iter()
    .collect();
    assert_eq!(to_node(&tree).unwrap(), tree);
}

#[test]
fn test_node_deserializes_from_node() {
    let tree: Node = [
        ("name", Node::from("x")),
        ("blob", Node::Data(vec![1, 2, 3])),
        ("list", Node::Array(vec![Node::Integer(-1), Node::Real(0.1)])),
    ]
    .into_iter()
    .collect();
    assert_eq!(from_node::<Node>(&tree).unwrap(), tree);

    // a uid only survives as its integer value
    assert_eq!(from_node::<Node>(&Node::Uid(5)).unwrap(), Node::Integer(5));
}

#[test]
fn test_node_as_struct_field() {
    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Envelope {
        kind: String,
        body: Node,
    }

    let envelope = Envelope {
        kind: "note".to_string(),
        body: Node::Array(vec![Node::from("a"), Node::Integer(2)]),
    };
    let bytes = to_bytes(&envelope).unwrap();
    assert_eq!(from_bytes::<Envelope>(&bytes).unwrap(), envelope);
}

// ── Readers and writers ────────────────────────────────────────────────────

#[test]
fn test_writer_and_reader() {
    let info = sample_info();
    let mut buf = Vec::new();
    to_writer(&mut buf, &info).unwrap();
    assert_eq!(buf, to_bytes(&info).unwrap());

    let decoded: AppInfo = from_reader(Cursor::new(buf)).unwrap();
    assert_eq!(decoded, info);

    let mut xml = Vec::new();
    to_writer_with_format(&mut xml, &info, Format::Xml).unwrap();
    assert_eq!(xml, to_xml_string(&info).unwrap().into_bytes());
    let decoded: AppInfo = from_reader(Cursor::new(xml)).unwrap();
    assert_eq!(decoded, info);
}

#[test]
fn test_type_mismatch() {
    let bytes = to_bytes(&sample_info()).unwrap();
    assert!(from_bytes::<Vec<u32>>(&bytes).is_err());
    assert!(from_bytes::<AppInfo>(&to_bytes(&"text").unwrap()).is_err());
    assert!(from_bytes::<AppInfo>(b"definitely not a plist").unwrap_err().is_format());
}
