//! XML plist reader and writer.
//!
//! The writer emits one element per line, indented with tabs, in the layout
//! Apple tools produce. Booleans are written as `<true/>` and `<false/>`
//! with no space before the slash, which some consumers require.

use crate::error::{Error, Result};
use crate::factory;
use crate::node::{MAX_DEPTH, Node, nesting_error};
use std::io::{Read, Write};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n";
const DOCTYPE: &str = "<!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n";
const PLIST_OPEN: &str = "<plist version=\"1.0\">\n";
const PLIST_CLOSE: &str = "</plist>\n";

/// Key of the single-entry dictionary that represents a UID in XML.
pub const UID_KEY: &str = "CF$UID";

// ── Writer ─────────────────────────────────────────────────────────────────

/// Serialize `root` as an XML plist into `sink`.
///
/// With `document_meta` unset, the XML declaration, DOCTYPE and `<plist>`
/// wrapper are left out and only the node's own elements are written.
pub fn write<W: Write + ?Sized>(sink: &mut W, root: &Node, document_meta: bool) -> Result<()> {
    sink.write_all(to_string(root, document_meta)?.as_bytes())?;
    Ok(())
}

/// Serialize `root` as an XML plist string.
pub fn to_string(root: &Node, document_meta: bool) -> Result<String> {
    let mut out = String::new();
    if document_meta {
        out.push_str(XML_DECLARATION);
        out.push_str(DOCTYPE);
        out.push_str(PLIST_OPEN);
    }
    write_node(&mut out, root, 0)?;
    if document_meta {
        out.push_str(PLIST_CLOSE);
    }
    Ok(out)
}

/// `indent` doubles as the number of containers enclosing `node`.
fn write_node(out: &mut String, node: &Node, indent: usize) -> Result<()> {
    if node.is_container() && indent >= MAX_DEPTH {
        return Err(nesting_error());
    }
    match node {
        Node::Boolean(_) => line(out, indent, &format!("<{}/>", node.xml_tag())),
        Node::Array(items) if items.is_empty() => line(out, indent, "<array/>"),
        Node::Array(items) => {
            line(out, indent, "<array>");
            for item in items {
                write_node(out, item, indent + 1)?;
            }
            line(out, indent, "</array>");
        }
        Node::Dictionary(dict) if dict.is_empty() => line(out, indent, "<dict/>"),
        Node::Dictionary(dict) => {
            line(out, indent, "<dict>");
            for (key, value) in dict {
                element(out, indent + 1, "key", key)?;
                write_node(out, value, indent + 1)?;
            }
            line(out, indent, "</dict>");
        }
        Node::Uid(_) => {
            line(out, indent, "<dict>");
            element(out, indent + 1, "key", UID_KEY)?;
            element(out, indent + 1, node.xml_tag(), &node.to_xml_string()?)?;
            line(out, indent, "</dict>");
        }
        scalar => element(out, indent, scalar.xml_tag(), &scalar.to_xml_string()?)?,
    }
    Ok(())
}

fn line(out: &mut String, indent: usize, text: &str) {
    out.extend(std::iter::repeat_n('\t', indent));
    out.push_str(text);
    out.push('\n');
}

fn element(out: &mut String, indent: usize, tag: &str, text: &str) -> Result<()> {
    line(out, indent, &format!("<{tag}>{}</{tag}>", escape(text)?));
    Ok(())
}

/// Escape markup characters. A carriage return is written as a character
/// reference so parsers do not fold it into a line feed; characters XML 1.0
/// cannot carry at all are an error.
fn escape(text: &str) -> Result<String> {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\r' => escaped.push_str("&#13;"),
            '\t' | '\n' => escaped.push(c),
            '\u{0}'..='\u{1F}' | '\u{FFFE}' | '\u{FFFF}' => {
                return Err(Error::format(format!(
                    "character U+{:04X} cannot be written to xml",
                    c as u32
                )));
            }
            c => escaped.push(c),
        }
    }
    Ok(escaped)
}

// ── Reader ─────────────────────────────────────────────────────────────────

/// Read an XML plist from `stream` and return its root node.
pub fn read<R: Read + ?Sized>(stream: &mut R) -> Result<Node> {
    let mut text = String::new();
    stream.read_to_string(&mut text).map_err(|e| match e.kind() {
        std::io::ErrorKind::InvalidData => Error::format("xml plist is not valid UTF-8"),
        _ => Error::Io(e.to_string()),
    })?;
    from_str(&text)
}

/// Parse an XML plist document.
///
/// The root node is the first element inside `<plist>`; a document whose
/// root element is itself a plist value is accepted too.
pub fn from_str(text: &str) -> Result<Node> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let doc = roxmltree::Document::parse_with_options(text, options)
        .map_err(|e| Error::format(format!("malformed xml: {}", e)))?;

    let root = doc.root_element();
    let element = if root.has_tag_name("plist") {
        root.children()
            .find(|child| child.is_element())
            .ok_or_else(|| Error::format("<plist> element is empty"))?
    } else {
        root
    };
    read_element(element, 0)
}

/// `depth` counts the containers enclosing `element`.
fn read_element(element: roxmltree::Node<'_, '_>, depth: usize) -> Result<Node> {
    if element.has_tag_name("dict")
        && let Some(uid) = uid_entry(element)
    {
        return Ok(Node::Uid(uid));
    }
    let mut node = factory::create_xml(element.tag_name().name())?;
    if node.is_container() && depth >= MAX_DEPTH {
        return Err(nesting_error());
    }
    match &mut node {
        Node::Array(items) => {
            for child in element.children().filter(|child| child.is_element()) {
                items.push(read_element(child, depth + 1)?);
            }
        }
        Node::Dictionary(dict) => {
            let mut children = element.children().filter(|child| child.is_element());
            while let Some(key) = children.next() {
                if !key.has_tag_name("key") {
                    return Err(Error::format(format!(
                        "expected <key> in <dict>, found <{}>",
                        key.tag_name().name()
                    )));
                }
                let key = text_of(key);
                let value = children
                    .next()
                    .ok_or_else(|| Error::format(format!("key {:?} has no value", key)))?;
                dict.insert(key, read_element(value, depth + 1)?);
            }
        }
        // value is carried by the element name
        Node::Boolean(_) => {}
        scalar => scalar.parse(&text_of(element))?,
    }
    Ok(node)
}

/// The UID held by a `<dict>` whose only entry maps `CF$UID` to an
/// unsigned decimal `<integer>`.
fn uid_entry(element: roxmltree::Node<'_, '_>) -> Option<u64> {
    let mut children = element.children().filter(|child| child.is_element());
    if let (Some(key), Some(value), None) = (children.next(), children.next(), children.next())
        && key.has_tag_name("key")
        && text_of(key) == UID_KEY
        && value.has_tag_name("integer")
    {
        return text_of(value).trim().parse().ok();
    }
    None
}

/// All text inside `element`, entities and CDATA resolved.
fn text_of(element: roxmltree::Node<'_, '_>) -> String {
    element
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}
