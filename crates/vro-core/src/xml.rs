//! Reads one expanded package item (`elements/<id>/`) back into an action.
//!
//! Packages hold more than actions, so anything that does not look like an
//! action document is reported as [`ElementRead::NotAnAction`] rather than an
//! error. Once an item *is* an action, its `categories` document is required.

use crate::action::{ActionDraft, Param};
use crate::paths;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;
use thiserror::Error;

const ROOT_ELEMENT: &[u8] = b"dunes-script-module";

#[derive(Debug, Clone)]
pub enum ElementRead {
    Action(ActionDraft),
    NotAnAction(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ElementError {
    #[error("categories document is missing or unreadable")]
    CategoriesUnreadable,

    #[error("categories document has no category name")]
    NoCategory,
}

/// Read `<expand_root>/elements/<id>/{data,categories}`.
pub fn read_element(expand_root: &Path, id: &str) -> Result<ElementRead, ElementError> {
    let Ok(bytes) = std::fs::read(paths::element_data(expand_root, id)) else {
        return Ok(ElementRead::NotAnAction("data file is missing or unreadable"));
    };
    let Some(text) = decode_text(&bytes) else {
        return Ok(ElementRead::NotAnAction("data file is not valid text"));
    };
    let doc = match parse_action_document(&text) {
        Parsed::Action(doc) => doc,
        Parsed::OtherRoot => {
            return Ok(ElementRead::NotAnAction("root element is not an action"))
        }
        Parsed::Malformed => return Ok(ElementRead::NotAnAction("data is not well-formed XML")),
    };

    let categories = std::fs::read(paths::element_categories(expand_root, id))
        .ok()
        .and_then(|b| decode_text(&b))
        .ok_or(ElementError::CategoriesUnreadable)?;
    let category = first_category(&categories).ok_or(ElementError::NoCategory)?;

    Ok(ElementRead::Action(ActionDraft {
        id: id.to_string(),
        name: doc.name,
        script: doc.script,
        category,
        description: doc.description,
        params: doc.params,
        simple_result: None,
        qualified_result: doc.result_type,
    }))
}

/// Decode by byte-order mark; files without one are sniffed for UTF-16 and
/// otherwise read as UTF-8.
pub fn decode_text(bytes: &[u8]) -> Option<String> {
    match bytes {
        [0xFE, 0xFF, rest @ ..] => decode_utf16(rest, u16::from_be_bytes),
        [0xFF, 0xFE, rest @ ..] => decode_utf16(rest, u16::from_le_bytes),
        [0xEF, 0xBB, 0xBF, rest @ ..] => String::from_utf8(rest.to_vec()).ok(),
        [0, b, ..] if *b != 0 => decode_utf16(bytes, u16::from_be_bytes),
        [b, 0, ..] if *b != 0 => decode_utf16(bytes, u16::from_le_bytes),
        _ => String::from_utf8(bytes.to_vec()).ok(),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes.chunks_exact(2).map(|c| unit([c[0], c[1]])).collect();
    String::from_utf16(&units).ok()
}

// ---------------------------------------------------------------------------
// Action document
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct ActionDocument {
    name: String,
    result_type: Option<String>,
    description: String,
    script: String,
    params: Vec<Param>,
}

enum Parsed {
    Action(ActionDocument),
    OtherRoot,
    Malformed,
}

#[derive(Clone, Copy)]
enum Child {
    Description,
    Script,
    Param,
}

fn parse_action_document(text: &str) -> Parsed {
    match read_action_document(text) {
        Ok(Some(doc)) => Parsed::Action(doc),
        Ok(None) => Parsed::OtherRoot,
        Err(()) => Parsed::Malformed,
    }
}

/// `Ok(None)` when the document is well-formed up to a root that is not an
/// action (or an action root without a name).
fn read_action_document(text: &str) -> Result<Option<ActionDocument>, ()> {
    let mut reader = Reader::from_str(text);
    let mut depth = 0usize;
    let mut doc: Option<ActionDocument> = None;
    let mut child: Option<Child> = None;
    let mut buf = String::new();

    loop {
        match reader.read_event().map_err(|_| ())? {
            Event::Start(e) => {
                depth += 1;
                if depth == 1 {
                    if e.name().as_ref() != ROOT_ELEMENT {
                        return Ok(None);
                    }
                    doc = root_document(&e)?;
                    if doc.is_none() {
                        return Ok(None);
                    }
                } else if depth == 2 {
                    buf.clear();
                    child = start_child(&e, doc.as_mut())?;
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    if e.name().as_ref() != ROOT_ELEMENT {
                        return Ok(None);
                    }
                    return root_document(&e);
                }
                if depth == 1 {
                    // <param n=".." t=".."/> still declares a parameter.
                    start_child(&e, doc.as_mut())?;
                }
            }
            Event::Text(t) => {
                if depth == 2 && child.is_some() {
                    buf.push_str(&t.unescape().map_err(|_| ())?);
                }
            }
            Event::CData(c) => {
                if depth == 2 && child.is_some() {
                    buf.push_str(std::str::from_utf8(&c).map_err(|_| ())?);
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    if let (Some(kind), Some(doc)) = (child.take(), doc.as_mut()) {
                        finish_child(doc, kind, std::mem::take(&mut buf));
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => {
                if depth != 0 {
                    return Err(());
                }
                return Ok(doc);
            }
            _ => {}
        }
    }
}

fn root_document(e: &BytesStart<'_>) -> Result<Option<ActionDocument>, ()> {
    let mut doc = ActionDocument::default();
    for attr in e.attributes() {
        let attr = attr.map_err(|_| ())?;
        let value = attr.unescape_value().map_err(|_| ())?.into_owned();
        match attr.key.as_ref() {
            b"name" => doc.name = value,
            b"result-type" => doc.result_type = Some(value),
            _ => {}
        }
    }
    if doc.name.is_empty() {
        return Ok(None);
    }
    Ok(Some(doc))
}

fn start_child(e: &BytesStart<'_>, doc: Option<&mut ActionDocument>) -> Result<Option<Child>, ()> {
    match e.name().as_ref() {
        b"description" => Ok(Some(Child::Description)),
        b"script" => Ok(Some(Child::Script)),
        b"param" => {
            let mut param = Param::new("", "", "");
            for attr in e.attributes() {
                let attr = attr.map_err(|_| ())?;
                let value = attr.unescape_value().map_err(|_| ())?.into_owned();
                match attr.key.as_ref() {
                    b"n" => param.name = value,
                    b"t" => param.param_type = value,
                    _ => {}
                }
            }
            if let Some(doc) = doc {
                doc.params.push(param);
            }
            Ok(Some(Child::Param))
        }
        _ => Ok(None),
    }
}

fn finish_child(doc: &mut ActionDocument, kind: Child, text: String) {
    match kind {
        Child::Description => doc.description = text,
        Child::Script => doc.script = text,
        Child::Param => {
            if let Some(param) = doc.params.last_mut() {
                param.description = text;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Categories document
// ---------------------------------------------------------------------------

/// Text of the first `categories/category/name` element.
fn first_category(text: &str) -> Option<String> {
    const PATH: [&[u8]; 3] = [b"categories", b"category", b"name"];
    let mut reader = Reader::from_str(text);
    let mut stack: Vec<Vec<u8>> = Vec::new();
    let mut buf = String::new();

    loop {
        match reader.read_event().ok()? {
            Event::Start(e) => {
                stack.push(e.name().as_ref().to_vec());
                buf.clear();
            }
            Event::Text(t) if stack.iter().map(Vec::as_slice).eq(PATH) => {
                buf.push_str(&t.unescape().ok()?);
            }
            Event::CData(c) if stack.iter().map(Vec::as_slice).eq(PATH) => {
                buf.push_str(std::str::from_utf8(&c).ok()?);
            }
            Event::End(_) => {
                if stack.iter().map(Vec::as_slice).eq(PATH) {
                    let name = buf.trim();
                    if !name.is_empty() {
                        return Some(name.to_string());
                    }
                }
                stack.pop();
            }
            Event::Eof => return None,
            _ => {}
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::encode_utf16be;
    use tempfile::TempDir;

    const DATA: &str = r#"<?xml version='1.0' encoding='UTF-16'?>
<dunes-script-module name="getIp" result-type="Array/string" api-version="6.0.0" id="net-001" version="1.0.0" allowed-operations="vef">
<description><![CDATA[Resolve a host.]]></description>
<param n="host" t="string"><![CDATA[The host name]]></param>
<param n="port" t="number"/>
<script encoded="false"><![CDATA[var a = host;
if (a) {
    return [a];
}]]></script>
</dunes-script-module>"#;

    const CATEGORIES: &str = r#"<?xml version='1.0' encoding='UTF-8'?>
<categories>
  <category name="com.example.net">
    <name><![CDATA[com.example.net]]></name>
  </category>
</categories>"#;

    fn element(root: &Path, id: &str, data: &[u8], categories: Option<&str>) {
        let dir = root.join("elements").join(id);
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("data"), data).unwrap();
        if let Some(c) = categories {
            std::fs::write(dir.join("categories"), c).unwrap();
        }
    }

    fn read_action(root: &Path, id: &str) -> ActionDraft {
        match read_element(root, id).unwrap() {
            ElementRead::Action(d) => d,
            ElementRead::NotAnAction(r) => panic!("expected action, got: {r}"),
        }
    }

    #[test]
    fn reads_utf16be_action() {
        let dir = TempDir::new().unwrap();
        element(dir.path(), "net-001", &encode_utf16be(DATA), Some(CATEGORIES));

        let draft = read_action(dir.path(), "net-001");
        assert_eq!(draft.id, "net-001");
        assert_eq!(draft.name, "getIp");
        assert_eq!(draft.category, "com.example.net");
        assert_eq!(draft.description, "Resolve a host.");
        assert_eq!(draft.qualified_result.as_deref(), Some("Array/string"));
        assert_eq!(draft.simple_result, None);
        assert_eq!(
            draft.params,
            vec![
                Param::new("host", "string", "The host name"),
                Param::new("port", "number", ""),
            ]
        );
        assert_eq!(draft.script, "var a = host;\nif (a) {\n    return [a];\n}");
    }

    #[test]
    fn reads_plain_text_and_escaped_content() {
        let dir = TempDir::new().unwrap();
        let data = r#"<dunes-script-module name="cmp" result-type="boolean"><script>return a &lt; b;</script></dunes-script-module>"#;
        element(dir.path(), "x", data.as_bytes(), Some(CATEGORIES));

        let draft = read_action(dir.path(), "x");
        assert_eq!(draft.script, "return a < b;");
        assert_eq!(draft.description, "");
        assert!(draft.params.is_empty());
    }

    #[test]
    fn other_root_is_not_an_action() {
        let dir = TempDir::new().unwrap();
        element(
            dir.path(),
            "wf",
            br#"<workflow name="Deploy"><description>d</description></workflow>"#,
            Some(CATEGORIES),
        );
        assert!(matches!(
            read_element(dir.path(), "wf").unwrap(),
            ElementRead::NotAnAction(_)
        ));
    }

    #[test]
    fn binary_or_malformed_data_is_not_an_action() {
        let dir = TempDir::new().unwrap();
        element(dir.path(), "bin", &[0x89, b'P', b'N', b'G', 0xFF, 0x00, 0x01], None);
        element(
            dir.path(),
            "broken",
            b"<dunes-script-module name=\"f\"><script>x</dunes-script-module>",
            None,
        );
        element(dir.path(), "truncated", b"<dunes-script-module name=\"f\"><script>x", None);
        for id in ["bin", "broken", "truncated", "absent"] {
            assert!(
                matches!(read_element(dir.path(), id).unwrap(), ElementRead::NotAnAction(_)),
                "expected skip for {id}"
            );
        }
    }

    #[test]
    fn root_without_name_is_not_an_action() {
        let dir = TempDir::new().unwrap();
        element(dir.path(), "n", b"<dunes-script-module result-type=\"void\"/>", Some(CATEGORIES));
        assert!(matches!(
            read_element(dir.path(), "n").unwrap(),
            ElementRead::NotAnAction(_)
        ));
    }

    #[test]
    fn missing_categories_is_an_error() {
        let dir = TempDir::new().unwrap();
        element(dir.path(), "net-001", DATA.as_bytes(), None);
        assert_eq!(
            read_element(dir.path(), "net-001").unwrap_err(),
            ElementError::CategoriesUnreadable
        );
    }

    #[test]
    fn categories_without_name_is_an_error() {
        let dir = TempDir::new().unwrap();
        element(dir.path(), "net-001", DATA.as_bytes(), Some("<categories><category/></categories>"));
        assert_eq!(
            read_element(dir.path(), "net-001").unwrap_err(),
            ElementError::NoCategory
        );
    }

    #[test]
    fn decode_variants() {
        assert_eq!(decode_text(b"abc").as_deref(), Some("abc"));
        assert_eq!(decode_text(b"\xEF\xBB\xBFabc").as_deref(), Some("abc"));
        assert_eq!(decode_text(&encode_utf16be("é<")).as_deref(), Some("é<"));
        assert_eq!(decode_text(&[0xFF, 0xFE, b'a', 0]).as_deref(), Some("a"));
        assert_eq!(decode_text(&[0, b'<', 0, b'a']).as_deref(), Some("<a"));
        assert_eq!(decode_text(&[0xFE, 0xFF, 0]), None);
    }
}
