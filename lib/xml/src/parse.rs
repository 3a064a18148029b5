//! Namespace-resolving parser on top of quick-xml's pull reader.
//!
//! Whitespace-only text is dropped (indentation). Other text is kept
//! trimmed. Comments, processing instructions and the doctype are not
//! retained.

use crate::document::{XmlDocument, XmlNode, XmlNodeId};
use crate::element::{XmlAttribute, XmlText};
use crate::error::XmlError;
use crate::name::{XML_NS, XmlName, XmlNamespace};
use amber_lantern_core::Result;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::str;
use tracing::debug;

/// Parses an XML document.
///
/// # Errors
///
/// Returns an error if the input is not well-formed, uses an unbound
/// namespace prefix, or has no document element.
pub fn parse_document(xml: &str) -> Result<XmlDocument, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut nodes: Vec<XmlNode> = Vec::new();
    let mut open: Vec<XmlNodeId> = Vec::new();
    let mut scopes = ScopeStack::default();

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader.read_event().map_err(|e| XmlError::Parse {
            position,
            details: e.to_string(),
        })?;
        match event {
            Event::Start(e) => {
                let id = open_node(&e, &mut nodes, &open, &mut scopes, position)?;
                open.push(id);
            }
            Event::Empty(e) => {
                open_node(&e, &mut nodes, &open, &mut scopes, position)?;
                scopes.pop();
            }
            Event::End(_) => {
                open.pop();
                scopes.pop();
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|e| XmlError::Parse {
                    position,
                    details: e.to_string(),
                })?;
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    continue;
                }
                if let Some(current) = open.last() {
                    append_text(&mut nodes[current.index()], trimmed, false);
                }
            }
            Event::CData(c) => {
                let text = str::from_utf8(&c).map_err(|e| XmlError::Parse {
                    position,
                    details: e.to_string(),
                })?;
                if let Some(current) = open.last() {
                    append_text(&mut nodes[current.index()], text, true);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !open.is_empty() {
        return Err(XmlError::Structure {
            details: format!("{} element(s) left unclosed", open.len()),
        }
        .into());
    }
    if nodes.is_empty() {
        return Err(XmlError::Structure {
            details: "no document element".to_string(),
        }
        .into());
    }
    debug!(elements = nodes.len(), "parsed XML document");
    Ok(XmlDocument::from_nodes(nodes))
}

fn append_text(node: &mut XmlNode, text: &str, cdata: bool) {
    match &mut node.text {
        Some(existing) => {
            existing.value.push_str(text);
            existing.cdata |= cdata;
        }
        None => {
            node.text = Some(XmlText {
                value: text.to_string(),
                cdata,
            });
        }
    }
}

fn open_node(
    start: &BytesStart<'_>,
    nodes: &mut Vec<XmlNode>,
    open: &[XmlNodeId],
    scopes: &mut ScopeStack,
    position: u64,
) -> Result<XmlNodeId, XmlError> {
    let mut declarations = Vec::new();
    let mut raw_attributes = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::Parse {
            position,
            details: e.to_string(),
        })?;
        let key = utf8(attr.key.as_ref(), position)?.to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Parse {
                position,
                details: e.to_string(),
            })?
            .into_owned();
        if key == "xmlns" {
            declarations.push(XmlNamespace::default_namespace(value));
        } else if let Some(prefix) = key.strip_prefix("xmlns:") {
            declarations.push(XmlNamespace::prefixed(prefix, value));
        } else {
            raw_attributes.push((key, value));
        }
    }
    scopes.push(declarations.clone());

    let qname = utf8(start.name().as_ref(), position)?.to_string();
    let name = scopes.resolve(&qname, true, position)?;
    let mut attributes = Vec::with_capacity(raw_attributes.len());
    for (key, value) in raw_attributes {
        attributes.push(XmlAttribute::new(scopes.resolve(&key, false, position)?, value));
    }

    let id = XmlNodeId::from_index(nodes.len());
    let parent = open.last().copied();
    nodes.push(XmlNode {
        name,
        namespaces: declarations,
        attributes,
        children: Vec::new(),
        parent,
        text: None,
    });
    if let Some(parent) = parent {
        nodes[parent.index()].children.push(id);
    }
    Ok(id)
}

fn utf8(bytes: &[u8], position: u64) -> Result<&str, XmlError> {
    str::from_utf8(bytes).map_err(|e| {
        XmlError::Parse {
            position,
            details: e.to_string(),
        }
        .into()
    })
}

/// In-scope namespace bindings, innermost last.
#[derive(Default)]
struct ScopeStack {
    frames: Vec<Vec<XmlNamespace>>,
}

impl ScopeStack {
    fn push(&mut self, frame: Vec<XmlNamespace>) {
        self.frames.push(frame);
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|ns| ns.prefix.as_deref() == prefix)
            .map(|ns| ns.uri.as_str())
    }

    fn resolve(&self, qname: &str, is_element: bool, position: u64) -> Result<XmlName, XmlError> {
        match qname.split_once(':') {
            Some(("xml", local)) => Ok(XmlName::new(XML_NS, local)),
            Some((prefix, local)) => match self.lookup(Some(prefix)) {
                Some(uri) if !uri.is_empty() => Ok(XmlName::new(uri, local)),
                _ => Err(XmlError::UnboundPrefix {
                    prefix: prefix.to_string(),
                    position,
                }
                .into()),
            },
            None if is_element => match self.lookup(None) {
                Some(uri) if !uri.is_empty() => Ok(XmlName::new(uri, qname)),
                _ => Ok(XmlName::unqualified(qname)),
            },
            None => Ok(XmlName::unqualified(qname)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_default_and_prefixed_namespaces() {
        let doc = parse_document(
            r#"<?xml version="1.0"?>
<definitions xmlns="urn:bpmn" xmlns:e="urn:ext">
  <process id="p"><e:note e:lang="en">hi</e:note></process>
</definitions>"#,
        )
        .expect("parse");
        let root = doc.root();
        assert!(doc.is(root, "urn:bpmn", "definitions"));
        let process = doc.child(root, "urn:bpmn", "process").expect("process");
        assert_eq!(doc.attribute(process, None, "id").map(|(_, v)| v), Some("p"));
        let note = doc.child(process, "urn:ext", "note").expect("note");
        assert_eq!(doc.attribute(note, Some("urn:ext"), "lang").map(|(_, v)| v), Some("en"));
        assert_eq!(doc.text(note).map(|t| t.value.as_str()), Some("hi"));
    }

    #[test]
    fn default_namespace_can_be_undeclared() {
        let doc = parse_document(r#"<a xmlns="urn:a"><b xmlns=""/></a>"#).expect("parse");
        let b = doc.children(doc.root())[0];
        assert_eq!(doc.name(b), &XmlName::unqualified("b"));
    }

    #[test]
    fn keeps_cdata_and_trims_text() {
        let doc = parse_document("<a><s><![CDATA[x < y]]></s><t>\n  padded  \n</t></a>")
            .expect("parse");
        let children = doc.children(doc.root());
        let script = doc.text(children[0]).expect("cdata");
        assert_eq!(script.value, "x < y");
        assert!(script.cdata);
        assert_eq!(doc.text(children[1]).map(|t| t.value.as_str()), Some("padded"));
    }

    #[test]
    fn unbound_prefix_is_rejected() {
        let err = parse_document("<a><x:b/></a>").expect_err("unbound prefix");
        assert!(matches!(
            err.current_context(),
            XmlError::UnboundPrefix { prefix, .. } if prefix == "x"
        ));
    }

    #[test]
    fn empty_input_has_no_document_element() {
        let err = parse_document("   ").expect_err("empty");
        assert!(matches!(err.current_context(), XmlError::Structure { .. }));
    }

    #[test]
    fn mismatched_end_tag_is_malformed() {
        let err = parse_document("<a><b></a>").expect_err("mismatch");
        assert!(matches!(err.current_context(), XmlError::Parse { .. }));
    }
}
