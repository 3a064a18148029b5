//! Writes [`XmlElement`] trees with quick-xml, choosing prefixes from the
//! bindings in scope.
//!
//! Declarations carried on an element are emitted as-is. A namespace with
//! no usable binding gets a generated `nsN` prefix declared on the element
//! that first needs it.

use crate::element::XmlElement;
use crate::error::XmlError;
use crate::name::{XML_NS, XmlName, XmlNamespace};
use amber_lantern_core::Result;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};

/// Output options for [`write_document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Spaces per nesting level; zero writes everything on one line.
    pub indent: usize,
    /// Whether to emit the `<?xml ...?>` declaration.
    pub declaration: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            indent: 2,
            declaration: true,
        }
    }
}

/// Serializes an element tree as a UTF-8 document.
///
/// # Errors
///
/// Returns an error if quick-xml fails to write an event.
pub fn write_document(root: &XmlElement, options: &WriteOptions) -> Result<String, XmlError> {
    let mut writer = if options.indent > 0 {
        Writer::new_with_indent(Vec::new(), b' ', options.indent)
    } else {
        Writer::new(Vec::new())
    };
    if options.declaration {
        write(
            &mut writer,
            Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
        )?;
    }
    let mut bindings = Bindings::default();
    write_element(&mut writer, root, &mut bindings)?;
    String::from_utf8(writer.into_inner()).map_err(|e| {
        XmlError::Write {
            details: e.to_string(),
        }
        .into()
    })
}

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    element: &XmlElement,
    bindings: &mut Bindings,
) -> Result<(), XmlError> {
    bindings.frames.push(element.namespaces.clone());
    let tag = bindings.element_name(&element.name);
    let attributes: Vec<(String, &str)> = element
        .attributes
        .iter()
        .map(|a| (bindings.attribute_name(&a.name), a.value.as_str()))
        .collect();

    let mut start = BytesStart::new(tag.clone());
    for ns in bindings.frames.last().into_iter().flatten() {
        let key = match &ns.prefix {
            Some(prefix) => format!("xmlns:{prefix}"),
            None => "xmlns".to_string(),
        };
        start.push_attribute((key.as_str(), ns.uri.as_str()));
    }
    for (key, value) in &attributes {
        start.push_attribute((key.as_str(), *value));
    }

    if element.children.is_empty() && element.text.is_none() {
        write(writer, Event::Empty(start))?;
    } else {
        write(writer, Event::Start(start))?;
        if let Some(text) = &element.text {
            if text.cdata && !text.value.contains("]]>") {
                write(writer, Event::CData(BytesCData::new(text.value.as_str())))?;
            } else {
                write(writer, Event::Text(BytesText::new(&text.value)))?;
            }
        }
        for child in &element.children {
            write_element(writer, child, bindings)?;
        }
        write(writer, Event::End(BytesEnd::new(tag)))?;
    }
    bindings.frames.pop();
    Ok(())
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<(), XmlError> {
    writer.write_event(event).map_err(|e| {
        XmlError::Write {
            details: e.to_string(),
        }
        .into()
    })
}

/// Namespace bindings in scope while writing, innermost frame last.
#[derive(Default)]
struct Bindings {
    frames: Vec<Vec<XmlNamespace>>,
}

impl Bindings {
    fn lookup(&self, prefix: Option<&str>) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .find(|ns| ns.prefix.as_deref() == prefix)
            .map(|ns| ns.uri.as_str())
    }

    /// An unshadowed binding for `uri`. `Some(None)` is the default namespace.
    fn prefix_for(&self, uri: &str, allow_default: bool) -> Option<Option<String>> {
        self.frames
            .iter()
            .rev()
            .flat_map(|frame| frame.iter())
            .filter(|ns| ns.uri == uri && (allow_default || ns.prefix.is_some()))
            .find(|ns| self.lookup(ns.prefix.as_deref()) == Some(uri))
            .map(|ns| ns.prefix.clone())
    }

    fn declare(&mut self, namespace: XmlNamespace) {
        if let Some(frame) = self.frames.last_mut() {
            frame.push(namespace);
        }
    }

    fn fresh_prefix(&self) -> String {
        (1..)
            .map(|n| format!("ns{n}"))
            .find(|candidate| self.lookup(Some(candidate.as_str())).is_none())
            .unwrap_or_else(|| "ns".to_string())
    }

    fn element_name(&mut self, name: &XmlName) -> String {
        match &name.namespace {
            None => {
                if self.lookup(None).is_some_and(|uri| !uri.is_empty()) {
                    self.declare(XmlNamespace::default_namespace(""));
                }
                name.local.clone()
            }
            Some(uri) => match self.prefix_for(uri, true) {
                Some(None) => name.local.clone(),
                Some(Some(prefix)) => format!("{prefix}:{}", name.local),
                None => self.bind_fresh(uri, &name.local),
            },
        }
    }

    fn attribute_name(&mut self, name: &XmlName) -> String {
        match &name.namespace {
            None => name.local.clone(),
            Some(uri) if uri == XML_NS => format!("xml:{}", name.local),
            Some(uri) => match self.prefix_for(uri, false) {
                Some(Some(prefix)) => format!("{prefix}:{}", name.local),
                _ => self.bind_fresh(uri, &name.local),
            },
        }
    }

    fn bind_fresh(&mut self, uri: &str, local: &str) -> String {
        let prefix = self.fresh_prefix();
        self.declare(XmlNamespace::prefixed(prefix.clone(), uri));
        format!("{prefix}:{local}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::XmlText;
    use crate::parse_document;

    fn compact() -> WriteOptions {
        WriteOptions {
            indent: 0,
            declaration: false,
        }
    }

    #[test]
    fn reuses_declared_prefixes() {
        let mut root = XmlElement::new(XmlName::new("urn:m", "definitions"));
        root.declare_namespace(XmlNamespace::default_namespace("urn:m"));
        root.declare_namespace(XmlNamespace::prefixed("e", "urn:e"));
        let mut task = XmlElement::new(XmlName::new("urn:m", "task"));
        task.set_attribute(XmlName::unqualified("id"), "t1");
        task.set_attribute(XmlName::new("urn:e", "type"), "java");
        root.push_child(task);

        let xml = write_document(&root, &compact()).expect("write");
        assert_eq!(
            xml,
            r#"<definitions xmlns="urn:m" xmlns:e="urn:e"><task id="t1" e:type="java"/></definitions>"#
        );
    }

    #[test]
    fn generates_prefix_for_undeclared_namespace() {
        let mut root = XmlElement::new(XmlName::new("urn:m", "definitions"));
        root.declare_namespace(XmlNamespace::default_namespace("urn:m"));
        root.push_child(XmlElement::new(XmlName::new("urn:other", "thing")));

        let xml = write_document(&root, &compact()).expect("write");
        assert!(xml.contains(r#"<ns1:thing xmlns:ns1="urn:other"/>"#), "{xml}");
    }

    #[test]
    fn namespaced_attribute_never_uses_default_binding() {
        let mut root = XmlElement::new(XmlName::new("urn:m", "a"));
        root.declare_namespace(XmlNamespace::default_namespace("urn:m"));
        root.set_attribute(XmlName::new("urn:m", "flag"), "1");

        let xml = write_document(&root, &compact()).expect("write");
        assert_eq!(xml, r#"<a xmlns="urn:m" xmlns:ns1="urn:m" ns1:flag="1"/>"#);
    }

    #[test]
    fn escapes_text_and_keeps_cdata() {
        let mut root = XmlElement::new(XmlName::unqualified("a"));
        let mut plain = XmlElement::new(XmlName::unqualified("p"));
        plain.set_text(XmlText::plain("1 < 2 & 3"));
        let mut script = XmlElement::new(XmlName::unqualified("s"));
        script.set_text(XmlText::cdata("if (a < b) {}"));
        root.push_child(plain);
        root.push_child(script);

        let xml = write_document(&root, &compact()).expect("write");
        assert!(xml.contains("<p>1 &lt; 2 &amp; 3</p>"), "{xml}");
        assert!(xml.contains("<s><![CDATA[if (a < b) {}]]></s>"), "{xml}");
    }

    #[test]
    fn parse_write_parse_preserves_tree() {
        let source = r#"<?xml version="1.0" encoding="UTF-8"?>
<definitions xmlns="urn:m" xmlns:x="urn:x">
  <process id="p" x:custom="v">
    <x:config><x:entry key="k">value</x:entry></x:config>
    <task id="t" xml:lang="en"/>
  </process>
</definitions>"#;
        let first = parse_document(source).expect("parse");
        let written = write_document(&first.to_element(first.root()), &WriteOptions::default())
            .expect("write");
        assert!(written.starts_with("<?xml"));
        let second = parse_document(&written).expect("reparse");
        assert_eq!(
            first.to_element(first.root()),
            second.to_element(second.root())
        );
    }
}
