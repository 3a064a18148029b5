//! Immutable parsed document and consumption tracking.
//!
//! A reader walks an [`XmlDocument`] and marks what it understood in a
//! [`Consumption`]:
//!
//! - attributes and text are consumed individually;
//! - a node is *entered* when the reader descends into it but may leave
//!   parts unread, or *claimed* when the reader took it over entirely.
//!
//! [`XmlDocument::remainder`] then derives the unconsumed part of a node as
//! an owned [`XmlElement`]. Claimed children vanish, entered children are
//! kept only if something inside them survived, and untouched children are
//! copied verbatim.

use crate::element::{XmlAttribute, XmlElement, XmlText};
use crate::name::{XmlName, XmlNamespace};
use std::collections::{HashMap, HashSet};

/// Index of a node within its [`XmlDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XmlNodeId(usize);

impl XmlNodeId {
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub(crate) struct XmlNode {
    pub(crate) name: XmlName,
    pub(crate) namespaces: Vec<XmlNamespace>,
    pub(crate) attributes: Vec<XmlAttribute>,
    pub(crate) children: Vec<XmlNodeId>,
    pub(crate) parent: Option<XmlNodeId>,
    pub(crate) text: Option<XmlText>,
}

/// A parsed XML document stored as an arena of element nodes.
///
/// The first node is always the document element.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
}

impl XmlDocument {
    pub(crate) fn from_nodes(nodes: Vec<XmlNode>) -> Self {
        debug_assert!(!nodes.is_empty());
        Self { nodes }
    }

    fn node(&self, id: XmlNodeId) -> &XmlNode {
        &self.nodes[id.0]
    }

    /// The document element.
    #[must_use]
    pub fn root(&self) -> XmlNodeId {
        XmlNodeId(0)
    }

    /// Number of element nodes in the document.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a parsed document has a document element.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn name(&self, id: XmlNodeId) -> &XmlName {
        &self.node(id).name
    }

    #[must_use]
    pub fn is(&self, id: XmlNodeId, namespace: &str, local: &str) -> bool {
        self.node(id).name.is(Some(namespace), local)
    }

    #[must_use]
    pub fn namespaces(&self, id: XmlNodeId) -> &[XmlNamespace] {
        &self.node(id).namespaces
    }

    #[must_use]
    pub fn attributes(&self, id: XmlNodeId) -> &[XmlAttribute] {
        &self.node(id).attributes
    }

    /// Finds an attribute, returning its index and value.
    #[must_use]
    pub fn attribute(
        &self,
        id: XmlNodeId,
        namespace: Option<&str>,
        local: &str,
    ) -> Option<(usize, &str)> {
        self.node(id)
            .attributes
            .iter()
            .enumerate()
            .find(|(_, a)| a.name.is(namespace, local))
            .map(|(i, a)| (i, a.value.as_str()))
    }

    #[must_use]
    pub fn children(&self, id: XmlNodeId) -> &[XmlNodeId] {
        &self.node(id).children
    }

    /// Children with the given namespace and local name.
    pub fn children_named<'a>(
        &'a self,
        id: XmlNodeId,
        namespace: &'a str,
        local: &'a str,
    ) -> impl Iterator<Item = XmlNodeId> + 'a {
        self.node(id)
            .children
            .iter()
            .copied()
            .filter(move |c| self.is(*c, namespace, local))
    }

    /// First child with the given namespace and local name.
    #[must_use]
    pub fn child(&self, id: XmlNodeId, namespace: &str, local: &str) -> Option<XmlNodeId> {
        self.children_named(id, namespace, local).next()
    }

    #[must_use]
    pub fn parent(&self, id: XmlNodeId) -> Option<XmlNodeId> {
        self.node(id).parent
    }

    #[must_use]
    pub fn text(&self, id: XmlNodeId) -> Option<&XmlText> {
        self.node(id).text.as_ref()
    }

    /// All nodes below `id` in document order, excluding `id` itself.
    #[must_use]
    pub fn descendants(&self, id: XmlNodeId) -> Vec<XmlNodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<XmlNodeId> = self.node(id).children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.node(next).children.iter().rev().copied());
        }
        out
    }

    /// Copies a node and its subtree into an owned element.
    #[must_use]
    pub fn to_element(&self, id: XmlNodeId) -> XmlElement {
        self.remainder(id, &Consumption::default())
    }

    /// The unconsumed part of a node as an owned element.
    ///
    /// The element name and namespace declarations are always kept.
    #[must_use]
    pub fn remainder(&self, id: XmlNodeId, consumption: &Consumption) -> XmlElement {
        let node = self.node(id);
        let mut element = XmlElement::new(node.name.clone());
        element.namespaces = node.namespaces.clone();
        element.attributes = node
            .attributes
            .iter()
            .enumerate()
            .filter(|(i, _)| !consumption.is_attribute_consumed(id, *i))
            .map(|(_, a)| a.clone())
            .collect();
        if !consumption.is_text_consumed(id) {
            element.text = node.text.clone();
        }
        for child in &node.children {
            match consumption.state(*child) {
                Some(NodeState::Claimed) => {}
                Some(NodeState::Entered) => {
                    let rest = self.remainder(*child, consumption);
                    if !rest.is_empty() {
                        element.children.push(rest);
                    }
                }
                None => element.children.push(self.remainder(*child, consumption)),
            }
        }
        element
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeState {
    Entered,
    Claimed,
}

/// The set of document parts a reader has consumed.
#[derive(Debug, Default, Clone)]
pub struct Consumption {
    attributes: HashSet<(XmlNodeId, usize)>,
    text: HashSet<XmlNodeId>,
    nodes: HashMap<XmlNodeId, NodeState>,
}

impl Consumption {
    pub fn consume_attribute(&mut self, id: XmlNodeId, index: usize) {
        self.attributes.insert((id, index));
    }

    #[must_use]
    pub fn is_attribute_consumed(&self, id: XmlNodeId, index: usize) -> bool {
        self.attributes.contains(&(id, index))
    }

    pub fn consume_text(&mut self, id: XmlNodeId) {
        self.text.insert(id);
    }

    #[must_use]
    pub fn is_text_consumed(&self, id: XmlNodeId) -> bool {
        self.text.contains(&id)
    }

    /// Marks a node as descended into. Never downgrades a claimed node.
    pub fn enter(&mut self, id: XmlNodeId) {
        self.nodes.entry(id).or_insert(NodeState::Entered);
    }

    /// Marks a node and its whole subtree as consumed.
    pub fn claim(&mut self, id: XmlNodeId) {
        self.nodes.insert(id, NodeState::Claimed);
    }

    #[must_use]
    pub fn is_claimed(&self, id: XmlNodeId) -> bool {
        self.state(id) == Some(NodeState::Claimed)
    }

    fn state(&self, id: XmlNodeId) -> Option<NodeState> {
        self.nodes.get(&id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse_document;

    const DOC: &str = r#"<root xmlns="urn:r" xmlns:x="urn:x" id="r1" x:extra="keep">
  <task id="t1" name="Task"><x:note>hello</x:note></task>
  <task id="t2"/>
  <x:foreign a="1"><x:inner/></x:foreign>
</root>"#;

    #[test]
    fn untouched_document_remainder_equals_full_copy() {
        let doc = parse_document(DOC).expect("parse");
        let root = doc.root();
        assert_eq!(doc.remainder(root, &Consumption::default()), doc.to_element(root));
        assert_eq!(doc.to_element(root).children.len(), 3);
    }

    #[test]
    fn consumed_attributes_are_dropped() {
        let doc = parse_document(DOC).expect("parse");
        let root = doc.root();
        let mut consumption = Consumption::default();
        let (idx, value) = doc.attribute(root, None, "id").expect("id attribute");
        assert_eq!(value, "r1");
        consumption.consume_attribute(root, idx);

        let rest = doc.remainder(root, &consumption);
        assert_eq!(rest.attribute(None, "id"), None);
        assert_eq!(rest.attribute(Some("urn:x"), "extra"), Some("keep"));
    }

    #[test]
    fn claimed_children_vanish_and_entered_empty_children_are_pruned() {
        let doc = parse_document(DOC).expect("parse");
        let root = doc.root();
        let tasks: Vec<_> = doc.children_named(root, "urn:r", "task").collect();
        let mut consumption = Consumption::default();

        // t1: consume everything except the foreign note.
        consumption.enter(tasks[0]);
        for (i, _) in doc.attributes(tasks[0]).iter().enumerate() {
            consumption.consume_attribute(tasks[0], i);
        }
        // t2: consume its only attribute; nothing else survives.
        consumption.enter(tasks[1]);
        consumption.consume_attribute(tasks[1], 0);

        let rest = doc.remainder(root, &consumption);
        let names: Vec<_> = rest.children.iter().map(|c| c.name.local.as_str()).collect();
        assert_eq!(names, ["task", "foreign"]);
        assert!(rest.children[0].child(Some("urn:x"), "note").is_some());

        consumption.claim(tasks[0]);
        let rest = doc.remainder(root, &consumption);
        let names: Vec<_> = rest.children.iter().map(|c| c.name.local.as_str()).collect();
        assert_eq!(names, ["foreign"]);
    }

    #[test]
    fn enter_does_not_downgrade_claim() {
        let doc = parse_document(DOC).expect("parse");
        let first = doc.children(doc.root())[0];
        let mut consumption = Consumption::default();
        consumption.claim(first);
        consumption.enter(first);
        assert!(consumption.is_claimed(first));
    }

    #[test]
    fn descendants_are_in_document_order() {
        let doc = parse_document(DOC).expect("parse");
        let locals: Vec<_> = doc
            .descendants(doc.root())
            .into_iter()
            .map(|id| doc.name(id).local.clone())
            .collect();
        assert_eq!(locals, ["task", "note", "task", "foreign", "inner"]);
    }
}
