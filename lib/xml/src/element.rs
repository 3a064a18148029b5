//! Owned, mutable XML element tree.

use crate::name::{XmlName, XmlNamespace};

/// An attribute with its resolved name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: XmlName,
    pub value: String,
}

impl XmlAttribute {
    #[must_use]
    pub fn new(name: XmlName, value: impl Into<String>) -> Self {
        Self {
            name,
            value: value.into(),
        }
    }
}

/// Character content of an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlText {
    pub value: String,
    /// Whether the content was (or should be written as) a CDATA section.
    pub cdata: bool,
}

impl XmlText {
    #[must_use]
    pub fn plain(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            cdata: false,
        }
    }

    #[must_use]
    pub fn cdata(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            cdata: true,
        }
    }
}

/// An owned XML element.
///
/// Mixed content is not modelled: an element has at most one text value,
/// which is written before its children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    pub name: XmlName,
    /// Namespace declarations made on this element.
    pub namespaces: Vec<XmlNamespace>,
    pub attributes: Vec<XmlAttribute>,
    pub children: Vec<XmlElement>,
    pub text: Option<XmlText>,
}

impl XmlElement {
    /// Creates an empty element.
    #[must_use]
    pub fn new(name: XmlName) -> Self {
        Self {
            name,
            namespaces: Vec::new(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Whether the element carries no attributes, children or text.
    ///
    /// Namespace declarations alone do not make an element non-empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty() && self.children.is_empty() && self.text.is_none()
    }

    /// Returns the value of an attribute.
    #[must_use]
    pub fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name.is(namespace, local))
            .map(|a| a.value.as_str())
    }

    /// Sets an attribute, replacing any existing value in place.
    pub fn set_attribute(&mut self, name: XmlName, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value,
            None => self.attributes.push(XmlAttribute { name, value }),
        }
    }

    /// Removes an attribute and returns its value.
    pub fn remove_attribute(&mut self, namespace: Option<&str>, local: &str) -> Option<String> {
        let index = self
            .attributes
            .iter()
            .position(|a| a.name.is(namespace, local))?;
        Some(self.attributes.remove(index).value)
    }

    /// Declares a namespace on this element unless the same binding is
    /// already declared here.
    pub fn declare_namespace(&mut self, namespace: XmlNamespace) {
        if let Some(existing) = self
            .namespaces
            .iter_mut()
            .find(|n| n.prefix == namespace.prefix)
        {
            existing.uri = namespace.uri;
        } else {
            self.namespaces.push(namespace);
        }
    }

    /// Appends a child.
    pub fn push_child(&mut self, child: XmlElement) {
        self.children.push(child);
    }

    /// Inserts a child before all existing children.
    pub fn insert_child_first(&mut self, child: XmlElement) {
        self.children.insert(0, child);
    }

    /// Returns the first child with the given name.
    #[must_use]
    pub fn child(&self, namespace: Option<&str>, local: &str) -> Option<&XmlElement> {
        self.children.iter().find(|c| c.name.is(namespace, local))
    }

    /// Returns a mutable reference to the first child with the given name.
    pub fn child_mut(&mut self, namespace: Option<&str>, local: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find(|c| c.name.is(namespace, local))
    }

    /// Removes and returns the first child with the given name.
    pub fn take_child(&mut self, namespace: Option<&str>, local: &str) -> Option<XmlElement> {
        let index = self
            .children
            .iter()
            .position(|c| c.name.is(namespace, local))?;
        Some(self.children.remove(index))
    }

    /// Iterates over the children with the given name.
    pub fn children_named<'a>(
        &'a self,
        namespace: Option<&'a str>,
        local: &'a str,
    ) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children
            .iter()
            .filter(move |c| c.name.is(namespace, local))
    }

    /// Sets the text content.
    pub fn set_text(&mut self, text: XmlText) {
        self.text = Some(text);
    }

    /// Returns the text content, if any.
    #[must_use]
    pub fn text_value(&self) -> Option<&str> {
        self.text.as_ref().map(|t| t.value.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:test";

    fn named(local: &str) -> XmlElement {
        XmlElement::new(XmlName::new(NS, local))
    }

    #[test]
    fn set_attribute_replaces_existing_value() {
        let mut el = named("task");
        el.set_attribute(XmlName::unqualified("id"), "a");
        el.set_attribute(XmlName::unqualified("name"), "n");
        el.set_attribute(XmlName::unqualified("id"), "b");

        assert_eq!(el.attributes.len(), 2);
        assert_eq!(el.attributes[0].value, "b");
        assert_eq!(el.attribute(None, "id"), Some("b"));
    }

    #[test]
    fn insert_child_first_prepends() {
        let mut el = named("process");
        el.push_child(named("b"));
        el.insert_child_first(named("a"));

        let locals: Vec<_> = el.children.iter().map(|c| c.name.local.as_str()).collect();
        assert_eq!(locals, ["a", "b"]);
    }

    #[test]
    fn take_child_removes_only_first_match() {
        let mut el = named("process");
        el.push_child(named("task"));
        el.push_child(named("task"));

        assert!(el.take_child(Some(NS), "task").is_some());
        assert_eq!(el.children_named(Some(NS), "task").count(), 1);
        assert!(el.take_child(Some(NS), "missing").is_none());
    }

    #[test]
    fn namespace_declarations_do_not_count_as_content() {
        let mut el = named("extensionElements");
        el.declare_namespace(XmlNamespace::prefixed("x", "urn:x"));
        assert!(el.is_empty());

        el.set_text(XmlText::plain("body"));
        assert!(!el.is_empty());
    }
}
