//! Qualified names and namespace bindings.

use std::fmt;

/// The namespace permanently bound to the `xml` prefix.
pub const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

/// A namespace-qualified XML name.
///
/// Unprefixed attributes have no namespace; unprefixed elements take the
/// in-scope default namespace, if any.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct XmlName {
    /// Namespace URI, if the name is qualified.
    pub namespace: Option<String>,
    /// Local part of the name.
    pub local: String,
}

impl XmlName {
    /// Creates a name in the given namespace.
    #[must_use]
    pub fn new(namespace: impl Into<String>, local: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local: local.into(),
        }
    }

    /// Creates a name without a namespace.
    #[must_use]
    pub fn unqualified(local: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local: local.into(),
        }
    }

    /// Whether this name has the given namespace (`None` = no namespace)
    /// and local part.
    #[must_use]
    pub fn is(&self, namespace: Option<&str>, local: &str) -> bool {
        self.local == local && self.namespace.as_deref() == namespace
    }
}

impl fmt::Display for XmlName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{ns}}}{}", self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// A namespace declaration (`xmlns` or `xmlns:prefix`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct XmlNamespace {
    /// The bound prefix; `None` for the default namespace.
    pub prefix: Option<String>,
    /// The namespace URI. Empty undeclares the default namespace.
    pub uri: String,
}

impl XmlNamespace {
    /// Creates a prefixed binding.
    #[must_use]
    pub fn prefixed(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            uri: uri.into(),
        }
    }

    /// Creates a default-namespace binding.
    #[must_use]
    pub fn default_namespace(uri: impl Into<String>) -> Self {
        Self {
            prefix: None,
            uri: uri.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uses_clark_notation() {
        let name = XmlName::new("urn:a", "task");
        assert_eq!(name.to_string(), "{urn:a}task");
        assert_eq!(XmlName::unqualified("id").to_string(), "id");
    }

    #[test]
    fn is_compares_namespace_and_local() {
        let name = XmlName::new("urn:a", "task");
        assert!(name.is(Some("urn:a"), "task"));
        assert!(!name.is(None, "task"));
        assert!(!name.is(Some("urn:b"), "task"));
    }
}
