//! Owned, namespace-aware XML tree
//!
//! `roxmltree` does the parsing; the result is copied into an owned tree so
//! descriptors can keep it without borrowing the source text. Lookups go
//! through [`Node`], which resolves `PREFIX:name` keys against a fixed
//! [`Namespaces`] table instead of whatever prefixes the document declares.
//!
//! Missing elements and attributes are never errors here: they come back as
//! [`Observed::Absent`] (or an empty iterator) so callers can tell "absent"
//! apart from "present but wrong".

use std::fmt;
use std::path::Path;

use serde::Serialize;

use crate::error::{LookupError, LookupResult, Result, ValidatorError};

/// Namespace of project-level (`.dtproj` manifest) elements
pub const SSIS_NAMESPACE: &str = "www.microsoft.com/SqlServer/SSIS";

/// Namespace of package-level (`.dtsx`) elements
pub const DTS_NAMESPACE: &str = "www.microsoft.com/SqlServer/Dts";

const BYTE_ORDER_MARK: char = '\u{feff}';

/// A looked-up value that may be missing from the document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "value", rename_all = "lowercase")]
pub enum Observed {
    Absent,
    Present(String),
}

impl Observed {
    pub fn is_present(&self) -> bool {
        matches!(self, Observed::Present(_))
    }

    pub fn as_deref(&self) -> Option<&str> {
        match self {
            Observed::Present(value) => Some(value),
            Observed::Absent => None,
        }
    }

    /// True if the value is present and equal to `expected` (case-sensitive)
    pub fn is(&self, expected: &str) -> bool {
        self.as_deref() == Some(expected)
    }

    /// Convert into an extractor result, naming the attribute when absent
    pub fn require(self, attribute: &str) -> LookupResult<String> {
        match self {
            Observed::Present(value) => Ok(value),
            Observed::Absent => Err(LookupError::missing(attribute)),
        }
    }
}

impl From<Option<String>> for Observed {
    fn from(value: Option<String>) -> Self {
        value.map_or(Observed::Absent, Observed::Present)
    }
}

impl fmt::Display for Observed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observed::Present(value) => write!(f, "{}", value),
            Observed::Absent => write!(f, "<absent>"),
        }
    }
}

/// Prefix table used to resolve lookup keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Namespaces {
    default: Option<String>,
    prefixes: Vec<(String, String)>,
}

impl Namespaces {
    pub fn new() -> Self {
        Self {
            default: None,
            prefixes: Vec::new(),
        }
    }

    /// Known SSIS prefixes: `SSIS` for project manifests, `DTS` for packages
    pub fn ssis() -> Self {
        Self::new()
            .with_prefix("SSIS", SSIS_NAMESPACE)
            .with_prefix("DTS", DTS_NAMESPACE)
    }

    pub fn with_prefix(mut self, prefix: &str, uri: &str) -> Self {
        self.prefixes.push((prefix.to_string(), uri.to_string()));
        self
    }

    /// Unprefixed element keys also match elements in this namespace
    pub fn with_default(mut self, uri: &str) -> Self {
        self.default = Some(uri.to_string());
        self
    }

    fn resolve<'k>(&self, key: &'k str) -> Key<'k> {
        match key.split_once(':') {
            Some((prefix, local)) => {
                let uri = self
                    .prefixes
                    .iter()
                    .find(|(p, _)| p == prefix)
                    .map(|(_, uri)| uri.clone());
                match uri {
                    Some(uri) => Key::Qualified { uri, local },
                    None => Key::Unknown,
                }
            }
            None => Key::Local(key),
        }
    }
}

impl Default for Namespaces {
    fn default() -> Self {
        Self::new()
    }
}

enum Key<'k> {
    Local(&'k str),
    Qualified { uri: String, local: &'k str },
    /// Prefix not in the table; matches nothing
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct XmlAttribute {
    namespace: Option<String>,
    name: String,
    value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct XmlElement {
    namespace: Option<String>,
    name: String,
    attributes: Vec<XmlAttribute>,
    text: Option<String>,
    children: Vec<XmlElement>,
}

impl XmlElement {
    fn from_node(node: roxmltree::Node<'_, '_>) -> Self {
        let tag = node.tag_name();
        Self {
            namespace: tag.namespace().map(str::to_string),
            name: tag.name().to_string(),
            attributes: node
                .attributes()
                .map(|attr| XmlAttribute {
                    namespace: attr.namespace().map(str::to_string),
                    name: attr.name().to_string(),
                    value: attr.value().to_string(),
                })
                .collect(),
            text: node.text().map(str::to_string),
            children: node
                .children()
                .filter(|child| child.is_element())
                .map(XmlElement::from_node)
                .collect(),
        }
    }
}

/// A parsed XML document together with the prefix table used to query it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlDocument {
    root: XmlElement,
    namespaces: Namespaces,
}

impl XmlDocument {
    /// Parse XML text; `path` is only used for error reporting
    pub fn parse(text: &str, namespaces: Namespaces, path: &Path) -> Result<Self> {
        let text = text.strip_prefix(BYTE_ORDER_MARK).unwrap_or(text);
        let document =
            roxmltree::Document::parse(text).map_err(|e| ValidatorError::MalformedXml {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;

        Ok(Self {
            root: XmlElement::from_node(document.root_element()),
            namespaces,
        })
    }

    /// Read and parse a file. The handle is closed before parsing starts.
    pub fn load(path: &Path, namespaces: Namespaces) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::InvalidData {
                ValidatorError::MalformedXml {
                    path: path.to_path_buf(),
                    details: "file is not valid UTF-8".to_string(),
                }
            } else {
                ValidatorError::FileRead {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::parse(&text, namespaces, path)
    }

    pub fn root(&self) -> Node<'_> {
        Node {
            element: &self.root,
            namespaces: &self.namespaces,
        }
    }
}

/// Borrowed cursor into an [`XmlDocument`]
#[derive(Debug, Clone, Copy)]
pub struct Node<'a> {
    element: &'a XmlElement,
    namespaces: &'a Namespaces,
}

impl<'a> Node<'a> {
    fn wrap(&self, element: &'a XmlElement) -> Node<'a> {
        Node {
            element,
            namespaces: self.namespaces,
        }
    }

    fn matches(&self, key: &Key<'_>) -> bool {
        match key {
            Key::Local(local) => {
                self.element.name == *local
                    && (self.element.namespace.is_none()
                        || self.element.namespace == self.namespaces.default)
            }
            Key::Qualified { uri, local } => {
                self.element.name == *local && self.element.namespace.as_deref() == Some(uri.as_str())
            }
            Key::Unknown => false,
        }
    }

    /// Local name of this element, without any prefix
    pub fn name(&self) -> &'a str {
        &self.element.name
    }

    /// Does this element match `key` (`name` or `PREFIX:name`)?
    pub fn is(&self, key: &str) -> bool {
        self.matches(&self.namespaces.resolve(key))
    }

    /// Direct children matching `key`, in document order
    pub fn children(&self, key: &str) -> Vec<Node<'a>> {
        let key = self.namespaces.resolve(key);
        self.element
            .children
            .iter()
            .map(|child| self.wrap(child))
            .filter(|child| child.matches(&key))
            .collect()
    }

    /// First direct child matching `key`
    pub fn child(&self, key: &str) -> Option<Node<'a>> {
        self.children(key).into_iter().next()
    }

    /// Every element below this one matching `key`, depth-first in document order
    pub fn descendants(&self, key: &str) -> Vec<Node<'a>> {
        let key = self.namespaces.resolve(key);
        let mut found = Vec::new();
        self.collect_descendants(&key, &mut found);
        found
    }

    fn collect_descendants(&self, key: &Key<'_>, found: &mut Vec<Node<'a>>) {
        for child in &self.element.children {
            let node = self.wrap(child);
            if node.matches(key) {
                found.push(node);
            }
            node.collect_descendants(key, found);
        }
    }

    /// First element below this one matching `key`
    pub fn descendant(&self, key: &str) -> Option<Node<'a>> {
        self.descendants(key).into_iter().next()
    }

    /// Follow a path of keys: the first step is searched in this element and
    /// everything below it, each later step among the children of the
    /// previous matches.
    pub fn select(&self, steps: &[&str]) -> Vec<Node<'a>> {
        let Some((first, rest)) = steps.split_first() else {
            return vec![*self];
        };

        let mut current = if self.is(first) {
            vec![*self]
        } else {
            Vec::new()
        };
        current.extend(self.descendants(first));

        for step in rest {
            current = current.iter().flat_map(|node| node.children(step)).collect();
        }
        current
    }

    /// Attribute value by `name` or `PREFIX:name`
    pub fn attribute(&self, key: &str) -> Observed {
        let value = match self.namespaces.resolve(key) {
            Key::Local(local) => self
                .element
                .attributes
                .iter()
                .find(|attr| attr.namespace.is_none() && attr.name == local),
            Key::Qualified { uri, local } => self
                .element
                .attributes
                .iter()
                .find(|attr| attr.namespace.as_deref() == Some(uri.as_str()) && attr.name == local),
            Key::Unknown => None,
        };
        value.map(|attr| attr.value.clone()).into()
    }

    /// Text content of this element
    pub fn text(&self) -> Observed {
        self.element.text.clone().into()
    }
}
