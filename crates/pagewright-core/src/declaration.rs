//! Declared elements: what a test expects to see on screen.
//!
//! An [`Element`] is authored in a page's body and describes one node of the
//! expected tree by kind and optional attributes. Each element carries an
//! [`ElementId`] allocated when it is constructed. Clones share the id, so a
//! page that stores its elements as fields and clones them into
//! [`Page::body`](crate::page::Page::body) resolves to the same cache entries
//! every time the body is evaluated.
//!
//! Constructors are `#[track_caller]`: the file, line and column of the
//! declaration are kept for failure messages.

use std::fmt;
use std::panic::Location;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use crate::kind::ElementKind;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identity of a declared element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ElementId(u64);

impl ElementId {
    /// Identity shared by every element synthesized from a live tree.
    pub const DYNAMIC: ElementId = ElementId(0);

    fn allocate() -> Self {
        ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn is_dynamic(self) -> bool {
        self == Self::DYNAMIC
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_dynamic() {
            f.write_str("dynamic")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// A declared element.
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    id: ElementId,
    kind: ElementKind,
    identifier: Option<String>,
    label: Option<String>,
    value: Option<String>,
    children: Vec<Element>,
    declared_at: Option<&'static Location<'static>>,
}

impl Element {
    /// Declares an element of any kind.
    #[track_caller]
    pub fn new(kind: ElementKind) -> Self {
        Self {
            id: ElementId::allocate(),
            kind,
            identifier: None,
            label: None,
            value: None,
            children: Vec::new(),
            declared_at: Some(Location::caller()),
        }
    }

    /// An element synthesized from a live tree rather than authored.
    ///
    /// Dynamic elements never enter the element cache, so they can be matched
    /// but not interacted with.
    pub fn dynamic(kind: ElementKind) -> Self {
        Self {
            id: ElementId::DYNAMIC,
            kind,
            identifier: None,
            label: None,
            value: None,
            children: Vec::new(),
            declared_at: None,
        }
    }

    /// A static text with the given label pattern.
    #[track_caller]
    pub fn static_text(label: impl Into<String>) -> Self {
        Self::new(ElementKind::StaticText).with_label(label)
    }

    #[track_caller]
    pub fn button() -> Self {
        Self::new(ElementKind::Button)
    }

    #[track_caller]
    pub fn alert() -> Self {
        Self::new(ElementKind::Alert)
    }

    #[track_caller]
    pub fn navigation_bar() -> Self {
        Self::new(ElementKind::NavigationBar)
    }

    #[track_caller]
    pub fn tab_bar() -> Self {
        Self::new(ElementKind::TabBar)
    }

    #[track_caller]
    pub fn collection_view() -> Self {
        Self::new(ElementKind::CollectionView)
    }

    #[track_caller]
    pub fn cell() -> Self {
        Self::new(ElementKind::Cell)
    }

    #[track_caller]
    pub fn text_field() -> Self {
        Self::new(ElementKind::TextField)
    }

    #[track_caller]
    pub fn secure_text_field() -> Self {
        Self::new(ElementKind::SecureTextField)
    }

    #[track_caller]
    pub fn switch() -> Self {
        Self::new(ElementKind::Switch)
    }

    /// A generic container.
    #[track_caller]
    pub fn other() -> Self {
        Self::new(ElementKind::Other)
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = Some(identifier.into());
        self
    }

    /// Sets the label pattern. May embed [`TestData`](crate::test_data::TestData) placeholders.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Sets the value pattern. May embed [`TestData`](crate::test_data::TestData) placeholders.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    pub fn with_children(mut self, children: impl IntoIterator<Item = Element>) -> Self {
        self.children.extend(children);
        self
    }

    pub fn id(&self) -> ElementId {
        self.id
    }

    pub fn kind(&self) -> ElementKind {
        self.kind
    }

    pub fn identifier(&self) -> Option<&str> {
        self.identifier.as_deref()
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub fn is_dynamic(&self) -> bool {
        self.id.is_dynamic()
    }

    /// Where the element was declared, `None` for dynamic elements.
    pub fn declared_at(&self) -> Option<&'static Location<'static>> {
        self.declared_at
    }

    /// This element and all of its descendants, in pre-order.
    pub fn flatten(&self) -> Vec<&Element> {
        let mut out = Vec::new();
        collect_preorder(self, &mut out);
        out
    }

    /// The query identifier derived from this element.
    pub fn query_identifier(&self) -> QueryIdentifier {
        QueryIdentifier {
            descendants: self.children.iter().map(Element::own_query).collect(),
            ..self.own_query()
        }
    }

    fn own_query(&self) -> QueryIdentifier {
        QueryIdentifier {
            kind: self.kind,
            identifier: self.identifier.clone(),
            label: self.label.clone(),
            value: self.value.clone(),
            descendants: Vec::new(),
        }
    }
}

fn collect_preorder<'a>(element: &'a Element, out: &mut Vec<&'a Element>) {
    out.push(element);
    for child in &element.children {
        collect_preorder(child, out);
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        let attributes: Vec<String> = [
            ("identifier", &self.identifier),
            ("label", &self.label),
            ("value", &self.value),
        ]
        .into_iter()
        .filter_map(|(name, attr)| attr.as_ref().map(|v| format!("{}: {:?}", name, v)))
        .collect();
        if !attributes.is_empty() {
            write!(f, "({})", attributes.join(", "))?;
        }
        Ok(())
    }
}

/// The self-matching predicate of a declared element.
///
/// `descendants` holds the predicates of the element's direct children only.
/// They are used as a one-level existence pre-check, never for full subtree
/// verification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct QueryIdentifier {
    pub kind: ElementKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub descendants: Vec<QueryIdentifier>,
}
