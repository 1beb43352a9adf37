//! Resolution of declared pages against live trees.
//!
//! The [`Finder`] walks a page's declared elements and a [`Snapshot`] in
//! lockstep. Top-level elements are searched in declaration order, each one
//! strictly after the traversal index of the previously matched top-level
//! element. A container's children are searched the same way inside the
//! container's own subtree.
//!
//! The search is greedy. The first node that matches an element's own
//! attributes is the candidate. If any declared child cannot be found inside
//! the candidate's subtree, the candidate is rejected and the element is
//! missing; no other node is tried. The bound only moves forward when a
//! top-level element is accepted, so one missing element does not affect the
//! search for the next.

use std::ops::Range;
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info_span};

use crate::declaration::{Element, ElementId, QueryIdentifier};
use crate::element::UIElement;
use crate::pattern::{Capture, LabelPattern, PatternError};
use crate::snapshot::{PathStep, Snapshot};
use crate::kind::ElementKind;

/// Where a declared element was found: its path and occurrence index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementLocation {
    pub path: Vec<PathStep>,
    /// Number of earlier resolutions in the same pass that share `path`.
    pub index: usize,
}

/// Output of a resolution pass.
#[derive(Debug, Clone, Default)]
pub struct Resolution {
    /// Locations of every accepted element, nested ones included, in resolution order.
    pub resolved: Vec<(ElementId, ElementLocation)>,
    /// Captures from accepted matches only.
    pub captures: Vec<Capture>,
    /// Top-level elements that were not found, in declaration order.
    pub missing: Vec<Element>,
}

impl Resolution {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }

    pub fn location(&self, id: ElementId) -> Option<&ElementLocation> {
        self.resolved.iter().find(|(resolved, _)| *resolved == id).map(|(_, location)| location)
    }
}

/// A [`QueryIdentifier`] with its label and value patterns compiled.
#[derive(Debug)]
struct CompiledQuery {
    query: QueryIdentifier,
    label: Option<LabelPattern>,
    value: Option<LabelPattern>,
    /// Direct children only, for the one-level pre-check.
    descendants: Vec<CompiledQuery>,
}

impl CompiledQuery {
    fn compile(query: QueryIdentifier) -> Result<Self, PatternError> {
        let label = query.label.as_deref().map(LabelPattern::parse).transpose()?;
        let value = query.value.as_deref().map(LabelPattern::parse).transpose()?;
        let descendants = query
            .descendants
            .iter()
            .cloned()
            .map(CompiledQuery::compile)
            .collect::<Result<_, _>>()?;
        Ok(Self {
            query,
            label,
            value,
            descendants,
        })
    }

    /// Tests a node's own attributes. Returns the captures on a match.
    fn matches_self(&self, snapshot: &Snapshot, pos: usize) -> Option<Vec<Capture>> {
        let node = snapshot.node(pos);
        if self.query.kind != ElementKind::Any && self.query.kind != node.kind {
            return None;
        }
        if let Some(identifier) = &self.query.identifier {
            if *identifier != node.identifier {
                return None;
            }
        }
        let mut captures = match &self.label {
            Some(pattern) => pattern.captures(&node.label)?,
            None => Vec::new(),
        };
        if let Some(pattern) = &self.value {
            captures.extend(pattern.captures(node.value.as_deref()?)?);
        }
        Some(captures)
    }
}

#[derive(Debug)]
struct CompiledElement<'a> {
    element: &'a Element,
    query: CompiledQuery,
    children: Vec<CompiledElement<'a>>,
}

impl<'a> CompiledElement<'a> {
    fn compile(element: &'a Element) -> Result<Self, PatternError> {
        Ok(Self {
            element,
            query: CompiledQuery::compile(element.query_identifier())?,
            children: element
                .children()
                .iter()
                .map(CompiledElement::compile)
                .collect::<Result<_, _>>()?,
        })
    }

    fn matches_self(&self, snapshot: &Snapshot, pos: usize) -> Option<Vec<Capture>> {
        self.query.matches_self(snapshot, pos)
    }
}

/// A page description with all of its patterns compiled.
#[derive(Debug)]
pub struct Finder<'a> {
    page: String,
    elements: Vec<CompiledElement<'a>>,
}

impl<'a> Finder<'a> {
    /// Compiles every label and value pattern of the description.
    pub fn compile(page: impl Into<String>, elements: &'a [Element]) -> Result<Self, PatternError> {
        Ok(Self {
            page: page.into(),
            elements: elements
                .iter()
                .map(CompiledElement::compile)
                .collect::<Result<_, _>>()?,
        })
    }

    /// Runs one resolution pass.
    ///
    /// Without a tree every top-level element is missing.
    pub fn resolve(&self, tree: Option<&UIElement>) -> Resolution {
        let _span = info_span!("resolve_page", page = %self.page).entered();
        let start = Instant::now();

        let Some(tree) = tree else {
            debug!("no live tree, reporting every element missing");
            return Resolution {
                missing: self.elements.iter().map(|c| c.element.clone()).collect(),
                ..Resolution::default()
            };
        };

        let snapshot = Snapshot::build(tree);
        let mut pass = Pass {
            snapshot: &snapshot,
            resolution: Resolution::default(),
        };

        let mut bound = 0;
        for compiled in &self.elements {
            match pass.resolve_element(compiled, 0..snapshot.len(), bound) {
                Some(index) => bound = index,
                None => {
                    debug!(element = %compiled.element, after = bound, "element missing");
                    pass.resolution.missing.push(compiled.element.clone());
                }
            }
        }

        debug!(
            nodes = snapshot.len(),
            resolved = pass.resolution.resolved.len(),
            missing = pass.resolution.missing.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "resolution finished"
        );
        pass.resolution
    }
}

struct Pass<'s> {
    snapshot: &'s Snapshot,
    resolution: Resolution,
}

impl Pass<'_> {
    /// Finds the first node in `scope` with traversal index above `bound` and
    /// verifies the element's children beneath it.
    ///
    /// Returns the accepted node's traversal index.
    fn resolve_element(&mut self, compiled: &CompiledElement<'_>, scope: Range<usize>, bound: usize) -> Option<usize> {
        // Position p has traversal index p + 1, so index > bound means p >= bound.
        let first = scope.start.max(bound);
        let (pos, captures) = (first..scope.end)
            .find_map(|pos| compiled.matches_self(self.snapshot, pos).map(|captures| (pos, captures)))?;

        let checkpoint = (self.resolution.resolved.len(), self.resolution.captures.len());
        self.record(compiled.element, pos, captures);

        if !compiled.children.is_empty() && !self.verify_children(compiled, pos) {
            debug!(element = %compiled.element, index = pos + 1, "candidate rejected");
            self.resolution.resolved.truncate(checkpoint.0);
            self.resolution.captures.truncate(checkpoint.1);
            return None;
        }

        Some(self.snapshot.node(pos).index)
    }

    fn verify_children(&mut self, compiled: &CompiledElement<'_>, pos: usize) -> bool {
        let subtree = self.snapshot.subtree(pos);

        let precheck = compiled.query.descendants.iter().all(|descendant| {
            subtree
                .clone()
                .any(|candidate| descendant.matches_self(self.snapshot, candidate).is_some())
        });
        if !precheck {
            return false;
        }

        let mut bound = self.snapshot.node(pos).index;
        for child in &compiled.children {
            match self.resolve_element(child, subtree.clone(), bound) {
                Some(index) => bound = index,
                None => return false,
            }
        }
        true
    }

    fn record(&mut self, element: &Element, pos: usize, captures: Vec<Capture>) {
        let path = self.snapshot.path(pos);
        let index = self
            .resolution
            .resolved
            .iter()
            .filter(|(_, location)| location.path == path)
            .count();
        self.resolution.resolved.push((element.id(), ElementLocation { path, index }));
        self.resolution.captures.extend(captures);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::TestData;

    fn text(label: &str) -> UIElement {
        UIElement::new(ElementKind::StaticText).with_label(label)
    }

    fn button(label: &str) -> UIElement {
        UIElement::new(ElementKind::Button).with_label(label)
    }

    fn app(children: impl IntoIterator<Item = UIElement>) -> UIElement {
        UIElement::new(ElementKind::Application).with_children(children)
    }

    fn resolve(elements: &[Element], tree: &UIElement) -> Resolution {
        Finder::compile("Test", elements).unwrap().resolve(Some(tree))
    }

    #[test]
    fn test_resolves_in_document_order() {
        let tree = app([text("A"), button("B")]);
        let elements = [Element::static_text("A"), Element::button().with_label("B")];
        let resolution = resolve(&elements, &tree);
        assert!(resolution.is_complete());
        assert_eq!(resolution.resolved.len(), 2);
        assert_eq!(resolution.location(elements[1].id()).unwrap().path.len(), 2);
    }

    #[test]
    fn test_out_of_order_element_is_missing() {
        let tree = app([button("B"), text("A")]);
        let elements = [Element::static_text("A"), Element::button().with_label("B")];
        let resolution = resolve(&elements, &tree);
        assert_eq!(resolution.missing.len(), 1);
        assert_eq!(resolution.missing[0].id(), elements[1].id());
    }

    #[test]
    fn test_missing_is_order_preserving() {
        let tree = app([text("A"), text("C")]);
        let elements = [Element::static_text("A"), Element::static_text("B"), Element::static_text("C")];
        let resolution = resolve(&elements, &tree);
        let missing: Vec<ElementId> = resolution.missing.iter().map(Element::id).collect();
        assert_eq!(missing, vec![elements[1].id()]);
    }

    #[test]
    fn test_missing_element_does_not_advance_bound() {
        let tree = app([text("A"), text("C")]);
        let elements = [Element::static_text("B"), Element::static_text("A"), Element::static_text("C")];
        let resolution = resolve(&elements, &tree);
        assert_eq!(resolution.missing.len(), 1);
        assert_eq!(resolution.missing[0].label(), Some("B"));
    }

    #[test]
    fn test_container_without_all_children_is_missing() {
        let tree = app([UIElement::new(ElementKind::Alert).with_children([text("Title")])]);
        let title = Element::static_text("Title");
        let alert = Element::alert().with_children([title.clone(), Element::button().with_label("OK")]);
        let resolution = resolve(std::slice::from_ref(&alert), &tree);
        assert_eq!(resolution.missing.len(), 1);
        assert_eq!(resolution.missing[0].id(), alert.id());
        // Tentative child records of a rejected candidate are discarded.
        assert!(resolution.location(title.id()).is_none());
        assert!(resolution.resolved.is_empty());
    }

    #[test]
    fn test_compiled_query_follows_query_identifier() {
        let alert = Element::alert().with_children([
            Element::static_text("Title"),
            Element::other().with_child(Element::button().with_label("OK")),
        ]);
        let compiled = CompiledElement::compile(&alert).unwrap();
        assert_eq!(compiled.query.query, alert.query_identifier());
        // Pre-check covers direct children only.
        assert_eq!(compiled.query.descendants.len(), 2);
        assert!(compiled.query.descendants[1].descendants.is_empty());
        assert!(compiled.query.descendants[0].label.is_some());
    }

    #[test]
    fn test_precheck_rejects_before_recording_children() {
        // The button exists nowhere under the cell, so nothing is resolved.
        let tree = app([UIElement::new(ElementKind::Cell).with_children([text("Title")]), button("OK")]);
        let cell = Element::cell().with_children([Element::static_text("Title"), Element::button().with_label("OK")]);
        let resolution = resolve(std::slice::from_ref(&cell), &tree);
        assert_eq!(resolution.missing.len(), 1);
        assert!(resolution.resolved.is_empty());
    }

    #[test]
    fn test_no_backtracking_to_later_candidate() {
        // The first alert lacks the button; a second, complete alert exists later.
        let tree = app([
            UIElement::new(ElementKind::Alert).with_children([text("Title")]),
            UIElement::new(ElementKind::Alert).with_children([text("Title"), button("OK")]),
        ]);
        let alert = Element::alert().with_children([Element::static_text("Title"), Element::button().with_label("OK")]);
        let resolution = resolve(std::slice::from_ref(&alert), &tree);
        assert_eq!(resolution.missing.len(), 1);
    }

    #[test]
    fn test_children_must_appear_in_order_within_subtree() {
        let tree = app([
            UIElement::new(ElementKind::Cell).with_children([button("OK"), text("Title")]),
            text("Title"),
        ]);
        let cell = Element::cell().with_children([Element::static_text("Title"), Element::button().with_label("OK")]);
        let resolution = resolve(std::slice::from_ref(&cell), &tree);
        assert_eq!(resolution.missing.len(), 1);
    }

    #[test]
    fn test_nested_children_resolve_at_any_depth() {
        let tree = app([UIElement::new(ElementKind::Alert).with_children([UIElement::new(ElementKind::Other)
            .with_children([text("Title"), UIElement::new(ElementKind::Other).with_children([button("OK")])])])]);
        let ok = Element::button().with_label("OK");
        let alert = Element::alert().with_children([Element::static_text("Title"), ok.clone()]);
        let resolution = resolve(std::slice::from_ref(&alert), &tree);
        assert!(resolution.is_complete());
        let location = resolution.location(ok.id()).unwrap();
        assert_eq!(location.path.len(), 5);
        assert_eq!(location.index, 0);
    }

    #[test]
    fn test_repeated_nodes_get_increasing_occurrence_indices() {
        let cell = || UIElement::new(ElementKind::Cell).with_children([text("Same")]);
        let tree = app([cell(), cell()]);
        let first = Element::cell().with_child(Element::static_text("Same"));
        let second = Element::cell().with_child(Element::static_text("Same"));
        let elements = [first.clone(), second.clone()];
        let resolution = resolve(&elements, &tree);
        assert!(resolution.is_complete());
        assert_eq!(resolution.location(first.id()).unwrap().index, 0);
        assert_eq!(resolution.location(second.id()).unwrap().index, 1);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let tree = app([text("A"), UIElement::new(ElementKind::Cell).with_children([button("B")])]);
        let elements = [
            Element::static_text("A"),
            Element::cell().with_child(Element::button().with_label("B")),
        ];
        let finder = Finder::compile("Test", &elements).unwrap();
        let first = finder.resolve(Some(&tree));
        let second = finder.resolve(Some(&tree));
        assert_eq!(first.resolved, second.resolved);
    }

    #[test]
    fn test_identifier_and_value_matching() {
        let tree = app([
            UIElement::new(ElementKind::Switch).with_identifier("wifi").with_value("0"),
            UIElement::new(ElementKind::Switch).with_identifier("bluetooth").with_value("1"),
        ]);
        let resolution = resolve(&[Element::switch().with_identifier("bluetooth").with_value("1")], &tree);
        assert!(resolution.is_complete());
        let resolution = resolve(&[Element::switch().with_identifier("wifi").with_value("1")], &tree);
        assert!(!resolution.is_complete());
        let resolution = resolve(&[Element::switch().with_value("1")], &app([UIElement::new(ElementKind::Switch)]));
        assert!(!resolution.is_complete());
    }

    #[test]
    fn test_captures_from_accepted_match() {
        let price = TestData::new();
        let tree = app([text("Buy now for 7.77 EUR")]);
        let resolution = resolve(&[Element::static_text(format!("Buy now for {}", price))], &tree);
        assert_eq!(resolution.captures.len(), 1);
        assert_eq!(resolution.captures[0].variable, price.id());
        assert_eq!(resolution.captures[0].value, "7.77 EUR");
    }

    #[test]
    fn test_captures_of_rejected_candidate_are_discarded() {
        let name = TestData::new();
        let tree = app([UIElement::new(ElementKind::Cell).with_children([text("Hello Ada")])]);
        let cell = Element::cell().with_children([
            Element::static_text(format!("Hello {}", name)),
            Element::button().with_label("Delete"),
        ]);
        let resolution = resolve(std::slice::from_ref(&cell), &tree);
        assert!(resolution.captures.is_empty());
    }

    #[test]
    fn test_no_tree_reports_every_top_level_element() {
        let elements = [Element::static_text("A"), Element::cell().with_child(Element::button())];
        let resolution = Finder::compile("Test", &elements).unwrap().resolve(None);
        assert_eq!(resolution.missing.len(), 2);
        assert!(resolution.resolved.is_empty());
    }

    #[test]
    fn test_pattern_errors_surface_at_compile() {
        let value = TestData::new();
        let elements = [Element::static_text(format!("{} {}", value, value))];
        assert!(matches!(
            Finder::compile("Test", &elements),
            Err(PatternError::DuplicateVariable { .. })
        ));
    }
}
