//! Page descriptions and page source generated from live trees.
//!
//! [`describe_tree`] turns a live tree into a [`PageDescription`] of dynamic
//! elements: the kinds a page usually declares are kept, everything else is
//! replaced by its extracted descendants. [`render_page_source`] prints a
//! description as Rust source that declares an equivalent page.

use std::fmt::Write as _;

use crate::declaration::Element;
use crate::element::UIElement;
use crate::kind::ElementKind;
use crate::page::PageDescription;

const FALLBACK_PAGE_NAME: &str = "GeneratedPage";

/// The page currently shown by a live tree.
pub fn describe_tree(tree: &UIElement) -> PageDescription {
    flatten(tree).into_iter().collect()
}

fn flatten(node: &UIElement) -> Vec<Element> {
    match extract(node) {
        Some(element) => vec![element],
        None => nested(node),
    }
}

fn nested(node: &UIElement) -> Vec<Element> {
    node.children.iter().flat_map(flatten).collect()
}

fn extract(node: &UIElement) -> Option<Element> {
    let base = Element::dynamic(node.element_type);
    let element = match node.element_type {
        ElementKind::StaticText => with_identifier(base, node).with_label(node.label.as_str()),
        ElementKind::Button => with_label(with_identifier(base, node), node),
        ElementKind::NavigationBar | ElementKind::Cell => with_identifier(base, node).with_children(nested(node)),
        ElementKind::TabBar | ElementKind::CollectionView => base.with_children(nested(node)),
        ElementKind::TextField | ElementKind::SecureTextField => match node.value.as_deref() {
            Some(value) if !value.is_empty() => with_identifier(base, node).with_value(value),
            _ => with_identifier(base, node),
        },
        _ => return None,
    };
    Some(element)
}

fn with_identifier(element: Element, node: &UIElement) -> Element {
    if node.identifier.is_empty() {
        element
    } else {
        element.with_identifier(node.identifier.as_str())
    }
}

fn with_label(element: Element, node: &UIElement) -> Element {
    if node.label.is_empty() {
        element
    } else {
        element.with_label(node.label.as_str())
    }
}

/// A type name for the page shown by `tree`.
///
/// Uses the identifier of the first navigation bar, then of the first generic
/// container, reduced to alphanumerics.
pub fn suggest_page_name(tree: &UIElement) -> String {
    [ElementKind::NavigationBar, ElementKind::Other]
        .into_iter()
        .filter_map(|kind| find_first(tree, kind))
        .map(|node| sanitize(&node.identifier))
        .find(|name| !name.is_empty())
        .unwrap_or_else(|| FALLBACK_PAGE_NAME.to_string())
}

fn find_first(node: &UIElement, kind: ElementKind) -> Option<&UIElement> {
    if node.element_type == kind {
        return Some(node);
    }
    node.children.iter().find_map(|child| find_first(child, kind))
}

fn sanitize(identifier: &str) -> String {
    let name: String = identifier.chars().filter(|c| c.is_alphanumeric()).collect();
    match name.chars().next() {
        Some(first) if first.is_numeric() => format!("Page{}", name),
        _ => name,
    }
}

/// Renders a page declaration for `description`.
pub fn render_page_source(description: &PageDescription, name: &str, application: Option<&str>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "struct {};", name);
    out.push('\n');
    let _ = writeln!(out, "impl Page for {} {{", name);
    if let Some(application) = application {
        let _ = writeln!(out, "    fn application(&self) -> Option<&str> {{");
        let _ = writeln!(out, "        Some({:?})", application);
        let _ = writeln!(out, "    }}");
        out.push('\n');
    }
    let _ = writeln!(out, "    fn body(&self) -> PageDescription {{");
    let _ = writeln!(out, "        PageDescription::new()");
    for element in description.elements() {
        let _ = writeln!(out, "            .with({})", render_element(element, 3));
    }
    let _ = writeln!(out, "    }}");
    out.push('}');
    out
}

/// Renders one element as a builder expression.
///
/// `depth` is the indentation level (four spaces each) of the line the
/// expression starts on.
pub fn render_element(element: &Element, depth: usize) -> String {
    let mut out = constructor(element);
    if let Some(identifier) = element.identifier() {
        let _ = write!(out, ".with_identifier({:?})", identifier);
    }
    if element.kind() != ElementKind::StaticText {
        if let Some(label) = element.label() {
            let _ = write!(out, ".with_label({:?})", label);
        }
    }
    if let Some(value) = element.value() {
        let _ = write!(out, ".with_value({:?})", value);
    }
    if !element.children().is_empty() {
        let indent = "    ".repeat(depth + 1);
        out.push_str(".with_children([\n");
        for child in element.children() {
            let _ = writeln!(out, "{}{},", indent, render_element(child, depth + 1));
        }
        let _ = write!(out, "{}])", "    ".repeat(depth));
    }
    out
}

fn constructor(element: &Element) -> String {
    match element.kind() {
        ElementKind::StaticText => format!("Element::static_text({:?})", element.label().unwrap_or_default()),
        ElementKind::Button => "Element::button()".to_string(),
        ElementKind::Alert => "Element::alert()".to_string(),
        ElementKind::NavigationBar => "Element::navigation_bar()".to_string(),
        ElementKind::TabBar => "Element::tab_bar()".to_string(),
        ElementKind::CollectionView => "Element::collection_view()".to_string(),
        ElementKind::Cell => "Element::cell()".to_string(),
        ElementKind::TextField => "Element::text_field()".to_string(),
        ElementKind::SecureTextField => "Element::secure_text_field()".to_string(),
        ElementKind::Switch => "Element::switch()".to_string(),
        ElementKind::Other => "Element::other()".to_string(),
        kind => format!("Element::new(ElementKind::{})", kind),
    }
}
