//! Live UI element records returned by automation drivers.
//!
//! [`UIElement`] is one node of the accessibility tree as an
//! [`AutomationDriver`](crate::driver::AutomationDriver) reports it. The serde
//! attributes follow the `AXUniqueId` / `AXLabel` / `AXValue` / `type` dump
//! format, so a JSON dump of a running app deserializes directly into a tree.

use serde::{Deserialize, Serialize};

use crate::kind::ElementKind;

/// Represents a UI element from the accessibility hierarchy.
///
/// Missing identifiers and labels are reported as empty strings, the way the
/// platform does. Elements form a tree structure via the `children` field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UIElement {
    /// The type of UI element (e.g., Button, StaticText, Other). Required.
    #[serde(rename = "type")]
    pub element_type: ElementKind,

    /// The accessibility identifier for this element (AXUniqueId).
    #[serde(rename = "AXUniqueId", default, deserialize_with = "null_as_empty")]
    pub identifier: String,

    /// The accessibility label (AXLabel), typically the user-visible text.
    #[serde(rename = "AXLabel", default, deserialize_with = "null_as_empty")]
    pub label: String,

    /// The current value of the element (AXValue), e.g., text field contents.
    #[serde(rename = "AXValue", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,

    /// The element's frame (position and size) in screen coordinates.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<ElementFrame>,

    /// Whether the element can currently receive taps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hittable: Option<bool>,

    /// Child elements nested within this element.
    #[serde(default)]
    pub children: Vec<UIElement>,
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

impl UIElement {
    /// Creates a childless element of the given kind with empty attributes.
    pub fn new(element_type: ElementKind) -> Self {
        Self {
            element_type,
            identifier: String::new(),
            label: String::new(),
            value: None,
            frame: None,
            hittable: None,
            children: Vec::new(),
        }
    }

    /// Sets the accessibility identifier.
    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    /// Sets the accessibility label.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Sets the element value.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Sets the frame.
    pub fn with_frame(mut self, frame: ElementFrame) -> Self {
        self.frame = Some(frame);
        self
    }

    /// Sets whether the element is hittable.
    pub fn with_hittable(mut self, hittable: bool) -> Self {
        self.hittable = Some(hittable);
        self
    }

    /// Appends children.
    pub fn with_children(mut self, children: impl IntoIterator<Item = UIElement>) -> Self {
        self.children.extend(children);
        self
    }

    /// Number of nodes in this subtree, including this element.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(UIElement::node_count).sum::<usize>()
    }
}

/// The frame (position and dimensions) of a UI element.
///
/// Coordinates are in screen points, with the origin at the top-left
/// corner of the screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ElementFrame {
    /// The x-coordinate of the element's top-left corner.
    pub x: f64,
    /// The y-coordinate of the element's top-left corner.
    pub y: f64,
    /// The width of the element in points.
    pub width: f64,
    /// The height of the element in points.
    pub height: f64,
}

impl ElementFrame {
    /// The center point of the frame.
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_dump_format() {
        let json = r#"{
            "type": "Button",
            "AXUniqueId": "login-button",
            "AXLabel": "Log In",
            "frame": {"x": 10, "y": 20, "width": 100, "height": 44},
            "children": []
        }"#;
        let element: UIElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.element_type, ElementKind::Button);
        assert_eq!(element.identifier, "login-button");
        assert_eq!(element.label, "Log In");
        assert!(element.value.is_none());
        assert_eq!(element.frame.unwrap().center(), (60.0, 42.0));
    }

    #[test]
    fn test_deserialize_nulls_and_missing_fields() {
        let json = r#"{"type": "View", "AXUniqueId": null, "children": [{"type": "StaticText", "AXLabel": "Hi"}]}"#;
        let element: UIElement = serde_json::from_str(json).unwrap();
        assert_eq!(element.element_type, ElementKind::Other);
        assert_eq!(element.identifier, "");
        assert_eq!(element.label, "");
        assert_eq!(element.children.len(), 1);
        assert_eq!(element.children[0].label, "Hi");
    }

    #[test]
    fn test_node_without_type_is_rejected() {
        assert!(serde_json::from_str::<UIElement>("{}").is_err());
        assert!(serde_json::from_str::<UIElement>("[]").is_err());
        assert!(serde_json::from_str::<UIElement>(r#"{"type": "Other", "children": [{"AXLabel": "Hi"}]}"#).is_err());
    }

    #[test]
    fn test_node_count() {
        let tree = UIElement::new(ElementKind::Application).with_children([
            UIElement::new(ElementKind::Other)
                .with_children([UIElement::new(ElementKind::Button)]),
            UIElement::new(ElementKind::StaticText),
        ]);
        assert_eq!(tree.node_count(), 4);
    }
}
