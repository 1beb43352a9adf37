//! Pages declared in JSON files.
//!
//! ```json
//! {
//!   "name": "Login",
//!   "elements": [
//!     { "type": "StaticText", "label": "Welcome" },
//!     { "type": "Cell", "children": [{ "type": "Button", "label": "Sign In" }] }
//!   ]
//! }
//! ```
//!
//! Labels and values may embed capture placeholders (`{UUID}` in upper
//! case); their captured values are reported after a check.

use std::path::Path;

use pagewright_core::declaration::Element;
use pagewright_core::kind::ElementKind;
use pagewright_core::page::{Page, PageDescription};
use pagewright_core::pattern::LabelPattern;
use pagewright_core::test_data::TestData;
use serde::{de, Deserialize, Deserializer};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PageDeclaration {
    name: String,
    #[serde(default)]
    application: Option<String>,
    #[serde(default)]
    elements: Vec<ElementDeclaration>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ElementDeclaration {
    #[serde(rename = "type", deserialize_with = "known_kind")]
    kind: ElementKind,
    #[serde(default)]
    identifier: Option<String>,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    value: Option<String>,
    #[serde(default)]
    children: Vec<ElementDeclaration>,
}

/// Tree dumps fall back to `Other` for unknown kinds; declarations must not.
fn known_kind<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ElementKind, D::Error> {
    String::deserialize(deserializer)?.parse::<ElementKind>().map_err(de::Error::custom)
}

impl ElementDeclaration {
    fn into_element(self) -> Element {
        let mut element = Element::new(self.kind);
        if let Some(identifier) = self.identifier {
            element = element.with_identifier(identifier);
        }
        if let Some(label) = self.label {
            element = element.with_label(label);
        }
        if let Some(value) = self.value {
            element = element.with_value(value);
        }
        element.with_children(self.children.into_iter().map(ElementDeclaration::into_element))
    }
}

/// A page loaded from a JSON declaration.
///
/// The description is built once, so every check sees the same element ids.
#[derive(Debug)]
pub struct FilePage {
    name: String,
    application: Option<String>,
    description: PageDescription,
}

impl FilePage {
    pub fn from_json(json: &str) -> Result<Self, String> {
        let declaration: PageDeclaration = serde_json::from_str(json).map_err(|e| format!("invalid page declaration: {}", e))?;
        let page = Self {
            name: declaration.name,
            application: declaration.application,
            description: declaration.elements.into_iter().map(ElementDeclaration::into_element).collect(),
        };
        for element in page.description.flatten() {
            for pattern in [element.label(), element.value()].into_iter().flatten() {
                LabelPattern::parse(pattern).map_err(|e| e.to_string())?;
            }
        }
        Ok(page)
    }

    pub fn from_file(path: &Path) -> Result<Self, String> {
        let json = std::fs::read_to_string(path).map_err(|e| format!("failed to read {}: {}", path.display(), e))?;
        Self::from_json(&json)
    }

    pub fn description(&self) -> &PageDescription {
        &self.description
    }

    /// Capture variables named in the page's patterns, in declaration order.
    pub fn variables(&self) -> Vec<TestData> {
        let mut variables = Vec::new();
        for element in self.description.flatten() {
            for pattern in [element.label(), element.value()].into_iter().flatten() {
                let Ok(pattern) = LabelPattern::parse(pattern) else {
                    continue;
                };
                for id in pattern.variables() {
                    let variable = TestData::from(*id);
                    if !variables.contains(&variable) {
                        variables.push(variable);
                    }
                }
            }
        }
        variables
    }
}

impl Page for FilePage {
    fn name(&self) -> String {
        self.name.clone()
    }

    fn application(&self) -> Option<&str> {
        self.application.as_deref()
    }

    fn body(&self) -> PageDescription {
        self.description.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_json_builds_nested_description() {
        let page = FilePage::from_json(
            r#"{
                "name": "Login",
                "application": "com.example.demo",
                "elements": [
                    {"type": "StaticText", "label": "Welcome"},
                    {"type": "Cell", "children": [{"type": "Button", "identifier": "go"}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(page.name(), "Login");
        assert_eq!(page.application(), Some("com.example.demo"));
        assert_eq!(page.description().len(), 2);
        assert_eq!(page.description().flatten().len(), 3);
        assert_eq!(page.description().elements()[1].children()[0].identifier(), Some("go"));
    }

    #[test]
    fn test_body_keeps_identity() {
        let page = FilePage::from_json(r#"{"name": "P", "elements": [{"type": "Button"}]}"#).unwrap();
        assert_eq!(page.body().elements()[0].id(), page.body().elements()[0].id());
    }

    #[test]
    fn test_unknown_kind_and_fields_are_rejected() {
        assert!(FilePage::from_json(r#"{"name": "P", "elements": [{"type": "Banana"}]}"#).is_err());
        assert!(FilePage::from_json(r#"{"name": "P", "elements": [{"type": "Button", "lable": "x"}]}"#).is_err());
    }

    #[test]
    fn test_variables_from_placeholders() {
        let page = FilePage::from_json(
            r#"{"name": "P", "elements": [
                {"type": "StaticText", "label": "Total {6F9619FF-8B86-D011-B42D-00C04FC964FF}"}
            ]}"#,
        )
        .unwrap();
        let variables = page.variables();
        assert_eq!(variables.len(), 1);
        assert_eq!(variables[0].placeholder(), "{6F9619FF-8B86-D011-B42D-00C04FC964FF}");
    }

    #[test]
    fn test_duplicate_placeholder_is_rejected() {
        let result = FilePage::from_json(
            r#"{"name": "P", "elements": [
                {"type": "StaticText", "label": "{6F9619FF-8B86-D011-B42D-00C04FC964FF}/{6F9619FF-8B86-D011-B42D-00C04FC964FF}"}
            ]}"#,
        );
        assert!(result.is_err());
    }
}
