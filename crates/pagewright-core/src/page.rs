//! Pages: named roots of declared element trees.
//!
//! ```
//! use pagewright_core::declaration::Element;
//! use pagewright_core::page::{Page, PageDescription};
//!
//! struct LoginPage {
//!     log_in: Element,
//!     show_help: bool,
//! }
//!
//! impl Page for LoginPage {
//!     fn body(&self) -> PageDescription {
//!         PageDescription::new()
//!             .with(Element::static_text("Welcome back"))
//!             .with(self.log_in.clone())
//!             .with_if(self.show_help, Element::button().with_label("Help"))
//!     }
//! }
//!
//! let page = LoginPage { log_in: Element::button().with_label("Log In"), show_help: false };
//! assert_eq!(page.name(), "LoginPage");
//! assert_eq!(page.body().len(), 2);
//! ```

use crate::declaration::Element;

/// A screen of the application under test.
pub trait Page: Send + Sync + 'static {
    /// Name used in logs and failure messages. Defaults to the type name.
    fn name(&self) -> String {
        short_type_name(std::any::type_name::<Self>()).to_string()
    }

    /// Bundle identifier of the application this page belongs to.
    ///
    /// `None` targets the application under test.
    fn application(&self) -> Option<&str> {
        None
    }

    /// The expected top-level elements, in document order.
    fn body(&self) -> PageDescription;
}

fn short_type_name(full: &str) -> &str {
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}

/// An ordered list of top-level declared elements.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageDescription {
    elements: Vec<Element>,
}

impl PageDescription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }

    /// Adds the element only when `condition` holds.
    pub fn with_if(self, condition: bool, element: Element) -> Self {
        if condition {
            self.with(element)
        } else {
            self
        }
    }

    pub fn with_optional(self, element: Option<Element>) -> Self {
        match element {
            Some(element) => self.with(element),
            None => self,
        }
    }

    pub fn extend(mut self, elements: impl IntoIterator<Item = Element>) -> Self {
        self.elements.extend(elements);
        self
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Every declared element including nested ones, in pre-order.
    pub fn flatten(&self) -> Vec<&Element> {
        self.elements.iter().flat_map(Element::flatten).collect()
    }
}

impl FromIterator<Element> for PageDescription {
    fn from_iter<I: IntoIterator<Item = Element>>(iter: I) -> Self {
        Self { elements: iter.into_iter().collect() }
    }
}

impl IntoIterator for PageDescription {
    type Item = Element;
    type IntoIter = std::vec::IntoIter<Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

/// Outcome of an existence check.
#[derive(Debug, Clone, Default)]
pub struct PageExistsResults {
    /// Top-level declared elements that could not be resolved, in declaration order.
    pub missing_elements: Vec<Element>,
    /// What the screen actually showed, `None` when no tree was available.
    pub actual_page: Option<PageDescription>,
}

impl PageExistsResults {
    pub fn is_existing(&self) -> bool {
        self.missing_elements.is_empty()
    }
}
