//! # pagewright-core
//!
//! Declarative page objects for iOS UI testing.
//!
//! A test describes what a screen should contain as a tree of typed
//! [`Element`](declaration::Element)s. The library matches that description
//! against the application's live accessibility tree, remembers where every
//! declared element was found, and drives taps, typing and scrolling on those
//! elements. System alerts and other interruptions are cleared by monitors
//! before each interaction.
//!
//! ## Modules
//!
//! - [`kind`] - The accessibility element kinds
//! - [`element`] - Live tree nodes as reported by a driver
//! - [`snapshot`] - Indexed pre-order snapshots of a live tree
//! - [`pattern`] - Label and value patterns with capture variables
//! - [`test_data`] - Capture variables and their captured values
//! - [`declaration`] - Declared elements and their query identifiers
//! - [`page`] - The [`Page`](page::Page) trait and page descriptions
//! - [`finder`] - Resolution of a page against a live tree
//! - [`cache`] - Last-known locations of declared elements
//! - [`monitor`] - Interruption monitor registry
//! - [`system_alerts`] - Pages and default monitors for system alerts
//! - [`driver`] - The [`AutomationDriver`](driver::AutomationDriver) seam
//! - [`tree_driver`] - In-memory driver serving fixed trees
//! - [`session`] - Checks, waits and interactions
//! - [`action`] - Action types and logging
//! - [`wait`] - Clock used by polling waits
//! - [`codegen`] - Page descriptions and page source from live trees
//! - [`config`] - Persistent configuration
//!
//! ## Example
//!
//! ```
//! use pagewright_core::declaration::Element;
//! use pagewright_core::element::UIElement;
//! use pagewright_core::finder::Finder;
//! use pagewright_core::kind::ElementKind;
//!
//! let tree = UIElement::new(ElementKind::Application).with_children([
//!     UIElement::new(ElementKind::StaticText).with_label("Welcome"),
//!     UIElement::new(ElementKind::Button).with_label("Continue"),
//! ]);
//!
//! let declared = [Element::static_text("Welcome"), Element::button().with_label("Continue")];
//! let resolution = Finder::compile("Onboarding", &declared).unwrap().resolve(Some(&tree));
//! assert!(resolution.missing.is_empty());
//! ```

pub mod action;
pub mod cache;
pub mod codegen;
pub mod config;
pub mod declaration;
pub mod driver;
pub mod element;
pub mod finder;
pub mod kind;
pub mod monitor;
pub mod page;
pub mod pattern;
pub mod session;
pub mod snapshot;
pub mod system_alerts;
pub mod test_data;
pub mod tree_driver;
pub mod wait;
