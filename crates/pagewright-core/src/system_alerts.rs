//! Pages for alerts presented by the system rather than the app.
//!
//! Both pages target springboard and describe an alert with an optional text
//! and two buttons. [`install_default_monitors`] registers monitors that
//! decline them, so a permission prompt that pops up mid-test does not block
//! the next interaction.

use std::sync::Arc;

use crate::declaration::Element;
use crate::monitor::MonitorId;
use crate::page::{Page, PageDescription};
use crate::session::TestSession;

/// Bundle identifier of the process that presents system alerts.
pub const SPRINGBOARD: &str = "com.apple.springboard";

fn alert_body(text: Option<&str>, disallow: &Element, allow: &Element) -> Element {
    Element::alert().with_children(
        PageDescription::new()
            .with_optional(text.map(|text| Element::static_text(text)))
            .with(disallow.clone())
            .with(allow.clone()),
    )
}

/// Any two-button system alert, such as the tracking transparency prompt.
#[derive(Debug, Clone)]
pub struct DefaultAlert {
    /// Declines and dismisses the alert.
    pub disallow_button: Element,
    /// Accepts and dismisses the alert.
    pub allow_button: Element,
    alert: Element,
}

impl DefaultAlert {
    /// Matches any alert.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Matches only alerts showing `text`.
    pub fn with_text(text: &str) -> Self {
        Self::build(Some(text))
    }

    fn build(text: Option<&str>) -> Self {
        let disallow_button = Element::button();
        let allow_button = Element::button();
        let alert = alert_body(text, &disallow_button, &allow_button);
        Self {
            disallow_button,
            allow_button,
            alert,
        }
    }
}

impl Default for DefaultAlert {
    fn default() -> Self {
        Self::new()
    }
}

impl Page for DefaultAlert {
    fn application(&self) -> Option<&str> {
        Some(SPRINGBOARD)
    }

    fn body(&self) -> PageDescription {
        PageDescription::new().with(self.alert.clone())
    }
}

/// The permission dialogue, recognized by its decline button's label.
#[derive(Debug, Clone)]
pub struct DefaultPermissionAlert {
    pub disallow_button: Element,
    pub allow_button: Element,
    alert: Element,
}

impl DefaultPermissionAlert {
    /// Matches any permission dialogue whose decline button reads `deny_label`.
    pub fn new(deny_label: &str) -> Self {
        Self::build(deny_label, None)
    }

    /// Matches only the dialogue showing `text`.
    pub fn with_text(deny_label: &str, text: &str) -> Self {
        Self::build(deny_label, Some(text))
    }

    fn build(deny_label: &str, text: Option<&str>) -> Self {
        let disallow_button = Element::button().with_label(deny_label);
        let allow_button = Element::button();
        let alert = alert_body(text, &disallow_button, &allow_button);
        Self {
            disallow_button,
            allow_button,
            alert,
        }
    }
}

impl Page for DefaultPermissionAlert {
    fn application(&self) -> Option<&str> {
        Some(SPRINGBOARD)
    }

    fn body(&self) -> PageDescription {
        PageDescription::new().with(self.alert.clone())
    }
}

/// Registers monitors that decline both system alerts.
///
/// The generic alert is added first so the more specific permission
/// dialogue is evaluated before it.
pub fn install_default_monitors(session: &TestSession, deny_label: &str) -> Vec<MonitorId> {
    vec![
        session.add_interruption_monitor(Arc::new(DefaultAlert::new()), |session, alert| async move {
            session.tap(&alert.disallow_button).await
        }),
        session.add_interruption_monitor(Arc::new(DefaultPermissionAlert::new(deny_label)), |session, alert| async move {
            session.tap(&alert.disallow_button).await
        }),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ElementKind;

    #[test]
    fn test_default_alert_body() {
        let alert = DefaultAlert::new();
        assert_eq!(alert.name(), "DefaultAlert");
        assert_eq!(alert.application(), Some(SPRINGBOARD));
        let body = alert.body();
        let root = &body.elements()[0];
        assert_eq!(root.kind(), ElementKind::Alert);
        assert_eq!(root.children().len(), 2);
        assert_eq!(root.children()[0].id(), alert.disallow_button.id());
    }

    #[test]
    fn test_body_identity_is_stable() {
        let alert = DefaultAlert::with_text("Allow tracking?");
        let ids = |page: &DefaultAlert| page.body().flatten().iter().map(|e| e.id()).collect::<Vec<_>>();
        assert_eq!(ids(&alert), ids(&alert));
        assert_eq!(alert.body().flatten().len(), 4);
    }

    #[test]
    fn test_permission_alert_uses_deny_label() {
        let alert = DefaultPermissionAlert::with_text("Don’t Allow", "\"Demo\" Would Like to Send You Notifications");
        assert_eq!(alert.disallow_button.label(), Some("Don’t Allow"));
        let body = alert.body();
        assert_eq!(body.elements()[0].children()[0].kind(), ElementKind::StaticText);
    }
}
