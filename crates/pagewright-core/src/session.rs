//! Test sessions: existence checks, waits and interactions.
//!
//! A [`TestSession`] owns everything a test needs to work with pages: the
//! automation driver, the element cache, captured test data, interruption
//! monitors, the clock used by polling waits and a log of performed actions.
//! Sessions are independent of each other, so tests running in parallel do not
//! share caches or monitors.
//!
//! # Architecture
//!
//! - [`check`](TestSession::check) runs one resolution pass: it registers the
//!   page's elements as pending, fetches a tree, resolves it and stores the
//!   locations and captures.
//! - [`wait_for_existence`](TestSession::wait_for_existence) repeats checks on
//!   the configured interval until the page exists or the timeout elapses.
//! - Interactions ([`tap`](TestSession::tap), [`type_text`](TestSession::type_text),
//!   ...) first give interruption monitors a chance to clear the screen, then
//!   re-resolve the element's page and send the gesture to the driver.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use pagewright_core::declaration::Element;
//! use pagewright_core::element::UIElement;
//! use pagewright_core::kind::ElementKind;
//! use pagewright_core::page::{Page, PageDescription};
//! use pagewright_core::session::TestSession;
//! use pagewright_core::tree_driver::TreeDriver;
//!
//! struct Home {
//!     settings: Element,
//! }
//!
//! impl Page for Home {
//!     fn body(&self) -> PageDescription {
//!         PageDescription::new()
//!             .with(Element::static_text("Home"))
//!             .with(self.settings.clone())
//!     }
//! }
//!
//! # tokio_test_main();
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn tokio_test_main() {
//! let tree = UIElement::new(ElementKind::Application).with_children([
//!     UIElement::new(ElementKind::StaticText).with_label("Home"),
//!     UIElement::new(ElementKind::Button).with_label("Settings"),
//! ]);
//! let driver = Arc::new(TreeDriver::with_tree(tree));
//! let session = TestSession::new(driver.clone());
//!
//! let home = Arc::new(Home { settings: Element::button().with_label("Settings") });
//! session.wait_for_existence(&home, None).await.unwrap();
//! session.tap(&home.settings).await.unwrap();
//! assert_eq!(driver.taps().len(), 1);
//! # }
//! ```

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::action::{ActionLog, ActionResult, ActionType};
use crate::cache::ElementCache;
use crate::codegen::{describe_tree, render_page_source};
use crate::config::PagewrightConfig;
use crate::declaration::{Element, ElementId};
use crate::driver::{AutomationDriver, DriverError, ElementQuery};
use crate::finder::{ElementLocation, Finder};
use crate::monitor::{HandlerFuture, MonitorHandler, MonitorId, MonitorRegistry};
use crate::page::{Page, PageExistsResults};
use crate::pattern::PatternError;
use crate::system_alerts::install_default_monitors;
use crate::test_data::{TestData, TestDataStore};
use crate::wait::{Clock, TokioClock};

/// Maximum number of action log entries to retain in the ring buffer.
const MAX_ACTION_LOG_SIZE: usize = 1000;

/// Errors returned by session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    /// A label or value pattern of the page failed to compile.
    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] PatternError),

    /// The page did not exist before the timeout.
    #[error("{}", page_missing_message(.page, .timeout, .missing))]
    PageMissing {
        page: String,
        timeout: Duration,
        missing: Vec<Element>,
    },

    /// The element was used before any check of its page.
    #[error("{element} was used before its page was checked")]
    NotChecked { element: String },

    /// The element is not part of the latest resolution of its page.
    #[error("{element} could not be resolved on page {page}")]
    Unresolved { element: String, page: String },

    /// The element was synthesized from a live tree.
    #[error("{element} was generated from a live tree and cannot be interacted with")]
    DynamicElement { element: String },

    /// The element did not become hittable before the timeout.
    #[error("{element} did not become hittable after {:.1}s", .timeout.as_secs_f64())]
    NotHittable { element: String, timeout: Duration },

    /// The automation driver failed.
    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),
}

fn page_missing_message(page: &str, timeout: &Duration, missing: &[Element]) -> String {
    let mut message = format!("Page {} didn't exist after {:.1}s", page, timeout.as_secs_f64());
    for element in missing {
        let _ = write!(message, "\n⛔️ missing element {}", element);
        if let Some(site) = element.declared_at() {
            let _ = write!(message, ", defined at {} {}:{}", site.file(), site.line(), site.column());
        }
    }
    message
}

/// The context of one test.
pub struct TestSession {
    /// The unique identifier for this session.
    pub id: Uuid,

    /// When this session was created.
    pub created_at: DateTime<Utc>,

    driver: Arc<dyn AutomationDriver>,
    clock: Arc<dyn Clock>,
    config: PagewrightConfig,
    cache: ElementCache,
    test_data: TestDataStore,
    monitors: MonitorRegistry,
    action_log: RwLock<VecDeque<ActionLog>>,
}

impl TestSession {
    /// Creates a session with the default configuration and the tokio clock.
    pub fn new(driver: Arc<dyn AutomationDriver>) -> Arc<Self> {
        Self::with_config(driver, PagewrightConfig::default())
    }

    pub fn with_config(driver: Arc<dyn AutomationDriver>, config: PagewrightConfig) -> Arc<Self> {
        Self::with_clock(driver, config, Arc::new(TokioClock))
    }

    /// Creates a session with an explicit clock for polling waits.
    ///
    /// Default monitors are installed here when the configuration enables them.
    pub fn with_clock(driver: Arc<dyn AutomationDriver>, config: PagewrightConfig, clock: Arc<dyn Clock>) -> Arc<Self> {
        let session = Arc::new(Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            driver,
            clock,
            config,
            cache: ElementCache::new(),
            test_data: TestDataStore::new(),
            monitors: MonitorRegistry::new(),
            action_log: RwLock::new(VecDeque::with_capacity(MAX_ACTION_LOG_SIZE)),
        });
        if session.config.default_monitors {
            let deny_label = session.config.permission_deny_label.clone();
            install_default_monitors(&session, &deny_label);
        }
        session
    }

    pub fn config(&self) -> &PagewrightConfig {
        &self.config
    }

    pub fn cache(&self) -> &ElementCache {
        &self.cache
    }

    pub fn test_data(&self) -> &TestDataStore {
        &self.test_data
    }

    pub fn monitors(&self) -> &MonitorRegistry {
        &self.monitors
    }

    /// The captured value of a test data variable, or the no-value sentinel.
    pub fn read(&self, variable: &TestData) -> String {
        self.test_data.read(variable)
    }

    // ---------------------------------------------------------------
    // Existence
    // ---------------------------------------------------------------

    /// Runs one resolution pass for `page`.
    pub async fn check<P: Page>(&self, page: &Arc<P>) -> Result<PageExistsResults, SessionError> {
        let page: Arc<dyn Page> = page.clone();
        self.check_page(&page).await
    }

    /// [`check`](Self::check) for a type-erased page.
    pub async fn check_page(&self, page: &Arc<dyn Page>) -> Result<PageExistsResults, SessionError> {
        self.resolve_page(page).await.map(|(results, _)| results)
    }

    /// Whether `page` currently exists. A single pass, no waiting.
    pub async fn exists<P: Page>(&self, page: &Arc<P>) -> Result<bool, SessionError> {
        Ok(self.check(page).await?.is_existing())
    }

    async fn resolve_page(
        &self,
        page: &Arc<dyn Page>,
    ) -> Result<(PageExistsResults, Vec<(ElementId, ElementLocation)>), SessionError> {
        let name = page.name();
        let description = page.body();
        let finder = Finder::compile(name.as_str(), description.elements())?;

        self.cache
            .register_pending(page, description.flatten().into_iter().map(Element::id));

        let tree = match self.driver.snapshot(page.application()).await {
            Ok(tree) => Some(tree),
            Err(e) => {
                debug!(page = %name, error = %e, "no tree available");
                None
            }
        };

        let resolution = finder.resolve(tree.as_ref());
        for (id, location) in &resolution.resolved {
            self.cache.set(*id, page, location.clone());
        }
        self.test_data.record(resolution.captures);

        let results = PageExistsResults {
            missing_elements: resolution.missing,
            actual_page: tree.as_ref().map(describe_tree),
        };
        Ok((results, resolution.resolved))
    }

    /// Polls until `page` exists.
    ///
    /// Interruption monitors run before every pass. Fails with
    /// [`SessionError::PageMissing`] listing the elements still missing when
    /// the timeout (default from the configuration) elapses.
    pub async fn wait_for_existence<P: Page>(
        self: &Arc<Self>,
        page: &Arc<P>,
        timeout: Option<Duration>,
    ) -> Result<PageExistsResults, SessionError> {
        let page: Arc<dyn Page> = page.clone();
        let timeout = timeout.unwrap_or_else(|| self.config.wait_timeout());
        let action = ActionType::WaitForExistence {
            page: page.name(),
            timeout_ms: timeout.as_millis() as u64,
        };
        let span = info_span!("wait_for_existence", page = %page.name());

        async {
            let start = self.clock.now();
            let deadline = start + timeout;
            let result = loop {
                self.check_for_interruptions().await;
                let results = match self.check_page(&page).await {
                    Ok(results) => results,
                    Err(e) => break Err(e),
                };
                if results.is_existing() {
                    break Ok(results);
                }
                if self.clock.now() >= deadline {
                    if let Some(actual) = &results.actual_page {
                        debug!(
                            actual = %render_page_source(actual, "ActualPage", page.application()),
                            "page missing"
                        );
                    }
                    break Err(SessionError::PageMissing {
                        page: page.name(),
                        timeout,
                        missing: results.missing_elements,
                    });
                }
                self.clock.sleep(self.config.poll_interval()).await;
            };
            let elapsed = self.clock.now() - start;
            self.record(action, elapsed, &result).await;
            result
        }
        .instrument(span)
        .await
    }

    // ---------------------------------------------------------------
    // Interactions
    // ---------------------------------------------------------------

    /// Taps an element once its position is stable.
    pub async fn tap(self: &Arc<Self>, element: &Element) -> Result<(), SessionError> {
        let action = ActionType::Tap {
            element: element.to_string(),
        };
        self.interact(action, element, |query| async move {
            self.wait_until_stable(&query).await;
            self.driver.tap(&query).await?;
            Ok(())
        })
        .await
    }

    /// Taps the first live element sharing the element's path, ignoring its
    /// occurrence index.
    pub async fn tap_any(self: &Arc<Self>, element: &Element) -> Result<(), SessionError> {
        let action = ActionType::TapAny {
            element: element.to_string(),
        };
        self.interact(action, element, |mut query| async move {
            query.index = 0;
            self.driver.tap(&query).await?;
            Ok(())
        })
        .await
    }

    /// Taps an element to focus it, then types text into it.
    pub async fn type_text(self: &Arc<Self>, element: &Element, text: &str) -> Result<(), SessionError> {
        let action = ActionType::TypeText {
            element: element.to_string(),
            text: text.to_string(),
        };
        self.interact(action, element, |query| async move {
            self.wait_until_stable(&query).await;
            self.driver.tap(&query).await?;
            self.driver.type_text(&query, text).await?;
            Ok(())
        })
        .await
    }

    /// Scrolls an element by a vector in points.
    pub async fn scroll(self: &Arc<Self>, element: &Element, dx: f64, dy: f64) -> Result<(), SessionError> {
        let action = ActionType::Scroll {
            element: element.to_string(),
            dx,
            dy,
        };
        self.interact(action, element, |query| async move {
            self.driver.scroll(&query, dx, dy).await?;
            Ok(())
        })
        .await
    }

    /// Whether an element can currently receive taps.
    pub async fn is_hittable(self: &Arc<Self>, element: &Element) -> Result<bool, SessionError> {
        self.check_for_interruptions().await;
        let query = self.locate(element).await?;
        Ok(self.driver.is_hittable(&query).await?)
    }

    /// Polls until an element is resolved and hittable.
    pub async fn wait_until_hittable(
        self: &Arc<Self>,
        element: &Element,
        timeout: Option<Duration>,
    ) -> Result<(), SessionError> {
        let timeout = timeout.unwrap_or_else(|| self.config.wait_timeout());
        let action = ActionType::WaitUntilHittable {
            element: element.to_string(),
            timeout_ms: timeout.as_millis() as u64,
        };
        let span = info_span!("wait_until_hittable", element = %element);

        async {
            let start = self.clock.now();
            let deadline = start + timeout;
            let result = loop {
                self.check_for_interruptions().await;
                match self.locate(element).await {
                    Ok(query) => match self.driver.is_hittable(&query).await {
                        Ok(true) => break Ok(()),
                        Ok(false) => {}
                        Err(e) => break Err(SessionError::from(e)),
                    },
                    Err(SessionError::Unresolved { .. }) => {}
                    Err(e) => break Err(e),
                }
                if self.clock.now() >= deadline {
                    break Err(SessionError::NotHittable {
                        element: element.to_string(),
                        timeout,
                    });
                }
                self.clock.sleep(self.config.poll_interval()).await;
            };
            let elapsed = self.clock.now() - start;
            self.record(action, elapsed, &result).await;
            result
        }
        .instrument(span)
        .await
    }

    async fn interact<F, Fut>(self: &Arc<Self>, action: ActionType, element: &Element, perform: F) -> Result<(), SessionError>
    where
        F: FnOnce(ElementQuery) -> Fut,
        Fut: Future<Output = Result<(), SessionError>>,
    {
        let span = info_span!("interaction", action = action.name(), element = %element);
        async {
            let start = self.clock.now();
            self.check_for_interruptions().await;
            let result = match self.locate(element).await {
                Ok(query) => perform(query).await,
                Err(e) => Err(e),
            };
            let elapsed = self.clock.now() - start;
            self.record(action, elapsed, &result).await;
            result
        }
        .instrument(span)
        .await
    }

    /// Re-resolves the element's page and returns the element's query.
    async fn locate(&self, element: &Element) -> Result<ElementQuery, SessionError> {
        if element.is_dynamic() {
            error!(element = %element, "interaction with a generated element");
            return Err(SessionError::DynamicElement {
                element: element.to_string(),
            });
        }
        let Some(entry) = self.cache.get(element.id()) else {
            error!(element = %element, "interaction before the page was checked");
            return Err(SessionError::NotChecked {
                element: element.to_string(),
            });
        };

        let (_, resolved) = self.resolve_page(&entry.page).await?;
        match resolved.into_iter().find(|(id, _)| *id == element.id()) {
            Some((_, location)) => Ok(ElementQuery {
                application: entry.page.application().map(str::to_string),
                path: location.path,
                index: location.index,
            }),
            None => {
                error!(element = %element, page = %entry.page.name(), "element is not resolved");
                Err(SessionError::Unresolved {
                    element: element.to_string(),
                    page: entry.page.name(),
                })
            }
        }
    }

    /// Waits until two consecutive frame samples agree.
    ///
    /// Returns early when the driver reports no frame and gives up silently
    /// after the configured stable timeout.
    async fn wait_until_stable(&self, query: &ElementQuery) {
        let deadline = self.clock.now() + self.config.stable_timeout();
        let Ok(Some(mut last)) = self.driver.frame(query).await else {
            return;
        };
        while self.clock.now() < deadline {
            self.clock.sleep(self.config.stable_poll_interval()).await;
            match self.driver.frame(query).await {
                Ok(Some(frame)) if frame == last => return,
                Ok(Some(frame)) => last = frame,
                _ => return,
            }
        }
        debug!(query = %query, "position did not settle");
    }

    // ---------------------------------------------------------------
    // Interruption monitors
    // ---------------------------------------------------------------

    /// Registers a monitor for `page`.
    ///
    /// Monitors are evaluated most recently added first. The handler receives
    /// the session and the page.
    pub fn add_interruption_monitor<P, F, Fut>(&self, page: Arc<P>, handler: F) -> MonitorId
    where
        P: Page,
        F: Fn(Arc<TestSession>, Arc<P>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), SessionError>> + Send + 'static,
    {
        let typed = Arc::clone(&page);
        let handler: MonitorHandler = Arc::new(move |session| -> HandlerFuture {
            Box::pin(handler(session, Arc::clone(&typed)))
        });
        self.monitors.add(page, handler)
    }

    /// Unregisters a monitor. Returns `false` if it was not registered.
    pub fn remove_interruption_monitor(&self, id: MonitorId) -> bool {
        self.monitors.remove(id)
    }

    /// Runs the handler of the first monitor whose page exists.
    ///
    /// Returns the id of that monitor. Checks started from inside a handler
    /// return `None` immediately. Handler failures are logged.
    pub async fn check_for_interruptions(self: &Arc<Self>) -> Option<MonitorId> {
        let _guard = self.monitors.begin_check()?;

        for monitor in self.monitors.evaluation_order() {
            let page_name = monitor.page.name();
            match self.check_page(&monitor.page).await {
                Ok(results) if results.is_existing() => {}
                Ok(_) => continue,
                Err(e) => {
                    warn!(monitor = %monitor.id, page = %page_name, error = %e, "monitor page check failed");
                    continue;
                }
            }

            info!(monitor = %monitor.id, page = %page_name, "interruption detected, running handler");
            let start = self.clock.now();
            let result = (monitor.handler)(Arc::clone(self)).await;
            if let Err(e) = &result {
                warn!(monitor = %monitor.id, page = %page_name, error = %e, "interruption handler failed");
            }
            let elapsed = self.clock.now() - start;
            self.record(ActionType::HandleInterruption { page: page_name }, elapsed, &result)
                .await;
            return Some(monitor.id);
        }
        None
    }

    // ---------------------------------------------------------------
    // Action log
    // ---------------------------------------------------------------

    async fn record<T>(&self, action: ActionType, elapsed: Duration, result: &Result<T, SessionError>) {
        let elapsed_ms = elapsed.as_millis() as u64;
        let outcome = match result {
            Ok(_) => {
                debug!(action = action.name(), elapsed_ms, "action succeeded");
                ActionResult::Success
            }
            Err(e) => {
                debug!(action = action.name(), elapsed_ms, error = %e, "action failed");
                ActionResult::Failure(e.to_string())
            }
        };
        self.log_action(action, outcome, Some(elapsed_ms)).await;
    }

    /// Appends an entry to the action log.
    ///
    /// The log is a ring buffer: once it holds 1000 entries the oldest is dropped.
    pub async fn log_action(&self, action: ActionType, result: ActionResult, duration_ms: Option<u64>) -> ActionLog {
        let entry = ActionLog::new(action, result, duration_ms);
        let mut log = self.action_log.write().await;
        if log.len() >= MAX_ACTION_LOG_SIZE {
            log.pop_front();
        }
        log.push_back(entry.clone());
        entry
    }

    /// Returns a copy of the action log, oldest first.
    pub async fn get_action_log(&self) -> Vec<ActionLog> {
        self.action_log.read().await.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ElementKind;
    use crate::page::PageDescription;
    use crate::tree_driver::TreeDriver;
    use crate::element::UIElement;

    fn quiet_config() -> PagewrightConfig {
        PagewrightConfig {
            default_monitors: false,
            ..PagewrightConfig::default()
        }
    }

    struct Greeting {
        hello: Element,
    }

    impl Page for Greeting {
        fn body(&self) -> PageDescription {
            PageDescription::new().with(self.hello.clone())
        }
    }

    #[test]
    fn test_page_missing_message() {
        let line = line!() + 1;
        let button = Element::button();
        let message = page_missing_message("LoginPage", &Duration::from_secs(1), &[button]);
        let mut lines = message.lines();
        assert_eq!(lines.next(), Some("Page LoginPage didn't exist after 1.0s"));
        let missing = lines.next().unwrap();
        assert!(missing.starts_with("⛔️ missing element Button, defined at "));
        assert!(missing.contains("session.rs"));
        assert!(missing.contains(&format!(" {}:", line)));
    }

    #[test]
    fn test_default_monitors_follow_config() {
        let driver = Arc::new(TreeDriver::new());
        let session = TestSession::new(driver.clone());
        assert_eq!(session.monitors().page_names(), vec!["DefaultPermissionAlert", "DefaultAlert"]);
        let quiet = TestSession::with_config(driver, quiet_config());
        assert!(quiet.monitors().is_empty());
    }

    #[tokio::test]
    async fn test_check_populates_cache() {
        let tree = UIElement::new(ElementKind::Application)
            .with_children([UIElement::new(ElementKind::StaticText).with_label("Hello")]);
        let session = TestSession::with_config(Arc::new(TreeDriver::with_tree(tree)), quiet_config());
        let page = Arc::new(Greeting {
            hello: Element::static_text("Hello"),
        });

        let results = session.check(&page).await.unwrap();
        assert!(results.is_existing());
        assert_eq!(results.actual_page.unwrap().len(), 1);
        let entry = session.cache().get(page.hello.id()).unwrap();
        assert!(!entry.is_pending());
        assert_eq!(entry.page.name(), "Greeting");
    }

    #[tokio::test]
    async fn test_action_log_is_bounded() {
        let session = TestSession::with_config(Arc::new(TreeDriver::new()), quiet_config());
        for i in 0..(MAX_ACTION_LOG_SIZE + 5) {
            session
                .log_action(
                    ActionType::Tap { element: format!("Button {}", i) },
                    ActionResult::Success,
                    None,
                )
                .await;
        }
        let log = session.get_action_log().await;
        assert_eq!(log.len(), MAX_ACTION_LOG_SIZE);
        assert_eq!(log[0].action, ActionType::Tap { element: "Button 5".to_string() });
    }
}
