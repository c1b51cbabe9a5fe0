//! Element interaction layer: "find element, with timeout, then act", with
//! uniform non-fatal failure handling. A missing element is logged and
//! reported through a sentinel, never an error the caller must unwind on.

use crate::spec::Strategy;
use crate::Result;
use eoka::Page;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Default bounded wait for a locate, in milliseconds.
pub const DEFAULT_LOCATE_TIMEOUT_MS: u64 = 3_000;

/// Thin wrapper over an [`eoka::Page`] that talks in locator pairs and CSS
/// selectors.
pub struct Dom<'a> {
    page: &'a Page,
    timeout_ms: u64,
}

impl<'a> Dom<'a> {
    pub fn new(page: &'a Page) -> Self {
        Self {
            page,
            timeout_ms: DEFAULT_LOCATE_TIMEOUT_MS,
        }
    }

    pub fn with_timeout(page: &'a Page, timeout_ms: u64) -> Self {
        Self { page, timeout_ms }
    }

    pub fn page(&self) -> &Page {
        self.page
    }

    /// Wait for an element matching the locator pair. Returns the resolved
    /// CSS selector, or `None` after a logged timeout.
    pub async fn locate(&self, by: Strategy, identifier: &str) -> Option<String> {
        let selector = selector_for(by, identifier);
        match self.page.wait_for(&selector, self.timeout_ms).await {
            Ok(_) => {
                debug!("located element {:?}={}", by, identifier);
                Some(selector)
            }
            Err(e) => {
                warn!("failed to locate element {:?}={}: {}", by, identifier, e);
                None
            }
        }
    }

    /// Click the element. A script-level force click sidesteps transient
    /// staleness; an unreachable element falls back to a direct CDP click,
    /// and a second failure is swallowed with a warning.
    pub async fn click(&self, selector: &str) -> bool {
        let js = format!(
            "document.querySelector({}).click()",
            js_string(selector)
        );
        if self.page.execute(&js).await.is_ok() {
            debug!("clicked {}", selector);
            return true;
        }
        match self.page.click(selector).await {
            Ok(_) => {
                debug!("clicked {} (direct)", selector);
                true
            }
            Err(e) => {
                warn!("failed to click {}: {}", selector, e);
                false
            }
        }
    }

    /// Type into the element. Multiple payload fragments are joined by the
    /// caller before reaching here; the whole string is typed at once.
    pub async fn send_keys(&self, selector: &str, text: &str) -> bool {
        match self.page.fill(selector, text).await {
            Ok(_) => {
                debug!("filled {}", selector);
                true
            }
            Err(e) => {
                warn!("failed to fill {}: {}", selector, e);
                false
            }
        }
    }

    /// Read the element's text content, returning `default` on any failure.
    pub async fn read_text(&self, selector: &str, default: &str) -> String {
        let js = format!(
            "(document.querySelector({})?.textContent ?? '').trim()",
            js_string(selector)
        );
        match self.page.evaluate::<String>(&js).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => default.to_string(),
            Err(e) => {
                warn!("failed to read text of {}: {}", selector, e);
                default.to_string()
            }
        }
    }

    /// Read the element's `class` attribute, empty when the element is absent
    /// or the read fails.
    pub async fn class_of(&self, selector: &str) -> String {
        let js = format!(
            "(document.querySelector({})?.getAttribute('class') ?? '')",
            js_string(selector)
        );
        self.page.evaluate::<String>(&js).await.unwrap_or_default()
    }

    /// Run a scan script that returns a `JSON.stringify`'d array and parse it.
    pub async fn scan<T: DeserializeOwned>(&self, js: &str) -> Result<Vec<T>> {
        let json_str: String = self.page.evaluate(js).await?;
        Ok(serde_json::from_str(&json_str)?)
    }
}

/// Map a Selenium-style locator pair onto a CSS selector.
pub fn selector_for(by: Strategy, identifier: &str) -> String {
    match by {
        Strategy::Css => identifier.to_string(),
        Strategy::ClassName => format!(".{}", identifier),
        Strategy::Id => format!("#{}", identifier),
        Strategy::Name => format!("[name=\"{}\"]", identifier),
        Strategy::TagName => identifier.to_string(),
    }
}

/// Escape a string for embedding in a JS snippet.
pub fn js_string(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| "\"\"".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_selector_for_strategies() {
        assert_eq!(selector_for(Strategy::Css, "div.box > input"), "div.box > input");
        assert_eq!(selector_for(Strategy::ClassName, "office-form-question"), ".office-form-question");
        assert_eq!(selector_for(Strategy::Id, "idSIButton9"), "#idSIButton9");
        assert_eq!(selector_for(Strategy::Name, "loginfmt"), "[name=\"loginfmt\"]");
        assert_eq!(selector_for(Strategy::TagName, "input"), "input");
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(js_string(r#"a"b"#), r#""a\"b""#);
    }
}
