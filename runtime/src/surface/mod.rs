//! Remote surface abstraction.
//!
//! Defines the `Renderer` and `RemoteSurface` traits that abstract over the
//! browser engine (currently Chromium via chromiumoxide). Everything above
//! this module talks to the account page only through these capabilities,
//! so extraction, location and orchestration run unchanged against the
//! scripted surface used in tests.

pub mod chromium;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long `settle` waits for the page to go quiet before giving up.
pub const SETTLE_IDLE_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Fixed delay used when the page never goes quiet.
pub const SETTLE_FALLBACK_DELAY: Duration = Duration::from_millis(1_200);

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The final URL after any redirects.
    pub final_url: String,
    /// Time taken to load the page in milliseconds.
    pub load_time_ms: u64,
}

/// A clickable control inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Control {
    /// Position among the container's controls.
    pub index: usize,
    /// Visible label (value, aria-label, title or text content).
    pub label: String,
}

/// One `<option>` of a select field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub value: String,
    pub text: String,
    #[serde(default)]
    pub disabled: bool,
}

/// An input, select or textarea inside a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Position among the container's fields.
    pub index: usize,
    /// Lowercase tag name (`input`, `select`, `textarea`).
    pub tag: String,
    /// The `type` attribute, empty when absent.
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub options: Vec<FieldOption>,
}

impl Field {
    pub fn is_select(&self) -> bool {
        self.tag == "select"
    }

    /// Text or number input that can take a typed amount.
    pub fn is_amount_input(&self) -> bool {
        self.tag == "input" && matches!(self.kind.as_str(), "" | "text" | "number")
    }
}

/// An interactive region of the page (form, fieldset, section).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    /// Position in document order; stable until the page changes.
    pub index: usize,
    /// Whitespace-collapsed visible text.
    pub text: String,
    #[serde(default)]
    pub controls: Vec<Control>,
    #[serde(default)]
    pub fields: Vec<Field>,
}

impl Container {
    pub fn field_named(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }
}

/// A confirmation prompt shown by the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    pub text: String,
    #[serde(default)]
    pub buttons: Vec<String>,
}

/// A server response observed after a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acknowledgment {
    pub url: String,
    pub status: u16,
    /// Response body, when the engine could retrieve it.
    pub body: Option<String>,
}

/// Predicate selecting the acknowledgment that belongs to an action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckMatcher {
    /// A response matches when its URL contains any of these fragments.
    pub url_contains: Vec<String>,
}

impl AckMatcher {
    pub fn new(fragments: &[&str]) -> Self {
        Self {
            url_contains: fragments.iter().map(|f| f.to_string()).collect(),
        }
    }

    pub fn matches(&self, url: &str) -> bool {
        self.url_contains.iter().any(|f| url.contains(f.as_str()))
    }
}

/// A browser engine that can open remote surfaces.
#[async_trait]
pub trait Renderer: Send + Sync {
    /// Open a new surface (tab) with its own page state.
    async fn new_surface(&self) -> Result<Box<dyn RemoteSurface>>;
    /// Shut down the browser engine.
    async fn shutdown(&self) -> Result<()>;
}

/// A single live page the run reads from and acts on.
#[async_trait]
pub trait RemoteSurface: Send + Sync {
    /// Navigate to a URL with a timeout.
    async fn navigate(&mut self, url: &str, timeout_ms: u64) -> Result<NavigationResult>;
    /// Get the current URL.
    async fn current_url(&self) -> Result<String>;
    /// Visible text of the whole page.
    async fn page_text(&self) -> Result<String>;
    /// Full page HTML.
    async fn page_html(&self) -> Result<String>;
    /// Own text of the first element matching a CSS selector.
    async fn element_text(&self, selector: &str) -> Result<Option<String>>;
    /// Enumerate interactive containers in document order.
    async fn containers(&self) -> Result<Vec<Container>>;
    /// Set a field's value and fire input/change events.
    async fn set_field(&mut self, container: usize, field: usize, value: &str) -> Result<()>;
    /// Click a control. Acknowledgments seen before the click are forgotten.
    async fn click_control(&mut self, container: usize, control: usize) -> Result<()>;
    /// Wait for a visible confirmation prompt.
    async fn wait_for_dialog(&mut self, timeout_ms: u64) -> Result<Option<Dialog>>;
    /// Click the first prompt button whose label contains any keyword.
    /// Returns the clicked label.
    async fn click_dialog_button(&mut self, keywords: &[&str]) -> Result<Option<String>>;
    /// Wait for a response matching `matcher` since the last click.
    async fn wait_for_acknowledgment(
        &mut self,
        matcher: &AckMatcher,
        timeout_ms: u64,
    ) -> Result<Option<Acknowledgment>>;
    /// Full-page PNG screenshot.
    async fn screenshot(&self) -> Result<Vec<u8>>;
    /// Wait for the page to go quiet, falling back to a fixed delay.
    async fn settle(&mut self);
    /// Close this surface.
    async fn close(self: Box<Self>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_matcher_any_fragment() {
        let matcher = AckMatcher::new(&["bonusBuy.php", "donate"]);
        assert!(matcher.matches("https://example.net/json/bonusBuy.php?spendtype=VIP"));
        assert!(matcher.matches("https://example.net/millionaires/donate.php"));
        assert!(!matcher.matches("https://example.net/store.php"));
    }

    #[test]
    fn test_container_deserializes_with_missing_lists() {
        let container: Container =
            serde_json::from_str(r#"{"index": 2, "text": "VIP status"}"#).unwrap();
        assert_eq!(container.index, 2);
        assert!(container.controls.is_empty());
        assert!(container.fields.is_empty());
    }

    #[test]
    fn test_field_kinds() {
        let field = Field {
            index: 0,
            tag: "input".into(),
            kind: "number".into(),
            name: "points".into(),
            id: String::new(),
            placeholder: String::new(),
            options: Vec::new(),
        };
        assert!(field.is_amount_input());
        assert!(!field.is_select());
    }
}
