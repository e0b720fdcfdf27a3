//! Injected capability seams: page automation and client-side data lookup.
//!
//! Both are modeled as typed per-operation contracts rather than a generic
//! "evaluate this script" escape hatch, so fakes can implement them exactly
//! and payloads are validated at the boundary.

use std::time::Duration;

use async_trait::async_trait;

/// Errors from the page-automation surface.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    #[error("operation timed out")]
    Timeout,

    #[error("selector not found: {0}")]
    SelectorNotFound(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("automation backend error: {0}")]
    Backend(String),
}

/// One entry of a search-result list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Visible label text, untrimmed.
    pub label: String,
    /// Stable peer identifier attribute, when the backend exposes one.
    pub peer_id: Option<String>,
}

/// A controllable browser page on the host app.
///
/// All calls are asynchronous and may fail; none of them block forever —
/// bounded operations take an explicit timeout and surface
/// [`PageError::Timeout`] when it elapses.
#[async_trait]
pub trait PageAutomation: Send + Sync {
    /// URL of the current page.
    async fn current_url(&self) -> Result<String, PageError>;

    /// Navigates to `url`, waiting at most `timeout` for the load.
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), PageError>;

    /// Number of elements currently matching `selector`.
    async fn count_elements(&self, selector: &str) -> Result<usize, PageError>;

    /// Monotonic counter of observed DOM mutations.
    ///
    /// Two equal readings separated by a delay mean the DOM was silent in
    /// between; used by the quiescence wait.
    async fn mutation_tick(&self) -> Result<u64, PageError>;

    /// Focuses the element matching `selector`.
    async fn focus(&self, selector: &str) -> Result<(), PageError>;

    /// Clicks the element matching `selector` after `delay`.
    async fn click(&self, selector: &str, delay: Duration) -> Result<(), PageError>;

    /// Types `text` into the element matching `selector`, pausing `delay`
    /// between keystrokes.
    async fn type_text(&self, selector: &str, text: &str, delay: Duration)
    -> Result<(), PageError>;

    /// Replaces the text content of the element matching `selector`.
    async fn set_text_content(&self, selector: &str, text: &str) -> Result<(), PageError>;

    /// Reads the current search-result entries under `selector`.
    async fn search_results(&self, selector: &str) -> Result<Vec<SearchHit>, PageError>;

    /// Reads a local-storage value.
    async fn local_storage_get(&self, key: &str) -> Result<Option<String>, PageError>;

    /// Writes a local-storage value.
    async fn local_storage_set(&self, key: &str, value: &str) -> Result<(), PageError>;

    /// Tears the browser down and relaunches it, headless or headful.
    async fn relaunch(&self, headless: bool) -> Result<(), PageError>;

    /// Closes the browser.
    async fn close(&self) -> Result<(), PageError>;
}

/// Errors from the data-lookup surface.
///
/// A timeout is distinguishable from "key not present": the latter is the
/// [`LookupOutcome::NotFound`] value. Once a timeout has fired, any late
/// completion of the abandoned lookup must be a no-op (the future backing
/// it is dropped).
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("lookup timed out")]
    Timeout,

    #[error("lookup backend error: {0}")]
    Backend(String),
}

/// Result of a successful data-store round trip.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome {
    Found(serde_json::Value),
    NotFound,
}

/// Asynchronous key-value lookup against the host app's client-side store.
#[async_trait]
pub trait DataLookup: Send + Sync {
    /// Fetches `key` from `store`, waiting at most `timeout`.
    async fn get(
        &self,
        store: &str,
        key: &str,
        timeout: Duration,
    ) -> Result<LookupOutcome, LookupError>;
}
