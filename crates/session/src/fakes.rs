//! In-memory capability fakes for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use chatvault_protocol::constants::LOCAL_STORAGE_USER_AUTH;

use crate::capabilities::{
    DataLookup, LookupError, LookupOutcome, PageAutomation, PageError, SearchHit,
};

/// Scriptable in-memory page.
#[derive(Default)]
pub(crate) struct FakePage {
    pub url: Mutex<String>,
    /// Entries the chat-list selector reports.
    pub chat_items: AtomicUsize,
    /// Mutation counter; constant by default (a quiescent DOM).
    pub tick: AtomicU64,
    pub storage: Mutex<HashMap<String, String>>,
    /// What the search-result selector yields.
    pub results: Mutex<Vec<SearchHit>>,
    pub navigations: Mutex<Vec<String>>,
    pub clicks: Mutex<Vec<String>>,
    pub focused: Mutex<Vec<String>>,
    pub typed: Mutex<Vec<(String, String)>>,
    pub set_texts: Mutex<Vec<(String, String)>>,
    pub relaunches: Mutex<Vec<bool>>,
    pub closed: AtomicBool,
    /// Reads of the identity record, for poll-count assertions.
    pub storage_reads: AtomicUsize,
    /// When set, the identity record appears after N reads.
    login_after: Mutex<Option<(usize, String)>>,
    /// When set, the search results change to this after the creation form
    /// is confirmed.
    results_after_create: Mutex<Option<Vec<SearchHit>>>,
}

impl FakePage {
    /// A page already on `url` with a populated chat list.
    pub fn ready_on(url: &str) -> Self {
        let page = Self::default();
        *page.url.lock().unwrap() = url.to_string();
        page.chat_items.store(1, Ordering::SeqCst);
        page
    }

    /// Makes the identity record appear after `reads` failed reads.
    pub fn login_after(&self, reads: usize, payload: String) {
        *self.login_after.lock().unwrap() = Some((reads, payload));
    }

    /// Scripts the search-result list.
    pub fn set_results(&self, hits: Vec<SearchHit>) {
        *self.results.lock().unwrap() = hits;
    }

    /// Scripts the search results shown once the creation form is confirmed.
    pub fn results_after_create(&self, hits: Vec<SearchHit>) {
        *self.results_after_create.lock().unwrap() = Some(hits);
    }
}

#[async_trait]
impl PageAutomation for FakePage {
    async fn current_url(&self) -> Result<String, PageError> {
        Ok(self.url.lock().unwrap().clone())
    }

    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), PageError> {
        self.navigations.lock().unwrap().push(url.to_string());
        *self.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn count_elements(&self, _selector: &str) -> Result<usize, PageError> {
        Ok(self.chat_items.load(Ordering::SeqCst))
    }

    async fn mutation_tick(&self) -> Result<u64, PageError> {
        Ok(self.tick.load(Ordering::SeqCst))
    }

    async fn focus(&self, selector: &str) -> Result<(), PageError> {
        self.focused.lock().unwrap().push(selector.to_string());
        Ok(())
    }

    async fn click(&self, selector: &str, _delay: Duration) -> Result<(), PageError> {
        self.clicks.lock().unwrap().push(selector.to_string());
        if selector == crate::selectors::CONFIRM_BUTTON {
            if let Some(hits) = self.results_after_create.lock().unwrap().take() {
                *self.results.lock().unwrap() = hits;
            }
        }
        Ok(())
    }

    async fn type_text(
        &self,
        selector: &str,
        text: &str,
        _delay: Duration,
    ) -> Result<(), PageError> {
        self.typed
            .lock()
            .unwrap()
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn set_text_content(&self, selector: &str, text: &str) -> Result<(), PageError> {
        self.set_texts
            .lock()
            .unwrap()
            .push((selector.to_string(), text.to_string()));
        Ok(())
    }

    async fn search_results(&self, _selector: &str) -> Result<Vec<SearchHit>, PageError> {
        Ok(self.results.lock().unwrap().clone())
    }

    async fn local_storage_get(&self, key: &str) -> Result<Option<String>, PageError> {
        if key == LOCAL_STORAGE_USER_AUTH {
            let n = self.storage_reads.fetch_add(1, Ordering::SeqCst);
            if let Some((after, payload)) = self.login_after.lock().unwrap().as_ref() {
                if n >= *after {
                    return Ok(Some(payload.clone()));
                }
                return Ok(None);
            }
        }
        Ok(self.storage.lock().unwrap().get(key).cloned())
    }

    async fn local_storage_set(&self, key: &str, value: &str) -> Result<(), PageError> {
        self.storage
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn relaunch(&self, headless: bool) -> Result<(), PageError> {
        self.relaunches.lock().unwrap().push(headless);
        Ok(())
    }

    async fn close(&self) -> Result<(), PageError> {
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Scriptable in-memory data store.
#[derive(Default)]
pub(crate) struct FakeLookup {
    entries: Mutex<HashMap<(String, String), serde_json::Value>>,
    timeouts: Mutex<HashSet<(String, String)>>,
    pub calls: Mutex<Vec<(String, String)>>,
}

impl FakeLookup {
    pub fn insert(&self, store: &str, key: &str, value: serde_json::Value) {
        self.entries
            .lock()
            .unwrap()
            .insert((store.to_string(), key.to_string()), value);
    }

    /// Makes lookups of this key time out.
    pub fn time_out(&self, store: &str, key: &str) {
        self.timeouts
            .lock()
            .unwrap()
            .insert((store.to_string(), key.to_string()));
    }
}

#[async_trait]
impl DataLookup for FakeLookup {
    async fn get(
        &self,
        store: &str,
        key: &str,
        _timeout: Duration,
    ) -> Result<LookupOutcome, LookupError> {
        let entry = (store.to_string(), key.to_string());
        self.calls.lock().unwrap().push(entry.clone());
        if self.timeouts.lock().unwrap().contains(&entry) {
            return Err(LookupError::Timeout);
        }
        match self.entries.lock().unwrap().get(&entry) {
            Some(value) => Ok(LookupOutcome::Found(value.clone())),
            None => Ok(LookupOutcome::NotFound),
        }
    }
}
