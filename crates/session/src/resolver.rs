//! The session resolver: walks the host-app page to an authenticated,
//! identity-known state.
//!
//! One resolver owns one controllable page. The resolver is an explicitly
//! constructed, explicitly owned value; callers share it by reference and
//! the internal page mutex serializes every page-driving operation.

use std::sync::Mutex as StdMutex;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, MutexGuard};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use chatvault_protocol::constants::{
    DEFAULT_DOM_IDLE, DEFAULT_DOM_IDLE_CAP, DEFAULT_LOOKUP_TIMEOUT, DEFAULT_NAVIGATION_TIMEOUT,
    DEFAULT_SEARCH_SETTLE, DEFAULT_CLICK_DELAY, DEFAULT_TYPING_DELAY, HOST_APP_BASE_URL,
    KEY_AUTH_STATE, LOCAL_STORAGE_USER_AUTH, STORE_SESSION, STORE_USERS, VALID_AUTH_STATE,
};
use chatvault_protocol::{Identity, PageKind, UserProfile};

use crate::SessionError;
use crate::capabilities::{DataLookup, LookupError, LookupOutcome, PageAutomation, PageError};
use crate::selectors;
use crate::wait::wait_for_quiescence;

/// How often the content-loaded condition is re-checked.
const CONTENT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Where the resolver currently stands. Transitions are strictly forward,
/// except that a forced reload re-enters `OnHost`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionPhase {
    Unready,
    PageReady,
    OnHost,
    Authenticated,
    IdentityKnown,
}

/// Tunables for a resolver. Defaults mirror the host app's observed pacing.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Origin of the host app.
    pub base_url: String,
    /// Front-end to drive when the caller does not override it.
    pub page_kind: PageKind,
    pub navigation_timeout: Duration,
    pub lookup_timeout: Duration,
    /// Silence window for DOM quiescence.
    pub dom_idle: Duration,
    /// Hard cap on any quiescence wait.
    pub dom_idle_cap: Duration,
    /// Settle window after typing a search query.
    pub search_settle: Duration,
    pub click_delay: Duration,
    pub typing_delay: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            base_url: HOST_APP_BASE_URL.to_string(),
            page_kind: PageKind::K,
            navigation_timeout: DEFAULT_NAVIGATION_TIMEOUT,
            lookup_timeout: DEFAULT_LOOKUP_TIMEOUT,
            dom_idle: DEFAULT_DOM_IDLE,
            dom_idle_cap: DEFAULT_DOM_IDLE_CAP,
            search_settle: DEFAULT_SEARCH_SETTLE,
            click_delay: DEFAULT_CLICK_DELAY,
            typing_delay: DEFAULT_TYPING_DELAY,
        }
    }
}

impl SessionConfig {
    /// Home URL of the given front-end.
    pub fn home_url(&self, kind: PageKind) -> String {
        format!("{}/{}/", self.base_url, kind.path_segment())
    }
}

/// What [`SessionResolver::ensure_ready`] should guarantee.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnsureOptions {
    /// Overrides the configured front-end for this call.
    pub page_kind: Option<PageKind>,
    /// Require the exact home URL, not just the host-app origin.
    pub require_home: bool,
    /// Navigate even if the page already looks right.
    pub force_reload: bool,
}

impl EnsureOptions {
    /// Require the home page.
    pub fn home() -> Self {
        Self {
            require_home: true,
            ..Self::default()
        }
    }
}

/// Resolves and holds an authenticated host-app session.
pub struct SessionResolver<P, D> {
    page: P,
    data: D,
    config: SessionConfig,
    /// Serializes every page-driving operation; the page is one resource.
    page_lock: Mutex<()>,
    phase: StdMutex<SessionPhase>,
    cancel: CancellationToken,
}

impl<P: PageAutomation, D: DataLookup> SessionResolver<P, D> {
    pub fn new(page: P, data: D, config: SessionConfig) -> Self {
        Self {
            page,
            data,
            config,
            page_lock: Mutex::new(()),
            phase: StdMutex::new(SessionPhase::Unready),
            cancel: CancellationToken::new(),
        }
    }

    /// Current phase of the session state machine.
    pub fn phase(&self) -> SessionPhase {
        *self.phase.lock().unwrap()
    }

    pub(crate) fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub(crate) fn page(&self) -> &P {
        &self.page
    }

    pub(crate) fn data(&self) -> &D {
        &self.data
    }

    pub(crate) async fn acquire_page(&self) -> MutexGuard<'_, ()> {
        self.page_lock.lock().await
    }

    /// Fails with [`SessionError::Shutdown`] once [`shutdown`](Self::shutdown)
    /// has run.
    pub(crate) fn checkpoint(&self) -> Result<(), SessionError> {
        if self.cancel.is_cancelled() {
            return Err(SessionError::Shutdown);
        }
        Ok(())
    }

    /// Moves the phase forward; never backward.
    fn advance(&self, to: SessionPhase) {
        let mut phase = self.phase.lock().unwrap();
        if to > *phase {
            debug!(from = ?*phase, to = ?to, "session phase");
            *phase = to;
        }
    }

    /// Tears down the browser and marks the resolver unusable.
    pub async fn shutdown(&self) -> Result<(), SessionError> {
        self.cancel.cancel();
        let _guard = self.page_lock.lock().await;
        self.page.close().await?;
        *self.phase.lock().unwrap() = SessionPhase::Unready;
        info!("session shut down");
        Ok(())
    }

    /// Brings the page to a loaded, quiescent host-app state.
    pub async fn ensure_ready(&self, opts: EnsureOptions) -> Result<(), SessionError> {
        self.checkpoint()?;
        let _guard = self.page_lock.lock().await;
        self.ensure_ready_locked(opts).await
    }

    pub(crate) async fn ensure_ready_locked(&self, opts: EnsureOptions) -> Result<(), SessionError> {
        self.checkpoint()?;
        let url = self.page.current_url().await?;
        self.advance(SessionPhase::PageReady);

        let kind = opts.page_kind.unwrap_or(self.config.page_kind);
        let home = self.config.home_url(kind);
        let off_host = !url.starts_with(self.config.base_url.as_str());

        if off_host || (opts.require_home && url != home) || opts.force_reload {
            debug!(from = %url, to = %home, forced = opts.force_reload, "navigating to host app");
            self.page
                .navigate(&home, self.config.navigation_timeout)
                .await
                .map_err(|err| match err {
                    PageError::Timeout => SessionError::NavigationTimeout,
                    other => SessionError::Page(other),
                })?;
        }
        if opts.force_reload {
            // A reload drops auth/identity knowledge until re-observed.
            *self.phase.lock().unwrap() = SessionPhase::OnHost;
        } else {
            self.advance(SessionPhase::OnHost);
        }

        // Minimal content signal: the chat list has at least one entry.
        let deadline = Instant::now() + self.config.navigation_timeout;
        loop {
            if self.page.count_elements(selectors::CHAT_LIST_ITEM).await? > 0 {
                break;
            }
            if Instant::now() >= deadline {
                warn!("chat list never populated");
                return Err(SessionError::NavigationTimeout);
            }
            sleep(CONTENT_POLL_INTERVAL).await;
        }

        let page = &self.page;
        wait_for_quiescence(
            || page.mutation_tick(),
            self.config.dom_idle,
            self.config.dom_idle_cap,
        )
        .await?;
        Ok(())
    }

    /// Compares the persisted auth marker against the signed-in sentinel.
    ///
    /// An absent marker is a normal `false`; only a lookup timeout is an
    /// error ([`SessionError::AuthCheckTimeout`]).
    pub async fn check_authentication(&self) -> Result<bool, SessionError> {
        self.checkpoint()?;
        let _guard = self.page_lock.lock().await;
        self.ensure_ready_locked(EnsureOptions::default()).await?;

        match self
            .data
            .get(STORE_SESSION, KEY_AUTH_STATE, self.config.lookup_timeout)
            .await
        {
            Ok(LookupOutcome::Found(value)) => {
                let signed = value.get("_").and_then(Value::as_str) == Some(VALID_AUTH_STATE);
                if signed {
                    self.advance(SessionPhase::Authenticated);
                }
                debug!(signed, "auth marker checked");
                Ok(signed)
            }
            Ok(LookupOutcome::NotFound) => Ok(false),
            Err(LookupError::Timeout) => Err(SessionError::AuthCheckTimeout),
            Err(err) => Err(err.into()),
        }
    }

    /// Reads the persisted identity record and extracts the user id.
    pub async fn retrieve_identity(&self) -> Result<Identity, SessionError> {
        self.checkpoint()?;
        let _guard = self.page_lock.lock().await;
        self.ensure_ready_locked(EnsureOptions::default()).await?;
        self.retrieve_identity_locked().await
    }

    pub(crate) async fn retrieve_identity_locked(&self) -> Result<Identity, SessionError> {
        let raw = self
            .page
            .local_storage_get(LOCAL_STORAGE_USER_AUTH)
            .await?
            .ok_or(SessionError::IdentityNotFound)?;
        let value: Value =
            serde_json::from_str(&raw).map_err(|_| SessionError::IdentityNotFound)?;
        let user_id = match value.get("id") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(SessionError::IdentityNotFound),
        };
        self.advance(SessionPhase::IdentityKnown);
        Ok(Identity { user_id })
    }

    /// Full display name of the signed-in user, from their profile record.
    pub async fn fetch_full_name(&self) -> Result<String, SessionError> {
        self.checkpoint()?;
        let _guard = self.page_lock.lock().await;
        self.ensure_ready_locked(EnsureOptions::default()).await?;
        let identity = self.retrieve_identity_locked().await?;

        match self
            .data
            .get(STORE_USERS, &identity.user_id, self.config.lookup_timeout)
            .await?
        {
            LookupOutcome::Found(value) => {
                let profile: UserProfile = serde_json::from_value(value)
                    .map_err(|err| SessionError::Malformed(format!("user profile: {err}")))?;
                Ok(profile.full_name())
            }
            LookupOutcome::NotFound => Err(SessionError::Malformed(format!(
                "no profile record for user {}",
                identity.user_id
            ))),
        }
    }

    /// Relaunches the browser headful and polls for the identity record
    /// until a human completes the login or `timeout` elapses.
    ///
    /// The one human-in-the-loop operation: the headful window is the
    /// login UI.
    pub async fn wait_for_login(
        &self,
        timeout: Duration,
        poll_interval: Duration,
    ) -> Result<Identity, SessionError> {
        self.checkpoint()?;
        let _guard = self.page_lock.lock().await;

        info!("relaunching headful for interactive login");
        self.page.relaunch(false).await?;
        *self.phase.lock().unwrap() = SessionPhase::Unready;
        self.ensure_ready_locked(EnsureOptions::default()).await?;

        let deadline = Instant::now() + timeout;
        loop {
            match self.retrieve_identity_locked().await {
                Ok(identity) => {
                    info!(user = %identity.user_id, "login detected");
                    return Ok(identity);
                }
                Err(SessionError::IdentityNotFound) => {}
                Err(err) => return Err(err),
            }
            let now = Instant::now();
            if now >= deadline {
                warn!("login deadline reached");
                return Err(SessionError::LoginTimeout);
            }
            sleep(poll_interval.min(deadline.duration_since(now))).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fakes::{FakeLookup, FakePage};
    use chatvault_protocol::constants::{
        DEFAULT_LOGIN_POLL_INTERVAL, KEY_AUTH_STATE, STORE_SESSION, STORE_USERS,
    };
    use serde_json::json;

    fn resolver(page: FakePage, data: FakeLookup) -> SessionResolver<FakePage, FakeLookup> {
        SessionResolver::new(page, data, SessionConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_ready_skips_navigation_when_on_host() {
        let page = FakePage::ready_on("https://web.telegram.org/k/somewhere");
        let r = resolver(page, FakeLookup::default());
        r.ensure_ready(EnsureOptions::default()).await.unwrap();
        assert!(r.page().navigations.lock().unwrap().is_empty());
        assert_eq!(r.phase(), SessionPhase::OnHost);
    }

    #[tokio::test(start_paused = true)]
    async fn ensure_ready_navigates_when_off_host() {
        let page = FakePage::ready_on("https://example.com/");
        let r = resolver(page, FakeLookup::default());
        r.ensure_ready(EnsureOptions::default()).await.unwrap();
        assert_eq!(
            r.page().navigations.lock().unwrap().as_slice(),
            ["https://web.telegram.org/k/"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn require_home_forces_navigation_off_home() {
        let page = FakePage::ready_on("https://web.telegram.org/k/#-100123");
        let r = resolver(page, FakeLookup::default());
        r.ensure_ready(EnsureOptions::home()).await.unwrap();
        assert_eq!(r.page().navigations.lock().unwrap().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn force_reload_always_navigates_and_reenters_on_host() {
        let page = FakePage::ready_on("https://web.telegram.org/k/");
        let r = resolver(page, FakeLookup::default());

        // Reach a later phase first.
        r.page()
            .storage
            .lock()
            .unwrap()
            .insert("user_auth".into(), json!({"id": 7}).to_string());
        r.retrieve_identity().await.unwrap();
        assert_eq!(r.phase(), SessionPhase::IdentityKnown);

        r.ensure_ready(EnsureOptions {
            force_reload: true,
            ..EnsureOptions::default()
        })
        .await
        .unwrap();
        assert_eq!(r.page().navigations.lock().unwrap().len(), 1);
        assert_eq!(r.phase(), SessionPhase::OnHost);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_chat_list_times_out() {
        let page = FakePage::ready_on("https://web.telegram.org/k/");
        page.chat_items.store(0, std::sync::atomic::Ordering::SeqCst);
        let r = resolver(page, FakeLookup::default());
        let err = r.ensure_ready(EnsureOptions::default()).await.unwrap_err();
        assert!(matches!(err, SessionError::NavigationTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn auth_check_matches_sentinel() {
        let data = FakeLookup::default();
        data.insert(
            STORE_SESSION,
            KEY_AUTH_STATE,
            json!({"_": "authStateSignedIn"}),
        );
        let r = resolver(FakePage::ready_on("https://web.telegram.org/k/"), data);
        assert!(r.check_authentication().await.unwrap());
        assert_eq!(r.phase(), SessionPhase::Authenticated);
    }

    #[tokio::test(start_paused = true)]
    async fn auth_check_rejects_other_states() {
        let data = FakeLookup::default();
        data.insert(
            STORE_SESSION,
            KEY_AUTH_STATE,
            json!({"_": "authStateWaitCode"}),
        );
        let r = resolver(FakePage::ready_on("https://web.telegram.org/k/"), data);
        assert!(!r.check_authentication().await.unwrap());
        assert_eq!(r.phase(), SessionPhase::OnHost);
    }

    #[tokio::test(start_paused = true)]
    async fn absent_auth_marker_is_false_not_error() {
        let r = resolver(
            FakePage::ready_on("https://web.telegram.org/k/"),
            FakeLookup::default(),
        );
        assert!(!r.check_authentication().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn auth_lookup_timeout_is_dedicated_error() {
        let data = FakeLookup::default();
        data.time_out(STORE_SESSION, KEY_AUTH_STATE);
        let r = resolver(FakePage::ready_on("https://web.telegram.org/k/"), data);
        let err = r.check_authentication().await.unwrap_err();
        assert!(matches!(err, SessionError::AuthCheckTimeout));
    }

    #[tokio::test(start_paused = true)]
    async fn identity_parses_string_and_numeric_ids() {
        let page = FakePage::ready_on("https://web.telegram.org/k/");
        page.storage
            .lock()
            .unwrap()
            .insert("user_auth".into(), json!({"id": "12345"}).to_string());
        let r = resolver(page, FakeLookup::default());
        assert_eq!(r.retrieve_identity().await.unwrap().user_id, "12345");

        let page = FakePage::ready_on("https://web.telegram.org/k/");
        page.storage
            .lock()
            .unwrap()
            .insert("user_auth".into(), json!({"id": 12345}).to_string());
        let r = resolver(page, FakeLookup::default());
        assert_eq!(r.retrieve_identity().await.unwrap().user_id, "12345");
    }

    #[tokio::test(start_paused = true)]
    async fn missing_or_malformed_identity_is_fatal() {
        let r = resolver(
            FakePage::ready_on("https://web.telegram.org/k/"),
            FakeLookup::default(),
        );
        assert!(matches!(
            r.retrieve_identity().await.unwrap_err(),
            SessionError::IdentityNotFound
        ));

        let page = FakePage::ready_on("https://web.telegram.org/k/");
        page.storage
            .lock()
            .unwrap()
            .insert("user_auth".into(), "not json".into());
        let r = resolver(page, FakeLookup::default());
        assert!(matches!(
            r.retrieve_identity().await.unwrap_err(),
            SessionError::IdentityNotFound
        ));

        let page = FakePage::ready_on("https://web.telegram.org/k/");
        page.storage
            .lock()
            .unwrap()
            .insert("user_auth".into(), json!({"dc": 4}).to_string());
        let r = resolver(page, FakeLookup::default());
        assert!(matches!(
            r.retrieve_identity().await.unwrap_err(),
            SessionError::IdentityNotFound
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn fetch_full_name_formats_profile() {
        let page = FakePage::ready_on("https://web.telegram.org/k/");
        page.storage
            .lock()
            .unwrap()
            .insert("user_auth".into(), json!({"id": 9}).to_string());
        let data = FakeLookup::default();
        data.insert(
            STORE_USERS,
            "9",
            json!({"first_name": "Ada", "last_name": "Lovelace"}),
        );
        let r = resolver(page, data);
        assert_eq!(r.fetch_full_name().await.unwrap(), "Ada Lovelace");
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_login_relaunches_headful_and_detects_identity() {
        let page = FakePage::ready_on("https://web.telegram.org/k/");
        // Identity appears on the third storage read.
        page.login_after(2, json!({"id": 777}).to_string());
        let r = resolver(page, FakeLookup::default());

        let identity = r
            .wait_for_login(Duration::from_secs(30), DEFAULT_LOGIN_POLL_INTERVAL)
            .await
            .unwrap();
        assert_eq!(identity.user_id, "777");
        assert_eq!(r.page().relaunches.lock().unwrap().as_slice(), [false]);
        assert_eq!(r.phase(), SessionPhase::IdentityKnown);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_login_times_out_with_bounded_polls() {
        let page = FakePage::ready_on("https://web.telegram.org/k/");
        let r = resolver(page, FakeLookup::default());

        let start = Instant::now();
        let err = r
            .wait_for_login(Duration::from_millis(2000), Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::LoginTimeout));

        // Page readiness adds ~500ms of quiescence ahead of the login polls.
        let elapsed = start.elapsed();
        assert!(elapsed >= Duration::from_millis(2000));
        assert!(elapsed <= Duration::from_millis(2600));

        let polls = r
            .page()
            .storage_reads
            .load(std::sync::atomic::Ordering::SeqCst);
        assert!((4..=5).contains(&polls), "polled {polls} times");
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_closes_page_and_poisons_resolver() {
        let r = resolver(
            FakePage::ready_on("https://web.telegram.org/k/"),
            FakeLookup::default(),
        );
        r.shutdown().await.unwrap();
        assert!(
            r.page()
                .closed
                .load(std::sync::atomic::Ordering::SeqCst)
        );
        assert!(matches!(
            r.ensure_ready(EnsureOptions::default()).await.unwrap_err(),
            SessionError::Shutdown
        ));
        assert!(matches!(
            r.check_authentication().await.unwrap_err(),
            SessionError::Shutdown
        ));
    }
}
