//! Locating and creating the user's dedicated channel.
//!
//! The channel name is derived deterministically from the user id, so the
//! same user always maps to the same channel. Search and creation go
//! through the host app's UI; existence is re-verified through the data
//! store because UI timing is inherently racy.

use tracing::{debug, info, warn};

use chatvault_protocol::constants::STORE_DIALOGS;
use chatvault_protocol::{ChannelInfo, derive_channel_name};

use crate::SessionError;
use crate::capabilities::{DataLookup, LookupError, LookupOutcome, PageAutomation};
use crate::resolver::{EnsureOptions, SessionResolver};
use crate::selectors;
use crate::wait::wait_for_quiescence;

/// Channel operations on top of a resolved session.
pub struct ChannelOps<'a, P, D> {
    resolver: &'a SessionResolver<P, D>,
}

impl<'a, P: PageAutomation, D: DataLookup> ChannelOps<'a, P, D> {
    pub fn new(resolver: &'a SessionResolver<P, D>) -> Self {
        Self { resolver }
    }

    /// Searches the host app for `channel_name` and extracts its peer id.
    ///
    /// `return_to_home` clicks back out of the search view afterwards, so
    /// repeated calls start from the same UI position.
    pub async fn locate(
        &self,
        channel_name: &str,
        return_to_home: bool,
    ) -> Result<ChannelInfo, SessionError> {
        self.resolver.checkpoint()?;
        let _guard = self.resolver.acquire_page().await;
        self.locate_locked(channel_name, return_to_home).await
    }

    async fn locate_locked(
        &self,
        channel_name: &str,
        return_to_home: bool,
    ) -> Result<ChannelInfo, SessionError> {
        let r = self.resolver;
        r.ensure_ready_locked(EnsureOptions::home()).await?;
        let page = r.page();
        let cfg = r.config();

        page.focus(selectors::SEARCH_INPUT).await?;
        wait_for_quiescence(|| page.mutation_tick(), cfg.dom_idle, cfg.dom_idle_cap).await?;
        page.type_text(selectors::SEARCH_INPUT, channel_name, cfg.typing_delay)
            .await?;
        // Search results trickle in; give them a longer settle window.
        wait_for_quiescence(|| page.mutation_tick(), cfg.search_settle, cfg.dom_idle_cap).await?;

        let hits = page.search_results(selectors::SEARCH_RESULT_LABEL).await?;
        let info = match hits.iter().find(|hit| hit.label.trim() == channel_name) {
            Some(hit) => {
                let peer_id = hit.peer_id.clone().ok_or_else(|| {
                    SessionError::Malformed(format!(
                        "search hit \"{channel_name}\" has no peer id"
                    ))
                })?;
                ChannelInfo::Exists {
                    name: hit.label.trim().to_string(),
                    peer_id,
                }
            }
            None => ChannelInfo::NotFound,
        };
        debug!(channel = %channel_name, found = info.exists(), "channel search");

        if return_to_home {
            page.click(selectors::BACK_TO_HOME_BUTTON, cfg.click_delay)
                .await?;
        }
        Ok(info)
    }

    /// Creates the user's dedicated channel unless it already exists.
    ///
    /// Returns `false` both when the channel was already there and when a
    /// creation attempt could not be verified afterwards; only a verified
    /// creation is `true`. Verification failure is not escalated because
    /// the caller is better placed to retry.
    pub async fn create_if_missing(&self, user_id: &str) -> Result<bool, SessionError> {
        self.resolver.checkpoint()?;
        let _guard = self.resolver.acquire_page().await;

        let name = derive_channel_name(user_id);
        if self.locate_locked(&name, true).await?.exists() {
            debug!(channel = %name, "already exists; not re-created");
            return Ok(false);
        }

        let r = self.resolver;
        let page = r.page();
        let cfg = r.config();

        info!(channel = %name, "creating channel");
        wait_for_quiescence(|| page.mutation_tick(), cfg.dom_idle, cfg.dom_idle_cap).await?;
        page.click(selectors::COMPOSE_BUTTON, cfg.click_delay).await?;
        wait_for_quiescence(|| page.mutation_tick(), cfg.dom_idle, cfg.dom_idle_cap).await?;
        page.click(selectors::NEW_CHANNEL_ITEM, cfg.click_delay).await?;
        wait_for_quiescence(|| page.mutation_tick(), cfg.dom_idle, cfg.dom_idle_cap).await?;
        page.set_text_content(selectors::CHANNEL_NAME_INPUT, &name)
            .await?;
        page.click(selectors::CONFIRM_BUTTON, cfg.click_delay).await?;
        wait_for_quiescence(|| page.mutation_tick(), cfg.dom_idle, cfg.dom_idle_cap).await?;

        // Re-verify through the data store, keyed by the peer id the
        // search now reports.
        let ChannelInfo::Exists { peer_id, .. } = self.locate_locked(&name, true).await? else {
            warn!(channel = %name, "created channel not found in search");
            return Ok(false);
        };
        match r.data().get(STORE_DIALOGS, &peer_id, cfg.lookup_timeout).await {
            Ok(LookupOutcome::Found(_)) => {
                info!(channel = %name, peer = %peer_id, "channel created and verified");
                Ok(true)
            }
            Ok(LookupOutcome::NotFound) => {
                warn!(channel = %name, peer = %peer_id, "creation not verified");
                Ok(false)
            }
            Err(LookupError::Timeout) => {
                warn!(channel = %name, "verification lookup timed out");
                Ok(false)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Opens the user's dedicated channel in the UI.
    pub async fn navigate_to_channel(&self, user_id: &str) -> Result<(), SessionError> {
        self.resolver.checkpoint()?;
        let _guard = self.resolver.acquire_page().await;

        let name = derive_channel_name(user_id);
        match self.locate_locked(&name, false).await? {
            ChannelInfo::Exists { peer_id, .. } => {
                let r = self.resolver;
                r.page()
                    .click(&selectors::peer_selector(&peer_id), r.config().click_delay)
                    .await?;
                info!(channel = %name, peer = %peer_id, "channel opened");
                Ok(())
            }
            ChannelInfo::NotFound => Err(SessionError::ChannelMissing(name)),
        }
    }
}
