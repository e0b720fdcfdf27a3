//! Collapses login outcomes into the client event protocol.

use std::time::Duration;

use tracing::{info, warn};

use chatvault_protocol::constants::DEFAULT_LOGIN_POLL_INTERVAL;
use chatvault_protocol::{ClientEvent, EventKind};

use crate::SessionError;
use crate::capabilities::{DataLookup, PageAutomation};
use crate::resolver::SessionResolver;

/// Runs the full login sequence and reports the terminal outcome as a
/// [`ClientEvent`].
///
/// Exactly four terminal kinds are possible: `already_signed`, `timeout`,
/// `error` (all internal error kinds collapse into one envelope with a
/// readable message), and `login_success` carrying the identity.
pub async fn login_flow<P: PageAutomation, D: DataLookup>(
    resolver: &SessionResolver<P, D>,
    timeout: Duration,
) -> ClientEvent {
    match resolver.check_authentication().await {
        Ok(true) => {
            info!("already authenticated");
            ClientEvent::new(EventKind::AlreadySigned)
        }
        Ok(false) => {
            match resolver
                .wait_for_login(timeout, DEFAULT_LOGIN_POLL_INTERVAL)
                .await
            {
                Ok(identity) => ClientEvent::with_data(EventKind::LoginSuccess, &identity)
                    .unwrap_or_else(|err| ClientEvent::error(err.to_string())),
                Err(SessionError::LoginTimeout) => {
                    warn!("login timed out");
                    ClientEvent::new(EventKind::Timeout)
                }
                Err(err) => ClientEvent::error(err.to_string()),
            }
        }
        Err(err) => ClientEvent::error(err.to_string()),
    }
}
