//! Constants of the automated host app.
//!
//! Everything here is configuration data about the host app's web client:
//! its origin, the names of its client-side stores, and the pacing the UI
//! tolerates. None of it is algorithmic.

use std::time::Duration;

/// Origin of the host app's web client.
pub const HOST_APP_BASE_URL: &str = "https://web.telegram.org";

/// Sentinel stored in the auth record when a session is signed in.
pub const VALID_AUTH_STATE: &str = "authStateSignedIn";

/// Client-side database holding the host app's persisted state.
pub const DATABASE_NAME: &str = "tweb";

/// Store holding the session auth record.
pub const STORE_SESSION: &str = "session";

/// Store holding per-user profile records, keyed by user id.
pub const STORE_USERS: &str = "users";

/// Store holding dialog records, keyed by peer id.
pub const STORE_DIALOGS: &str = "dialogs";

/// Key of the auth-state record inside [`STORE_SESSION`].
pub const KEY_AUTH_STATE: &str = "authState";

/// Local-storage key holding the signed-in user's auth payload.
pub const LOCAL_STORAGE_USER_AUTH: &str = "user_auth";

/// Prefix for the channel name derived from a user id.
pub const CHANNEL_NAME_PREFIX: &str = "chatvault";

/// Maximum time to wait for a human to complete the login flow.
pub const DEFAULT_LOGIN_TIMEOUT: Duration = Duration::from_secs(180);

/// Interval between login polls while waiting for a human to sign in.
pub const DEFAULT_LOGIN_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Timeout for a single client-side data-store lookup.
pub const DEFAULT_LOOKUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Timeout for a navigation plus initial content load.
pub const DEFAULT_NAVIGATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Silence window after which the DOM is considered quiescent.
pub const DEFAULT_DOM_IDLE: Duration = Duration::from_millis(500);

/// Hard cap on a DOM-quiescence wait, mutations or not.
pub const DEFAULT_DOM_IDLE_CAP: Duration = Duration::from_secs(5);

/// Settle window after typing a search query, before reading results.
pub const DEFAULT_SEARCH_SETTLE: Duration = Duration::from_secs(3);

/// Delay applied to simulated clicks so the UI can keep up.
pub const DEFAULT_CLICK_DELAY: Duration = Duration::from_millis(500);

/// Per-keystroke delay for simulated typing.
pub const DEFAULT_TYPING_DELAY: Duration = Duration::from_millis(100);
