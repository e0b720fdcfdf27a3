//! CSS selectors of the host app's "K" front-end.
//!
//! Pure configuration data. The host app ships obfuscated class names that
//! change between builds; keeping every selector here means a UI change is
//! a one-file fix.

/// One populated entry of the chat list; presence signals content load.
pub const CHAT_LIST_ITEM: &str = "ul.chatlist > a";

/// The global search input on the home page.
pub const SEARCH_INPUT: &str = ".sidebar-header .input-search input";

/// Labels of entries in the search helper list.
pub const SEARCH_RESULT_LABEL: &str = ".search-super .chatlist .peer-title";

/// Back button that leaves search and returns to the home chat list.
pub const BACK_TO_HOME_BUTTON: &str = ".sidebar-header .sidebar-back-button";

/// The pencil/compose button opening the creation menu.
pub const COMPOSE_BUTTON: &str = ".new-menu .btn-menu-toggle";

/// "New Channel" entry inside the creation menu.
pub const NEW_CHANNEL_ITEM: &str = ".new-menu .btn-menu-item.menu-new-channel";

/// Editable name field of the channel-creation form.
pub const CHANNEL_NAME_INPUT: &str = ".new-channel-container .input-field-input";

/// Floating confirm (arrow) button of the channel-creation form.
pub const CONFIRM_BUTTON: &str = ".new-channel-container .btn-corner";

/// Selector for a chat entry by its stable peer identifier.
pub fn peer_selector(peer_id: &str) -> String {
    format!("[data-peer-id=\"{peer_id}\"]")
}
