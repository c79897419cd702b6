//! Shared User-Agent string for search and download HTTP clients.
//!
//! Both clients identify the tool the same way so the archive's operators can
//! attribute bulk traffic (good citizenship; RFC 9308).

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/harvester";

/// Default User-Agent for every request the harvester makes.
#[must_use]
pub(crate) fn default_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("harvester/{version} (collection-harvest; +{PROJECT_UA_URL})")
}
