//! Cache key builders for Fleetdesk
//!
//! # Key Patterns
//!
//! - `recent_searches:{agency_id}` - Newest-first list of an agency's guest searches
//!
//! # Example
//!
//! ```
//! use fleetdesk_cache::keys;
//! use uuid::Uuid;
//!
//! let key = keys::recent_searches_key(Uuid::nil());
//! assert_eq!(key, "recent_searches:00000000-0000-0000-0000-000000000000");
//! ```

use uuid::Uuid;

/// Prefix for recent guest searches
///
/// Format: `recent_searches:{agency_id}`
pub const RECENT_SEARCHES_PREFIX: &str = "recent_searches";

/// Build the recent-searches list key of an agency
pub fn recent_searches_key(agency_id: Uuid) -> String {
    format!("{}:{}", RECENT_SEARCHES_PREFIX, agency_id)
}
