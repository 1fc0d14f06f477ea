//! Entity capability trait shared by every picker.
//!
//! The picker never interprets business fields on its own. Everything it needs
//! to know about a record (identity, display text, searchable fields, and the
//! handful of domain flags the predicate pipeline can test) is exposed here.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Customer tier, ordered from lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Tier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl Tier {
    pub fn label(&self) -> &'static str {
        match self {
            Tier::Bronze => "Bronze",
            Tier::Silver => "Silver",
            Tier::Gold => "Gold",
            Tier::Platinum => "Platinum",
        }
    }
}

/// A record that can be searched and selected.
///
/// Only `id`, `display_name` and `field` are required. The remaining hooks
/// default to permissive answers so entity types without a notion of, say,
/// blacklisting pass those predicates untouched. The exception is `tier`:
/// an entity without a tier never satisfies a minimum-tier predicate.
pub trait Entity: Clone + Send + Sync + 'static {
    /// Key the recent-selection list is stored under, unless configured.
    const RECENT_KEY: &'static str = "recentItems";

    /// Stable identifier.
    fn id(&self) -> &str;

    /// Primary display field (used for tie-breaking and the input text).
    fn display_name(&self) -> &str;

    /// Look up a named field for matching or predicate evaluation.
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;

    fn is_active(&self) -> bool {
        true
    }

    fn is_blacklisted(&self) -> bool {
        false
    }

    fn tier(&self) -> Option<Tier> {
        None
    }

    fn has_transaction_history(&self) -> bool {
        true
    }
}
