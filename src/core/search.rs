//! Relevance filtering and ranking - pure, platform-agnostic search logic.
//!
//! [`RelevanceFilter::filter_and_rank`] is the instant local pre-filter over
//! the last known items. [`RelevanceFilter::rank`] orders the authoritative
//! server page without dropping anything the server matched.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::entity::{Entity, Tier};

/// Domain predicate applied before term matching.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Predicate {
    /// Drop inactive records
    ActiveOnly,

    /// Drop blacklisted records
    ExcludeBlacklisted,

    /// Keep records whose tier is at least `tier`
    MinimumTier { tier: Tier },

    /// Keep records with at least one past transaction
    RequireTransactionHistory,

    /// Case-insensitive equality on a named field
    FieldEquals { field: String, value: String },

    /// Case-insensitive membership of a named field in `values`
    FieldIn { field: String, values: Vec<String> },
}

impl Predicate {
    pub fn matches<E: Entity>(&self, item: &E) -> bool {
        match self {
            Predicate::ActiveOnly => item.is_active(),
            Predicate::ExcludeBlacklisted => !item.is_blacklisted(),
            Predicate::MinimumTier { tier } => item.tier().is_some_and(|t| t >= *tier),
            Predicate::RequireTransactionHistory => item.has_transaction_history(),
            Predicate::FieldEquals { field, value } => item
                .field(field)
                .is_some_and(|v| v.eq_ignore_ascii_case(value)),
            Predicate::FieldIn { field, values } => item
                .field(field)
                .is_some_and(|v| values.iter().any(|allowed| v.eq_ignore_ascii_case(allowed))),
        }
    }
}

/// Caller-supplied predicate for checks the built-in set can't express.
pub type CustomPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// How well an item matched the term. Ordered best first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchKind {
    Exact,
    Prefix,
    Substring,
}

/// Search fields plus a predicate pipeline for one entity type.
pub struct RelevanceFilter<E> {
    search_fields: Vec<String>,
    predicates: Vec<Predicate>,
    custom: Vec<CustomPredicate<E>>,
}

impl<E> Clone for RelevanceFilter<E> {
    fn clone(&self) -> Self {
        Self {
            search_fields: self.search_fields.clone(),
            predicates: self.predicates.clone(),
            custom: self.custom.clone(),
        }
    }
}

impl<E> fmt::Debug for RelevanceFilter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelevanceFilter")
            .field("search_fields", &self.search_fields)
            .field("predicates", &self.predicates)
            .field("custom", &self.custom.len())
            .finish()
    }
}

impl<E: Entity> RelevanceFilter<E> {
    /// Create a filter matching on the given fields.
    ///
    /// With no fields, the display name is matched.
    pub fn new<I, S>(search_fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            search_fields: search_fields.into_iter().map(Into::into).collect(),
            predicates: Vec::new(),
            custom: Vec::new(),
        }
    }

    pub fn with_predicates(mut self, predicates: impl IntoIterator<Item = Predicate>) -> Self {
        self.predicates.extend(predicates);
        self
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn with_custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.custom.push(Arc::new(predicate));
        self
    }

    pub fn search_fields(&self) -> &[String] {
        &self.search_fields
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Check an item against every predicate (AND).
    pub fn admits(&self, item: &E) -> bool {
        self.predicates.iter().all(|p| p.matches(item)) && self.custom.iter().all(|p| p(item))
    }

    /// Best match of an already-normalized term across the search fields.
    pub fn match_kind(&self, item: &E, term_lower: &str) -> Option<MatchKind> {
        if self.search_fields.is_empty() {
            return classify(item.display_name(), term_lower);
        }

        self.search_fields
            .iter()
            .filter_map(|name| item.field(name))
            .filter_map(|value| classify(&value, term_lower))
            .min()
    }

    /// Filter by predicates, then drop and rank by term relevance.
    ///
    /// An empty (or whitespace) term keeps input order.
    pub fn filter_and_rank(&self, items: &[E], term: &str) -> Vec<E> {
        let term_lower = term.trim().to_lowercase();
        let admitted = items.iter().filter(|item| self.admits(item));

        if term_lower.is_empty() {
            return admitted.cloned().collect();
        }

        let mut scored: Vec<(MatchKind, String, &E)> = admitted
            .filter_map(|item| {
                let kind = self.match_kind(item, &term_lower)?;
                Some((kind, item.display_name().to_lowercase(), item))
            })
            .collect();

        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        scored.into_iter().map(|(_, _, item)| item.clone()).collect()
    }

    /// Filter by predicates and order by term relevance, keeping items that
    /// don't match the term locally.
    ///
    /// The server may match on fields outside `search_fields`; those items
    /// follow the local matches in their original order.
    pub fn rank(&self, items: &[E], term: &str) -> Vec<E> {
        let term_lower = term.trim().to_lowercase();
        let admitted = items.iter().filter(|item| self.admits(item));

        if term_lower.is_empty() {
            return admitted.cloned().collect();
        }

        let mut scored: Vec<(MatchKind, String, &E)> = Vec::new();
        let mut rest: Vec<&E> = Vec::new();
        for item in admitted {
            match self.match_kind(item, &term_lower) {
                Some(kind) => scored.push((kind, item.display_name().to_lowercase(), item)),
                None => rest.push(item),
            }
        }

        scored.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        scored
            .into_iter()
            .map(|(_, _, item)| item)
            .chain(rest)
            .cloned()
            .collect()
    }
}

fn classify(value: &str, term_lower: &str) -> Option<MatchKind> {
    let value = value.to_lowercase();
    if value == term_lower {
        Some(MatchKind::Exact)
    } else if value.starts_with(term_lower) {
        Some(MatchKind::Prefix)
    } else if value.contains(term_lower) {
        Some(MatchKind::Substring)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    #[derive(Debug, Clone, PartialEq)]
    struct Item {
        id: &'static str,
        name: &'static str,
        code: &'static str,
        active: bool,
        tier: Option<Tier>,
    }

    impl Entity for Item {
        fn id(&self) -> &str {
            self.id
        }

        fn display_name(&self) -> &str {
            self.name
        }

        fn field(&self, name: &str) -> Option<Cow<'_, str>> {
            match name {
                "name" => Some(Cow::Borrowed(self.name)),
                "code" => Some(Cow::Borrowed(self.code)),
                _ => None,
            }
        }

        fn is_active(&self) -> bool {
            self.active
        }

        fn tier(&self) -> Option<Tier> {
            self.tier
        }
    }

    fn item(id: &'static str, name: &'static str, code: &'static str) -> Item {
        Item {
            id,
            name,
            code,
            active: true,
            tier: None,
        }
    }

    fn ids(items: &[Item]) -> Vec<&str> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn test_empty_term_keeps_input_order() {
        let filter = RelevanceFilter::new(["name"]);
        let items = vec![item("2", "Zeta", "Z1"), item("1", "Alpha", "A1")];
        assert_eq!(ids(&filter.filter_and_rank(&items, "   ")), vec!["2", "1"]);
    }

    #[test]
    fn test_ranks_exact_then_prefix_then_substring() {
        let filter = RelevanceFilter::new(["name", "code"]);
        let items = vec![
            item("sub", "Big Acme Depot", "D1"),
            item("prefix", "Acme Corporation", "C1"),
            item("exact", "Acme", "X1"),
            item("none", "Global Supplies", "G1"),
        ];

        let ranked = filter.filter_and_rank(&items, "ACME");
        assert_eq!(ids(&ranked), vec!["exact", "prefix", "sub"]);
    }

    #[test]
    fn test_best_field_wins() {
        let filter = RelevanceFilter::new(["name", "code"]);
        let items = vec![
            item("by-name", "Northern Acme", "N1"),
            item("by-code", "Widgets Ltd", "ACME001"),
        ];

        // Code is a prefix match, name only a substring match.
        let ranked = filter.filter_and_rank(&items, "acme");
        assert_eq!(ids(&ranked), vec!["by-code", "by-name"]);
    }

    #[test]
    fn test_ties_break_alphabetically_by_display_name() {
        let filter = RelevanceFilter::new(["name"]);
        let items = vec![
            item("c", "acme zulu", "1"),
            item("a", "Acme alpha", "2"),
            item("b", "acme Mike", "3"),
        ];

        assert_eq!(ids(&filter.filter_and_rank(&items, "acme")), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_rank_keeps_items_matched_elsewhere() {
        let mut blocked = item("blocked", "Acme Blocked", "B1");
        blocked.active = false;
        let filter = RelevanceFilter::new(["name"]).with_predicate(Predicate::ActiveOnly);
        let page = vec![
            item("email", "Northwind Traders", "N1"),
            item("sub", "Big Acme Depot", "D1"),
            blocked,
            item("other", "Contoso", "C1"),
            item("exact", "Acme", "A1"),
        ];

        assert_eq!(
            ids(&filter.rank(&page, "acme")),
            vec!["exact", "sub", "email", "other"]
        );
        assert_eq!(ids(&filter.filter_and_rank(&page, "acme")), vec!["exact", "sub"]);
    }

    #[test]
    fn test_predicates_compose_with_and() {
        let mut inactive = item("inactive", "Acme Gold", "1");
        inactive.active = false;
        inactive.tier = Some(Tier::Gold);

        let mut bronze = item("bronze", "Acme Bronze", "2");
        bronze.tier = Some(Tier::Bronze);

        let mut platinum = item("platinum", "Acme Platinum", "3");
        platinum.tier = Some(Tier::Platinum);

        let untiered = item("untiered", "Acme None", "4");

        let filter = RelevanceFilter::new(["name"])
            .with_predicate(Predicate::MinimumTier { tier: Tier::Silver })
            .with_predicate(Predicate::ActiveOnly);

        let items = vec![inactive, bronze, platinum, untiered];
        assert_eq!(ids(&filter.filter_and_rank(&items, "")), vec!["platinum"]);
    }

    #[test]
    fn test_field_predicates_are_case_insensitive() {
        let filter: RelevanceFilter<Item> = RelevanceFilter::new(["name"]).with_predicate(
            Predicate::FieldIn {
                field: "code".into(),
                values: vec!["wh1".into(), "st2".into()],
            },
        );
        let items = vec![item("1", "A", "WH1"), item("2", "B", "XX"), item("3", "C", "St2")];
        assert_eq!(ids(&filter.filter_and_rank(&items, "")), vec!["1", "3"]);

        let equals: RelevanceFilter<Item> = RelevanceFilter::new(["name"]).with_predicate(
            Predicate::FieldEquals {
                field: "missing".into(),
                value: "x".into(),
            },
        );
        assert!(equals.filter_and_rank(&items, "").is_empty());
    }

    #[test]
    fn test_custom_predicate() {
        let filter = RelevanceFilter::new(["name"]).with_custom(|i: &Item| i.code.starts_with('A'));
        let items = vec![item("1", "One", "A1"), item("2", "Two", "B1")];
        assert_eq!(ids(&filter.filter_and_rank(&items, "")), vec!["1"]);
    }

    #[test]
    fn test_no_search_fields_falls_back_to_display_name() {
        let filter: RelevanceFilter<Item> = RelevanceFilter::new(Vec::<String>::new());
        let items = vec![item("1", "Acme", "ZZZ"), item("2", "Other", "ACME")];
        assert_eq!(ids(&filter.filter_and_rank(&items, "acme")), vec!["1"]);
    }

    #[test]
    fn test_predicate_serde_shape() {
        let p: Predicate = toml::from_str("kind = \"minimum_tier\"\ntier = \"GOLD\"").unwrap();
        assert_eq!(p, Predicate::MinimumTier { tier: Tier::Gold });
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        const NAMES: [&str; 6] = ["Acme", "acme corp", "Global", "Bacme", "Zed", "ACMEX"];

        proptest! {
            #[test]
            fn ranked_output_is_a_matching_subset(
                picks in proptest::collection::vec(0usize..NAMES.len(), 0..20),
                term in "[a-z]{0,4}",
            ) {
                let items: Vec<Item> = picks.iter().map(|&i| item("x", NAMES[i], "c")).collect();
                let filter = RelevanceFilter::new(["name"]);
                let ranked = filter.filter_and_rank(&items, &term);

                prop_assert!(ranked.len() <= items.len());
                for r in &ranked {
                    prop_assert!(r.name.to_lowercase().contains(&term));
                }
                let kinds: Vec<MatchKind> = ranked
                    .iter()
                    .filter_map(|r| filter.match_kind(r, &term))
                    .collect();
                prop_assert!(kinds.windows(2).all(|w| w[0] <= w[1]));
            }
        }
    }
}
