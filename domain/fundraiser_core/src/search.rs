//! Query and listing helpers.

use crate::rbac::Operation;
use crate::FundraiserStatus;

/// A non-empty, trimmed search term.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery(String);

impl SearchQuery {
    /// `None` for a missing or blank query; callers answer with an empty
    /// result set instead of every record.
    pub fn parse(raw: Option<&str>) -> Option<SearchQuery> {
        let term = raw?.trim();
        if term.is_empty() {
            None
        } else {
            Some(SearchQuery(term.to_string()))
        }
    }

    pub fn term(&self) -> &str {
        &self.0
    }

    /// Case-insensitive substring match against any of `fields`.
    /// Case is folded with full Unicode rules; `%` and `_` are literal.
    pub fn matches(&self, fields: &[&str]) -> bool {
        let needle = self.0.to_lowercase();
        fields.iter().any(|f| f.to_lowercase().contains(&needle))
    }
}

/// Status-filtered listings and who may see them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Listing {
    Pending,
    Verified,
    Published,
}

impl Listing {
    pub fn status(&self) -> FundraiserStatus {
        match self {
            Listing::Pending => FundraiserStatus::Pending,
            Listing::Verified => FundraiserStatus::Verified,
            Listing::Published => FundraiserStatus::Published,
        }
    }

    /// Gate for the listing, `None` when it is public.
    pub fn operation(&self) -> Option<Operation> {
        match self {
            Listing::Pending => Some(Operation::ListPending),
            Listing::Verified => Some(Operation::ListVerified),
            Listing::Published => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_queries_are_rejected() {
        assert_eq!(SearchQuery::parse(None), None);
        assert_eq!(SearchQuery::parse(Some("")), None);
        assert_eq!(SearchQuery::parse(Some("   ")), None);
    }

    #[test]
    fn matching_folds_case_beyond_ascii() {
        let q = SearchQuery::parse(Some(" médical ")).unwrap();
        assert_eq!(q.term(), "médical");
        assert!(q.matches(&["Help Ana", "Médical"]));
        assert!(q.matches(&["FRAIS MÉDICAUX et MÉDICAL", "Other"]));
        assert!(!q.matches(&["Medical", "Education"]));
    }

    #[test]
    fn wildcards_match_literally() {
        let q = SearchQuery::parse(Some("100%_sure")).unwrap();
        assert!(q.matches(&["We are 100%_sure", ""]));
        assert!(!q.matches(&["100 percent sure", ""]));
    }

    #[test]
    fn only_published_listing_is_public() {
        assert_eq!(Listing::Published.operation(), None);
        assert_eq!(Listing::Pending.operation(), Some(Operation::ListPending));
        assert_eq!(Listing::Verified.status(), FundraiserStatus::Verified);
    }
}
