use serde::{Deserialize, Serialize};

/// How the account's `subscriptions` field is resolved.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountScope {
    /// Every row in the live collection, account ids ignored.
    #[default]
    FullCollection,
    /// Only rows whose account id matches the account.
    FilteredByAccount,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown account scope: {0}")]
pub struct ParseScopeError(String);

impl std::fmt::Display for AccountScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FullCollection => write!(f, "full"),
            Self::FilteredByAccount => write!(f, "filtered"),
        }
    }
}

impl std::str::FromStr for AccountScope {
    type Err = ParseScopeError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "full" | "full_collection" => Ok(Self::FullCollection),
            "filtered" | "filtered_by_account" => Ok(Self::FilteredByAccount),
            other => Err(ParseScopeError(other.to_string())),
        }
    }
}
