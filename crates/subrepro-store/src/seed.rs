use std::path::Path;

use serde::{Deserialize, Serialize};

use subrepro_core::{AccountId, Person, PersonId, Price, Subscription, SubscriptionId};

use crate::error::StoreError;

pub const DEFAULT_ACCOUNT_ID: &str = "myAccount";
pub const DEFAULT_ACCOUNT_NAME: &str = "Example Account";

/// The account header; its subscriptions are resolved separately.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub id: AccountId,
    pub name: String,
}

/// Rows present before any write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    pub account: AccountRecord,
    #[serde(default)]
    pub subscriptions: Vec<Subscription>,
    #[serde(default)]
    pub people: Vec<Person>,
}

impl Default for Seed {
    fn default() -> Self {
        let account_id = AccountId::from_raw(DEFAULT_ACCOUNT_ID);
        Self {
            subscriptions: vec![
                Subscription {
                    id: SubscriptionId::new(1),
                    name: "Weekly CSA Delivery".into(),
                    price: Price::from(100),
                    account_id: Some(account_id.clone()),
                },
                Subscription {
                    id: SubscriptionId::new(2),
                    name: "Weekly CSA Add-on: Apples".into(),
                    price: Price::from(10),
                    account_id: Some(account_id.clone()),
                },
            ],
            people: vec![
                Person {
                    id: PersonId::new(1),
                    name: "John Smith".into(),
                },
                Person {
                    id: PersonId::new(2),
                    name: "Sara Smith".into(),
                },
                Person {
                    id: PersonId::new(3),
                    name: "Budd Deey".into(),
                },
            ],
            account: AccountRecord {
                id: account_id,
                name: DEFAULT_ACCOUNT_NAME.into(),
            },
        }
    }
}

impl Seed {
    /// An account with no rows at all.
    pub fn empty() -> Self {
        Self {
            subscriptions: Vec::new(),
            people: Vec::new(),
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| StoreError::Io(format!("read {}: {e}", path.display())))?;
        Self::from_json(&raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_seed_has_two_subscriptions_and_three_people() {
        let seed = Seed::default();
        assert_eq!(seed.subscriptions.len(), 2);
        assert_eq!(seed.people.len(), 3);
        assert_eq!(seed.account.id.as_str(), "myAccount");
        assert!(seed
            .subscriptions
            .iter()
            .all(|s| s.account_id.as_ref() == Some(&seed.account.id)));
    }

    #[test]
    fn from_json_defaults_missing_collections() {
        let seed = Seed::from_json(r#"{"account":{"id":"acct","name":"Other"}}"#).unwrap();
        assert!(seed.subscriptions.is_empty());
        assert!(seed.people.is_empty());
        assert_eq!(seed.account.name, "Other");
    }

    #[test]
    fn from_json_accepts_mixed_prices() {
        let seed = Seed::from_json(
            r#"{
                "account": {"id": "acct", "name": "Other"},
                "subscriptions": [
                    {"id": 1, "name": "Milk", "price": 4, "account_id": "acct"},
                    {"id": 2, "name": "Bread", "price": "3.50"}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(seed.subscriptions[0].price, Price::from(4));
        assert_eq!(seed.subscriptions[1].price, Price::Text("3.50".into()));
        assert!(seed.subscriptions[1].account_id.is_none());
    }

    #[test]
    fn from_json_accepts_fractional_prices() {
        let seed = Seed::from_json(
            r#"{"account":{"id":"acct","name":"Other"},"subscriptions":[{"id":1,"name":"Milk","price":4.5}]}"#,
        )
        .unwrap();
        assert_eq!(seed.subscriptions[0].price.to_string(), "4.5");
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = Seed::from_path(Path::new("/nonexistent/seed.json")).unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }

    #[test]
    fn malformed_json_is_a_serialization_error() {
        let err = Seed::from_json("{").unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
