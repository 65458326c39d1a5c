use std::fmt;
use std::str::FromStr;

use serde_json::{json, Value};
use tracing::debug;

use crate::client::CacheClient;
use crate::documents::{ACCOUNT_SUBSCRIPTIONS, ADD_SUBSCRIPTION};
use crate::error::ClientError;

/// How the account view catches up with a successful add.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReconcilePolicy {
    /// Append the mutation result to the cached account list. No refetch,
    /// so the view can drift from what the server would return.
    #[default]
    MergeIntoCache,
    /// Re-run the account query and take the server's answer.
    Refetch,
}

impl fmt::Display for ReconcilePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReconcilePolicy::MergeIntoCache => f.write_str("merge"),
            ReconcilePolicy::Refetch => f.write_str("refetch"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown reconcile policy: {0}")]
pub struct ParseReconcileError(String);

impl FromStr for ReconcilePolicy {
    type Err = ParseReconcileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "merge" | "merge_into_cache" => Ok(ReconcilePolicy::MergeIntoCache),
            "refetch" => Ok(ReconcilePolicy::Refetch),
            other => Err(ParseReconcileError(other.to_string())),
        }
    }
}

/// Run the add-subscription mutation and reconcile the account view.
/// Returns the added row as the server sent it.
pub async fn add_subscription(
    client: &CacheClient,
    policy: ReconcilePolicy,
    name: &str,
    price: &str,
) -> Result<Value, ClientError> {
    let data = client
        .mutate(&ADD_SUBSCRIPTION, json!({"name": name, "price": price}))
        .await?;
    let added = data.get("addSubscription").cloned().unwrap_or(Value::Null);

    match policy {
        ReconcilePolicy::MergeIntoCache => {
            let Some(mut cached) = client.read_query(&ACCOUNT_SUBSCRIPTIONS) else {
                debug!("account not cached, nothing to merge");
                return Ok(added);
            };
            if let Some(rows) = cached
                .pointer_mut("/account/subscriptions")
                .and_then(Value::as_array_mut)
            {
                rows.push(added.clone());
            }
            client.write_query(&ACCOUNT_SUBSCRIPTIONS, &cached);
        }
        ReconcilePolicy::Refetch => {
            client.fetch_query(&ACCOUNT_SUBSCRIPTIONS).await?;
        }
    }
    Ok(added)
}
