//! Headless rendition of the single-page subscriptions form.

use std::fmt::Write as _;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::warn;

use crate::client::{CacheClient, FetchHandle, QueryState, QueryWatch};
use crate::documents::ACCOUNT_SUBSCRIPTIONS;
use crate::error::ClientError;
use crate::reconcile::{self, ReconcilePolicy};

pub const TITLE: &str = "Client Cache Issue Reproduction";
pub const DESCRIPTION: &str = "When you have a business object called a Subscription, the client \
cache doesn't return your data, but also doesn't return an error or warning message";

const DEFAULT_NAME: &str = "";
const DEFAULT_PRICE: &str = "0";

/// Input pattern of the price field, anchored to the whole value.
static PRICE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9.]+$").expect("price pattern compiles"));

/// The two form inputs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormState {
    name: String,
    price: String,
}

impl Default for FormState {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            price: DEFAULT_PRICE.to_string(),
        }
    }
}

impl FormState {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn price(&self) -> &str {
        &self.price
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Keeps only digits and `.`.
    pub fn set_price(&mut self, price: &str) {
        self.price = price
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.')
            .collect();
    }

    pub fn price_matches_pattern(&self) -> bool {
        PRICE_PATTERN.is_match(&self.price)
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// One rendered list entry, keyed by row id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RenderedItem {
    pub key: String,
    pub text: String,
}

pub struct SubscriptionsApp {
    client: Arc<CacheClient>,
    reconcile: ReconcilePolicy,
    form: FormState,
    watch: Option<QueryWatch>,
    fetch: Option<FetchHandle>,
    failure: Option<ClientError>,
}

impl SubscriptionsApp {
    pub fn new(client: Arc<CacheClient>, reconcile: ReconcilePolicy) -> Self {
        Self {
            client,
            reconcile,
            form: FormState::default(),
            watch: None,
            fetch: None,
            failure: None,
        }
    }

    /// Start watching the account query. Idempotent.
    pub fn mount(&mut self) {
        if self.watch.is_none() {
            let (watch, fetch) = self.client.watch_query_with_fetch(ACCOUNT_SUBSCRIPTIONS);
            self.watch = Some(watch);
            self.fetch = fetch;
        }
    }

    pub fn state(&self) -> QueryState {
        self.watch
            .as_ref()
            .map_or(QueryState::Loading, |rx| rx.borrow().clone())
    }

    /// Wait until the account query has resolved and return its data.
    ///
    /// Fails with the fetch's error if the initial query failed. The view
    /// itself keeps rendering `Loading…` in that case.
    pub async fn ready(&mut self) -> Result<Value, ClientError> {
        self.mount();
        if let Some(e) = &self.failure {
            return Err(e.clone());
        }
        if let Some(fetch) = self.fetch.take() {
            let outcome = fetch
                .await
                .unwrap_or_else(|e| Err(ClientError::Transport(format!("query task failed: {e}"))));
            if let Err(e) = outcome {
                self.failure = Some(e.clone());
                return Err(e);
            }
        }

        let Some(rx) = self.watch.as_mut() else {
            return Err(ClientError::Transport("view is not mounted".into()));
        };
        let state = rx
            .wait_for(|s| !s.is_loading())
            .await
            .map_err(|_| ClientError::Transport("query watch closed".into()))?;
        Ok(state.data().cloned().unwrap_or(Value::Null))
    }

    pub fn form(&self) -> &FormState {
        &self.form
    }

    pub fn form_mut(&mut self) -> &mut FormState {
        &mut self.form
    }

    /// Fire the add mutation with the current inputs and clear the form
    /// without waiting for the result.
    pub fn submit(&mut self) -> JoinHandle<Result<Value, ClientError>> {
        let client = Arc::clone(&self.client);
        let policy = self.reconcile;
        let name = std::mem::take(&mut self.form.name);
        let price = std::mem::take(&mut self.form.price);
        self.form.reset();

        tokio::spawn(async move {
            let result = reconcile::add_subscription(&client, policy, &name, &price).await;
            if let Err(e) = &result {
                warn!(error = %e, "add subscription failed");
            }
            result
        })
    }

    /// Rows currently shown. Empty while loading.
    pub fn items(&self) -> Vec<RenderedItem> {
        let QueryState::Ready(data) = self.state() else {
            return Vec::new();
        };
        let Some(rows) = data
            .pointer("/account/subscriptions")
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        rows.iter()
            .map(|row| RenderedItem {
                key: scalar_text(&row["id"]),
                text: format!("{}: {}", scalar_text(&row["name"]), scalar_text(&row["price"])),
            })
            .collect()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {TITLE}");
        let _ = writeln!(out, "{DESCRIPTION}");
        let _ = writeln!(out);
        let _ = writeln!(out, "Name: [{}]", self.form.name);
        let _ = writeln!(out, "Price: [{}]", self.form.price);
        let _ = writeln!(out, "[Add subscription]");
        let _ = writeln!(out);
        let _ = writeln!(out, "## Subscriptions");
        if self.state().is_loading() {
            let _ = writeln!(out, "Loading…");
        } else {
            for item in self.items() {
                let _ = writeln!(out, "- {}", item.text);
            }
        }
        out
    }
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
