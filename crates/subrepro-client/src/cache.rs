//! Normalized result cache.
//!
//! Objects that can be identified are stored once under a cache id and
//! replaced in their parent by `{"__ref": id}`. Reads follow the refs back.
//!
//! An object's cache id is decided by [`NormalizationPolicy`]:
//! - `__typename` listed as a root operation typename: the root id, whatever
//!   the object's own id is
//! - otherwise `"{__typename}:{id}"`
//! - no `__typename` or no id: not identifiable, stored inline
//!
//! The default policy treats `Subscription` as the subscription operation
//! root, so every object whose type is literally named `Subscription` is
//! stored under one cache id. Each row written overwrites the previous one
//! and every list of them reads back as the last row repeated.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::documents::{Operation, OperationKind};

pub const REF_KEY: &str = "__ref";
pub const TYPENAME_KEY: &str = "__typename";

pub const ROOT_QUERY: &str = "ROOT_QUERY";
pub const ROOT_MUTATION: &str = "ROOT_MUTATION";
pub const ROOT_SUBSCRIPTION: &str = "ROOT_SUBSCRIPTION";

/// How objects are mapped to cache ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NormalizationPolicy {
    /// (typename, root id) pairs.
    root_typenames: Vec<(String, String)>,
    id_field: String,
}

impl Default for NormalizationPolicy {
    fn default() -> Self {
        Self {
            root_typenames: vec![
                ("Query".into(), ROOT_QUERY.into()),
                ("Mutation".into(), ROOT_MUTATION.into()),
                ("Subscription".into(), ROOT_SUBSCRIPTION.into()),
            ],
            id_field: "id".into(),
        }
    }
}

impl NormalizationPolicy {
    /// Stop treating `Subscription` as an operation root, so rows of that
    /// type are keyed by their own id.
    pub fn without_subscription_root(mut self) -> Self {
        self.root_typenames.retain(|(t, _)| t != "Subscription");
        self
    }

    pub fn root_id(&self, typename: &str) -> Option<&str> {
        self.root_typenames
            .iter()
            .find(|(t, _)| t == typename)
            .map(|(_, id)| id.as_str())
    }

    /// Cache id for the root of an operation's result.
    pub fn operation_root(&self, kind: OperationKind) -> String {
        let (typename, fallback) = match kind {
            OperationKind::Query => ("Query", ROOT_QUERY),
            OperationKind::Mutation => ("Mutation", ROOT_MUTATION),
        };
        self.root_id(typename).unwrap_or(fallback).to_string()
    }

    /// Cache id for an object, if it has one.
    pub fn identify(&self, object: &Map<String, Value>) -> Option<String> {
        let typename = object.get(TYPENAME_KEY)?.as_str()?;
        if let Some(root) = self.root_id(typename) {
            return Some(root.to_string());
        }
        let id = match object.get(&self.id_field)? {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        Some(format!("{typename}:{id}"))
    }
}

/// Entity store keyed by cache id.
pub struct NormalizedCache {
    policy: NormalizationPolicy,
    entities: HashMap<String, Map<String, Value>>,
}

impl NormalizedCache {
    pub fn new(policy: NormalizationPolicy) -> Self {
        Self {
            policy,
            entities: HashMap::new(),
        }
    }

    /// Normalize an operation result into the cache. Incoming fields
    /// overwrite existing ones on the same entity. Non-object data is ignored.
    pub fn write_query(&mut self, operation: &Operation, data: &Value) {
        let Some(fields) = data.as_object() else {
            return;
        };

        let root = self.policy.operation_root(operation.kind);
        let mut normalized = Map::new();
        for (key, value) in fields {
            normalized.insert(key.clone(), self.normalize(value));
        }
        self.merge(&root, normalized);

        debug!(
            operation = operation.name,
            root = %root,
            entities = self.entities.len(),
            "cache write"
        );
    }

    /// Read an operation's result back from the cache. `None` if any of the
    /// operation's root fields has never been written.
    pub fn read_query(&self, operation: &Operation) -> Option<Value> {
        let root_id = self.policy.operation_root(operation.kind);
        let root = self.entities.get(&root_id)?;

        let mut out = Map::new();
        for field in operation.root_fields {
            let value = root.get(*field)?;
            let mut path = vec![root_id.clone()];
            out.insert(field.to_string(), self.denormalize(value, &mut path));
        }
        Some(Value::Object(out))
    }

    /// All cache ids, sorted.
    pub fn entity_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.entities.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn normalize(&mut self, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.iter().map(|v| self.normalize(v)).collect()),
            Value::Object(object) => {
                let mut fields = Map::new();
                for (key, child) in object {
                    fields.insert(key.clone(), self.normalize(child));
                }
                match self.policy.identify(object) {
                    Some(id) => {
                        self.merge(&id, fields);
                        reference(&id)
                    }
                    None => Value::Object(fields),
                }
            }
            other => other.clone(),
        }
    }

    fn merge(&mut self, id: &str, fields: Map<String, Value>) {
        self.entities.entry(id.to_string()).or_default().extend(fields);
    }

    fn denormalize(&self, value: &Value, path: &mut Vec<String>) -> Value {
        match value {
            Value::Array(items) => {
                Value::Array(items.iter().map(|v| self.denormalize(v, path)).collect())
            }
            Value::Object(object) => {
                if let Some(id) = ref_id(object) {
                    // Cycles are left as refs
                    if path.iter().any(|p| p == id) {
                        return value.clone();
                    }
                    let Some(entity) = self.entities.get(id) else {
                        return Value::Null;
                    };
                    path.push(id.to_string());
                    let resolved = self.denormalize_fields(entity, path);
                    path.pop();
                    return resolved;
                }
                self.denormalize_fields(object, path)
            }
            other => other.clone(),
        }
    }

    fn denormalize_fields(&self, fields: &Map<String, Value>, path: &mut Vec<String>) -> Value {
        let mut out = Map::new();
        for (key, child) in fields {
            out.insert(key.clone(), self.denormalize(child, path));
        }
        Value::Object(out)
    }
}

fn reference(id: &str) -> Value {
    let mut map = Map::new();
    map.insert(REF_KEY.to_string(), Value::String(id.to_string()));
    Value::Object(map)
}

fn ref_id(object: &Map<String, Value>) -> Option<&str> {
    if object.len() != 1 {
        return None;
    }
    object.get(REF_KEY)?.as_str()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::{ACCOUNT_SUBSCRIPTIONS, ADD_SUBSCRIPTION};
    use serde_json::json;

    fn account_data() -> Value {
        json!({
            "account": {
                "__typename": "Account",
                "id": "myAccount",
                "name": "Example Account",
                "subscriptions": [
                    {"__typename": "Subscription", "id": "1", "name": "Weekly CSA Delivery", "price": "100"},
                    {"__typename": "Subscription", "id": "2", "name": "Weekly CSA Add-on: Apples", "price": "10"}
                ]
            }
        })
    }

    fn names(data: &Value) -> Vec<String> {
        data["account"]["subscriptions"]
            .as_array()
            .unwrap()
            .iter()
            .map(|s| s["name"].as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn identify_by_typename_and_id() {
        let policy = NormalizationPolicy::default();
        let obj = json!({"__typename": "Account", "id": "myAccount"});
        assert_eq!(
            policy.identify(obj.as_object().unwrap()).as_deref(),
            Some("Account:myAccount")
        );

        let numeric = json!({"__typename": "Person", "id": 4});
        assert_eq!(
            policy.identify(numeric.as_object().unwrap()).as_deref(),
            Some("Person:4")
        );
    }

    #[test]
    fn objects_without_identity_are_not_identified() {
        let policy = NormalizationPolicy::default();
        assert!(policy.identify(json!({"id": "1"}).as_object().unwrap()).is_none());
        assert!(policy
            .identify(json!({"__typename": "Account"}).as_object().unwrap())
            .is_none());
    }

    #[test]
    fn default_policy_maps_subscription_rows_to_root() {
        let policy = NormalizationPolicy::default();
        let row = json!({"__typename": "Subscription", "id": "7"});
        assert_eq!(
            policy.identify(row.as_object().unwrap()).as_deref(),
            Some(ROOT_SUBSCRIPTION)
        );

        let keyed = NormalizationPolicy::default().without_subscription_root();
        assert_eq!(
            keyed.identify(row.as_object().unwrap()).as_deref(),
            Some("Subscription:7")
        );
        assert_eq!(keyed.root_id("Query"), Some(ROOT_QUERY));
    }

    #[test]
    fn keyed_policy_round_trips_the_account_query() {
        let mut cache = NormalizedCache::new(NormalizationPolicy::default().without_subscription_root());
        cache.write_query(&ACCOUNT_SUBSCRIPTIONS, &account_data());

        assert_eq!(cache.read_query(&ACCOUNT_SUBSCRIPTIONS), Some(account_data()));
        assert_eq!(
            cache.entity_ids(),
            ["Account:myAccount", "ROOT_QUERY", "Subscription:1", "Subscription:2"]
        );
    }

    #[test]
    fn default_policy_repeats_the_last_row() {
        let mut cache = NormalizedCache::new(NormalizationPolicy::default());
        cache.write_query(&ACCOUNT_SUBSCRIPTIONS, &account_data());

        let read = cache.read_query(&ACCOUNT_SUBSCRIPTIONS).unwrap();
        assert_eq!(
            names(&read),
            ["Weekly CSA Add-on: Apples", "Weekly CSA Add-on: Apples"]
        );
        assert_eq!(
            cache.entity_ids(),
            ["Account:myAccount", "ROOT_QUERY", "ROOT_SUBSCRIPTION"]
        );
    }

    #[test]
    fn mutation_result_overwrites_collided_rows() {
        let mut cache = NormalizedCache::new(NormalizationPolicy::default());
        cache.write_query(&ACCOUNT_SUBSCRIPTIONS, &account_data());
        cache.write_query(
            &ADD_SUBSCRIPTION,
            &json!({"addSubscription": {"__typename": "Subscription", "id": "3", "name": "Eggs", "price": "5"}}),
        );

        let read = cache.read_query(&ACCOUNT_SUBSCRIPTIONS).unwrap();
        assert_eq!(names(&read), ["Eggs", "Eggs"]);
        assert!(cache.entities.get(ROOT_MUTATION).is_some());
    }

    #[test]
    fn mutation_result_leaves_keyed_rows_alone() {
        let mut cache = NormalizedCache::new(NormalizationPolicy::default().without_subscription_root());
        cache.write_query(&ACCOUNT_SUBSCRIPTIONS, &account_data());
        cache.write_query(
            &ADD_SUBSCRIPTION,
            &json!({"addSubscription": {"__typename": "Subscription", "id": "3", "name": "Eggs", "price": "5"}}),
        );

        let read = cache.read_query(&ACCOUNT_SUBSCRIPTIONS).unwrap();
        assert_eq!(names(&read), ["Weekly CSA Delivery", "Weekly CSA Add-on: Apples"]);
        assert_eq!(cache.entities.get("Subscription:3").unwrap()["name"], "Eggs");
    }

    #[test]
    fn entity_fields_merge_incoming_wins() {
        let mut cache = NormalizedCache::new(NormalizationPolicy::default().without_subscription_root());
        cache.write_query(&ACCOUNT_SUBSCRIPTIONS, &account_data());
        cache.write_query(
            &ACCOUNT_SUBSCRIPTIONS,
            &json!({"account": {"__typename": "Account", "id": "myAccount", "name": "Renamed"}}),
        );

        let account = cache.entities.get("Account:myAccount").unwrap();
        assert_eq!(account["name"], "Renamed");
        // Field not present in the second write survives
        assert!(account.contains_key("subscriptions"));
    }

    #[test]
    fn read_before_write_is_none() {
        let cache = NormalizedCache::new(NormalizationPolicy::default());
        assert!(cache.read_query(&ACCOUNT_SUBSCRIPTIONS).is_none());
    }

    #[test]
    fn unidentified_objects_are_stored_inline() {
        let mut cache = NormalizedCache::new(NormalizationPolicy::default());
        let data = json!({"account": {"name": "No typename", "subscriptions": []}});
        cache.write_query(&ACCOUNT_SUBSCRIPTIONS, &data);
        assert_eq!(cache.read_query(&ACCOUNT_SUBSCRIPTIONS), Some(data));
        assert_eq!(cache.entity_ids(), ["ROOT_QUERY"]);
    }

    #[test]
    fn self_referencing_root_does_not_loop() {
        let mut cache = NormalizedCache::new(NormalizationPolicy::default());
        cache.write_query(
            &ACCOUNT_SUBSCRIPTIONS,
            &json!({"account": {"__typename": "Query", "name": "root"}}),
        );

        let read = cache.read_query(&ACCOUNT_SUBSCRIPTIONS).unwrap();
        assert_eq!(read["account"], json!({"__ref": ROOT_QUERY}));
    }
}
