/// Operation type of a document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
}

/// A named GraphQL document plus the root fields its result carries, which
/// is what the cache needs to read the result back.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub kind: OperationKind,
    pub source: &'static str,
    pub root_fields: &'static [&'static str],
}

// Every selection set asks for __typename so results can be normalized.

pub const ACCOUNT_SUBSCRIPTIONS: Operation = Operation {
    name: "AccountSubscriptions",
    kind: OperationKind::Query,
    source: r#"
query AccountSubscriptions {
  account {
    __typename
    id
    name
    subscriptions {
      __typename
      id
      name
      price
    }
  }
}
"#,
    root_fields: &["account"],
};

pub const ADD_SUBSCRIPTION: Operation = Operation {
    name: "AddSubscription",
    kind: OperationKind::Mutation,
    source: r#"
mutation AddSubscription($name: String, $price: String) {
  addSubscription(name: $name, price: $price) {
    __typename
    id
    name
    price
  }
}
"#,
    root_fields: &["addSubscription"],
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn documents_declare_their_own_name() {
        for op in [ACCOUNT_SUBSCRIPTIONS, ADD_SUBSCRIPTION] {
            assert!(op.source.contains(op.name), "{}", op.name);
            for field in op.root_fields {
                assert!(op.source.contains(field));
            }
        }
    }

    #[test]
    fn kinds_match_source() {
        assert_eq!(ACCOUNT_SUBSCRIPTIONS.kind, OperationKind::Query);
        assert!(ACCOUNT_SUBSCRIPTIONS.source.trim_start().starts_with("query"));
        assert_eq!(ADD_SUBSCRIPTION.kind, OperationKind::Mutation);
        assert!(ADD_SUBSCRIPTION.source.trim_start().starts_with("mutation"));
    }
}
