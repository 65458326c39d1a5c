//! GraphQL type graph over the resolver store.
//!
//! - [`QueryRoot`]: `people`, `account`, `subscriptions`
//! - [`MutationRoot`]: `addSubscription`, `addPerson`
//!
//! The object type for subscription rows is named `Subscription` on the
//! wire. The schema has no subscription operation root.

mod mutation;
mod query;
mod types;

pub use mutation::MutationRoot;
pub use query::QueryRoot;
pub use types::{AccountNode, PersonNode, SubscriptionNode};

use async_graphql::extensions::Tracing;
use async_graphql::{EmptySubscription, Schema};
use subrepro_store::Store;

pub type ReproSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the schema with the given store injected as context data.
pub fn build_schema(store: Store) -> ReproSchema {
    tracing::debug!(account_scope = %store.account_scope(), "building schema");
    Schema::build(QueryRoot, MutationRoot, EmptySubscription)
        .data(store)
        .extension(Tracing)
        .finish()
}
