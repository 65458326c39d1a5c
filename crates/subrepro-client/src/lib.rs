//! Cached GraphQL client and the headless subscriptions view.
//!
//! Results pass through a [`NormalizedCache`] before any caller sees them.
//! With the default [`NormalizationPolicy`] the `Subscription` object type is
//! mistaken for an operation root and its rows collapse into one entry.

pub mod cache;
pub mod client;
pub mod documents;
pub mod error;
pub mod reconcile;
pub mod transport;
pub mod view;

pub use cache::{NormalizationPolicy, NormalizedCache};
pub use client::{CacheClient, FetchHandle, QueryState, QueryWatch};
pub use documents::{Operation, OperationKind, ACCOUNT_SUBSCRIPTIONS, ADD_SUBSCRIPTION};
pub use error::ClientError;
pub use reconcile::{add_subscription, ParseReconcileError, ReconcilePolicy};
pub use transport::{GraphQlRequest, HttpTransport, InProcessTransport, Transport};
pub use view::{FormState, RenderedItem, SubscriptionsApp};
