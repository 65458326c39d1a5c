use tracing::{debug, instrument};

use subrepro_core::{Price, Subscription, SubscriptionId};

use crate::store::Store;

pub struct SubscriptionRepo {
    store: Store,
}

impl SubscriptionRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// Every subscription, in insertion order.
    #[instrument(skip(self))]
    pub fn list(&self) -> Vec<Subscription> {
        self.store.with_read(|c| c.subscriptions.clone())
    }

    /// Append a subscription. The id is one past the last row's id; the
    /// price is stored as given. Mutation-created rows have no account.
    #[instrument(skip(self))]
    pub fn add(&self, name: &str, price: &str) -> Subscription {
        let subscription = self.store.with_write(|c| {
            let id = c
                .subscriptions
                .last()
                .map_or(SubscriptionId::new(1), |last| last.id.next());
            let subscription = Subscription {
                id,
                name: name.to_string(),
                price: Price::from(price),
                account_id: None,
            };
            c.subscriptions.push(subscription.clone());
            subscription
        });

        debug!(id = %subscription.id, "subscription added");
        subscription
    }
}
