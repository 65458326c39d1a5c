use std::sync::Arc;

use parking_lot::RwLock;
use tracing::info;

use subrepro_core::{AccountScope, Person, Subscription};

use crate::seed::{AccountRecord, Seed};

#[derive(Clone, Debug, Default)]
pub struct StoreConfig {
    pub account_scope: AccountScope,
    pub seed: Seed,
}

/// The live collections behind every resolver.
pub struct Collections {
    pub account: AccountRecord,
    pub subscriptions: Vec<Subscription>,
    pub people: Vec<Person>,
}

/// Shared in-memory store. Clones share the same collections, so every
/// handle observes every write.
pub struct Store {
    data: Arc<RwLock<Collections>>,
    account_scope: AccountScope,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        let Seed {
            account,
            subscriptions,
            people,
        } = config.seed;

        info!(
            account_id = %account.id,
            subscriptions = subscriptions.len(),
            people = people.len(),
            account_scope = %config.account_scope,
            "store seeded"
        );

        Self {
            data: Arc::new(RwLock::new(Collections {
                account,
                subscriptions,
                people,
            })),
            account_scope: config.account_scope,
        }
    }

    /// Default seed with the given account scope.
    pub fn with_scope(account_scope: AccountScope) -> Self {
        Self::new(StoreConfig {
            account_scope,
            ..Default::default()
        })
    }

    /// Execute a closure with shared access to the collections.
    pub fn with_read<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&Collections) -> T,
    {
        let data = self.data.read();
        f(&data)
    }

    /// Execute a closure with exclusive access. Everything the closure does
    /// is atomic with respect to other handles.
    pub fn with_write<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&mut Collections) -> T,
    {
        let mut data = self.data.write();
        f(&mut data)
    }

    pub fn account_scope(&self) -> AccountScope {
        self.account_scope
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

impl Clone for Store {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            account_scope: self.account_scope,
        }
    }
}
