use tracing::instrument;

use subrepro_core::{Account, AccountId, AccountScope, Subscription};

use crate::seed::AccountRecord;
use crate::store::Store;

pub struct AccountRepo {
    store: Store,
}

impl AccountRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    /// The singleton account, rebuilt from the live collections on every call.
    #[instrument(skip(self))]
    pub fn get(&self) -> Account {
        let scope = self.store.account_scope();
        self.store.with_read(|c| Account {
            id: c.account.id.clone(),
            name: c.account.name.clone(),
            subscriptions: scoped(&c.subscriptions, &c.account.id, scope),
        })
    }

    /// Id and name only. The schema resolves subscriptions as a separate field.
    pub fn header(&self) -> AccountRecord {
        self.store.with_read(|c| c.account.clone())
    }

    /// Resolver for the account's `subscriptions` field.
    ///
    /// Under [`AccountScope::FullCollection`] this is the whole live
    /// collection, identical to a direct subscriptions read. Under
    /// [`AccountScope::FilteredByAccount`] rows without a matching account id
    /// (every row created by the add mutation) are left out.
    #[instrument(skip(self))]
    pub fn subscriptions(&self) -> Vec<Subscription> {
        let scope = self.store.account_scope();
        self.store
            .with_read(|c| scoped(&c.subscriptions, &c.account.id, scope))
    }
}

fn scoped(
    rows: &[Subscription],
    account_id: &AccountId,
    scope: AccountScope,
) -> Vec<Subscription> {
    match scope {
        AccountScope::FullCollection => rows.to_vec(),
        AccountScope::FilteredByAccount => rows
            .iter()
            .filter(|s| s.account_id.as_ref() == Some(account_id))
            .cloned()
            .collect(),
    }
}
