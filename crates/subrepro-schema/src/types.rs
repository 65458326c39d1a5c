use async_graphql::{Context, Object, Result, SimpleObject, ID};

use subrepro_core::{Person, Subscription};
use subrepro_store::accounts::AccountRepo;
use subrepro_store::seed::AccountRecord;
use subrepro_store::Store;

#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Person")]
pub struct PersonNode {
    pub id: ID,
    pub name: String,
}

impl From<Person> for PersonNode {
    fn from(p: Person) -> Self {
        Self {
            id: ID::from(p.id),
            name: p.name,
        }
    }
}

/// A subscription row. Prices are exposed as text whatever their stored form.
#[derive(Clone, Debug, SimpleObject)]
#[graphql(name = "Subscription")]
pub struct SubscriptionNode {
    pub id: ID,
    pub name: String,
    pub price: String,
}

impl From<Subscription> for SubscriptionNode {
    fn from(s: Subscription) -> Self {
        Self {
            id: ID::from(s.id),
            name: s.name,
            price: s.price.to_string(),
        }
    }
}

pub struct AccountNode {
    id: ID,
    name: String,
}

impl From<AccountRecord> for AccountNode {
    fn from(record: AccountRecord) -> Self {
        Self {
            id: ID::from(record.id),
            name: record.name,
        }
    }
}

#[Object(name = "Account")]
impl AccountNode {
    async fn id(&self) -> &ID {
        &self.id
    }

    async fn name(&self) -> &str {
        &self.name
    }

    /// Resolved against the live collection on every read.
    async fn subscriptions(&self, ctx: &Context<'_>) -> Result<Vec<SubscriptionNode>> {
        let store = ctx.data::<Store>()?;
        Ok(AccountRepo::new(store.clone())
            .subscriptions()
            .into_iter()
            .map(SubscriptionNode::from)
            .collect())
    }
}
