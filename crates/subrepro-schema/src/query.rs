use async_graphql::{Context, Object, Result};

use subrepro_store::accounts::AccountRepo;
use subrepro_store::people::PersonRepo;
use subrepro_store::subscriptions::SubscriptionRepo;
use subrepro_store::Store;

use crate::types::{AccountNode, PersonNode, SubscriptionNode};

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    async fn people(&self, ctx: &Context<'_>) -> Result<Vec<PersonNode>> {
        let store = ctx.data::<Store>()?;
        Ok(PersonRepo::new(store.clone())
            .list()
            .into_iter()
            .map(PersonNode::from)
            .collect())
    }

    async fn account(&self, ctx: &Context<'_>) -> Result<AccountNode> {
        let store = ctx.data::<Store>()?;
        Ok(AccountRepo::new(store.clone()).header().into())
    }

    async fn subscriptions(&self, ctx: &Context<'_>) -> Result<Vec<SubscriptionNode>> {
        let store = ctx.data::<Store>()?;
        Ok(SubscriptionRepo::new(store.clone())
            .list()
            .into_iter()
            .map(SubscriptionNode::from)
            .collect())
    }
}
