use async_graphql::{Context, Object, Result};

use subrepro_store::people::PersonRepo;
use subrepro_store::subscriptions::SubscriptionRepo;
use subrepro_store::Store;

use crate::types::{PersonNode, SubscriptionNode};

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Append a subscription. Arguments are not validated; missing ones are
    /// stored as empty text.
    async fn add_subscription(
        &self,
        ctx: &Context<'_>,
        name: Option<String>,
        price: Option<String>,
    ) -> Result<SubscriptionNode> {
        let store = ctx.data::<Store>()?;
        let row = SubscriptionRepo::new(store.clone()).add(
            name.as_deref().unwrap_or_default(),
            price.as_deref().unwrap_or_default(),
        );
        Ok(row.into())
    }

    async fn add_person(&self, ctx: &Context<'_>, name: Option<String>) -> Result<PersonNode> {
        let store = ctx.data::<Store>()?;
        Ok(PersonRepo::new(store.clone())
            .add(name.as_deref().unwrap_or_default())
            .into())
    }
}
