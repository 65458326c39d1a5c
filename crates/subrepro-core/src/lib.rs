pub mod ids;
pub mod model;
pub mod scope;

pub use ids::{AccountId, PersonId, SubscriptionId};
pub use model::{Account, Person, Price, Subscription};
pub use scope::AccountScope;
