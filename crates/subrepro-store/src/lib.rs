pub mod accounts;
pub mod error;
pub mod people;
pub mod seed;
pub mod store;
pub mod subscriptions;

pub use error::StoreError;
pub use seed::Seed;
pub use store::{Store, StoreConfig};
