use tracing::{debug, instrument};

use subrepro_core::{Person, PersonId};

use crate::store::Store;

pub struct PersonRepo {
    store: Store,
}

impl PersonRepo {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub fn list(&self) -> Vec<Person> {
        self.store.with_read(|c| c.people.clone())
    }

    /// Append a person with id one past the last row's id.
    #[instrument(skip(self))]
    pub fn add(&self, name: &str) -> Person {
        let person = self.store.with_write(|c| {
            let id = c
                .people
                .last()
                .map_or(PersonId::new(1), |last| last.id.next());
            let person = Person {
                id,
                name: name.to_string(),
            };
            c.people.push(person.clone());
            person
        });

        debug!(id = %person.id, "person added");
        person
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscriptions::SubscriptionRepo;

    #[test]
    fn list_seeded_people() {
        let repo = PersonRepo::new(Store::default());
        let names: Vec<_> = repo.list().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["John Smith", "Sara Smith", "Budd Deey"]);
    }

    #[test]
    fn add_person_appends_with_next_id() {
        let repo = PersonRepo::new(Store::default());
        let person = repo.add("Ada Lovelace");
        assert_eq!(person.id, PersonId::new(4));
        assert_eq!(repo.list().last(), Some(&person));
    }

    #[test]
    fn people_and_subscriptions_are_independent() {
        let store = Store::default();
        PersonRepo::new(store.clone()).add("Ada Lovelace");
        let sub = SubscriptionRepo::new(store.clone()).add("Eggs", "5");
        assert_eq!(sub.id.get(), 3);
        assert_eq!(PersonRepo::new(store).list().len(), 4);
    }
}
