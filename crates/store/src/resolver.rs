use std::sync::Arc;

use budgetbook_core::domain::customer::{Customer, CustomerId};
use budgetbook_core::errors::DomainError;
use budgetbook_core::matcher::{find_match, ContactQuery};
use tracing::info;

use crate::registry::RegistryStore;
use crate::storage::ByteStore;

/// Maps the contact fields typed on a budget to a registry customer.
pub struct CustomerResolver<S> {
    registry: Arc<RegistryStore<S>>,
}

impl<S: ByteStore> CustomerResolver<S> {
    pub fn new(registry: Arc<RegistryStore<S>>) -> Self {
        Self { registry }
    }

    /// Returns the matching customer, or appends a new one to the cache.
    ///
    /// A newly created customer is not persisted here. The caller commits it by
    /// attaching a document and calling [`RegistryStore::save`] without yielding
    /// to another mutating caller in between.
    pub async fn resolve(
        &self,
        name: &str,
        phone: &str,
        email: &str,
    ) -> Result<Customer, DomainError> {
        self.registry.load(false).await;
        let query = ContactQuery::normalize(name, phone, email)?;

        let (customer, created) = self
            .registry
            .with_customers(|customers| match find_match(customers, &query) {
                Some(index) => (customers[index].clone(), false),
                None => {
                    let customer = query.clone().into_customer(CustomerId::generate());
                    customers.push(customer.clone());
                    (customer, true)
                }
            })
            .await;

        let customer_id = customer.identity().map(|id| id.to_string()).unwrap_or_default();
        if created {
            info!(
                event_name = "resolver.customer.created",
                customer_id = %customer_id,
                "created customer pending first attachment"
            );
        } else {
            info!(
                event_name = "resolver.customer.matched",
                customer_id = %customer_id,
                "matched existing customer"
            );
        }

        Ok(customer)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use budgetbook_core::domain::customer::{Customer, CustomerId};
    use budgetbook_core::errors::DomainError;

    use crate::registry::RegistryStore;
    use crate::storage::InMemoryByteStore;

    use super::CustomerResolver;

    const PATH: &str = "data/clientes.json";

    async fn seeded(customers: Vec<Customer>) -> (Arc<InMemoryByteStore>, CustomerResolver<InMemoryByteStore>) {
        let storage = Arc::new(InMemoryByteStore::default());
        storage.insert(PATH, serde_json::to_vec(&customers).expect("serialize")).await;
        let registry = Arc::new(RegistryStore::new(Arc::clone(&storage), PATH));
        (storage, CustomerResolver::new(registry))
    }

    fn customer(id: &str, name: &str, phone: Option<&str>) -> Customer {
        Customer {
            id: Some(CustomerId(id.to_string())),
            name: name.to_string(),
            phone: phone.map(str::to_string),
            email: None,
            documents: Vec::new(),
        }
    }

    #[tokio::test]
    async fn resolves_existing_customer_by_name_and_phone() {
        let (_, resolver) = seeded(vec![customer("ana", "Ana Silva", Some("111"))]).await;

        let resolved = resolver.resolve("Ana Silva", "111", "").await.expect("resolve");
        assert_eq!(resolved.id, Some(CustomerId("ana".to_string())));

        let other = resolver.resolve("Ana Silva", "999", "").await.expect("resolve");
        assert_ne!(other.id, resolved.id);
    }

    #[tokio::test]
    async fn name_only_customer_is_found_by_name_only_query() {
        let (_, resolver) = seeded(vec![customer("bruno", "Bruno", None)]).await;

        let resolved = resolver.resolve("  Bruno ", "", "").await.expect("resolve");
        assert_eq!(resolved.id, Some(CustomerId("bruno".to_string())));
    }

    #[tokio::test]
    async fn new_customers_get_distinct_ids_and_are_not_persisted() {
        let (storage, resolver) = seeded(Vec::new()).await;

        let mut ids = HashSet::new();
        for index in 0..25 {
            let customer =
                resolver.resolve(&format!("Cliente {index}"), "", "").await.expect("resolve");
            ids.insert(customer.id.expect("minted id"));
        }

        assert_eq!(ids.len(), 25);
        let on_disk: Vec<Customer> =
            serde_json::from_slice(&storage.contents(PATH).await.expect("file")).expect("parse");
        assert!(on_disk.is_empty(), "resolve must defer persistence to the caller");
    }

    #[tokio::test]
    async fn resolving_the_same_new_name_twice_reuses_the_pending_record() {
        let (_, resolver) = seeded(Vec::new()).await;

        let first = resolver.resolve("Carla Dias", "", "").await.expect("resolve");
        let second = resolver.resolve("Carla Dias", "", "").await.expect("resolve");

        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn blank_name_is_rejected_without_touching_the_cache() {
        let (_, resolver) = seeded(Vec::new()).await;

        let error = resolver.resolve("   ", "111", "a@b.c").await.expect_err("blank name");

        assert!(matches!(error, DomainError::InvalidInput(_)));
        assert_eq!(resolver.registry.count().await, 0);
    }
}
