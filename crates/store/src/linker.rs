use std::sync::Arc;

use budgetbook_core::domain::customer::{Customer, CustomerId, Document};
use budgetbook_core::errors::{ApplicationError, DomainError};
use budgetbook_core::matcher::ContactQuery;
use tracing::{info, warn};

use crate::registry::RegistryStore;
use crate::storage::{ByteStore, StorageError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachOutcome {
    Linked,
    AlreadyLinked,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CleanupFailure {
    pub display_name: String,
    pub reason: String,
}

/// Result of the best-effort artifact deletion that follows a customer removal.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CleanupReport {
    pub attempted: usize,
    pub deleted: usize,
    pub failures: Vec<CleanupFailure>,
}

impl CleanupReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// The single aggregate warning for the whole pass, if anything failed.
    pub fn warning(&self) -> Option<ApplicationError> {
        if self.failures.is_empty() {
            return None;
        }
        Some(ApplicationError::ArtifactDelete {
            failed: self.failures.len(),
            attempted: self.attempted,
            details: self
                .failures
                .iter()
                .map(|failure| format!("{}: {}", failure.display_name, failure.reason))
                .collect(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemovalOutcome {
    Removed { customer: Customer, cleanup: CleanupReport },
    NotFound,
}

/// Links documents to registry customers and removes customers with their artifacts.
pub struct DocumentLinker<S> {
    registry: Arc<RegistryStore<S>>,
}

impl<S: ByteStore> DocumentLinker<S> {
    pub fn new(registry: Arc<RegistryStore<S>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<RegistryStore<S>> {
        &self.registry
    }

    /// Appends `document` to the cached record with `customer`'s id.
    ///
    /// The lookup goes through the current cache, so stale copies held by the
    /// caller are fine. Nothing is persisted; call [`RegistryStore::save`] after.
    pub async fn attach(
        &self,
        customer: &Customer,
        document: Document,
    ) -> Result<AttachOutcome, DomainError> {
        let Some(id) = customer.identity().cloned() else {
            return Err(DomainError::CustomerNotFound { id: String::new() });
        };
        let display_name = document.display_name.clone();

        let linked = self
            .registry
            .with_customers(|customers| {
                customers
                    .iter_mut()
                    .find(|candidate| candidate.has_identity(&id))
                    .map(|target| target.attach(document))
            })
            .await;

        match linked {
            None => {
                warn!(
                    event_name = "linker.attach.customer_missing",
                    customer_id = %id,
                    document = %display_name,
                    "customer vanished from registry before document could be linked"
                );
                Err(DomainError::CustomerNotFound { id: id.0 })
            }
            Some(true) => {
                info!(
                    event_name = "linker.attach.linked",
                    customer_id = %id,
                    document = %display_name,
                    "document linked to customer"
                );
                Ok(AttachOutcome::Linked)
            }
            Some(false) => {
                info!(
                    event_name = "linker.attach.already_linked",
                    customer_id = %id,
                    document = %display_name,
                    "document already linked; skipping"
                );
                Ok(AttachOutcome::AlreadyLinked)
            }
        }
    }

    /// Removes the customer, persists the registry, then deletes its artifacts.
    ///
    /// Artifact deletion never aborts early and never fails the call; failures
    /// land in the returned [`CleanupReport`]. If the registry cannot be saved
    /// the error is returned and no artifact is touched.
    pub async fn remove_customer(
        &self,
        customer: &Customer,
    ) -> Result<RemovalOutcome, ApplicationError> {
        let Some(id) = customer.identity().cloned() else {
            return Err(DomainError::InvalidReference(format!(
                "customer `{}` has no id",
                customer.name
            ))
            .into());
        };

        self.registry.load(false).await;
        let removed = self
            .registry
            .with_customers(|customers| {
                customers
                    .iter()
                    .position(|candidate| candidate.has_identity(&id))
                    .map(|index| customers.remove(index))
            })
            .await;

        let Some(removed) = removed else {
            warn!(
                event_name = "linker.remove.not_found",
                customer_id = %id,
                "customer already absent from registry"
            );
            return Ok(RemovalOutcome::NotFound);
        };

        self.registry.save().await?;
        info!(
            event_name = "linker.remove.committed",
            customer_id = %id,
            documents = removed.documents.len(),
            "customer removed from registry"
        );

        let cleanup = self.delete_artifacts(&removed.documents).await;
        if let Some(warning) = cleanup.warning() {
            warn!(
                event_name = "linker.remove.cleanup_incomplete",
                customer_id = %id,
                failed = cleanup.failures.len(),
                attempted = cleanup.attempted,
                error = %warning,
                "some artifacts could not be deleted"
            );
        }

        Ok(RemovalOutcome::Removed { customer: removed, cleanup })
    }

    /// Adds a customer typed directly into the client list and persists it.
    pub async fn add_customer(
        &self,
        name: &str,
        phone: &str,
        email: &str,
    ) -> Result<Customer, ApplicationError> {
        let query = ContactQuery::normalize(name, phone, email)?;
        self.registry.load(false).await;

        let created = self
            .registry
            .with_customers(|customers| {
                if customers.iter().any(|existing| query.is_same_record(existing)) {
                    return Err(DomainError::DuplicateCustomer { name: query.name.clone() });
                }
                let customer = query.clone().into_customer(CustomerId::generate());
                customers.push(customer.clone());
                Ok(customer)
            })
            .await?;

        self.registry.save().await?;
        info!(
            event_name = "linker.customer.added",
            customer_id = %created.identity().map(|id| id.to_string()).unwrap_or_default(),
            "customer added"
        );
        Ok(created)
    }

    /// Fills contact fields the stored record is missing and persists the result.
    pub async fn update_contact(
        &self,
        id: &CustomerId,
        phone: &str,
        email: &str,
    ) -> Result<Customer, ApplicationError> {
        self.registry.load(false).await;
        let phone = Some(phone.trim().to_string()).filter(|value| !value.is_empty());
        let email = Some(email.trim().to_lowercase()).filter(|value| !value.is_empty());

        let (updated, changed) = self
            .registry
            .with_customers(|customers| {
                let target = customers.iter_mut().find(|candidate| candidate.has_identity(id))?;
                let mut changed = false;
                if target.phone.as_deref().map_or(true, |value| value.trim().is_empty()) && phone.is_some() {
                    target.phone = phone;
                    changed = true;
                }
                if target.email.as_deref().map_or(true, |value| value.trim().is_empty()) && email.is_some() {
                    target.email = email;
                    changed = true;
                }
                Some((target.clone(), changed))
            })
            .await
            .ok_or_else(|| DomainError::CustomerNotFound { id: id.0.clone() })?;

        if changed {
            self.registry.save().await?;
        }
        Ok(updated)
    }

    async fn delete_artifacts(&self, documents: &[Document]) -> CleanupReport {
        let storage = self.registry.storage();
        let mut report = CleanupReport { attempted: documents.len(), ..CleanupReport::default() };

        for document in documents {
            let Some(path) = document.storage_path.as_deref() else {
                report.failures.push(CleanupFailure {
                    display_name: document.display_name.clone(),
                    reason: "no storage path recorded".to_string(),
                });
                continue;
            };

            match storage.delete(path).await {
                Ok(()) | Err(StorageError::NotFound(_)) => report.deleted += 1,
                Err(error) => report.failures.push(CleanupFailure {
                    display_name: document.display_name.clone(),
                    reason: error.to_string(),
                }),
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use budgetbook_core::domain::customer::{Customer, CustomerId, Document};
    use budgetbook_core::errors::{ApplicationError, DomainError};

    use crate::registry::RegistryStore;
    use crate::storage::InMemoryByteStore;

    use super::{AttachOutcome, DocumentLinker, RemovalOutcome};

    const PATH: &str = "data/clientes.json";

    fn document(number: u32) -> Document {
        let name = format!("orcamento_{number:04}.pdf");
        let path = format!("Orcamentos/{name}");
        Document::new(name, format!("memory:///{path}"), path)
    }

    fn customer(id: &str, name: &str) -> Customer {
        Customer {
            id: Some(CustomerId(id.to_string())),
            name: name.to_string(),
            phone: None,
            email: None,
            documents: Vec::new(),
        }
    }

    async fn linker_with(
        customers: Vec<Customer>,
    ) -> (Arc<InMemoryByteStore>, DocumentLinker<InMemoryByteStore>) {
        let storage = Arc::new(InMemoryByteStore::default());
        storage.insert(PATH, serde_json::to_vec(&customers).expect("serialize")).await;
        let registry = Arc::new(RegistryStore::new(Arc::clone(&storage), PATH));
        registry.load(false).await;
        (storage, DocumentLinker::new(registry))
    }

    #[tokio::test]
    async fn attach_is_idempotent_per_locator() {
        let (_, linker) = linker_with(vec![customer("ana", "Ana")]).await;
        let ana = customer("ana", "Ana");

        assert_eq!(linker.attach(&ana, document(1)).await, Ok(AttachOutcome::Linked));
        assert_eq!(linker.attach(&ana, document(1)).await, Ok(AttachOutcome::AlreadyLinked));

        let stored = linker.registry().all().await;
        assert_eq!(stored[0].documents.len(), 1);
    }

    #[tokio::test]
    async fn attach_uses_the_cached_record_not_the_callers_copy() {
        let (_, linker) = linker_with(vec![customer("ana", "Ana")]).await;
        let mut stale = customer("ana", "Ana (old copy)");
        stale.documents.push(document(9));

        linker.attach(&stale, document(1)).await.expect("attach");

        let stored = linker.registry().all().await;
        assert_eq!(stored[0].name, "Ana");
        assert_eq!(stored[0].documents, vec![document(1)]);
    }

    #[tokio::test]
    async fn attach_to_vanished_customer_fails() {
        let (_, linker) = linker_with(Vec::new()).await;

        let error = linker.attach(&customer("ghost", "Ghost"), document(1)).await;

        assert_eq!(error, Err(DomainError::CustomerNotFound { id: "ghost".to_string() }));
    }

    #[tokio::test]
    async fn attach_does_not_persist() {
        let (storage, linker) = linker_with(vec![customer("ana", "Ana")]).await;

        linker.attach(&customer("ana", "Ana"), document(1)).await.expect("attach");

        let on_disk: Vec<Customer> =
            serde_json::from_slice(&storage.contents(PATH).await.expect("file")).expect("parse");
        assert!(on_disk[0].documents.is_empty());
    }

    #[tokio::test]
    async fn remove_without_id_is_an_invalid_reference() {
        let (_, linker) = linker_with(Vec::new()).await;
        let mut nameless = customer("x", "Sem Id");
        nameless.id = None;

        let error = linker.remove_customer(&nameless).await.expect_err("no id");

        assert!(matches!(error, ApplicationError::Domain(DomainError::InvalidReference(_))));
    }

    #[tokio::test]
    async fn remove_absent_customer_reports_not_found() {
        let (_, linker) = linker_with(Vec::new()).await;

        let outcome = linker.remove_customer(&customer("ghost", "Ghost")).await.expect("remove");

        assert_eq!(outcome, RemovalOutcome::NotFound);
    }

    #[tokio::test]
    async fn remove_persists_before_cleanup_and_aggregates_failures() {
        let mut ana = customer("ana", "Ana");
        ana.documents = vec![document(1), document(2)];
        let (storage, linker) = linker_with(vec![ana.clone(), customer("bia", "Bia")]).await;
        storage.insert("Orcamentos/orcamento_0001.pdf", b"%PDF-1".to_vec()).await;
        storage.insert("Orcamentos/orcamento_0002.pdf", b"%PDF-2".to_vec()).await;
        storage.fail_deletes_on("Orcamentos/orcamento_0001.pdf").await;

        let outcome = linker.remove_customer(&ana).await.expect("remove");

        let RemovalOutcome::Removed { cleanup, .. } = outcome else {
            panic!("expected removal, got {outcome:?}");
        };
        assert_eq!(cleanup.attempted, 2);
        assert_eq!(cleanup.deleted, 1);
        assert_eq!(cleanup.failures.len(), 1);
        assert!(matches!(
            cleanup.warning(),
            Some(ApplicationError::ArtifactDelete { failed: 1, attempted: 2, .. })
        ));
        assert!(storage.contains("Orcamentos/orcamento_0001.pdf").await);
        assert!(!storage.contains("Orcamentos/orcamento_0002.pdf").await);

        let reloaded = linker.registry().load(true).await;
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded[0].name, "Bia");
    }

    #[tokio::test]
    async fn failed_save_skips_artifact_cleanup() {
        let mut ana = customer("ana", "Ana");
        ana.documents = vec![document(1)];
        let (storage, linker) = linker_with(vec![ana.clone()]).await;
        storage.insert("Orcamentos/orcamento_0001.pdf", b"%PDF".to_vec()).await;
        storage.fail_writes_on(PATH).await;

        let error = linker.remove_customer(&ana).await.expect_err("save fault");

        assert!(matches!(error, ApplicationError::StorageWrite(_)));
        assert!(storage.contains("Orcamentos/orcamento_0001.pdf").await);
    }

    #[tokio::test]
    async fn documents_without_storage_path_count_as_cleanup_failures() {
        let mut ana = customer("ana", "Ana");
        ana.documents = vec![Document {
            display_name: "orcamento_0003.pdf".to_string(),
            locator: "content://legacy/3".to_string(),
            storage_path: None,
        }];
        let (_, linker) = linker_with(vec![ana.clone()]).await;

        let outcome = linker.remove_customer(&ana).await.expect("remove");

        let RemovalOutcome::Removed { cleanup, .. } = outcome else {
            panic!("expected removal");
        };
        assert_eq!(cleanup.failures[0].reason, "no storage path recorded");
    }

    #[tokio::test]
    async fn add_customer_persists_and_rejects_exact_duplicates() {
        let (storage, linker) = linker_with(Vec::new()).await;

        let added = linker.add_customer(" Dora ", "333", "").await.expect("add");
        assert_eq!(added.name, "Dora");

        let on_disk: Vec<Customer> =
            serde_json::from_slice(&storage.contents(PATH).await.expect("file")).expect("parse");
        assert_eq!(on_disk, vec![added]);

        let error = linker.add_customer("Dora", "333", "").await.expect_err("duplicate");
        assert!(matches!(error, ApplicationError::Domain(DomainError::DuplicateCustomer { .. })));
    }

    #[tokio::test]
    async fn update_contact_fills_only_missing_fields() {
        let mut ana = customer("ana", "Ana");
        ana.phone = Some("111".to_string());
        let (_, linker) = linker_with(vec![ana]).await;
        let id = CustomerId("ana".to_string());

        let updated = linker.update_contact(&id, "999", "Ana@Mail.com").await.expect("update");

        assert_eq!(updated.phone.as_deref(), Some("111"));
        assert_eq!(updated.email.as_deref(), Some("ana@mail.com"));
        let reloaded = linker.registry().load(true).await;
        assert_eq!(reloaded[0].email.as_deref(), Some("ana@mail.com"));
    }
}
