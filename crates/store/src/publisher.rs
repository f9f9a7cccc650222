use std::sync::Arc;

use budgetbook_core::domain::budget::{ContactSnapshot, RenderedArtifact};
use budgetbook_core::domain::customer::{Customer, Document};
use budgetbook_core::errors::{ApplicationError, DomainError};
use budgetbook_core::matcher::{find_match, ContactQuery};
use tracing::{info, warn};

use crate::linker::{AttachOutcome, DocumentLinker};
use crate::registry::RegistryStore;
use crate::resolver::CustomerResolver;
use crate::storage::{join, ByteStore, Presence};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedBudget {
    pub customer: Customer,
    pub document: Document,
    pub outcome: AttachOutcome,
}

/// Stores a rendered budget and links it to the customer typed on it.
///
/// `publish_artifact` runs resolve, attach and save back to back. Another
/// mutating registry call interleaved between them is not guarded against; the
/// last save wins.
pub struct BudgetPublisher<S> {
    registry: Arc<RegistryStore<S>>,
    resolver: CustomerResolver<S>,
    linker: DocumentLinker<S>,
    documents_dir: String,
}

impl<S: ByteStore> BudgetPublisher<S> {
    pub fn new(registry: Arc<RegistryStore<S>>, documents_dir: impl Into<String>) -> Self {
        Self {
            resolver: CustomerResolver::new(Arc::clone(&registry)),
            linker: DocumentLinker::new(Arc::clone(&registry)),
            registry,
            documents_dir: documents_dir.into(),
        }
    }

    pub fn documents_dir(&self) -> &str {
        &self.documents_dir
    }

    /// Writes `artifact` under the documents dir and links it to `contact`.
    ///
    /// The target file may only be overwritten when the customer `contact`
    /// resolves to already lists it. A file linked to anyone else, or present
    /// on disk without any link, is refused with [`DomainError::DocumentInUse`]
    /// before a single byte is written.
    pub async fn publish_artifact(
        &self,
        contact: &ContactSnapshot,
        artifact: RenderedArtifact,
    ) -> Result<PublishedBudget, ApplicationError> {
        let query = ContactQuery::normalize(&contact.name, &contact.phone, &contact.email)?;
        if artifact.display_name.trim().is_empty() || artifact.display_name.contains('/') {
            return Err(DomainError::InvalidInput(format!(
                "invalid artifact name `{}`",
                artifact.display_name
            ))
            .into());
        }

        let storage = self.registry.storage();
        let path = join(&self.documents_dir, &artifact.display_name);
        let locator = storage.locator(&path);
        self.ensure_unclaimed(&query, &path, &locator).await?;

        storage
            .mkdir(&self.documents_dir, true)
            .await
            .map_err(|error| ApplicationError::StorageWrite(error.to_string()))?;
        storage
            .write(&path, &artifact.bytes)
            .await
            .map_err(|error| ApplicationError::StorageWrite(error.to_string()))?;

        let document = Document::new(artifact.display_name, locator, path);
        let customer = self.resolver.resolve(&contact.name, &contact.phone, &contact.email).await?;
        let outcome = self.linker.attach(&customer, document.clone()).await?;
        self.registry.save().await?;

        info!(
            event_name = "publisher.budget.published",
            document = %document.display_name,
            customer_id = %customer.identity().map(|id| id.to_string()).unwrap_or_default(),
            "budget stored and linked"
        );

        let customer = self
            .registry
            .all()
            .await
            .into_iter()
            .find(|stored| customer.identity().is_some_and(|id| stored.has_identity(id)))
            .unwrap_or(customer);
        Ok(PublishedBudget { customer, document, outcome })
    }

    async fn ensure_unclaimed(
        &self,
        query: &ContactQuery,
        path: &str,
        locator: &str,
    ) -> Result<(), ApplicationError> {
        let customers = self.registry.load(false).await;
        let resolved = find_match(&customers, query);
        let holds = |customer: &Customer| {
            customer.documents.iter().any(|document| {
                document.locator == locator || document.storage_path.as_deref() == Some(path)
            })
        };

        let foreign = customers
            .iter()
            .enumerate()
            .find(|(index, customer)| Some(*index) != resolved && holds(*customer));
        if let Some((_, holder)) = foreign {
            warn!(
                event_name = "publisher.document.in_use",
                document = %path,
                holder_id = %holder.identity().map(|id| id.to_string()).unwrap_or_default(),
                "refusing to overwrite a document linked to another customer"
            );
            return Err(DomainError::DocumentInUse {
                document: path.to_string(),
                owner: format!("customer `{}`", holder.name),
            }
            .into());
        }

        if resolved.is_some_and(|index| holds(&customers[index])) {
            return Ok(());
        }

        match self.registry.storage().stat(path).await {
            Ok(Presence::NotFound) => Ok(()),
            Ok(Presence::Exists) => {
                warn!(
                    event_name = "publisher.document.unlinked_file",
                    document = %path,
                    "refusing to overwrite a file no customer lists"
                );
                Err(DomainError::DocumentInUse {
                    document: path.to_string(),
                    owner: "an unlinked file on disk".to_string(),
                }
                .into())
            }
            Err(error) => Err(ApplicationError::StorageRead(error.to_string())),
        }
    }
}
