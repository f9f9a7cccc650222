use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("customer `{id}` is not present in the registry")]
    CustomerNotFound { id: String },
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("a customer named `{name}` with the same contact details already exists")]
    DuplicateCustomer { name: String },
    #[error("document `{document}` is already in use by {owner}")]
    DocumentInUse { document: String, owner: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("storage read failure: {0}")]
    StorageRead(String),
    #[error("storage write failure: {0}")]
    StorageWrite(String),
    #[error("could not delete {failed} of {attempted} artifacts: {}", .details.join("; "))]
    ArtifactDelete { failed: usize, attempted: usize, details: Vec<String> },
    #[error("configuration failure: {0}")]
    Configuration(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InterfaceError {
    #[error("bad request: {message}")]
    BadRequest { message: String, correlation_id: String },
    #[error("storage unavailable: {message}")]
    StorageUnavailable { message: String, correlation_id: String },
    #[error("cleanup incomplete: {message}")]
    CleanupIncomplete { message: String, correlation_id: String },
    #[error("internal error: {message}")]
    Internal { message: String, correlation_id: String },
}

impl InterfaceError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BadRequest { .. } => "The request could not be processed. Check inputs and try again.",
            Self::StorageUnavailable { .. } => {
                "Client data could not be read or saved. Please try again."
            }
            Self::CleanupIncomplete { .. } => {
                "One or more PDF files could not be deleted and may need to be removed manually."
            }
            Self::Internal { .. } => "An unexpected internal error occurred.",
        }
    }

    pub fn correlation_id(&self) -> &str {
        match self {
            Self::BadRequest { correlation_id, .. }
            | Self::StorageUnavailable { correlation_id, .. }
            | Self::CleanupIncomplete { correlation_id, .. }
            | Self::Internal { correlation_id, .. } => correlation_id,
        }
    }
}

impl ApplicationError {
    pub fn into_interface(self, correlation_id: impl Into<String>) -> InterfaceError {
        let correlation_id = correlation_id.into();
        let mut mapped = InterfaceError::from(self);
        match &mut mapped {
            InterfaceError::BadRequest { correlation_id: id, .. }
            | InterfaceError::StorageUnavailable { correlation_id: id, .. }
            | InterfaceError::CleanupIncomplete { correlation_id: id, .. }
            | InterfaceError::Internal { correlation_id: id, .. } => *id = correlation_id,
        }
        mapped
    }

    /// Stable snake_case class used in CLI payloads and log fields.
    pub fn class(&self) -> &'static str {
        match self {
            Self::Domain(DomainError::InvalidInput(_)) => "invalid_input",
            Self::Domain(DomainError::CustomerNotFound { .. }) => "customer_not_found",
            Self::Domain(DomainError::InvalidReference(_)) => "invalid_reference",
            Self::Domain(DomainError::DuplicateCustomer { .. }) => "duplicate_customer",
            Self::Domain(DomainError::DocumentInUse { .. }) => "document_in_use",
            Self::StorageRead(_) => "storage_read_failure",
            Self::StorageWrite(_) => "storage_write_failure",
            Self::ArtifactDelete { .. } => "artifact_delete_failure",
            Self::Configuration(_) => "configuration",
        }
    }
}

impl From<ApplicationError> for InterfaceError {
    fn from(value: ApplicationError) -> Self {
        let correlation_id = "unassigned".to_owned();
        match value {
            ApplicationError::Domain(error) => {
                Self::BadRequest { message: error.to_string(), correlation_id }
            }
            ApplicationError::StorageRead(message) | ApplicationError::StorageWrite(message) => {
                Self::StorageUnavailable { message, correlation_id }
            }
            error @ ApplicationError::ArtifactDelete { .. } => {
                Self::CleanupIncomplete { message: error.to_string(), correlation_id }
            }
            ApplicationError::Configuration(message) => {
                Self::Internal { message, correlation_id }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError, InterfaceError};

    #[test]
    fn domain_error_maps_to_bad_request_interface_error() {
        let interface =
            ApplicationError::from(DomainError::InvalidInput("customer name is empty".to_owned()))
                .into_interface("req-1");

        assert!(matches!(
            interface,
            InterfaceError::BadRequest {
                ref correlation_id,
                ..
            } if correlation_id == "req-1"
        ));
        assert_eq!(
            interface.user_message(),
            "The request could not be processed. Check inputs and try again."
        );
    }

    #[test]
    fn storage_errors_map_to_storage_unavailable() {
        let interface = ApplicationError::StorageWrite("disk full".to_owned()).into_interface("req-2");

        assert!(matches!(interface, InterfaceError::StorageUnavailable { .. }));
        assert_eq!(interface.correlation_id(), "req-2");
    }

    #[test]
    fn artifact_delete_is_reported_as_one_aggregate_message() {
        let error = ApplicationError::ArtifactDelete {
            failed: 2,
            attempted: 3,
            details: vec!["a.pdf: denied".to_owned(), "b.pdf: busy".to_owned()],
        };
        assert_eq!(error.to_string(), "could not delete 2 of 3 artifacts: a.pdf: denied; b.pdf: busy");
        assert_eq!(error.class(), "artifact_delete_failure");

        let interface = error.into_interface("req-3");
        assert!(matches!(interface, InterfaceError::CleanupIncomplete { .. }));
    }

    #[test]
    fn configuration_error_maps_to_internal() {
        let interface = ApplicationError::Configuration("invalid data dir".to_owned())
            .into_interface("req-4");

        assert!(matches!(interface, InterfaceError::Internal { .. }));
        assert_eq!(interface.user_message(), "An unexpected internal error occurred.");
    }

    #[test]
    fn document_in_use_is_a_bad_request_with_its_own_class() {
        let error = ApplicationError::from(DomainError::DocumentInUse {
            document: "Orcamentos/orcamento_0001.pdf".to_owned(),
            owner: "customer `Ana`".to_owned(),
        });

        assert_eq!(error.class(), "document_in_use");
        assert_eq!(
            error.to_string(),
            "document `Orcamentos/orcamento_0001.pdf` is already in use by customer `Ana`"
        );
        assert!(matches!(error.into_interface("req-5"), InterfaceError::BadRequest { .. }));
    }
}
