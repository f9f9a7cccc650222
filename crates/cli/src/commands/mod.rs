pub mod clients;
pub mod config;
pub mod doctor;
pub mod link;
pub mod share;
pub mod stats;

use std::future::Future;
use std::sync::Arc;

use budgetbook_core::config::{AppConfig, LoadOptions};
use budgetbook_core::errors::{ApplicationError, DomainError};
use budgetbook_store::{BudgetPublisher, BudgetSequence, DocumentLinker, FsByteStore, RegistryStore};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Value>,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        Self::success_with_data(command, message, None)
    }

    pub fn success_with_data(
        command: &str,
        message: impl Into<String>,
        data: Option<Value>,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
            data,
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
            data: None,
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Maps an application error onto its class and a stable exit code.
    pub fn from_application_error(command: &str, error: &ApplicationError) -> Self {
        let exit_code = match error {
            ApplicationError::Configuration(_) => 2,
            ApplicationError::Domain(DomainError::CustomerNotFound { .. }) => 6,
            ApplicationError::Domain(_) => 4,
            ApplicationError::StorageRead(_) | ApplicationError::StorageWrite(_) => 5,
            ApplicationError::ArtifactDelete { .. } => 7,
        };
        let interface = error.clone().into_interface(command);
        Self::failure(
            command,
            error.class(),
            format!("{} ({error})", interface.user_message()),
            exit_code,
        )
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Registry-side services wired over the configured data directory.
pub(crate) struct Workspace {
    pub config: AppConfig,
    pub registry: Arc<RegistryStore<FsByteStore>>,
    pub linker: DocumentLinker<FsByteStore>,
    pub publisher: BudgetPublisher<FsByteStore>,
    pub sequence: BudgetSequence<FsByteStore>,
}

impl Workspace {
    pub(crate) fn open(config: AppConfig) -> Self {
        let storage = Arc::new(FsByteStore::new(&config.storage.data_dir));
        let registry =
            Arc::new(RegistryStore::new(Arc::clone(&storage), config.storage.registry_path.clone()));
        Self {
            linker: DocumentLinker::new(Arc::clone(&registry)),
            publisher: BudgetPublisher::new(
                Arc::clone(&registry),
                config.storage.documents_dir.clone(),
            ),
            sequence: BudgetSequence::new(storage, config.storage.sequence_path.clone()),
            registry,
            config,
        }
    }

    /// Loads the registry, refusing to continue when the file on disk could not be read.
    ///
    /// A degraded load leaves an empty cache; saving over it would discard the file.
    pub(crate) async fn load_for_update(&self) -> Result<(), ApplicationError> {
        self.registry.load(false).await;
        match self.registry.last_load_failure().await {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

/// Loads config, builds a current-thread runtime and runs `body` against the workspace.
pub(crate) fn with_workspace<F, Fut>(command: &str, body: F) -> CommandResult
where
    F: FnOnce(Workspace) -> Fut,
    Fut: Future<Output = CommandResult>,
{
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                command,
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                command,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    runtime.block_on(body(Workspace::open(config)))
}
