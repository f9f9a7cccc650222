use std::path::Path;

use budgetbook_core::domain::budget::{BudgetNumber, ContactSnapshot, RenderedArtifact};
use budgetbook_store::AttachOutcome;
use serde_json::json;

use crate::commands::{with_workspace, CommandResult};

pub struct LinkRequest<'a> {
    pub name: &'a str,
    pub phone: &'a str,
    pub email: &'a str,
    pub file: &'a Path,
    pub number: Option<u32>,
}

/// Stores an already rendered budget PDF and links it to the customer typed on it.
pub fn run(request: LinkRequest<'_>) -> CommandResult {
    with_workspace("link", |workspace| async move {
        if let Err(error) = workspace.load_for_update().await {
            return CommandResult::from_application_error("link", &error);
        }

        let bytes = match tokio::fs::read(request.file).await {
            Ok(bytes) => bytes,
            Err(error) => {
                return CommandResult::failure(
                    "link",
                    "input_file",
                    format!("could not read `{}`: {error}", request.file.display()),
                    4,
                );
            }
        };

        let contact = ContactSnapshot::new(request.name, request.phone, request.email);
        if contact.name.trim().is_empty() {
            return CommandResult::failure("link", "invalid_input", "customer name is required", 4);
        }

        let number = match request.number {
            Some(number) => BudgetNumber(number),
            None => match workspace.sequence.allocate().await {
                Ok(number) => number,
                Err(error) => return CommandResult::from_application_error("link", &error),
            },
        };
        let artifact = RenderedArtifact { display_name: number.file_name(), bytes };

        match workspace.publisher.publish_artifact(&contact, artifact).await {
            Ok(published) => {
                let already_linked = published.outcome == AttachOutcome::AlreadyLinked;
                CommandResult::success_with_data(
                    "link",
                    format!(
                        "linked `{}` to customer `{}`",
                        published.document.display_name, published.customer.name
                    ),
                    Some(json!({
                        "customer": published.customer,
                        "document": published.document,
                        "already_linked": already_linked,
                    })),
                )
            }
            Err(error) => CommandResult::from_application_error("link", &error),
        }
    })
}
