use budgetbook_core::domain::customer::CustomerId;
use budgetbook_core::share::ShareMessage;
use serde_json::json;

use crate::commands::{with_workspace, CommandResult};

pub fn run(customer_id: &str, file_name: &str) -> CommandResult {
    let id = CustomerId(customer_id.trim().to_string());
    with_workspace("share", |workspace| async move {
        let customers = workspace.registry.load(false).await;
        let Some(customer) = customers.iter().find(|customer| customer.has_identity(&id)) else {
            return CommandResult::failure(
                "share",
                "customer_not_found",
                format!("no customer with id `{id}`"),
                6,
            );
        };
        let Some(document) =
            customer.documents.iter().find(|document| document.display_name == file_name)
        else {
            return CommandResult::failure(
                "share",
                "document_not_found",
                format!("customer `{}` has no document `{file_name}`", customer.name),
                6,
            );
        };

        let message = ShareMessage::for_document(
            workspace.config.company.display_name(),
            &customer.name,
            document,
        );
        CommandResult::success_with_data(
            "share",
            message.subject.clone(),
            Some(json!({ "share": message })),
        )
    })
}
