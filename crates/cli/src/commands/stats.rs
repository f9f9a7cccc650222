use serde_json::json;

use crate::commands::{with_workspace, CommandResult};

pub fn run() -> CommandResult {
    with_workspace("stats", |workspace| async move {
        workspace.registry.load(false).await;
        let customers = workspace.registry.count().await;
        let documents = workspace.registry.document_count().await;
        let next_number = match workspace.sequence.peek().await {
            Ok(number) => number,
            Err(error) => return CommandResult::from_application_error("stats", &error),
        };
        let degraded = workspace.registry.last_load_failure().await.map(|error| error.to_string());

        CommandResult::success_with_data(
            "stats",
            format!("{customers} customer(s), {documents} document(s)"),
            Some(json!({
                "customers": customers,
                "documents": documents,
                "next_budget": next_number.to_string(),
                "degraded": degraded,
            })),
        )
    })
}
