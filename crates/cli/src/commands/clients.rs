use budgetbook_core::domain::customer::{Customer, CustomerId};
use budgetbook_store::RemovalOutcome;
use serde_json::json;

use crate::commands::{with_workspace, CommandResult};

pub fn list(search: Option<&str>) -> CommandResult {
    let needle = search.map(|term| term.trim().to_lowercase()).filter(|term| !term.is_empty());
    with_workspace("clients.list", |workspace| async move {
        let customers = workspace.registry.load(false).await;
        let degraded = workspace.registry.last_load_failure().await.map(|error| error.to_string());

        let matching: Vec<Customer> = customers
            .into_iter()
            .filter(|customer| needle.as_deref().map_or(true, |term| matches_search(customer, term)))
            .collect();

        CommandResult::success_with_data(
            "clients.list",
            format!("{} customer(s)", matching.len()),
            Some(json!({ "customers": matching, "degraded": degraded })),
        )
    })
}

pub fn add(name: &str, phone: &str, email: &str) -> CommandResult {
    with_workspace("clients.add", |workspace| async move {
        if let Err(error) = workspace.load_for_update().await {
            return CommandResult::from_application_error("clients.add", &error);
        }
        match workspace.linker.add_customer(name, phone, email).await {
            Ok(customer) => CommandResult::success_with_data(
                "clients.add",
                format!("added customer `{}`", customer.name),
                Some(json!({ "customer": customer })),
            ),
            Err(error) => CommandResult::from_application_error("clients.add", &error),
        }
    })
}

pub fn update(id: &str, phone: &str, email: &str) -> CommandResult {
    let id = CustomerId(id.trim().to_string());
    with_workspace("clients.update", |workspace| async move {
        if let Err(error) = workspace.load_for_update().await {
            return CommandResult::from_application_error("clients.update", &error);
        }
        match workspace.linker.update_contact(&id, phone, email).await {
            Ok(customer) => CommandResult::success_with_data(
                "clients.update",
                format!("updated customer `{}`", customer.name),
                Some(json!({ "customer": customer })),
            ),
            Err(error) => CommandResult::from_application_error("clients.update", &error),
        }
    })
}

pub fn remove(id: &str) -> CommandResult {
    let id = CustomerId(id.trim().to_string());
    with_workspace("clients.remove", |workspace| async move {
        if let Err(error) = workspace.load_for_update().await {
            return CommandResult::from_application_error("clients.remove", &error);
        }
        let target = workspace
            .registry
            .all()
            .await
            .into_iter()
            .find(|customer| customer.has_identity(&id));
        let Some(target) = target else {
            return CommandResult::failure(
                "clients.remove",
                "customer_not_found",
                format!("no customer with id `{id}`"),
                6,
            );
        };

        match workspace.linker.remove_customer(&target).await {
            Ok(RemovalOutcome::Removed { customer, cleanup }) => {
                let warning = cleanup.warning().map(|warning| warning.to_string());
                CommandResult::success_with_data(
                    "clients.remove",
                    format!(
                        "removed customer `{}`; deleted {} of {} document(s)",
                        customer.name, cleanup.deleted, cleanup.attempted
                    ),
                    Some(json!({ "customer": customer, "warning": warning })),
                )
            }
            Ok(RemovalOutcome::NotFound) => CommandResult::failure(
                "clients.remove",
                "customer_not_found",
                format!("no customer with id `{id}`"),
                6,
            ),
            Err(error) => CommandResult::from_application_error("clients.remove", &error),
        }
    })
}

fn matches_search(customer: &Customer, term: &str) -> bool {
    customer.name.to_lowercase().contains(term)
        || customer.phone.as_deref().is_some_and(|phone| phone.contains(term))
        || customer.email.as_deref().is_some_and(|email| email.to_lowercase().contains(term))
}

#[cfg(test)]
mod tests {
    use budgetbook_core::domain::customer::{Customer, CustomerId};

    use super::matches_search;

    #[test]
    fn search_covers_name_phone_and_email() {
        let customer = Customer {
            id: Some(CustomerId("c1".to_string())),
            name: "Ana Silva".to_string(),
            phone: Some("11 9999".to_string()),
            email: Some("Ana@Mail.com".to_string()),
            documents: Vec::new(),
        };

        assert!(matches_search(&customer, "silva"));
        assert!(matches_search(&customer, "9999"));
        assert!(matches_search(&customer, "ana@mail"));
        assert!(!matches_search(&customer, "bruno"));
    }
}
