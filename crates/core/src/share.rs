use serde::Serialize;

use crate::domain::budget::BudgetNumber;
use crate::domain::customer::Document;

const DEFAULT_COMPANY: &str = "Sua Empresa";
const DEFAULT_CUSTOMER: &str = "Cliente";

/// Subject and body handed to the platform share sheet alongside a document locator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ShareMessage {
    pub subject: String,
    pub body: String,
    pub locator: String,
}

impl ShareMessage {
    pub fn for_document(company_name: &str, customer_name: &str, document: &Document) -> Self {
        let company = fallback(company_name, DEFAULT_COMPANY);
        let customer = fallback(customer_name, DEFAULT_CUSTOMER);
        let number = BudgetNumber::parse_file_name(&document.display_name)
            .map(|number| number.to_string())
            .unwrap_or_else(|| document.display_name.clone());

        let subject = format!("Orçamento Nº {number} - {company}");
        let body = format!(
            "Olá {customer},\n\nConforme solicitado, segue em anexo o orçamento Nº {number} ({file}).\n\nQualquer dúvida, estamos à disposição.\n\nAtenciosamente,\n{company}",
            file = document.display_name,
        );

        Self { subject, body, locator: document.locator.clone() }
    }
}

fn fallback<'a>(value: &'a str, default: &'a str) -> &'a str {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        default
    } else {
        trimmed
    }
}
