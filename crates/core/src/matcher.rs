//! Weak-identity matching of a budget's contact fields against the registry.
//!
//! The name is the anchor. A stored customer with the same name is the same
//! person when at least one contact field agrees on both sides; a query that
//! carries no contact fields at all falls back to a name-only match.

use crate::domain::customer::{Customer, CustomerId};
use crate::errors::DomainError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContactQuery {
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
}

impl ContactQuery {
    pub fn normalize(name: &str, phone: &str, email: &str) -> Result<Self, DomainError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::InvalidInput("customer name must not be empty".to_string()));
        }

        Ok(Self {
            name: name.to_string(),
            phone: non_empty(phone.trim().to_string()),
            email: non_empty(email.trim().to_lowercase()),
        })
    }

    pub fn has_contact(&self) -> bool {
        self.phone.is_some() || self.email.is_some()
    }

    pub fn into_customer(self, id: CustomerId) -> Customer {
        Customer {
            id: Some(id),
            name: self.name,
            phone: self.phone,
            email: self.email,
            documents: Vec::new(),
        }
    }

    /// Same name and identical contact fields, used to reject duplicate manual entries.
    pub fn is_same_record(&self, customer: &Customer) -> bool {
        customer.name.trim() == self.name
            && stored_phone(customer) == self.phone
            && stored_email(customer) == self.email
    }
}

/// Index of the first customer the query refers to, if any.
pub fn find_match(customers: &[Customer], query: &ContactQuery) -> Option<usize> {
    let confirmed = customers.iter().position(|customer| {
        customer.name.trim() == query.name
            && (agrees(query.phone.as_deref(), stored_phone(customer).as_deref())
                || agrees(query.email.as_deref(), stored_email(customer).as_deref()))
    });
    if confirmed.is_some() {
        return confirmed;
    }

    if query.has_contact() {
        return None;
    }
    customers.iter().position(|customer| customer.name.trim() == query.name)
}

fn agrees(query: Option<&str>, stored: Option<&str>) -> bool {
    matches!((query, stored), (Some(query), Some(stored)) if query == stored)
}

fn stored_phone(customer: &Customer) -> Option<String> {
    customer.phone.as_deref().map(str::trim).map(str::to_string).and_then(non_empty)
}

fn stored_email(customer: &Customer) -> Option<String> {
    customer.email.as_deref().map(|email| email.trim().to_lowercase()).and_then(non_empty)
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}
