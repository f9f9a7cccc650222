use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl CustomerId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A generated artifact (the budget PDF) linked to a customer.
///
/// `locator` is the handle the artifact store hands back and is the dedup key.
/// `storage_path` is the store-relative path used to delete the artifact; it is
/// recorded when the artifact is written and never derived from `display_name`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "fileName")]
    pub display_name: String,
    #[serde(rename = "uri")]
    pub locator: String,
    #[serde(rename = "path", default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

impl Document {
    pub fn new(
        display_name: impl Into<String>,
        locator: impl Into<String>,
        storage_path: impl Into<String>,
    ) -> Self {
        Self {
            display_name: display_name.into(),
            locator: locator.into(),
            storage_path: Some(storage_path.into()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<CustomerId>,
    #[serde(rename = "nome")]
    pub name: String,
    #[serde(rename = "telefone", default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(rename = "pdfs", default)]
    pub documents: Vec<Document>,
}

impl Customer {
    /// The record's id, treating a blank id as no identity at all.
    pub fn identity(&self) -> Option<&CustomerId> {
        self.id.as_ref().filter(|id| !id.0.trim().is_empty())
    }

    pub fn has_identity(&self, id: &CustomerId) -> bool {
        self.identity() == Some(id)
    }

    pub fn has_document(&self, locator: &str) -> bool {
        self.documents.iter().any(|document| document.locator == locator)
    }

    /// Appends `document` unless its locator is already linked. Returns whether it was appended.
    pub fn attach(&mut self, document: Document) -> bool {
        if self.has_document(&document.locator) {
            return false;
        }
        self.documents.push(document);
        true
    }
}
