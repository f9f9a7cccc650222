pub mod config;
pub mod domain;
pub mod errors;
pub mod matcher;
pub mod share;

pub use domain::budget::{BudgetNumber, ContactSnapshot, RenderedArtifact};
pub use domain::customer::{Customer, CustomerId, Document};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use matcher::{find_match, ContactQuery};
pub use share::ShareMessage;
