pub mod linker;
pub mod publisher;
pub mod registry;
pub mod resolver;
pub mod sequence;
pub mod storage;

pub use linker::{AttachOutcome, CleanupFailure, CleanupReport, DocumentLinker, RemovalOutcome};
pub use publisher::{BudgetPublisher, PublishedBudget};
pub use registry::{LoadPhase, RegistryNotice, RegistryStore};
pub use resolver::CustomerResolver;
pub use sequence::BudgetSequence;
pub use storage::{ByteStore, FsByteStore, InMemoryByteStore, Presence, StorageError};
