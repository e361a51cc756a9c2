//! Grant sources: the remote table contract, the catalog file fallback, the
//! admin mutation gateway, and the reload coordinator.

mod error;
pub use error::{AdminError, FallbackError, LoadError, RemoteError, SyncError, SyncWarning};

pub mod admin;
pub mod fallback;
pub mod memory;
pub mod reload;
pub mod remote;
pub mod source;

pub use admin::AdminGateway;
pub use fallback::{FallbackFile, GrantsDocument, export_list};
pub use memory::MemoryStore;
pub use reload::{ReloadCoordinator, ReloadEvent, ReloadHandle, Trigger};
pub use remote::{ChangeEvent, ChangeKind, DOCUMENT_ROW_ID, RemoteStore, StoredRow};
pub use source::{DataSource, LoadOutcome, Origin, Precedence, SourcePolicy};
