pub mod db;
pub mod identity;
pub mod mail;
pub mod memory;
pub mod passwords;
pub mod watchers;

pub use db::PgDocumentStore;
pub use identity::PgIdentityAdapter;
pub use mail::{OutboxMailer, TracingMailer};
pub use memory::{MemoryDocumentStore, MemoryIdentity};
