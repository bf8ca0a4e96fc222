pub mod error;
pub mod memory;
pub mod mysql;
pub mod traits;

pub use error::StoreErr;
pub use memory::MemoryStore;
pub use mysql::MySqlStore;
pub use traits::{ArtifactRow, ArtifactStore, CallLog};
