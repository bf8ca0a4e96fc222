pub mod cache;
pub mod error;
pub mod front;
pub mod index;
pub mod serve;
pub mod sync;

pub use cache::CacheDir;
pub use error::{ServeErr, SyncErr};
pub use front::ServingFront;
pub use index::{IndexHandle, ModelIndex};
pub use sync::{ModelSynchronizer, SyncOutcome, SyncReport};
