pub mod error;
pub mod memory;
pub mod store;
pub mod types;
pub mod wat;

pub use error::BlobError;
pub use memory::MemoryObjectStore;
pub use store::{ObjectStore, join_public_url};
pub use types::{PutObject, StoredObject, StoredOriginal};
pub use wat::WatBlobStore;
