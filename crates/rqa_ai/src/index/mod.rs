mod model;
mod store;

pub use model::{IndexMeta, IndexStatus, ScoredChunk, StoredVector, INDEX_FORMAT_VERSION};
pub use store::{IndexHandle, IndexStore};
