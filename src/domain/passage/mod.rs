//! Passages and the store that retrieves them

mod passage;
mod store;

pub use passage::{Passage, METADATA_CHUNK_INDEX, METADATA_PAGE, METADATA_SOURCE};
pub use store::{AddPassagesResult, PassageStore};

#[cfg(test)]
pub use store::mock::MockPassageStore;
