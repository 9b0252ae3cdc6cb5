//! Passage store implementations

mod in_memory;

pub use in_memory::{InMemoryPassageStore, STORE_FILE_NAME};
