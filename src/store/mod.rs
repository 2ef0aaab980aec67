pub mod bin_store;
pub mod history_store;
pub mod memory;

pub use bin_store::BinStore;
pub use history_store::HistoryStore;
pub use memory::{InMemoryBinStore, InMemoryHistoryStore};
