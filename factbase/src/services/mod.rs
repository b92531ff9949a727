mod memory;
mod search;

pub use memory::{ExtractOutcome, MemoryService};
pub use search::SearchService;
