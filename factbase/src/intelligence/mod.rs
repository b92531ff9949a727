pub mod contradiction;
pub mod detector;
pub mod extraction;
pub mod resolver;
pub mod types;
pub mod utils;

pub use contradiction::{ContradictionDetector, ContradictionSignal};
pub use detector::ConflictDetector;
pub use extraction::ExtractionService;
pub use resolver::ConflictResolver;
