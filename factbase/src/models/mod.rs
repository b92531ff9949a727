mod common;
mod conflict;
mod entry;
mod update;

pub use common::*;
pub use conflict::*;
pub use entry::*;
pub use update::*;
