//! v1 API Data Transfer Objects.
//!
//! These types define the wire format for the v1 REST API. They are kept
//! separate from the domain models in `src/models/` and handle
//! serialization, deserialization, and domain-model conversion.

pub mod common;
pub mod conflicts;
pub mod conversations;
pub mod memories;
pub mod scopes;
pub mod search;

pub use common::*;
pub use conflicts::*;
pub use conversations::*;
pub use memories::*;
pub use scopes::*;
pub use search::*;
