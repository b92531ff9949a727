pub mod conflicts;
pub mod conversations;
pub(crate) mod health;
pub mod memories;
pub mod scopes;
pub mod search;

pub use health::health_check;

use crate::error::Result;
use crate::models::ScopeId;

/// Validate the `{scopeId}` path segment.
pub(crate) fn scope_from_path(raw: String) -> Result<ScopeId> {
    ScopeId::new(raw)
}
