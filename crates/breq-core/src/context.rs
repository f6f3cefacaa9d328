//! Context type identifying a single script run

use serde::{Deserialize, Serialize};
use ulid::Ulid;

/// Context for tracking which run produced an event
///
/// Every run gets a fresh Context so observers that outlive a run (log
/// buffers, event bus subscribers) can tell consecutive runs apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    /// Unique identifier for this run (ULID)
    pub id: String,

    /// Name of the script being run, usually the file stem
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

impl Context {
    /// Context for an unnamed run
    pub fn new() -> Self {
        Self {
            id: Ulid::new().to_string(),
            script: None,
        }
    }

    /// Context for a run of the script called `script`
    pub fn for_script(script: impl Into<String>) -> Self {
        Self {
            id: Ulid::new().to_string(),
            script: Some(script.into()),
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_ids_are_unique() {
        let a = Context::new();
        let b = Context::new();
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn test_for_script() {
        let ctx = Context::for_script("homing");
        assert_eq!(ctx.script.as_deref(), Some("homing"));
        assert_eq!(ctx.id.len(), 26);
    }
}
