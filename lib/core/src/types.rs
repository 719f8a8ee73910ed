use serde::{Deserialize, Serialize};

/// Parameters for list/query operations.
#[derive(Debug, Clone, Deserialize)]
pub struct ListParams {
    /// Maximum number of results to return.
    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Offset for pagination.
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    50
}

impl Default for ListParams {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            offset: 0,
        }
    }
}

/// Result wrapper for list operations.
#[derive(Debug, Clone, Serialize)]
pub struct ListResult<T: Serialize> {
    pub items: Vec<T>,
    pub total: usize,
}

/// Identity of the person performing an operation.
///
/// Passed in by the caller on every mutating call; used for timeline detail
/// text and worker assignment binding. Role authorization happens upstream —
/// this is identity, not permission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    /// Display name (e.g. "Dewi").
    pub name: String,
    /// Role string (e.g. "production_chief", "cutter", "warehouse").
    pub role: String,
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.role)
    }
}

/// Generate a new random ID (UUIDv4, no dashes).
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string().replace('-', "")
}

/// Get the current time as an RFC 3339 string.
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id() {
        let id = new_id();
        assert_eq!(id.len(), 32);
        assert!(!id.contains('-'));
    }

    #[test]
    fn test_now_rfc3339() {
        let ts = now_rfc3339();
        assert!(ts.contains('T'));
    }

    #[test]
    fn actor_display() {
        let actor = Actor {
            name: "Dewi".into(),
            role: "cutter".into(),
        };
        assert_eq!(actor.to_string(), "Dewi (cutter)");
    }

    #[test]
    fn actor_json_roundtrip() {
        let actor = Actor {
            name: "Sari".into(),
            role: "warehouse".into(),
        };
        let json = serde_json::to_string(&actor).unwrap();
        let back: Actor = serde_json::from_str(&json).unwrap();
        assert_eq!(actor, back);
    }
}
