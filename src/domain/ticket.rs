use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

pub const DEFAULT_ISSUE_TYPE: &str = "Story";

static ISSUE_KEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9_]*-\d+$")
        .unwrap_or_else(|err| panic!("issue key pattern is invalid: {err}"))
});

/// Whether `value` looks like `PROJ-123`. Keys end up in request paths, so
/// anything else is refused before it reaches the tracker.
pub fn is_issue_key(value: &str) -> bool {
    ISSUE_KEY.is_match(value)
}

/// A tracker record as read back from the issue tracker.
///
/// `key` is the human-facing identifier (`PROJ-123`), `id` the tracker's
/// internal one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: String,
    pub key: String,
    pub summary: String,
    pub description: Option<String>,
    pub status: String,
    pub issue_type: String,
    pub priority: String,
    pub assignee: Option<String>,
    pub created: String,
    pub updated: String,
    pub sprint: Option<Sprint>,
    pub subtasks: Vec<Ticket>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sprint {
    pub id: u64,
    pub name: String,
    pub state: String,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTicketRequest {
    pub project_key: String,
    pub summary: String,
    pub description: Option<String>,
    pub epic_key: Option<String>,
    pub issue_type: String,
}

/// The JSON document accepted by `create --json`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketPayload {
    pub project_key: String,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub epic_key: Option<String>,
    #[serde(default)]
    pub issue_type: Option<String>,
}

impl TicketPayload {
    pub fn into_request(self, default_issue_type: &str) -> CreateTicketRequest {
        CreateTicketRequest {
            project_key: self.project_key,
            summary: self.summary,
            description: self.description.filter(|d| !d.trim().is_empty()),
            epic_key: self.epic_key.filter(|k| !k.trim().is_empty()),
            issue_type: self
                .issue_type
                .unwrap_or_else(|| default_issue_type.to_string()),
        }
    }
}

/// What the tracker hands back after creating an issue.
#[derive(Debug, Clone)]
pub struct CreatedTicket {
    pub id: String,
    pub key: String,
    pub url: Option<String>,
}
