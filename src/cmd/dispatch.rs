use std::fs;
use std::io;

use crate::cmd::parse::STDIN_PATH;
use crate::context::AppContext;
use crate::domain::intent::Intent;
use crate::domain::query::{
    DEFAULT_MAX_RESULTS, SearchCriteria, build_search_query, current_sprint_query,
};
use crate::domain::ticket::{CreateTicketRequest, TicketPayload};
use crate::error::{AppError, AppResult};
use crate::format::{format_ticket, format_ticket_list};
use crate::workflow::create::create_ticket;

pub const USAGE: &str = "Invalid command. Available commands:
TICKET-123
ticket TICKET-123
fetch ticket TICKET-123
search text or search \"text with spaces\"
sprint PROJECT-KEY (current sprint)
sprint PROJECT-KEY assignee John Doe (current sprint by assignee)
sprint tickets PROJECT-KEY SPRINT-ID
create --json <path>";

/// Fields requested when listing the current sprint.
pub const SPRINT_FIELDS: &[&str] = &[
    "summary",
    "status",
    "sprint",
    "issuetype",
    "priority",
    "assignee",
    "description",
];

/// Runs one intent against the issue tracker and renders the result.
pub async fn dispatch(ctx: &AppContext, intent: Intent) -> AppResult<String> {
    let tracker = &ctx.issue_tracker;

    match intent {
        Intent::FetchTicket { ticket_id } => {
            let ticket = tracker
                .fetch_by_key(&ticket_id)
                .await
                .map_err(|err| err.during(format!("failed to fetch ticket {ticket_id}")))?;
            tracing::debug!(
                id = %ticket.id,
                created = %ticket.created,
                updated = %ticket.updated,
                "fetched ticket"
            );
            Ok(format_ticket(&ticket))
        }
        Intent::Search { search_text } => {
            let criteria = SearchCriteria::text(search_text);
            let jql = build_search_query(&criteria);
            tracing::debug!(%jql, "searching tickets");
            let tickets = tracker
                .search(&jql, criteria.max_results)
                .await
                .map_err(|err| err.during(format!("failed to search tickets with `{jql}`")))?;
            Ok(format_ticket_list(&tickets))
        }
        Intent::SprintCurrent {
            project_key,
            assignee,
        } => {
            let jql = current_sprint_query(&project_key, assignee.as_deref());
            tracing::debug!(%jql, "listing current sprint");
            let tickets = tracker
                .list_sprint_by_query(&jql, DEFAULT_MAX_RESULTS, Some(SPRINT_FIELDS))
                .await
                .map_err(|err| {
                    err.during(format!("failed to list current sprint for {project_key}"))
                })?;
            if let Some(sprint) = tickets.first().and_then(|ticket| ticket.sprint.as_ref()) {
                tracing::debug!(
                    sprint_id = sprint.id,
                    state = %sprint.state,
                    start = ?sprint.start_date,
                    end = ?sprint.end_date,
                    "current sprint"
                );
            }
            Ok(format_ticket_list(&tickets))
        }
        Intent::SprintTickets {
            project_key,
            sprint_id,
        } => {
            let criteria = SearchCriteria::sprint(&project_key, &sprint_id);
            let jql = build_search_query(&criteria);
            tracing::debug!(%jql, "listing sprint tickets");
            let tickets = tracker
                .search(&jql, criteria.max_results)
                .await
                .map_err(|err| {
                    err.during(format!(
                        "failed to list sprint {sprint_id} for {project_key}"
                    ))
                })?;
            Ok(format_ticket_list(&tickets))
        }
        Intent::CreateTicket {
            project_key,
            summary,
            description,
            epic_key,
            issue_type,
        } => {
            let request = CreateTicketRequest {
                project_key,
                summary,
                description,
                epic_key,
                issue_type: issue_type.unwrap_or_else(|| ctx.config.default_issue_type.clone()),
            };
            create(ctx, request).await
        }
        Intent::CreateFromFile { path } => {
            let request = read_payload(&path)?.into_request(&ctx.config.default_issue_type);
            create(ctx, request).await
        }
        Intent::Invalid { raw_input } => {
            tracing::debug!(%raw_input, "no command rule matched");
            Ok(USAGE.to_string())
        }
    }
}

async fn create(ctx: &AppContext, request: CreateTicketRequest) -> AppResult<String> {
    let outcome = create_ticket(ctx, request).await?;

    let mut lines = vec![format!(
        "Created ticket {}: {}",
        outcome.ticket.key, outcome.summary
    )];
    if let Some(epic_key) = &outcome.epic_key {
        lines.push(format!("Linked to epic {epic_key}"));
    }
    if let Some(url) = &outcome.ticket.url {
        lines.push(format!("View ticket: {url}"));
    }
    Ok(lines.join("\n"))
}

/// Loads a `create --json` payload from a file, or from stdin for `-`.
fn read_payload(path: &str) -> AppResult<TicketPayload> {
    let (source, contents) = if path == STDIN_PATH {
        ("standard input", io::read_to_string(io::stdin()))
    } else {
        (path, fs::read_to_string(path))
    };

    let config_error = |reason: String| AppError::ConfigRead {
        path: source.to_string(),
        reason,
    };
    let contents = contents.map_err(|err| config_error(err.to_string()))?;
    serde_json::from_str(&contents).map_err(|err| config_error(format!("invalid JSON: {err}")))
}
