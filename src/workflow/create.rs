use crate::context::AppContext;
use crate::domain::ticket::{CreateTicketRequest, CreatedTicket, is_issue_key};
use crate::error::{AppError, AppResult};

pub struct CreateWorkflowOutcome {
    pub ticket: CreatedTicket,
    pub summary: String,
    pub epic_key: Option<String>,
}

/// Creates the issue and, when an epic is named, verifies the epic exists
/// before linking the new issue under it. Each step runs only after the
/// previous one succeeded.
pub async fn create_ticket(
    ctx: &AppContext,
    request: CreateTicketRequest,
) -> AppResult<CreateWorkflowOutcome> {
    if let Some(epic_key) = request.epic_key.as_deref().filter(|key| !is_issue_key(key)) {
        let operation = format!("refusing to create ticket in {}", request.project_key);
        return Err(AppError::InvalidKey(epic_key.to_string()).during(operation));
    }

    let ticket = ctx
        .issue_tracker
        .create_issue(&request)
        .await
        .map_err(|err| {
            err.during(format!("failed to create ticket in {}", request.project_key))
        })?;
    tracing::info!(key = %ticket.key, id = %ticket.id, "created ticket");

    if let Some(epic_key) = &request.epic_key {
        ctx.issue_tracker
            .fetch_by_key(epic_key)
            .await
            .map_err(|err| {
                err.during(format!(
                    "created ticket {} but failed to verify epic {epic_key}",
                    ticket.key
                ))
            })?;
        ctx.issue_tracker
            .link_epic(&ticket.key, epic_key)
            .await
            .map_err(|err| {
                err.during(format!(
                    "failed to link ticket {} to epic {epic_key}",
                    ticket.key
                ))
            })?;
        tracing::info!(key = %ticket.key, epic = %epic_key, "linked ticket to epic");
    }

    Ok(CreateWorkflowOutcome {
        ticket,
        summary: request.summary,
        epic_key: request.epic_key,
    })
}
