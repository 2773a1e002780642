use async_trait::async_trait;

use crate::domain::ticket::{CreateTicketRequest, CreatedTicket, Ticket};
use crate::error::AppResult;

#[async_trait]
pub trait IssueTrackerService: Send + Sync {
    async fn fetch_by_key(&self, key: &str) -> AppResult<Ticket>;

    async fn search(&self, jql: &str, max_results: u32) -> AppResult<Vec<Ticket>>;

    /// Like [`IssueTrackerService::search`], optionally limiting the fields the
    /// tracker returns for each issue.
    async fn list_sprint_by_query(
        &self,
        jql: &str,
        max_results: u32,
        fields: Option<&[&str]>,
    ) -> AppResult<Vec<Ticket>>;

    async fn create_issue(&self, request: &CreateTicketRequest) -> AppResult<CreatedTicket>;

    async fn link_epic(&self, ticket_key: &str, epic_key: &str) -> AppResult<()>;
}
