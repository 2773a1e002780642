use std::collections::HashMap;

use async_trait::async_trait;
use base64::prelude::{BASE64_STANDARD, Engine as _};
use reqwest::{
    Client, RequestBuilder, Response,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::config::{ApiVersion, AppConfig};
use crate::domain::ticket::{CreateTicketRequest, CreatedTicket, Sprint, Ticket, is_issue_key};
use crate::error::{AppError, AppResult};
use crate::services::IssueTrackerService;

const UNKNOWN: &str = "Unknown";

pub struct JiraClient {
    http: Client,
    base_url: Option<String>,
    username: Option<String>,
    token: Option<String>,
    api_version: ApiVersion,
    epic_link_field: String,
    sprint_field: String,
}

impl JiraClient {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: Client::new(),
            base_url: config.jira_base_url.clone(),
            username: config.jira_username.clone(),
            token: config.jira_token.clone(),
            api_version: config.api_version,
            epic_link_field: config.epic_link_field.clone(),
            sprint_field: config.sprint_field.clone(),
        }
    }

    fn api_details(&self) -> AppResult<(&str, &str, &str)> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira host not configured".to_string()))?;
        let username = self
            .username
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira username not configured".to_string()))?;
        let token = self
            .token
            .as_deref()
            .ok_or_else(|| AppError::Configuration("Jira API token not configured".to_string()))?;
        Ok((base_url, username, token))
    }

    fn auth_header(username: &str, token: &str) -> String {
        let credentials = format!("{username}:{token}");
        let encoded = BASE64_STANDARD.encode(credentials);
        format!("Basic {encoded}")
    }

    fn endpoint(base_url: &str, api_version: ApiVersion, path: &str) -> String {
        format!(
            "{}/rest/api/{}/{}",
            base_url.trim_end_matches('/'),
            api_version.as_str(),
            path
        )
    }

    fn browse_url(base_url: &str, key: &str) -> String {
        format!("{}/browse/{}", base_url.trim_end_matches('/'), key)
    }

    /// Path of a single issue. Keys are checked first so they cannot step
    /// outside the issue resource.
    fn issue_path(key: &str) -> AppResult<String> {
        let key = key.trim();
        if !is_issue_key(key) {
            return Err(AppError::InvalidKey(key.to_string()));
        }
        Ok(format!("issue/{key}"))
    }

    /// Builds an authenticated request against `path` under the REST API root.
    fn request(&self, method: reqwest::Method, path: &str) -> AppResult<RequestBuilder> {
        let (base_url, username, token) = self.api_details()?;
        let url = Self::endpoint(base_url, self.api_version, path);
        tracing::debug!(%method, %url, "calling Jira");
        Ok(self
            .http
            .request(method, url)
            .header(AUTHORIZATION, Self::auth_header(username, token))
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json"))
    }

    async fn send(request: RequestBuilder) -> AppResult<Response> {
        let response = request
            .send()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to call Jira: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unable to read response>".to_string());
            return Err(AppError::IssueTracker(format!(
                "Jira responded with {status}: {}",
                body.trim()
            )));
        }
        Ok(response)
    }

    async fn send_json<T: DeserializeOwned>(request: RequestBuilder) -> AppResult<T> {
        Self::send(request)
            .await?
            .json()
            .await
            .map_err(|err| AppError::IssueTracker(format!("failed to parse Jira response: {err}")))
    }

    async fn run_search(
        &self,
        jql: &str,
        max_results: u32,
        fields: Option<Vec<String>>,
    ) -> AppResult<Vec<Ticket>> {
        let body = JiraSearchRequest {
            jql,
            max_results,
            fields,
        };
        let request = self.request(reqwest::Method::POST, "search")?.json(&body);
        let payload: JiraSearchResponse = Self::send_json(request).await?;
        Ok(payload
            .issues
            .into_iter()
            .map(|issue| issue.into_ticket(&self.sprint_field))
            .collect())
    }
}

#[async_trait]
impl IssueTrackerService for JiraClient {
    async fn fetch_by_key(&self, key: &str) -> AppResult<Ticket> {
        let request = self
            .request(reqwest::Method::GET, &Self::issue_path(key)?)?
            .query(&[("fields", "*all")]);
        let issue: JiraIssue = Self::send_json(request).await?;
        Ok(issue.into_ticket(&self.sprint_field))
    }

    async fn search(&self, jql: &str, max_results: u32) -> AppResult<Vec<Ticket>> {
        self.run_search(jql, max_results, None).await
    }

    async fn list_sprint_by_query(
        &self,
        jql: &str,
        max_results: u32,
        fields: Option<&[&str]>,
    ) -> AppResult<Vec<Ticket>> {
        let fields = fields.map(|fields| {
            let mut fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
            if !fields.contains(&self.sprint_field) {
                fields.push(self.sprint_field.clone());
            }
            fields
        });
        self.run_search(jql, max_results, fields).await
    }

    async fn create_issue(&self, request: &CreateTicketRequest) -> AppResult<CreatedTicket> {
        let project_key = request.project_key.trim();
        if project_key.is_empty() {
            return Err(AppError::IssueTracker(
                "project key must not be empty".to_string(),
            ));
        }
        if request.summary.trim().is_empty() {
            return Err(AppError::IssueTracker(
                "ticket summary must not be empty".to_string(),
            ));
        }

        let body = JiraCreateIssueRequest::new(project_key, request, self.api_version);
        let http_request = self.request(reqwest::Method::POST, "issue")?.json(&body);
        let payload: JiraCreateIssueResponse = Self::send_json(http_request).await?;

        let url = self
            .base_url
            .as_deref()
            .map(|base_url| Self::browse_url(base_url, &payload.key))
            .or(payload.self_url);

        Ok(CreatedTicket {
            id: payload.id,
            key: payload.key,
            url,
        })
    }

    async fn link_epic(&self, ticket_key: &str, epic_key: &str) -> AppResult<()> {
        let mut fields = Map::new();
        fields.insert(
            self.epic_link_field.clone(),
            Value::String(epic_key.to_string()),
        );
        let request = self
            .request(reqwest::Method::PUT, &Self::issue_path(ticket_key)?)?
            .json(&json!({ "fields": fields }));
        Self::send(request).await?;
        Ok(())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JiraSearchRequest<'a> {
    jql: &'a str,
    max_results: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct JiraSearchResponse {
    #[serde(default)]
    issues: Vec<JiraIssue>,
}

#[derive(Deserialize)]
struct JiraIssue {
    id: String,
    key: String,
    #[serde(default)]
    fields: JiraIssueFields,
}

#[derive(Deserialize, Default)]
struct JiraIssueFields {
    summary: Option<String>,
    description: Option<Value>,
    status: Option<JiraNamed>,
    issuetype: Option<JiraNamed>,
    priority: Option<JiraNamed>,
    assignee: Option<JiraUser>,
    created: Option<String>,
    updated: Option<String>,
    sprint: Option<Value>,
    subtasks: Option<Vec<JiraIssue>>,
    #[serde(flatten)]
    custom: HashMap<String, Value>,
}

#[derive(Deserialize)]
struct JiraNamed {
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraUser {
    display_name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JiraSprint {
    id: u64,
    name: String,
    #[serde(default)]
    state: String,
    start_date: Option<String>,
    end_date: Option<String>,
}

impl JiraIssue {
    fn into_ticket(self, sprint_field: &str) -> Ticket {
        let mut fields = self.fields;
        let sprint = fields
            .sprint
            .take()
            .or_else(|| fields.custom.remove(sprint_field))
            .and_then(|value| pick_sprint(&value));
        let named =
            |value: Option<JiraNamed>| value.map_or_else(|| UNKNOWN.to_string(), |n| n.name);

        Ticket {
            id: self.id,
            key: self.key,
            summary: fields.summary.unwrap_or_default(),
            description: fields.description.as_ref().and_then(description_text),
            status: named(fields.status),
            issue_type: named(fields.issuetype),
            priority: named(fields.priority),
            assignee: fields.assignee.map(|user| user.display_name),
            created: fields.created.unwrap_or_default(),
            updated: fields.updated.unwrap_or_default(),
            sprint,
            subtasks: fields
                .subtasks
                .unwrap_or_default()
                .into_iter()
                .map(|subtask| subtask.into_ticket(sprint_field))
                .collect(),
        }
    }
}

/// Sprint data is a single object on some instances and a list on others;
/// from a list the active sprint wins, otherwise the most recent one.
fn pick_sprint(value: &Value) -> Option<Sprint> {
    let candidates: Vec<JiraSprint> = match value {
        Value::Array(items) => items
            .iter()
            .filter_map(|item| serde_json::from_value(item.clone()).ok())
            .collect(),
        Value::Object(_) => serde_json::from_value(value.clone())
            .ok()
            .into_iter()
            .collect(),
        _ => Vec::new(),
    };

    let index = candidates
        .iter()
        .position(|sprint| sprint.state.eq_ignore_ascii_case("active"))
        .or_else(|| candidates.len().checked_sub(1))?;
    let chosen = candidates.into_iter().nth(index)?;

    Some(Sprint {
        id: chosen.id,
        name: chosen.name,
        state: chosen.state,
        start_date: chosen.start_date,
        end_date: chosen.end_date,
    })
}

/// Plain text on API v2, an Atlassian document on v3.
fn description_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(text) => text.clone(),
        Value::Object(_) => {
            let mut text = String::new();
            collect_document_text(value, &mut text);
            text
        }
        _ => return None,
    };
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn collect_document_text(node: &Value, out: &mut String) {
    let node_type = node.get("type").and_then(Value::as_str);
    if node_type == Some("hardBreak") {
        out.push('\n');
    }
    if let Some(text) = node.get("text").and_then(Value::as_str) {
        out.push_str(text);
    }
    if let Some(children) = node.get("content").and_then(Value::as_array) {
        for child in children {
            collect_document_text(child, out);
        }
    }
    if matches!(node_type, Some("paragraph" | "heading" | "codeBlock" | "listItem")) {
        out.push('\n');
    }
}

#[derive(Serialize)]
struct JiraCreateIssueRequest {
    fields: JiraCreateIssueFields,
}

impl JiraCreateIssueRequest {
    fn new(project_key: &str, request: &CreateTicketRequest, api_version: ApiVersion) -> Self {
        let description = request
            .description
            .as_deref()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(|text| match api_version {
                ApiVersion::V2 => JiraDescription::Plain(text.to_string()),
                ApiVersion::V3 => JiraDescription::Document(JiraDocument::from_text(text)),
            });

        Self {
            fields: JiraCreateIssueFields {
                project: JiraProject {
                    key: project_key.to_string(),
                },
                summary: request.summary.trim().to_string(),
                description,
                issuetype: JiraIssueType {
                    name: request.issue_type.clone(),
                },
            },
        }
    }
}

#[derive(Serialize)]
struct JiraCreateIssueFields {
    project: JiraProject,
    summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<JiraDescription>,
    issuetype: JiraIssueType,
}

#[derive(Serialize)]
struct JiraProject {
    key: String,
}

#[derive(Serialize)]
struct JiraIssueType {
    name: String,
}

#[derive(Serialize)]
#[serde(untagged)]
enum JiraDescription {
    Plain(String),
    Document(JiraDocument),
}

#[derive(Serialize)]
struct JiraDocument {
    #[serde(rename = "type")]
    doc_type: &'static str,
    version: u8,
    content: Vec<JiraDocNode>,
}

impl JiraDocument {
    /// Blank-line separated blocks become paragraphs.
    fn from_text(description: &str) -> Self {
        let cleaned = description.replace('\r', "");
        let content = cleaned
            .split("\n\n")
            .map(|section| section.trim())
            .filter(|section| !section.is_empty())
            .map(|section| JiraDocNode::paragraph(section.replace('\n', " ")))
            .collect();

        Self {
            doc_type: "doc",
            version: 1,
            content,
        }
    }
}

#[derive(Serialize)]
struct JiraDocNode {
    #[serde(rename = "type")]
    node_type: &'static str,
    content: Vec<JiraDocText>,
}

impl JiraDocNode {
    fn paragraph(text: String) -> Self {
        Self {
            node_type: "paragraph",
            content: vec![JiraDocText::text(text)],
        }
    }
}

#[derive(Serialize)]
struct JiraDocText {
    #[serde(rename = "type")]
    text_type: &'static str,
    text: String,
}

impl JiraDocText {
    fn text(text: String) -> Self {
        Self {
            text_type: "text",
            text,
        }
    }
}

#[derive(Deserialize)]
struct JiraCreateIssueResponse {
    id: String,
    key: String,
    #[serde(rename = "self")]
    self_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use base64::prelude::Engine as _;

    use super::*;

    fn issue(value: Value) -> Ticket {
        serde_json::from_value::<JiraIssue>(value)
            .unwrap()
            .into_ticket("customfield_10020")
    }

    fn request(description: Option<&str>) -> CreateTicketRequest {
        CreateTicketRequest {
            project_key: "ABC".to_string(),
            summary: " Title ".to_string(),
            description: description.map(str::to_string),
            epic_key: None,
            issue_type: "Bug".to_string(),
        }
    }

    #[test]
    fn maps_full_issue() {
        let ticket = issue(json!({
            "id": "10042",
            "key": "ABC-7",
            "fields": {
                "summary": "Fix login",
                "description": "Users cannot sign in",
                "status": { "name": "In Progress" },
                "issuetype": { "name": "Bug" },
                "priority": { "name": "High" },
                "assignee": { "displayName": "Jane Doe", "emailAddress": "jane@acme.io" },
                "created": "2026-01-05T10:00:00.000+0000",
                "updated": "2026-01-06T10:00:00.000+0000",
                "subtasks": [
                    { "id": "10043", "key": "ABC-8", "fields": {
                        "summary": "Write test", "status": { "name": "Done" } } }
                ]
            }
        }));

        assert_eq!(ticket.id, "10042");
        assert_eq!(ticket.key, "ABC-7");
        assert_eq!(ticket.description.as_deref(), Some("Users cannot sign in"));
        assert_eq!(ticket.assignee.as_deref(), Some("Jane Doe"));
        assert_eq!(ticket.priority, "High");
        assert_eq!(ticket.subtasks.len(), 1);
        assert_eq!(ticket.subtasks[0].key, "ABC-8");
        assert_eq!(ticket.subtasks[0].status, "Done");
        assert_eq!(ticket.subtasks[0].priority, UNKNOWN);
    }

    #[test]
    fn default_fills_missing_fields() {
        let ticket = issue(json!({
            "id": "1",
            "key": "ABC-1",
            "fields": { "description": null, "assignee": null, "subtasks": null }
        }));
        assert_eq!(ticket.summary, "");
        assert_eq!(ticket.status, UNKNOWN);
        assert_eq!(ticket.issue_type, UNKNOWN);
        assert_eq!(ticket.description, None);
        assert_eq!(ticket.assignee, None);
        assert!(ticket.subtasks.is_empty());

        let bare = issue(json!({ "id": "2", "key": "ABC-2" }));
        assert_eq!(bare.priority, UNKNOWN);
    }

    #[test]
    fn reads_sprint_object() {
        let ticket = issue(json!({
            "id": "1",
            "key": "ABC-1",
            "fields": { "sprint": { "id": 3, "name": "Sprint 3", "state": "active" } }
        }));
        assert_eq!(ticket.sprint.map(|s| s.name), Some("Sprint 3".to_string()));
    }

    #[test]
    fn reads_sprint_dates() {
        let sprint = pick_sprint(&json!({
            "id": 3,
            "name": "Sprint 3",
            "state": "active",
            "startDate": "2026-01-05T09:00:00.000Z",
            "endDate": "2026-01-19T17:00:00.000Z"
        }))
        .unwrap();
        assert_eq!(sprint.start_date.as_deref(), Some("2026-01-05T09:00:00.000Z"));
        assert_eq!(sprint.end_date.as_deref(), Some("2026-01-19T17:00:00.000Z"));

        let undated = pick_sprint(&json!({ "id": 4, "name": "Sprint 4" })).unwrap();
        assert_eq!(undated.start_date, None);
        assert_eq!(undated.end_date, None);
    }

    #[test]
    fn prefers_active_sprint_from_custom_field_list() {
        let ticket = issue(json!({
            "id": "1",
            "key": "ABC-1",
            "fields": { "customfield_10020": [
                { "id": 1, "name": "Sprint 1", "state": "closed" },
                { "id": 2, "name": "Sprint 2", "state": "active" },
                { "id": 3, "name": "Sprint 3", "state": "future" }
            ] }
        }));
        let sprint = ticket.sprint.unwrap();
        assert_eq!(sprint.id, 2);
        assert_eq!(sprint.state, "active");
    }

    #[test]
    fn falls_back_to_last_sprint() {
        let sprint = pick_sprint(&json!([
            { "id": 1, "name": "Sprint 1", "state": "closed" },
            { "id": 2, "name": "Sprint 2", "state": "closed" }
        ]));
        assert_eq!(sprint.map(|s| s.id), Some(2));
        assert!(pick_sprint(&json!([])).is_none());
        assert!(pick_sprint(&json!("legacy-string")).is_none());
    }

    #[test]
    fn flattens_document_description() {
        let text = description_text(&json!({
            "type": "doc",
            "version": 1,
            "content": [
                { "type": "paragraph", "content": [ { "type": "text", "text": "First" } ] },
                { "type": "paragraph", "content": [
                    { "type": "text", "text": "Second" },
                    { "type": "hardBreak" },
                    { "type": "text", "text": "line" }
                ] }
            ]
        }));
        assert_eq!(text.as_deref(), Some("First\nSecond\nline"));
        assert_eq!(description_text(&json!("   ")), None);
    }

    #[test]
    fn create_body_for_v2_uses_plain_description() {
        let body = serde_json::to_value(JiraCreateIssueRequest::new(
            "ABC",
            &request(Some("Steps to reproduce")),
            ApiVersion::V2,
        ))
        .unwrap();
        assert_eq!(
            body,
            json!({ "fields": {
                "project": { "key": "ABC" },
                "summary": "Title",
                "description": "Steps to reproduce",
                "issuetype": { "name": "Bug" }
            } })
        );
    }

    #[test]
    fn create_body_for_v3_uses_document_description() {
        let body = serde_json::to_value(JiraCreateIssueRequest::new(
            "ABC",
            &request(Some("One\n\nTwo\nlines")),
            ApiVersion::V3,
        ))
        .unwrap();
        let content = &body["fields"]["description"]["content"];
        assert_eq!(body["fields"]["description"]["type"], "doc");
        assert_eq!(content[0]["content"][0]["text"], "One");
        assert_eq!(content[1]["content"][0]["text"], "Two lines");
    }

    #[test]
    fn create_body_omits_missing_description() {
        let body =
            serde_json::to_value(JiraCreateIssueRequest::new("ABC", &request(None), ApiVersion::V2))
                .unwrap();
        assert!(body["fields"].get("description").is_none());
    }

    #[test]
    fn search_body_uses_camel_case() {
        let body = serde_json::to_value(JiraSearchRequest {
            jql: "project = ABC",
            max_results: 50,
            fields: None,
        })
        .unwrap();
        assert_eq!(body, json!({ "jql": "project = ABC", "maxResults": 50 }));
    }

    #[test]
    fn builds_urls_and_auth() {
        assert_eq!(
            JiraClient::endpoint("https://acme.atlassian.net/", ApiVersion::V2, "issue/ABC-1"),
            "https://acme.atlassian.net/rest/api/2/issue/ABC-1"
        );
        assert_eq!(
            JiraClient::browse_url("https://acme.atlassian.net", "ABC-1"),
            "https://acme.atlassian.net/browse/ABC-1"
        );
        assert_eq!(
            JiraClient::auth_header("me", "secret"),
            format!("Basic {}", BASE64_STANDARD.encode("me:secret"))
        );
    }

    #[tokio::test]
    async fn unconfigured_client_fails_before_calling_out() {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        let client = JiraClient::new(&config);
        let result = client.fetch_by_key("ABC-1").await;
        assert!(matches!(result, Err(AppError::Configuration(_))));
    }

    #[test]
    fn issue_path_only_accepts_issue_keys() {
        assert_eq!(JiraClient::issue_path(" ABC-12 ").unwrap(), "issue/ABC-12");
        for key in ["../myself", "ABC-1/comment", "ABC-1?fields=x", ""] {
            assert!(
                matches!(JiraClient::issue_path(key), Err(AppError::InvalidKey(_))),
                "key: {key}"
            );
        }
    }

    #[tokio::test]
    async fn malformed_keys_never_reach_the_request_path() {
        let config = AppConfig::from_lookup(|key| match key {
            "JIRA_HOST" => Some("acme.atlassian.net".to_string()),
            "JIRA_USERNAME" => Some("me".to_string()),
            "JIRA_API_TOKEN" => Some("secret".to_string()),
            _ => None,
        })
        .unwrap();
        let client = JiraClient::new(&config);

        let fetched = client.fetch_by_key("../myself").await;
        assert!(matches!(fetched, Err(AppError::InvalidKey(ref key)) if key == "../myself"));

        let linked = client.link_epic("../myself", "ABC-1").await;
        assert!(matches!(linked, Err(AppError::InvalidKey(_))));
    }
}
