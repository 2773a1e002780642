pub const DEFAULT_MAX_RESULTS: u32 = 50;
pub const SPRINT_MAX_RESULTS: u32 = 100;

const DEFAULT_ORDER: &str = "order by created DESC";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub search_text: Option<String>,
    pub project_key: Option<String>,
    pub sprint_id: Option<String>,
    /// Pre-formed JQL. When set, every other field is ignored.
    pub raw_query: Option<String>,
    pub max_results: u32,
}

impl Default for SearchCriteria {
    fn default() -> Self {
        Self {
            search_text: None,
            project_key: None,
            sprint_id: None,
            raw_query: None,
            max_results: DEFAULT_MAX_RESULTS,
        }
    }
}

impl SearchCriteria {
    pub fn text(search_text: impl Into<String>) -> Self {
        Self {
            search_text: Some(search_text.into()),
            ..Self::default()
        }
    }

    pub fn sprint(project_key: impl Into<String>, sprint_id: impl Into<String>) -> Self {
        Self {
            project_key: Some(project_key.into()),
            sprint_id: Some(sprint_id.into()),
            max_results: SPRINT_MAX_RESULTS,
            ..Self::default()
        }
    }
}

pub fn build_search_query(criteria: &SearchCriteria) -> String {
    if let Some(raw) = &criteria.raw_query {
        return raw.clone();
    }

    let text = criteria
        .search_text
        .as_deref()
        .filter(|text| !text.trim().is_empty());

    if let Some(text) = text {
        if starts_with_ignore_case(text, "project=") {
            return match text.split_once(char::is_whitespace) {
                Some((project_clause, rest)) if !rest.trim().is_empty() => {
                    format!("{project_clause} AND {}", text_clause(rest.trim_start()))
                }
                _ => text.trim_end().to_string(),
            };
        }
        if starts_with_ignore_case(text, "project =") {
            return text.to_string();
        }
    }

    let mut clauses = Vec::new();
    if let Some(project_key) = &criteria.project_key {
        clauses.push(format!("project = {project_key}"));
    }
    if let Some(sprint_id) = &criteria.sprint_id {
        clauses.push(format!("sprint = {sprint_id}"));
    }
    if let Some(text) = text {
        clauses.push(text_clause(text));
    }

    if clauses.is_empty() {
        DEFAULT_ORDER.to_string()
    } else {
        clauses.join(" AND ")
    }
}

/// Issues in the project's open sprints, optionally narrowed to one assignee.
pub fn current_sprint_query(project_key: &str, assignee: Option<&str>) -> String {
    let mut jql = format!("project = {project_key} AND sprint in openSprints()");
    if let Some(assignee) = assignee {
        jql.push_str(&format!(" AND assignee = \"{}\"", escape_jql_text(assignee)));
    }
    jql
}

/// Escapes a value for use inside a double-quoted JQL string.
pub fn escape_jql_text(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '\\' || ch == '"' {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

fn text_clause(text: &str) -> String {
    let text = escape_jql_text(text);
    format!(
        "(summary ~ \"{text}\" OR description ~ \"{text}\" OR \"Epic Name\" ~ \"{text}\")"
    )
}

fn starts_with_ignore_case(value: &str, prefix: &str) -> bool {
    value
        .get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}
