/// A parsed command, independent of the text it was typed as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    FetchTicket {
        ticket_id: String,
    },
    Search {
        search_text: String,
    },
    SprintCurrent {
        project_key: String,
        assignee: Option<String>,
    },
    SprintTickets {
        project_key: String,
        sprint_id: String,
    },
    CreateTicket {
        project_key: String,
        summary: String,
        description: Option<String>,
        epic_key: Option<String>,
        issue_type: Option<String>,
    },
    CreateFromFile {
        path: String,
    },
    Invalid {
        raw_input: String,
    },
}
