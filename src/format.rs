use crate::domain::ticket::Ticket;

pub const NO_TICKETS: &str = "No tickets found.";

pub fn format_ticket(ticket: &Ticket) -> String {
    let mut lines = vec![
        format!("{}: {}", ticket.key, ticket.summary),
        format!("Status: {}", ticket.status),
        format!("Type: {}", ticket.issue_type),
        format!("Priority: {}", ticket.priority),
        format!(
            "Assignee: {}",
            ticket.assignee.as_deref().unwrap_or("Unassigned")
        ),
        format!(
            "Description: {}",
            ticket
                .description
                .as_deref()
                .filter(|text| !text.trim().is_empty())
                .unwrap_or("No description")
        ),
    ];

    if !ticket.subtasks.is_empty() {
        lines.push(String::new());
        lines.push("Subtasks:".to_string());
        lines.extend(ticket.subtasks.iter().map(summary_line));
    }

    lines.join("\n")
}

/// One line per ticket in the order given, headed by the sprint name when the
/// first ticket carries one.
pub fn format_ticket_list(tickets: &[Ticket]) -> String {
    let Some(first) = tickets.first() else {
        return NO_TICKETS.to_string();
    };

    let body = tickets
        .iter()
        .map(summary_line)
        .collect::<Vec<_>>()
        .join("\n");

    match &first.sprint {
        Some(sprint) => format!("Sprint: {}\n\n{body}", sprint.name),
        None => body,
    }
}

fn summary_line(ticket: &Ticket) -> String {
    format!("{}: {} ({})", ticket.key, ticket.summary, ticket.status)
}
