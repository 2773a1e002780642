use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::domain::intent::Intent;

/// Token that makes `create --json` read its payload from standard input.
pub const STDIN_PATH: &str = "-";

struct Rule {
    name: &'static str,
    pattern: Regex,
    build: fn(&Captures) -> Intent,
}

impl Rule {
    fn new(name: &'static str, pattern: &str, build: fn(&Captures) -> Intent) -> Self {
        let pattern = Regex::new(pattern)
            .unwrap_or_else(|err| panic!("command rule `{name}` has an invalid pattern: {err}"));
        Self {
            name,
            pattern,
            build,
        }
    }

    fn apply(&self, command: &str) -> Option<Intent> {
        self.pattern
            .captures(command)
            .map(|captures| (self.build)(&captures))
    }
}

// Evaluated top to bottom; the first rule that matches decides the intent.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(
            "ticket",
            r"(?i)^(?:(?:fetch )?ticket )?([A-Z]+-\d+)",
            |caps| Intent::FetchTicket {
                ticket_id: group(caps, 1).unwrap_or_default(),
            },
        ),
        Rule::new("search", r"(?s)^search (.*)$", |caps| Intent::Search {
            search_text: strip_enclosing_quotes(caps.get(1).map_or("", |m| m.as_str()))
                .to_string(),
        }),
        Rule::new(
            "sprint",
            r#"(?i)^sprint ([A-Z]+)(?:\s+assignee\s+(?:"([^"]+)"|(\S+(?:\s+\S+)*)))?$"#,
            |caps| Intent::SprintCurrent {
                project_key: group(caps, 1).unwrap_or_default(),
                assignee: group(caps, 2).or_else(|| group(caps, 3)),
            },
        ),
        Rule::new(
            "sprint-tickets",
            r"(?i)^sprint tickets ([A-Z]+) (\d+)",
            |caps| Intent::SprintTickets {
                project_key: group(caps, 1).unwrap_or_default(),
                sprint_id: group(caps, 2).unwrap_or_default(),
            },
        ),
        Rule::new(
            "create",
            r#"(?i)^create ([A-Z]+) "([^"]+)"(?:\s+"([^"]+)")?(?:\s+([A-Z]+-\d+))?(?:\s+--type\s+(\S+))?$"#,
            |caps| Intent::CreateTicket {
                project_key: group(caps, 1).unwrap_or_default(),
                summary: group(caps, 2).unwrap_or_default(),
                description: group(caps, 3),
                epic_key: group(caps, 4),
                issue_type: group(caps, 5),
            },
        ),
    ]
});

/// Parses an argument vector as handed over by the shell.
///
/// `create --json <path>` is recognised structurally; everything else is
/// joined with single spaces and run through [`parse_command`].
pub fn parse_args<S: AsRef<str>>(args: &[S]) -> Intent {
    if let [verb, flag, path, ..] = args {
        if verb.as_ref().eq_ignore_ascii_case("create") && flag.as_ref() == "--json" {
            return Intent::CreateFromFile {
                path: path.as_ref().to_string(),
            };
        }
    }

    let command = args
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(" ");
    parse_command(&command)
}

pub fn parse_command(command: &str) -> Intent {
    RULES
        .iter()
        .find_map(|rule| {
            let intent = rule.apply(command)?;
            tracing::debug!(rule = rule.name, "command matched");
            Some(intent)
        })
        .unwrap_or_else(|| Intent::Invalid {
            raw_input: command.to_string(),
        })
}

/// Drops one pair of double quotes wrapping the whole value. Values with
/// quotes inside are left untouched, so applying this twice changes nothing.
fn strip_enclosing_quotes(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .filter(|inner| !inner.contains('"'))
        .unwrap_or(value)
}

fn group(caps: &Captures, index: usize) -> Option<String> {
    caps.get(index).map(|m| m.as_str().to_string())
}
