use std::cmp::Ordering;

use anyhow::anyhow;
use chrono::NaiveDate;
use tracing::trace;

use crate::task::{Priority, Recurrence, Task};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    All,
    Completed,
    Pending,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PriorityFilter {
    #[default]
    All,
    Only(Priority),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    None,
    Due,
    Priority,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criteria {
    pub search: String,
    pub status: StatusFilter,
    pub priority: PriorityFilter,
    pub sort: SortKey,
}

impl Criteria {
    #[tracing::instrument(skip(tokens))]
    pub fn parse(tokens: &[String]) -> anyhow::Result<Self> {
        let mut criteria = Criteria::default();
        let mut search_terms: Vec<&str> = Vec::new();

        for token in tokens {
            if let Some(value) = token.strip_prefix("search:") {
                search_terms.push(value);
                continue;
            }

            if let Some(value) = token.strip_prefix("status:") {
                criteria.status = match value.to_ascii_lowercase().as_str() {
                    "all" => StatusFilter::All,
                    "completed" | "done" => StatusFilter::Completed,
                    "pending" | "open" => StatusFilter::Pending,
                    other => return Err(anyhow!("unknown status filter: {other}")),
                };
                continue;
            }

            if let Some(value) = token
                .strip_prefix("priority:")
                .or_else(|| token.strip_prefix("pri:"))
            {
                criteria.priority = match value.to_ascii_lowercase().as_str() {
                    "all" => PriorityFilter::All,
                    other => PriorityFilter::Only(other.parse()?),
                };
                continue;
            }

            if let Some(value) = token.strip_prefix("sort:") {
                criteria.sort = match value.to_ascii_lowercase().as_str() {
                    "none" => SortKey::None,
                    "due" => SortKey::Due,
                    "priority" | "pri" => SortKey::Priority,
                    other => return Err(anyhow!("unknown sort key: {other}")),
                };
                continue;
            }

            search_terms.push(token);
        }

        criteria.search = search_terms.join(" ");
        Ok(criteria)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub id: u64,
    pub completed: bool,
    pub title: String,
    pub priority: Priority,
    pub due: Option<String>,
    pub recurring: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub due_today: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Projection {
    pub rows: Vec<TaskRow>,
    pub stats: Stats,
}

// Derivation order matters: search, then status, then priority, then sort.
#[tracing::instrument(skip(tasks, criteria))]
pub fn project(tasks: &[Task], criteria: &Criteria, today: NaiveDate) -> Projection {
    let mut filtered: Vec<&Task> = tasks.iter().collect();

    let query = criteria.search.trim().to_ascii_lowercase();
    if !query.is_empty() {
        filtered.retain(|task| {
            task.title.to_ascii_lowercase().contains(&query)
                || task.description.to_ascii_lowercase().contains(&query)
        });
    }

    match criteria.status {
        StatusFilter::All => {}
        StatusFilter::Completed => filtered.retain(|task| task.completed),
        StatusFilter::Pending => filtered.retain(|task| !task.completed),
    }

    if let PriorityFilter::Only(priority) = criteria.priority {
        filtered.retain(|task| task.priority == priority);
    }

    match criteria.sort {
        SortKey::None => {}
        SortKey::Due => filtered.sort_by(|a, b| {
            cmp_optional(a.due.as_ref(), b.due.as_ref()).then_with(|| a.id.cmp(&b.id))
        }),
        SortKey::Priority => {
            filtered.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.id.cmp(&b.id)));
        }
    }

    trace!(
        total = tasks.len(),
        shown = filtered.len(),
        "derived projection"
    );

    Projection {
        rows: filtered.into_iter().map(task_row).collect(),
        stats: stats(tasks, today),
    }
}

// Statistics cover the full collection, not the filtered rows.
pub fn stats(tasks: &[Task], today: NaiveDate) -> Stats {
    Stats {
        total: tasks.len(),
        completed: tasks.iter().filter(|task| task.completed).count(),
        due_today: tasks.iter().filter(|task| task.due == Some(today)).count(),
    }
}

fn task_row(task: &Task) -> TaskRow {
    TaskRow {
        id: task.id,
        completed: task.completed,
        title: task.title.clone(),
        priority: task.priority,
        due: task.due.map(|date| date.format("%Y-%m-%d").to_string()),
        recurring: match task.recurring {
            Recurrence::None => None,
            other => Some(other.to_string()),
        },
        description: if task.description.is_empty() {
            None
        } else {
            Some(task.description.clone())
        },
    }
}

fn cmp_optional<T: Ord>(left: Option<&T>, right: Option<&T>) -> Ordering {
    match (left, right) {
        (Some(a), Some(b)) => a.cmp(b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
