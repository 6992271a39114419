//! Request/Response Types for Task API
//!
//! This module provides DTOs and query handling for task operations.

use serde::Deserialize;

use crate::api::tasks::handlers::ApiError;
use crate::task::Task;

/// Shortest accepted title, in Unicode code points.
pub const MIN_TITLE_CHARS: usize = 3;
/// Longest accepted title, in Unicode code points.
pub const MAX_TITLE_CHARS: usize = 100;

/// Request to create a task.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    /// Task title.
    #[serde(default)]
    pub title: String,
}

/// Request to replace a task's mutable fields.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateTaskRequest {
    /// New title.
    #[serde(default)]
    pub title: String,
    /// New completion flag.
    #[serde(default)]
    pub done: bool,
}

/// Raw query parameters for listing tasks.
///
/// Kept as strings so that malformed `page`/`limit` values can fall back to
/// their defaults instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListTasksQuery {
    /// Filter on completion state.
    pub done: Option<String>,
    /// 1-indexed page number.
    pub page: Option<String>,
    /// Page size; 0 means unbounded.
    pub limit: Option<String>,
}

/// Parsed listing options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFilter {
    /// Only keep tasks with this completion state.
    pub done: Option<bool>,
    /// 1-indexed page, at least 1.
    pub page: usize,
    /// Page size; 0 disables pagination.
    pub limit: usize,
}

impl Default for ListFilter {
    fn default() -> Self {
        Self {
            done: None,
            page: 1,
            limit: 0,
        }
    }
}

impl ListTasksQuery {
    /// Collect the listing parameters from decoded query pairs.
    ///
    /// The first occurrence of a key wins; unknown keys are ignored.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut query = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "done" => &mut query.done,
                "page" => &mut query.page,
                "limit" => &mut query.limit,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        query
    }

    /// Parse the raw parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidQuery`] if `done` is present but not a
    /// recognised boolean.
    pub fn parse(&self) -> Result<ListFilter, ApiError> {
        let done = match self.done.as_deref() {
            None | Some("") => None,
            Some(raw) => Some(
                parse_bool(raw)
                    .ok_or_else(|| ApiError::InvalidQuery("bad 'done' query param".to_string()))?,
            ),
        };

        Ok(ListFilter {
            done,
            page: parse_or(self.page.as_deref(), 1).max(1),
            limit: parse_or(self.limit.as_deref(), 0),
        })
    }
}

impl ListFilter {
    /// Filter, sort by id, and cut out the requested page.
    #[must_use]
    pub fn apply(&self, tasks: Vec<Task>) -> Vec<Task> {
        let mut tasks: Vec<Task> = tasks
            .into_iter()
            .filter(|t| self.done.is_none_or(|done| t.done == done))
            .collect();
        tasks.sort_by_key(|t| t.id);

        if self.limit == 0 {
            return tasks;
        }

        let start = (self.page - 1).saturating_mul(self.limit);
        tasks.into_iter().skip(start).take(self.limit).collect()
    }
}

/// Check a title's length in code points.
///
/// # Errors
///
/// Returns [`ApiError::InvalidTitle`] when the length is out of range.
pub fn validate_title(title: &str) -> Result<(), ApiError> {
    let length = title.chars().count();
    if !(MIN_TITLE_CHARS..=MAX_TITLE_CHARS).contains(&length) {
        return Err(ApiError::InvalidTitle(format!(
            "title must be {MIN_TITLE_CHARS}..{MAX_TITLE_CHARS} chars"
        )));
    }
    Ok(())
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

fn parse_or(raw: Option<&str>, default: usize) -> usize {
    match raw {
        None | Some("") => default,
        Some(raw) => raw.parse().unwrap_or(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::task::TaskId;
    use chrono::Utc;

    fn tasks(count: u64) -> Vec<Task> {
        let now = Utc::now();
        // Reverse order so sorting is actually exercised.
        (1..=count)
            .rev()
            .map(|id| Task {
                id: TaskId::new(id).unwrap(),
                title: format!("task {id}"),
                done: id % 2 == 0,
                created_at: now,
                updated_at: now,
            })
            .collect()
    }

    fn ids(tasks: &[Task]) -> Vec<u64> {
        tasks.iter().map(|t| t.id.get()).collect()
    }

    fn query(done: Option<&str>, page: Option<&str>, limit: Option<&str>) -> ListTasksQuery {
        ListTasksQuery {
            done: done.map(str::to_string),
            page: page.map(str::to_string),
            limit: limit.map(str::to_string),
        }
    }

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn repeated_keys_keep_the_first_value() {
        let query = ListTasksQuery::from_pairs(pairs(&[
            ("limit", "2"),
            ("limit", "3"),
            ("done", "false"),
            ("done", "maybe"),
            ("sort", "desc"),
        ]));
        assert_eq!(query.limit.as_deref(), Some("2"));
        assert_eq!(query.done.as_deref(), Some("false"));
        assert_eq!(query.page, None);

        let filter = query.parse().unwrap();
        assert_eq!(filter.limit, 2);
        assert_eq!(filter.done, Some(false));
    }

    #[test]
    fn second_page_of_two() {
        let filter = query(None, Some("2"), Some("2")).parse().unwrap();
        assert_eq!(ids(&filter.apply(tasks(5))), vec![3, 4]);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let filter = query(None, Some("10"), Some("2")).parse().unwrap();
        assert!(filter.apply(tasks(5)).is_empty());
    }

    #[test]
    fn zero_limit_returns_everything_sorted() {
        let filter = query(None, Some("3"), Some("0")).parse().unwrap();
        assert_eq!(ids(&filter.apply(tasks(5))), vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn done_filter_applies_before_paging() {
        let filter = query(Some("true"), Some("1"), Some("1")).parse().unwrap();
        assert_eq!(ids(&filter.apply(tasks(5))), vec![2]);

        let filter = query(Some("0"), None, None).parse().unwrap();
        assert_eq!(ids(&filter.apply(tasks(5))), vec![1, 3, 5]);
    }

    #[test]
    fn invalid_done_is_rejected() {
        assert!(matches!(
            query(Some("yes"), None, None).parse(),
            Err(ApiError::InvalidQuery(_))
        ));
    }

    #[test]
    fn empty_done_means_no_filter() {
        assert_eq!(query(Some(""), None, None).parse().unwrap().done, None);
    }

    #[test]
    fn malformed_paging_falls_back_to_defaults() {
        let filter = query(None, Some("-3"), Some("abc")).parse().unwrap();
        assert_eq!(filter, ListFilter::default());

        let filter = query(None, Some("0"), Some("-1")).parse().unwrap();
        assert_eq!(filter.page, 1);
        assert_eq!(filter.limit, 0);
    }

    #[test]
    fn huge_page_does_not_overflow() {
        let filter = ListFilter {
            done: None,
            page: usize::MAX,
            limit: usize::MAX,
        };
        assert!(filter.apply(tasks(3)).is_empty());
    }

    #[test]
    fn title_length_counts_code_points() {
        assert!(validate_title("abc").is_ok());
        assert!(validate_title("ab").is_err());
        assert!(validate_title("日本語").is_ok());
        assert!(validate_title(&"x".repeat(100)).is_ok());
        assert!(validate_title(&"x".repeat(101)).is_err());
        assert!(validate_title(&"é".repeat(100)).is_ok());
    }
}
