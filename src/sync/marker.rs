//! Identity marker embedded in remote titles.
//!
//! Remote items are matched to tasks by looking for `"<short-id>: "` at the
//! start of the title, e.g. `"T21: Validate all input"`.

use crate::model::Task;

const SEPARATOR: &str = ": ";

/// Builds the remote title for a task.
#[must_use]
pub fn remote_title(task: &Task) -> String {
    format!("{}{SEPARATOR}{}", task.short_id(), task.title)
}

/// Extracts the short id from a remote title, if it carries a marker.
#[must_use]
pub fn parse_marker(title: &str) -> Option<&str> {
    let (marker, _) = title.split_once(SEPARATOR)?;
    let marker = marker.trim();
    let well_formed = !marker.is_empty()
        && marker.ends_with(|c: char| c.is_ascii_digit())
        && !marker.contains(char::is_whitespace);
    well_formed.then_some(marker)
}

/// Returns `true` when `title` carries the marker of `task`.
#[must_use]
pub fn is_marker_for(task: &Task, title: &str) -> bool {
    parse_marker(title) == Some(task.short_id())
}

/// Finds the first item whose title carries the marker of `task`.
pub fn find_matching<'a, T>(
    task: &Task,
    items: &'a [T],
    title_of: impl Fn(&T) -> &str,
) -> Option<&'a T> {
    items
        .iter()
        .find(|item| is_marker_for(task, title_of(item)))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::model::TaskStatus;

    fn task(id: &str, title: &str) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            phase: "requirements".to_string(),
            priority: 8,
            status: TaskStatus::Todo,
            updated: Utc::now(),
            content: String::new(),
            how_tos: Vec::new(),
        }
    }

    #[test]
    fn remote_title_prefixes_short_id() {
        assert_eq!(
            remote_title(&task("1042-T21", "Validate input")),
            "T21: Validate input"
        );
    }

    #[test]
    fn marker_round_trips_exactly() {
        let t = task("1042-T21", "Escape output: HTML and JS");
        let title = remote_title(&t);
        assert_eq!(parse_marker(&title), Some("T21"));
        assert!(is_marker_for(&t, &title));
    }

    #[test]
    fn shorter_id_does_not_match_longer_one() {
        let t2 = task("1042-T2", "Short");
        assert!(!is_marker_for(&t2, "T21: Validate input"));
        assert!(!is_marker_for(&t2, "T2 : Validate input"));
        assert!(is_marker_for(&t2, "T2: Short"));
    }

    #[test]
    fn titles_without_marker_are_ignored() {
        assert_eq!(parse_marker("Fix the login page"), None);
        assert_eq!(parse_marker("Note: remember to rotate keys"), None);
        assert_eq!(parse_marker(": empty"), None);
    }

    #[test]
    fn find_matching_picks_exact_marker() {
        let t = task("1042-T2", "Short");
        let titles = vec!["T21: Other".to_string(), "T2: Short".to_string()];
        let found = find_matching(&t, &titles, String::as_str);
        assert_eq!(found.map(String::as_str), Some("T2: Short"));
    }
}
