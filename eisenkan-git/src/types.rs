//! Core types exchanged across the Repository boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Commit author identity, attributed to every commit the core makes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub user: String,
    pub email: String,
}

impl Author {
    pub fn new(user: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            email: email.into(),
        }
    }
}

impl Default for Author {
    fn default() -> Self {
        Self::new("eisenkan", "eisenkan@localhost")
    }
}

/// A single commit in the repository's history, as surfaced by
/// `get_file_history` / `get_history`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Commit {
    /// Full commit hash (hex).
    pub id: String,
    /// Commit timestamp (author time).
    pub timestamp: DateTime<Utc>,
    /// Commit message, including any trailers.
    pub message: String,
    /// Author identity recorded on the commit.
    pub author: Author,
}

impl Commit {
    pub fn new(id: String, timestamp: DateTime<Utc>, message: String, author: Author) -> Self {
        Self {
            id,
            timestamp,
            message,
            author,
        }
    }

    /// The first line of the commit message (the "subject").
    pub fn subject(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    /// Extract the value of a trailer line `Key: value` from the message body,
    /// if present. Trailers are the last contiguous block of `Key: value`
    /// lines in the message.
    pub fn trailer(&self, key: &str) -> Option<&str> {
        let prefix = format!("{key}: ");
        self.message
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix(prefix.as_str()))
            .map(|v| v.trim())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_commit(message: &str) -> Commit {
        Commit::new(
            "deadbeef".to_string(),
            Utc::now(),
            message.to_string(),
            Author::default(),
        )
    }

    #[test]
    fn test_subject_is_first_line() {
        let commit = sample_commit("move task\n\nEisenKan-Move: todo->doing\n");
        assert_eq!(commit.subject(), "move task");
    }

    #[test]
    fn test_trailer_extraction() {
        let commit = sample_commit("move task\n\nEisenKan-Move: todo->doing\n");
        assert_eq!(commit.trailer("EisenKan-Move"), Some("todo->doing"));
    }

    #[test]
    fn test_missing_trailer() {
        let commit = sample_commit("create task");
        assert_eq!(commit.trailer("EisenKan-Move"), None);
    }
}
