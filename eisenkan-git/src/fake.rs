//! In-memory [`Repository`] double for exercising `eisenkan-core` without a
//! real git checkout — the testability seam /§8 require.

use crate::error::GitResult;
use crate::repository::Repository;
use crate::types::{Author, Commit};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

struct State {
    staged: Vec<PathBuf>,
    history: Vec<Commit>,
    touched: Vec<Vec<PathBuf>>,
    next_id: u64,
}

/// Records `stage`/`commit` calls in memory; `get_history` and
/// `get_file_history` replay from that log instead of a real git object
/// database.
pub struct FakeRepository {
    path: PathBuf,
    author: Author,
    state: Mutex<State>,
}

impl FakeRepository {
    pub fn new(path: impl Into<PathBuf>, author: Author) -> Self {
        Self {
            path: path.into(),
            author,
            state: Mutex::new(State {
                staged: Vec::new(),
                history: Vec::new(),
                touched: Vec::new(),
                next_id: 1,
            }),
        }
    }
}

#[async_trait]
impl Repository for FakeRepository {
    async fn stage(&self, paths: &[PathBuf]) -> GitResult<()> {
        let mut state = self.state.lock().expect("fake repository mutex poisoned");
        state.staged.extend_from_slice(paths);
        Ok(())
    }

    async fn commit(&self, message: &str) -> GitResult<String> {
        let mut state = self.state.lock().expect("fake repository mutex poisoned");
        let id = format!("{:040x}", state.next_id);
        state.next_id += 1;

        let staged = std::mem::take(&mut state.staged);
        state.touched.push(staged);
        state.history.push(Commit::new(
            id.clone(),
            Utc::now(),
            message.to_string(),
            self.author.clone(),
        ));
        Ok(id)
    }

    async fn reset_staged(&self) -> GitResult<()> {
        let mut state = self.state.lock().expect("fake repository mutex poisoned");
        state.staged.clear();
        Ok(())
    }

    async fn get_file_history(&self, relative_path: &Path, limit: usize) -> GitResult<Vec<Commit>> {
        let state = self.state.lock().expect("fake repository mutex poisoned");
        let mut results: Vec<Commit> = state
            .history
            .iter()
            .zip(state.touched.iter())
            .rev()
            .filter(|(_, paths)| paths.iter().any(|p| p == relative_path))
            .map(|(commit, _)| commit.clone())
            .collect();
        if limit > 0 {
            results.truncate(limit);
        }
        Ok(results)
    }

    async fn get_history(&self, limit: usize) -> GitResult<Vec<Commit>> {
        let state = self.state.lock().expect("fake repository mutex poisoned");
        let mut results: Vec<Commit> = state.history.iter().rev().cloned().collect();
        if limit > 0 {
            results.truncate(limit);
        }
        Ok(results)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn close(self) -> GitResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fake_records_history_newest_first() {
        let repo = FakeRepository::new("/board", Author::default());
        repo.stage(&[PathBuf::from("board.json")]).await.unwrap();
        repo.commit("first").await.unwrap();
        repo.stage(&[PathBuf::from("other.json")]).await.unwrap();
        repo.commit("second").await.unwrap();

        let history = repo.get_history(0).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].message, "second");

        let board_history = repo
            .get_file_history(Path::new("board.json"), 0)
            .await
            .unwrap();
        assert_eq!(board_history.len(), 1);
        assert_eq!(board_history[0].message, "first");
    }

    #[tokio::test]
    async fn test_reset_staged_discards_pending_stage_without_committing() {
        let repo = FakeRepository::new("/board", Author::default());
        repo.stage(&[PathBuf::from("board.json")]).await.unwrap();
        repo.commit("first").await.unwrap();

        repo.stage(&[PathBuf::from("task.json")]).await.unwrap();
        repo.reset_staged().await.unwrap();
        repo.commit("would-be second").await.unwrap();

        // The reset-away "task.json" stage must not appear on the commit
        // that follows it.
        let history = repo.get_file_history(Path::new("task.json"), 0).await.unwrap();
        assert!(history.is_empty());
    }
}
