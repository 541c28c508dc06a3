//! Git repository management: the `Repository` trait and its `git2`-backed
//! implementation.
//!
//! `git2::Repository` is `Send` but not `Sync`, so `GitRepository` holds it
//! behind an `Arc<Mutex<_>>` and drives every git2 call through
//! `spawn_blocking` to keep a synchronous git2 backend off the async
//! executor's worker threads.

use crate::error::{convert_git2_error, GitError, GitResult};
use crate::git2_utils;
use crate::types::{Author, Commit};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use eisenkan_common::Pretty;
use git2::Repository as Git2Repository;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// The abstract collaborator `eisenkan-core` depends on. `git2`
/// drives the production implementation; tests substitute a `FakeRepository`.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Stage the given paths (relative to the repository root) for commit.
    async fn stage(&self, paths: &[PathBuf]) -> GitResult<()>;

    /// Commit the currently staged changes with the given message.
    async fn commit(&self, message: &str) -> GitResult<String>;

    /// Discard whatever is currently staged, leaving the working tree
    /// untouched. Used to honor cancellation arriving after `stage` but
    /// before `commit`, so that no partial commit is produced.
    async fn reset_staged(&self) -> GitResult<()>;

    /// History of commits that touched `relative_path`, newest first, capped
    /// at `limit` entries (`0` means unlimited).
    async fn get_file_history(&self, relative_path: &Path, limit: usize) -> GitResult<Vec<Commit>>;

    /// Full repository history, newest first, capped at `limit` entries.
    async fn get_history(&self, limit: usize) -> GitResult<Vec<Commit>>;

    /// Path to the repository's working directory.
    fn path(&self) -> &Path;

    /// Release any resources held by the repository handle.
    fn close(self) -> GitResult<()>
    where
        Self: Sized;
}

/// `git2`-backed implementation of [`Repository`].
pub struct GitRepository {
    repo: Arc<Mutex<Git2Repository>>,
    path: PathBuf,
}

impl std::fmt::Debug for GitRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepository")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl GitRepository {
    /// Open an existing git repository at (or above) the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> GitResult<Self> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening git repository");

        let repo = Git2Repository::discover(path).map_err(|e| {
            warn!(path = %path.display(), error = %e, "repository open failed");
            GitError::repository_not_found(path, e.to_string())
        })?;

        let repo_path = repo
            .workdir()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| path.to_path_buf());

        Ok(Self {
            repo: Arc::new(Mutex::new(repo)),
            path: repo_path,
        })
    }

    /// Initialize a fresh repository at `path`, configuring `user.name` /
    /// `user.email` from `author` so that unattributed commits still record
    /// the right identity ( `initialize(path, {user, email})`).
    pub fn initialize<P: AsRef<Path>>(path: P, author: &Author) -> GitResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "initializing git repository with author: {}", Pretty(author));

        let repo =
            Git2Repository::init(path).map_err(|e| convert_git2_error("init_repository", e))?;
        git2_utils::set_author_config(&repo, author)?;

        let repo_path = repo
            .workdir()
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| path.to_path_buf());

        Ok(Self {
            repo: Arc::new(Mutex::new(repo)),
            path: repo_path,
        })
    }
}

#[async_trait]
impl Repository for GitRepository {
    async fn stage(&self, paths: &[PathBuf]) -> GitResult<()> {
        let repo = Arc::clone(&self.repo);
        let paths: Vec<PathBuf> = paths.to_vec();

        tokio::task::spawn_blocking(move || {
            let repo = repo.lock().expect("git repository mutex poisoned");
            let refs: Vec<&Path> = paths.iter().map(|p| p.as_path()).collect();
            git2_utils::add_paths(&repo, &refs)
        })
        .await
        .map_err(|e| GitError::repository_operation_failed("stage", e.to_string()))?
    }

    async fn commit(&self, message: &str) -> GitResult<String> {
        let repo = Arc::clone(&self.repo);
        let message = message.to_string();

        let id = tokio::task::spawn_blocking(move || {
            let repo = repo.lock().expect("git repository mutex poisoned");
            let author = read_author(&repo).unwrap_or_default();
            git2_utils::create_commit(&repo, &message, &author)
        })
        .await
        .map_err(|e| GitError::repository_operation_failed("commit", e.to_string()))??;

        info!(commit = %id, "committed");
        Ok(id)
    }

    async fn reset_staged(&self) -> GitResult<()> {
        let repo = Arc::clone(&self.repo);

        tokio::task::spawn_blocking(move || {
            let repo = repo.lock().expect("git repository mutex poisoned");
            git2_utils::reset_staged(&repo)
        })
        .await
        .map_err(|e| GitError::repository_operation_failed("reset_staged", e.to_string()))?
    }

    async fn get_file_history(&self, relative_path: &Path, limit: usize) -> GitResult<Vec<Commit>> {
        let repo = Arc::clone(&self.repo);
        let relative_path = relative_path.to_path_buf();

        tokio::task::spawn_blocking(move || {
            let repo = repo.lock().expect("git repository mutex poisoned");
            file_history(&repo, &relative_path, limit)
        })
        .await
        .map_err(|e| GitError::repository_operation_failed("get_file_history", e.to_string()))?
    }

    async fn get_history(&self, limit: usize) -> GitResult<Vec<Commit>> {
        let repo = Arc::clone(&self.repo);

        tokio::task::spawn_blocking(move || {
            let repo = repo.lock().expect("git repository mutex poisoned");
            full_history(&repo, limit)
        })
        .await
        .map_err(|e| GitError::repository_operation_failed("get_history", e.to_string()))?
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn close(self) -> GitResult<()> {
        Ok(())
    }
}

fn read_author(repo: &Git2Repository) -> GitResult<Author> {
    let config = repo
        .config()
        .map_err(|e| convert_git2_error("get_config", e))?;
    let user = config
        .get_string("user.name")
        .unwrap_or_else(|_| Author::default().user);
    let email = config
        .get_string("user.email")
        .unwrap_or_else(|_| Author::default().email);
    Ok(Author::new(user, email))
}

fn commit_from_git2(commit: &git2::Commit) -> Commit {
    let author_sig = commit.author();
    let timestamp = Utc
        .timestamp_opt(commit.time().seconds(), 0)
        .single()
        .unwrap_or_else(Utc::now);

    Commit::new(
        commit.id().to_string(),
        timestamp,
        commit.message().unwrap_or("").to_string(),
        Author::new(
            author_sig.name().unwrap_or("unknown").to_string(),
            author_sig.email().unwrap_or("").to_string(),
        ),
    )
}

/// Walk history, yielding at most `limit` commits that changed `relative_path`
/// (a path filter comparing each commit's tree against its first parent's).
fn file_history(
    repo: &Git2Repository,
    relative_path: &Path,
    limit: usize,
) -> GitResult<Vec<Commit>> {
    if repo.is_empty().unwrap_or(true) {
        return Ok(Vec::new());
    }

    let mut revwalk = repo.revwalk().map_err(|e| convert_git2_error("revwalk", e))?;
    revwalk
        .push_head()
        .map_err(|e| convert_git2_error("revwalk_push_head", e))?;
    revwalk
        .set_sorting(git2::Sort::TIME)
        .map_err(|e| convert_git2_error("revwalk_sort", e))?;

    let mut results = Vec::new();
    for oid in revwalk {
        let oid = oid.map_err(|e| convert_git2_error("revwalk_next", e))?;
        let commit = repo
            .find_commit(oid)
            .map_err(|e| convert_git2_error("find_commit", e))?;
        let tree = commit.tree().map_err(|e| convert_git2_error("commit_tree", e))?;

        let parent_tree = commit.parent(0).ok().and_then(|p| p.tree().ok());
        let diff = repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&tree), None)
            .map_err(|e| convert_git2_error("diff_tree_to_tree", e))?;

        let touches_path = diff
            .deltas()
            .any(|delta| {
                delta
                    .new_file()
                    .path()
                    .map(|p| p == relative_path)
                    .unwrap_or(false)
                    || delta
                        .old_file()
                        .path()
                        .map(|p| p == relative_path)
                        .unwrap_or(false)
            });

        if touches_path {
            results.push(commit_from_git2(&commit));
            if limit > 0 && results.len() >= limit {
                break;
            }
        }
    }

    Ok(results)
}

fn full_history(repo: &Git2Repository, limit: usize) -> GitResult<Vec<Commit>> {
    if repo.is_empty().unwrap_or(true) {
        return Ok(Vec::new());
    }

    let mut revwalk = repo.revwalk().map_err(|e| convert_git2_error("revwalk", e))?;
    revwalk
        .push_head()
        .map_err(|e| convert_git2_error("revwalk_push_head", e))?;
    revwalk
        .set_sorting(git2::Sort::TIME)
        .map_err(|e| convert_git2_error("revwalk_sort", e))?;

    let mut results = Vec::new();
    for oid in revwalk {
        let oid = oid.map_err(|e| convert_git2_error("revwalk_next", e))?;
        let commit = repo
            .find_commit(oid)
            .map_err(|e| convert_git2_error("find_commit", e))?;
        results.push(commit_from_git2(&commit));
        if limit > 0 && results.len() >= limit {
            break;
        }
    }

    Ok(results)
}
