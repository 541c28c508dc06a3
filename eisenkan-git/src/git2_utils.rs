//! Low-level `git2` helpers shared by the `Repository` trait implementation.
//!
//! These are the raw index/commit primitives `GitRepository::stage` and
//! `GitRepository::commit` build on; kept separate so they can be exercised
//! directly in tests without going through the async trait.

use crate::error::{convert_git2_error, GitResult};
use crate::types::Author;
use git2::Repository;
use std::path::Path;
use tracing::debug;

/// Add the given paths (relative to the repository root) to the index. A
/// path that no longer exists on disk (the board store removed the file as
/// part of a move/archive/remove) is staged as a deletion instead — mirrors
/// `git add -A`, since `Index::add_path` alone only knows how to stage
/// present files.
pub fn add_paths(repo: &Repository, paths: &[&Path]) -> GitResult<()> {
    debug!(count = paths.len(), "staging paths");

    let workdir = repo
        .workdir()
        .ok_or_else(|| crate::error::GitError::from_string("repository has no working directory"))?
        .to_path_buf();
    let mut index = repo
        .index()
        .map_err(|e| convert_git2_error("get_index", e))?;

    for path in paths {
        if workdir.join(path).exists() {
            index
                .add_path(path)
                .map_err(|e| convert_git2_error("add_path", e))?;
        } else {
            match index.remove_path(path) {
                Ok(()) => {}
                // Already absent from the index (e.g. staged-then-removed
                // within the same transaction): nothing to do.
                Err(e) if e.code() == git2::ErrorCode::NotFound => {}
                Err(e) => return Err(convert_git2_error("remove_path", e)),
            }
        }
    }

    index
        .write()
        .map_err(|e| convert_git2_error("write_index", e))?;

    Ok(())
}

/// Create a commit from the current index contents, with `author` as both
/// author and committer identity.
pub fn create_commit(repo: &Repository, message: &str, author: &Author) -> GitResult<String> {
    debug!(message, "creating commit");

    let signature = git2::Signature::now(&author.user, &author.email)
        .map_err(|e| convert_git2_error("create_signature", e))?;

    let mut index = repo
        .index()
        .map_err(|e| convert_git2_error("get_index", e))?;
    let tree_oid = index
        .write_tree()
        .map_err(|e| convert_git2_error("write_tree", e))?;
    let tree = repo
        .find_tree(tree_oid)
        .map_err(|e| convert_git2_error("find_tree", e))?;

    let parents: Vec<git2::Commit> = match repo.head() {
        Ok(head) => {
            let commit = head
                .peel_to_commit()
                .map_err(|e| convert_git2_error("peel_to_commit", e))?;
            vec![commit]
        }
        Err(_) => Vec::new(),
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

    let commit_oid = repo
        .commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parent_refs,
        )
        .map_err(|e| convert_git2_error("create_commit", e))?;

    Ok(commit_oid.to_string())
}

/// Reset the index back to `HEAD` (a mixed reset), discarding whatever is
/// currently staged without touching the working tree. Used when an
/// operation is cancelled between `stage` and `commit`, so that no partial
/// commit is produced from an index a cancelled caller never intended to
/// land.
pub fn reset_staged(repo: &Repository) -> GitResult<()> {
    debug!("discarding staged changes");

    match repo.head() {
        Ok(head) => {
            let commit = head
                .peel_to_commit()
                .map_err(|e| convert_git2_error("peel_to_commit", e))?;
            repo.reset(commit.as_object(), git2::ResetType::Mixed, None)
                .map_err(|e| convert_git2_error("reset", e))?;
        }
        Err(_) => {
            // No HEAD yet — nothing to reset to, so just empty the index.
            let mut index = repo.index().map_err(|e| convert_git2_error("get_index", e))?;
            index.clear().map_err(|e| convert_git2_error("clear_index", e))?;
            index.write().map_err(|e| convert_git2_error("write_index", e))?;
        }
    }

    Ok(())
}

/// Configure `user.name` / `user.email` in the repository's local config, so
/// commits made without an explicit signature still attribute correctly.
pub fn set_author_config(repo: &Repository, author: &Author) -> GitResult<()> {
    let mut config = repo
        .config()
        .map_err(|e| convert_git2_error("get_config", e))?;
    config
        .set_str("user.name", &author.user)
        .map_err(|e| convert_git2_error("set_user_name", e))?;
    config
        .set_str("user.email", &author.email)
        .map_err(|e| convert_git2_error("set_user_email", e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_add_and_commit() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let author = Author::default();
        set_author_config(&repo, &author).unwrap();

        std::fs::write(dir.path().join("board.json"), "{}").unwrap();
        add_paths(&repo, &[Path::new("board.json")]).unwrap();
        let id = create_commit(&repo, "initial commit", &author).unwrap();
        assert_eq!(id.len(), 40);
    }

    #[test]
    fn test_add_paths_stages_deletion_of_missing_file() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let author = Author::default();
        set_author_config(&repo, &author).unwrap();

        std::fs::write(dir.path().join("task.json"), "{}").unwrap();
        add_paths(&repo, &[Path::new("task.json")]).unwrap();
        create_commit(&repo, "create", &author).unwrap();

        std::fs::remove_file(dir.path().join("task.json")).unwrap();
        add_paths(&repo, &[Path::new("task.json")]).unwrap();
        create_commit(&repo, "remove", &author).unwrap();

        let index = repo.index().unwrap();
        assert!(index.get_path(Path::new("task.json"), 0).is_none());
    }

    #[test]
    fn test_reset_staged_discards_pending_index_changes() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let author = Author::default();
        set_author_config(&repo, &author).unwrap();

        std::fs::write(dir.path().join("board.json"), "{}").unwrap();
        add_paths(&repo, &[Path::new("board.json")]).unwrap();
        create_commit(&repo, "initial commit", &author).unwrap();

        std::fs::write(dir.path().join("task.json"), "{}").unwrap();
        add_paths(&repo, &[Path::new("task.json")]).unwrap();
        reset_staged(&repo).unwrap();

        let index = repo.index().unwrap();
        assert!(index.get_path(Path::new("task.json"), 0).is_none());
        // The working tree file itself is untouched by a mixed reset.
        assert!(dir.path().join("task.json").exists());
    }

    #[test]
    fn test_reset_staged_before_any_commit_clears_index() {
        let dir = TempDir::new().unwrap();
        let repo = Repository::init(dir.path()).unwrap();

        std::fs::write(dir.path().join("task.json"), "{}").unwrap();
        add_paths(&repo, &[Path::new("task.json")]).unwrap();
        reset_staged(&repo).unwrap();

        let index = repo.index().unwrap();
        assert!(index.get_path(Path::new("task.json"), 0).is_none());
    }
}
