//! Kanban board engine with git-backed storage
//!
//! This crate provides a kanban board implementation that stores every task
//! as an individual JSON file under a version-controlled working tree. A
//! task's column, section, position, and priority label are derived from its
//! file path rather than stored in the file body; its `created_at`/
//! `updated_at` timestamps and (outside a sectioned column) its current
//! priority are derived from the file's commit history. A declarative rule
//! set gates task moves and updates before they commit.
//!
//! ## Overview
//!
//! - **One repository = one board** — the working tree root holds
//!   `board.json`, an optional `rules.json`, one directory per column, and an
//!   `archived/` directory.
//! - **File-per-task** — tasks are individual JSON files for clean diffs.
//! - **Path is truth** — column/section/position/priority are never
//!   duplicated into the file body.
//! - **Single writer, many readers** — [`BoardService`] serializes mutating
//!   operations behind a write lock and lets reads proceed concurrently.
//!
//! ## Basic usage
//!
//! ```rust,no_run
//! use eisenkan_core::{BoardService, CancellationToken};
//! use eisenkan_core::types::{Priority, Task, WorkflowStatus};
//! use eisenkan_git::{Author, GitRepository};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = GitRepository::initialize("/path/to/board", &Author::default())?;
//! let service = BoardService::new("/path/to/board", Arc::new(repo));
//! let cancel = CancellationToken::new();
//!
//! let id = service
//!     .create_task(
//!         Task::new("Implement feature X"),
//!         Priority::new(true, true),
//!         WorkflowStatus::new("todo", Some("urgent-important".to_string()), 1),
//!         &cancel,
//!     )
//!     .await?;
//! println!("created {id}");
//! # Ok(())
//! # }
//! ```
//!
//! ## Storage structure
//!
//! ```text
//! repo/
//! ├── board.json
//! ├── rules.json                       (optional)
//! ├── 01_todo/
//! │   └── urgent-important/0001-task-<id>.json
//! ├── 02_doing/0001-task-<id>.json
//! ├── archived/0001-task-<id>.json
//! └── .eisenkan/config/<type>/<identifier>.json
//! ```

pub mod board_service;
pub mod board_store;
pub mod cancellation;
pub mod config_store;
pub mod error;
pub mod paths;
pub mod rule_evaluator;
pub mod rules_aggregator;
pub mod rules_store;
pub mod trailers;
pub mod types;

pub use board_service::BoardService;
pub use board_store::BoardStore;
pub use cancellation::CancellationToken;
pub use config_store::{ConfigStore, ConfigurationData};
pub use error::{BoardError, Result};
pub use rules_aggregator::RulesDataAggregator;
pub use rules_store::RulesStore;
