//! # lens-core
//!
//! Core types, reducers, and port traits for the ViralLens campaign workspace.
//!
//! This crate provides:
//! - The notebook data model (files, parameter settings, content ideas)
//! - A single reducer per entity kind that owns every invariant reset
//! - The idea list state machine
//! - File intake validation against a configurable allow-list
//! - The persistence snapshot format and its transient-field exclusions
//! - Port traits for generation, extraction, and persistence collaborators

pub mod defaults;
pub mod error;
pub mod ideas;
pub mod intake;
pub mod logging;
pub mod models;
pub mod snapshot;
pub mod traits;
pub mod workspace;

pub use error::{Error, Result};
pub use ideas::{apply_idea_action, can_move_down, can_move_up, IdeaAction};
pub use intake::{intake_files, AcceptPolicy, AcceptRule, IncomingFile, IntakeOutcome, Rejection};
pub use models::*;
pub use snapshot::{FileRecord, IdeaRecord, NotebookRecord, StoreSnapshot};
pub use traits::*;
pub use workspace::{NotebookUpdate, Workspace};
