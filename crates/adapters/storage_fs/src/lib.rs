//! # lorescript-adapter-storage-fs
//!
//! Host adapter backed by plain files.
//!
//! ## Responsibilities
//! - Implement `LorebookRepository` over a directory of `<name>.json`
//!   lorebooks in the host's world-info format
//! - Keep the canonical entry instances of each lorebook alive between
//!   activation runs, refreshing them when the file changes
//! - Implement `SessionSource` over a JSON session file
//!
//! ## Dependency rule
//! Depends on `lorescript-app` (for port traits) and `lorescript-domain`
//! (for domain types). The `app` and `domain` crates must never reference
//! this adapter.

mod error;
pub mod lorebook_repo;
pub mod session;

pub use error::StorageError;
pub use lorebook_repo::FsLorebookRepository;
pub use session::FsSessionSource;
