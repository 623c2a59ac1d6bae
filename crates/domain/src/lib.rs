//! # lorescript-domain
//!
//! Pure domain model for script-driven lorebook activation.
//!
//! ## Responsibilities
//! - Foundational types: typed identifiers and error conventions
//! - Define **Entries** (knowledge units) and their canonical, shared handles
//! - Define **Lorebooks** (named sets of entries) and the dual-location
//!   **script attachment** together with its normalization rules
//! - Define the **execution snapshot** handed to scripts and the
//!   **selection result** read back from them
//! - Define **host events** (triggers) and **activation batches** (output)
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;

pub mod entry;
pub mod event;
pub mod lorebook;
pub mod selection;
pub mod session;
pub mod snapshot;
