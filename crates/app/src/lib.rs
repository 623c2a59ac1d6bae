//! # lorescript-app
//!
//! Application layer: use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters implement (driven/outbound ports):
//!   - `LorebookRepository`: load/save lorebooks, hand out canonical entries
//!   - `SessionSource`: active lorebook bindings and the ambient conversation
//!   - `ScriptRunner`: execute a lorebook script against a snapshot
//!   - `ActivationPublisher`: emit activation batches to the host
//! - Define **driving/inbound** use-cases:
//!   - `ScriptService`: locate, normalize, and edit script attachments
//!   - `ActivationEngine`: react to host events, run scripts, reconcile
//! - Provide the **Entry Index** and **Reconciler** that keep the host's
//!   canonical entry identity intact across a script run
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `lorescript-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the reverse.

pub mod activation_engine;
pub mod entry_index;
pub mod event_bus;
pub mod ports;
pub mod reconciler;
pub mod services;
