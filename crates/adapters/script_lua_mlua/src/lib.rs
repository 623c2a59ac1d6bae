//! # lorescript-adapter-script-lua-mlua
//!
//! Lua script runner built on [mlua](https://docs.rs/mlua).
//!
//! ## Responsibilities
//! - Implement the `ScriptRunner` port defined in `lorescript-app::ports`
//! - Create one isolated Lua 5.4 interpreter per script invocation
//! - Move the execution snapshot into Lua and the returned table back out
//! - Classify interpreter failures as domain `ScriptError`s
//!
//! ## Dependency rule
//! Depends on `lorescript-app` (for the port trait) and `lorescript-domain`
//! (for domain types). The `app` and `domain` crates must never reference
//! this adapter.

pub mod config;
mod error;
pub mod runner;

pub use config::LuaRunnerConfig;
pub use runner::LuaScriptRunner;
