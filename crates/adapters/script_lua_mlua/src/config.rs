//! Interpreter limits.

/// Default heap ceiling for one script run: 32 MiB.
pub const DEFAULT_MEMORY_LIMIT_BYTES: usize = 32 * 1024 * 1024;

/// Limits applied to every interpreter the runner creates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LuaRunnerConfig {
    /// Maximum heap size in bytes; `None` leaves the interpreter unbounded.
    pub memory_limit: Option<usize>,
}

impl Default for LuaRunnerConfig {
    fn default() -> Self {
        Self {
            memory_limit: Some(DEFAULT_MEMORY_LIMIT_BYTES),
        }
    }
}

impl LuaRunnerConfig {
    /// Config from a byte count where `0` means "no limit".
    #[must_use]
    pub fn from_limit_bytes(bytes: usize) -> Self {
        Self {
            memory_limit: (bytes > 0).then_some(bytes),
        }
    }
}
