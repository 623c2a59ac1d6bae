//! Script runner port: isolated execution of a lorebook script.

use lorescript_domain::error::ScriptError;
use lorescript_domain::lorebook::ScriptAttachment;
use lorescript_domain::selection::SelectionResult;
use lorescript_domain::snapshot::ExecutionSnapshot;

/// Executes a script in a fresh sandbox and reads back its selection.
///
/// Implementations behave as a pure function `(source, snapshot) ->
/// selection | error`: every call gets its own interpreter instance and no
/// state survives between calls. The call is synchronous and runs to
/// completion.
pub trait ScriptRunner {
    /// Load `script`, call its `entries` function with `snapshot`, and
    /// interpret the returned value.
    ///
    /// # Errors
    ///
    /// Returns a [`ScriptError`] describing the first failing step.
    fn run(
        &self,
        lorebook: &str,
        script: &ScriptAttachment,
        snapshot: &ExecutionSnapshot,
    ) -> Result<SelectionResult, ScriptError>;
}

impl<T: ScriptRunner> ScriptRunner for std::sync::Arc<T> {
    fn run(
        &self,
        lorebook: &str,
        script: &ScriptAttachment,
        snapshot: &ExecutionSnapshot,
    ) -> Result<SelectionResult, ScriptError> {
        (**self).run(lorebook, script, snapshot)
    }
}
