//! Classification of interpreter failures.

use lorescript_domain::error::ScriptError;

/// Stage of a run an interpreter error came from.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Stage {
    /// Building the interpreter and its globals.
    Setup,
    /// Loading the chunk and running its top level.
    Load,
    /// Calling `entries`.
    Call,
    /// Converting the returned value.
    Convert,
}

/// Map an mlua error raised during `stage` onto a [`ScriptError`].
pub(crate) fn classify(stage: Stage, err: &mlua::Error) -> ScriptError {
    match root_cause(err) {
        mlua::Error::SyntaxError { message, .. } => ScriptError::Syntax {
            message: message.clone(),
        },
        mlua::Error::MemoryError(message) => ScriptError::ResourceLimit {
            message: message.clone(),
        },
        cause => match stage {
            Stage::Setup => ScriptError::Sandbox {
                message: cause.to_string(),
            },
            Stage::Load | Stage::Call => ScriptError::Runtime {
                message: cause.to_string(),
            },
            Stage::Convert => ScriptError::MalformedResult {
                reason: cause.to_string(),
            },
        },
    }
}

/// Errors raised inside Rust callbacks arrive wrapped; the cause is what
/// tells them apart.
fn root_cause(err: &mlua::Error) -> &mlua::Error {
    match err {
        mlua::Error::CallbackError { cause, .. } => root_cause(cause),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn should_classify_syntax_error_regardless_of_stage() {
        let err = mlua::Error::SyntaxError {
            message: "unexpected symbol".to_string(),
            incomplete_input: false,
        };
        assert!(matches!(
            classify(Stage::Load, &err),
            ScriptError::Syntax { .. }
        ));
    }

    #[test]
    fn should_classify_memory_error_as_resource_limit() {
        let err = mlua::Error::MemoryError("not enough memory".to_string());
        assert!(matches!(
            classify(Stage::Call, &err),
            ScriptError::ResourceLimit { .. }
        ));
    }

    #[test]
    fn should_unwrap_callback_errors() {
        let err = mlua::Error::CallbackError {
            traceback: String::new(),
            cause: Arc::new(mlua::Error::MemoryError("oom".to_string())),
        };
        assert!(matches!(
            classify(Stage::Call, &err),
            ScriptError::ResourceLimit { .. }
        ));
    }

    #[test]
    fn should_classify_by_stage_otherwise() {
        let err = mlua::Error::RuntimeError("boom".to_string());
        assert!(matches!(
            classify(Stage::Call, &err),
            ScriptError::Runtime { .. }
        ));
        assert!(matches!(
            classify(Stage::Convert, &err),
            ScriptError::MalformedResult { .. }
        ));
        assert!(matches!(
            classify(Stage::Setup, &err),
            ScriptError::Sandbox { .. }
        ));
    }
}
