//! [`ScriptRunner`] backed by a throwaway Lua 5.4 interpreter.

use mlua::{Lua, LuaOptions, LuaSerdeExt, SerializeOptions, StdLib, Value, Variadic};

use lorescript_app::ports::ScriptRunner;
use lorescript_domain::error::ScriptError;
use lorescript_domain::lorebook::ScriptAttachment;
use lorescript_domain::selection::{ENTRIES_KEY, SelectionResult};
use lorescript_domain::snapshot::ExecutionSnapshot;

use crate::config::LuaRunnerConfig;
use crate::error::{Stage, classify};

/// Name of the global function every script must define.
const ENTRY_POINT: &str = "entries";

/// Base-library globals that reach outside the interpreter.
const BLOCKED_GLOBALS: [&str; 3] = ["dofile", "loadfile", "load"];

/// Libraries available to scripts on top of the base library.
fn script_libs() -> StdLib {
    StdLib::TABLE | StdLib::STRING | StdLib::MATH | StdLib::UTF8 | StdLib::COROUTINE
}

/// Runs lorebook scripts, one fresh interpreter per call.
///
/// The runner holds no interpreter between calls, so it is `Send + Sync`
/// and can be shared by the engine across tasks.
#[derive(Debug, Clone, Default)]
pub struct LuaScriptRunner {
    config: LuaRunnerConfig,
}

impl LuaScriptRunner {
    /// Create a runner applying `config` to every interpreter.
    #[must_use]
    pub fn new(config: LuaRunnerConfig) -> Self {
        Self { config }
    }

    /// Build an interpreter with the restricted library set.
    fn sandbox(&self, lorebook: &str) -> mlua::Result<Lua> {
        let lua = Lua::new_with(script_libs(), LuaOptions::default())?;
        if let Some(limit) = self.config.memory_limit {
            lua.set_memory_limit(limit)?;
        }

        let globals = lua.globals();
        for name in BLOCKED_GLOBALS {
            globals.set(name, Value::Nil)?;
        }

        // stdout belongs to the host
        let owner = lorebook.to_string();
        let print = lua.create_function(move |_, args: Variadic<Value>| {
            let line = args.iter().map(render).collect::<Vec<_>>().join("\t");
            tracing::info!(target: "lorescript::script", lorebook = %owner, "{line}");
            Ok(())
        })?;
        globals.set("print", print)?;

        Ok(lua)
    }
}

impl ScriptRunner for LuaScriptRunner {
    #[tracing::instrument(skip(self, script, snapshot), fields(source_len = script.source.len()))]
    fn run(
        &self,
        lorebook: &str,
        script: &ScriptAttachment,
        snapshot: &ExecutionSnapshot,
    ) -> Result<SelectionResult, ScriptError> {
        let lua = self
            .sandbox(lorebook)
            .map_err(|err| classify(Stage::Setup, &err))?;

        lua.load(script.source.as_str())
            .set_name(format!("={lorebook}"))
            .exec()
            .map_err(|err| classify(Stage::Load, &err))?;

        let Value::Function(entries) = lua
            .globals()
            .get::<Value>(ENTRY_POINT)
            .map_err(|err| classify(Stage::Load, &err))?
        else {
            return Err(ScriptError::MissingEntryPoint);
        };

        let input = lua
            .to_value_with(
                snapshot,
                SerializeOptions::new()
                    .serialize_none_to_null(false)
                    .serialize_unit_to_null(false),
            )
            .map_err(|err| classify(Stage::Setup, &err))?;

        let output: Value = entries
            .call(input)
            .map_err(|err| classify(Stage::Call, &err))?;

        let output = script_output(&lua, output).map_err(|err| classify(Stage::Convert, &err))?;
        SelectionResult::from_script_output(output)
    }
}

/// Convert a script's return value into JSON.
///
/// The `entries` table is walked pair by pair so that numeric keys become
/// their decimal text, the same key a string `automationId` would use.
/// Only the records themselves go through serde.
fn script_output(lua: &Lua, output: Value) -> mlua::Result<serde_json::Value> {
    let Value::Table(root) = output else {
        return lua.from_value(output);
    };

    let mut converted = serde_json::Map::new();
    match root.get::<Value>(ENTRIES_KEY)? {
        Value::Nil => {}
        Value::Table(entries) => {
            let mut records = serde_json::Map::new();
            for pair in entries.pairs::<Value, Value>() {
                let (key, record) = pair?;
                let Some(key) = selection_key(&key) else {
                    tracing::debug!(key = key.type_name(), "ignoring selection with unusable key");
                    continue;
                };
                records.insert(key, lua.from_value(record)?);
            }
            converted.insert(ENTRIES_KEY.to_string(), serde_json::Value::Object(records));
        }
        other => {
            converted.insert(ENTRIES_KEY.to_string(), lua.from_value(other)?);
        }
    }
    Ok(serde_json::Value::Object(converted))
}

/// The `automationId` a key of the `entries` table refers to.
fn selection_key(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(String::from_utf8_lossy(&s.as_bytes()).into_owned()),
        Value::Integer(i) => Some(i.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Text of one `print` argument.
fn render(value: &Value) -> String {
    match value {
        Value::Nil => "nil".to_string(),
        Value::Boolean(b) => b.to_string(),
        Value::Integer(i) => i.to_string(),
        Value::Number(n) => n.to_string(),
        Value::String(s) => String::from_utf8_lossy(&s.as_bytes()).into_owned(),
        other => other.type_name().to_string(),
    }
}
