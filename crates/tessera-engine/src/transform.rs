//! User-authored data transforms.
//!
//! A transform is a function body that receives the resolved data as
//! `data` and returns the reshaped value:
//!
//! ```text
//! local out = {}
//! for _, row in ipairs(data.items) do
//!     table.insert(out, { name = row.label, value = row.total })
//! end
//! return out
//! ```
//!
//! Snippets run through an [`Evaluator`]. The shipped evaluator is a fresh
//! sandboxed Luau state per call with a heap limit and an instruction
//! budget. Transforms are cosmetic: the [`TransformEngine`] never lets an
//! evaluation error escape and falls back to the untransformed data.

use mlua::{Function, Lua, LuaSerdeExt, VmState};
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tessera_core::config::TransformSettings;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a snippet could not produce a value.
#[derive(Error, Debug)]
pub enum EvalError {
    #[error("transform failed to compile: {0}")]
    Compile(String),

    #[error("transform raised an error: {0}")]
    Runtime(String),

    #[error("transform exceeded its instruction budget")]
    BudgetExhausted,

    #[error("transform value conversion failed: {0}")]
    Conversion(String),

    #[error("transforms are disabled")]
    Disabled,
}

/// Evaluates a unary function body against an input value.
pub trait Evaluator: Send + Sync {
    fn evaluate(&self, code: &str, input: &Value) -> Result<Value, EvalError>;
}

/// Sandboxed Luau evaluator.
#[derive(Debug, Clone)]
pub struct LuauEvaluator {
    memory_limit: usize,
    instruction_budget: u64,
}

const BUDGET_MESSAGE: &str = "instruction budget exhausted";

impl LuauEvaluator {
    pub fn new(memory_limit: usize, instruction_budget: u64) -> Self {
        Self {
            memory_limit,
            instruction_budget,
        }
    }

    /// Creates a Luau state: sandbox, memory limit, interrupt budget.
    fn create_state(&self) -> mlua::Result<Lua> {
        let lua = Lua::new();
        lua.sandbox(true)?;
        lua.set_memory_limit(self.memory_limit)?;

        let count = AtomicU64::new(0);
        let budget = self.instruction_budget;
        lua.set_interrupt(move |_| {
            if count.fetch_add(1, Ordering::Relaxed) >= budget {
                return Err(mlua::Error::runtime(BUDGET_MESSAGE));
            }
            Ok(VmState::Continue)
        });

        Ok(lua)
    }
}

impl Default for LuauEvaluator {
    fn default() -> Self {
        let settings = TransformSettings::default();
        Self::new(settings.memory_limit_bytes, settings.instruction_budget)
    }
}

impl Evaluator for LuauEvaluator {
    fn evaluate(&self, code: &str, input: &Value) -> Result<Value, EvalError> {
        let lua = self
            .create_state()
            .map_err(|e| EvalError::Runtime(e.to_string()))?;

        let chunk = format!("return function(data)\n{}\nend", code);
        let function: Function = lua
            .load(chunk.as_str())
            .set_name("transform")
            .eval()
            .map_err(|e| EvalError::Compile(e.to_string()))?;

        let arg = lua
            .to_value(input)
            .map_err(|e| EvalError::Conversion(e.to_string()))?;

        let output: mlua::Value = function.call(arg).map_err(|e| {
            if mentions_budget(&e) {
                EvalError::BudgetExhausted
            } else {
                EvalError::Runtime(e.to_string())
            }
        })?;

        let value: Value = lua
            .from_value(output)
            .map_err(|e| EvalError::Conversion(e.to_string()))?;

        // An empty Lua table has no array part; read it as an empty list.
        Ok(match value {
            Value::Object(map) if map.is_empty() => Value::Array(Vec::new()),
            other => other,
        })
    }
}

/// Interrupt errors surface wrapped in callback errors; check the whole chain.
fn mentions_budget(err: &mlua::Error) -> bool {
    let mut current: Option<&dyn std::error::Error> = Some(err);
    while let Some(e) = current {
        if e.to_string().contains(BUDGET_MESSAGE) {
            return true;
        }
        current = e.source();
    }
    false
}

/// Evaluator that refuses every snippet.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledEvaluator;

impl Evaluator for DisabledEvaluator {
    fn evaluate(&self, _code: &str, _input: &Value) -> Result<Value, EvalError> {
        Err(EvalError::Disabled)
    }
}

/// Build the evaluator selected by configuration.
pub fn evaluator_from_settings(settings: &TransformSettings) -> Arc<dyn Evaluator> {
    if settings.enabled {
        Arc::new(LuauEvaluator::new(
            settings.memory_limit_bytes,
            settings.instruction_budget,
        ))
    } else {
        Arc::new(DisabledEvaluator)
    }
}

/// Applies optional transforms, failing open.
#[derive(Clone)]
pub struct TransformEngine {
    evaluator: Arc<dyn Evaluator>,
}

impl TransformEngine {
    pub fn new(evaluator: Arc<dyn Evaluator>) -> Self {
        Self { evaluator }
    }

    /// Apply `code` to `data`. Blank or absent code returns `data` as is;
    /// any evaluation error is logged and `data` is returned unchanged.
    pub fn apply(&self, data: Value, code: Option<&str>) -> Value {
        let code = match code.map(str::trim) {
            None | Some("") => return data,
            Some(code) => code,
        };

        match self.evaluator.evaluate(code, &data) {
            Ok(transformed) => {
                debug!("Transform applied");
                transformed
            }
            Err(e) => {
                warn!(error = %e, "Transform failed, using untransformed data");
                data
            }
        }
    }
}

impl Default for TransformEngine {
    fn default() -> Self {
        Self::new(Arc::new(LuauEvaluator::default()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn engine() -> TransformEngine {
        TransformEngine::default()
    }

    #[test]
    fn test_reshape_object() {
        let data = json!({"user": {"first": "Ana"}});
        let out = engine().apply(data, Some("return { name = data.user.first }"));
        assert_eq!(out, json!({"name": "Ana"}));
    }

    #[test]
    fn test_map_array() {
        let data = json!({"items": [{"label": "Jan", "total": 5}, {"label": "Feb", "total": 7}]});
        let code = r#"
            local out = {}
            for _, row in ipairs(data.items) do
                table.insert(out, { name = row.label, value = row.total * 2 })
            end
            return out
        "#;
        let out = engine().apply(data, Some(code));
        let rows = out.as_array().unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["name"], json!("Feb"));
        assert_eq!(rows[1]["value"].as_f64(), Some(14.0));
    }

    #[test]
    fn test_empty_table_is_empty_list() {
        let data = json!({"items": [{"total": 1}]});
        let code = r#"
            local out = {}
            for _, row in ipairs(data.items) do
                if row.total > 10 then table.insert(out, row) end
            end
            return out
        "#;
        assert_eq!(engine().apply(data, Some(code)), json!([]));
    }

    #[test]
    fn test_throwing_snippets_return_input_unchanged() {
        let data = json!({"a": [1, 2, 3], "b": "x"});
        let snippets = [
            "error('boom')",
            "return data.missing.field",
            "return (",
            "local x = nil; return x + 1",
            "while true do end",
        ];
        for code in snippets {
            assert_eq!(engine().apply(data.clone(), Some(code)), data, "snippet {code}");
        }
    }

    #[test]
    fn test_blank_code_is_skipped() {
        let data = json!([1, 2]);
        assert_eq!(engine().apply(data.clone(), None), data);
        assert_eq!(engine().apply(data.clone(), Some("   ")), data);
    }

    #[test]
    fn test_budget_is_reported() {
        let err = LuauEvaluator::default()
            .evaluate("while true do end", &Value::Null)
            .unwrap_err();
        assert!(matches!(err, EvalError::BudgetExhausted));
    }

    #[test]
    fn test_sandbox_has_no_os_access() {
        let err = LuauEvaluator::default()
            .evaluate("return os.execute('true')", &Value::Null)
            .unwrap_err();
        assert!(matches!(err, EvalError::Runtime(_)));
    }

    #[test]
    fn test_disabled_evaluator_fails_open() {
        let engine = TransformEngine::new(Arc::new(DisabledEvaluator));
        let data = json!({"keep": true});
        assert_eq!(engine.apply(data.clone(), Some("return 1")), data);
    }
}
