//! Runtime Variables
//!
//! The payment block's amount, receipt email and description are
//! user-authored templates referencing chatbot variables (`{{Total}}`).
//! Substitution goes through the [`VariableInterpolator`] trait so callers
//! can plug in their own templating engine.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A named runtime variable supplied by the caller
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableBinding {
    pub name: String,

    #[serde(default)]
    pub value: Value,
}

impl VariableBinding {
    pub fn new(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Text form of the value; null renders empty, lists join with `", "`
    pub fn render(&self) -> String {
        render_value(&self.value)
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Variable substitution strategy
pub trait VariableInterpolator: Send + Sync {
    /// Substitute `bindings` into `template`
    fn interpolate(&self, bindings: &[VariableBinding], template: &str) -> String;
}

/// `{{name}}` placeholder substitution.
///
/// Unknown variables and null values render as the empty string. When a
/// name is bound twice the first binding wins.
#[derive(Clone, Debug, Default)]
pub struct TemplateInterpolator;

impl VariableInterpolator for TemplateInterpolator {
    fn interpolate(&self, bindings: &[VariableBinding], template: &str) -> String {
        let mut output = String::with_capacity(template.len());
        let mut rest = template;

        while let Some(start) = rest.find("{{") {
            let Some(len) = rest[start + 2..].find("}}") else {
                break;
            };
            output.push_str(&rest[..start]);

            let name = rest[start + 2..start + 2 + len].trim();
            if let Some(binding) = bindings.iter().find(|b| b.name == name) {
                output.push_str(&binding.render());
            }

            rest = &rest[start + 2 + len + 2..];
        }

        output.push_str(rest);
        output
    }
}
