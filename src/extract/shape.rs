/*!
 * Call Shapes
 * The two argument layouts an instrumented call may arrive in
 */

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Named options record (`{ name, data, format }`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CallOptions {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

/// Argument layout of an instrumented call, chosen by the caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum CallShape {
    /// `op(name, data)`
    Positional { name: String, data: Option<Value> },
    /// `op({ name, data, format })`
    Options(CallOptions),
}

impl CallShape {
    pub fn positional(name: impl Into<String>, data: Option<Value>) -> Self {
        CallShape::Positional {
            name: name.into(),
            data,
        }
    }

    pub fn options(options: CallOptions) -> Self {
        CallShape::Options(options)
    }

    pub fn name(&self) -> &str {
        match self {
            CallShape::Positional { name, .. } => name,
            CallShape::Options(opts) => &opts.name,
        }
    }

    pub fn data(&self) -> Option<&Value> {
        match self {
            CallShape::Positional { data, .. } => data.as_ref(),
            CallShape::Options(opts) => opts.data.as_ref(),
        }
    }

    /// Only the options layout carries a format
    pub fn format(&self) -> Option<&str> {
        match self {
            CallShape::Positional { .. } => None,
            CallShape::Options(opts) => opts.format.as_deref(),
        }
    }
}

impl From<CallOptions> for CallShape {
    fn from(options: CallOptions) -> Self {
        CallShape::Options(options)
    }
}
