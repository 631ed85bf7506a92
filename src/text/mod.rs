//! Object graph ⇄ JSON text.
//!
//! The JSON document is an array with one element per root.  Roots carry a
//! `$type` discriminator, payload objects a `$class`, and typed values are
//! written as `{"$t": "U32", "$v": 7}`.  Keys starting with `$` are
//! structural and never renamed.
//!
//! Field names go through [`FieldNaming`] at this boundary only: the graph
//! keeps Havok's internal names, the text drops the internal prefix and the
//! computed fields nobody edits.  A name that would not come back unchanged
//! after stripping (no prefix, or a stripped form that looks structural or
//! suppressed) is written whole behind `$raw:`.

use serde_json::{Map, Value};
use thiserror::Error;

use crate::object::{HavokRoot, SIGNATURE_KEY};

/// Prefix of Havok member names.
pub const INTERNAL_PREFIX: &str = "m_";
/// Keys starting with this character are never renamed.
const STRUCTURAL_SIGIL: char = '$';
/// Marks a key written exactly as it appears in the graph.
pub const RAW_KEY_PREFIX: &str = "$raw:";

#[derive(Error, Debug)]
pub enum TextError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Expected a JSON array of roots at top level")]
    NotAnArray,
}

// ── FieldNaming ──────────────────────────────────────────────────────────────

/// How graph field names map to text keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNaming {
    /// Stripped from keys on the way out, restored on the way in.
    pub internal_prefix: String,
    /// Keys dropped on the way out and left untouched on the way in.
    pub suppressed:      Vec<String>,
}

impl Default for FieldNaming {
    fn default() -> Self {
        Self {
            internal_prefix: INTERNAL_PREFIX.to_string(),
            suppressed:      vec![SIGNATURE_KEY.to_string()],
        }
    }
}

impl FieldNaming {
    /// Keep every field name exactly as in the graph.
    pub fn verbatim() -> Self {
        Self { internal_prefix: String::new(), suppressed: Vec::new() }
    }

    fn is_suppressed(&self, key: &str) -> bool {
        self.suppressed.iter().any(|s| s == key)
    }

    fn is_structural(key: &str) -> bool {
        key.starts_with(STRUCTURAL_SIGIL)
    }

    /// Graph form → text form.
    pub fn to_text(&self, value: Value) -> Value {
        self.rename(value, &|key| {
            if self.is_suppressed(key) {
                return None;
            }
            if Self::is_structural(key) {
                return Some(if key.starts_with(RAW_KEY_PREFIX) {
                    format!("{RAW_KEY_PREFIX}{key}")
                } else {
                    key.to_string()
                });
            }
            match key.strip_prefix(self.internal_prefix.as_str()) {
                Some(short) if !Self::is_structural(short) && !self.is_suppressed(short) => {
                    Some(short.to_string())
                }
                _ => Some(format!("{RAW_KEY_PREFIX}{key}")),
            }
        })
    }

    /// Text form → graph form.
    pub fn to_graph(&self, value: Value) -> Value {
        self.rename(value, &|key| {
            if let Some(raw) = key.strip_prefix(RAW_KEY_PREFIX) {
                Some(raw.to_string())
            } else if Self::is_structural(key) || self.is_suppressed(key) {
                Some(key.to_string())
            } else {
                Some(format!("{}{key}", self.internal_prefix))
            }
        })
    }

    fn rename(&self, value: Value, map_key: &dyn Fn(&str) -> Option<String>) -> Value {
        match value {
            Value::Object(entries) => {
                let mut out = Map::with_capacity(entries.len());
                for (key, v) in entries {
                    if let Some(new_key) = map_key(&key) {
                        out.insert(new_key, self.rename(v, map_key));
                    }
                }
                Value::Object(out)
            }
            Value::Array(items) => Value::Array(items.into_iter().map(|v| self.rename(v, map_key)).collect()),
            other => other,
        }
    }
}

// ── TreeCodec ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct TreeCodec {
    pub naming: FieldNaming,
    /// Indent the output.
    pub pretty: bool,
}

impl TreeCodec {
    pub fn new(naming: FieldNaming, pretty: bool) -> Self {
        Self { naming, pretty }
    }

    pub fn encode(&self, roots: &[HavokRoot]) -> Result<String, TextError> {
        let graph = serde_json::to_value(roots)?;
        let text = self.naming.to_text(graph);
        Ok(if self.pretty {
            serde_json::to_string_pretty(&text)?
        } else {
            serde_json::to_string(&text)?
        })
    }

    pub fn decode(&self, text: &str) -> Result<Vec<HavokRoot>, TextError> {
        let value: Value = serde_json::from_str(text)?;
        if !value.is_array() {
            return Err(TextError::NotAnArray);
        }
        Ok(serde_json::from_value(self.naming.to_graph(value))?)
    }
}
