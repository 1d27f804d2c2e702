//! Type definitions for the ChatGPT data export (`conversations.json`).
//!
//! The export is a JSON array of conversations (older exports wrap it in an
//! object under `conversations`). Each conversation stores its messages as a
//! tree keyed by node id:
//!
//! ```json
//! {
//!   "title": "Test Chat",
//!   "create_time": 1700000000.123,
//!   "mapping": {
//!     "root": { "parent": null, "children": ["a"] },
//!     "a": {
//!       "parent": "root",
//!       "children": [],
//!       "message": { "author": { "role": "user" }, "content": { "parts": ["Hello"] } }
//!     }
//!   }
//! }
//! ```
//!
//! Only the fields needed to rebuild the visible thread are modelled; everything
//! else in the export (ids, model slugs, metadata blobs) is ignored by serde.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use eyre::{Context, Result, eyre};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// One exported chat session.
#[derive(Debug, Clone, Deserialize)]
pub struct Conversation {
    #[serde(default)]
    title: Option<String>,
    /// Unix seconds, possibly fractional. Absent or `null` means the epoch.
    #[serde(default)]
    create_time: Option<f64>,
    pub mapping: NodeMap,
}

impl Conversation {
    /// Decode a single record. Failure here is scoped to this record only.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).wrap_err("Malformed conversation record")
    }

    /// Trimmed title, `Untitled` when the export has none.
    pub fn title(&self) -> &str {
        self.title.as_deref().map(str::trim).unwrap_or("Untitled")
    }

    pub fn create_time(&self) -> f64 {
        self.create_time.unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Node map
// ---------------------------------------------------------------------------

/// Nodes keyed by id, kept in the order they appear in the export.
#[derive(Debug, Clone, Default)]
pub struct NodeMap {
    nodes: Vec<(String, Node)>,
    index: HashMap<String, usize>,
}

impl NodeMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace; a replaced node keeps its original position.
    pub fn insert(&mut self, id: impl Into<String>, node: Node) {
        let id = id.into();
        match self.index.get(&id) {
            Some(&i) => self.nodes[i].1 = node,
            None => {
                self.index.insert(id.clone(), self.nodes.len());
                self.nodes.push((id, node));
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i].1)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Entries in document order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.nodes.iter().map(|(id, node)| (id.as_str(), node))
    }
}

impl<K: Into<String>> FromIterator<(K, Node)> for NodeMap {
    fn from_iter<I: IntoIterator<Item = (K, Node)>>(iter: I) -> Self {
        let mut map = NodeMap::new();
        for (id, node) in iter {
            map.insert(id, node);
        }
        map
    }
}

impl<'de> Deserialize<'de> for NodeMap {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NodeMapVisitor;

        impl<'de> Visitor<'de> for NodeMapVisitor {
            type Value = NodeMap;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("an object of message nodes keyed by id")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<NodeMap, A::Error> {
                let mut map = NodeMap::new();
                while let Some((id, node)) = access.next_entry::<String, Node>()? {
                    map.insert(id, node);
                }
                Ok(map)
            }
        }

        deserializer.deserialize_map(NodeMapVisitor)
    }
}

// ---------------------------------------------------------------------------
// Node / Message
// ---------------------------------------------------------------------------

/// A vertex of the message tree. The root carries no parent and usually no message.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Node {
    #[serde(default)]
    pub parent: Option<String>,
    #[serde(default)]
    pub children: Vec<String>,
    #[serde(default)]
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub author: Author,
    pub content: Content,
}

impl Message {
    /// Parts joined by newline, trimmed.
    pub fn text(&self) -> String {
        self.content
            .parts
            .iter()
            .map(Part::render)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    pub role: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

/// A single content part. Text parts are plain strings; anything else
/// (image pointers, tool payloads, ...) is kept as raw JSON.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Part {
    Text(String),
    Structured(Value),
}

impl Part {
    /// Text verbatim; structured values as compact JSON.
    pub fn render(&self) -> String {
        match self {
            Part::Text(text) => text.clone(),
            // Serializing a `Value` cannot fail: all map keys are strings.
            Part::Structured(value) => value.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read the export file and return its conversation records, still undecoded.
pub fn load_records(path: &Path) -> Result<Vec<Value>> {
    let raw = fs::read_to_string(path)
        .wrap_err_with(|| format!("Failed to read input: {}", path.display()))?;
    let data: Value = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("Failed to parse JSON: {}", path.display()))?;
    records_from_value(data)
}

/// Accepts either a top-level array or an object holding a `conversations` array.
pub fn records_from_value(data: Value) -> Result<Vec<Value>> {
    match data {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("conversations") {
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(other) => Err(eyre!(
                "`conversations` must be an array, found {}",
                json_kind(&other)
            )),
        },
        other => Err(eyre!(
            "Expected an array of conversations, found {}",
            json_kind(&other)
        )),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
