use serde_json::{Value, json};

use crate::error::Result;
use crate::models::DirectoryNode;

/// `{"directory": ..., "contents": [...], "children": {...}}`
pub fn directory_document(node: &DirectoryNode) -> Result<Value> {
    Ok(serde_json::to_value(node)?)
}

/// `{"files": [...]}`
pub fn files_document(names: &[String]) -> Value {
    json!({ "files": names })
}
