use crate::model::entity;
use serde::{Deserialize, Serialize};

/// A user-defined spending category, e.g. "Streaming", shown with its `color`.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: String,
    pub name: String,
    /// A display color such as `#FF6B6B`.
    pub color: String,
}

impl Category {
    /// Creates a category without an id. The id is assigned when it is added to a store.
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            color: color.into(),
        }
    }
}

entity!(Category, Categories, "category");
