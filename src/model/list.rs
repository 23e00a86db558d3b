use crate::model::entity;
use serde::{Deserialize, Serialize};

/// A user-defined grouping of subscriptions, e.g. "Family" or "Work".
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct List {
    pub id: String,
    pub name: String,
}

impl List {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
        }
    }
}

entity!(List, Lists, "list");
