use crate::model::entity;
use serde::{Deserialize, Serialize};

/// A known service that a subscription can be created from. `icon_key` names the icon the view
/// layer renders for it.
#[derive(Default, Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTemplate {
    pub id: String,
    pub name: String,
    pub icon_key: String,
}

impl ServiceTemplate {
    pub fn new(name: impl Into<String>, icon_key: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            name: name.into(),
            icon_key: icon_key.into(),
        }
    }
}

entity!(ServiceTemplate, Templates, "template");

/// (id, name, icon key)
const BUILTIN: &[(&str, &str, &str)] = &[
    ("builtin-netflix", "Netflix", "netflix"),
    ("builtin-spotify", "Spotify", "spotify"),
    ("builtin-youtube-premium", "YouTube Premium", "youtube"),
    ("builtin-disney-plus", "Disney+", "disney"),
    ("builtin-apple-music", "Apple Music", "apple-music"),
    ("builtin-icloud", "iCloud+", "icloud"),
    ("builtin-amazon-prime", "Amazon Prime", "amazon"),
    ("builtin-hbo-max", "Max", "hbo"),
    ("builtin-xbox-game-pass", "Xbox Game Pass", "xbox"),
    ("builtin-playstation-plus", "PlayStation Plus", "playstation"),
    ("builtin-chatgpt-plus", "ChatGPT Plus", "openai"),
    ("builtin-github", "GitHub", "github"),
];

/// The catalog of templates bundled with the app. These are never persisted; user-created
/// templates are stored alongside them.
pub fn builtin_templates() -> Vec<ServiceTemplate> {
    BUILTIN
        .iter()
        .map(|(id, name, icon)| ServiceTemplate {
            id: id.to_string(),
            name: name.to_string(),
            icon_key: icon.to_string(),
        })
        .collect()
}

#[test]
fn test_builtin_ids_are_unique() {
    let templates = builtin_templates();
    let mut ids: Vec<&str> = templates.iter().map(|t| t.id.as_str()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), templates.len());
}
