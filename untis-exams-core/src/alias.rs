use std::collections::HashMap;

use crate::Result;

/// Maps subjects as reported by WebUntis to the label shown in the calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectAliases {
    aliases: HashMap<String, String>,
}

impl SubjectAliases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads aliases from a JSON object such as `{"English": "E"}`.
    pub fn load_from_json(&mut self, json_data: &str) -> Result<()> {
        let aliases: HashMap<String, String> = serde_json::from_str(json_data)?;
        self.aliases.extend(aliases);
        Ok(())
    }

    pub fn add_alias(&mut self, subject: impl Into<String>, alias: impl Into<String>) {
        self.aliases.insert(subject.into(), alias.into());
    }

    /// Exact-match lookup; unknown subjects pass through unchanged.
    pub fn translate(&self, subject: &str) -> String {
        self.aliases
            .get(subject)
            .cloned()
            .unwrap_or_else(|| subject.to_string())
    }

    pub fn get_all_aliases(&self) -> &HashMap<String, String> {
        &self.aliases
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    pub fn export_to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.aliases)?)
    }
}

impl From<HashMap<String, String>> for SubjectAliases {
    fn from(aliases: HashMap<String, String>) -> Self {
        Self { aliases }
    }
}
