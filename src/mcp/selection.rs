//! Tool selection filters and capability inference for MCP tools

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

const READ_VERBS: &[&str] = &["get", "read", "list", "search", "find", "fetch", "query", "show", "view"];

const DANGEROUS_VERBS: &[&str] = &["delete", "remove", "drop", "destroy", "force", "admin", "sudo", "root"];

// Only checked against the tool name. Descriptions mention writes too loosely to be useful.
const WRITE_VERBS: &[&str] = &[
    "create", "write", "update", "set", "put", "post", "insert", "send", "modify", "edit", "add",
    "move", "rename", "upload", "execute", "run",
];

/// What a remote tool is able to do
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct McpToolCapabilities {
    pub is_read_only: bool,
    pub is_dangerous: bool,
}

impl McpToolCapabilities {
    /// Guess capabilities from the tool's name and description
    pub fn infer(name: &str, description: &str) -> Self {
        let name_words = words(name);
        let description_words = words(description);
        let mentions = |verbs: &[&str]| {
            name_words
                .iter()
                .chain(description_words.iter())
                .any(|word| verbs.contains(&word.as_str()))
        };

        let is_dangerous = mentions(DANGEROUS_VERBS);
        let writes = name_words.iter().any(|word| WRITE_VERBS.contains(&word.as_str()));
        let is_read_only = !is_dangerous && !writes && mentions(READ_VERBS);

        Self {
            is_read_only,
            is_dangerous,
        }
    }

    /// Explicit hints from the server win over inference
    pub fn with_hints(mut self, read_only_hint: Option<bool>, destructive_hint: Option<bool>) -> Self {
        if let Some(destructive) = destructive_hint {
            self.is_dangerous = destructive;
        }
        if let Some(read_only) = read_only_hint {
            self.is_read_only = read_only;
            if read_only && destructive_hint.is_none() {
                self.is_dangerous = false;
            }
        }
        self
    }
}

/// Split an identifier or sentence into lowercase words (snake_case, kebab-case, camelCase, prose)
fn words(text: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut previous_lower = false;

    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            previous_lower = false;
            continue;
        }
        if ch.is_uppercase() && previous_lower && !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
        previous_lower = ch.is_lowercase() || ch.is_ascii_digit();
        current.extend(ch.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

/// Capability presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpToolPreset {
    /// Only tools that do not change anything
    ReadOnly,
    /// Only tools that change something
    WriteOnly,
    /// Everything except dangerous tools
    Safe,
}

/// Which remote tools a server exposes to the agent
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum McpToolSelection {
    #[default]
    All,
    Including(BTreeSet<String>),
    Excluding(BTreeSet<String>),
    Preset(McpToolPreset),
}

impl McpToolSelection {
    pub fn including<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Including(names.into_iter().map(Into::into).collect())
    }

    pub fn excluding<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Excluding(names.into_iter().map(Into::into).collect())
    }

    /// Whether a tool with this remote name and capabilities is kept
    pub fn allows(&self, name: &str, capabilities: &McpToolCapabilities) -> bool {
        match self {
            McpToolSelection::All => true,
            McpToolSelection::Including(names) => names.contains(name),
            McpToolSelection::Excluding(names) => !names.contains(name),
            McpToolSelection::Preset(McpToolPreset::ReadOnly) => capabilities.is_read_only,
            McpToolSelection::Preset(McpToolPreset::WriteOnly) => !capabilities.is_read_only,
            McpToolSelection::Preset(McpToolPreset::Safe) => !capabilities.is_dangerous,
        }
    }
}
