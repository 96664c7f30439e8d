//! One semantic action to one schema command.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::brain::{TextGenerator, first_balanced_span};
use crate::error::{MigrateError, Result};
use crate::types::{ActionType, Command, CommandName, SchemaField, SemanticAction};

/// Reference document shown to the model as the target shape.
#[derive(Debug, Clone)]
pub struct SampleSchema(serde_json::Value);

impl SampleSchema {
    pub fn load(path: &Path) -> Result<Self> {
        let file = File::open(path).map_err(|e| MigrateError::SampleSchema {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let reader = BufReader::new(file);
        let value = serde_json::from_reader(reader).map_err(|e| MigrateError::SampleSchema {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Ok(Self(value))
    }

    pub fn from_value(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }
}

/// What mapping one action produced, and which path produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mapping {
    Llm(Command),
    Fallback(Command),
    Dropped,
}

impl Mapping {
    pub fn into_command(self) -> Option<Command> {
        match self {
            Mapping::Llm(command) | Mapping::Fallback(command) => Some(command),
            Mapping::Dropped => None,
        }
    }
}

/// The model's reply; any `order` it invents is ignored.
#[derive(Deserialize)]
struct LlmCommandReply {
    command: Command,
}

pub struct CommandMapper {
    llm: Option<(Arc<dyn TextGenerator>, SampleSchema)>,
}

impl CommandMapper {
    pub fn new(llm: Arc<dyn TextGenerator>, sample: SampleSchema) -> Self {
        Self {
            llm: Some((llm, sample)),
        }
    }

    pub fn offline() -> Self {
        Self { llm: None }
    }

    pub async fn map(&self, action: &SemanticAction) -> Mapping {
        if let Some(command) = self.attempt_llm(action).await {
            return Mapping::Llm(command);
        }
        match fallback_command(action) {
            Some(command) => Mapping::Fallback(command),
            None => {
                debug!(action = action.kind(), "No mapping, dropping action");
                Mapping::Dropped
            }
        }
    }

    pub async fn attempt_llm(&self, action: &SemanticAction) -> Option<Command> {
        let (llm, sample) = self.llm.as_ref()?;

        let prompt = mapping_prompt(action, sample).ok()?;
        let reply = match llm.generate(&prompt).await {
            Ok(text) => text,
            Err(e) => {
                warn!(error = %format!("{:#}", e), "LLM mapping unavailable");
                return None;
            }
        };

        let span = first_balanced_span(&reply, '{', '}')?;
        let parsed: LlmCommandReply = match serde_json::from_str(span) {
            Ok(parsed) => parsed,
            Err(e) => {
                debug!(error = %e, "LLM mapping reply did not decode");
                return None;
            }
        };

        let command = parsed.command;
        if command.fields.is_empty() || !command.has_unique_fields() {
            debug!(name = ?command.name, "LLM mapping reply had unusable fields");
            return None;
        }
        Some(command)
    }

    pub fn attempt_fallback(&self, action: &SemanticAction) -> Option<Command> {
        fallback_command(action)
    }
}

fn mapping_prompt(action: &SemanticAction, sample: &SampleSchema) -> Result<String> {
    let action_json = serde_json::to_string_pretty(action)?;
    let sample_json = serde_json::to_string_pretty(sample.as_value())?;

    Ok(format!(
        r##"Map this Playwright action to the schema format based on the sample schema structure.

Playwright Action:
{action_json}

Sample Schema (for reference):
{sample_json}

Schema commands:
- visit: Navigate to URL
- type: Fill text input
- click: Click element
- select: Select dropdown option
- keypress: Press keyboard key
- upload: Upload file
- hover: Hover element

Generate ONE schema command in this exact format:
{{
    "command": {{
        "name": "type|click|visit|select|keypress|upload|hover",
        "fields": [
            {{
                "name": "field_name",
                "type": "text",
                "label": "Label",
                "value": "actual_value",
                "required": true
            }}
        ]
    }}
}}

Map the action type correctly:
- goto -> visit
- fill -> type
- click -> click
- select_option -> select
- upload -> upload
- hover -> hover
- press -> keypress"##
    ))
}

fn or_default<'a>(text: &'a str, default: &'a str) -> &'a str {
    if text.is_empty() { default } else { text }
}

/// Fixed command template per action kind; `None` for anything else.
///
/// `fill` puts the typed value under a field called `name`. Downstream
/// consumers read it from there.
pub fn fallback_command(action: &SemanticAction) -> Option<Command> {
    let selector = || SchemaField::text("css_path", "CSS Path", action.selector.as_str());
    let titled =
        |default: &str| SchemaField::text("name", "Name", or_default(&action.description, default));

    let (name, fields) = match action.action_type {
        ActionType::Goto => (
            CommandName::Visit,
            vec![SchemaField::text("visit", "Browse to URL", action.value.as_str())],
        ),
        ActionType::Fill => (
            CommandName::Type,
            vec![
                SchemaField::text("name", "Name", action.value.as_str()),
                selector(),
            ],
        ),
        ActionType::Click => (CommandName::Click, vec![titled("Click element"), selector()]),
        ActionType::SelectOption => (
            CommandName::Select,
            vec![
                titled("Select option"),
                selector(),
                SchemaField::text("value", "Option Value", action.value.as_str()),
            ],
        ),
        ActionType::Upload => (
            CommandName::Upload,
            vec![
                titled("Upload file"),
                selector(),
                SchemaField::text("file_path", "File Path", action.value.as_str()),
            ],
        ),
        ActionType::Hover => (CommandName::Hover, vec![titled("Hover element"), selector()]),
        ActionType::Unknown => return None,
    };

    Some(Command { name, fields })
}
