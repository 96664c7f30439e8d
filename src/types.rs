use serde::{Deserialize, Deserializer, Serialize};

/// Kind of user interaction recognized in a script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    Goto,
    Fill,
    Click,
    SelectOption,
    Upload,
    Hover,
    #[default]
    #[serde(other)]
    Unknown,
}

impl ActionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Goto => "goto",
            ActionType::Fill => "fill",
            ActionType::Click => "click",
            ActionType::SelectOption => "select_option",
            ActionType::Upload => "upload",
            ActionType::Hover => "hover",
            ActionType::Unknown => "unknown",
        }
    }
}

/// One user interaction pulled out of a script, independent of the framework
/// that wrote it.
///
/// A kind outside the known six decodes as [`ActionType::Unknown`] but keeps
/// the verb the model used, so it serializes back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "WireAction", into = "WireAction")]
pub struct SemanticAction {
    pub action_type: ActionType,
    pub selector: String,
    pub value: String,
    pub description: String,
    raw_kind: String,
}

impl SemanticAction {
    pub fn new(
        action_type: ActionType,
        selector: impl Into<String>,
        value: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            selector: selector.into(),
            value: value.into(),
            description: description.into(),
            raw_kind: action_type.as_str().to_string(),
        }
    }

    /// The action verb as written by whoever produced it.
    pub fn kind(&self) -> &str {
        if self.action_type == ActionType::Unknown && !self.raw_kind.is_empty() {
            &self.raw_kind
        } else {
            self.action_type.as_str()
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireAction {
    #[serde(
        rename = "action",
        alias = "action_type",
        default,
        deserialize_with = "lenient_string"
    )]
    action: String,
    #[serde(default, deserialize_with = "lenient_string")]
    selector: String,
    #[serde(default, deserialize_with = "lenient_string")]
    value: String,
    #[serde(default, deserialize_with = "lenient_string")]
    description: String,
}

impl From<WireAction> for SemanticAction {
    fn from(wire: WireAction) -> Self {
        let raw_kind = wire.action.trim().to_ascii_lowercase();
        let action_type =
            serde_json::from_value(serde_json::Value::String(raw_kind.clone())).unwrap_or_default();
        Self {
            action_type,
            selector: wire.selector,
            value: wire.value,
            description: wire.description,
            raw_kind,
        }
    }
}

impl From<SemanticAction> for WireAction {
    fn from(action: SemanticAction) -> Self {
        Self {
            action: action.kind().to_string(),
            selector: action.selector,
            value: action.value,
            description: action.description,
        }
    }
}

/// Name of a command understood by the form-automation engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommandName {
    Visit,
    Type,
    Click,
    Select,
    Keypress,
    Upload,
    Hover,
}

/// One typed input of a schema command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    #[serde(deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(rename = "type", default = "default_field_type")]
    pub field_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub label: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub value: String,
    #[serde(default = "default_required")]
    pub required: bool,
}

impl SchemaField {
    /// A required text field, the only kind the fallback table emits.
    pub fn text(name: &str, label: &str, value: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            field_type: default_field_type(),
            label: label.to_string(),
            value: value.into(),
            required: true,
        }
    }
}

/// A command name plus its ordered fields, before it has a position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    pub name: CommandName,
    pub fields: Vec<SchemaField>,
}

impl Command {
    pub fn field(&self, name: &str) -> Option<&SchemaField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// True when no two fields share a name.
    pub fn has_unique_fields(&self) -> bool {
        self.fields
            .iter()
            .enumerate()
            .all(|(i, f)| self.fields[..i].iter().all(|prev| prev.name != f.name))
    }
}

/// A mapped command at its 1-based position in the migrated test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCommand {
    pub command: Command,
    #[serde(default)]
    pub order: usize,
}

/// The migrated test definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDocument {
    pub steps: Vec<SchemaCommand>,
    pub name: String,
    pub description: String,
    pub base_url: String,
}

pub const DOCUMENT_NAME: &str = "migratedTest";
pub const DOCUMENT_DESCRIPTION: &str = "Migrated from Playwright test";

fn default_field_type() -> String {
    "text".to_string()
}

fn default_required() -> bool {
    true
}

// Model output is loose: nulls, numbers and booleans show up where strings belong.
fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s,
        other => other.to_string(),
    })
}
