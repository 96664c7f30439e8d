use crate::types::{Command, DOCUMENT_DESCRIPTION, DOCUMENT_NAME, SchemaCommand, SchemaDocument};

/// Numbers the surviving commands 1..=n in their given order and wraps them
/// in the migrated test definition. `None` entries are dropped without
/// leaving a gap.
pub fn assemble(commands: Vec<Option<Command>>, base_url: &str) -> SchemaDocument {
    let steps = commands
        .into_iter()
        .flatten()
        .enumerate()
        .map(|(i, command)| SchemaCommand {
            command,
            order: i + 1,
        })
        .collect();

    SchemaDocument {
        steps,
        name: DOCUMENT_NAME.to_string(),
        description: DOCUMENT_DESCRIPTION.to_string(),
        base_url: base_url.to_string(),
    }
}
