//! Converts Playwright/Selenium test scripts into an ordered step schema for
//! a form-automation engine.
//!
//! Two stages, each with a model-assisted path and a deterministic fallback:
//! [`extractor`] turns script text into semantic actions, [`mapper`] turns
//! each action into a schema command. [`assembler`] numbers the commands and
//! [`resolver`] supplies the base URL.

pub mod assembler;
pub mod brain;
pub mod config;
pub mod error;
pub mod extractor;
pub mod mapper;
pub mod migrator;
pub mod resolver;
pub mod types;

pub use config::{Config, LlmProvider};
pub use error::MigrateError;
pub use extractor::{ActionExtractor, Extraction, Strategy};
pub use mapper::{CommandMapper, Mapping, SampleSchema};
pub use migrator::{MigrationOutcome, Migrator};
pub use types::{
    ActionType, Command, CommandName, SchemaCommand, SchemaDocument, SchemaField, SemanticAction,
};
