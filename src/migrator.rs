use std::fs::OpenOptions;
use std::path::Path;

use tracing::{debug, info};

use crate::assembler::assemble;
use crate::brain;
use crate::config::Config;
use crate::error::{MigrateError, Result};
use crate::extractor::{ActionExtractor, Strategy};
use crate::mapper::{CommandMapper, Mapping, SampleSchema};
use crate::resolver::resolve_base_url;
use crate::types::SchemaDocument;

/// Result of one migration, with a tally of which paths ran.
#[derive(Debug, Clone)]
pub struct MigrationOutcome {
    pub document: SchemaDocument,
    pub extraction: Strategy,
    pub llm_mapped: usize,
    pub fallback_mapped: usize,
    pub dropped: usize,
}

impl MigrationOutcome {
    /// The document in its list wrapper, as written to disk and served.
    pub fn into_documents(self) -> Vec<SchemaDocument> {
        vec![self.document]
    }
}

pub struct Migrator {
    extractor: ActionExtractor,
    mapper: CommandMapper,
}

impl Migrator {
    pub fn new(extractor: ActionExtractor, mapper: CommandMapper) -> Self {
        Self { extractor, mapper }
    }

    /// Pattern extraction and the fixed mapping table only.
    pub fn offline() -> Self {
        Self::new(ActionExtractor::offline(), CommandMapper::offline())
    }

    /// Wires up the configured backend and loads the sample schema.
    ///
    /// Fails only on misconfiguration; an unreachable model is not checked
    /// here and degrades per call instead.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let Some(llm) = brain::connect(config)? else {
            info!("LLM disabled, using deterministic fallback only");
            return Ok(Self::offline());
        };

        let sample_path = config.sample_schema_path.as_deref().ok_or_else(|| {
            MigrateError::ConfigurationMissing("SAMPLE_SCHEMA_PATH not set".to_string())
        })?;
        let sample = SampleSchema::load(sample_path)?;
        info!(
            provider = ?config.provider,
            model = %config.model,
            sample = %sample_path.display(),
            "LLM-assisted migration ready"
        );

        Ok(Self::new(
            ActionExtractor::new(Some(llm.clone())),
            CommandMapper::new(llm, sample),
        ))
    }

    pub async fn run(&self, script: &str) -> MigrationOutcome {
        let extraction = self.extractor.extract(script).await;

        let mut llm_mapped = 0;
        let mut fallback_mapped = 0;
        let mut dropped = 0;
        let mut commands = Vec::with_capacity(extraction.actions.len());

        for (i, action) in extraction.actions.iter().enumerate() {
            debug!(index = i + 1, action = action.kind(), "Converting action");
            let mapping = self.mapper.map(action).await;
            match &mapping {
                Mapping::Llm(_) => llm_mapped += 1,
                Mapping::Fallback(_) => fallback_mapped += 1,
                Mapping::Dropped => dropped += 1,
            }
            commands.push(mapping.into_command());
        }

        let document = assemble(commands, &resolve_base_url(script));
        info!(
            steps = document.steps.len(),
            llm_mapped, fallback_mapped, dropped, "Migration assembled"
        );

        MigrationOutcome {
            document,
            extraction: extraction.strategy,
            llm_mapped,
            fallback_mapped,
            dropped,
        }
    }

    pub async fn migrate(&self, script: &str) -> Vec<SchemaDocument> {
        self.run(script).await.into_documents()
    }

    /// Reads a script, migrates it and writes the result as indented JSON.
    pub async fn migrate_file(
        &self,
        script_path: &Path,
        output_path: &Path,
    ) -> Result<Vec<SchemaDocument>> {
        let script = tokio::fs::read_to_string(script_path).await?;
        let documents = self.migrate(&script).await;
        save_documents(output_path, &documents)?;
        info!(output = %output_path.display(), "Schema saved");
        Ok(documents)
    }
}

pub fn save_documents(path: &Path, documents: &[SchemaDocument]) -> Result<()> {
    let file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)?;

    serde_json::to_writer_pretty(file, documents)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LlmProvider;
    use std::io::Write;

    #[tokio::test]
    async fn test_offline_run_tallies_paths() {
        let script = r##"
page.goto("https://a.test/start")
page.click("#go")
"##;
        let outcome = Migrator::offline().run(script).await;
        assert_eq!(outcome.extraction, Strategy::Fallback);
        assert_eq!(outcome.fallback_mapped, 2);
        assert_eq!(outcome.llm_mapped, 0);
        assert_eq!(outcome.dropped, 0);
        assert_eq!(outcome.document.base_url, "https://a.test");
    }

    #[test]
    fn test_from_config_disabled() {
        assert!(Migrator::from_config(&Config::offline()).is_ok());
    }

    #[test]
    fn test_from_config_missing_sample_file() {
        let mut config = Config::offline();
        config.provider = LlmProvider::Ollama;
        config.sample_schema_path = Some("/nonexistent/CustomerCreate.json".into());
        assert!(matches!(
            Migrator::from_config(&config),
            Err(MigrateError::SampleSchema { .. })
        ));
    }

    #[test]
    fn test_from_config_with_sample_file() {
        let mut sample = tempfile::NamedTempFile::new().unwrap();
        write!(sample, "[]").unwrap();

        let mut config = Config::offline();
        config.provider = LlmProvider::Ollama;
        config.model = "llama3.2".to_string();
        config.sample_schema_path = Some(sample.path().to_path_buf());
        assert!(Migrator::from_config(&config).is_ok());
    }
}
