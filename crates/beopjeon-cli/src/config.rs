//! `beopjeon.toml`: harvest tuning, sources, work items and outputs.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use beopjeon_ai::{Instruction, DEFAULT_EXCERPT_CHARS};
use beopjeon_core::{Format, SourceRef};
use beopjeon_harvest::{HarvestConfig, WorkItem};
use beopjeon_store::TrustPolicy;
use beopjeon_sync::{SourceKind, SourceSpec};
use serde::Deserialize;
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "beopjeon.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub harvest: HarvestConfig,
    pub sources: Vec<SourceSpec>,
    pub items: Vec<ItemSpec>,
    pub output: OutputConfig,
    pub enrich: Option<EnrichConfig>,
}

/// One `[[items]]` entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ItemSpec {
    pub source: String,
    pub target: String,
    #[serde(default)]
    pub format: Option<Format>,
    #[serde(default)]
    pub statute_code: Option<String>,
}

impl ItemSpec {
    pub fn to_work_item(&self) -> WorkItem {
        WorkItem {
            target: SourceRef::new(self.source.clone(), self.target.clone()),
            format: self.format,
            statute_code: self.statute_code.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub corpus: PathBuf,
    pub markdown: Option<PathBuf>,
    pub bundle: Option<PathBuf>,
    /// Carry unaffected entries of an existing corpus forward.
    pub incremental: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            corpus: PathBuf::from("corpus.json"),
            markdown: None,
            bundle: None,
            incremental: true,
        }
    }
}

/// `[enrich]`: optional model endpoint for summaries.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnrichConfig {
    pub endpoint: String,
    pub model: String,
    #[serde(default = "default_instruction")]
    pub instruction: Instruction,
    #[serde(default = "default_max_chars")]
    pub max_chars: usize,
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

fn default_instruction() -> Instruction {
    Instruction::Summarize
}

fn default_max_chars() -> usize {
    DEFAULT_EXCERPT_CHARS
}

fn default_concurrency() -> usize {
    2
}

impl Config {
    pub fn parse(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound(path.to_path_buf())
            } else {
                ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;
        Self::parse(&text, path)
    }

    /// Load `path`, or fall back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(ConfigError::NotFound(_)) => Ok(Self::default()),
            other => other,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.harvest
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        let mut ids = HashSet::new();
        for source in &self.sources {
            if source.id.trim().is_empty() {
                return Err(ConfigError::Invalid("source with empty id".into()));
            }
            if !ids.insert(source.id.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate source id {:?}", source.id)));
            }
        }
        for item in &self.items {
            if !ids.contains(item.source.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "item {:?} refers to unknown source {:?}",
                    item.target, item.source
                )));
            }
        }
        Ok(())
    }

    pub fn work_items(&self) -> Vec<WorkItem> {
        self.items.iter().map(ItemSpec::to_work_item).collect()
    }

    pub fn trust_policy(&self) -> TrustPolicy {
        self.sources
            .iter()
            .map(|s| (s.id.clone(), s.trust_priority))
            .collect()
    }

    /// The first `law_api` source, if any.
    pub fn law_api_source(&self) -> Option<&SourceSpec> {
        self.sources.iter().find(|s| s.kind == SourceKind::LawApi)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[harvest]
workers = 8
requests_per_second = 0.5

[[sources]]
id = "law-go-kr"
kind = "law_api"
trust_priority = 10

[[sources]]
id = "disk"
kind = "file"
base = "/data/laws"
format = "pdf"

[[items]]
source = "law-go-kr"
target = "248613"

[[items]]
source = "disk"
target = "도로법.pdf"
statute_code = "001638"

[output]
corpus = "out/corpus.json"
markdown = "out/corpus.md"

[enrich]
endpoint = "http://localhost:11434"
model = "qwen2.5"
"#;

    fn parse(text: &str) -> Result<Config, ConfigError> {
        Config::parse(text, Path::new("beopjeon.toml"))
    }

    #[test]
    fn full_config_parses() {
        let config = parse(SAMPLE).unwrap();
        assert_eq!(config.harvest.workers, 8);
        assert_eq!(config.harvest.max_attempts, 5);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[1].format, Some(Format::Pdf));
        assert_eq!(config.output.corpus, PathBuf::from("out/corpus.json"));
        assert!(config.output.incremental);
        assert_eq!(config.output.bundle, None);

        let enrich = config.enrich.as_ref().unwrap();
        assert_eq!(enrich.instruction, Instruction::Summarize);
        assert_eq!(enrich.max_chars, DEFAULT_EXCERPT_CHARS);

        let items = config.work_items();
        assert_eq!(items[0].target, SourceRef::new("law-go-kr", "248613"));
        assert_eq!(items[1].statute_code.as_deref(), Some("001638"));

        assert_eq!(config.trust_policy().priority("law-go-kr"), 10);
        assert_eq!(config.law_api_source().map(|s| s.id.as_str()), Some("law-go-kr"));
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config = parse("").unwrap();
        assert_eq!(config.harvest, HarvestConfig::default());
        assert!(config.items.is_empty());
        assert_eq!(config.output, OutputConfig::default());
    }

    #[test]
    fn unknown_item_source_is_rejected() {
        let err = parse("[[items]]\nsource = \"nowhere\"\ntarget = \"x\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn duplicate_source_is_rejected() {
        let text = "[[sources]]\nid = \"a\"\nkind = \"file\"\n[[sources]]\nid = \"a\"\nkind = \"http\"\n";
        assert!(matches!(parse(text), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        assert!(matches!(parse("[harvest\n"), Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("beopjeon.toml");
        assert!(matches!(Config::load(&path), Err(ConfigError::NotFound(_))));
        assert!(Config::load_or_default(&path).unwrap().sources.is_empty());

        std::fs::write(&path, SAMPLE).unwrap();
        assert_eq!(Config::load(&path).unwrap().items.len(), 2);
    }
}
