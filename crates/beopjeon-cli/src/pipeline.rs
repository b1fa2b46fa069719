//! The `harvest` command: sources → harvester → merge → enrich → corpus.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use beopjeon_ai::{enrich_documents, HttpEnricher};
use beopjeon_core::StructureExtractor;
use beopjeon_harvest::{CancellationToken, Harvester, Outcome, WorkItem};
use beopjeon_store::markdown::render_corpus;
use beopjeon_store::{export_bundle, publish, Candidate, CorpusArtifact, MergeEngine, MergeRecord};
use beopjeon_sync::{build_client, discover, LawApiClient, LawSearch, LawSummary, SourceKind, SourceRegistry, SourceSpec};
use chrono::Utc;
use tracing::{info, warn};

use crate::config::{Config, EnrichConfig};
use crate::display;

pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_LAW_SOURCE: &str = "law-go-kr";

/// Statutes to add to the configured items, found through the Open API.
pub struct LawSelection {
    pub name: String,
    pub family: bool,
}

pub fn law_client(config: &Config, oc: Option<&str>) -> anyhow::Result<LawApiClient> {
    let spec = config.law_api_source();
    let key = spec
        .and_then(|s| s.auth.as_deref())
        .or(oc)
        .context("a law.go.kr OC key is required: set LAW_API_OC or `auth` on a law_api source")?;
    let id = spec.map_or(DEFAULT_LAW_SOURCE, |s| s.id.as_str());
    let base = spec.map_or("", |s| s.base.as_str());
    let client = build_client(CONNECT_TIMEOUT).context("building HTTP client")?;
    Ok(LawApiClient::new(id, client, base, key))
}

/// Exact name match, else the first search result.
pub async fn find_law(client: &LawApiClient, name: &str) -> anyhow::Result<LawSummary> {
    let results = client
        .search(name)
        .await
        .with_context(|| format!("searching for {name:?}"))?;
    results
        .iter()
        .find(|l| l.law_name == name)
        .or_else(|| results.first())
        .cloned()
        .with_context(|| format!("no statute found for {name:?}"))
}

async fn selected_items(config: &Config, oc: Option<&str>, selection: &LawSelection) -> anyhow::Result<Vec<WorkItem>> {
    let client = law_client(config, oc)?;
    let source_id = config.law_api_source().map_or(DEFAULT_LAW_SOURCE, |s| s.id.as_str());
    let main = find_law(&client, &selection.name).await?;

    let laws: Vec<LawSummary> = if selection.family {
        discover(&client, &main, 2)
            .await
            .into_iter()
            .map(|m| m.law)
            .collect()
    } else {
        vec![main]
    };
    info!(name = %selection.name, count = laws.len(), "statutes selected");

    Ok(laws
        .iter()
        .map(|law| WorkItem::new(law.source_ref(source_id)).with_statute_code(law.law_id.clone()))
        .collect())
}

/// A `law_api` source is added when statutes are selected by name and the
/// config declares none.
fn with_law_source(config: &Config) -> Config {
    let mut config = config.clone();
    if config.law_api_source().is_none() {
        config.sources.push(SourceSpec {
            id: DEFAULT_LAW_SOURCE.into(),
            kind: SourceKind::LawApi,
            base: String::new(),
            auth: None,
            format: None,
            trust_priority: 0,
        });
    }
    config
}

async fn enrich_records(records: Vec<MergeRecord>, cfg: &EnrichConfig) -> anyhow::Result<Vec<MergeRecord>> {
    let enricher = HttpEnricher::new(cfg.endpoint.clone(), cfg.model.clone()).context("building enrichment client")?;
    let documents = records.iter().map(|r| r.winner.clone()).collect();
    let (documents, _) = enrich_documents(&enricher, documents, cfg.instruction, cfg.max_chars, cfg.concurrency).await;
    Ok(records
        .into_iter()
        .zip(documents)
        .map(|(record, winner)| MergeRecord { winner, ..record })
        .collect())
}

pub async fn run_harvest(
    config: &Config,
    oc: Option<&str>,
    selection: Option<LawSelection>,
    enrich: bool,
    cancel: CancellationToken,
) -> anyhow::Result<()> {
    let mut items = config.work_items();
    let config = match &selection {
        Some(selection) => {
            let config = with_law_source(config);
            items.extend(selected_items(&config, oc, selection).await?);
            config
        }
        None => config.clone(),
    };
    if items.is_empty() {
        warn!("nothing to harvest: no [[items]] configured");
        return Ok(());
    }

    // 1. Fetch, parse and extract.
    let client = build_client(CONNECT_TIMEOUT).context("building HTTP client")?;
    let registry = SourceRegistry::from_specs(&config.sources, &client, oc).context("configuring sources")?;
    let extractor = StructureExtractor::korean_statute().context("compiling numbering patterns")?;
    let harvester = Harvester::with_cancellation(
        Arc::new(registry),
        Arc::new(extractor),
        config.harvest.clone(),
        cancel,
    )?;
    let report = harvester.run(items).await;
    display::print_run_summary(&report.summary(), &report.outcomes);
    report.ensure_success()?;

    // 2. Merge, ranking fresh harvests against what earlier runs published.
    let output = &config.output;
    let prior = if output.incremental {
        CorpusArtifact::load_optional(&output.corpus)
            .with_context(|| format!("reading prior corpus {}", output.corpus.display()))?
    } else {
        None
    };
    let mut candidates: Vec<Candidate> = report
        .outcomes
        .into_iter()
        .filter_map(|o| match o {
            Outcome::Success { source, document, .. } => Some(Candidate::new(source, document)),
            _ => None,
        })
        .collect();
    if let Some(prior) = &prior {
        let competing = prior.competing_candidates(&candidates);
        info!(count = competing.len(), "published entries re-ranked against this run");
        candidates.extend(competing);
    }
    let mut records = MergeEngine::new(config.trust_policy()).merge(&candidates);
    display::print_conflicts(&records);

    // 3. Optional enrichment.
    if let Some(cfg) = config.enrich.as_ref().filter(|_| enrich) {
        records = enrich_records(records, cfg).await?;
    }

    // 4. Assemble and publish.
    let now = Utc::now();
    let artifact = match prior {
        Some(prior) => CorpusArtifact::assemble_incremental(&prior, &records, now).0,
        None => CorpusArtifact::assemble(&records, now),
    };
    artifact
        .publish(&output.corpus)
        .with_context(|| format!("writing {}", output.corpus.display()))?;

    if let Some(path) = &output.markdown {
        publish::publish(path, render_corpus(&artifact).as_bytes())
            .with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &output.bundle {
        export_bundle(path, &artifact.documents, now).with_context(|| format!("writing {}", path.display()))?;
    }
    display::print_manifest(&artifact);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn law_source_added_only_when_missing() {
        let config = with_law_source(&Config::default());
        assert_eq!(config.law_api_source().map(|s| s.id.as_str()), Some(DEFAULT_LAW_SOURCE));

        let again = with_law_source(&config);
        assert_eq!(again.sources.len(), 1);
    }

    #[test]
    fn law_client_needs_a_key() {
        assert!(law_client(&Config::default(), None).is_err());
        assert!(law_client(&Config::default(), Some("test")).is_ok());
    }

    #[tokio::test]
    async fn harvest_from_local_files_publishes_corpus() {
        let tmp = tempfile::TempDir::new().unwrap();
        let laws = tmp.path().join("laws");
        std::fs::create_dir_all(&laws).unwrap();
        std::fs::write(
            laws.join("road.xml"),
            "<법령><기본정보><법령ID>001638</법령ID><법령명_한글>도로법</법령명_한글><시행일자>20240101</시행일자></기본정보>\
             <조문><조문단위><조문내용>제1조(목적) 이 법은 도로에 관하여 규정한다.</조문내용></조문단위></조문></법령>",
        )
        .unwrap();

        let text = format!(
            r#"
[harvest]
requests_per_second = 0.0

[[sources]]
id = "disk"
kind = "file"
base = "{}"

[[items]]
source = "disk"
target = "road.xml"

[output]
corpus = "{}"
markdown = "{}"
bundle = "{}"
"#,
            laws.display(),
            tmp.path().join("corpus.json").display(),
            tmp.path().join("corpus.md").display(),
            tmp.path().join("laws.zip").display(),
        );
        let config = Config::parse(&text, std::path::Path::new("test.toml")).unwrap();

        run_harvest(&config, None, None, false, CancellationToken::new())
            .await
            .unwrap();

        let corpus = CorpusArtifact::load(&tmp.path().join("corpus.json")).unwrap();
        assert_eq!(corpus.manifest.document_count, 1);
        assert_eq!(corpus.documents[0].statute_code, "001638");
        assert_eq!(corpus.documents[0].sources, vec!["disk".to_string()]);
        assert!(std::fs::read_to_string(tmp.path().join("corpus.md")).unwrap().contains("## 도로법"));
        assert!(tmp.path().join("laws.zip").exists());
    }

    #[tokio::test]
    async fn second_run_from_low_trust_mirror_keeps_official_text() {
        let tmp = tempfile::TempDir::new().unwrap();
        for (dir, title) in [("official", "도로법"), ("mirror", "도로법 사본")] {
            let root = tmp.path().join(dir);
            std::fs::create_dir_all(&root).unwrap();
            std::fs::write(
                root.join("road.xml"),
                format!(
                    "<법령><기본정보><법령ID>001638</법령ID><법령명_한글>{title}</법령명_한글><시행일자>20240101</시행일자></기본정보>\
                     <조문><조문단위><조문내용>제1조(목적) 이 법은 도로에 관하여 규정한다.</조문내용></조문단위></조문></법령>"
                ),
            )
            .unwrap();
        }
        let corpus = tmp.path().join("corpus.json");
        let config_for = |item_source: &str| {
            let text = format!(
                r#"
[harvest]
requests_per_second = 0.0

[[sources]]
id = "official"
kind = "file"
base = "{official}"
trust_priority = 10

[[sources]]
id = "mirror"
kind = "file"
base = "{mirror}"
trust_priority = 1

[[items]]
source = "{item_source}"
target = "road.xml"

[output]
corpus = "{corpus}"
"#,
                official = tmp.path().join("official").display(),
                mirror = tmp.path().join("mirror").display(),
                corpus = corpus.display(),
            );
            Config::parse(&text, std::path::Path::new("test.toml")).unwrap()
        };

        run_harvest(&config_for("official"), None, None, false, CancellationToken::new())
            .await
            .unwrap();
        run_harvest(&config_for("mirror"), None, None, false, CancellationToken::new())
            .await
            .unwrap();

        let artifact = CorpusArtifact::load(&corpus).unwrap();
        assert_eq!(artifact.documents.len(), 1);
        assert_eq!(artifact.documents[0].title, "도로법");
        assert_eq!(artifact.documents[0].sources, vec!["official".to_string(), "mirror".to_string()]);
    }

    #[tokio::test]
    async fn all_failed_harvest_is_an_error() {
        let tmp = tempfile::TempDir::new().unwrap();
        let text = format!(
            "[[sources]]\nid = \"disk\"\nkind = \"file\"\nbase = \"{}\"\n\n[[items]]\nsource = \"disk\"\ntarget = \"missing.xml\"\n\n[output]\ncorpus = \"{}\"\n",
            tmp.path().display(),
            tmp.path().join("corpus.json").display(),
        );
        let config = Config::parse(&text, std::path::Path::new("test.toml")).unwrap();

        let err = run_harvest(&config, None, None, false, CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no documents"));
        assert!(!tmp.path().join("corpus.json").exists());
    }
}
