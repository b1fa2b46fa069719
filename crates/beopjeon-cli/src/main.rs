//! `beopjeon`: collect Korean statutes from configured sources and publish a
//! normalised corpus.

mod config;
mod display;
mod pipeline;

use std::io::Write;
use std::path::PathBuf;

use anyhow::{bail, Context};
use beopjeon_harvest::CancellationToken;
use beopjeon_store::markdown::render_corpus;
use beopjeon_store::{export_bundle, publish, CorpusArtifact};
use beopjeon_sync::{discover, LawSearch};
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::{Config, DEFAULT_CONFIG_PATH};
use crate::pipeline::{find_law, law_client, run_harvest, LawSelection};

#[derive(Parser)]
#[command(name = "beopjeon", version, about = "Collect and normalise Korean statutes into a canonical corpus")]
struct Cli {
    /// Configuration file.
    #[arg(long, global = true, env = "BEOPJEON_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// law.go.kr Open API key (OC).
    #[arg(long, global = true, env = "LAW_API_OC", hide_env_values = true)]
    oc: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch, parse and merge every configured item, then publish the corpus.
    Harvest {
        /// Also harvest the statute with this name (law.go.kr search).
        #[arg(long)]
        law: Option<String>,
        /// With --law, include its decrees, rules and related statutes.
        #[arg(long, requires = "law")]
        family: bool,
        /// Skip the [enrich] step even when configured.
        #[arg(long)]
        no_enrich: bool,
    },
    /// Search law.go.kr by statute name.
    Search { query: String },
    /// List a statute's family (upper, lower, admin and related laws).
    Family {
        name: String,
        /// Print [[items]] entries instead of a table.
        #[arg(long)]
        items: bool,
    },
    /// Render the corpus as Markdown.
    Render {
        #[arg(long)]
        corpus: Option<PathBuf>,
        /// Output file; stdout when omitted.
        #[arg(long, short)]
        out: Option<PathBuf>,
    },
    /// Show one statute from the corpus as a card.
    Show {
        statute_code: String,
        #[arg(long)]
        corpus: Option<PathBuf>,
    },
    /// Export the corpus as a zip bundle.
    Bundle {
        #[arg(long)]
        corpus: Option<PathBuf>,
        #[arg(long, short)]
        out: PathBuf,
    },
}

fn load_corpus(config: &Config, corpus: Option<PathBuf>) -> anyhow::Result<CorpusArtifact> {
    let path = corpus.unwrap_or_else(|| config.output.corpus.clone());
    CorpusArtifact::load(&path).with_context(|| format!("loading corpus {}", path.display()))
}

fn cancel_on_ctrl_c() -> CancellationToken {
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted: no new work will start, in-flight items will finish");
            token.cancel();
        }
    });
    cancel
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!("beopjeon v{}", env!("CARGO_PKG_VERSION"));
    let oc = cli.oc.as_deref();

    match cli.command {
        Command::Harvest { law, family, no_enrich } => {
            let config = if law.is_some() {
                Config::load_or_default(&cli.config)?
            } else {
                Config::load(&cli.config)?
            };
            let selection = law.map(|name| LawSelection { name, family });
            run_harvest(&config, oc, selection, !no_enrich, cancel_on_ctrl_c()).await?;
        }
        Command::Search { query } => {
            let config = Config::load_or_default(&cli.config)?;
            let client = law_client(&config, oc)?;
            let results = client
                .search(&query)
                .await
                .with_context(|| format!("searching for {query:?}"))?;
            display::print_search_results(&results);
        }
        Command::Family { name, items } => {
            let config = Config::load_or_default(&cli.config)?;
            let client = law_client(&config, oc)?;
            let main = find_law(&client, &name).await?;
            let members = discover(&client, &main, 2).await;
            if items {
                let source_id = config
                    .law_api_source()
                    .map_or(pipeline::DEFAULT_LAW_SOURCE, |s| s.id.as_str());
                print!("{}", display::items_toml(source_id, &members));
            } else {
                display::print_family(&members);
            }
        }
        Command::Render { corpus, out } => {
            let config = Config::load_or_default(&cli.config)?;
            let artifact = load_corpus(&config, corpus)?;
            let markdown = render_corpus(&artifact);
            match out {
                Some(path) => publish::publish(&path, markdown.as_bytes())
                    .with_context(|| format!("writing {}", path.display()))?,
                None => std::io::stdout()
                    .write_all(markdown.as_bytes())
                    .context("writing to stdout")?,
            }
        }
        Command::Show { statute_code, corpus } => {
            let config = Config::load_or_default(&cli.config)?;
            let artifact = load_corpus(&config, corpus)?;
            let mut found = artifact.find(&statute_code).peekable();
            if found.peek().is_none() {
                bail!("statute {statute_code} is not in the corpus");
            }
            for doc in found {
                display::print_document_card(doc);
            }
        }
        Command::Bundle { corpus, out } => {
            let config = Config::load_or_default(&cli.config)?;
            let artifact = load_corpus(&config, corpus)?;
            export_bundle(&out, &artifact.documents, artifact.manifest.generated_at)
                .with_context(|| format!("writing {}", out.display()))?;
            println!("  {:<26} {}", "bundle", out.display());
            println!("  {:<26} {}", "laws", artifact.documents.len());
        }
    }
    Ok(())
}
