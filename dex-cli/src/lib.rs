//! dex command-line front.
//!
//! Loads a TOML config, builds a [`RestClient`], drives a
//! [`CatalogController`] for one filter combination, and writes the resolved
//! entries to stdout as JSON lines. Logs go to stderr.

pub mod config;
pub mod error;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use dex_catalog::{CatalogController, CatalogOptions, MembershipIndex};
use dex_client::RestClient;
use dex_core::CatalogApi;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::CliConfig;
use crate::error::CliError;

/// Browse, filter, or look up catalog entries.
#[derive(Debug, Clone, Parser)]
#[command(name = "dex", version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML config file.
    #[arg(long, env = "DEX_CONFIG")]
    pub config: Option<PathBuf>,

    /// Exact name or numeric id. Takes priority over `--category`.
    #[arg(long)]
    pub query: Option<String>,

    /// Restrict the listing to one category.
    #[arg(long)]
    pub category: Option<String>,

    /// Extra pages to load after the first one.
    #[arg(long, default_value_t = 0)]
    pub pages: usize,

    /// Print the category directory instead of entries.
    #[arg(long)]
    pub list_categories: bool,
}

/// Install the stderr `fmt` subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dex=info"));
    // A second install (tests, embedding) keeps the existing subscriber.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

/// Run the CLI against the configured upstream, writing to stdout.
pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config = CliConfig::load(cli.config.as_deref())?;
    let api = Arc::new(RestClient::new(&config.client_config())?);
    tracing::debug!(base_url = api.base_url(), "client ready");

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    execute(api, config.catalog_options(), &cli, &mut out).await
}

/// Drive one controller session against `api` and write JSON lines to `out`.
///
/// Entries loaded before a failure are still written; the failure is then
/// returned as [`CliError::Load`].
pub async fn execute<A, W>(
    api: Arc<A>,
    options: CatalogOptions,
    cli: &Cli,
    out: &mut W,
) -> Result<(), CliError>
where
    A: CatalogApi + ?Sized,
    W: Write,
{
    let index = Arc::new(MembershipIndex::new(Arc::clone(&api)));

    if cli.list_categories {
        let directory = index.load_categories().await?;
        for category in directory.iter() {
            serde_json::to_writer(&mut *out, category)?;
            writeln!(out)?;
        }
        return Ok(());
    }

    let controller = CatalogController::new(api, index, options)?;
    controller.set_query(cli.query.clone().unwrap_or_default());
    controller.set_category(cli.category.clone().unwrap_or_default());

    controller.apply_filters().await;
    let mut remaining = cli.pages;
    while remaining > 0 && controller.can_load_more() && controller.error().is_none() {
        controller.load_more().await;
        remaining -= 1;
    }

    let snapshot = controller.snapshot();
    tracing::info!(
        strategy = %snapshot.strategy,
        entries = snapshot.entries.len(),
        more = snapshot.can_load_more,
        "catalog loaded"
    );
    for entry in &snapshot.entries {
        serde_json::to_writer(&mut *out, entry.as_ref())?;
        writeln!(out)?;
    }
    out.flush()?;

    match snapshot.error {
        Some(failure) => Err(failure.into()),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dex_catalog::FailureKind;
    use dex_test_utils::{Entry, MockCatalogApi};

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["dex"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    fn options(page_size: usize) -> CatalogOptions {
        CatalogOptions::new().with_page_size(page_size)
    }

    fn decode(out: &[u8]) -> Vec<Entry> {
        std::str::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_cli_flags() {
        let parsed = cli(&["--config", "dex.toml", "--category", "fire", "--pages", "2"]);
        assert_eq!(parsed.config, Some(PathBuf::from("dex.toml")));
        assert_eq!(parsed.category.as_deref(), Some("fire"));
        assert_eq!(parsed.pages, 2);
        assert!(parsed.query.is_none());
        assert!(!parsed.list_categories);
    }

    #[tokio::test]
    async fn test_browse_with_extra_pages() {
        let api = Arc::new(MockCatalogApi::sample());
        let mut out = Vec::new();
        execute(api, options(3), &cli(&["--pages", "1"]), &mut out)
            .await
            .unwrap();

        let ids: Vec<u32> = decode(&out).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    }

    #[tokio::test]
    async fn test_category_listing() {
        let api = Arc::new(MockCatalogApi::sample());
        let mut out = Vec::new();
        execute(api, options(24), &cli(&["--category", "water"]), &mut out)
            .await
            .unwrap();

        let names: Vec<String> = decode(&out).into_iter().map(|e| e.name).collect();
        assert_eq!(names, vec!["squirtle", "wartortle", "blastoise"]);
    }

    #[tokio::test]
    async fn test_exact_miss_is_an_error() {
        let api = Arc::new(MockCatalogApi::sample());
        let mut out = Vec::new();
        let result = execute(api, options(24), &cli(&["--query", "missingno"]), &mut out).await;

        match result {
            Err(CliError::Load(failure)) => {
                assert_eq!(failure.kind, FailureKind::NotFound);
                assert_eq!(
                    failure.to_string(),
                    "No entry found with that exact name or id."
                );
            }
            other => panic!("unexpected: {:?}", other),
        }
        assert!(out.is_empty());
    }

    #[tokio::test]
    async fn test_list_categories() {
        let api = Arc::new(MockCatalogApi::sample());
        let mut out = Vec::new();
        execute(api, options(24), &cli(&["--list-categories"]), &mut out)
            .await
            .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("\"electric\""));
        assert!(!text.contains("\"shadow\""));
    }
}
