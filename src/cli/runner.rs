//! CLI runner - executes commands

use crate::auth::Credentials;
use crate::cli::commands::{Cli, Commands, FetchArgs};
use crate::clock::{Clock, FixedClock, SystemClock};
use crate::config::PagerConfig;
use crate::error::{Error, Result, ResultExt};
use crate::http::{PageFetcher, QuotaScheduler, StatusHandling};
use crate::pagination::{OlderThan, PaginationDriver, TerminationPredicate};
use crate::types::JsonValue;
use std::io::Write;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// CLI runner
pub struct Runner {
    cli: Cli,
}

impl Runner {
    /// Create a new runner
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Run the CLI command and print its output
    pub async fn run(&self) -> Result<()> {
        let output = self.execute().await?;
        writeln!(std::io::stdout().lock(), "{output}")?;
        Ok(())
    }

    /// Run the CLI command and return what it would print
    pub async fn execute(&self) -> Result<String> {
        let config = self.load_config()?;
        match &self.cli.command {
            Commands::Fetch(args) => {
                let config = apply_overrides(config, args)?;
                let items = Self::fetch(&config, args).await?;
                render(&items, args.pretty)
            }
            Commands::Config => Ok(serde_yaml::to_string(&config)?.trim_end().to_string()),
        }
    }

    fn load_config(&self) -> Result<PagerConfig> {
        match &self.cli.config {
            Some(path) => PagerConfig::from_file(path)
                .with_context(|| format!("Invalid config {}", path.display())),
            None => Ok(PagerConfig::default()),
        }
    }

    /// Build the process-wide scheduler and run one pagination
    pub async fn fetch(config: &PagerConfig, args: &FetchArgs) -> Result<Vec<JsonValue>> {
        let scheduler = Arc::new(QuotaScheduler::with_retry(
            config.scheduler_config(),
            config.retry_policy(),
        )?);
        let fetcher = PageFetcher::with_config(scheduler, config.fetcher_config())?;
        let driver = PaginationDriver::new(fetcher).with_config(config.pagination_config());
        let credentials = Credentials::new(&args.user, &args.password);
        let predicate = build_predicate(config, args)?;

        let start = Instant::now();
        let result = driver
            .fetch_all_pages(
                &args.url,
                &credentials,
                predicate.as_ref().map(|p| p as &dyn TerminationPredicate),
            )
            .await;

        match &result {
            Ok(items) => info!(
                "Fetched {} item(s) in {:.1}s",
                items.len(),
                start.elapsed().as_secs_f64()
            ),
            Err(Error::Incomplete {
                pages_fetched,
                items,
                ..
            }) => warn!(
                "Aborted after {pages_fetched} page(s); {} item(s) discarded",
                items.len()
            ),
            Err(_) => {}
        }
        result
    }
}

/// Fold command-line flags into the loaded configuration
pub(super) fn apply_overrides(mut config: PagerConfig, args: &FetchArgs) -> Result<PagerConfig> {
    if args.lenient {
        config.http.status_handling = StatusHandling::Lenient;
    }
    if let Some(max_pages) = args.max_pages {
        config.pagination.max_pages = Some(max_pages);
    }
    if let Some(days) = args.max_age_days {
        config.predicate.max_age_days = days;
    }
    if let Some(field) = &args.date_field {
        config.predicate.date_field.clone_from(field);
    }
    config.validate()?;
    Ok(config)
}

/// The age predicate, enabled by `--max-age-days`
pub(super) fn build_predicate(
    config: &PagerConfig,
    args: &FetchArgs,
) -> Result<Option<OlderThan<Arc<dyn Clock>>>> {
    if args.max_age_days.is_none() {
        return Ok(None);
    }

    let days = config.predicate.max_age_days;
    let max_age = chrono::Duration::try_days(days)
        .ok_or_else(|| Error::invalid_value("max_age_days", format!("{days} is out of range")))?;
    let clock: Arc<dyn Clock> = match args.now {
        Some(date) => Arc::new(FixedClock::at_date(date)),
        None => Arc::new(SystemClock),
    };
    Ok(Some(
        OlderThan::with_clock(clock, max_age).date_field(&config.predicate.date_field),
    ))
}

pub(super) fn render(items: &[JsonValue], pretty: bool) -> Result<String> {
    let out = if pretty {
        serde_json::to_string_pretty(items)?
    } else {
        serde_json::to_string(items)?
    };
    Ok(out)
}
