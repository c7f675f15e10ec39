use crate::{
    commands::{Commands, QueryArgs},
    error::CliError,
    shutdown::{ExitCode, ShutdownCoordinator},
};
use clap::Parser;
use connectors::file::csv::source::CsvQueryService;
use engine_config::settings::WalkerSettings;
use engine_core::{entity::Paginate, walker::PagedQueryWalker};
use futures_util::StreamExt;
use model::{
    pagination::page_size::PageSize,
    query::{QuerySpec, SortKey},
};
use std::io::{BufWriter, Write};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod output;
mod shutdown;

#[derive(Parser)]
#[command(
    name = "pagewalk",
    version = "0.1.0",
    about = "Count or stream query results page by page"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let shutdown = ShutdownCoordinator::new(CancellationToken::new());
    shutdown.register_handlers();

    let code = match run(cli.command, shutdown.cancel_token()).await {
        Ok(()) => ExitCode::Success,
        Err(CliError::ShutdownRequested) => {
            info!("Walk cancelled before completion");
            ExitCode::ShutdownRequested
        }
        Err(err) => {
            error!("{err}");
            ExitCode::GeneralError
        }
    };

    std::process::exit(code.as_i32());
}

async fn run(command: Commands, cancel: CancellationToken) -> Result<(), CliError> {
    match command {
        Commands::Count { query } => {
            let (service, query_spec, page_size) = prepare(&query, &[]).await?;
            let walker = service.walker().with_page_size(page_size);

            let total = tokio::select! {
                total = walker.count(&query_spec) => total?,
                _ = cancel.cancelled() => return Err(CliError::ShutdownRequested),
            };
            println!("{total}");
        }
        Commands::Each {
            query,
            order_by,
            limit,
        } => {
            let (service, query_spec, page_size) = prepare(&query, &order_by).await?;
            let walker = service.walker().with_page_size(page_size);
            let mut out = BufWriter::new(std::io::stdout());
            print_records(&walker, &query_spec, limit, &cancel, &mut out).await?;
        }
    }
    Ok(())
}

/// Opens the source and builds the query and page size from the command line and settings.
async fn prepare(
    args: &QueryArgs,
    order_by: &[String],
) -> Result<(CsvQueryService, QuerySpec, PageSize), CliError> {
    let mut settings = match &args.config {
        Some(path) => WalkerSettings::load(path).await?,
        None => WalkerSettings::default(),
    };

    let mut service = CsvQueryService::new(&args.file, settings.csv.clone())?;
    if let Some(entity) = &args.entity {
        service = service.with_entity(entity);
    }

    let mut query_spec = service.query();
    for filter in &args.filters {
        query_spec.filters.push(filter.parse()?);
    }
    for key in order_by {
        query_spec.order_by.push(key.parse::<SortKey>()?);
    }

    if let Some(size) = args.page_size {
        settings.set_page_size(service.entity(), PageSize::new(size)?);
    }
    let page_size = settings.page_size_for(service.entity());

    info!(
        file = %args.file,
        entity = %service.entity(),
        filters = query_spec.filters.len(),
        %page_size,
        "Prepared walk"
    );

    Ok((service, query_spec, page_size))
}

/// Writes each record as a JSON line until the walk ends, `limit` is reached or `cancel`
/// fires. Returns how many records were written.
async fn print_records(
    walker: &PagedQueryWalker<'_, CsvQueryService>,
    query_spec: &QuerySpec,
    limit: Option<usize>,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> Result<usize, CliError> {
    let mut records = walker.each(query_spec);
    let mut printed = 0usize;

    while limit.is_none_or(|limit| printed < limit) {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                out.flush()?;
                return Err(CliError::ShutdownRequested);
            }
            next = records.next() => next,
        };
        let Some(row) = next else {
            break;
        };

        output::write_record(&mut *out, &row?)?;
        printed += 1;
    }

    out.flush()?;
    info!(printed, "Finished printing records");
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::metrics::WalkMetrics;
    use tempfile::{TempDir, tempdir};

    fn write_users(dir: &TempDir, rows: usize) -> String {
        let mut content = String::from("id,name,country_code\n");
        for id in 1..=rows {
            let country = if id % 2 == 0 { "UK" } else { "US" };
            content.push_str(&format!("{id},user-{id},{country}\n"));
        }
        let path = dir.path().join("users.csv");
        std::fs::write(&path, content).unwrap();
        path.display().to_string()
    }

    fn args(file: &str) -> QueryArgs {
        QueryArgs {
            file: file.to_string(),
            entity: None,
            filters: Vec::new(),
            page_size: None,
            config: None,
        }
    }

    #[tokio::test]
    async fn test_page_size_resolution() {
        let dir = tempdir().unwrap();
        let file = write_users(&dir, 12);
        let config = dir.path().join("walker.json");
        std::fs::write(&config, r#"{ "entities": { "users": { "page_size": 4 } } }"#).unwrap();

        let (_, _, page_size) = prepare(&args(&file), &[]).await.unwrap();
        assert_eq!(page_size, PageSize::DEFAULT);

        let mut configured = args(&file);
        configured.config = Some(config.display().to_string());
        let (_, _, page_size) = prepare(&configured, &[]).await.unwrap();
        assert_eq!(page_size.get(), 4);

        configured.page_size = Some(7);
        let (_, _, page_size) = prepare(&configured, &[]).await.unwrap();
        assert_eq!(page_size.get(), 7);

        configured.page_size = Some(0);
        assert!(matches!(
            prepare(&configured, &[]).await,
            Err(CliError::PageSize(_))
        ));
    }

    #[tokio::test]
    async fn test_query_from_arguments() {
        let dir = tempdir().unwrap();
        let file = write_users(&dir, 4);

        let mut query = args(&file);
        query.entity = Some("people".to_string());
        query.filters = vec!["country_code=UK".to_string()];
        let (service, query_spec, _) = prepare(&query, &["id:desc".to_string()])
            .await
            .unwrap();
        assert_eq!(service.entity(), "people");
        assert_eq!(query_spec.entity, "people");
        assert_eq!(query_spec.filters.len(), 1);
        assert!(query_spec.is_ordered());

        query.filters = vec!["nonsense".to_string()];
        assert!(matches!(
            prepare(&query, &[]).await,
            Err(CliError::Query(_))
        ));
    }

    #[tokio::test]
    async fn test_limit_stops_before_the_next_page() {
        let dir = tempdir().unwrap();
        let file = write_users(&dir, 12);
        let (service, query_spec, _) = prepare(&args(&file), &[]).await.unwrap();
        let metrics = WalkMetrics::new();
        let walker = service
            .walker()
            .with_page_size(PageSize::of(5))
            .with_metrics(metrics.clone());

        let mut out = Vec::new();
        let printed = print_records(
            &walker,
            &query_spec,
            Some(3),
            &CancellationToken::new(),
            &mut out,
        )
        .await
        .unwrap();

        let text = String::from_utf8(out).unwrap();
        assert_eq!(printed, 3);
        assert_eq!(text.lines().count(), 3);
        assert!(text.starts_with(r#"{"id":1,"name":"user-1","country_code":"US"}"#));
        assert_eq!(metrics.snapshot().pages_fetched, 1);
    }

    #[tokio::test]
    async fn test_zero_limit_fetches_nothing() {
        let dir = tempdir().unwrap();
        let file = write_users(&dir, 12);
        let (service, query_spec, _) = prepare(&args(&file), &[]).await.unwrap();
        let metrics = WalkMetrics::new();
        let walker = service.walker().with_metrics(metrics.clone());

        let mut out = Vec::new();
        let printed = print_records(
            &walker,
            &query_spec,
            Some(0),
            &CancellationToken::new(),
            &mut out,
        )
        .await
        .unwrap();

        assert_eq!(printed, 0);
        assert!(out.is_empty());
        assert_eq!(metrics.snapshot().pages_fetched, 0);
    }

    #[tokio::test]
    async fn test_unlimited_prints_every_record() {
        let dir = tempdir().unwrap();
        let file = write_users(&dir, 12);
        let (service, query_spec, _) = prepare(&args(&file), &[]).await.unwrap();
        let metrics = WalkMetrics::new();
        let walker = service
            .walker()
            .with_page_size(PageSize::of(5))
            .with_metrics(metrics.clone());

        let mut out = Vec::new();
        let cancel = CancellationToken::new();
        let printed = print_records(&walker, &query_spec, None, &cancel, &mut out)
            .await
            .unwrap();

        assert_eq!(printed, 12);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 12);
        assert_eq!(metrics.snapshot().pages_fetched, 3);
    }

    #[tokio::test]
    async fn test_cancelled_walk_stops_without_fetching() {
        let dir = tempdir().unwrap();
        let file = write_users(&dir, 12);
        let (service, query_spec, _) = prepare(&args(&file), &[]).await.unwrap();
        let metrics = WalkMetrics::new();
        let walker = service.walker().with_metrics(metrics.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();
        let mut out = Vec::new();
        let result = print_records(&walker, &query_spec, None, &cancel, &mut out).await;

        assert!(matches!(result, Err(CliError::ShutdownRequested)));
        assert_eq!(metrics.snapshot().pages_fetched, 0);
    }
}
