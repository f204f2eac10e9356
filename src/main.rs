use agropulse::datasource::parse_regional_csv;
use agropulse::orchestration::{CatalogSync, SignalRunner};
use agropulse::{api, config::Config, db::init_db, FpmaArchive, PriceArchive, Repository};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    let port = config.port;

    // Initialize database and dependencies
    let pool = match init_db(&config.database_path).await {
        Ok(p) => p,
        Err(e) => {
            eprintln!("Failed to initialize database: {}", e);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(Repository::new(pool));
    let archive: Arc<dyn PriceArchive> = Arc::new(FpmaArchive::new(config.fpma_api_url.clone()));
    let runner = Arc::new(SignalRunner::new(
        repo.clone(),
        archive.clone(),
        config.clone(),
    ));
    let catalog = Arc::new(CatalogSync::new(repo.clone(), archive));

    // One-shot modes delegate to the same library paths as the HTTP
    // triggers, differing only in how the summary is reported.
    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--once") => {
            if let Err(e) = run_once(&runner).await {
                eprintln!("Signal run failed: {}", e);
                std::process::exit(1);
            }
            return;
        }
        Some("--sync-catalog") => {
            if let Err(e) = sync_catalog_once(&catalog).await {
                eprintln!("Catalog sync failed: {}", e);
                std::process::exit(1);
            }
            return;
        }
        Some("--ingest-csv") => {
            let Some(path) = args.get(1) else {
                eprintln!("Usage: agropulse --ingest-csv <path>");
                std::process::exit(2);
            };
            if let Err(e) = ingest_csv(&repo, path).await {
                eprintln!("CSV ingest failed: {}", e);
                std::process::exit(1);
            }
            return;
        }
        Some(other) => {
            eprintln!("Unknown flag: {}", other);
            std::process::exit(2);
        }
        None => {}
    }

    // Create router
    let app = api::create_router(api::AppState::new(repo, config, runner, catalog));

    // Bind to address
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server listening on {}", addr);

    // Run server
    if let Err(e) = axum::serve(listener, app).await {
        eprintln!("Server error: {}", e);
        std::process::exit(1);
    }
}

async fn run_once(runner: &SignalRunner) -> anyhow::Result<()> {
    let summary = runner.run(chrono::Utc::now()).await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn sync_catalog_once(catalog: &CatalogSync) -> anyhow::Result<()> {
    let summary = catalog.sync().await?;
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn ingest_csv(repo: &Repository, path: &str) -> anyhow::Result<()> {
    let bytes = std::fs::read(path)?;
    let observations = parse_regional_csv(&bytes)?;
    let inserted = repo.insert_observations(&observations).await?;
    println!(
        "{}",
        serde_json::json!({ "parsed": observations.len(), "inserted": inserted })
    );
    Ok(())
}
