use anyhow::Context;
use graphflow::{
    api::build_app,
    cli::{output::Output, Cli, Commands},
    ingest::Ingestor,
    load_graph, AppState, GraphflowConfig,
};
use std::path::Path;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse_args();
    let output = if cli.no_color {
        Output::no_color()
    } else {
        Output::new()
    };

    let config = match GraphflowConfig::load_or_default(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            output.error(&format!("Failed to load {}: {}", cli.config.display(), e));
            std::process::exit(1);
        }
    };

    init_tracing(&cli, &config);

    match cli.subcommand() {
        Commands::Serve => serve(config, &output).await,
        Commands::Check => check(&config, &output),
        Commands::Ask { query, trace } => ask(config, query, *trace, &output).await,
        Commands::Ingest { dir } => ingest(&config, dir.as_deref(), &output).await,
    }
}

/// `RUST_LOG` wins over `server.log_level`; `--verbose` forces debug.
fn init_tracing(cli: &Cli, config: &GraphflowConfig) {
    let default_level = if cli.verbose {
        "debug"
    } else {
        config.server.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("graphflow={default_level},graphflow_server={default_level},tower_http=info").into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    if cli.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_ansi(!cli.no_color))
            .init();
    }
}

async fn serve(config: GraphflowConfig, output: &Output) -> anyhow::Result<()> {
    output.banner();

    let addr = config.bind_address();
    let state = AppState::from_config(config)
        .await
        .context("Failed to initialize graphflow")?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    output.success(&format!("Listening on http://{}", addr));
    info!(address = %addr, "graphflow server started");

    axum::serve(listener, build_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("graphflow server stopped");
    Ok(())
}

fn check(config: &GraphflowConfig, output: &Output) -> anyhow::Result<()> {
    match load_graph(config) {
        Ok(graph) => {
            output.success(&format!(
                "Compiled {}",
                config.workflow.path.display()
            ));
            output.graph_summary(&graph.summary());
            output.newline();
            Ok(())
        }
        Err(e) => {
            output.error(&e.to_string());
            output.hint("Every workflow needs [flow] entry_node and final_node naming defined agents");
            std::process::exit(1);
        }
    }
}

async fn ask(
    config: GraphflowConfig,
    query: &str,
    trace: bool,
    output: &Output,
) -> anyhow::Result<()> {
    let state = AppState::from_config(config)
        .await
        .context("Failed to initialize graphflow")?;

    let result = state.engine.run(query, vec![]).await;
    if trace {
        output.header("Steps");
        for step in &result.steps {
            output.step(step);
        }
    }
    output.answer(&result);
    Ok(())
}

async fn ingest(config: &GraphflowConfig, dir: Option<&Path>, output: &Output) -> anyhow::Result<()> {
    let dir = dir.unwrap_or(config.ingest.data_dir.as_path());
    let ingestor = Ingestor::from_config(config).context("Failed to set up ingestion")?;

    output.info(&format!(
        "Ingesting {} into '{}' at {}",
        dir.display(),
        config.vector_store.collection,
        config.vector_store.base_url()
    ));
    let report = ingestor
        .ingest_directory(dir)
        .await
        .with_context(|| format!("Failed to ingest {}", dir.display()))?;

    output.ingest_report(&report);
    output.newline();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
