use std::path::Path;
use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use navigator_client::NavigatorClient;
use navigator_core::{ConnectionStatus, NavigatorConfig, Snapshot};

#[tokio::main]
async fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--json") {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .init();
    }

    let mut config = match args.iter().find_map(|a| a.strip_prefix("--config=")) {
        Some(path) => NavigatorConfig::load_from(Path::new(path)),
        None => NavigatorConfig::load(),
    };
    if let Some(endpoint) = args.iter().find_map(|a| a.strip_prefix("--endpoint=")) {
        config.transport.endpoint = endpoint.to_string();
    }
    if let Err(e) = config.validate() {
        tracing::error!(error = %e, "Invalid configuration");
        return ExitCode::FAILURE;
    }

    let client = NavigatorClient::from_config(&config);
    let mut subscription = client.subscribe();
    let mut previous = subscription.current.clone();

    let endpoint = config.transport.endpoint.clone();
    if let Err(e) = client.connect(&endpoint).await {
        tracing::error!(%endpoint, error = %e, "Could not connect");
        return ExitCode::FAILURE;
    }

    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = &mut shutdown => {
                tracing::info!("Shutting down");
                client.disconnect();
                return ExitCode::SUCCESS;
            }
            next = subscription.next() => {
                let Some(snapshot) = next else {
                    return ExitCode::SUCCESS;
                };
                log_changes(&previous, &snapshot);
                if let ConnectionStatus::Failed { reason, .. } = &snapshot.connection {
                    tracing::error!(%endpoint, %reason, "Status stream lost");
                    return ExitCode::FAILURE;
                }
                previous = snapshot;
            }
        }
    }
}

fn log_changes(previous: &Snapshot, current: &Snapshot) {
    for agent in &current.agents {
        if previous.agent(&agent.name) == Some(agent) {
            continue;
        }
        tracing::info!(
            agent = %agent.name,
            state = %agent.state,
            progress = agent.progress,
            findings = agent.findings.len(),
            "Agent updated"
        );
        if let Some(finding) = agent.findings.last() {
            tracing::debug!(agent = %agent.name, %finding, "Latest finding");
        }
    }

    let stats = current.stats();
    tracing::debug!(
        revision = current.revision,
        processing = stats.processing,
        done = stats.done,
        errored = stats.errored,
        "Dashboard snapshot"
    );
    if stats.all_settled() && !previous.stats().all_settled() {
        tracing::info!(findings = stats.findings, "All agents settled");
    }
}
