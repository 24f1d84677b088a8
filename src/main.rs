use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;

use axon_rs::axon::capability::{CapabilityRegistry, ConsoleChannel, HttpCapability};
use axon_rs::axon::server::{self, AppState};
use axon_rs::axon::store::{ExecutionStore, InMemoryStore};
use axon_rs::axon::workflow::clock::SystemClock;
use axon_rs::axon::workflow::context::ExecutionContext;
use axon_rs::axon::workflow::engine::Engine;
use axon_rs::axon::workflow::loader::WorkflowLoader;
use axon_rs::axon::workflow::scheduler::QueueScheduler;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a workflow from a file to completion
    Run {
        /// Path to the workflow file (YAML or JSON)
        #[arg(short, long)]
        file: String,

        /// Initial context as a JSON object
        #[arg(short, long, default_value = "{}")]
        context: String,

        /// Seconds between queue scans while the run is waiting
        #[arg(long, default_value_t = 1)]
        poll_secs: u64,
    },
    /// Serve the HTTP API
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value_t = 8080)]
        port: u16,

        /// Seconds between background queue scans (0 disables; the
        /// /api/queue/process route still works)
        #[arg(long, default_value_t = 10)]
        scheduler_secs: u64,
    },
}

struct Runtime {
    store: Arc<InMemoryStore>,
    engine: Arc<Engine>,
    scheduler: Arc<QueueScheduler>,
}

async fn build_runtime() -> Runtime {
    let store = Arc::new(InMemoryStore::new());
    let clock = Arc::new(SystemClock);

    let capabilities = CapabilityRegistry::new();
    capabilities.register(Arc::new(ConsoleChannel::new())).await;
    capabilities.register(Arc::new(HttpCapability::new())).await;

    let engine = Arc::new(Engine::new(store.clone(), capabilities, clock.clone()));
    let scheduler = Arc::new(QueueScheduler::new(store.clone(), engine.clone(), clock));
    Runtime {
        store,
        engine,
        scheduler,
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Run {
            file,
            context,
            poll_secs,
        } => {
            let runtime = build_runtime().await;

            let definition = WorkflowLoader::new()
                .load_workflow(&file)
                .with_context(|| format!("loading workflow from {}", file))?;
            let workflow_id = definition.id.clone();
            runtime.store.put_definition(definition).await?;

            let initial: std::collections::HashMap<String, serde_json::Value> =
                serde_json::from_str(&context).context("parsing --context JSON")?;

            println!("Running workflow: {}", workflow_id);
            let (execution_id, _) = runtime
                .engine
                .start(&workflow_id, ExecutionContext::from_map(initial))
                .await?;

            // Drive the queue until the execution settles
            loop {
                let execution = runtime.store.load_execution(&execution_id).await?;
                if execution.status.is_terminal() {
                    println!("Execution {}: {:?}", execution_id, execution.status);
                    if let Some(error) = execution.error {
                        println!("Error: {}", error);
                    }
                    break;
                }
                runtime.scheduler.process_due().await?;
                tokio::time::sleep(Duration::from_secs(poll_secs.max(1))).await;
            }
        }
        Commands::Serve {
            port,
            scheduler_secs,
        } => {
            let runtime = build_runtime().await;

            if scheduler_secs > 0 {
                let scheduler = runtime.scheduler.clone();
                tokio::spawn(async move {
                    scheduler.run_loop(Duration::from_secs(scheduler_secs)).await;
                });
            }

            let state = Arc::new(AppState {
                store: runtime.store.clone(),
                engine: runtime.engine,
                scheduler: runtime.scheduler,
            });
            server::serve(port, state)
                .await
                .map_err(|e| anyhow::anyhow!(e))?;
        }
    }

    Ok(())
}
