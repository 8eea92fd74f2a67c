use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use fanout::app::{handle_fatal_error, initialize_app, AppConfig};
use fanout::executor::{Executor, MapOptions};
use fanout::invoker::LocalInvoker;
use fanout::serialize::RemoteFunction;
use fanout::storage::StorageFactory;
use fanout::worker::FunctionRegistry;

/// Fan a function out over many inputs
#[derive(Parser)]
#[command(name = "fanout")]
#[command(about = "Map and reduce registered functions over independent remote calls", long_about = None)]
struct Cli {
    /// Enable verbose output (-v for debug, -vv for trace, -vvv for all)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Map a function over the inputs and print the results in order
    Run {
        /// Registered function applied to every input
        #[arg(short, long)]
        function: String,

        /// Registered function applied to the list of results
        #[arg(short, long)]
        reduce: Option<String>,

        /// Maximum concurrent invocations
        #[arg(long)]
        pool_threads: Option<usize>,

        /// Upload every input separately instead of one aggregated blob
        #[arg(long)]
        no_aggregate: bool,

        /// Inputs; each is parsed as JSON, falling back to a plain string
        #[arg(required = true)]
        items: Vec<String>,
    },
    /// List the functions the local worker can run
    Functions,
}

fn parse_item(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

async fn run(cli: Cli) -> Result<()> {
    let app_config = AppConfig::new(cli.verbose).with_config_path(cli.config);
    let config = initialize_app(&app_config).await?;
    let registry = FunctionRegistry::with_builtins();

    match cli.command {
        Commands::Functions => {
            for name in registry.names() {
                println!("{name}");
            }
            Ok(())
        }
        Commands::Run {
            function,
            reduce,
            pool_threads,
            no_aggregate,
            items,
        } => {
            for name in std::iter::once(&function).chain(reduce.as_ref()) {
                if !registry.contains(name) {
                    bail!(
                        "unknown function {}; available: {}",
                        name,
                        registry.names().join(", ")
                    );
                }
            }

            let store = StorageFactory::from_config(&config.storage).await?;
            let invoker = Arc::new(LocalInvoker::new(store.clone(), registry));
            let executor = Executor::from_config(&config, invoker, store)
                .load_runtime_info()
                .await?;

            let mut opts = MapOptions::from_config(&config.invoke);
            if let Some(threads) = pool_threads {
                opts = opts.with_pool_threads(threads);
            }
            if no_aggregate {
                opts = opts.with_data_all_as_one(false);
            }

            let inputs: Vec<Value> = items.iter().map(|raw| parse_item(raw)).collect();
            debug!("Parsed inputs: {:?}", inputs);

            let func = RemoteFunction::registered(&function);
            let mut futures = executor.map(&func, &inputs, &opts).await?;

            match reduce {
                Some(name) => {
                    let mut reduced = executor
                        .reduce(&RemoteFunction::registered(name), &mut futures, &opts)
                        .await?;
                    let value: Value = reduced.result().await?;
                    println!("{value}");
                }
                None => {
                    for future in futures.iter_mut() {
                        let value: Value = future.result().await?;
                        println!("{value}");
                    }
                }
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    if let Err(e) = run(cli).await {
        handle_fatal_error(e, verbose);
    }
}
