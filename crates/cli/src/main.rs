mod cli;
mod state;

use clap::{Parser, Subcommand};
use cli::{args::Args, op::Op, Attach, Chat, Entropy, Garage, Init, Order, Robot, Version};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

command_enum! {
    (Attach, Attach),
    (Chat, Chat),
    (Entropy, Entropy),
    (Garage, Garage),
    (Init, Init),
    (Order, Order),
    (Robot, Robot),
    (Version, Version),
}

/// Logs go to stderr so command output stays pipeable
fn init_logging(log_level: tracing::Level) {
    let env_filter = EnvFilter::builder()
        .with_default_directive(log_level.into())
        .from_env_lossy();

    let stderr_layer = tracing_subscriber::fmt::layer()
        .compact()
        .with_writer(std::io::stderr)
        .with_filter(env_filter);

    tracing_subscriber::registry().with(stderr_layer).init();
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let log_level = state::AppState::load(args.config_path.clone())
        .ok()
        .and_then(|state| state.config.log_level().ok())
        .unwrap_or(tracing::Level::WARN);
    init_logging(log_level);

    let remote = match cli::op::resolve_remote(args.remote, args.config_path.clone()) {
        Ok(remote) => remote,
        Err(e) => {
            eprintln!("Error: invalid coordinator URL: {}", e);
            std::process::exit(1);
        }
    };

    let ctx = match cli::op::OpContext::new(remote, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create API client: {}", e);
            std::process::exit(1);
        }
    };

    match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            std::process::exit(0);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
