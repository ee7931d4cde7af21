//! cooldown: biofeedback lockout and paced-breathing session runtime.
//! Single-process binary composing the core state machines with an audio
//! backend in one tokio task.

use clap::Parser;

mod cli;
mod clock;
mod cmd_config;
mod cmd_cue;
mod cmd_run;
mod cmd_simulate;
mod context;
mod display;
mod session;

fn init_tracing() {
    let filter = std::env::var("COOLDOWN_LOG")
        .or_else(|_| std::env::var("RUST_LOG"))
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();
    init_tracing();

    let config = context::load_config(args.config.as_deref())?;

    match args.command {
        cli::Command::Run(opts) => {
            let backend = context::build_backend(&opts.audio).backend;
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;
            runtime.block_on(cmd_run::cmd_run(config, backend, &opts))?;
        }
        cli::Command::Simulate(opts) => {
            let selected = context::build_backend(&opts.audio);
            // Virtual time: timers fire as soon as every task is idle.
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .start_paused(true)
                .build()?;
            runtime.block_on(cmd_simulate::cmd_simulate(config, &selected, &opts))?;
        }
        cli::Command::Cue(opts) => cmd_cue::cmd_cue(&config, &opts)?,
        cli::Command::Config => cmd_config::cmd_config(&config)?,
    }

    Ok(())
}
