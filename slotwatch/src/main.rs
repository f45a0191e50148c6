use anyhow::Context;
use clap::Parser;
use slotwatch::{solver::TerminalSolver, Config};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Config::parse();
    let solver = TerminalSolver::new(config.captcha_viewer.clone());

    let report = slotwatch::run(&config, &solver)
        .await
        .with_context(|| format!("checking slots for course {}", config.course))?;

    print!("{report}");

    Ok(())
}
