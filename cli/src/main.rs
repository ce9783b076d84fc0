//! Entry-point for the `studio` binary.
use clap::Parser;
use studio_cli::Cli;
use studio_cli::run_main;

fn main() -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new()?;
    runtime.block_on(async {
        let cli = Cli::parse();
        run_main(cli).await
    })
}
