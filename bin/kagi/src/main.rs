use clap::Parser;

mod commands;
mod options;

#[derive(Parser, Debug, Clone)]
#[clap(name = "kagi", version, about)]
struct KagiArgs {
    /// Debug output
    #[clap(long, alias = "debug", global = true)]
    verbose: bool,

    #[clap(flatten)]
    relay: options::RelayOptions,

    #[clap(subcommand)]
    command: commands::KagiCommand,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = KagiArgs::parse();

    pretty_env_logger::formatted_builder()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .parse_env("RUST_LOG")
        .init();

    args.command.run(&args.relay).await
}
