use clap::Subcommand;

use crate::options::RelayOptions;

mod batch;
mod keys;
mod pssh;

#[derive(Subcommand, Debug, Clone)]
pub enum KagiCommand {
    Keys(keys::KeysCommand),
    Pssh(pssh::PsshCommand),
    Batch(batch::BatchCommand),
}

impl KagiCommand {
    pub async fn run(self, options: &RelayOptions) -> anyhow::Result<()> {
        match self {
            KagiCommand::Keys(command) => command.run(options).await,
            KagiCommand::Pssh(command) => command.run(options).await,
            KagiCommand::Batch(command) => command.run(options).await,
        }
    }
}
