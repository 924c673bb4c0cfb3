use clap::Parser;
use kagi::widevine::PsshBox;

use crate::options::RelayOptions;

/// Print the Widevine PSSH of a manifest
#[derive(Parser, Debug, Clone)]
#[clap(name = "pssh", short_flag = 'P')]
pub struct PsshCommand {
    /// URL of the DASH manifest
    pub manifest_url: String,
}

impl PsshCommand {
    pub async fn run(self, options: &RelayOptions) -> anyhow::Result<()> {
        let client = options.client()?;
        let manifest = client.fetch_text(&self.manifest_url).await?;
        let resolved = options.resolver().resolve(&self.manifest_url, &manifest).await?;

        match PsshBox::from_base64(&resolved.pssh) {
            Ok(pssh) => log::info!(
                "{} PSSH v{} from {}, {} bytes of data",
                pssh.system_name(),
                pssh.version,
                resolved.source,
                pssh.data.len()
            ),
            Err(e) => log::warn!("PSSH from {} does not parse: {e}", resolved.source),
        }
        println!("{}", resolved.pssh);

        Ok(())
    }
}
