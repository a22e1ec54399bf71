//! `rootprep status` command.

use std::path::PathBuf;

use clap::Args;
use rootprep_core::ProvisionConfig;
use rootprep_runtime::{FsLayerStore, ImageManager};

use crate::output;

#[derive(Args)]
pub struct StatusArgs {
    /// OCI image directory
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Layer store directory
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Show full layer identifiers
    #[arg(long)]
    pub no_trunc: bool,
}

pub async fn execute(
    args: StatusArgs,
    config: ProvisionConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let image_dir = super::image_dir(args.image, &config)?;
    let store_dir = super::store_dir(args.store, &config)?;

    let store = FsLayerStore::new(&store_dir)?;
    let mut manager = ImageManager::new(image_dir, store, std::io::sink());
    let states = manager.layer_states()?;

    let mut table = output::new_table(&["INDEX", "LAYER", "STATE", "SIZE"]);
    for status in &states {
        let id = if args.no_trunc {
            status.layer_id.as_str()
        } else {
            output::short_id(&status.layer_id)
        };
        let size = manager
            .store()
            .meta(&status.layer_id)?
            .map(|meta| output::format_bytes(meta.size_bytes))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(vec![
            status.index.to_string(),
            id.to_string(),
            status.state.to_string(),
            size,
        ]);
    }

    println!("{table}");
    Ok(())
}
