//! `rootprep extract` command.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use clap::Args;
use rootprep_core::ProvisionConfig;
use rootprep_runtime::{FsLayerStore, ImageManager};

#[derive(Args)]
pub struct ExtractArgs {
    /// OCI image directory
    #[arg(long)]
    pub image: Option<PathBuf>,

    /// Layer store directory
    #[arg(long)]
    pub store: Option<PathBuf>,
}

pub async fn execute(
    args: ExtractArgs,
    config: ProvisionConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let image_dir = super::image_dir(args.image, &config)?;
    let store_dir = super::store_dir(args.store, &config)?;
    let quiet = config.quiet;

    // Ctrl-C stops the run between layers; the next run resumes.
    let cancel = Arc::new(AtomicBool::new(false));
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current layer");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let top = tokio::task::spawn_blocking(move || {
        let store = FsLayerStore::new(&store_dir)?;
        let manager = if quiet {
            ImageManager::new(image_dir, store, std::io::sink())
        } else {
            ImageManager::new(image_dir, store, std::io::stderr())
        };
        manager.with_cancel_flag(cancel).extract()
    })
    .await??;

    println!("{top}");
    Ok(())
}
