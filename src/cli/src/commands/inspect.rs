//! `rootprep inspect` command - display image platform and layers as JSON.

use std::path::PathBuf;

use clap::Args;
use rootprep_core::{ProvisionConfig, ProvisionError};
use rootprep_runtime::oci::validate_layer_descriptor;
use rootprep_runtime::ImageMetadata;

#[derive(Args)]
pub struct InspectArgs {
    /// OCI image directory
    #[arg(long)]
    pub image: Option<PathBuf>,
}

pub async fn execute(
    args: InspectArgs,
    config: ProvisionConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let image_dir = super::image_dir(args.image, &config)?;
    let metadata = ImageMetadata::load(&image_dir)?;
    let diff_ids = metadata.diff_ids();

    let layers = metadata
        .layers()
        .iter()
        .enumerate()
        .map(|(index, descriptor)| {
            let digest = validate_layer_descriptor(descriptor)?;
            Ok(serde_json::json!({
                "Id": digest.layer_id(),
                "Digest": digest.to_string(),
                "MediaType": descriptor.media_type().to_string(),
                "Size": descriptor.size(),
                "DiffId": diff_ids.get(index),
            }))
        })
        .collect::<Result<Vec<_>, ProvisionError>>()?;

    let platform = metadata.platform();
    let output = serde_json::json!({
        "ImageDir": metadata.image_dir().display().to_string(),
        "Os": platform.os,
        "Architecture": platform.architecture,
        "LayerCount": layers.len(),
        "Layers": layers,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
