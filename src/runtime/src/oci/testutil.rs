//! Fixtures for building OCI image directories in tests.

use serde_json::{json, Value};
use sha2::{Digest as _, Sha256};
use std::fs;
use std::path::Path;

pub(crate) const LAYER_A: &str = "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub(crate) const LAYER_B: &str = "bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";
pub(crate) const LAYER_C: &str = "cccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccccc";

const DIFF_ID_CHARS: [char; 3] = ['d', 'e', 'f'];

/// Write the `oci-layout` marker and the blobs directory.
pub(crate) fn write_layout(dir: &Path) {
    fs::create_dir_all(dir.join("blobs/sha256")).unwrap();
    fs::write(
        dir.join("oci-layout"),
        r#"{"imageLayoutVersion":"1.0.0"}"#,
    )
    .unwrap();
}

/// Store `data` as a blob and return a descriptor for it.
pub(crate) fn write_blob(dir: &Path, data: &[u8]) -> Value {
    let hex = hex::encode(Sha256::digest(data));
    fs::create_dir_all(dir.join("blobs/sha256")).unwrap();
    fs::write(dir.join("blobs/sha256").join(&hex), data).unwrap();
    json!({
        "mediaType": "application/octet-stream",
        "digest": format!("sha256:{hex}"),
        "size": data.len()
    })
}

/// Layer descriptor with the given digest and media type.
pub(crate) fn layer_descriptor(digest: &str, media_type: &str) -> Value {
    json!({
        "mediaType": media_type,
        "digest": digest,
        "size": 1024
    })
}

/// Write config, manifest and index for the given layer descriptors.
///
/// The config carries one diff ID per layer.
pub(crate) fn write_image_with_layers(dir: &Path, layers: Vec<Value>) {
    write_layout(dir);

    let diff_ids: Vec<String> = (0..layers.len())
        .map(|i| {
            let c = DIFF_ID_CHARS[i % DIFF_ID_CHARS.len()];
            format!("sha256:{}", c.to_string().repeat(64))
        })
        .collect();

    let mut config = write_blob(
        dir,
        json!({
            "architecture": "amd64",
            "os": "windows",
            "rootfs": {"type": "layers", "diff_ids": diff_ids}
        })
        .to_string()
        .as_bytes(),
    );
    config["mediaType"] = json!("application/vnd.oci.image.config.v1+json");

    let mut manifest = write_blob(
        dir,
        json!({
            "schemaVersion": 2,
            "config": config,
            "layers": layers
        })
        .to_string()
        .as_bytes(),
    );
    manifest["mediaType"] = json!("application/vnd.oci.image.manifest.v1+json");
    manifest["platform"] = json!({"os": "windows", "architecture": "amd64"});

    fs::write(
        dir.join("index.json"),
        json!({"schemaVersion": 2, "manifests": [manifest]}).to_string(),
    )
    .unwrap();
}

/// Write an image whose layers have the given hex digests.
///
/// Media types alternate between the `.tar.gzip` and `.tar+gzip` spellings.
pub(crate) fn write_image(dir: &Path, layer_hexes: &[&str]) {
    let layers = layer_hexes
        .iter()
        .enumerate()
        .map(|(i, hex)| {
            let media_type = if i % 2 == 0 {
                "some.type.tar.gzip"
            } else {
                "some.other.type.tar+gzip"
            };
            layer_descriptor(&format!("sha256:{hex}"), media_type)
        })
        .collect();
    write_image_with_layers(dir, layers);
}
