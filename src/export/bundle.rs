use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
pub const BUNDLE_FORMAT: &str = "reportd-export-v1";
const BUNDLE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManifestEntry {
    pub name: String,
    pub size: u64,
    pub sha256: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    pub format: String,
    pub version: u32,
    pub app_version: String,
    pub export_id: String,
    pub generated_at: String,
    pub entries: Vec<ManifestEntry>,
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// Writes `manifest.json` followed by every artifact into a zip at `out_path`.
pub fn write_bundle(out_path: &Path, artifacts: &[(String, Vec<u8>)]) -> anyhow::Result<BundleManifest> {
    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    let manifest = BundleManifest {
        format: BUNDLE_FORMAT.to_string(),
        version: BUNDLE_VERSION,
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        export_id: uuid::Uuid::new_v4().to_string(),
        generated_at: chrono::Utc::now().to_rfc3339(),
        entries: artifacts
            .iter()
            .map(|(name, bytes)| ManifestEntry {
                name: name.clone(),
                size: bytes.len() as u64,
                sha256: sha256_hex(bytes),
            })
            .collect(),
    };

    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    for (name, bytes) in artifacts {
        zip.start_file(name.as_str(), opts)
            .with_context(|| format!("failed to start entry {}", name))?;
        zip.write_all(bytes)
            .with_context(|| format!("failed to write entry {}", name))?;
    }

    zip.finish().context("failed to finalize zip bundle")?;
    Ok(manifest)
}

/// Reads the manifest back and checks every listed entry against its digest.
pub fn verify_bundle(in_path: &Path) -> anyhow::Result<BundleManifest> {
    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: BundleManifest =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid")?;
    if manifest.format != BUNDLE_FORMAT {
        return Err(anyhow!("unsupported bundle format: {}", manifest.format));
    }

    for entry in &manifest.entries {
        let mut bytes = Vec::new();
        archive
            .by_name(&entry.name)
            .with_context(|| format!("bundle missing {}", entry.name))?
            .read_to_end(&mut bytes)
            .with_context(|| format!("failed to read {}", entry.name))?;
        if bytes.len() as u64 != entry.size || sha256_hex(&bytes) != entry.sha256 {
            return Err(anyhow!("checksum mismatch for {}", entry.name));
        }
    }
    Ok(manifest)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(prefix: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("{}-{}", prefix, uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        dir
    }

    #[test]
    fn bundle_roundtrips_through_verification() {
        let dir = temp_dir("reportd-bundle");
        let path = dir.join("nested").join("report.zip");
        let artifacts = vec![
            ("report.xlsx".to_string(), b"sheet bytes".to_vec()),
            ("report.pdf".to_string(), b"%PDF-1.7".to_vec()),
        ];
        let written = write_bundle(&path, &artifacts).expect("write bundle");
        assert_eq!(written.entries.len(), 2);
        assert_eq!(written.entries[1].sha256, sha256_hex(b"%PDF-1.7"));

        let read = verify_bundle(&path).expect("verify");
        assert_eq!(read, written);
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn verification_rejects_foreign_archives() {
        let dir = temp_dir("reportd-bundle-foreign");
        let path = dir.join("other.zip");
        let mut zip = ZipWriter::new(File::create(&path).expect("create"));
        zip.start_file(MANIFEST_ENTRY, FileOptions::default()).expect("start");
        zip.write_all(br#"{"format":"something-else","version":1,"appVersion":"0","exportId":"x","generatedAt":"y","entries":[]}"#)
            .expect("write");
        zip.finish().expect("finish");

        let err = verify_bundle(&path).expect_err("must reject");
        assert!(err.to_string().contains("unsupported bundle format"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
