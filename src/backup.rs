use anyhow::{anyhow, Context};
use serde_json::json;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

const MANIFEST_ENTRY: &str = "manifest.json";
const DATA_ENTRY: &str = "data/students.data";
pub const BUNDLE_FORMAT_V1: &str = "uniapp-store-v1";
pub const LEGACY_JSON_FORMAT: &str = "legacy-json";

#[derive(Debug, Clone)]
pub struct ExportSummary {
    pub bundle_format: String,
    pub student_count: usize,
    pub sha256: String,
}

#[derive(Debug, Clone)]
pub struct ImportSummary {
    pub bundle_format_detected: String,
    pub student_count: usize,
}

fn sha256_hex(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

fn count_students(bytes: &[u8]) -> anyhow::Result<usize> {
    let doc: serde_json::Value =
        serde_json::from_slice(bytes).context("student data is not valid JSON")?;
    doc.as_array()
        .map(|a| a.len())
        .ok_or_else(|| anyhow!("student data is not a JSON array"))
}

pub fn export_store_bundle(data_file: &Path, out_path: &Path) -> anyhow::Result<ExportSummary> {
    if !data_file.is_file() {
        return Err(anyhow!(
            "student data file not found: {}",
            data_file.to_string_lossy()
        ));
    }
    let data = std::fs::read(data_file)
        .with_context(|| format!("failed to read {}", data_file.to_string_lossy()))?;
    let student_count = count_students(&data)?;
    let digest = sha256_hex(&data);

    if let Some(parent) = out_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }
    let out_file = File::create(out_path).with_context(|| {
        format!(
            "failed to create output file {}",
            out_path.to_string_lossy()
        )
    })?;
    let mut zip = ZipWriter::new(out_file);
    let opts = FileOptions::default().compression_method(CompressionMethod::Deflated);

    let manifest = json!({
        "format": BUNDLE_FORMAT_V1,
        "version": 1,
        "appVersion": env!("CARGO_PKG_VERSION"),
        "exportedAt": chrono::Utc::now().to_rfc3339(),
        "sha256": digest,
        "studentCount": student_count,
    });
    zip.start_file(MANIFEST_ENTRY, opts)
        .context("failed to start manifest entry")?;
    zip.write_all(
        serde_json::to_string_pretty(&manifest)
            .context("failed to serialize manifest")?
            .as_bytes(),
    )
    .context("failed to write manifest entry")?;

    zip.start_file(DATA_ENTRY, opts)
        .context("failed to start data entry")?;
    zip.write_all(&data).context("failed to write data entry")?;
    zip.finish().context("failed to finalize zip bundle")?;

    Ok(ExportSummary {
        bundle_format: BUNDLE_FORMAT_V1.to_string(),
        student_count,
        sha256: digest,
    })
}

/// Restore `data_file` from a bundle or a bare JSON copy.
///
/// `validate` sees the extracted bytes before anything is written and returns
/// the student count; an error leaves `data_file` untouched.
pub fn import_store_bundle<F>(
    in_path: &Path,
    data_file: &Path,
    validate: F,
) -> anyhow::Result<ImportSummary>
where
    F: FnOnce(&[u8]) -> anyhow::Result<usize>,
{
    if let Some(parent) = data_file.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.to_string_lossy()))?;
    }

    if !is_zip_file(in_path)? {
        // A bare students.data copy from before bundles existed.
        let data = std::fs::read(in_path)
            .with_context(|| format!("failed to read {}", in_path.to_string_lossy()))?;
        let student_count = validate(&data).context("rejected student data")?;
        replace_file(data_file, &data)?;
        return Ok(ImportSummary {
            bundle_format_detected: LEGACY_JSON_FORMAT.to_string(),
            student_count,
        });
    }

    let in_file = File::open(in_path)
        .with_context(|| format!("failed to open bundle {}", in_path.to_string_lossy()))?;
    let mut archive = ZipArchive::new(in_file).context("invalid zip archive")?;

    let mut manifest_text = String::new();
    archive
        .by_name(MANIFEST_ENTRY)
        .context("bundle missing manifest.json")?
        .read_to_string(&mut manifest_text)
        .context("failed to read manifest.json")?;
    let manifest: serde_json::Value =
        serde_json::from_str(&manifest_text).context("manifest.json is invalid JSON")?;
    let format = manifest
        .get("format")
        .and_then(|v| v.as_str())
        .unwrap_or("");
    if format != BUNDLE_FORMAT_V1 {
        return Err(anyhow!("unsupported bundle format: {}", format));
    }

    let mut data = Vec::new();
    archive
        .by_name(DATA_ENTRY)
        .context("bundle missing data/students.data")?
        .read_to_end(&mut data)
        .context("failed to extract data entry")?;

    let expected = manifest
        .get("sha256")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow!("manifest.json missing sha256"))?;
    let actual = sha256_hex(&data);
    if actual != expected {
        return Err(anyhow!(
            "checksum mismatch: manifest {} but data hashes to {}",
            expected,
            actual
        ));
    }
    let student_count = validate(&data).context("rejected student data")?;
    replace_file(data_file, &data)?;

    Ok(ImportSummary {
        bundle_format_detected: BUNDLE_FORMAT_V1.to_string(),
        student_count,
    })
}

fn replace_file(dst: &Path, bytes: &[u8]) -> anyhow::Result<()> {
    let mut tmp_name = dst.as_os_str().to_owned();
    tmp_name.push(".importing");
    let tmp = PathBuf::from(tmp_name);
    if tmp.exists() {
        let _ = std::fs::remove_file(&tmp);
    }
    let mut out = File::create(&tmp)
        .with_context(|| format!("failed to create temp file {}", tmp.to_string_lossy()))?;
    out.write_all(bytes)
        .context("failed to write imported data")?;
    out.flush().context("failed to flush imported data")?;
    drop(out);
    std::fs::rename(&tmp, dst).with_context(|| {
        format!(
            "failed to move imported data to {}",
            dst.to_string_lossy()
        )
    })?;
    Ok(())
}

fn is_zip_file(path: &Path) -> anyhow::Result<bool> {
    let mut f = File::open(path)
        .with_context(|| format!("failed to open input file {}", path.to_string_lossy()))?;
    let mut sig = [0u8; 4];
    let read = f.read(&mut sig).context("failed to read file signature")?;
    if read < 4 {
        return Ok(false);
    }
    Ok(sig == [0x50, 0x4B, 0x03, 0x04])
}
