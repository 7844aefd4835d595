//! On-disk index artifacts.
//!
//! An index directory holds two files:
//!
//! - `index.bin`: a bincode record of the [`FlatIndex`], the embedding model
//!   name and a fingerprint (count + CRC32) of `identifiers.json`, followed
//!   by an 8-byte footer `[magic "ARX2"][CRC32 of the payload, big endian]`.
//! - `identifiers.json`: a JSON array of item identifiers; entry `i` names
//!   the vector stored at position `i` of the index.
//!
//! Both files are written to temp files before either is renamed into place.
//! The fingerprint ties the pair together, so a directory holding vectors
//! from one save and identifiers from another fails to load.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::index::FlatIndex;
use crate::item::ItemId;
use crate::{Error, Result};

pub const INDEX_FILE: &str = "index.bin";
pub const IDENTIFIERS_FILE: &str = "identifiers.json";

const FOOTER_MAGIC: &[u8; 4] = b"ARX2";
const FOOTER_LEN: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
struct Fingerprint {
    count: u64,
    crc: u32,
}

impl Fingerprint {
    fn of(count: usize, identifiers_json: &[u8]) -> Self {
        Self {
            count: count as u64,
            crc: crc32fast::hash(identifiers_json),
        }
    }
}

// Field order is the wire format; keep the two records in step.
#[derive(Serialize)]
struct IndexRecordRef<'a> {
    index: &'a FlatIndex,
    model: &'a str,
    identifiers: Fingerprint,
}

#[derive(Deserialize)]
struct IndexRecord {
    index: FlatIndex,
    model: String,
    identifiers: Fingerprint,
}

/// Everything restored from an index directory
#[derive(Debug)]
pub(crate) struct Artifacts {
    pub index: FlatIndex,
    pub ids: Vec<ItemId>,
    pub model: String,
}

pub(crate) fn index_path(dir: &Path) -> PathBuf {
    dir.join(INDEX_FILE)
}

pub(crate) fn identifiers_path(dir: &Path) -> PathBuf {
    dir.join(IDENTIFIERS_FILE)
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

/// Write both artifacts into `dir`, creating it if needed.
pub(crate) fn save(dir: &Path, index: &FlatIndex, ids: &[ItemId], model: &str) -> Result<()> {
    let identifiers =
        serde_json::to_vec_pretty(ids).map_err(|e| Error::Serialization(e.to_string()))?;

    let record = IndexRecordRef {
        index,
        model,
        identifiers: Fingerprint::of(ids.len(), &identifiers),
    };
    let payload = bincode::serialize(&record).map_err(|e| Error::Serialization(e.to_string()))?;
    let crc = crc32fast::hash(&payload);

    let mut bytes = Vec::with_capacity(payload.len() + FOOTER_LEN);
    bytes.extend_from_slice(&payload);
    bytes.extend_from_slice(FOOTER_MAGIC);
    bytes.extend_from_slice(&crc.to_be_bytes());

    fs::create_dir_all(dir)?;
    let index_path = index_path(dir);
    let identifiers_path = identifiers_path(dir);
    let staged = [
        (tmp_path(&index_path), index_path, bytes.as_slice()),
        (tmp_path(&identifiers_path), identifiers_path, identifiers.as_slice()),
    ];

    for (tmp, _, contents) in &staged {
        if let Err(err) = fs::write(tmp, contents) {
            discard(&staged);
            return Err(err.into());
        }
    }
    for (tmp, path, _) in &staged {
        fs::rename(tmp, path)?;
    }

    tracing::info!(
        dir = %dir.display(),
        vectors = index.len(),
        model,
        bytes = payload.len(),
        crc = %format!("{crc:#010x}"),
        "saved index artifacts"
    );
    Ok(())
}

fn discard(staged: &[(PathBuf, PathBuf, &[u8])]) {
    for (tmp, _, _) in staged {
        if tmp.is_file() {
            if let Err(err) = fs::remove_file(tmp) {
                tracing::warn!(path = %tmp.display(), %err, "failed to remove staged artifact");
            }
        }
    }
}

/// Read and cross-check both artifacts from `dir`.
pub(crate) fn load(dir: &Path) -> Result<Artifacts> {
    let index_path = index_path(dir);
    let identifiers_path = identifiers_path(dir);

    for path in [&index_path, &identifiers_path] {
        if !path.is_file() {
            return Err(Error::MissingArtifact { path: path.clone() });
        }
    }

    let raw = fs::read(&index_path)?;
    let payload = verify_footer(&raw, &index_path)?;
    let record: IndexRecord = bincode::deserialize(payload).map_err(|e| {
        Error::CorruptArtifact(format!("cannot decode {}: {e}", index_path.display()))
    })?;
    record.index.validate()?;

    let raw_ids = fs::read(&identifiers_path)?;
    let ids: Vec<ItemId> = serde_json::from_slice(&raw_ids).map_err(|e| {
        Error::CorruptArtifact(format!("cannot decode {}: {e}", identifiers_path.display()))
    })?;

    if ids.len() != record.index.len() {
        return Err(Error::CorruptArtifact(format!(
            "{} lists {} identifiers but {} holds {} vectors",
            identifiers_path.display(),
            ids.len(),
            index_path.display(),
            record.index.len()
        )));
    }

    if Fingerprint::of(ids.len(), &raw_ids) != record.identifiers {
        return Err(Error::CorruptArtifact(format!(
            "{} does not match the identifier fingerprint stored in {}",
            identifiers_path.display(),
            index_path.display()
        )));
    }

    Ok(Artifacts {
        index: record.index,
        ids,
        model: record.model,
    })
}

fn verify_footer<'a>(raw: &'a [u8], path: &Path) -> Result<&'a [u8]> {
    if raw.len() < FOOTER_LEN || &raw[raw.len() - FOOTER_LEN..raw.len() - 4] != FOOTER_MAGIC {
        return Err(Error::CorruptArtifact(format!(
            "{} has no checksum footer",
            path.display()
        )));
    }

    let (payload, footer) = raw.split_at(raw.len() - FOOTER_LEN);
    let stored = u32::from_be_bytes([footer[4], footer[5], footer[6], footer[7]]);
    let computed = crc32fast::hash(payload);
    if stored != computed {
        return Err(Error::CorruptArtifact(format!(
            "checksum mismatch in {}: stored {stored:#010x}, computed {computed:#010x}",
            path.display()
        )));
    }

    tracing::debug!(path = %path.display(), crc = %format!("{stored:#010x}"), "index checksum verified");
    Ok(payload)
}
