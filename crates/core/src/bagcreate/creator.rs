//! In-place BagIt packaging.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use crate::config::ChecksumAlgorithm;

use super::checksum::file_digest;
use super::error::BagCreateError;

pub const BAGIT_VERSION: &str = "0.97";

const PAYLOAD_DIR: &str = "data";
const AGENT: &str = concat!("preprocessing-worker ", env!("CARGO_PKG_VERSION"));

/// Turn `source` into a bag in place and return the bag path.
///
/// Every existing entry of `source` moves under `data/`, then `bagit.txt`,
/// `bag-info.txt`, `manifest-<alg>.txt` and `tagmanifest-<alg>.txt` are
/// written next to it.
pub fn create_bag(source: &Path, algorithm: ChecksumAlgorithm) -> Result<PathBuf, BagCreateError> {
    if !source.exists() {
        return Err(BagCreateError::SourceNotFound {
            path: source.to_path_buf(),
        });
    }
    if !source.is_dir() {
        return Err(BagCreateError::NotADirectory {
            path: source.to_path_buf(),
        });
    }
    if source.join("bagit.txt").exists() {
        return Err(BagCreateError::AlreadyBagged {
            path: source.to_path_buf(),
        });
    }

    info!(source = %source.display(), %algorithm, "Creating bag");

    move_payload(source)?;

    let payload = source.join(PAYLOAD_DIR);
    let mut manifest = String::new();
    let mut octets: u64 = 0;
    let mut streams: u64 = 0;
    for entry in WalkDir::new(&payload).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let digest = file_digest(entry.path(), algorithm)?;
        manifest.push_str(&manifest_line(&digest, source, entry.path()));
        octets += entry.metadata()?.len();
        streams += 1;
    }
    debug!(files = streams, bytes = octets, "Payload manifest computed");

    let manifest_name = format!("manifest-{}.txt", algorithm);
    fs::write(
        source.join("bagit.txt"),
        format!(
            "BagIt-Version: {}\nTag-File-Character-Encoding: UTF-8\n",
            BAGIT_VERSION
        ),
    )?;
    fs::write(source.join(&manifest_name), manifest)?;
    fs::write(
        source.join("bag-info.txt"),
        format!(
            "Bag-Software-Agent: {}\nBagging-Date: {}\nPayload-Oxum: {}.{}\n",
            AGENT,
            Utc::now().format("%Y-%m-%d"),
            octets,
            streams
        ),
    )?;

    let mut tagmanifest = String::new();
    for tag in ["bag-info.txt", "bagit.txt", manifest_name.as_str()] {
        let path = source.join(tag);
        let digest = file_digest(&path, algorithm)?;
        tagmanifest.push_str(&manifest_line(&digest, source, &path));
    }
    fs::write(
        source.join(format!("tagmanifest-{}.txt", algorithm)),
        tagmanifest,
    )?;

    info!(bag = %source.display(), files = streams, "Bag created");
    Ok(source.to_path_buf())
}

/// Move every entry of `source` into `source/data`.
///
/// Entries go through a uniquely named staging directory first, so a
/// top-level entry already called `data` is moved like any other. If any
/// move fails, staged entries are put back and `source` is left as found.
fn move_payload(source: &Path) -> Result<(), BagCreateError> {
    move_payload_with(source, |from, to| fs::rename(from, to))
}

fn move_payload_with<F>(source: &Path, rename: F) -> Result<(), BagCreateError>
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    let staging = source.join(format!(".bagit-staging-{}", uuid::Uuid::new_v4()));
    fs::create_dir(&staging)?;

    let moved = stage_entries(source, &staging, &rename)
        .and_then(|()| rename(&staging, &source.join(PAYLOAD_DIR)));
    if let Err(e) = moved {
        warn!(source = %source.display(), error = %e, "Moving payload failed, restoring source");
        restore_staged(source, &staging);
        return Err(e.into());
    }
    Ok(())
}

fn stage_entries<F>(source: &Path, staging: &Path, rename: &F) -> io::Result<()>
where
    F: Fn(&Path, &Path) -> io::Result<()>,
{
    for entry in fs::read_dir(source)? {
        let entry = entry?;
        let path = entry.path();
        if path == staging {
            continue;
        }
        rename(&path, &staging.join(entry.file_name()))?;
    }
    Ok(())
}

/// Best effort: every entry that cannot be moved back is logged.
fn restore_staged(source: &Path, staging: &Path) {
    let entries = match fs::read_dir(staging) {
        Ok(entries) => entries,
        Err(e) => {
            error!(staging = %staging.display(), error = %e, "Cannot read staging directory");
            return;
        }
    };
    for entry in entries.flatten() {
        let target = source.join(entry.file_name());
        if let Err(e) = fs::rename(entry.path(), &target) {
            error!(entry = %target.display(), error = %e, "Cannot restore payload entry");
        }
    }
    if let Err(e) = fs::remove_dir(staging) {
        error!(staging = %staging.display(), error = %e, "Cannot remove staging directory");
    }
}

fn manifest_line(digest: &str, root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let name = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/");
    format!("{}  {}\n", digest, encode_path(&name))
}

/// Percent-encode the characters BagIt reserves in manifest paths.
fn encode_path(path: &str) -> String {
    path.replace('%', "%25")
        .replace('\n', "%0A")
        .replace('\r', "%0D")
}
