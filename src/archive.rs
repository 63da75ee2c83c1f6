use crate::error::ArchiveError;
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::result::ZipError;

/// One member file of the credential archive.
#[derive(Debug, Clone)]
pub struct ArchiveEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Ceilings applied while inflating the container. Credential archives are
/// a handful of small files; anything past these limits is not one.
#[derive(Debug, Clone)]
pub struct ArchiveLimits {
    pub max_entries: usize,
    pub max_entry_bytes: u64,
    pub max_total_bytes: u64,
}

impl Default for ArchiveLimits {
    fn default() -> Self {
        Self {
            max_entries: 64,
            max_entry_bytes: 16 * 1024 * 1024,
            max_total_bytes: 64 * 1024 * 1024,
        }
    }
}

/// Opens a password-protected ZIP container and yields every member file
/// as bytes, in archive order. Directories are skipped.
///
/// Everything happens over an in-memory cursor; no decrypted plaintext is
/// ever staged on the filesystem. An explicit invalid-password signal from
/// the decryptor maps to `WrongPassword`; every other failure, including a
/// checksum mismatch after the ZipCrypto check byte falsely accepted the
/// password, maps to `Corrupt`.
pub fn extract(
    archive: &[u8],
    password: &str,
    limits: &ArchiveLimits,
) -> Result<Vec<ArchiveEntry>, ArchiveError> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

    if zip.len() > limits.max_entries {
        return Err(ArchiveError::Corrupt(format!(
            "archive holds {} entries, limit is {}",
            zip.len(),
            limits.max_entries
        )));
    }

    let mut entries = Vec::new();
    let mut total_bytes = 0u64;
    for index in 0..zip.len() {
        let mut member = match zip.by_index_decrypt(index, password.as_bytes()) {
            Ok(member) => member,
            Err(ZipError::InvalidPassword) => {
                warn!("archive rejected the supplied password");
                return Err(ArchiveError::WrongPassword);
            }
            Err(e) => return Err(ArchiveError::Corrupt(e.to_string())),
        };
        if member.is_dir() {
            continue;
        }

        let declared = member.size();
        if declared > limits.max_entry_bytes {
            return Err(ArchiveError::Corrupt(format!(
                "entry {} declares {} bytes, limit is {}",
                member.name(),
                declared,
                limits.max_entry_bytes
            )));
        }
        total_bytes = total_bytes.saturating_add(declared);
        if total_bytes > limits.max_total_bytes {
            return Err(ArchiveError::Corrupt(format!(
                "total uncompressed size exceeds limit of {} bytes",
                limits.max_total_bytes
            )));
        }

        let name = member.name().to_string();
        let mut bytes = Vec::with_capacity(declared as usize);
        member
            .read_to_end(&mut bytes)
            .map_err(|e| ArchiveError::Corrupt(format!("failed reading entry {name}: {e}")))?;
        debug!(entry = %name, bytes = bytes.len(), "extracted archive member");
        entries.push(ArchiveEntry { name, bytes });
    }
    Ok(entries)
}
