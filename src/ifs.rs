//! Extractor for the ifs archive container: a fixed big-endian header
//! followed by an embedded kbinxml manifest and then the concatenated raw
//! entry bodies.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::{NoteCountError, Result};
use crate::kbin::{self, Document};
use crate::stream::{ByteStream, Endian};

const SIGNATURE: u32 = 0x6CAD8F89;
const HEADER_LEN: usize = 16;
const MD5_LEN: usize = 16;

/// Opens `path`, validates the ifs header, decodes the embedded manifest,
/// and reports the absolute offset where entry bodies begin.
///
/// Owns no state across calls: the file is read fully (header, optional
/// MD5, and manifest) and closed before this function returns.
pub fn extract_manifest(path: &Path) -> Result<(Document, u32)> {
    let mut file = File::open(path)?;

    let mut header_buf = [0u8; HEADER_LEN];
    file.read_exact(&mut header_buf)?;

    let mut header = ByteStream::open(&header_buf);
    header.set_endian(Endian::Big);
    let signature = header.read_u32();
    let version = header.read_u16();
    let not_version = header.read_u16();
    let _timestamp = header.read_u32();
    let _tree_size = header.read_u32();
    let manifest_end = header.read_u32();

    if signature != SIGNATURE {
        log::warn!("ifs header signature mismatch for {}", path.display());
        return Err(NoteCountError::InvalidFile("bad ifs signature"));
    }
    if version ^ not_version != 0xFFFF {
        log::warn!("ifs header version xor check failed for {}", path.display());
        return Err(NoteCountError::InvalidFile("version xor check failed"));
    }

    if version > 1 {
        let mut md5 = [0u8; MD5_LEN];
        file.read_exact(&mut md5)?;
    }

    let consumed = HEADER_LEN as u64 + if version > 1 { MD5_LEN as u64 } else { 0 };
    let manifest_size = (manifest_end as u64)
        .checked_sub(consumed)
        .ok_or(NoteCountError::InvalidFile("manifest_end precedes header"))?;

    let mut manifest_buffer = vec![0u8; manifest_size as usize];
    file.read_exact(&mut manifest_buffer)?;

    let tree = kbin::decode(&manifest_buffer).ok_or_else(|| {
        log::error!("manifest decode failed for {}", path.display());
        NoteCountError::ManifestParseError
    })?;

    Ok((tree, manifest_end))
}
