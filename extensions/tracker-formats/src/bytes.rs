use std::io::Read;
use std::path::Path;

use tracker_browser::ProbeError;

/// Reads at most `len` bytes from the start of `path`.
pub(crate) fn read_prefix(path: &Path, len: usize) -> Result<Vec<u8>, ProbeError> {
    let file = std::fs::File::open(path)?;
    let mut buf = Vec::with_capacity(len);
    file.take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Fails with [`ProbeError::Malformed`] unless `data` holds `len` bytes.
pub(crate) fn require_len(data: &[u8], len: usize, what: &str) -> Result<(), ProbeError> {
    if data.len() < len {
        return Err(ProbeError::Malformed(format!(
            "{what} header truncated: {} of {len} bytes",
            data.len()
        )));
    }
    Ok(())
}

pub(crate) fn le_u16(data: &[u8], off: usize) -> Option<u16> {
    let b = data.get(off..off + 2)?;
    Some(u16::from_le_bytes([b[0], b[1]]))
}

pub(crate) fn le_u32(data: &[u8], off: usize) -> Option<u32> {
    let b = data.get(off..off + 4)?;
    Some(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

pub(crate) fn be_u16(data: &[u8], off: usize) -> Option<u16> {
    let b = data.get(off..off + 2)?;
    Some(u16::from_be_bytes([b[0], b[1]]))
}

/// Decodes a fixed-width, NUL or space padded name field.
///
/// Returns `None` for fields that are empty after trimming.
pub(crate) fn fixed_str(data: &[u8], off: usize, len: usize) -> Option<String> {
    let field = data.get(off..off + len)?;
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    let text: String = String::from_utf8_lossy(&field[..end])
        .chars()
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
