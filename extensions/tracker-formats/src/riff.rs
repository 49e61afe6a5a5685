//! RIFF container walking shared by the WAV and SoundFont probers.

use std::io::{Read, Seek, SeekFrom};

use tracker_browser::ProbeError;

use crate::bytes::{fixed_str, le_u32};

/// Header of one chunk inside a RIFF form.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Chunk {
    pub(crate) id: [u8; 4],
    /// Absolute offset of the chunk payload.
    pub(crate) offset: u64,
    pub(crate) size: u32,
}

/// Reads the `RIFF` header and checks the form type.
///
/// Returns the end of the form, clamped to the stream length.
pub(crate) fn open_form<R: Read + Seek>(r: &mut R, form: &[u8; 4]) -> Result<u64, ProbeError> {
    let stream_len = r.seek(SeekFrom::End(0))?;
    r.seek(SeekFrom::Start(0))?;
    let mut head = [0u8; 12];
    r.read_exact(&mut head).map_err(|_| malformed("RIFF header truncated"))?;
    if &head[0..4] != b"RIFF" || &head[8..12] != form {
        return Err(malformed("not a RIFF form of the expected type"));
    }
    let declared = le_u32(&head, 4).unwrap_or(0) as u64 + 8;
    Ok(declared.min(stream_len))
}

/// Lists the chunks between `start` and `end`. A truncated trailing chunk
/// header ends the walk.
pub(crate) fn chunks<R: Read + Seek>(
    r: &mut R,
    start: u64,
    end: u64,
) -> Result<Vec<Chunk>, ProbeError> {
    let mut out = Vec::new();
    let mut pos = start;
    while pos + 8 <= end {
        r.seek(SeekFrom::Start(pos))?;
        let mut head = [0u8; 8];
        if r.read_exact(&mut head).is_err() {
            break;
        }
        let size = le_u32(&head, 4).unwrap_or(0);
        let id = [head[0], head[1], head[2], head[3]];
        out.push(Chunk {
            id,
            offset: pos + 8,
            size,
        });
        // Payloads are padded to an even length.
        pos = pos + 8 + size as u64 + (size as u64 & 1);
    }
    Ok(out)
}

/// Reads up to `max` bytes of a chunk's payload.
pub(crate) fn read_chunk<R: Read + Seek>(
    r: &mut R,
    chunk: &Chunk,
    max: usize,
) -> Result<Vec<u8>, ProbeError> {
    r.seek(SeekFrom::Start(chunk.offset))?;
    let len = (chunk.size as usize).min(max);
    let mut buf = Vec::with_capacity(len);
    r.by_ref().take(len as u64).read_to_end(&mut buf)?;
    Ok(buf)
}

/// Walks sub-chunks of an in-memory payload.
pub(crate) fn sub_chunks(data: &[u8]) -> impl Iterator<Item = ([u8; 4], &[u8])> + '_ {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        if pos + 8 > data.len() {
            return None;
        }
        let id = [data[pos], data[pos + 1], data[pos + 2], data[pos + 3]];
        let size = le_u32(data, pos + 4)? as usize;
        let start = pos + 8;
        let end = start.saturating_add(size).min(data.len());
        pos = end + (size & 1);
        Some((id, &data[start..end]))
    })
}

/// Finds a `LIST`/`INFO` chunk among `list` and returns its `INAM` entry.
pub(crate) fn info_name<R: Read + Seek>(
    r: &mut R,
    list: &[Chunk],
) -> Result<Option<String>, ProbeError> {
    for chunk in list.iter().filter(|c| &c.id == b"LIST") {
        let data = read_chunk(r, chunk, 64 * 1024)?;
        if data.get(0..4) != Some(b"INFO".as_slice()) {
            continue;
        }
        for (id, payload) in sub_chunks(&data[4..]) {
            if &id == b"INAM" {
                return Ok(fixed_str(payload, 0, payload.len()));
            }
        }
    }
    Ok(None)
}

pub(crate) fn malformed(reason: &str) -> ProbeError {
    ProbeError::Malformed(reason.to_string())
}
