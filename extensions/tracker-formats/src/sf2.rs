use std::path::Path;

use tracker_browser::{ExtendedMetadata, ProbeError};

use crate::riff::{Chunk, chunks, info_name, malformed, open_form, read_chunk};

const PHDR_RECORD: u32 = 38;
const SHDR_RECORD: u32 = 46;

/// Probes a SoundFont 2 bank: name and preset/sample counts.
pub fn probe_sf2(path: &Path) -> Result<ExtendedMetadata, ProbeError> {
    let mut file = std::fs::File::open(path)?;
    let end = open_form(&mut file, b"sfbk")?;
    let top = chunks(&mut file, 12, end)?;

    let pdta = find_list(&mut file, &top, b"pdta")?
        .ok_or_else(|| malformed("missing pdta list"))?;
    let hydra = chunks(
        &mut file,
        pdta.offset + 4,
        pdta.offset + pdta.size as u64,
    )?;
    // Both tables end with a terminal record that is not a real entry.
    let count = |id: &[u8; 4], record: u32| {
        hydra
            .iter()
            .find(|c| &c.id == id)
            .map(|c| (c.size / record).saturating_sub(1))
            .unwrap_or(0)
    };
    let presets = count(b"phdr", PHDR_RECORD);
    let samples = count(b"shdr", SHDR_RECORD);

    Ok(ExtendedMetadata {
        title: info_name(&mut file, &top)?,
        description: Some(format!(
            "SoundFont 2 bank, {presets} presets, {samples} samples"
        )),
        sample: None,
    })
}

fn find_list(
    file: &mut std::fs::File,
    top: &[Chunk],
    kind: &[u8; 4],
) -> Result<Option<Chunk>, ProbeError> {
    for chunk in top.iter().filter(|c| &c.id == b"LIST") {
        if read_chunk(file, chunk, 4)?.as_slice() == kind {
            return Ok(Some(*chunk));
        }
    }
    Ok(None)
}
