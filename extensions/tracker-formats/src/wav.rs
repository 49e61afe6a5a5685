use std::path::Path;

use tracker_browser::{ExtendedMetadata, ProbeError, SampleFlags, SampleInfo};

use crate::bytes::{le_u16, le_u32};
use crate::riff::{Chunk, chunks, info_name, malformed, open_form, read_chunk};

const FORMAT_PCM: u16 = 0x0001;
const FORMAT_FLOAT: u16 = 0x0003;
const FORMAT_EXTENSIBLE: u16 = 0xFFFE;

const SMPL_LOOP_PINGPONG: u32 = 1;

struct WaveFormat {
    tag: u16,
    channels: u16,
    sample_rate: u32,
    block_align: u16,
    bits: u16,
}

impl WaveFormat {
    fn parse(data: &[u8]) -> Result<Self, ProbeError> {
        let field = |v: Option<u16>| v.ok_or_else(|| malformed("fmt chunk truncated"));
        let mut tag = field(le_u16(data, 0))?;
        if tag == FORMAT_EXTENSIBLE {
            // Sub-format GUID starts at 24; its first two bytes are the tag.
            tag = le_u16(data, 24).unwrap_or(0);
        }
        Ok(Self {
            tag,
            channels: field(le_u16(data, 2))?,
            sample_rate: le_u32(data, 4).ok_or_else(|| malformed("fmt chunk truncated"))?,
            block_align: field(le_u16(data, 12))?,
            bits: field(le_u16(data, 14))?,
        })
    }

    fn describe(&self) -> String {
        let kind = if self.tag == FORMAT_FLOAT { "float" } else { "PCM" };
        let layout = if self.channels == 2 { "stereo" } else { "mono" };
        format!(
            "WAV {kind}, {}-bit {layout}, {} Hz",
            self.bits, self.sample_rate
        )
    }
}

/// Probes a RIFF/WAVE file: format, length and `smpl` loop points.
pub fn probe_wav(path: &Path) -> Result<ExtendedMetadata, ProbeError> {
    let mut file = std::fs::File::open(path)?;
    let end = open_form(&mut file, b"WAVE")?;
    let list = chunks(&mut file, 12, end)?;

    let fmt_chunk = find(&list, b"fmt ").ok_or_else(|| malformed("missing fmt chunk"))?;
    let format = WaveFormat::parse(&read_chunk(&mut file, fmt_chunk, 64)?)?;
    if format.tag != FORMAT_PCM && format.tag != FORMAT_FLOAT {
        return Err(ProbeError::Unsupported);
    }
    if !(1..=2).contains(&format.channels) || format.block_align == 0 {
        return Err(ProbeError::Unsupported);
    }

    let data_size = find(&list, b"data").map(|c| c.size).unwrap_or(0);
    let mut sample = SampleInfo {
        length: data_size / format.block_align as u32,
        c5_speed: format.sample_rate,
        ..Default::default()
    };
    if format.bits > 8 {
        sample.flags |= SampleFlags::SIXTEEN_BIT;
    }
    if format.channels == 2 {
        sample.flags |= SampleFlags::STEREO;
    }
    if let Some(smpl) = find(&list, b"smpl") {
        let data = read_chunk(&mut file, smpl, 36 + 2 * 24)?;
        apply_smpl_loops(&data, &mut sample);
    }

    Ok(ExtendedMetadata {
        title: info_name(&mut file, &list)?,
        description: Some(format.describe()),
        sample: Some(sample),
    })
}

fn find<'a>(list: &'a [Chunk], id: &[u8; 4]) -> Option<&'a Chunk> {
    list.iter().find(|c| &c.id == id)
}

/// The first sampler loop becomes the loop, the second the sustain loop.
fn apply_smpl_loops(data: &[u8], sample: &mut SampleInfo) {
    let count = le_u32(data, 28).unwrap_or(0) as usize;
    for index in 0..count.min(2) {
        let base = 36 + index * 24;
        let (Some(kind), Some(start), Some(end)) = (
            le_u32(data, base + 4),
            le_u32(data, base + 8),
            le_u32(data, base + 12),
        ) else {
            break;
        };
        // Sampler loop ends are inclusive.
        let end = end.saturating_add(1).min(sample.length.max(1));
        if start >= end {
            continue;
        }
        let pingpong = kind == SMPL_LOOP_PINGPONG;
        if index == 0 {
            sample.loop_start = start;
            sample.loop_end = end;
            sample.flags |= SampleFlags::LOOP;
            sample.flags.set(SampleFlags::PINGPONG_LOOP, pingpong);
        } else {
            sample.sustain_start = start;
            sample.sustain_end = end;
            sample.flags |= SampleFlags::SUSTAIN_LOOP;
            sample.flags.set(SampleFlags::PINGPONG_SUSTAIN, pingpong);
        }
    }
}
