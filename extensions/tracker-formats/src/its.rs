use std::path::Path;

use tracker_browser::{ExtendedMetadata, ProbeError, SampleFlags, SampleInfo, VibratoWaveform};

use crate::bytes::{fixed_str, le_u32, read_prefix, require_len};

/// Size of an Impulse Tracker sample header.
pub(crate) const HEADER_LEN: usize = 80;

const FLAG_16BIT: u8 = 0x02;
const FLAG_STEREO: u8 = 0x04;
const FLAG_LOOP: u8 = 0x10;
const FLAG_SUSTAIN: u8 = 0x20;
const FLAG_PINGPONG: u8 = 0x40;
const FLAG_PINGPONG_SUSTAIN: u8 = 0x80;

/// Probes an Impulse Tracker sample (`IMPS`) file.
pub fn probe_its(path: &Path) -> Result<ExtendedMetadata, ProbeError> {
    let header = read_prefix(path, HEADER_LEN)?;
    parse_sample_header(&header)
}

/// Parses an 80-byte `IMPS` header.
pub(crate) fn parse_sample_header(h: &[u8]) -> Result<ExtendedMetadata, ProbeError> {
    require_len(h, HEADER_LEN, "IT sample")?;
    if &h[0..4] != b"IMPS" {
        return Err(ProbeError::Malformed("missing IMPS signature".into()));
    }
    let word = |off: usize| le_u32(h, off).unwrap_or(0);
    let flags = h[0x12];

    let mut sample = SampleInfo {
        global_volume: h[0x11].min(64),
        default_volume: h[0x13].min(64),
        length: word(0x30),
        loop_start: word(0x34),
        loop_end: word(0x38),
        c5_speed: match word(0x3C) {
            0 => SampleInfo::default().c5_speed,
            speed => speed,
        },
        sustain_start: word(0x40),
        sustain_end: word(0x44),
        vibrato_speed: h[0x4C],
        vibrato_depth: h[0x4D],
        vibrato_rate: h[0x4E],
        vibrato_waveform: match h[0x4F] & 3 {
            0 => VibratoWaveform::Sine,
            1 => VibratoWaveform::RampDown,
            2 => VibratoWaveform::Square,
            _ => VibratoWaveform::Random,
        },
        ..Default::default()
    };
    for (bit, flag) in [
        (FLAG_16BIT, SampleFlags::SIXTEEN_BIT),
        (FLAG_STEREO, SampleFlags::STEREO),
        (FLAG_LOOP, SampleFlags::LOOP),
        (FLAG_SUSTAIN, SampleFlags::SUSTAIN_LOOP),
        (FLAG_PINGPONG, SampleFlags::PINGPONG_LOOP),
        (FLAG_PINGPONG_SUSTAIN, SampleFlags::PINGPONG_SUSTAIN),
    ] {
        sample.flags.set(flag, flags & bit != 0);
    }
    clamp_loops(&mut sample);

    let title = fixed_str(h, 0x14, 26).or_else(|| fixed_str(h, 0x04, 12));
    Ok(ExtendedMetadata {
        title,
        description: Some("Impulse Tracker sample".to_string()),
        sample: Some(sample),
    })
}

/// Drops loop flags whose bounds do not fit the sample.
fn clamp_loops(s: &mut SampleInfo) {
    if s.loop_end > s.length || s.loop_start >= s.loop_end {
        s.flags.remove(SampleFlags::LOOP | SampleFlags::PINGPONG_LOOP);
    }
    if s.sustain_end > s.length || s.sustain_start >= s.sustain_end {
        s.flags
            .remove(SampleFlags::SUSTAIN_LOOP | SampleFlags::PINGPONG_SUSTAIN);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Builds an `IMPS` header with the given fields.
    fn imps(name: &str, flags: u8, length: u32, loop_: (u32, u32)) -> Vec<u8> {
        let mut h = vec![0u8; HEADER_LEN];
        h[0..4].copy_from_slice(b"IMPS");
        h[0x04..0x04 + 8].copy_from_slice(b"FILE.ITS");
        h[0x11] = 48;
        h[0x12] = flags;
        h[0x13] = 32;
        h[0x14..0x14 + name.len()].copy_from_slice(name.as_bytes());
        h[0x30..0x34].copy_from_slice(&length.to_le_bytes());
        h[0x34..0x38].copy_from_slice(&loop_.0.to_le_bytes());
        h[0x38..0x3C].copy_from_slice(&loop_.1.to_le_bytes());
        h[0x3C..0x40].copy_from_slice(&22050u32.to_le_bytes());
        h[0x4C] = 3;
        h[0x4D] = 7;
        h[0x4E] = 9;
        h[0x4F] = 2;
        h
    }

    #[test]
    fn parses_fields_and_flags() {
        let h = imps("Snare", FLAG_16BIT | FLAG_LOOP | FLAG_PINGPONG, 1000, (100, 900));
        let meta = parse_sample_header(&h).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Snare"));
        let s = meta.sample.unwrap();
        assert_eq!(s.length, 1000);
        assert_eq!((s.loop_start, s.loop_end), (100, 900));
        assert_eq!(s.global_volume, 48);
        assert_eq!(s.default_volume, 32);
        assert_eq!(s.c5_speed, 22050);
        assert_eq!(
            (s.vibrato_speed, s.vibrato_depth, s.vibrato_rate),
            (3, 7, 9)
        );
        assert_eq!(s.vibrato_waveform, VibratoWaveform::Square);
        assert_eq!(
            s.flags,
            SampleFlags::SIXTEEN_BIT | SampleFlags::LOOP | SampleFlags::PINGPONG_LOOP
        );
    }

    #[test]
    fn loop_past_end_is_dropped() {
        let h = imps("x", FLAG_LOOP, 100, (10, 200));
        let s = parse_sample_header(&h).unwrap().sample.unwrap();
        assert!(!s.flags.contains(SampleFlags::LOOP));
    }

    #[test]
    fn falls_back_to_dos_filename() {
        let h = imps("", 0, 0, (0, 0));
        let meta = parse_sample_header(&h).unwrap();
        assert_eq!(meta.title.as_deref(), Some("FILE.ITS"));
    }

    #[test]
    fn truncated_header_is_malformed() {
        let h = imps("x", 0, 0, (0, 0));
        assert!(matches!(
            parse_sample_header(&h[..40]),
            Err(ProbeError::Malformed(_))
        ));
    }
}
