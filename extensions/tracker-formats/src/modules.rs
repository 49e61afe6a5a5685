use std::path::Path;

use tracker_browser::{ExtendedMetadata, ProbeError};

use crate::bytes::{be_u16, fixed_str, le_u16, read_prefix, require_len};

/// Offset of the format tag in a ProTracker-style module.
pub(crate) const MOD_TAG_OFFSET: usize = 1080;

/// Fixed ProTracker-family tags recognized at [`MOD_TAG_OFFSET`].
const MOD_TAGS: &[&[u8; 4]] = &[
    b"M.K.", b"M!K!", b"FLT4", b"4CHN", b"6CHN", b"8CHN", b"FLT8", b"OCTA", b"CD81",
];

/// Channel counts written as `xxCH` tags by multichannel trackers.
const MOD_XXCH_CHANNELS: std::ops::RangeInclusive<u8> = 10..=32;

/// Every tag a ProTracker-family module may carry, fixed tags first.
pub(crate) fn mod_tags() -> impl Iterator<Item = [u8; 4]> {
    MOD_TAGS.iter().map(|tag| **tag).chain(
        MOD_XXCH_CHANNELS.map(|n| [b'0' + n / 10, b'0' + n % 10, b'C', b'H']),
    )
}

/// Signature of an Extended Module header.
pub(crate) const XM_MAGIC: &[u8; 17] = b"Extended Module: ";

/// Offset of the `SCRM` tag in a Scream Tracker 3 header.
pub(crate) const S3M_TAG_OFFSET: usize = 0x2C;

fn module(title: Option<String>, description: String) -> ExtendedMetadata {
    ExtendedMetadata {
        title,
        description: Some(description),
        sample: None,
    }
}

/// Probes an Impulse Tracker module (`IMPM`).
pub fn probe_it(path: &Path) -> Result<ExtendedMetadata, ProbeError> {
    let h = read_prefix(path, 0x30)?;
    parse_it(&h)
}

pub(crate) fn parse_it(h: &[u8]) -> Result<ExtendedMetadata, ProbeError> {
    require_len(h, 0x30, "IT module")?;
    if &h[0..4] != b"IMPM" {
        return Err(ProbeError::Malformed("missing IMPM signature".into()));
    }
    let samples = le_u16(h, 0x24).unwrap_or(0);
    let patterns = le_u16(h, 0x26).unwrap_or(0);
    Ok(module(
        fixed_str(h, 0x04, 26),
        format!("Impulse Tracker module, {samples} samples, {patterns} patterns"),
    ))
}

/// Probes a Scream Tracker 3 module (`SCRM`).
pub fn probe_s3m(path: &Path) -> Result<ExtendedMetadata, ProbeError> {
    let h = read_prefix(path, 0x30)?;
    parse_s3m(&h)
}

pub(crate) fn parse_s3m(h: &[u8]) -> Result<ExtendedMetadata, ProbeError> {
    require_len(h, 0x30, "S3M")?;
    if &h[S3M_TAG_OFFSET..S3M_TAG_OFFSET + 4] != b"SCRM" {
        return Err(ProbeError::Malformed("missing SCRM signature".into()));
    }
    if h[0x1D] != 16 {
        return Err(ProbeError::Unsupported);
    }
    let instruments = le_u16(h, 0x22).unwrap_or(0);
    let patterns = le_u16(h, 0x24).unwrap_or(0);
    Ok(module(
        fixed_str(h, 0, 28),
        format!("Scream Tracker 3 module, {instruments} instruments, {patterns} patterns"),
    ))
}

/// Probes a FastTracker 2 Extended Module.
pub fn probe_xm(path: &Path) -> Result<ExtendedMetadata, ProbeError> {
    let h = read_prefix(path, 80)?;
    parse_xm(&h)
}

pub(crate) fn parse_xm(h: &[u8]) -> Result<ExtendedMetadata, ProbeError> {
    require_len(h, 80, "XM")?;
    if &h[0..17] != XM_MAGIC {
        return Err(ProbeError::Malformed("missing Extended Module signature".into()));
    }
    let version = le_u16(h, 58).unwrap_or(0);
    if version < 0x0104 {
        return Err(ProbeError::Unsupported);
    }
    let channels = le_u16(h, 68).unwrap_or(0);
    let instruments = le_u16(h, 72).unwrap_or(0);
    let tracker = fixed_str(h, 38, 20).unwrap_or_else(|| "unknown tracker".to_string());
    Ok(module(
        fixed_str(h, 17, 20),
        format!("Extended Module ({tracker}), {channels} channels, {instruments} instruments"),
    ))
}

/// Probes a ProTracker-family module.
pub fn probe_mod(path: &Path) -> Result<ExtendedMetadata, ProbeError> {
    let h = read_prefix(path, MOD_TAG_OFFSET + 4)?;
    parse_mod(&h)
}

pub(crate) fn parse_mod(h: &[u8]) -> Result<ExtendedMetadata, ProbeError> {
    require_len(h, MOD_TAG_OFFSET + 4, "MOD")?;
    let tag = &h[MOD_TAG_OFFSET..MOD_TAG_OFFSET + 4];
    let channels = mod_channels(tag).ok_or(ProbeError::Unsupported)?;
    let samples = (0..31)
        .filter(|i| be_u16(h, 20 + i * 30 + 22).unwrap_or(0) > 0)
        .count();
    Ok(module(
        fixed_str(h, 0, 20),
        format!("ProTracker module, {channels} channels, {samples} samples"),
    ))
}

fn mod_channels(tag: &[u8]) -> Option<u16> {
    match tag {
        b"M.K." | b"M!K!" | b"FLT4" | b"4CHN" => Some(4),
        b"6CHN" => Some(6),
        b"8CHN" | b"FLT8" | b"OCTA" | b"CD81" => Some(8),
        [a, b, b'C', b'H'] if a.is_ascii_digit() && b.is_ascii_digit() => {
            Some(u16::from(a - b'0') * 10 + u16::from(b - b'0'))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_header() {
        let mut h = vec![0u8; 0x30];
        h[0..4].copy_from_slice(b"IMPM");
        h[4..14].copy_from_slice(b"Dance Hall");
        h[0x24..0x26].copy_from_slice(&12u16.to_le_bytes());
        h[0x26..0x28].copy_from_slice(&5u16.to_le_bytes());
        let meta = parse_it(&h).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Dance Hall"));
        assert_eq!(
            meta.description.as_deref(),
            Some("Impulse Tracker module, 12 samples, 5 patterns")
        );
        assert!(meta.sample.is_none());
    }

    #[test]
    fn s3m_requires_module_type() {
        let mut h = vec![0u8; 0x30];
        h[0..5].copy_from_slice(b"Intro");
        h[0x1C] = 0x1A;
        h[0x1D] = 16;
        h[0x2C..0x30].copy_from_slice(b"SCRM");
        assert_eq!(parse_s3m(&h).unwrap().title.as_deref(), Some("Intro"));
        h[0x1D] = 17;
        assert!(matches!(parse_s3m(&h), Err(ProbeError::Unsupported)));
    }

    #[test]
    fn xm_header() {
        let mut h = vec![0u8; 80];
        h[0..17].copy_from_slice(XM_MAGIC);
        h[17..22].copy_from_slice(b"Chase");
        h[37] = 0x1A;
        h[38..50].copy_from_slice(b"FastTracker ");
        h[58..60].copy_from_slice(&0x0104u16.to_le_bytes());
        h[68..70].copy_from_slice(&8u16.to_le_bytes());
        h[72..74].copy_from_slice(&3u16.to_le_bytes());
        let meta = parse_xm(&h).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Chase"));
        assert_eq!(
            meta.description.as_deref(),
            Some("Extended Module (FastTracker), 8 channels, 3 instruments")
        );
        h[58..60].copy_from_slice(&0x0102u16.to_le_bytes());
        assert!(matches!(parse_xm(&h), Err(ProbeError::Unsupported)));
    }

    #[test]
    fn mod_channels_from_tag() {
        assert_eq!(mod_channels(b"M.K."), Some(4));
        assert_eq!(mod_channels(b"8CHN"), Some(8));
        assert_eq!(mod_channels(b"12CH"), Some(12));
        assert_eq!(mod_channels(b"ABCD"), None);
    }

    #[test]
    fn every_tag_maps_to_a_channel_count() {
        let tags: Vec<[u8; 4]> = mod_tags().collect();
        assert!(tags.contains(b"M.K."));
        assert!(tags.contains(b"12CH"));
        assert!(tags.contains(b"32CH"));
        assert!(!tags.contains(b"09CH"));
        for tag in &tags {
            assert!(mod_channels(tag).is_some(), "{:?}", String::from_utf8_lossy(tag));
        }
    }

    #[test]
    fn mod_counts_non_empty_samples() {
        let mut h = vec![0u8; MOD_TAG_OFFSET + 4];
        h[0..6].copy_from_slice(b"Oldie!");
        for i in [0usize, 4, 30] {
            let off = 20 + i * 30 + 22;
            h[off..off + 2].copy_from_slice(&100u16.to_be_bytes());
        }
        h[MOD_TAG_OFFSET..].copy_from_slice(b"M.K.");
        let meta = parse_mod(&h).unwrap();
        assert_eq!(meta.title.as_deref(), Some("Oldie!"));
        assert_eq!(
            meta.description.as_deref(),
            Some("ProTracker module, 4 channels, 3 samples")
        );
    }
}
