//! Container detection from the first bytes of a file.

/// Top-level box types that may open an ISO-BMFF file without a leading `ftyp`.
const BARE_BOXES: &[&[u8; 4]] = &[b"moov", b"mdat", b"free", b"skip", b"wide", b"pnot"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Container {
    /// MP4/MOV family; walked box by box.
    IsoBmff,
    /// Recognized but only reported by name.
    Other(&'static str),
    Unknown,
}

/// Bytes needed before [`detect`] gives a final answer for every format.
pub(crate) const SNIFF_LEN: usize = 189;

pub(crate) fn detect(header: &[u8]) -> Container {
    if header.len() >= 8 {
        let kind = &header[4..8];
        if kind == b"ftyp" || BARE_BOXES.iter().any(|b| kind == &b[..]) {
            return Container::IsoBmff;
        }
    }
    if header.starts_with(&[0x1a, 0x45, 0xdf, 0xa3]) {
        let webm = header.windows(4).take(64).any(|w| w == b"webm");
        return Container::Other(if webm { "WebM" } else { "Matroska" });
    }
    if header.starts_with(b"RIFF") && header.len() >= 12 {
        match &header[8..12] {
            b"AVI " => return Container::Other("AVI"),
            b"WAVE" => return Container::Other("Wave"),
            _ => {}
        }
    }
    if header.starts_with(b"OggS") {
        return Container::Other("Ogg");
    }
    if header.starts_with(b"fLaC") {
        return Container::Other("FLAC");
    }
    if header.starts_with(b"FLV") {
        return Container::Other("Flash Video");
    }
    if header.starts_with(&[0x00, 0x00, 0x01, 0xba]) {
        return Container::Other("MPEG-PS");
    }
    if header.len() > 188 && header[0] == 0x47 && header[188] == 0x47 {
        return Container::Other("MPEG-TS");
    }
    if header.starts_with(b"ID3") {
        return Container::Other("MPEG Audio");
    }
    if header.len() >= 2 && header[0] == 0xff {
        match header[1] & 0xf6 {
            0xf0 => return Container::Other("ADTS"),
            0xf2 => return Container::Other("MPEG Audio"),
            _ => {}
        }
    }
    Container::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn iso_bmff_by_ftyp_or_bare_box() {
        assert_eq!(detect(b"\0\0\0\x18ftypisom"), Container::IsoBmff);
        assert_eq!(detect(b"\0\0\0\x08free"), Container::IsoBmff);
    }

    #[test]
    fn other_containers() {
        assert_eq!(
            detect(&[0x1a, 0x45, 0xdf, 0xa3, 0x9f, 0x42, 0x82, 0x84, b'w', b'e', b'b', b'm']),
            Container::Other("WebM")
        );
        assert_eq!(detect(b"RIFF\0\0\0\0WAVEfmt "), Container::Other("Wave"));
        assert_eq!(detect(b"ID3\x04\0\0"), Container::Other("MPEG Audio"));
        assert_eq!(detect(&[0xff, 0xf1, 0x50]), Container::Other("ADTS"));
        assert_eq!(detect(&[0xff, 0xfb, 0x90]), Container::Other("MPEG Audio"));

        let mut ts = vec![0u8; 376];
        ts[0] = 0x47;
        ts[188] = 0x47;
        assert_eq!(detect(&ts), Container::Other("MPEG-TS"));
    }

    #[test]
    fn unknown_bytes() {
        assert_eq!(detect(b"hello world, not media"), Container::Unknown);
    }
}
