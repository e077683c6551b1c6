//! Extracts stream properties from a complete `moov` box.

use super::boxes::{be_u16, be_u32, be_u64, children, find, find_path, fourcc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TrackKind {
    Video,
    Audio,
    Text,
    Other,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct TrackInfo {
    pub id: u32,
    pub handler: Option<[u8; 4]>,
    pub codec: Option<[u8; 4]>,
    pub timescale: u32,
    pub duration: u64,
    pub width: u32,
    pub height: u32,
    pub channels: u16,
    pub sample_rate: u32,
    pub sample_size: u16,
    pub sample_count: u64,
    pub stream_size: u64,
    pub language: Option<String>,
}

impl TrackInfo {
    pub fn kind(&self) -> TrackKind {
        match self.handler.as_ref() {
            Some(b"vide") => TrackKind::Video,
            Some(b"soun") => TrackKind::Audio,
            Some(b"text") | Some(b"sbtl") | Some(b"subt") => TrackKind::Text,
            _ => TrackKind::Other,
        }
    }

    pub fn duration_secs(&self) -> Option<f64> {
        (self.timescale > 0 && self.duration > 0)
            .then(|| self.duration as f64 / f64::from(self.timescale))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct MovieInfo {
    pub timescale: u32,
    pub duration: u64,
    pub tracks: Vec<TrackInfo>,
    pub title: Option<String>,
    pub cover: Option<Vec<u8>>,
}

impl MovieInfo {
    pub fn duration_secs(&self) -> Option<f64> {
        (self.timescale > 0 && self.duration > 0)
            .then(|| self.duration as f64 / f64::from(self.timescale))
    }
}

/// Parses the body of a `moov` box. Missing or truncated children are skipped.
pub(crate) fn parse_moov(moov: &[u8]) -> MovieInfo {
    let mut movie = MovieInfo::default();
    if let Some(mvhd) = find(moov, b"mvhd") {
        if let Some((timescale, duration)) = parse_time_header(mvhd) {
            movie.timescale = timescale;
            movie.duration = duration;
        }
    }
    movie.tracks = children(moov)
        .filter(|(kind, _)| kind == b"trak")
        .map(|(_, trak)| parse_trak(trak))
        .collect();
    if let Some(ilst) = find_path(moov, &[b"udta", b"meta"]).and_then(|meta| {
        // `meta` is a full box: 4 bytes of version/flags precede its children.
        find(meta.get(4..)?, b"ilst")
    }) {
        movie.title = ilst_data(ilst, &[0xa9, b'n', b'a', b'm'])
            .map(|d| String::from_utf8_lossy(d).into_owned());
        movie.cover = ilst_data(ilst, b"covr").map(<[u8]>::to_vec);
    }
    movie
}

/// `(timescale, duration)` of an `mvhd` or `mdhd` body.
fn parse_time_header(body: &[u8]) -> Option<(u32, u64)> {
    match body.first()? {
        1 => Some((be_u32(body, 20)?, be_u64(body, 24)?)),
        _ => Some((be_u32(body, 12)?, u64::from(be_u32(body, 16)?))),
    }
}

fn parse_trak(trak: &[u8]) -> TrackInfo {
    let mut t = TrackInfo::default();
    if let Some(tkhd) = find(trak, b"tkhd") {
        let version = tkhd.first().copied().unwrap_or(0);
        let id_at = if version == 1 { 20 } else { 12 };
        t.id = be_u32(tkhd, id_at).unwrap_or(0);
        // Width and height are 16.16 fixed point in the last 8 bytes.
        if tkhd.len() >= 8 {
            let at = tkhd.len() - 8;
            t.width = be_u32(tkhd, at).unwrap_or(0) >> 16;
            t.height = be_u32(tkhd, at + 4).unwrap_or(0) >> 16;
        }
    }
    let mdia = match find(trak, b"mdia") {
        Some(m) => m,
        None => return t,
    };
    if let Some(mdhd) = find(mdia, b"mdhd") {
        if let Some((timescale, duration)) = parse_time_header(mdhd) {
            t.timescale = timescale;
            t.duration = duration;
        }
        let lang_at = if mdhd.first() == Some(&1) { 32 } else { 20 };
        t.language = be_u16(mdhd, lang_at).and_then(decode_language);
    }
    if let Some(hdlr) = find(mdia, b"hdlr") {
        t.handler = hdlr.get(8..12).and_then(|h| h.try_into().ok());
    }
    if let Some(stbl) = find_path(mdia, &[b"minf", b"stbl"]) {
        parse_stbl(stbl, &mut t);
    }
    t
}

fn parse_stbl(stbl: &[u8], t: &mut TrackInfo) {
    if let Some(stsd) = find(stbl, b"stsd") {
        // version/flags (4) + entry count (4), then sample entries as boxes.
        if let Some((codec, entry)) = stsd.get(8..).and_then(|e| children(e).next()) {
            t.codec = Some(codec);
            match t.kind() {
                TrackKind::Video => {
                    // 6 reserved + 2 data ref index + 16 pre-defined, then width/height.
                    let w = be_u16(entry, 24).map(u32::from).unwrap_or(0);
                    let h = be_u16(entry, 26).map(u32::from).unwrap_or(0);
                    if t.width == 0 {
                        t.width = w;
                    }
                    if t.height == 0 {
                        t.height = h;
                    }
                }
                TrackKind::Audio => {
                    t.channels = be_u16(entry, 16).unwrap_or(0);
                    t.sample_size = be_u16(entry, 18).unwrap_or(0);
                    t.sample_rate = be_u32(entry, 24).unwrap_or(0) >> 16;
                }
                TrackKind::Text | TrackKind::Other => {}
            }
        }
    }
    if let Some(stts) = find(stbl, b"stts") {
        let entries = be_u32(stts, 4).unwrap_or(0) as usize;
        t.sample_count = (0..entries)
            .map_while(|i| be_u32(stts, 8 + i * 8))
            .map(u64::from)
            .sum();
    }
    if let Some(stsz) = find(stbl, b"stsz") {
        let uniform = be_u32(stsz, 4).unwrap_or(0);
        let count = be_u32(stsz, 8).unwrap_or(0) as usize;
        t.stream_size = if uniform != 0 {
            u64::from(uniform) * count as u64
        } else {
            (0..count)
                .map_while(|i| be_u32(stsz, 12 + i * 4))
                .map(u64::from)
                .sum()
        };
    }
}

/// ISO-639-2/T code packed as three 5-bit letters.
fn decode_language(packed: u16) -> Option<String> {
    let letters: String = [10u16, 5, 0]
        .iter()
        .map(|shift| (((packed >> shift) & 0x1f) as u8 + 0x60) as char)
        .collect();
    if letters.chars().all(|c| c.is_ascii_lowercase()) && letters != "und" {
        Some(letters)
    } else {
        None
    }
}

/// Payload of the `data` child of an `ilst` item, after its 8-byte type/locale prefix.
fn ilst_data<'a>(ilst: &'a [u8], item: &[u8; 4]) -> Option<&'a [u8]> {
    let data = find(find(ilst, item)?, b"data")?;
    data.get(8..).filter(|d| !d.is_empty())
}

/// Human-readable format name for a sample entry type.
pub(crate) fn codec_format(codec: &[u8; 4]) -> String {
    match codec {
        b"avc1" | b"avc3" => "AVC",
        b"hvc1" | b"hev1" => "HEVC",
        b"av01" => "AV1",
        b"vp08" => "VP8",
        b"vp09" => "VP9",
        b"mp4v" => "MPEG-4 Visual",
        b"mp4a" => "AAC",
        b"ac-3" => "AC-3",
        b"ec-3" => "E-AC-3",
        b"Opus" => "Opus",
        b"fLaC" => "FLAC",
        b"alac" => "ALAC",
        b".mp3" => "MPEG Audio",
        b"tx3g" => "Timed Text",
        b"wvtt" => "WebVTT",
        b"jpeg" => "JPEG",
        other => return fourcc(other),
    }
    .to_string()
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_movie_and_tracks() {
        let moov = fixtures::movie(&[]);
        let movie = parse_moov(&moov[8..]);
        assert_eq!(movie.duration_secs(), Some(10.0));
        assert_eq!(movie.tracks.len(), 2);

        let v = &movie.tracks[0];
        assert_eq!(v.kind(), TrackKind::Video);
        assert_eq!(v.codec, Some(*b"avc1"));
        assert_eq!((v.width, v.height), (1280, 720));
        assert_eq!(v.sample_count, 250);
        assert_eq!(v.duration_secs(), Some(10.0));
        assert_eq!(v.language.as_deref(), Some("eng"));

        let a = &movie.tracks[1];
        assert_eq!(a.kind(), TrackKind::Audio);
        assert_eq!(a.channels, 2);
        assert_eq!(a.sample_rate, 48_000);
        assert_eq!(a.stream_size, 469 * 200);
    }

    #[test]
    fn reads_cover_art() {
        let moov = fixtures::movie(&fixtures::cover_udta(b"\x89PNG-bytes"));
        let movie = parse_moov(&moov[8..]);
        assert_eq!(movie.cover.as_deref(), Some(&b"\x89PNG-bytes"[..]));
    }

    #[test]
    fn codec_names() {
        assert_eq!(codec_format(b"hev1"), "HEVC");
        assert_eq!(codec_format(b"zzzz"), "zzzz");
    }

    #[test]
    fn language_decoding() {
        assert_eq!(decode_language(0x15c7).as_deref(), Some("eng"));
        assert_eq!(decode_language(0x55c4), None); // "und"
    }
}
