//! Report model and its JSON, XML, HTML and text renderings.
//!
//! Every value is a string, as engines of this kind report them; callers that
//! want numbers run the JSON through [`crate::normalize`].

use super::moov::{codec_format, MovieInfo, TrackInfo, TrackKind};
use base64::Engine as _;
use serde_json::{Map, Value};
use std::fmt::Write as _;

/// Rendering selected by the core's `output` option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum Output {
    #[default]
    Json,
    Xml,
    Html,
    Text,
}

impl Output {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Some(Output::Json),
            "xml" => Some(Output::Xml),
            "html" => Some(Output::Html),
            "text" | "" => Some(Output::Text),
            _ => None,
        }
    }
}

type Fields = Vec<(&'static str, String)>;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TrackReport {
    pub kind: &'static str,
    pub fields: Fields,
    /// Detail fields, only filled in complete mode.
    pub extra: Fields,
}

impl TrackReport {
    fn new(kind: &'static str) -> Self {
        Self {
            kind,
            fields: Vec::new(),
            extra: Vec::new(),
        }
    }

    fn push(&mut self, name: &'static str, value: impl ToString) {
        self.fields.push((name, value.to_string()));
    }

    fn push_opt<T: ToString>(&mut self, name: &'static str, value: Option<T>) {
        if let Some(v) = value {
            self.push(name, v);
        }
    }
}

/// What the core learned, in reporting form.
#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct MediaReport {
    pub tracks: Vec<TrackReport>,
}

/// Inputs besides the parsed movie.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ReportInput<'a> {
    pub file_size: Option<u64>,
    pub brand: Option<[u8; 4]>,
    /// `moov` precedes `mdat`, so playback can start before the download ends.
    pub streamable: Option<bool>,
    pub cover: bool,
    pub complete: bool,
    pub format_name: Option<&'a str>,
}

fn secs(v: f64) -> String {
    format!("{:.3}", v)
}

fn bit_rate(bytes: u64, duration: Option<f64>) -> Option<u64> {
    duration
        .filter(|d| *d > 0.0 && bytes > 0)
        .map(|d| (bytes as f64 * 8.0 / d).round() as u64)
}

fn profile(brand: &[u8; 4]) -> &'static str {
    match brand {
        b"qt  " => "QuickTime",
        b"isom" | b"iso2" | b"iso4" | b"iso5" | b"iso6" => "Base Media",
        b"mp41" => "Base Media / Version 1",
        b"mp42" => "Base Media / Version 2",
        b"M4A " => "Apple audio",
        b"M4V " => "Apple video",
        b"3gp4" | b"3gp5" | b"3gp6" => "3GPP Media",
        b"dash" => "DASH",
        _ => "",
    }
}

impl MediaReport {
    /// General track only; used for containers the core does not walk.
    pub fn general_only(input: &ReportInput<'_>) -> Self {
        let mut general = TrackReport::new("General");
        general.push_opt("Format", input.format_name);
        general.push_opt("FileSize", input.file_size);
        Self {
            tracks: vec![general],
        }
    }

    pub fn from_movie(movie: &MovieInfo, input: &ReportInput<'_>) -> Self {
        let count = |k: TrackKind| movie.tracks.iter().filter(|t| t.kind() == k).count();
        let duration = movie
            .duration_secs()
            .or_else(|| movie.tracks.iter().filter_map(TrackInfo::duration_secs).reduce(f64::max));

        let mut general = TrackReport::new("General");
        for (name, kind) in [
            ("VideoCount", TrackKind::Video),
            ("AudioCount", TrackKind::Audio),
            ("TextCount", TrackKind::Text),
        ] {
            let n = count(kind);
            if n > 0 {
                general.push(name, n);
            }
        }
        general.push("Format", input.format_name.unwrap_or("MPEG-4"));
        if let Some(brand) = input.brand.as_ref() {
            let p = profile(brand);
            if !p.is_empty() {
                general.push("Format_Profile", p);
            }
            if input.complete {
                general.push("CodecID", super::boxes::fourcc(brand).trim_end().to_string());
            }
        }
        general.push_opt("FileSize", input.file_size);
        general.push_opt("Duration", duration.map(secs));
        general.push_opt(
            "OverallBitRate",
            input.file_size.and_then(|s| bit_rate(s, duration)),
        );
        general.push_opt("Title", movie.title.as_deref());
        if let Some(cover) = movie.cover.as_deref() {
            general.push("Cover", "Yes");
            if input.cover {
                general.push(
                    "Cover_Data",
                    base64::engine::general_purpose::STANDARD.encode(cover),
                );
            }
        }
        if input.complete {
            if let Some(s) = input.streamable {
                general
                    .extra
                    .push(("IsStreamable", if s { "Yes" } else { "No" }.to_string()));
            }
        }

        let mut tracks = vec![general];
        tracks.extend(
            movie
                .tracks
                .iter()
                .filter(|t| t.kind() != TrackKind::Other)
                .map(|t| track_report(t, input.complete)),
        );
        Self { tracks }
    }

    pub fn render(&self, output: Output) -> String {
        match output {
            Output::Json => self.to_json(),
            Output::Xml => self.to_xml(),
            Output::Html => self.to_html(),
            Output::Text => self.to_text(),
        }
    }

    fn to_json(&self) -> String {
        let tracks: Vec<Value> = self
            .tracks
            .iter()
            .map(|t| {
                let mut obj = Map::new();
                obj.insert("@type".to_string(), Value::from(t.kind));
                for (k, v) in &t.fields {
                    obj.insert(k.to_string(), Value::from(v.as_str()));
                }
                if !t.extra.is_empty() {
                    let extra: Map<String, Value> = t
                        .extra
                        .iter()
                        .map(|(k, v)| (k.to_string(), Value::from(v.as_str())))
                        .collect();
                    obj.insert("extra".to_string(), Value::Object(extra));
                }
                Value::Object(obj)
            })
            .collect();
        serde_json::json!({ "media": { "track": tracks } }).to_string()
    }

    fn to_xml(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<MediaInfo version=\"2.0\">\n<media>\n");
        for t in &self.tracks {
            let _ = writeln!(out, "<track type=\"{}\">", t.kind);
            for (k, v) in &t.fields {
                let _ = writeln!(out, "<{k}>{}</{k}>", escape_markup(v));
            }
            if !t.extra.is_empty() {
                out.push_str("<extra>\n");
                for (k, v) in &t.extra {
                    let _ = writeln!(out, "<{k}>{}</{k}>", escape_markup(v));
                }
                out.push_str("</extra>\n");
            }
            out.push_str("</track>\n");
        }
        out.push_str("</media>\n</MediaInfo>\n");
        out
    }

    fn to_html(&self) -> String {
        let mut out = String::from("<html>\n<head><meta charset=\"utf-8\"></head>\n<body>\n");
        for (title, t) in self.titled() {
            let _ = writeln!(
                out,
                "<table width=\"100%\" border=\"0\" cellpadding=\"1\" cellspacing=\"2\">\n<tr><td><h2>{}</h2></td></tr>",
                escape_markup(&title)
            );
            for (k, v) in t.fields.iter().chain(&t.extra) {
                let _ = writeln!(
                    out,
                    "<tr><td><i>{} :</i></td><td colspan=\"3\">{}</td></tr>",
                    k,
                    escape_markup(v)
                );
            }
            out.push_str("</table>\n<br />\n");
        }
        out.push_str("</body>\n</html>\n");
        out
    }

    fn to_text(&self) -> String {
        let mut blocks = Vec::with_capacity(self.tracks.len());
        for (title, t) in self.titled() {
            let mut block = title;
            for (k, v) in t.fields.iter().chain(&t.extra) {
                let _ = write!(block, "\n{:<41}: {}", k, v);
            }
            blocks.push(block);
        }
        let mut out = blocks.join("\n\n");
        out.push('\n');
        out
    }

    /// Tracks with display titles; kinds that repeat are numbered.
    fn titled(&self) -> impl Iterator<Item = (String, &TrackReport)> {
        let mut seen: Vec<&'static str> = Vec::new();
        self.tracks.iter().map(move |t| {
            let total = self.tracks.iter().filter(|o| o.kind == t.kind).count();
            seen.push(t.kind);
            let nth = seen.iter().filter(|k| **k == t.kind).count();
            let title = if total > 1 {
                format!("{} #{}", t.kind, nth)
            } else {
                t.kind.to_string()
            };
            (title, t)
        })
    }
}

fn track_report(t: &TrackInfo, complete: bool) -> TrackReport {
    let kind = match t.kind() {
        TrackKind::Video => "Video",
        TrackKind::Audio => "Audio",
        _ => "Text",
    };
    let mut r = TrackReport::new(kind);
    let duration = t.duration_secs();
    r.push("ID", t.id);
    r.push_opt("Format", t.codec.as_ref().map(codec_format));
    if complete {
        r.push_opt(
            "CodecID",
            t.codec.as_ref().map(|c| super::boxes::fourcc(c)),
        );
    }
    r.push_opt("Duration", duration.map(secs));
    r.push_opt("BitRate", bit_rate(t.stream_size, duration));

    match t.kind() {
        TrackKind::Video => {
            if t.width > 0 && t.height > 0 {
                r.push("Width", t.width);
                r.push("Height", t.height);
                r.push(
                    "DisplayAspectRatio",
                    secs(f64::from(t.width) / f64::from(t.height)),
                );
            }
            let rate = duration
                .filter(|d| *d > 0.0 && t.sample_count > 0)
                .map(|d| t.sample_count as f64 / d);
            r.push_opt("FrameRate", rate.map(secs));
            if t.sample_count > 0 {
                r.push("FrameCount", t.sample_count);
            }
        }
        TrackKind::Audio => {
            if t.channels > 0 {
                r.push("Channels", t.channels);
            }
            if t.sample_rate > 0 {
                r.push("SamplingRate", t.sample_rate);
            }
            if t.sample_size > 0 {
                r.push("BitDepth", t.sample_size);
            }
            if complete && t.sample_count > 0 {
                r.push("FrameCount", t.sample_count);
            }
        }
        _ => {}
    }
    if complete && t.stream_size > 0 {
        r.push("StreamSize", t.stream_size);
    }
    r.push_opt("Language", t.language.as_deref());
    if complete && t.timescale > 0 {
        r.extra.push(("TimeScale", t.timescale.to_string()));
    }
    r
}

fn escape_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::super::moov::{fixtures, parse_moov};
    use super::*;

    fn sample(complete: bool, cover: bool) -> MediaReport {
        let moov = fixtures::movie(&fixtures::cover_udta(b"img"));
        let movie = parse_moov(&moov[8..]);
        MediaReport::from_movie(
            &movie,
            &ReportInput {
                file_size: Some(1_250_000),
                brand: Some(*b"isom"),
                streamable: Some(false),
                cover,
                complete,
                format_name: None,
            },
        )
    }

    #[test]
    fn json_has_typed_tracks_in_order() {
        let v: Value = serde_json::from_str(&sample(false, false).render(Output::Json)).unwrap();
        let tracks = v["media"]["track"].as_array().unwrap();
        let kinds: Vec<&str> = tracks.iter().map(|t| t["@type"].as_str().unwrap()).collect();
        assert_eq!(kinds, ["General", "Video", "Audio"]);
        assert_eq!(tracks[0]["Format"], "MPEG-4");
        assert_eq!(tracks[0]["Format_Profile"], "Base Media");
        assert_eq!(tracks[0]["Duration"], "10.000");
        assert_eq!(tracks[0]["OverallBitRate"], "1000000");
        assert_eq!(tracks[0]["Cover"], "Yes");
        assert!(tracks[0].get("Cover_Data").is_none());
        assert_eq!(tracks[1]["Width"], "1280");
        assert_eq!(tracks[1]["FrameRate"], "25.000");
        assert_eq!(tracks[2]["SamplingRate"], "48000");
        assert!(tracks[1].get("extra").is_none());
    }

    #[test]
    fn cover_and_complete_mode() {
        let v: Value = serde_json::from_str(&sample(true, true).render(Output::Json)).unwrap();
        let general = &v["media"]["track"][0];
        assert_eq!(general["Cover_Data"], "aW1n");
        assert_eq!(general["CodecID"], "isom");
        assert_eq!(general["extra"]["IsStreamable"], "No");
        assert_eq!(v["media"]["track"][1]["StreamSize"], "250000");
    }

    #[test]
    fn text_rendering() {
        let text = sample(false, false).render(Output::Text);
        assert!(text.starts_with("General\n"));
        assert!(text.contains("\n\nVideo\n"));
        assert!(text.contains(&format!("{:<41}: 720", "Height")));
    }

    #[test]
    fn markup_renderings_escape_values() {
        let mut general = TrackReport::new("General");
        general.push("Title", "A <b> & \"c\"");
        let report = MediaReport {
            tracks: vec![general],
        };
        let xml = report.render(Output::Xml);
        assert!(xml.contains("<Title>A &lt;b&gt; &amp; &quot;c&quot;</Title>"));
        assert!(report.render(Output::Html).contains("A &lt;b&gt;"));
    }

    #[test]
    fn repeated_kinds_are_numbered() {
        let report = MediaReport {
            tracks: vec![
                TrackReport::new("General"),
                TrackReport::new("Audio"),
                TrackReport::new("Audio"),
            ],
        };
        let text = report.render(Output::Text);
        assert!(text.contains("Audio #1"));
        assert!(text.contains("Audio #2"));
    }
}
