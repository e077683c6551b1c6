//! ISO-BMFF box headers and big-endian field readers.

/// Box header: type, header length and total size (`None` = extends to end of file).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BoxHeader {
    pub kind: [u8; 4],
    pub header_len: u64,
    pub size: Option<u64>,
}

impl BoxHeader {
    pub fn is(&self, kind: &[u8; 4]) -> bool {
        &self.kind == kind
    }
}

/// Parses the header at the start of `buf`.
///
/// `Ok(None)` means more bytes are needed; `Err` means the size field is invalid.
pub(crate) fn parse_header(buf: &[u8]) -> Result<Option<BoxHeader>, String> {
    if buf.len() < 8 {
        return Ok(None);
    }
    let size32 = be_u32(buf, 0).unwrap_or(0);
    let kind = [buf[4], buf[5], buf[6], buf[7]];
    let (header_len, size) = match size32 {
        0 => (8, None),
        1 => match be_u64(buf, 8) {
            Some(ext) => (16, Some(ext)),
            None => return Ok(None),
        },
        n => (8, Some(u64::from(n))),
    };
    if let Some(size) = size {
        if size < header_len {
            return Err(format!(
                "box {} has size {} below its header length",
                fourcc(&kind),
                size
            ));
        }
    }
    Ok(Some(BoxHeader {
        kind,
        header_len,
        size,
    }))
}

/// Iterates over the complete child boxes inside `data`, yielding `(type, body)`.
/// Stops at the first truncated or malformed child.
pub(crate) fn children(data: &[u8]) -> impl Iterator<Item = ([u8; 4], &[u8])> {
    let mut pos = 0usize;
    std::iter::from_fn(move || {
        let header = parse_header(data.get(pos..)?).ok()??;
        let start = pos + header.header_len as usize;
        let end = match header.size {
            Some(size) => pos.checked_add(usize::try_from(size).ok()?)?,
            None => data.len(),
        };
        if end > data.len() || start > end {
            return None;
        }
        pos = end;
        Some((header.kind, &data[start..end]))
    })
}

/// First child of `data` with the given type.
pub(crate) fn find<'a>(data: &'a [u8], kind: &[u8; 4]) -> Option<&'a [u8]> {
    children(data).find(|(k, _)| k == kind).map(|(_, body)| body)
}

/// Follows a path of nested box types.
pub(crate) fn find_path<'a>(data: &'a [u8], path: &[&[u8; 4]]) -> Option<&'a [u8]> {
    path.iter().try_fold(data, |cur, kind| find(cur, kind))
}

pub(crate) fn be_u16(buf: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes(buf.get(at..at + 2)?.try_into().ok()?))
}

pub(crate) fn be_u32(buf: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_be_bytes(buf.get(at..at + 4)?.try_into().ok()?))
}

pub(crate) fn be_u64(buf: &[u8], at: usize) -> Option<u64> {
    Some(u64::from_be_bytes(buf.get(at..at + 8)?.try_into().ok()?))
}

/// Printable form of a four-character code.
pub(crate) fn fourcc(kind: &[u8; 4]) -> String {
    kind.iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '?' })
        .collect::<String>()
        .trim_end()
        .to_string()
}

#[cfg(test)]
pub(crate) fn make_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    out
}
