//! Synthetic MP4 files: `ftyp`, a large `mdat`, and a trailing `moov` with one
//! 640x360 video track lasting 4 seconds.

fn mp4_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    let mut out = ((body.len() + 8) as u32).to_be_bytes().to_vec();
    out.extend_from_slice(kind);
    out.extend_from_slice(body);
    out
}

fn full_box(kind: &[u8; 4], body: &[u8]) -> Vec<u8> {
    mp4_box(kind, &[&[0u8; 4][..], body].concat())
}

fn be(values: &[u32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_be_bytes()).collect()
}

pub fn moov() -> Vec<u8> {
    let mvhd = full_box(b"mvhd", &[be(&[0, 0, 1000, 4000]), vec![0u8; 80]].concat());
    let tkhd = full_box(
        b"tkhd",
        &[be(&[0, 0, 1]), vec![0u8; 60], be(&[640 << 16, 360 << 16])].concat(),
    );
    let mdhd = full_box(b"mdhd", &be(&[0, 0, 90_000, 360_000, 0x55c4_0000]));
    let hdlr = full_box(b"hdlr", &[be(&[0]), b"vide".to_vec(), vec![0u8; 13]].concat());
    let mut entry = vec![0u8; 24];
    entry.extend_from_slice(&640u16.to_be_bytes());
    entry.extend_from_slice(&360u16.to_be_bytes());
    entry.extend_from_slice(&[0u8; 50]);
    let stsd = full_box(b"stsd", &[be(&[1]), mp4_box(b"avc1", &entry)].concat());
    // 100 frames of 3600 ticks: 25 fps.
    let stts = full_box(b"stts", &be(&[1, 100, 3600]));
    let stsz = full_box(b"stsz", &be(&[5000, 100]));
    let stbl = mp4_box(b"stbl", &[stsd, stts, stsz].concat());
    let minf = mp4_box(b"minf", &stbl);
    let mdia = mp4_box(b"mdia", &[mdhd, hdlr, minf].concat());
    let trak = mp4_box(b"trak", &[tkhd, mdia].concat());
    mp4_box(b"moov", &[mvhd, trak].concat())
}

/// File with `mdat_len` payload bytes before the `moov`.
pub fn trailing_moov(mdat_len: usize) -> Vec<u8> {
    let ftyp = mp4_box(b"ftyp", b"isom\0\0\x02\0isomiso2avc1mp41");
    let mdat = mp4_box(b"mdat", &vec![0x5a; mdat_len]);
    [ftyp, mdat, moov()].concat()
}

/// Offset of the `moov` box in [`trailing_moov`] output.
pub fn moov_offset(mdat_len: usize) -> u64 {
    (8 + 24 + 8 + mdat_len) as u64
}
