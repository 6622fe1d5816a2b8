//! Chart blob layout and the note-counting event scan.
//!
//! A chart blob is a fixed twelve-entry header of `(offset, length)` pairs
//! followed by per-chart event streams. Everything here is little-endian
//! and the event scan never fails — malformed charts simply count as zero.

use crate::error::NoteCountError;
use crate::stream::{ByteStream, Endian};

pub const MAX_CHART_COUNT: usize = 12;
const HEADER_ENTRY_LEN: u32 = 8;
const HEADER_LEN: u32 = HEADER_ENTRY_LEN * MAX_CHART_COUNT as u32;
const TERMINATOR: u32 = 0x7FFF_FFFF;

/// The twelve chart slots. Values 4, 5, 9, 10, 11 are legal array positions
/// that are simply never populated by the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ChartId {
    Sph = 0,
    Spn = 1,
    Spa = 2,
    Spb = 3,
    Dph = 6,
    Dpn = 7,
    Dpa = 8,
}

impl From<ChartId> for usize {
    fn from(id: ChartId) -> usize {
        id as usize
    }
}

impl TryFrom<usize> for ChartId {
    type Error = NoteCountError;

    /// Rejects out-of-range indices and the three unused gap positions
    /// (4, 5, 9, 10, 11) the same way.
    fn try_from(value: usize) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChartId::Sph),
            1 => Ok(ChartId::Spn),
            2 => Ok(ChartId::Spa),
            3 => Ok(ChartId::Spb),
            6 => Ok(ChartId::Dph),
            7 => Ok(ChartId::Dpn),
            8 => Ok(ChartId::Dpa),
            _ => Err(NoteCountError::InvalidParam),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct ChartEntry {
    offset: u32,
    length: u32,
}

/// Reads the twelve `(offset, length)` header entries from the start of a
/// chart blob. Returns `None` if the blob is too short to hold the header.
fn read_header(blob: &[u8]) -> Option<[ChartEntry; MAX_CHART_COUNT]> {
    if (blob.len() as u32) < HEADER_LEN {
        return None;
    }
    let mut stream = ByteStream::open(blob);
    stream.set_endian(Endian::Little);

    let mut entries = [ChartEntry { offset: 0, length: 0 }; MAX_CHART_COUNT];
    for entry in entries.iter_mut() {
        entry.offset = stream.read_u32();
        entry.length = stream.read_u32();
    }
    Some(entries)
}

/// Counts notes in a single chart's raw event bytes.
///
/// A chart whose length is zero or not a positive multiple of eight is
/// treated as empty (count 0), not an error. The scan stops at the first
/// record whose `time` equals the terminator `0x7FFFFFFF`.
pub fn count_events(chart_bytes: &[u8]) -> u32 {
    let len = chart_bytes.len() as u32;
    if len == 0 || len % HEADER_ENTRY_LEN != 0 {
        return 0;
    }

    let mut stream = ByteStream::open(chart_bytes);
    stream.set_endian(Endian::Little);

    let mut count = 0u32;
    while !stream.at_end() {
        let time = stream.read_u32();
        let event_type = stream.read_u8();
        let _param = stream.read_u8();
        let value = stream.read_u16();

        if time == TERMINATOR {
            break;
        }
        if event_type == 0x00 || event_type == 0x01 {
            count += 1;
            if value > 0 {
                count += 1;
            }
        }
    }
    count
}

/// Counts notes for a single chart slot within a whole blob. Out-of-range
/// `chart` indices return `-1`; absent or malformed charts return `0`.
pub fn count_chart(blob: &[u8], chart: usize) -> i32 {
    if chart >= MAX_CHART_COUNT {
        return -1;
    }
    let header = match read_header(blob) {
        Some(h) => h,
        None => return 0,
    };
    let entry = header[chart];
    chart_bytes(blob, entry).map(count_events).unwrap_or(0) as i32
}

/// Counts notes for all twelve chart slots.
pub fn count_all_charts(blob: &[u8]) -> [i32; MAX_CHART_COUNT] {
    let mut counts = [0i32; MAX_CHART_COUNT];
    let header = match read_header(blob) {
        Some(h) => h,
        None => return counts,
    };
    for (i, entry) in header.iter().enumerate() {
        counts[i] = chart_bytes(blob, *entry).map(count_events).unwrap_or(0) as i32;
    }
    counts
}

fn chart_bytes(blob: &[u8], entry: ChartEntry) -> Option<&[u8]> {
    if entry.offset == 0 || entry.length == 0 {
        return None;
    }
    let start = entry.offset as usize;
    let end = start.checked_add(entry.length as usize)?;
    blob.get(start..end)
}
