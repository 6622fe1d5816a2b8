//! The kbinxml type table: a flat, position-indexed catalogue keyed by the
//! `xml_type` byte (with the array flag already masked off by the caller).
//!
//! This is deliberately a `const` array plus a lookup function rather than a
//! trait hierarchy — the decode loop dispatches on `ElementCode` with a flat
//! match, matching the source's table-of-structs approach.

pub const NODE_START: u8 = 1;
pub const BINARY: u8 = 10;
pub const STRING: u8 = 11;
pub const ATTR: u8 = 46;
pub const NODE_END: u8 = 190;
pub const END_SECTION: u8 = 191;

pub const ARRAY_FLAG: u8 = 0x40;

/// The scalar or vector element format carried by a typed leaf. `Binary` and
/// `String` are the two variable-width (`count == -1`) entries; everything
/// else is a fixed-width tuple of `count` scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementCode {
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
    S64,
    U64,
    F32,
    F64,
    Ipv4,
    Binary,
    StringT,
}

#[derive(Debug, Clone, Copy)]
pub struct TypeEntry {
    pub name: &'static str,
    /// `> 0`: fixed tuple width. `-1`: variable width (u32 length prefix).
    pub count: i16,
    pub code: ElementCode,
}

macro_rules! entry {
    ($name:expr, $count:expr, $code:expr) => {
        Some(TypeEntry {
            name: $name,
            count: $count,
            code: $code,
        })
    };
}

/// Position-indexed table, `xml_type` (post array-mask) as the index.
/// `None` marks reserved/structural slots that are never looked up directly
/// (`NODE_START`, `ATTR`, `NODE_END`, `END_SECTION` are handled structurally
/// before a table lookup happens).
const TABLE: [Option<TypeEntry>; 57] = [
    None,                                            // 0: unused
    None,                                            // 1: NODE_START (structural)
    entry!("s8", 1, ElementCode::S8),                // 2
    entry!("u8", 1, ElementCode::U8),                // 3
    entry!("s16", 1, ElementCode::S16),               // 4
    entry!("u16", 1, ElementCode::U16),               // 5
    entry!("s32", 1, ElementCode::S32),               // 6
    entry!("u32", 1, ElementCode::U32),               // 7
    entry!("s64", 1, ElementCode::S64),               // 8
    entry!("u64", 1, ElementCode::U64),               // 9
    entry!("bin", -1, ElementCode::Binary),           // 10: BINARY
    entry!("str", -1, ElementCode::StringT),          // 11: STRING
    entry!("ip4", 1, ElementCode::Ipv4),              // 12
    entry!("time", 1, ElementCode::U32),              // 13
    entry!("float", 1, ElementCode::F32),             // 14
    entry!("double", 1, ElementCode::F64),            // 15
    entry!("2s8", 2, ElementCode::S8),                // 16
    entry!("2u8", 2, ElementCode::U8),                // 17
    entry!("2s16", 2, ElementCode::S16),              // 18
    entry!("2u16", 2, ElementCode::U16),              // 19
    entry!("2s32", 2, ElementCode::S32),              // 20
    entry!("2u32", 2, ElementCode::U32),              // 21
    entry!("2s64", 2, ElementCode::S64),              // 22
    entry!("2u64", 2, ElementCode::U64),              // 23
    entry!("2f", 2, ElementCode::F32),                // 24
    entry!("2d", 2, ElementCode::F64),                // 25
    entry!("3s8", 3, ElementCode::S8),                // 26
    entry!("3u8", 3, ElementCode::U8),                // 27
    entry!("3s16", 3, ElementCode::S16),              // 28
    entry!("3u16", 3, ElementCode::U16),              // 29
    entry!("3s32", 3, ElementCode::S32),              // 30
    entry!("3u32", 3, ElementCode::U32),              // 31
    entry!("3s64", 3, ElementCode::S64),              // 32
    entry!("3u64", 3, ElementCode::U64),              // 33
    entry!("3f", 3, ElementCode::F32),                // 34
    entry!("3d", 3, ElementCode::F64),                // 35
    entry!("4s8", 4, ElementCode::S8),                // 36
    entry!("4u8", 4, ElementCode::U8),                // 37
    entry!("4s16", 4, ElementCode::S16),              // 38
    entry!("4u16", 4, ElementCode::U16),              // 39
    entry!("4s32", 4, ElementCode::S32),              // 40
    entry!("4u32", 4, ElementCode::U32),              // 41
    entry!("4s64", 4, ElementCode::S64),              // 42
    entry!("4u64", 4, ElementCode::U64),              // 43
    entry!("4f", 4, ElementCode::F32),                // 44
    entry!("4d", 4, ElementCode::F64),                // 45
    None,                                             // 46: ATTR (structural)
    None,                                             // 47: unused (legacy "array" slot)
    entry!("vs8", 16, ElementCode::S8),               // 48
    entry!("vu8", 16, ElementCode::U8),               // 49
    entry!("vs16", 8, ElementCode::S16),              // 50
    entry!("vu16", 8, ElementCode::U16),              // 51
    entry!("bool", 1, ElementCode::S8),               // 52
    entry!("2b", 2, ElementCode::S8),                 // 53
    entry!("3b", 3, ElementCode::S8),                 // 54
    entry!("4b", 4, ElementCode::S8),                 // 55
    entry!("vb", 16, ElementCode::S8),                // 56
];

/// Looks up the table entry for a masked `xml_type`. Returns `None` for
/// reserved slots and anything outside the table's range — the caller must
/// fail the whole decode in that case.
pub fn lookup(xml_type: u8) -> Option<TypeEntry> {
    TABLE.get(xml_type as usize).copied().flatten()
}
