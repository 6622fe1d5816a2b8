//! Decoder for the kbinxml binary-XML format: two big-endian sections (node,
//! data) describing a rooted tagged tree with typed leaves.
//!
//! The decoder fails softly — [`decode`] returns `None` rather than an error
//! for any malformed input, mirroring the source's `mxml_node_t * | NULL`
//! contract. Callers that need a typed error (the ifs extractor does)
//! translate absence into [`crate::error::NoteCountError::ManifestParseError`].

use crate::kbin_types::{self, ElementCode, ARRAY_FLAG, ATTR, END_SECTION, NODE_END, NODE_START};
use crate::sixbit;
use crate::stream::{ByteStream, Endian};

const HEADER_SIGNATURE: u8 = 0xA0;
const COMPRESSED_SIXBIT: u8 = 0x42;
const COMPRESSED_RAW: u8 = 0x45;

/// One node of the decoded tree. Attributes preserve insertion order and the
/// wire's duplicate-key tolerance (a `Vec`, not a map).
#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: Option<String>,
    pub children: Vec<Element>,
}

impl Element {
    fn leaf(name: String) -> Self {
        Element {
            name,
            attributes: Vec::new(),
            text: None,
            children: Vec::new(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn find_child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Walks a `/`-separated path of child names, starting from `self`.
    pub fn find_path(&self, path: &str) -> Option<&Element> {
        let mut cur = self;
        for part in path.split('/') {
            if part.is_empty() {
                continue;
            }
            cur = cur.find_child(part)?;
        }
        Some(cur)
    }
}

/// A decoded document: the single rooted tree produced by [`decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub root: Element,
}

impl Document {
    /// Resolves a path, tolerating whether `path`'s first segment names the
    /// root element itself or one of its children.
    pub fn find_path(&self, path: &str) -> Option<&Element> {
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let first = parts.next()?;
        let mut cur = if self.root.name == first {
            &self.root
        } else {
            self.root.find_child(first)?
        };
        for part in parts {
            cur = cur.find_child(part)?;
        }
        Some(cur)
    }
}

/// Decodes a kbinxml byte image into a tree, or `None` if the input fails
/// any structural check along the way.
pub fn decode(bytes: &[u8]) -> Option<Document> {
    if bytes.len() <= 8 {
        return None;
    }

    let mut node = ByteStream::open(bytes);
    node.set_endian(Endian::Big);

    let signature = node.read_u8();
    let compressed = node.read_u8();
    let encoding_key = node.read_u8();
    let not_encoding_key = node.read_u8();
    let node_section_length = node.read_u32();

    if signature != HEADER_SIGNATURE {
        return None;
    }
    if compressed != COMPRESSED_SIXBIT && compressed != COMPRESSED_RAW {
        return None;
    }
    if encoding_key ^ not_encoding_key != 0xFF {
        return None;
    }
    // The data section's own u32 length prefix must fit too, or the read
    // at data_cursor below would slice past the end of the buffer.
    if node.len() < node_section_length.checked_add(8)?.checked_add(4)? {
        return None;
    }

    let mut data = node.duplicate();
    data.set_offset(8u32.checked_add(node_section_length)?);
    let _data_section_length = data.read_u32(); // advisory, not used further

    // stack[0] is a synthetic container; stack[1] is the document root.
    let mut stack: Vec<Element> = vec![Element::leaf(String::new())];

    loop {
        while !node.at_end() && node.peek_u8() == 0 {
            node.read_u8();
        }
        if node.at_end() {
            return None;
        }

        let raw_type = node.read_u8();
        let is_array = raw_type & ARRAY_FLAG != 0;
        let xml_type = raw_type & !ARRAY_FLAG;

        if xml_type == NODE_END {
            if stack.len() <= 1 {
                return None;
            }
            let finished = stack.pop().unwrap();
            stack.last_mut().unwrap().children.push(finished);
            continue;
        }
        if xml_type == END_SECTION {
            break;
        }

        let entry = kbin_types::lookup(xml_type);
        if entry.is_none() && xml_type != NODE_START {
            return None;
        }

        let name = if compressed == COMPRESSED_SIXBIT {
            sixbit::unpack_name(&mut node)
        } else {
            let b = node.read_u8();
            let len = b & !ARRAY_FLAG;
            let raw = node.read_vec(len as u32);
            String::from_utf8_lossy(&raw).into_owned()
        };

        if xml_type == ATTR {
            let v_len = node.read_u32();
            let raw = node.read_vec(v_len);
            node.realign32();
            let value = String::from_utf8_lossy(&raw).into_owned();
            stack.last_mut().unwrap().attributes.push((name, value));
            continue;
        }

        stack.push(Element::leaf(name));

        if xml_type == NODE_START {
            continue;
        }

        let entry = entry.unwrap();
        {
            let cur = stack.last_mut().unwrap();
            cur.attributes
                .push(("__type".to_string(), entry.name.to_string()));
        }

        let vc: u32 = if entry.count == -1 {
            data.read_u32()
        } else {
            entry.count as u32
        };
        let ac: u32 = if is_array { data.read_u32() } else { 1 };
        if is_array {
            stack
                .last_mut()
                .unwrap()
                .attributes
                .push(("__count".to_string(), ac.to_string()));
        }
        let total = vc.checked_mul(ac)?;

        let text = format_value(&mut data, entry.code, total);
        if xml_type == kbin_types::BINARY {
            stack
                .last_mut()
                .unwrap()
                .attributes
                .push(("__size".to_string(), total.to_string()));
        }
        stack.last_mut().unwrap().text = text;
        data.realign32();
    }

    // Fold any elements left open at END_SECTION into their parents — the
    // wire does not require every element to see an explicit NODE_END
    // before the section ends.
    while stack.len() > 1 {
        let finished = stack.pop().unwrap();
        stack.last_mut().unwrap().children.push(finished);
    }
    let mut container = stack.pop().unwrap();
    if container.children.is_empty() {
        return None;
    }
    Some(Document {
        root: container.children.remove(0),
    })
}

fn join_decimal<F: FnMut() -> String>(total: u32, mut f: F) -> String {
    let mut parts = Vec::with_capacity(total as usize);
    for _ in 0..total {
        parts.push(f());
    }
    parts.join(" ")
}

/// Renders a typed leaf's payload as text per the wire's formatting rules,
/// advancing `data` past the bytes it consumes. Returns `None` for codes
/// that emit no text (IPv4).
fn format_value(data: &mut ByteStream, code: ElementCode, total: u32) -> Option<String> {
    match code {
        ElementCode::StringT => {
            let bytes = data.read_vec(total);
            Some(String::from_utf8_lossy(&bytes).into_owned())
        }
        ElementCode::Binary => {
            let bytes = data.read_vec(total);
            let mut s = String::with_capacity(bytes.len() * 2);
            for b in bytes {
                s.push_str(&format!("{:x}", b));
            }
            Some(s)
        }
        ElementCode::Ipv4 => {
            // Recognized but not decoded. The source leaves this branch
            // empty, which desyncs the data cursor for any field after an
            // IPv4 leaf; we consume the wire bytes here instead so decoding
            // can continue past it.
            data.read_vec(total.saturating_mul(4));
            None
        }
        ElementCode::S8 => Some(join_decimal(total, || (data.read_u8() as i8).to_string())),
        ElementCode::U8 => Some(join_decimal(total, || data.read_u8().to_string())),
        ElementCode::S16 => Some(join_decimal(total, || (data.read_u16() as i16).to_string())),
        ElementCode::U16 => Some(join_decimal(total, || data.read_u16().to_string())),
        ElementCode::S32 => Some(join_decimal(total, || (data.read_u32() as i32).to_string())),
        ElementCode::U32 => Some(join_decimal(total, || data.read_u32().to_string())),
        ElementCode::S64 => Some(join_decimal(total, || (data.read_u64() as i64).to_string())),
        ElementCode::U64 => Some(join_decimal(total, || data.read_u64().to_string())),
        ElementCode::F32 => Some(join_decimal(total, || format!("{:.6}", data.read_f32()))),
        ElementCode::F64 => Some(join_decimal(total, || format!("{:.6}", data.read_f64()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push_u8(buf: &mut Vec<u8>, v: u8) {
        buf.push(v);
    }
    fn push_u32_be(buf: &mut Vec<u8>, v: u32) {
        buf.extend_from_slice(&v.to_be_bytes());
    }

    fn raw_name(buf: &mut Vec<u8>, name: &str) {
        push_u8(buf, name.len() as u8);
        buf.extend_from_slice(name.as_bytes());
    }

    fn wrap_sections(node: Vec<u8>, data: Vec<u8>, compressed: u8) -> Vec<u8> {
        let mut out = Vec::new();
        push_u8(&mut out, 0xA0);
        push_u8(&mut out, compressed);
        push_u8(&mut out, 0x00);
        push_u8(&mut out, 0xFF);
        push_u32_be(&mut out, node.len() as u32);
        out.extend_from_slice(&node);
        push_u32_be(&mut out, data.len() as u32);
        out.extend_from_slice(&data);
        out
    }

    #[test]
    fn undersized_buffer_fails_softly() {
        assert!(decode(&[0xA0, 0x45, 0, 0xFF, 0, 0, 0]).is_none());
    }

    #[test]
    fn bad_signature_fails_softly() {
        let mut node = Vec::new();
        push_u8(&mut node, 0x01);
        raw_name(&mut node, "root");
        push_u8(&mut node, 0xBF);
        let mut buf = wrap_sections(node, vec![], 0x45);
        buf[0] = 0x00;
        assert!(decode(&buf).is_none());
    }

    #[test]
    fn minimal_empty_root_element() {
        let mut node = Vec::new();
        push_u8(&mut node, 0x01); // NODE_START
        raw_name(&mut node, "root");
        push_u8(&mut node, 0xBF); // END_SECTION, no explicit NODE_END
        let buf = wrap_sections(node, vec![], 0x45);

        let doc = decode(&buf).expect("should decode");
        assert_eq!(doc.root.name, "root");
        assert!(doc.root.children.is_empty());
        assert!(doc.root.text.is_none());
    }

    #[test]
    fn typed_s32_leaf_negative_value() {
        let mut node = Vec::new();
        push_u8(&mut node, 0x01); // NODE_START for synthetic top element
        raw_name(&mut node, "root");
        push_u8(&mut node, 0x06); // s32, no array flag
        raw_name(&mut node, "x");
        push_u8(&mut node, 0xBE); // NODE_END closes "x"
        push_u8(&mut node, 0xBE); // NODE_END closes "root"
        push_u8(&mut node, 0xBF); // END_SECTION

        let mut data = Vec::new();
        data.extend_from_slice(&(-7i32).to_be_bytes());

        let buf = wrap_sections(node, data, 0x45);
        let doc = decode(&buf).expect("should decode");
        let leaf = doc.root.find_child("x").expect("leaf present");
        assert_eq!(leaf.text.as_deref(), Some("-7"));
        assert_eq!(leaf.attr("__type"), Some("s32"));
    }

    #[test]
    fn array_leaf_of_three_u8_with_count_two() {
        let mut node = Vec::new();
        push_u8(&mut node, 0x01);
        raw_name(&mut node, "root");
        push_u8(&mut node, 0x40 | 27); // array flag | slot 27 ("3u8", count=3)
        raw_name(&mut node, "arr");
        push_u8(&mut node, 0xBE);
        push_u8(&mut node, 0xBE);
        push_u8(&mut node, 0xBF);

        let mut data = Vec::new();
        data.extend_from_slice(&2u32.to_be_bytes()); // array_count
        data.extend_from_slice(&[1, 2, 3, 4, 5, 6]); // 3u8 * ac=2

        let buf = wrap_sections(node, data, 0x45);
        let doc = decode(&buf).expect("should decode");
        let leaf = doc.root.find_child("arr").expect("leaf present");
        assert_eq!(leaf.text.as_deref(), Some("1 2 3 4 5 6"));
        assert_eq!(leaf.attr("__count"), Some("2"));
    }

    #[test]
    fn binary_leaf_single_nibble_for_small_bytes() {
        let mut node = Vec::new();
        push_u8(&mut node, 0x01);
        raw_name(&mut node, "root");
        push_u8(&mut node, 10); // BINARY
        raw_name(&mut node, "b");
        push_u8(&mut node, 0xBE);
        push_u8(&mut node, 0xBE);
        push_u8(&mut node, 0xBF);

        let mut data = Vec::new();
        data.extend_from_slice(&3u32.to_be_bytes()); // variable-width length prefix
        data.extend_from_slice(&[0x05, 0xAB, 0x00]);

        let buf = wrap_sections(node, data, 0x45);
        let doc = decode(&buf).expect("should decode");
        let leaf = doc.root.find_child("b").expect("leaf present");
        assert_eq!(leaf.text.as_deref(), Some("5ab0"));
        assert_eq!(leaf.attr("__size"), Some("3"));
    }

    #[test]
    fn unknown_type_fails_whole_decode() {
        let mut node = Vec::new();
        push_u8(&mut node, 0x01);
        raw_name(&mut node, "root");
        push_u8(&mut node, 0xC8); // 200, outside the table
        raw_name(&mut node, "bad");

        let buf = wrap_sections(node, vec![], 0x45);
        assert!(decode(&buf).is_none());
    }

    #[test]
    fn find_path_walks_child_chain() {
        let mut node = Vec::new();
        push_u8(&mut node, 0x01);
        raw_name(&mut node, "imgfs");
        push_u8(&mut node, 0x01);
        raw_name(&mut node, "_01000");
        push_u8(&mut node, 11); // STRING
        raw_name(&mut node, "_01000_E1");
        push_u8(&mut node, 0xBE); // close leaf
        push_u8(&mut node, 0xBE); // close _01000
        push_u8(&mut node, 0xBE); // close imgfs
        push_u8(&mut node, 0xBF);

        let text = b"96 24";
        let mut data = Vec::new();
        data.extend_from_slice(&(text.len() as u32).to_be_bytes());
        data.extend_from_slice(text);

        let buf = wrap_sections(node, data, 0x45);
        let doc = decode(&buf).expect("should decode");
        let found = doc
            .find_path("imgfs/_01000/_01000_E1")
            .expect("path resolves");
        assert_eq!(found.text.as_deref(), Some("96 24"));
    }
}
