//! Writes tiny MaxMind DB files for tests.
//!
//! The search tree has two nodes and 24 bit records. `0.0.0.0/2` and
//! `64.0.0.0/2` point at the two records handed to [`build`], the upper half
//! of the IPv4 space is empty.

use std::io::Write;

use tempfile::NamedTempFile;

const METADATA_MARKER: &[u8] = b"\xab\xcd\xefMaxMind.com";
const DATA_SECTION_SEPARATOR: [u8; 16] = [0; 16];
const NODE_COUNT: u32 = 2;

const TYPE_STRING: u8 = 2;
const TYPE_UINT16: u8 = 5;
const TYPE_UINT32: u8 = 6;
const TYPE_MAP: u8 = 7;
const TYPE_UINT64: u8 = 9;
const TYPE_ARRAY: u8 = 11;

/// A value of the MaxMind DB data section.
#[derive(Debug, Clone)]
pub(crate) enum Value {
    Str(String),
    U16(u16),
    U32(u32),
    U64(u64),
    Map(Vec<(&'static str, Value)>),
    Array(Vec<Value>),
    /// A string whose header claims `declared` bytes but only `text` follows.
    Truncated { declared: usize, text: &'static str },
}

pub(crate) fn string(s: &str) -> Value {
    Value::Str(s.to_string())
}

fn header(out: &mut Vec<u8>, kind: u8, size: usize) {
    let (bits, extra) = match size {
        0..=28 => (size as u8, vec![]),
        29..=284 => (29, vec![(size - 29) as u8]),
        _ => {
            let rest = size - 285;
            assert!(rest <= 0xffff, "size {size} is too large");
            (30, vec![(rest >> 8) as u8, rest as u8])
        }
    };
    if kind < 8 {
        out.push(kind << 5 | bits);
    } else {
        out.push(bits);
        out.push(kind - 7);
    }
    out.extend(extra);
}

fn uint(out: &mut Vec<u8>, kind: u8, value: u64) {
    let bytes: Vec<u8> = value
        .to_be_bytes()
        .into_iter()
        .skip_while(|b| *b == 0)
        .collect();
    header(out, kind, bytes.len());
    out.extend(bytes);
}

impl Value {
    fn encode(&self, out: &mut Vec<u8>) {
        match self {
            Value::Str(s) => {
                header(out, TYPE_STRING, s.len());
                out.extend(s.as_bytes());
            }
            Value::U16(v) => uint(out, TYPE_UINT16, u64::from(*v)),
            Value::U32(v) => uint(out, TYPE_UINT32, u64::from(*v)),
            Value::U64(v) => uint(out, TYPE_UINT64, *v),
            Value::Map(entries) => {
                header(out, TYPE_MAP, entries.len());
                for (key, value) in entries {
                    string(key).encode(out);
                    value.encode(out);
                }
            }
            Value::Array(items) => {
                header(out, TYPE_ARRAY, items.len());
                for item in items {
                    item.encode(out);
                }
            }
            Value::Truncated { declared, text } => {
                header(out, TYPE_STRING, *declared);
                out.extend(text.as_bytes());
            }
        }
    }
}

/// An ASN or ISP style record.
pub(crate) fn as_record(number: u32, organization: &str) -> Value {
    Value::Map(vec![
        ("autonomous_system_number", Value::U32(number)),
        ("autonomous_system_organization", string(organization)),
    ])
}

/// Encodes a database of `database_type` holding `records` for
/// `0.0.0.0/2` and `64.0.0.0/2`. `None` leaves the network empty.
pub(crate) fn build(database_type: &str, records: [Option<Value>; 2]) -> Vec<u8> {
    let mut data = Vec::new();
    let mut pointers = [NODE_COUNT; 2];
    for (pointer, record) in pointers.iter_mut().zip(&records) {
        if let Some(record) = record {
            *pointer = NODE_COUNT + DATA_SECTION_SEPARATOR.len() as u32 + data.len() as u32;
            record.encode(&mut data);
        }
    }

    let mut out = Vec::new();
    // node 0: left to node 1, right empty; node 1: the two records
    for record in [1, NODE_COUNT, pointers[0], pointers[1]] {
        out.extend(&record.to_be_bytes()[1..]);
    }
    out.extend(DATA_SECTION_SEPARATOR);
    out.extend(data);
    out.extend(METADATA_MARKER);

    Value::Map(vec![
        ("binary_format_major_version", Value::U16(2)),
        ("binary_format_minor_version", Value::U16(0)),
        ("build_epoch", Value::U64(1_700_000_000)),
        ("database_type", string(database_type)),
        ("description", Value::Map(vec![("en", string("asenrich test database"))])),
        ("ip_version", Value::U16(4)),
        ("languages", Value::Array(vec![string("en")])),
        ("node_count", Value::U32(NODE_COUNT)),
        ("record_size", Value::U16(24)),
    ])
    .encode(&mut out);

    out
}

/// Writes `bytes` to a temporary `.mmdb` file.
pub(crate) fn write(bytes: &[u8]) -> NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".mmdb")
        .tempfile()
        .unwrap();
    file.write_all(bytes).unwrap();
    file.flush().unwrap();
    file
}
