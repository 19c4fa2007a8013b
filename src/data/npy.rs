// ============================================================
// Layer 4 — NumPy .npy Reader
// ============================================================
// Mel spectrograms and phoneme durations are produced by an
// external preprocessing step and stored one file per utterance
// in NumPy's .npy format:
//
//   \x93NUMPY | major | minor | header_len | header dict | raw data
//
// Only C-ordered arrays are accepted. Every supported dtype is
// widened/narrowed to f32 because that is what the batcher feeds
// to Burn.
//
// Reference: NumPy NEP 1 (.npy format)

use anyhow::{anyhow, bail, Context, Result};
use std::{fs, path::Path};

/// A dense n-dimensional array read from disk, data in row-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct NpyArray {
    pub shape: Vec<usize>,
    pub data:  Vec<f32>,
}

/// Read and decode an .npy file.
pub fn read_npy(path: &Path) -> Result<NpyArray> {
    let bytes = fs::read(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    parse_npy(&bytes).with_context(|| format!("Invalid npy file '{}'", path.display()))
}

/// Decode an in-memory .npy payload.
pub fn parse_npy(bytes: &[u8]) -> Result<NpyArray> {
    if bytes.len() < 10 {
        bail!("npy payload too small");
    }
    if &bytes[0..6] != b"\x93NUMPY" {
        bail!("invalid npy magic header");
    }

    let (header_len, header_offset) = match bytes[6] {
        1 => (u16::from_le_bytes([bytes[8], bytes[9]]) as usize, 10),
        2 | 3 => {
            if bytes.len() < 12 {
                bail!("npy payload too small");
            }
            (u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]) as usize, 12)
        }
        other => bail!("unsupported npy version {other}"),
    };

    let header_end = header_offset + header_len;
    if bytes.len() < header_end {
        bail!("npy header length exceeds payload size");
    }
    let header = std::str::from_utf8(&bytes[header_offset..header_end])
        .context("npy header is not valid utf-8")?;

    let descr = header_field(header, "descr")
        .ok_or_else(|| anyhow!("npy header missing 'descr' field"))?;
    let fortran = header_field(header, "fortran_order")
        .ok_or_else(|| anyhow!("npy header missing 'fortran_order' field"))?;
    let shape = header_shape(header)
        .ok_or_else(|| anyhow!("npy header missing 'shape' field"))?;

    if fortran != "False" {
        bail!("unsupported npy order '{fortran}', expected C order");
    }

    let dtype = Dtype::from_descr(descr)?;
    let count = shape
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| anyhow!("npy shape overflow for {shape:?}"))?;

    let payload = &bytes[header_end..];
    let expected = count * dtype.size();
    if payload.len() != expected {
        bail!(
            "npy data size mismatch: expected {} bytes, got {}",
            expected,
            payload.len()
        );
    }

    let data = payload
        .chunks_exact(dtype.size())
        .map(|c| dtype.decode(c))
        .collect();

    Ok(NpyArray { shape, data })
}

// ─── Dtypes ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Copy)]
enum Dtype {
    F32,
    F64,
    I16,
    I32,
    I64,
    U8,
}

impl Dtype {
    fn from_descr(descr: &str) -> Result<Self> {
        Ok(match descr {
            "<f4"        => Dtype::F32,
            "<f8"        => Dtype::F64,
            "<i2"        => Dtype::I16,
            "<i4"        => Dtype::I32,
            "<i8"        => Dtype::I64,
            "|u1" | "<u1" => Dtype::U8,
            other        => bail!("unsupported npy dtype '{other}'"),
        })
    }

    fn size(self) -> usize {
        match self {
            Dtype::F32 | Dtype::I32 => 4,
            Dtype::F64 | Dtype::I64 => 8,
            Dtype::I16              => 2,
            Dtype::U8               => 1,
        }
    }

    fn decode(self, c: &[u8]) -> f32 {
        match self {
            Dtype::F32 => f32::from_le_bytes([c[0], c[1], c[2], c[3]]),
            Dtype::F64 => f64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32,
            Dtype::I16 => i16::from_le_bytes([c[0], c[1]]) as f32,
            Dtype::I32 => i32::from_le_bytes([c[0], c[1], c[2], c[3]]) as f32,
            Dtype::I64 => i64::from_le_bytes([c[0], c[1], c[2], c[3], c[4], c[5], c[6], c[7]]) as f32,
            Dtype::U8  => c[0] as f32,
        }
    }
}

// ─── Header parsing ───────────────────────────────────────────────────────────
// The header is a Python dict literal, e.g.
//   {'descr': '<f4', 'fortran_order': False, 'shape': (812, 80), }
fn header_field<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let pattern = format!("'{key}':");
    let start = header.find(&pattern)? + pattern.len();
    let rest = header[start..].trim_start();

    if let Some(stripped) = rest.strip_prefix('\'') {
        let end = stripped.find('\'')?;
        return Some(&stripped[..end]);
    }
    if let Some(stripped) = rest.strip_prefix('"') {
        let end = stripped.find('"')?;
        return Some(&stripped[..end]);
    }

    let end = rest.find([',', '}']).unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn header_shape(header: &str) -> Option<Vec<usize>> {
    let marker = "'shape':";
    let start = header.find(marker)? + marker.len();
    let rest = header[start..].trim_start();
    let open = rest.find('(')?;
    let close = rest[open..].find(')')? + open;

    // "()" is a scalar, "(5,)" a vector
    rest[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().ok())
        .collect()
}

/// Encode an f32 array as a version 1.0 .npy payload.
#[cfg(test)]
pub(crate) fn encode_f32(shape: &[usize], data: &[f32]) -> Vec<u8> {
    let dims = match shape.len() {
        1 => format!("{},", shape[0]),
        _ => shape.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(", "),
    };
    let mut header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': ({dims}), }}");
    // Pad so the data section starts on a 64-byte boundary
    while (10 + header.len() + 1) % 64 != 0 {
        header.push(' ');
    }
    header.push('\n');

    let mut out = b"\x93NUMPY\x01\x00".to_vec();
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for v in data {
        out.extend_from_slice(&v.to_le_bytes());
    }
    out
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_2d_f32() {
        let bytes = encode_f32(&[2, 3], &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let arr = parse_npy(&bytes).unwrap();
        assert_eq!(arr.shape, vec![2, 3]);
        assert_eq!(arr.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_parse_1d_i64_durations() {
        let header = "{'descr': '<i8', 'fortran_order': False, 'shape': (3,), }\n";
        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        for d in [4i64, 0, 7] {
            bytes.extend_from_slice(&d.to_le_bytes());
        }
        let arr = parse_npy(&bytes).unwrap();
        assert_eq!(arr.shape, vec![3]);
        assert_eq!(arr.data, vec![4.0, 0.0, 7.0]);
    }

    #[test]
    fn test_rejects_bad_magic() {
        assert!(parse_npy(b"NOTNUMPYATALL").is_err());
    }

    #[test]
    fn test_rejects_truncated_data() {
        let mut bytes = encode_f32(&[4], &[1.0, 2.0, 3.0, 4.0]);
        bytes.truncate(bytes.len() - 2);
        assert!(parse_npy(&bytes).is_err());
    }

    #[test]
    fn test_rejects_fortran_order() {
        let header = "{'descr': '<f4', 'fortran_order': True, 'shape': (1,), }\n";
        let mut bytes = b"\x93NUMPY\x01\x00".to_vec();
        bytes.extend_from_slice(&(header.len() as u16).to_le_bytes());
        bytes.extend_from_slice(header.as_bytes());
        bytes.extend_from_slice(&1.0f32.to_le_bytes());
        assert!(parse_npy(&bytes).is_err());
    }
}
