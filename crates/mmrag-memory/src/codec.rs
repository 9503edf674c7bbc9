//! Binary artifact for a [`VectorIndex`].
//!
//! Layout (all integers and floats little-endian):
//!
//! ```text
//! magic "MMRAGIDX" | u32 version | u32 header_len | JSON header
//! | len * dimension f32 vectors
//! | partitioned only: partition_count * dimension f32 centroids, len u32 assignments
//! ```

use crate::index::{FlatIndex, IndexKind, IvfIndex, Metric, VectorIndex};
use mmrag_core::{MmragError, MmragResult};
use serde::{Deserialize, Serialize};

const MAGIC: &[u8; 8] = b"MMRAGIDX";
const FORMAT_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct IndexHeader {
    kind: IndexKind,
    dimension: usize,
    metric: Metric,
    len: usize,
    #[serde(default)]
    partition_count: usize,
    #[serde(default)]
    probe_count: usize,
    #[serde(default)]
    training_iterations: usize,
}

/// Serialize an index into its artifact bytes.
pub fn encode_index(index: &VectorIndex) -> MmragResult<Vec<u8>> {
    let header = match index {
        VectorIndex::Flat(_) => IndexHeader {
            kind: IndexKind::Flat,
            dimension: index.dimension(),
            metric: index.metric(),
            len: index.len(),
            partition_count: 0,
            probe_count: 0,
            training_iterations: 0,
        },
        VectorIndex::Partitioned(ivf) => IndexHeader {
            kind: IndexKind::Partitioned,
            dimension: index.dimension(),
            metric: index.metric(),
            len: index.len(),
            partition_count: ivf.partition_count(),
            probe_count: ivf.probe_count(),
            training_iterations: ivf.training_iterations(),
        },
    };
    let header_json = serde_json::to_vec(&header)?;

    let mut bytes = Vec::new();
    bytes.extend_from_slice(MAGIC);
    bytes.extend_from_slice(&FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
    bytes.extend_from_slice(&header_json);

    match index {
        VectorIndex::Flat(flat) => encode_f32s(&mut bytes, flat.raw()),
        VectorIndex::Partitioned(ivf) => {
            encode_f32s(&mut bytes, ivf.raw());
            encode_f32s(&mut bytes, ivf.centroids());
            for a in ivf.assignments() {
                bytes.extend_from_slice(&a.to_le_bytes());
            }
        }
    }
    Ok(bytes)
}

/// Rebuild an index from artifact bytes.
pub fn decode_index(bytes: &[u8]) -> MmragResult<VectorIndex> {
    let mut reader = Reader { bytes, offset: 0 };

    if reader.take(MAGIC.len())? != MAGIC {
        return Err(MmragError::Index("not an index artifact".to_string()));
    }
    let version = reader.read_u32()?;
    if version != FORMAT_VERSION {
        return Err(MmragError::Index(format!(
            "unsupported index format version {version}"
        )));
    }
    let header_len = reader.read_u32()? as usize;
    let header: IndexHeader = serde_json::from_slice(reader.take(header_len)?)?;
    if header.dimension == 0 {
        return Err(MmragError::Index("index header has dimension 0".to_string()));
    }
    if header.kind == IndexKind::Partitioned && header.partition_count == 0 {
        return Err(MmragError::Index(
            "partitioned index header has no partitions".to_string(),
        ));
    }

    let value_count = header
        .len
        .checked_mul(header.dimension)
        .ok_or_else(|| MmragError::Index("index size overflows".to_string()))?;
    let data = reader.read_f32s(value_count)?;

    let index = match header.kind {
        IndexKind::Flat => VectorIndex::Flat(FlatIndex::from_raw(
            header.dimension,
            header.metric,
            data,
        )),
        IndexKind::Partitioned => {
            let centroid_count = header
                .partition_count
                .checked_mul(header.dimension)
                .ok_or_else(|| MmragError::Index("centroid size overflows".to_string()))?;
            let centroids = reader.read_f32s(centroid_count)?;
            let assignments = reader.read_u32s(header.len)?;
            VectorIndex::Partitioned(IvfIndex::from_parts(
                header.dimension,
                header.metric,
                header.partition_count,
                header.probe_count,
                header.training_iterations,
                centroids,
                data,
                assignments,
            )?)
        }
    };

    if reader.offset != bytes.len() {
        return Err(MmragError::Index(format!(
            "{} trailing bytes after index data",
            bytes.len() - reader.offset
        )));
    }
    Ok(index)
}

fn encode_f32s(bytes: &mut Vec<u8>, values: &[f32]) {
    bytes.reserve(std::mem::size_of_val(values));
    for &value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> MmragResult<&'a [u8]> {
        let end = self
            .offset
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| MmragError::Index("index artifact is truncated".to_string()))?;
        let slice = &self.bytes[self.offset..end];
        self.offset = end;
        Ok(slice)
    }

    fn read_u32(&mut self) -> MmragResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Sizes are checked against the remaining bytes before allocating.
    fn read_u32s(&mut self, count: usize) -> MmragResult<Vec<u32>> {
        let byte_len = count
            .checked_mul(std::mem::size_of::<u32>())
            .ok_or_else(|| MmragError::Index("index size overflows".to_string()))?;
        let raw = self.take(byte_len)?;
        Ok(raw
            .chunks_exact(4)
            .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect())
    }

    fn read_f32s(&mut self, count: usize) -> MmragResult<Vec<f32>> {
        let byte_len = count
            .checked_mul(std::mem::size_of::<f32>())
            .ok_or_else(|| MmragError::Index("index size overflows".to_string()))?;
        let raw = self.take(byte_len)?;
        let mut out = Vec::with_capacity(count);
        for chunk in raw.chunks_exact(4) {
            let value = f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
            if !value.is_finite() {
                return Err(MmragError::Index(
                    "index artifact contains non-finite values".to_string(),
                ));
            }
            out.push(value);
        }
        Ok(out)
    }
}
