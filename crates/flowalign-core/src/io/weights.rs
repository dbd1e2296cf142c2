//! Flat binary container of named f32 tensors.
//!
//! Layout (all integers little-endian): 8-byte magic `FLOWALN1`, u32 tensor
//! count, then one record per tensor: u16 name length, UTF-8 name, u8 rank,
//! u32 dims (rank of them), f32 data in row-major order.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt};
use memmap2::Mmap;
use ndarray::{Array1, Array4, ArrayD, Ix1, Ix4, IxDyn};

use crate::error::{FlowAlignError, Result};

pub const WEIGHTS_MAGIC: &[u8; 8] = b"FLOWALN1";
const WEIGHTS_HEADER_SIZE: usize = 12;

/// In-memory tensor container backing the learned-parameter bundle.
/// Iteration and on-disk record order are sorted by tensor name.
#[derive(Debug, Default)]
pub struct WeightsStore {
    tensors: BTreeMap<String, ArrayD<f32>>,
}

impl WeightsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, tensor: ArrayD<f32>) {
        self.tensors.insert(name.into(), tensor);
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }

    /// Iterate (name, tensor) pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArrayD<f32>)> {
        self.tensors.iter().map(|(name, t)| (name.as_str(), t))
    }

    /// Total number of scalar parameters across all tensors.
    pub fn total_parameters(&self) -> usize {
        self.tensors.values().map(|t| t.len()).sum()
    }

    pub fn tensor(&self, name: &str) -> Result<&ArrayD<f32>> {
        self.tensors
            .get(name)
            .ok_or_else(|| FlowAlignError::InvalidWeights(format!("missing tensor '{name}'")))
    }

    /// Fetch a tensor as a rank-4 array.
    pub fn array4(&self, name: &str) -> Result<Array4<f32>> {
        let tensor = self.tensor(name)?;
        tensor.clone().into_dimensionality::<Ix4>().map_err(|_| {
            FlowAlignError::InvalidWeights(format!(
                "tensor '{}' has rank {}, expected 4",
                name,
                tensor.ndim()
            ))
        })
    }

    /// Fetch a tensor as a rank-1 array.
    pub fn array1(&self, name: &str) -> Result<Array1<f32>> {
        let tensor = self.tensor(name)?;
        tensor.clone().into_dimensionality::<Ix1>().map_err(|_| {
            FlowAlignError::InvalidWeights(format!(
                "tensor '{}' has rank {}, expected 1",
                name,
                tensor.ndim()
            ))
        })
    }

    /// Open a weights file and parse every record.
    pub fn open(path: &Path) -> Result<Self> {
        let file = File::open(path)?;
        let mmap = unsafe { Mmap::map(&file)? };

        if mmap.len() < WEIGHTS_HEADER_SIZE {
            return Err(FlowAlignError::InvalidWeights(
                "file too small for header".into(),
            ));
        }
        if &mmap[0..8] != WEIGHTS_MAGIC {
            return Err(FlowAlignError::InvalidWeights(
                "missing FLOWALN1 magic".into(),
            ));
        }
        let mut cursor = std::io::Cursor::new(&mmap[8..WEIGHTS_HEADER_SIZE]);
        let count = cursor.read_u32::<LittleEndian>()? as usize;

        let mut tensors = BTreeMap::new();
        let mut offset = WEIGHTS_HEADER_SIZE;
        for _ in 0..count {
            let (name, tensor, next) = parse_record(&mmap, offset)?;
            if tensors.insert(name.clone(), tensor).is_some() {
                return Err(FlowAlignError::InvalidWeights(format!(
                    "duplicate tensor '{name}'"
                )));
            }
            offset = next;
        }
        if offset != mmap.len() {
            return Err(FlowAlignError::InvalidWeights(format!(
                "{} trailing bytes after last tensor",
                mmap.len() - offset
            )));
        }

        Ok(Self { tensors })
    }

    /// Write the container to disk.
    pub fn save(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut w = BufWriter::new(file);

        // Magic (8 bytes)
        w.write_all(WEIGHTS_MAGIC)?;
        // Tensor count (4 bytes)
        w.write_all(&(self.tensors.len() as u32).to_le_bytes())?;

        for (name, tensor) in &self.tensors {
            // Name length (2 bytes) + name
            w.write_all(&(name.len() as u16).to_le_bytes())?;
            w.write_all(name.as_bytes())?;
            // Rank (1 byte) + dims (4 bytes each)
            w.write_all(&[tensor.ndim() as u8])?;
            for &d in tensor.shape() {
                w.write_all(&(d as u32).to_le_bytes())?;
            }
            // Data (4 bytes per element, row-major)
            for &v in tensor.iter() {
                w.write_all(&v.to_le_bytes())?;
            }
        }
        w.flush()?;
        Ok(())
    }
}

fn parse_record(buf: &[u8], mut offset: usize) -> Result<(String, ArrayD<f32>, usize)> {
    let name_len = {
        let bytes = take(buf, &mut offset, 2)?;
        u16::from_le_bytes([bytes[0], bytes[1]]) as usize
    };
    let name = std::str::from_utf8(take(buf, &mut offset, name_len)?)
        .map_err(|_| FlowAlignError::InvalidWeights("tensor name is not UTF-8".into()))?
        .to_string();

    let rank = take(buf, &mut offset, 1)?[0] as usize;
    if rank == 0 || rank > 4 {
        return Err(FlowAlignError::InvalidWeights(format!(
            "tensor '{name}' has unsupported rank {rank}"
        )));
    }

    let mut dims = Vec::with_capacity(rank);
    let mut elements: usize = 1;
    for _ in 0..rank {
        let bytes = take(buf, &mut offset, 4)?;
        let d = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
        elements = elements.checked_mul(d).ok_or_else(|| {
            FlowAlignError::InvalidWeights(format!("tensor '{name}' dimension overflow"))
        })?;
        dims.push(d);
    }

    let byte_len = elements.checked_mul(4).ok_or_else(|| {
        FlowAlignError::InvalidWeights(format!("tensor '{name}' dimension overflow"))
    })?;
    let data_bytes = take(buf, &mut offset, byte_len)?;
    let mut data = vec![0.0f32; elements];
    let mut cursor = std::io::Cursor::new(data_bytes);
    cursor.read_f32_into::<LittleEndian>(&mut data)?;

    let tensor = ArrayD::from_shape_vec(IxDyn(&dims), data).map_err(|_| {
        FlowAlignError::InvalidWeights(format!("tensor '{name}' shape/data mismatch"))
    })?;
    Ok((name, tensor, offset))
}

fn take<'a>(buf: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = offset.checked_add(len).filter(|&end| end <= buf.len());
    match end {
        Some(end) => {
            let slice = &buf[*offset..end];
            *offset = end;
            Ok(slice)
        }
        None => Err(FlowAlignError::InvalidWeights(format!(
            "file truncated: need {} bytes at offset {}",
            len, offset
        ))),
    }
}
