//! U-panel: the column blocks to the right of a supernode's diagonal block

use super::{Index, Panel, entry, layout_len, validate_starts, value_count};
use crate::error::{Error, Result};

const HEADER: usize = 3;
const H_NBLOCKS: usize = 0;
const H_NZCOLS: usize = 1;
const H_KSUPSZ: usize = 2;

/// One column block of a U-panel, as supplied by the upstream producer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColBlock {
    /// Global block id
    pub gid: Index,
    /// Global column indices of the block's columns
    pub cols: Vec<Index>,
}

impl ColBlock {
    /// Create a column block
    pub fn new(gid: Index, cols: Vec<Index>) -> Self {
        Self { gid, cols }
    }
}

/// Host-resident U-panel
///
/// U-panels never carry the diagonal block; every column participates in
/// the panel solve.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UPanel {
    index: Vec<Index>,
    values: Vec<f64>,
}

impl UPanel {
    /// A panel with no blocks
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a panel from column block descriptions
    ///
    /// `values` is the column-major `ksupsz x nzcols` value array.
    pub fn new(ksupsz: usize, blocks: &[ColBlock], values: Vec<f64>) -> Result<Self> {
        if blocks.is_empty() {
            if !values.is_empty() {
                return Err(Error::malformed(format!(
                    "empty panel given {} values",
                    values.len()
                )));
            }
            return Ok(Self::empty());
        }

        let nblocks = blocks.len();
        let nzcols: usize = blocks.iter().map(|b| b.cols.len()).sum();

        let mut index = Vec::with_capacity(HEADER + 2 * nblocks + 1 + nzcols);
        index.extend([nblocks as Index, nzcols as Index, ksupsz as Index]);
        index.extend(blocks.iter().map(|b| b.gid));
        let mut start = 0;
        index.push(0);
        for b in blocks {
            start += b.cols.len();
            index.push(start as Index);
        }
        for b in blocks {
            index.extend_from_slice(&b.cols);
        }

        Self::from_raw(index, values)
    }

    /// Adopt raw index and value arrays from the upstream producer
    pub fn from_raw(index: Vec<Index>, values: Vec<f64>) -> Result<Self> {
        if index.is_empty() {
            if !values.is_empty() {
                return Err(Error::malformed(format!(
                    "empty index with {} values",
                    values.len()
                )));
            }
            return Ok(Self::empty());
        }

        let nblocks = entry(&index, H_NBLOCKS, "block count")?;
        let nzcols = entry(&index, H_NZCOLS, "column count")?;
        let ksupsz = entry(&index, H_KSUPSZ, "supernode size")?;

        if nblocks == 0 {
            return Err(Error::malformed(
                "non-empty index with zero blocks; use an empty index instead",
            ));
        }
        if ksupsz == 0 {
            return Err(Error::malformed("U-panel has a zero supernode size"));
        }

        let expected = layout_len(HEADER, nblocks, nzcols)?;
        if index.len() != expected {
            return Err(Error::malformed(format!(
                "index has {} entries, layout requires {}",
                index.len(),
                expected
            )));
        }
        validate_starts(
            &index[HEADER + nblocks..HEADER + 2 * nblocks + 1],
            nzcols,
            "column block",
        )?;
        if values.len() != value_count(ksupsz, nzcols)? {
            return Err(Error::malformed(format!(
                "U-panel holds {} values, {} x {} expected",
                values.len(),
                ksupsz,
                nzcols
            )));
        }

        Ok(Self { index, values })
    }

    fn header(&self, pos: usize) -> usize {
        self.index.get(pos).map_or(0, |&v| v as usize)
    }

    /// Total number of nonzero columns
    pub fn nzcols(&self) -> usize {
        self.header(H_NZCOLS)
    }

    /// Number of rows (the supernode size)
    pub fn supernode_size(&self) -> usize {
        self.header(H_KSUPSZ)
    }

    /// First panel column of block `i`
    pub fn st_col(&self, i: usize) -> usize {
        self.index[HEADER + self.nblocks() + i] as usize
    }

    /// Column count of block `i`
    pub fn nbcol(&self, i: usize) -> usize {
        self.st_col(i + 1) - self.st_col(i)
    }

    /// Global column indices of block `i`
    pub fn col_list(&self, i: usize) -> &[Index] {
        let base = HEADER + 2 * self.nblocks() + 1;
        &self.index[base + self.st_col(i)..base + self.st_col(i + 1)]
    }

    /// Offset of block `i` in the value array
    pub fn block_value_offset(&self, i: usize) -> usize {
        self.leading_dimension() * self.st_col(i)
    }

    /// Values of block `i` (contiguous, `ksupsz x nbcol(i)`)
    pub fn block_values(&self, i: usize) -> &[f64] {
        let start = self.block_value_offset(i);
        &self.values[start..start + self.leading_dimension() * self.nbcol(i)]
    }

    /// Column stride of the value array: the supernode's column count
    pub fn leading_dimension(&self) -> usize {
        self.supernode_size()
    }
}

impl Panel for UPanel {
    fn nblocks(&self) -> usize {
        self.header(H_NBLOCKS)
    }

    fn index_size(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        HEADER + 2 * self.nblocks() + 1 + self.nzcols()
    }

    fn nzval_size(&self) -> usize {
        self.nzcols() * self.supernode_size()
    }

    fn gid(&self, i: usize) -> Index {
        self.index[HEADER + i]
    }

    fn index(&self) -> &[Index] {
        &self.index
    }

    fn values(&self) -> &[f64] {
        &self.values
    }

    fn values_mut(&mut self) -> &mut [f64] {
        &mut self.values
    }
}
