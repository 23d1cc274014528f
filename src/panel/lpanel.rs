//! L-panel: the row blocks below (and optionally including) a supernode's
//! diagonal block

use super::{Index, Panel, entry, layout_len, validate_starts, value_count};
use crate::error::{Error, Result};
use crate::mirror::Mirror;
use crate::runtime::{DeviceMatrix, Runtime};

const HEADER: usize = 4;
const H_NBLOCKS: usize = 0;
const H_NZROWS: usize = 1;
const H_NCOLS: usize = 2;
const H_HAVE_DIAG: usize = 3;

/// One row block of an L-panel, as supplied by the upstream producer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBlock {
    /// Global block id
    pub gid: Index,
    /// Global row indices of the block's rows
    pub rows: Vec<Index>,
}

impl RowBlock {
    /// Create a row block
    pub fn new(gid: Index, rows: Vec<Index>) -> Self {
        Self { gid, rows }
    }
}

/// The supernode's own diagonal block, stored as the panel's first block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiagonalBlock {
    /// Row count of the diagonal block (equal to the supernode size)
    pub rows: usize,
}

/// The part of an L-panel that participates in a panel solve
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OffDiagonal {
    /// First panel row of the sub-block (also its value offset)
    pub row_offset: usize,
    /// Number of rows of the sub-block
    pub rows: usize,
}

/// Host-resident L-panel
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LPanel {
    index: Vec<Index>,
    values: Vec<f64>,
    diag: Option<DiagonalBlock>,
}

impl LPanel {
    /// A panel with no blocks
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a panel from row block descriptions
    ///
    /// With `have_diag`, `blocks[0]` is the supernode's diagonal block and
    /// must have exactly `ncols` rows. `values` is the column-major
    /// `nzrows x ncols` value array.
    pub fn new(ncols: usize, blocks: &[RowBlock], have_diag: bool, values: Vec<f64>) -> Result<Self> {
        if blocks.is_empty() {
            if have_diag {
                return Err(Error::malformed("diagonal block requested on an empty panel"));
            }
            if !values.is_empty() {
                return Err(Error::malformed(format!(
                    "empty panel given {} values",
                    values.len()
                )));
            }
            return Ok(Self::empty());
        }

        let nblocks = blocks.len();
        let nzrows: usize = blocks.iter().map(|b| b.rows.len()).sum();

        let mut index = Vec::with_capacity(HEADER + 2 * nblocks + 1 + nzrows);
        index.extend([
            nblocks as Index,
            nzrows as Index,
            ncols as Index,
            Index::from(have_diag),
        ]);
        index.extend(blocks.iter().map(|b| b.gid));
        let mut start = 0;
        index.push(0);
        for b in blocks {
            start += b.rows.len();
            index.push(start as Index);
        }
        for b in blocks {
            index.extend_from_slice(&b.rows);
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
        let nzrows = entry(&index, H_NZROWS, "row count")?;
        let ncols = entry(&index, H_NCOLS, "column count")?;
        let have_diag = match entry(&index, H_HAVE_DIAG, "diagonal flag")? {
            0 => false,
            1 => true,
            v => return Err(Error::malformed(format!("diagonal flag must be 0 or 1, got {}", v))),
        };

        if nblocks == 0 {
            return Err(Error::malformed(
                "non-empty index with zero blocks; use an empty index instead",
            ));
        }
        if ncols == 0 {
            return Err(Error::malformed("L-panel has zero columns"));
        }

        let expected = layout_len(HEADER, nblocks, nzrows)?;
        if index.len() != expected {
            return Err(Error::malformed(format!(
                "index has {} entries, layout requires {}",
                index.len(),
                expected
            )));
        }
        validate_starts(
            &index[HEADER + nblocks..HEADER + 2 * nblocks + 1],
            nzrows,
            "row block",
        )?;
        if values.len() != value_count(nzrows, ncols)? {
            return Err(Error::malformed(format!(
                "L-panel holds {} values, {} x {} expected",
                values.len(),
                nzrows,
                ncols
            )));
        }

        let mut panel = Self {
            index,
            values,
            diag: None,
        };
        if have_diag {
            let rows = panel.nbrow(0);
            if rows != ncols {
                return Err(Error::malformed(format!(
                    "diagonal block has {} rows, supernode has {} columns",
                    rows, ncols
                )));
            }
            panel.diag = Some(DiagonalBlock { rows });
        }
        Ok(panel)
    }

    fn header(&self, pos: usize) -> usize {
        self.index.get(pos).map_or(0, |&v| v as usize)
    }

    /// Total number of nonzero rows
    pub fn nzrows(&self) -> usize {
        self.header(H_NZROWS)
    }

    /// Number of columns (the supernode size)
    pub fn ncols(&self) -> usize {
        self.header(H_NCOLS)
    }

    /// Whether the first block is the supernode's own diagonal block
    pub fn have_diag(&self) -> bool {
        self.diag.is_some()
    }

    /// The leading diagonal block, if the panel carries one
    pub fn diag(&self) -> Option<DiagonalBlock> {
        self.diag
    }

    /// First panel row of block `i`
    pub fn st_row(&self, i: usize) -> usize {
        self.index[HEADER + self.nblocks() + i] as usize
    }

    /// Row count of block `i`
    pub fn nbrow(&self, i: usize) -> usize {
        self.st_row(i + 1) - self.st_row(i)
    }

    /// Global row indices of block `i`
    pub fn row_list(&self, i: usize) -> &[Index] {
        let base = HEADER + 2 * self.nblocks() + 1;
        &self.index[base + self.st_row(i)..base + self.st_row(i + 1)]
    }

    /// Offset of block `i` in the value array
    pub fn block_value_offset(&self, i: usize) -> usize {
        self.st_row(i)
    }

    /// Values starting at block `i`, columns `leading_dimension()` apart
    pub fn block_values(&self, i: usize) -> &[f64] {
        &self.values[self.block_value_offset(i)..]
    }

    /// Column stride of the value array: the panel's total row count
    pub fn leading_dimension(&self) -> usize {
        self.nzrows()
    }

    /// The rows an L-panel solve updates
    ///
    /// Everything after the diagonal block when the panel carries one,
    /// the whole panel otherwise.
    pub fn off_diagonal(&self) -> OffDiagonal {
        let row_offset = self.diag.map_or(0, |d| d.rows);
        OffDiagonal {
            row_offset,
            rows: self.nzrows() - row_offset,
        }
    }

    /// Device view of the diagonal block inside this panel's mirror
    ///
    /// This is the operand other panels of the same supernode solve
    /// against once the diagonal block has been factored.
    pub fn diag_block<R: Runtime>(&self, mirror: &Mirror<R>) -> Option<DeviceMatrix> {
        self.diag?;
        mirror.values_matrix(self.leading_dimension())
    }
}

impl Panel for LPanel {
    fn nblocks(&self) -> usize {
        self.header(H_NBLOCKS)
    }

    fn index_size(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        HEADER + 2 * self.nblocks() + 1 + self.nzrows()
    }

    fn nzval_size(&self) -> usize {
        self.nzrows() * self.ncols()
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

#[cfg(test)]
mod tests {
    use super::*;

    /// Supernode of size 3 with its diagonal block plus two row blocks: 10 rows
    fn sample(have_diag: bool) -> LPanel {
        let blocks = vec![
            RowBlock::new(4, vec![12, 13, 14]),
            RowBlock::new(7, vec![20, 21, 22, 23]),
            RowBlock::new(9, vec![30, 31, 32]),
        ];
        let values = (0..30).map(|v| v as f64).collect();
        LPanel::new(3, &blocks, have_diag, values).unwrap()
    }

    #[test]
    fn test_sizes_follow_index() {
        let p = sample(true);
        assert_eq!(p.nblocks(), 3);
        assert_eq!(p.nzrows(), 10);
        assert_eq!(p.ncols(), 3);
        assert_eq!(p.index_size(), 4 + 2 * 3 + 1 + 10);
        assert_eq!(p.index().len(), p.index_size());
        assert_eq!(p.nzval_size(), 30);
        assert_eq!(p.leading_dimension(), 10);
    }

    #[test]
    fn test_block_queries() {
        let p = sample(false);
        assert_eq!(p.nbrow(0), 3);
        assert_eq!(p.nbrow(1), 4);
        assert_eq!(p.nbrow(2), 3);
        assert_eq!(p.block_value_offset(2), 7);
        assert_eq!(p.block_values(1)[0], 3.0);
        assert_eq!(p.row_list(1), &[20, 21, 22, 23]);
        assert_eq!(p.gid(2), 9);
        assert_eq!(p.find(7), Some(1));
        assert_eq!(p.find(8), None);
    }

    #[test]
    fn test_off_diagonal_excludes_diagonal_rows() {
        let with = sample(true);
        assert_eq!(with.diag(), Some(DiagonalBlock { rows: 3 }));
        assert_eq!(
            with.off_diagonal(),
            OffDiagonal {
                row_offset: 3,
                rows: 7
            }
        );

        let without = sample(false);
        assert!(!without.have_diag());
        assert_eq!(
            without.off_diagonal(),
            OffDiagonal {
                row_offset: 0,
                rows: 10
            }
        );
    }

    #[test]
    fn test_empty_panel_has_zero_sizes() {
        let p = LPanel::empty();
        assert!(p.is_empty());
        assert_eq!(p.index_size(), 0);
        assert_eq!(p.nzval_size(), 0);
        assert_eq!(p.nblocks(), 0);
        assert_eq!(p.off_diagonal().rows, 0);
        assert_eq!(LPanel::new(3, &[], false, vec![]).unwrap(), p);
    }

    #[test]
    fn test_raw_round_trip() {
        let p = sample(true);
        let q = LPanel::from_raw(p.index().to_vec(), p.values().to_vec()).unwrap();
        assert_eq!(p, q);
    }

    #[test]
    fn test_rejects_inconsistent_input() {
        // wrong value count
        let blocks = vec![RowBlock::new(0, vec![0, 1])];
        assert!(matches!(
            LPanel::new(2, &blocks, false, vec![0.0; 3]),
            Err(Error::MalformedIndex { .. })
        ));
        // diagonal block height differs from the supernode size
        assert!(LPanel::new(3, &blocks, true, vec![0.0; 6]).is_err());
        // truncated raw index
        let p = sample(false);
        let mut index = p.index().to_vec();
        index.pop();
        assert!(LPanel::from_raw(index, p.values().to_vec()).is_err());
        // block starts out of order
        let mut index = p.index().to_vec();
        index[4 + 3 + 1] = 9;
        assert!(LPanel::from_raw(index, p.values().to_vec()).is_err());
        // diagonal on an empty panel
        assert!(LPanel::new(3, &[], true, vec![]).is_err());
    }

    #[test]
    fn test_overflowing_header_is_malformed() {
        let err = LPanel::from_raw(vec![i64::MAX, 0, 1, 0], vec![]).unwrap_err();
        assert!(matches!(err, Error::MalformedIndex { .. }));
        // consistent layout, but nzrows * ncols overflows
        let index = vec![1, 3, i64::MAX, 0, 7, 0, 3, 10, 11, 12];
        let err = LPanel::from_raw(index, vec![0.0; 3]).unwrap_err();
        assert!(matches!(err, Error::MalformedIndex { .. }));
    }
}
