//! Host-resident supernodal panels
//!
//! A panel is the storage of one supernode's L or U data: a flat index
//! array describing its dense blocks and a flat value array holding them.
//! Both arrays are exactly what gets mirrored to the device.
//!
//! # Index layouts
//!
//! ```text
//! L-panel: [nblocks, nzrows, ncols, have_diag | gid * nblocks | st_row * (nblocks + 1) | row * nzrows]
//! U-panel: [nblocks, nzcols, ksupsz           | gid * nblocks | st_col * (nblocks + 1) | col * nzcols]
//! ```
//!
//! Values are column-major. An L-panel is an `nzrows x ncols` matrix with
//! leading dimension `nzrows`; a U-panel is a `ksupsz x nzcols` matrix with
//! leading dimension `ksupsz`. The two leading-dimension conventions are
//! different on purpose and each panel kind exposes its own accessor.
//!
//! An empty panel has an empty index, holds no values and is never
//! transferred to the device.

mod lpanel;
mod supernode;
mod upanel;

pub use lpanel::{DiagonalBlock, LPanel, OffDiagonal, RowBlock};
pub use supernode::SupernodeTable;
pub use upanel::{ColBlock, UPanel};

/// Integer type of panel index entries
pub type Index = i64;

/// Queries shared by L- and U-panels
///
/// Everything here is a pure function of the index metadata (plus the
/// value buffer for the accessors that return it); nothing touches the
/// device.
pub trait Panel {
    /// Whether the panel holds no blocks
    fn is_empty(&self) -> bool {
        self.index().is_empty()
    }

    /// Number of dense blocks
    fn nblocks(&self) -> usize;

    /// Number of entries of the index array
    fn index_size(&self) -> usize;

    /// Number of entries of the value array
    fn nzval_size(&self) -> usize;

    /// Global block id of block `i`
    fn gid(&self, i: usize) -> Index;

    /// Position of the block with global id `gid`, if the panel holds it
    fn find(&self, gid: Index) -> Option<usize> {
        (0..self.nblocks()).find(|&i| self.gid(i) == gid)
    }

    /// The index array
    fn index(&self) -> &[Index];

    /// The value array
    fn values(&self) -> &[f64];

    /// The value array, mutably
    fn values_mut(&mut self) -> &mut [f64];
}

/// Read a header or table entry as a non-negative size
pub(crate) fn entry(index: &[Index], pos: usize, what: &str) -> crate::error::Result<usize> {
    let v = *index.get(pos).ok_or_else(|| {
        crate::error::Error::malformed(format!(
            "index has {} entries, {} expected at position {}",
            index.len(),
            what,
            pos
        ))
    })?;
    usize::try_from(v)
        .map_err(|_| crate::error::Error::malformed(format!("{} is negative ({})", what, v)))
}

/// Index length `header + 2 * nblocks + 1 + n` of a panel layout
pub(crate) fn layout_len(header: usize, nblocks: usize, n: usize) -> crate::error::Result<usize> {
    nblocks
        .checked_mul(2)
        .and_then(|v| v.checked_add(header + 1))
        .and_then(|v| v.checked_add(n))
        .ok_or_else(|| {
            crate::error::Error::malformed(format!(
                "layout size overflows ({} blocks, {} entries)",
                nblocks, n
            ))
        })
}

/// Value count `rows * cols` of a panel
pub(crate) fn value_count(rows: usize, cols: usize) -> crate::error::Result<usize> {
    rows.checked_mul(cols).ok_or_else(|| {
        crate::error::Error::malformed(format!("{} x {} value array overflows", rows, cols))
    })
}

/// Validate a block-start table: starts at 0, strictly increasing, ends at `total`
pub(crate) fn validate_starts(starts: &[Index], total: usize, what: &str) -> crate::error::Result<()> {
    use crate::error::Error;

    if starts.first() != Some(&0) {
        return Err(Error::malformed(format!("first {} start must be 0", what)));
    }
    for (i, w) in starts.windows(2).enumerate() {
        if w[1] <= w[0] {
            return Err(Error::malformed(format!(
                "{} {} is empty or out of order (starts {} -> {})",
                what, i, w[0], w[1]
            )));
        }
    }
    if starts.last().copied() != Some(total as Index) {
        return Err(Error::malformed(format!(
            "{} starts end at {:?}, expected {}",
            what,
            starts.last(),
            total
        )));
    }
    Ok(())
}
