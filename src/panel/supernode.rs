//! Supernode partition table

use crate::error::{Error, Result};

/// Supernode boundaries (`xsup`)
///
/// Supernode `k` spans columns `xsup[k]..xsup[k + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupernodeTable {
    xsup: Vec<usize>,
}

impl SupernodeTable {
    /// Create a table from supernode start columns plus the final end column
    pub fn new(xsup: Vec<usize>) -> Result<Self> {
        if xsup.first() != Some(&0) {
            return Err(Error::invalid_argument(
                "xsup",
                "must be non-empty and start at column 0",
            ));
        }
        if let Some(k) = xsup.windows(2).position(|w| w[1] <= w[0]) {
            return Err(Error::invalid_argument(
                "xsup",
                format!("supernode {} is empty or out of order", k),
            ));
        }
        Ok(Self { xsup })
    }

    /// Partition `n` columns into supernodes of the given sizes
    pub fn from_sizes(sizes: &[usize]) -> Result<Self> {
        let mut xsup = Vec::with_capacity(sizes.len() + 1);
        xsup.push(0);
        for &s in sizes {
            xsup.push(xsup[xsup.len() - 1] + s);
        }
        Self::new(xsup)
    }

    /// Number of supernodes
    pub fn count(&self) -> usize {
        self.xsup.len() - 1
    }

    /// Number of columns covered
    pub fn ncols(&self) -> usize {
        self.xsup[self.xsup.len() - 1]
    }

    /// First column of supernode `k`
    pub fn first_column(&self, k: usize) -> usize {
        self.xsup[k]
    }

    /// Column count of supernode `k`
    pub fn supernode_size(&self, k: usize) -> usize {
        self.xsup[k + 1] - self.xsup[k]
    }

    /// Checked supernode size
    pub fn try_supernode_size(&self, k: usize) -> Result<usize> {
        if k >= self.count() {
            return Err(Error::invalid_argument(
                "k",
                format!("supernode {} out of range for {} supernodes", k, self.count()),
            ));
        }
        Ok(self.supernode_size(k))
    }

    /// The raw boundary array
    pub fn as_slice(&self) -> &[usize] {
        &self.xsup
    }
}
