//! Device-resident dense BLAS primitives
//!
//! The panel solves need exactly one dense kernel: a column-major triangular
//! solve with multiple right-hand sides (`dtrsm`), executed entirely on
//! device-resident operands and bound to a client's stream.

use crate::error::{Error, Result};
use crate::runtime::Runtime;

/// Which side of `B` the triangular matrix multiplies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Solve `op(A) * X = alpha * B`
    Left,
    /// Solve `X * op(A) = alpha * B`
    Right,
}

/// Which triangle of `A` is referenced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillMode {
    /// Lower triangle
    Lower,
    /// Upper triangle
    Upper,
}

/// Operation applied to `A`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transpose {
    /// `op(A) = A`
    NoTrans,
    /// `op(A) = A^T`
    Trans,
}

/// Whether the diagonal of `A` is read or assumed to be one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Diag {
    /// Diagonal entries are read from `A`
    NonUnit,
    /// Diagonal entries are implicitly one and never read
    Unit,
}

/// Shape and mode of a triangular solve
///
/// `m` x `n` is the shape of `B`. `A` is `m` x `m` for [`Side::Left`] and
/// `n` x `n` for [`Side::Right`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrsmParams {
    /// Side of `A`
    pub side: Side,
    /// Referenced triangle of `A`
    pub fill: FillMode,
    /// Transpose applied to `A`
    pub trans: Transpose,
    /// Unit or non-unit diagonal
    pub diag: Diag,
    /// Rows of `B`
    pub m: usize,
    /// Columns of `B`
    pub n: usize,
    /// Scale applied to `B` before the solve
    pub alpha: f64,
}

impl TrsmParams {
    /// Order of the triangular matrix `A`
    pub fn order(&self) -> usize {
        match self.side {
            Side::Left => self.m,
            Side::Right => self.n,
        }
    }

    /// Whether `op(A)` is effectively lower triangular
    pub fn op_is_lower(&self) -> bool {
        (self.fill == FillMode::Lower) == (self.trans == Transpose::NoTrans)
    }
}

/// A column-major `f64` matrix living in device memory
///
/// `ptr` is the device address of element (0, 0) and `ld` the distance, in
/// elements, between consecutive columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceMatrix {
    /// Device address of the first element
    pub ptr: u64,
    /// Leading dimension in elements
    pub ld: usize,
}

impl DeviceMatrix {
    /// Create a device matrix view
    pub fn new(ptr: u64, ld: usize) -> Self {
        Self { ptr, ld }
    }

    /// The same matrix starting `elems` elements further into the buffer
    pub fn offset(self, elems: usize) -> Self {
        Self {
            ptr: self.ptr + (elems * std::mem::size_of::<f64>()) as u64,
            ld: self.ld,
        }
    }
}

/// Device-resident triangular solve
///
/// Implemented by runtime clients. The call is issued on the client's
/// stream; backends with asynchronous streams return before the solve has
/// finished, so results must not be read before `synchronize`.
///
/// `A` and `B` may live in the same allocation (an L-panel solves against
/// its own leading block) as long as the referenced regions do not overlap.
pub trait TrsmOps<R: Runtime> {
    /// Solve in place over `b`
    fn trsm(&self, params: &TrsmParams, a: DeviceMatrix, b: DeviceMatrix) -> Result<()>;
}

/// Validate leading dimensions and pointers of a triangular solve
///
/// Returns `Ok(false)` when the solve is a quick return (empty `B`).
pub fn validate_trsm(params: &TrsmParams, a: DeviceMatrix, b: DeviceMatrix) -> Result<bool> {
    if params.m == 0 || params.n == 0 {
        return Ok(false);
    }
    let k = params.order();
    if a.ld < k.max(1) {
        return Err(Error::invalid_argument(
            "lda",
            format!("lda = {} is smaller than the order {} of A", a.ld, k),
        ));
    }
    if b.ld < params.m.max(1) {
        return Err(Error::invalid_argument(
            "ldb",
            format!("ldb = {} is smaller than the {} rows of B", b.ld, params.m),
        ));
    }
    if a.ptr == 0 || b.ptr == 0 {
        return Err(Error::invalid_argument(
            "ptr",
            "triangular solve operand is a null device pointer",
        ));
    }
    Ok(true)
}
