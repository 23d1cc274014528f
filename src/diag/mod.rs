//! Diagonal pipeline: factor a supernode's diagonal block on the host
//!
//! The diagonal block lives at the top of an L-panel's device value buffer.
//! [`factor_diag_block`] pulls it into a host staging buffer with one pitched
//! copy, runs a [`DiagFactorKernel`] over it, and pushes the factored block
//! back to the same device location with the inverse pitched copy.
//!
//! ```text
//! device  [ D | L_1 | L_2 ... ]   column stride: panel.leading_dimension()
//!            |            ^
//!            v            |
//! host    [ D' ]  --kernel-->  [ L\U ]   column stride: ldd
//! ```
//!
//! The round trip is blocking: once it returns, solves that read the block
//! may be issued on the same client. Ordering against other streams is the
//! caller's business.

mod kernel;

pub use kernel::{DiagFactorKernel, FactorOptions, FactorStats, ThresholdLu};

use crate::error::{Error, Result};
use crate::mirror::Mirror;
use crate::panel::{LPanel, SupernodeTable};
use crate::runtime::Runtime;

const F64_BYTES: usize = std::mem::size_of::<f64>();

/// Factor the diagonal block of supernode `k` held by `panel`'s mirror
///
/// `diag_buf` (leading dimension `ldd`) receives the block from the device
/// and is handed to `kernel` together with `u_buf` (leading dimension
/// `ldu`). After the kernel runs, `diag_buf` is written back to the device
/// using the same pitches.
///
/// Returns the kernel's status unmodified: `0` on success, non-zero for a
/// singular pivot. The factored block is written back in either case.
///
/// # Errors
///
/// `InvalidArgument` if the panel carries no diagonal block, if its column
/// count differs from the size of supernode `k`, or if a staging buffer is
/// too small for its leading dimension. Transfer failures are propagated.
///
/// # Panics
///
/// If exactly one of `panel` and `mirror` is empty.
#[allow(clippy::too_many_arguments)]
pub fn factor_diag_block<R: Runtime, K: DiagFactorKernel>(
    client: &R::Client,
    panel: &LPanel,
    mirror: &Mirror<R>,
    k: usize,
    xsup: &SupernodeTable,
    diag_buf: &mut [f64],
    ldd: usize,
    u_buf: &mut [f64],
    ldu: usize,
    thresh: f64,
    kernel: &mut K,
    options: &FactorOptions,
    stats: &mut FactorStats,
) -> Result<i32> {
    mirror.assert_matches(panel);

    let ksupsz = xsup.try_supernode_size(k)?;
    if panel.diag().is_none() {
        return Err(Error::invalid_argument(
            "panel",
            "L-panel does not carry its supernode's diagonal block",
        ));
    }
    if panel.ncols() != ksupsz {
        return Err(Error::invalid_argument(
            "k",
            format!(
                "supernode {} has {} columns, panel has {}",
                k,
                ksupsz,
                panel.ncols()
            ),
        ));
    }
    check_staging("u_buf", u_buf.len(), ldu, ksupsz)?;
    check_staging("diag_buf", diag_buf.len(), ldd, ksupsz)?;
    let Some(values) = mirror.value_buffer() else {
        return Err(Error::invalid_argument("mirror", "mirror holds no values"));
    };

    let spitch = panel.leading_dimension() * F64_BYTES;
    let dpitch = ldd * F64_BYTES;
    let width = ksupsz * F64_BYTES;
    let height = ksupsz;

    R::copy_2d_from_device(
        client,
        values.ptr(),
        spitch,
        bytemuck::cast_slice_mut(diag_buf),
        dpitch,
        width,
        height,
    )?;
    log::debug!(
        target: "lupanel",
        "supernode {}: pulled {} x {} diagonal block from {}",
        k,
        ksupsz,
        ksupsz,
        R::name()
    );

    let info = kernel.factor(k, diag_buf, ldd, u_buf, ldu, thresh, xsup, options, stats);
    if info != 0 {
        log::debug!(target: "lupanel", "supernode {}: host kernel returned status {}", k, info);
    }

    R::copy_2d_to_device(
        client,
        bytemuck::cast_slice(diag_buf),
        dpitch,
        values.ptr(),
        spitch,
        width,
        height,
    )?;
    Ok(info)
}

fn check_staging(arg: &'static str, len: usize, ld: usize, n: usize) -> Result<()> {
    if ld < n {
        return Err(Error::invalid_argument(
            arg,
            format!("leading dimension {} is smaller than the block order {}", ld, n),
        ));
    }
    let needed = if n == 0 { 0 } else { (n - 1) * ld + n };
    if len < needed {
        return Err(Error::invalid_argument(
            arg,
            format!("holds {} values, a {} x {} block with ld {} needs {}", len, n, n, ld, needed),
        ));
    }
    Ok(())
}
