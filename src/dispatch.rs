//! Kernel dispatcher: panel triangular solves against a factored diagonal block
//!
//! Both solves run in place over the panel's mirror and issue exactly one
//! [`TrsmOps::trsm`] call on the client's stream. They do not synchronize;
//! read results only after [`RuntimeClient::synchronize`].
//!
//! The diagonal operand is a [`DeviceMatrix`] usually obtained from
//! [`LPanel::diag_block`] on the supernode's own L-panel. It must already
//! hold the factored block, and any pipeline call that produced it must be
//! ordered before the solve.
//!
//! [`RuntimeClient::synchronize`]: crate::runtime::RuntimeClient::synchronize

use crate::error::Result;
use crate::mirror::Mirror;
use crate::panel::{LPanel, Panel, UPanel};
use crate::runtime::{Diag, DeviceMatrix, FillMode, Runtime, Side, Transpose, TrsmOps, TrsmParams};

/// Solve `X * U_diag = B` over the off-diagonal rows of an L-panel
///
/// `diag` holds `U_diag` in its upper triangle (non-unit diagonal), with
/// order equal to the panel's column count. When the panel carries its own
/// diagonal block, that block's rows are excluded from `B`; the block itself
/// may be passed as `diag`.
///
/// No-op for an empty panel.
///
/// # Panics
///
/// If exactly one of `panel` and `mirror` is empty.
pub fn l_panel_solve<R: Runtime>(
    client: &R::Client,
    panel: &LPanel,
    mirror: &Mirror<R>,
    diag: DeviceMatrix,
) -> Result<()>
where
    R::Client: TrsmOps<R>,
{
    mirror.assert_matches(panel);
    let Some(values) = mirror.values_matrix(panel.leading_dimension()) else {
        return Ok(());
    };

    let off = panel.off_diagonal();
    let params = TrsmParams {
        side: Side::Right,
        fill: FillMode::Upper,
        trans: Transpose::NoTrans,
        diag: Diag::NonUnit,
        m: off.rows,
        n: panel.ncols(),
        alpha: 1.0,
    };
    log::trace!(
        target: "lupanel",
        "L-panel solve on {}: {} x {} from row {}",
        R::name(),
        params.m,
        params.n,
        off.row_offset
    );
    client.trsm(&params, diag, values.offset(off.row_offset))
}

/// Solve `L_diag * X = B` over the whole value buffer of a U-panel
///
/// `diag` holds `L_diag` in its strictly lower triangle; the diagonal is
/// taken to be one and never read.
///
/// No-op for an empty panel.
///
/// # Panics
///
/// If exactly one of `panel` and `mirror` is empty.
pub fn u_panel_solve<R: Runtime>(
    client: &R::Client,
    panel: &UPanel,
    mirror: &Mirror<R>,
    diag: DeviceMatrix,
) -> Result<()>
where
    R::Client: TrsmOps<R>,
{
    mirror.assert_matches(panel);
    let Some(values) = mirror.values_matrix(panel.leading_dimension()) else {
        return Ok(());
    };

    let params = TrsmParams {
        side: Side::Left,
        fill: FillMode::Lower,
        trans: Transpose::NoTrans,
        diag: Diag::Unit,
        m: panel.supernode_size(),
        n: panel.nzcols(),
        alpha: 1.0,
    };
    log::trace!(
        target: "lupanel",
        "U-panel solve on {}: {} x {}",
        R::name(),
        params.m,
        params.n
    );
    client.trsm(&params, diag, values)
}
