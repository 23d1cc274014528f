//! Transfer manager: moving panels between host and device
//!
//! These are the only synchronization points between a panel and its
//! mirror. Every call is blocking.
//!
//! ```text
//! copy_to_device    panel.index  -> mirror.index   (once, at creation)
//!                   panel.values -> mirror.values
//! copy_from_device  mirror.values -> panel.values  (index is host-authoritative)
//! verify            mirror.values ~ panel.values   (diagnostic, see EngineConfig)
//! ```

use crate::config::{EngineConfig, VerifyMode};
use crate::error::Result;
use crate::mirror::{DeviceBuffer, Mirror};
use crate::panel::Panel;
use crate::runtime::Runtime;

/// Outcome of a verification call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Verification is disabled; nothing was compared
    Skipped,
    /// Every value was within tolerance
    Passed {
        /// Number of values compared
        compared: usize,
    },
}

/// First pair of values that failed the tolerance check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Divergence {
    /// Position in the value array
    pub position: usize,
    /// Value read back from the device
    pub device: f64,
    /// Value held by the host panel
    pub host: f64,
}

/// Create a mirror of `panel` on the client's device
///
/// An empty panel yields an empty mirror without any allocation. Otherwise
/// exactly `index_size()` index entries and `nzval_size()` values are
/// allocated and uploaded with one blocking copy each.
pub fn copy_to_device<R: Runtime, P: Panel>(client: &R::Client, panel: &P) -> Result<Mirror<R>> {
    if panel.is_empty() {
        return Ok(Mirror::empty());
    }

    let index = DeviceBuffer::<R, i64>::alloc(client, panel.index_size())?;
    index.upload(client, panel.index())?;

    let values = DeviceBuffer::<R, f64>::alloc(client, panel.nzval_size())?;
    values.upload(client, panel.values())?;

    log::debug!(
        target: "lupanel",
        "mirrored panel to {}: {} blocks, {} index entries, {} values",
        R::name(),
        panel.nblocks(),
        index.len(),
        values.len()
    );
    Ok(Mirror::from_buffers(index, values))
}

/// Overwrite the panel's values with the mirror's values
///
/// No-op for an empty panel. The index array is never copied back.
///
/// # Panics
///
/// If exactly one of `panel` and `mirror` is empty, or if the mirror was
/// created for a panel of a different size.
pub fn copy_from_device<R: Runtime, P: Panel>(
    client: &R::Client,
    panel: &mut P,
    mirror: &Mirror<R>,
) -> Result<()> {
    mirror.assert_matches(panel);
    match mirror.value_buffer() {
        Some(values) => values.download(client, panel.values_mut()),
        None => Ok(()),
    }
}

/// Compare the mirror's values against the panel's values
///
/// A pair `(a, b)` is accepted when `|a - b| <= tolerance * min(|a|, |b|)`.
/// Returns [`Verification::Skipped`] when `config.verify` is disabled.
///
/// # Panics
///
/// On any divergence beyond tolerance, or if exactly one of `panel` and
/// `mirror` is empty. Both are programming errors, not recoverable
/// conditions. Transfer failures while reading back are returned as errors.
pub fn verify<R: Runtime, P: Panel>(
    client: &R::Client,
    panel: &P,
    mirror: &Mirror<R>,
    config: &EngineConfig,
) -> Result<Verification> {
    if config.verify == VerifyMode::Disabled {
        log::trace!(target: "lupanel", "mirror verification disabled, skipping");
        return Ok(Verification::Skipped);
    }

    mirror.assert_matches(panel);
    if panel.is_empty() {
        return Ok(Verification::Passed { compared: 0 });
    }

    let device = mirror.read_values(client)?;
    assert_eq!(
        device.len(),
        panel.nzval_size(),
        "mirror holds {} values, panel holds {}",
        device.len(),
        panel.nzval_size()
    );
    if let Some(d) = first_divergence(&device, panel.values(), config.tolerance) {
        panic!(
            "mirror diverged from host panel at value {}: device {} vs host {} (tolerance {})",
            d.position, d.device, d.host, config.tolerance
        );
    }
    Ok(Verification::Passed {
        compared: device.len(),
    })
}

/// Find the first pair outside `|a - b| <= tolerance * min(|a|, |b|)`
pub fn first_divergence(device: &[f64], host: &[f64], tolerance: f64) -> Option<Divergence> {
    device
        .iter()
        .zip(host)
        .position(|(&a, &b)| !((a - b).abs() <= tolerance * a.abs().min(b.abs())))
        .map(|position| Divergence {
            position,
            device: device[position],
            host: host[position],
        })
}
