//! Engine configuration
//!
//! Verification of mirrors against their host panels is a diagnostic mode.
//! It is on by default in debug builds and off in release builds, where it
//! must be requested explicitly (in code or through the environment). When
//! disabled, [`verify`](crate::transfer::verify) returns
//! [`Verification::Skipped`](crate::transfer::Verification::Skipped)
//! without touching the device.

use crate::error::{Error, Result};

/// Default relative tolerance for mirror verification
pub const DEFAULT_TOLERANCE: f64 = 1e-3;

/// Environment variable enabling or disabling verification
pub const ENV_VERIFY: &str = "LUPANEL_VERIFY";

/// Environment variable overriding the verification tolerance
pub const ENV_TOLERANCE: &str = "LUPANEL_VERIFY_TOLERANCE";

/// Whether mirror verification runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyMode {
    /// Verification calls return immediately
    Disabled,
    /// Verification compares device values against host values
    Enabled,
}

impl Default for VerifyMode {
    fn default() -> Self {
        if cfg!(debug_assertions) {
            VerifyMode::Enabled
        } else {
            VerifyMode::Disabled
        }
    }
}

/// Configuration threaded into the transfer manager
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    /// Verification mode
    pub verify: VerifyMode,
    /// Relative tolerance: `|a - b| <= tolerance * min(|a|, |b|)`
    pub tolerance: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            verify: VerifyMode::default(),
            tolerance: DEFAULT_TOLERANCE,
        }
    }
}

impl EngineConfig {
    /// Verification enabled with the given tolerance
    pub fn verifying(tolerance: f64) -> Self {
        Self {
            verify: VerifyMode::Enabled,
            tolerance,
        }
    }

    /// Verification disabled
    pub fn without_verification() -> Self {
        Self {
            verify: VerifyMode::Disabled,
            ..Default::default()
        }
    }

    /// Replace the tolerance
    pub fn with_tolerance(self, tolerance: f64) -> Self {
        Self { tolerance, ..self }
    }

    /// Defaults overridden by `LUPANEL_VERIFY` and `LUPANEL_VERIFY_TOLERANCE`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_VERIFY) {
            config.verify = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "on" | "yes" => VerifyMode::Enabled,
                "0" | "false" | "off" | "no" => VerifyMode::Disabled,
                other => {
                    return Err(Error::invalid_argument(
                        ENV_VERIFY,
                        format!("expected on/off, got '{}'", other),
                    ));
                }
            };
        }

        if let Some(raw) = lookup(ENV_TOLERANCE) {
            config.tolerance = raw.trim().parse::<f64>().map_err(|e| {
                Error::invalid_argument(ENV_TOLERANCE, format!("'{}': {}", raw, e))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check the tolerance is a finite non-negative number
    pub fn validate(&self) -> Result<()> {
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(Error::invalid_argument(
                "tolerance",
                format!("must be finite and non-negative, got {}", self.tolerance),
            ));
        }
        Ok(())
    }
}
