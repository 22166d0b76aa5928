//! Admin endpoint discovery through the worker's side-channel file.
//!
//! The worker binds its admin listener (possibly on an ephemeral port) and then writes the
//! resulting `host:port` to the file named by `--admin-address-path`. The runtime makes sure
//! that flag is always present and reads the file on demand.

use std::{
    path::{Path, PathBuf},
    sync::OnceLock,
};

use tracing::{debug, trace};
use warden_model::{ADMIN_ADDRESS_FLAG, AdminAddress};

use crate::error::CoreError;

/// Lazily resolved admin address of one worker run.
///
/// The first successful read is cached for the rest of the run; the worker never rebinds.
#[derive(Debug)]
pub struct AdminEndpoint {
    path: PathBuf,
    cached: OnceLock<AdminAddress>,
}

impl AdminEndpoint {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: OnceLock::new(),
        }
    }

    /// Makes sure `args` carry `--admin-address-path`.
    ///
    /// A caller-supplied value is kept as is. Otherwise the flag is appended pointing at
    /// `default_path` (inside the run directory, never the working directory, which may be a
    /// source tree).
    pub fn ensure_flag(args: &mut Vec<String>, default_path: &Path) -> Result<Self, CoreError> {
        if let Some(i) = args.iter().position(|a| a == ADMIN_ADDRESS_FLAG) {
            return match args.get(i + 1) {
                Some(value) if !value.is_empty() => {
                    trace!(target: "warden.core.admin", path = %value, "using caller admin address path");
                    Ok(Self::new(value))
                }
                _ => Err(CoreError::MissingFlagValue {
                    flag: ADMIN_ADDRESS_FLAG,
                }),
            };
        }

        args.push(ADMIN_ADDRESS_FLAG.to_string());
        args.push(default_path.display().to_string());
        Ok(Self::new(default_path))
    }

    /// Side-channel file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The address if it was already resolved.
    pub fn cached(&self) -> Option<&AdminAddress> {
        self.cached.get()
    }

    /// Point check: returns the cached address or reads and parses the side-channel file once.
    ///
    /// Does not wait for the worker to publish; callers retry at their own cadence.
    pub fn resolve(&self) -> Result<AdminAddress, CoreError> {
        if let Some(addr) = self.cached.get() {
            return Ok(addr.clone());
        }

        let text = std::fs::read_to_string(&self.path).map_err(|source| CoreError::Unreadable {
            path: self.path.clone(),
            source,
        })?;
        let addr: AdminAddress = text.parse().map_err(|source| CoreError::Invalid {
            path: self.path.clone(),
            source,
        })?;

        debug!(target: "warden.core.admin", %addr, "admin address resolved");
        Ok(self.cached.get_or_init(|| addr).clone())
    }
}
