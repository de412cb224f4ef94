//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as an
//! `Arc<CoreConfig>`. Nothing below this module reads process environment variables, so request
//! handling and tests never observe a configuration change half way through.

use crate::constants::{
    DEFAULT_PATCHLIST_FILE, DEFAULT_REFRESH_INTERVAL_SECS, DEFAULT_STATUS_FILE,
    DEFAULT_UPLOAD_DIR,
};
use crate::{PatchError, PatchResult};
use patchlist_types::SafeFilename;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// What to do at startup when the ledger document cannot be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum LedgerRecovery {
    /// Refuse to start. The document is left untouched for an operator to inspect.
    #[default]
    Refuse,
    /// Move the corrupt document aside and start from an empty ledger.
    MoveAside,
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    upload_dir: PathBuf,
    status_file: PathBuf,
    patchlist_file: PathBuf,
    allowed_extensions: Option<BTreeSet<String>>,
    refresh_interval: Duration,
    ledger_recovery: LedgerRecovery,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with no extension filter, the default refresh interval and
    /// [`LedgerRecovery::Refuse`].
    pub fn new(
        upload_dir: PathBuf,
        status_file: PathBuf,
        patchlist_file: PathBuf,
    ) -> PatchResult<Self> {
        for (name, path) in [
            ("upload_dir", &upload_dir),
            ("status_file", &status_file),
            ("patchlist_file", &patchlist_file),
        ] {
            if path.as_os_str().is_empty() {
                return Err(PatchError::InvalidInput(format!("{} cannot be empty", name)));
            }
        }
        if status_file == patchlist_file {
            return Err(PatchError::InvalidInput(
                "status_file and patchlist_file must be different paths".into(),
            ));
        }

        Ok(Self {
            upload_dir,
            status_file,
            patchlist_file,
            allowed_extensions: None,
            refresh_interval: Duration::from_secs(DEFAULT_REFRESH_INTERVAL_SECS),
            ledger_recovery: LedgerRecovery::Refuse,
        })
    }

    /// Resolve configuration from process environment variables.
    ///
    /// Intended to be called exactly once, from `main`, after `.env` has been loaded.
    ///
    /// # Environment Variables
    /// - `UPLOAD_FOLDER` (default: `static/uploads`)
    /// - `FILE_STATUS` (default: `file_status.json`)
    /// - `PATCHLIST_FILE` (default: `patcher.txt`)
    /// - `PATCHLIST_INTERVAL_SECS` (default: `300`)
    /// - `ALLOWED_EXTENSIONS` comma separated, unset means every extension is accepted
    /// - `ALLOW_LEDGER_RESET` (default: `false`)
    pub fn from_env() -> PatchResult<Self> {
        let var = |name: &str| std::env::var(name).ok();

        let cfg = Self::new(
            PathBuf::from(var("UPLOAD_FOLDER").unwrap_or_else(|| DEFAULT_UPLOAD_DIR.into())),
            PathBuf::from(var("FILE_STATUS").unwrap_or_else(|| DEFAULT_STATUS_FILE.into())),
            PathBuf::from(var("PATCHLIST_FILE").unwrap_or_else(|| DEFAULT_PATCHLIST_FILE.into())),
        )?
        .with_allowed_extensions(allowed_extensions_from_env_value(var(
            "ALLOWED_EXTENSIONS",
        )))
        .with_refresh_interval(refresh_interval_from_env_value(var(
            "PATCHLIST_INTERVAL_SECS",
        ))?)?;

        let recovery = if flag_from_env_value(var("ALLOW_LEDGER_RESET"))? {
            LedgerRecovery::MoveAside
        } else {
            LedgerRecovery::Refuse
        };

        Ok(cfg.with_ledger_recovery(recovery))
    }

    pub fn with_allowed_extensions(mut self, allowed: Option<BTreeSet<String>>) -> Self {
        self.allowed_extensions = allowed;
        self
    }

    pub fn with_refresh_interval(mut self, interval: Duration) -> PatchResult<Self> {
        if interval.is_zero() {
            return Err(PatchError::InvalidInput(
                "patchlist refresh interval must be greater than zero".into(),
            ));
        }
        self.refresh_interval = interval;
        Ok(self)
    }

    pub fn with_ledger_recovery(mut self, recovery: LedgerRecovery) -> Self {
        self.ledger_recovery = recovery;
        self
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    pub fn status_file(&self) -> &Path {
        &self.status_file
    }

    pub fn patchlist_file(&self) -> &Path {
        &self.patchlist_file
    }

    pub fn allowed_extensions(&self) -> Option<&BTreeSet<String>> {
        self.allowed_extensions.as_ref()
    }

    pub fn refresh_interval(&self) -> Duration {
        self.refresh_interval
    }

    pub fn ledger_recovery(&self) -> LedgerRecovery {
        self.ledger_recovery
    }

    /// Whether `filename` passes the extension allow-list. With no list configured every name
    /// passes; with a list, names without an extension are rejected.
    pub fn extension_allowed(&self, filename: &SafeFilename) -> bool {
        match &self.allowed_extensions {
            None => true,
            Some(allowed) => filename
                .extension()
                .is_some_and(|ext| allowed.contains(&ext)),
        }
    }
}

/// Parse the refresh interval from an optional string of whole seconds.
///
/// `None` or blank falls back to the default.
pub fn refresh_interval_from_env_value(value: Option<String>) -> PatchResult<Duration> {
    let value = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty());

    let secs = match value {
        None => DEFAULT_REFRESH_INTERVAL_SECS,
        Some(v) => v.parse::<u64>().map_err(|_| {
            PatchError::InvalidInput(format!(
                "PATCHLIST_INTERVAL_SECS must be a whole number of seconds, got {:?}",
                v
            ))
        })?,
    };

    Ok(Duration::from_secs(secs))
}

/// Parse a comma separated extension list such as `"grf, .GPF,bin"`.
///
/// Entries are trimmed, lowercased and stripped of a leading dot. `None`, blank input, or a
/// list with no usable entries all mean "no filter".
pub fn allowed_extensions_from_env_value(value: Option<String>) -> Option<BTreeSet<String>> {
    let set: BTreeSet<String> = value?
        .split(',')
        .map(|ext| ext.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .collect();

    if set.is_empty() {
        None
    } else {
        Some(set)
    }
}

/// Parse a boolean flag. Accepts `true/false`, `1/0`, `yes/no` in any case; `None` is false.
pub fn flag_from_env_value(value: Option<String>) -> PatchResult<bool> {
    let Some(value) = value else {
        return Ok(false);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "" | "false" | "0" | "no" => Ok(false),
        "true" | "1" | "yes" => Ok(true),
        other => Err(PatchError::InvalidInput(format!(
            "expected a boolean flag, got {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> CoreConfig {
        CoreConfig::new("uploads".into(), "status.json".into(), "patcher.txt".into()).unwrap()
    }

    #[test]
    fn test_new_rejects_empty_and_clashing_paths() {
        assert!(CoreConfig::new("".into(), "s.json".into(), "p.txt".into()).is_err());
        assert!(CoreConfig::new("u".into(), "same".into(), "same".into()).is_err());
    }

    #[test]
    fn test_defaults() {
        let cfg = cfg();
        assert_eq!(cfg.refresh_interval(), Duration::from_secs(300));
        assert_eq!(cfg.ledger_recovery(), LedgerRecovery::Refuse);
        assert!(cfg.allowed_extensions().is_none());
    }

    #[test]
    fn test_refresh_interval_parsing() {
        assert_eq!(
            refresh_interval_from_env_value(None).unwrap(),
            Duration::from_secs(300)
        );
        assert_eq!(
            refresh_interval_from_env_value(Some(" 60 ".into())).unwrap(),
            Duration::from_secs(60)
        );
        assert!(refresh_interval_from_env_value(Some("5m".into())).is_err());
        assert!(cfg().with_refresh_interval(Duration::ZERO).is_err());
    }

    #[test]
    fn test_extension_list_parsing() {
        let set = allowed_extensions_from_env_value(Some("grf, .GPF,,bin ".into())).unwrap();
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec!["bin".to_string(), "gpf".to_string(), "grf".to_string()]
        );
        assert!(allowed_extensions_from_env_value(Some(" , ".into())).is_none());
        assert!(allowed_extensions_from_env_value(None).is_none());
    }

    #[test]
    fn test_extension_allowed() {
        let open = cfg();
        assert!(open.extension_allowed(&SafeFilename::new("README").unwrap()));

        let filtered = cfg().with_allowed_extensions(allowed_extensions_from_env_value(Some(
            "grf,bin".into(),
        )));
        assert!(filtered.extension_allowed(&SafeFilename::new("data.GRF").unwrap()));
        assert!(!filtered.extension_allowed(&SafeFilename::new("run.exe").unwrap()));
        assert!(!filtered.extension_allowed(&SafeFilename::new("README").unwrap()));
    }

    #[test]
    fn test_flag_parsing() {
        assert!(!flag_from_env_value(None).unwrap());
        assert!(flag_from_env_value(Some("TRUE".into())).unwrap());
        assert!(!flag_from_env_value(Some("0".into())).unwrap());
        assert!(flag_from_env_value(Some("perhaps".into())).is_err());
    }
}
