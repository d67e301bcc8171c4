use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Copymark";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Extension of the grading sidecar written next to each PDF.
pub const SIDECAR_EXTENSION: &str = "json";

/// Suffix appended to the source file stem for exported PDFs.
pub const GRADED_SUFFIX: &str = "_graded";

/// Extension of the bulk export bundle.
pub const ARCHIVE_EXTENSION: &str = "zip";

/// File name of the persisted stamp catalog.
pub const STAMP_CATALOG_FILE: &str = "stamps.json";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "copymark_lib=info"
}

/// Get the application data directory
/// ~/Copymark/ on all platforms. Falls back to the working directory
/// when no home directory is known (sandboxed hosts).
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Get the default directory for exported PDFs, archives and reports
pub fn exports_dir() -> PathBuf {
    app_data_dir().join("exports")
}

/// Get the path of the persisted stamp catalog
pub fn stamp_catalog_path() -> PathBuf {
    app_data_dir().join(STAMP_CATALOG_FILE)
}

/// Paths injected into the grading engine.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub exports_dir: PathBuf,
    pub stamp_catalog_path: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            exports_dir: exports_dir(),
            stamp_catalog_path: stamp_catalog_path(),
        }
    }
}

impl EngineConfig {
    /// Config rooted at an arbitrary directory (tests, host sandboxes).
    pub fn rooted_at(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            exports_dir: root.join("exports"),
            stamp_catalog_path: root.join(STAMP_CATALOG_FILE),
        }
    }
}
