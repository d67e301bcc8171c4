pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod geometry;
pub mod models;
pub mod pdf;
pub mod render;
pub mod storage;

pub use engine::{AnnotationTool, ChangeKind, EngineEvent, GradingEngine, PositionTarget, PositioningState, TapOutcome};
pub use error::ErrorKind;
pub use export::{CancelToken, ExportError, ExportWorker, GradeFormat};
pub use pdf::{LopdfSource, PdfError, PdfSource};
pub use storage::{FileStore, FsFileStore, StoreError};

use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` wins over the default
/// filter. Safe to call more than once; later calls are ignored.
pub fn init_logging() {
    let installed = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init()
        .is_ok();

    if installed {
        tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);
    }
}
