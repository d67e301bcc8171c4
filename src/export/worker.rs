//! Background export execution.
//!
//! Exports are CPU and IO heavy, so they run on the blocking pool with an
//! owned snapshot of each copy. Mutations made after the snapshot is taken
//! do not show up in the output.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::{archive, grades, pdf, ExportError, GradeFormat};
use crate::models::CopyFeedback;
use crate::pdf::PdfSource;
use crate::storage::FileStore;

/// Shared flag a caller flips to abandon an in-flight export.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    pub fn check(&self) -> Result<(), ExportError> {
        if self.is_cancelled() {
            Err(ExportError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[derive(Clone)]
pub struct ExportWorker {
    pdf: Arc<dyn PdfSource>,
    store: Arc<dyn FileStore>,
}

impl ExportWorker {
    pub fn new(pdf: Arc<dyn PdfSource>, store: Arc<dyn FileStore>) -> Self {
        Self { pdf, store }
    }

    async fn run<T, F>(&self, job: F) -> Result<T, ExportError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn PdfSource, &dyn FileStore) -> Result<T, ExportError> + Send + 'static,
    {
        let pdf = self.pdf.clone();
        let store = self.store.clone();
        tokio::task::spawn_blocking(move || job(pdf.as_ref(), store.as_ref()))
            .await
            .map_err(|e| ExportError::SaveFailed(format!("export task failed: {e}")))?
    }

    /// Graded PDF for one copy. Returns the written path.
    pub async fn export_pdf(
        &self,
        copy: CopyFeedback,
        output_dir: Option<PathBuf>,
        cancel: CancelToken,
    ) -> Result<PathBuf, ExportError> {
        self.run(move |pdf_source, store| {
            pdf::export_pdf(&copy, pdf_source, store, output_dir.as_deref(), &cancel)
        })
        .await
    }

    /// Every copy's graded PDF bundled into one archive at `dest`.
    pub async fn export_archive(
        &self,
        copies: Vec<CopyFeedback>,
        dest: PathBuf,
        cancel: CancelToken,
    ) -> Result<PathBuf, ExportError> {
        self.run(move |pdf_source, store| archive::export_archive(&copies, pdf_source, store, &dest, &cancel))
            .await
    }

    /// Grade table for all copies at `dest`.
    pub async fn export_grades(
        &self,
        copies: Vec<CopyFeedback>,
        format: GradeFormat,
        dest: PathBuf,
    ) -> Result<PathBuf, ExportError> {
        self.run(move |_, store| grades::write_grades(&copies, format, store, &dest))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NormalizedPosition;
    use crate::pdf::fixtures::pdf_with_pages;
    use crate::pdf::LopdfSource;
    use crate::storage::FsFileStore;

    fn worker() -> ExportWorker {
        ExportWorker::new(Arc::new(LopdfSource), Arc::new(FsFileStore))
    }

    fn copy_in(dir: &std::path::Path) -> CopyFeedback {
        let pdf_path = dir.join("exam.pdf");
        std::fs::write(&pdf_path, pdf_with_pages(&[(600, 800)])).unwrap();
        let mut copy = CopyFeedback::new(pdf_path);
        copy.total_position = Some(NormalizedPosition::new(0.8, 0.1, 0));
        copy
    }

    #[test]
    fn token_clones_share_state() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(token.check().is_ok());
        clone.cancel();
        assert!(token.is_cancelled());
        assert!(matches!(token.check(), Err(ExportError::Cancelled)));
    }

    #[tokio::test]
    async fn exports_pdf_off_thread() {
        let tmp = tempfile::tempdir().unwrap();
        let copy = copy_in(tmp.path());
        let path = worker().export_pdf(copy, None, CancelToken::new()).await.unwrap();
        assert_eq!(path, tmp.path().join("exam_graded.pdf"));
        assert!(path.is_file());
    }

    #[tokio::test]
    async fn cancelled_export_leaves_no_file() {
        let tmp = tempfile::tempdir().unwrap();
        let copy = copy_in(tmp.path());
        let token = CancelToken::new();
        token.cancel();

        let err = worker().export_pdf(copy, None, token).await.unwrap_err();
        assert!(matches!(err, ExportError::Cancelled));
        assert!(!tmp.path().join("exam_graded.pdf").exists());
        let entries = std::fs::read_dir(tmp.path()).unwrap().count();
        assert_eq!(entries, 1);
    }

    #[tokio::test]
    async fn snapshot_is_isolated_from_later_edits() {
        let tmp = tempfile::tempdir().unwrap();
        let mut copy = copy_in(tmp.path());
        copy.student_name = Some("Before".into());
        let snapshot = copy.clone();
        copy.student_name = Some("After".into());

        let dest = tmp.path().join("grades.csv");
        worker()
            .export_grades(vec![snapshot], GradeFormat::Csv, dest.clone())
            .await
            .unwrap();
        let csv = std::fs::read_to_string(dest).unwrap();
        assert!(csv.contains("Before"));
        assert!(!csv.contains("After"));
    }
}
