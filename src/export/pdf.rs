//! Graded PDF export: source pages with badges and annotations baked in.

use std::path::{Path, PathBuf};

use super::{CancelToken, ExportError};
use crate::config::GRADED_SUFFIX;
use crate::models::{file_stem, CopyFeedback};
use crate::pdf::PdfSource;
use crate::render::render_page;
use crate::storage::{parent_dir, FileStore};

/// `<stem>_graded.pdf`, beside the source unless `output_dir` is given.
pub fn graded_output_path(source: &Path, output_dir: Option<&Path>) -> PathBuf {
    let dir = output_dir.map(Path::to_path_buf).unwrap_or_else(|| parent_dir(source));
    dir.join(format!("{}{GRADED_SUFFIX}.pdf", file_stem(source)))
}

/// Render the graded PDF in memory.
pub fn render_graded_pdf(
    copy: &CopyFeedback,
    source_bytes: &[u8],
    pdf_source: &dyn PdfSource,
    cancel: &CancelToken,
) -> Result<Vec<u8>, ExportError> {
    let mut canvas = pdf_source.open(source_bytes)?;
    let page_count = canvas.page_count();
    warn_unreachable_pages(copy, page_count);

    for page in 0..page_count {
        cancel.check()?;
        let Some(bounds) = canvas.page_bounds(page) else {
            continue;
        };
        let overlay = render_page(copy, page, bounds.size());
        canvas.draw_overlay(page, &overlay)?;
    }

    cancel.check()?;
    Ok(canvas.finish()?)
}

fn warn_unreachable_pages(copy: &CopyFeedback, page_count: usize) {
    let mut pages = copy
        .sections
        .iter()
        .filter_map(|s| s.position.map(|p| p.page))
        .chain(copy.questions().filter_map(|(_, q)| q.position.map(|p| p.page)))
        .chain(copy.total_position.map(|p| p.page))
        .chain(copy.annotations.iter().map(|a| a.page()));
    if let Some(page) = pages.find(|p| *p >= page_count) {
        tracing::warn!(copy_id = %copy.id, page, page_count, "Marks target a page the PDF does not have");
    }
}

/// Export one copy. The source PDF is only read; the output is written
/// atomically once fully rendered.
pub fn export_pdf(
    copy: &CopyFeedback,
    pdf_source: &dyn PdfSource,
    store: &dyn FileStore,
    output_dir: Option<&Path>,
    cancel: &CancelToken,
) -> Result<PathBuf, ExportError> {
    let source = &copy.pdf_path;
    if !store.exists(source) {
        return Err(ExportError::FileNotFound(source.clone()));
    }
    let bytes = store.read(source).map_err(ExportError::from_read)?;

    tracing::info!(copy_id = %copy.id, source = %source.display(), "Exporting graded PDF");
    let graded = render_graded_pdf(copy, &bytes, pdf_source, cancel)?;

    let output = graded_output_path(source, output_dir);
    cancel.check()?;
    store.write(&output, &graded).map_err(ExportError::from_write)?;

    tracing::info!(copy_id = %copy.id, output = %output.display(), bytes = graded.len(), "Graded PDF written");
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::NormalizedPosition;
    use crate::models::{Annotation, Question, QuestionStatus, Section};
    use crate::pdf::fixtures::{page_contents, pdf_with_pages};
    use crate::pdf::LopdfSource;
    use crate::storage::{FsFileStore, MemoryFileStore};

    fn graded_copy(path: &Path) -> CopyFeedback {
        let mut copy = CopyFeedback::new(path);
        let mut section = Section::new("Analysis", None);
        section.position = Some(NormalizedPosition::new(0.1, 0.95, 0));
        let mut q = Question::new("Limits", None, 2.0);
        q.set_status(QuestionStatus::Correct);
        q.position = Some(NormalizedPosition::new(0.5, 0.5, 1));
        section.questions.push(q);
        copy.sections.push(section);
        copy.total_position = Some(NormalizedPosition::new(0.8, 0.1, 0));
        copy.annotations.push(Annotation::text("Show work", NormalizedPosition::new(0.2, 0.3, 1)));
        copy
    }

    #[test]
    fn output_path_uses_graded_suffix() {
        assert_eq!(
            graded_output_path(Path::new("/exams/alice.pdf"), None),
            PathBuf::from("/exams/alice_graded.pdf")
        );
        assert_eq!(
            graded_output_path(Path::new("/exams/alice.pdf"), Some(Path::new("/out"))),
            PathBuf::from("/out/alice_graded.pdf")
        );
    }

    #[test]
    fn export_preserves_pages_and_source() {
        let tmp = tempfile::tempdir().unwrap();
        let source_path = tmp.path().join("alice.pdf");
        let source = pdf_with_pages(&[(600, 800), (595, 842)]);
        std::fs::write(&source_path, &source).unwrap();

        let copy = graded_copy(&source_path);
        let out = export_pdf(&copy, &LopdfSource, &FsFileStore, None, &CancelToken::new()).unwrap();

        assert_eq!(std::fs::read(&source_path).unwrap(), source);
        let graded = std::fs::read(&out).unwrap();
        let canvas = LopdfSource.open(&graded).unwrap();
        assert_eq!(canvas.page_count(), 2);
        assert_eq!(canvas.page_bounds(1).unwrap().width, 595.0);

        let contents = page_contents(&graded);
        assert!(contents[0].contains("(Page 1) Tj"));
        assert!(contents[0].contains("(A: 2/2) Tj"));
        assert!(contents[0].contains("(Total) Tj"));
        assert!(contents[1].contains("(LIM 2/2) Tj"));
        assert!(contents[1].contains("(Show work) Tj"));
        assert!(!contents[1].contains("(Total) Tj"));
    }

    #[test]
    fn missing_source_is_file_not_found() {
        let store = MemoryFileStore::new();
        let copy = graded_copy(Path::new("/nowhere/bob.pdf"));
        let err = export_pdf(&copy, &LopdfSource, &store, None, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ExportError::FileNotFound(_)));
    }

    #[test]
    fn corrupt_source_is_invalid_source() {
        let store = MemoryFileStore::new();
        store.write(Path::new("/x/bad.pdf"), b"%PDF-garbage").unwrap();
        let copy = graded_copy(Path::new("/x/bad.pdf"));
        let err = export_pdf(&copy, &LopdfSource, &store, None, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ExportError::InvalidSource(_)));
        assert!(!store.exists(Path::new("/x/bad_graded.pdf")));
    }

    #[test]
    fn write_failure_is_save_failed() {
        let store = MemoryFileStore::new();
        store.write(Path::new("/x/c.pdf"), &pdf_with_pages(&[(600, 800)])).unwrap();
        store.set_fail_writes(true);
        let copy = graded_copy(Path::new("/x/c.pdf"));
        let err = export_pdf(&copy, &LopdfSource, &store, None, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, ExportError::SaveFailed(_)));
    }
}
