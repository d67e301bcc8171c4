//! Grading session: the single owner of mutable grading state.
//!
//! Every mutation goes through [`GradingEngine`]. A mutation that names an
//! unknown copy, section, question or annotation is a silent no-op. A
//! successful mutation refreshes the copy's `updatedAt`, persists its
//! sidecar, bumps the engine version and broadcasts an [`EngineEvent`].
//! Persistence failures never abort a mutation; they are kept in
//! [`GradingEngine::last_save_error`] until the next successful save.

pub mod annotations;
pub mod events;
pub mod positioning;
pub mod propagation;
pub mod rubric;

pub use annotations::{AnnotationTool, TapOutcome, HIT_RADIUS};
pub use events::{ChangeKind, EngineEvent, EVENT_CHANNEL_CAPACITY};
pub use positioning::{PositionTarget, PositioningState};

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;
use uuid::Uuid;

use crate::config::{EngineConfig, ARCHIVE_EXTENSION};
use crate::export::{ExportError, GradeFormat};
use crate::models::{file_stem, Annotation, CopyFeedback, RubricTemplate, StampCatalog, StampColor, StampDefinition};
use crate::pdf::split_pages;
use crate::storage::{self, FileStore, StoreError};

pub struct GradingEngine {
    store: Arc<dyn FileStore>,
    config: EngineConfig,
    copies: Vec<CopyFeedback>,
    selected: Option<Uuid>,
    catalog: StampCatalog,
    tool: AnnotationTool,
    selected_annotation: Option<Uuid>,
    inline_editing: Option<Uuid>,
    positioning: PositioningState,
    last_save_error: Option<String>,
    version: u64,
    events: broadcast::Sender<EngineEvent>,
}

impl GradingEngine {
    /// New session. The stamp catalog is loaded from the configured path;
    /// an unreadable catalog falls back to the defaults.
    pub fn new(store: Arc<dyn FileStore>, config: EngineConfig) -> Self {
        let catalog = match storage::load_catalog(store.as_ref(), &config.stamp_catalog_path) {
            Ok(catalog) => catalog,
            Err(e) => {
                tracing::warn!(error = %e, path = %config.stamp_catalog_path.display(), "Stamp catalog unreadable, using defaults");
                StampCatalog::with_defaults()
            }
        };
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            store,
            config,
            copies: Vec::new(),
            selected: None,
            catalog,
            tool: AnnotationTool::default(),
            selected_annotation: None,
            inline_editing: None,
            positioning: PositioningState::Idle,
            last_save_error: None,
            version: 0,
            events,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Where a bulk PDF archive named `name` lands by default.
    pub fn default_archive_path(&self, name: &str) -> PathBuf {
        self.config.exports_dir.join(format!("{name}.{ARCHIVE_EXTENSION}"))
    }

    /// Where a grade report named `name` lands by default.
    pub fn default_grades_path(&self, name: &str, format: GradeFormat) -> PathBuf {
        self.config.exports_dir.join(format!("{name}.{}", format.extension()))
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Change notification
    // ═══════════════════════════════════════════════════════════════════════

    /// Monotonic counter, bumped once per applied change.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&mut self, copy_id: Option<Uuid>, change: ChangeKind) {
        self.version += 1;
        // No receivers is fine: polling callers use `version()`.
        let _ = self.events.send(EngineEvent {
            version: self.version,
            copy_id,
            change,
        });
    }

    /// Last persistence failure, cleared by the next successful save.
    pub fn last_save_error(&self) -> Option<&str> {
        self.last_save_error.as_deref()
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Mutation plumbing
    // ═══════════════════════════════════════════════════════════════════════

    /// Save a copy's sidecar. A blank note still being edited inline is
    /// left out of the file.
    fn persist(&mut self, copy_id: Uuid) {
        let Some(copy) = self.copies.iter().find(|c| c.id == copy_id) else {
            return;
        };
        let saved = without_blank_inline(copy, self.inline_editing);
        match storage::save_copy(self.store.as_ref(), &saved) {
            Ok(()) => self.last_save_error = None,
            Err(e) => {
                tracing::warn!(copy_id = %copy_id, error = %e, "Sidecar save failed");
                self.last_save_error = Some(e.to_string());
            }
        }
    }

    /// Apply `f` to copy `copy_id`. `f` returns `None` when the entity it
    /// looks for does not exist, in which case nothing is touched.
    pub(crate) fn mutate_copy<R>(
        &mut self,
        copy_id: Uuid,
        change: ChangeKind,
        f: impl FnOnce(&mut CopyFeedback) -> Option<R>,
    ) -> Option<R> {
        let Some(copy) = self.copies.iter_mut().find(|c| c.id == copy_id) else {
            tracing::debug!(copy_id = %copy_id, ?change, "Mutation on unknown copy ignored");
            return None;
        };
        let Some(result) = f(copy) else {
            tracing::debug!(copy_id = %copy_id, ?change, "Mutation target not found, ignored");
            return None;
        };
        copy.touch();
        self.persist(copy_id);
        self.emit(Some(copy_id), change);
        Some(result)
    }

    /// Apply `f` to the selected copy.
    pub(crate) fn mutate_selected<R>(
        &mut self,
        change: ChangeKind,
        f: impl FnOnce(&mut CopyFeedback) -> Option<R>,
    ) -> Option<R> {
        let Some(copy_id) = self.selected else {
            tracing::debug!(?change, "Mutation without a selected copy ignored");
            return None;
        };
        self.mutate_copy(copy_id, change, f)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Collection
    // ═══════════════════════════════════════════════════════════════════════

    pub fn copies(&self) -> &[CopyFeedback] {
        &self.copies
    }

    pub fn copy(&self, id: Uuid) -> Option<&CopyFeedback> {
        self.copies.iter().find(|c| c.id == id)
    }

    pub fn selected_id(&self) -> Option<Uuid> {
        self.selected
    }

    pub fn selected_copy(&self) -> Option<&CopyFeedback> {
        self.selected.and_then(|id| self.copy(id))
    }

    /// Owned copy of a document's current state, for exports. A blank
    /// note still being edited inline is not part of it.
    pub fn snapshot(&self, id: Uuid) -> Option<CopyFeedback> {
        self.copy(id)
            .map(|c| without_blank_inline(c, self.inline_editing).into_owned())
    }

    pub fn snapshots(&self) -> Vec<CopyFeedback> {
        self.copies
            .iter()
            .map(|c| without_blank_inline(c, self.inline_editing).into_owned())
            .collect()
    }

    /// Open a PDF for grading. An existing sidecar is loaded; otherwise a
    /// fresh copy is created (seeded from `template` when given) and saved.
    /// Opening a path that is already open returns the existing copy.
    pub fn open_copy(&mut self, pdf_path: &Path, template: Option<&RubricTemplate>) -> Result<Uuid, StoreError> {
        if let Some(existing) = self.copies.iter().find(|c| c.pdf_path == pdf_path) {
            return Ok(existing.id);
        }

        let copy = match storage::load_copy(self.store.as_ref(), pdf_path)? {
            Some(copy) => {
                tracing::info!(copy_id = %copy.id, path = %pdf_path.display(), "Sidecar loaded");
                copy
            }
            None => {
                let mut copy = CopyFeedback::new(pdf_path);
                if let Some(template) = template {
                    copy.sections = template.to_sections();
                }
                storage::save_copy(self.store.as_ref(), &copy)?;
                tracing::info!(copy_id = %copy.id, path = %pdf_path.display(), "Copy created");
                copy
            }
        };

        let id = copy.id;
        self.copies.push(copy);
        if self.selected.is_none() {
            self.selected = Some(id);
        }
        self.emit(Some(id), ChangeKind::Collection);
        Ok(id)
    }

    /// Drop a copy from the session. Its PDF and sidecar stay on disk.
    pub fn remove_copy(&mut self, id: Uuid) -> bool {
        let Some(index) = self.copies.iter().position(|c| c.id == id) else {
            tracing::debug!(copy_id = %id, "Remove of unknown copy ignored");
            return false;
        };
        self.copies.remove(index);
        if self.selected == Some(id) {
            self.inline_editing = None;
            self.selected_annotation = None;
            self.positioning = PositioningState::Idle;
            self.selected = self.copies.first().map(|c| c.id);
        }
        tracing::info!(copy_id = %id, "Copy removed from session");
        self.emit(Some(id), ChangeKind::Collection);
        true
    }

    pub fn select_copy(&mut self, id: Uuid) -> bool {
        if self.copy(id).is_none() {
            tracing::debug!(copy_id = %id, "Selection of unknown copy ignored");
            return false;
        }
        if self.selected == Some(id) {
            return true;
        }
        self.finish_inline_editing();
        self.selected_annotation = None;
        self.positioning = PositioningState::Idle;
        self.selected = Some(id);
        self.emit(Some(id), ChangeKind::Selection);
        true
    }

    /// Split a batch scan into `<stem>_01.pdf`, `<stem>_02.pdf`, ... in
    /// `output_dir` and open a copy for each part.
    pub fn split_pdf(
        &mut self,
        source: &Path,
        pages_per_copy: usize,
        output_dir: &Path,
        template: Option<&RubricTemplate>,
    ) -> Result<Vec<Uuid>, ExportError> {
        if !self.store.exists(source) {
            return Err(ExportError::FileNotFound(source.to_path_buf()));
        }
        let bytes = self.store.read(source).map_err(ExportError::from_read)?;
        let parts = split_pages(&bytes, pages_per_copy)?;
        let stem = file_stem(source);

        let mut ids = Vec::with_capacity(parts.len());
        for (i, part) in parts.iter().enumerate() {
            let path: PathBuf = output_dir.join(format!("{stem}_{:02}.pdf", i + 1));
            self.store.write(&path, part).map_err(ExportError::from_write)?;
            let id = self
                .open_copy(&path, template)
                .map_err(|e| ExportError::SaveFailed(e.to_string()))?;
            ids.push(id);
        }
        tracing::info!(source = %source.display(), copies = ids.len(), "Batch split into copies");
        Ok(ids)
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Student identity
    // ═══════════════════════════════════════════════════════════════════════

    pub fn set_student_name(&mut self, name: Option<String>) {
        let name = non_blank(name);
        self.mutate_selected(ChangeKind::Student, |copy| {
            copy.student_name = name;
            Some(())
        });
    }

    pub fn set_student_id(&mut self, student_id: Option<String>) {
        let student_id = non_blank(student_id);
        self.mutate_selected(ChangeKind::Student, |copy| {
            copy.student_id = student_id;
            Some(())
        });
    }

    // ═══════════════════════════════════════════════════════════════════════
    // Stamp catalog
    // ═══════════════════════════════════════════════════════════════════════

    pub fn stamps(&self) -> &[StampDefinition] {
        self.catalog.all()
    }

    pub fn stamp(&self, id: &str) -> Option<&StampDefinition> {
        self.catalog.get(id)
    }

    pub fn add_stamp(&mut self, label: &str, color: StampColor, coefficient: f64) -> String {
        let id = self.catalog.add(label, color, coefficient);
        self.catalog_changed();
        id
    }

    /// Edit a catalog entry. Stamps already placed keep their snapshot.
    pub fn update_stamp(&mut self, id: &str, label: &str, color: StampColor, coefficient: f64) -> bool {
        let updated = self.catalog.update(id, label, color, coefficient);
        if updated {
            self.catalog_changed();
        } else {
            tracing::debug!(stamp_id = id, "Update of unknown stamp ignored");
        }
        updated
    }

    /// Remove a custom stamp. Built-in stamps cannot be removed.
    pub fn remove_stamp(&mut self, id: &str) -> bool {
        let removed = self.catalog.remove(id);
        if removed {
            if self.tool == AnnotationTool::Stamp(id.to_string()) {
                self.tool = AnnotationTool::Select;
            }
            self.catalog_changed();
        } else {
            tracing::debug!(stamp_id = id, "Stamp not removable");
        }
        removed
    }

    fn catalog_changed(&mut self) {
        if let Err(e) = self.save_stamp_catalog() {
            tracing::warn!(error = %e, "Stamp catalog save failed");
            self.last_save_error = Some(e.to_string());
        }
        self.emit(None, ChangeKind::Catalog);
    }

    pub fn save_stamp_catalog(&self) -> Result<(), StoreError> {
        storage::save_catalog(self.store.as_ref(), &self.config.stamp_catalog_path, &self.catalog)
    }

    /// Reload the catalog from disk, replacing the in-memory one.
    pub fn load_stamp_catalog(&mut self) -> Result<(), StoreError> {
        self.catalog = storage::load_catalog(self.store.as_ref(), &self.config.stamp_catalog_path)?;
        self.emit(None, ChangeKind::Catalog);
        Ok(())
    }
}

fn without_blank_inline(copy: &CopyFeedback, inline: Option<Uuid>) -> Cow<'_, CopyFeedback> {
    match inline.filter(|id| copy.annotation(*id).is_some_and(Annotation::is_blank_text)) {
        Some(id) => {
            let mut trimmed = copy.clone();
            trimmed.annotations.retain(|a| a.id != id);
            Cow::Owned(trimmed)
        }
        None => Cow::Borrowed(copy),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::pdf::fixtures::pdf_with_pages;
    use crate::storage::MemoryFileStore;

    pub(crate) fn engine_with_store() -> (GradingEngine, Arc<MemoryFileStore>) {
        let store = Arc::new(MemoryFileStore::new());
        let engine = GradingEngine::new(store.clone(), EngineConfig::rooted_at("/session"));
        (engine, store)
    }

    /// Engine with one open, selected copy.
    pub(crate) fn engine_with_copy() -> (GradingEngine, Arc<MemoryFileStore>, Uuid) {
        let (mut engine, store) = engine_with_store();
        let id = engine.open_copy(Path::new("/exams/alice.pdf"), None).unwrap();
        (engine, store, id)
    }

    #[test]
    fn open_creates_and_persists_sidecar() {
        let (engine, store, id) = engine_with_copy();
        assert_eq!(engine.selected_id(), Some(id));
        assert!(store.exists(Path::new("/exams/alice.json")));
        assert_eq!(engine.copies().len(), 1);
    }

    #[test]
    fn open_reuses_existing_sidecar() {
        let (mut engine, store, id) = engine_with_copy();
        engine.set_student_name(Some("Alice".into()));

        let mut other = GradingEngine::new(store.clone(), EngineConfig::rooted_at("/session"));
        let reopened = other.open_copy(Path::new("/exams/alice.pdf"), None).unwrap();
        assert_eq!(reopened, id);
        assert_eq!(other.copy(id).unwrap().student_name.as_deref(), Some("Alice"));

        assert_eq!(engine.open_copy(Path::new("/exams/alice.pdf"), None).unwrap(), id);
        assert_eq!(engine.copies().len(), 1);
    }

    #[test]
    fn open_seeds_from_template() {
        let (mut engine, _) = engine_with_store();
        let mut section = crate::models::Section::new("Part", None);
        section.questions.push(crate::models::Question::new("Q", None, 2.0));
        let template = RubricTemplate::from_sections("T", &[section]);

        let id = engine.open_copy(Path::new("/exams/b.pdf"), Some(&template)).unwrap();
        assert_eq!(engine.copy(id).unwrap().max_total(), 2.0);
    }

    #[test]
    fn malformed_sidecar_is_reported() {
        let (mut engine, store) = engine_with_store();
        store.write(Path::new("/exams/bad.json"), b"{").unwrap();
        let err = engine.open_copy(Path::new("/exams/bad.pdf"), None).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::InvalidFormat);
        assert!(engine.copies().is_empty());
    }

    #[test]
    fn mutations_touch_persist_and_notify() {
        let (mut engine, store, id) = engine_with_copy();
        let mut events = engine.subscribe();
        let before = engine.version();

        engine.set_student_name(Some("  Alice  ".into()));

        assert_eq!(engine.version(), before + 1);
        let event = events.try_recv().unwrap();
        assert_eq!(event.change, ChangeKind::Student);
        assert_eq!(event.copy_id, Some(id));
        let saved = storage::load_copy(store.as_ref(), Path::new("/exams/alice.pdf")).unwrap().unwrap();
        assert_eq!(saved.student_name.as_deref(), Some("Alice"));

        engine.set_student_id(Some("   ".into()));
        assert_eq!(engine.selected_copy().unwrap().student_id, None);
    }

    #[test]
    fn save_failure_is_observable_and_clears() {
        let (mut engine, store, _) = engine_with_copy();
        store.set_fail_writes(true);
        engine.set_student_name(Some("Alice".into()));
        assert!(engine.last_save_error().is_some());
        assert_eq!(engine.selected_copy().unwrap().student_name.as_deref(), Some("Alice"));

        store.set_fail_writes(false);
        engine.set_student_name(Some("Alicia".into()));
        assert!(engine.last_save_error().is_none());
    }

    #[test]
    fn remove_keeps_files_and_moves_selection() {
        let (mut engine, store, first) = engine_with_copy();
        let second = engine.open_copy(Path::new("/exams/bob.pdf"), None).unwrap();

        assert!(engine.remove_copy(first));
        assert_eq!(engine.selected_id(), Some(second));
        assert!(store.exists(Path::new("/exams/alice.json")));
        assert!(!engine.remove_copy(first));
    }

    #[test]
    fn default_export_paths_use_exports_dir() {
        let (engine, _) = engine_with_store();
        assert_eq!(
            engine.default_archive_path("midterm"),
            PathBuf::from("/session/exports/midterm.zip")
        );
        assert_eq!(
            engine.default_grades_path("midterm", GradeFormat::Csv),
            PathBuf::from("/session/exports/midterm.csv")
        );
    }

    #[test]
    fn select_unknown_is_noop() {
        let (mut engine, _, id) = engine_with_copy();
        let version = engine.version();
        assert!(!engine.select_copy(Uuid::new_v4()));
        assert_eq!(engine.selected_id(), Some(id));
        assert_eq!(engine.version(), version);
    }

    #[test]
    fn split_opens_one_copy_per_chunk() {
        let (mut engine, store) = engine_with_store();
        store
            .write(Path::new("/scans/batch.pdf"), &pdf_with_pages(&[(600, 800); 4]))
            .unwrap();

        let ids = engine
            .split_pdf(Path::new("/scans/batch.pdf"), 2, Path::new("/scans/out"), None)
            .unwrap();
        assert_eq!(ids.len(), 2);
        assert_eq!(engine.copy(ids[0]).unwrap().pdf_path, PathBuf::from("/scans/out/batch_01.pdf"));
        assert!(store.exists(Path::new("/scans/out/batch_02.pdf")));
        assert!(store.exists(Path::new("/scans/out/batch_02.json")));
    }

    #[test]
    fn catalog_edits_persist() {
        let (mut engine, store) = engine_with_store();
        let id = engine.add_stamp("Bonus", StampColor::Green, 1.0);
        assert!(engine.stamp(&id).is_some());
        assert!(!engine.remove_stamp("default-good"));

        let reloaded = GradingEngine::new(store.clone(), EngineConfig::rooted_at("/session"));
        assert!(reloaded.stamp(&id).is_some());
        assert_eq!(reloaded.stamps().len(), 6);

        assert!(engine.update_stamp(&id, "Extra", StampColor::Yellow, 0.9));
        assert!(engine.remove_stamp(&id));
        assert!(engine.stamp(&id).is_none());
    }
}
