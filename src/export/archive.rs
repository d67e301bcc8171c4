//! Bundle every copy's graded PDF into one zip archive.

use std::collections::HashSet;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::pdf::render_graded_pdf;
use super::{CancelToken, ExportError};
use crate::models::CopyFeedback;
use crate::pdf::PdfSource;
use crate::storage::FileStore;

const FALLBACK_PREFIX: &str = "copy-";

/// File-name-safe form of a student name. `None` when nothing usable remains.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let mut out = String::with_capacity(name.len());
    for c in name.trim().chars() {
        if c.is_alphanumeric() || c == '-' || c == '_' {
            out.push(c);
        } else if (c.is_whitespace() || c == '.') && !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn base_name(copy: &CopyFeedback) -> String {
    copy.student_name
        .as_deref()
        .and_then(sanitize_file_name)
        .unwrap_or_else(|| {
            let id = copy.id.simple().to_string();
            format!("{FALLBACK_PREFIX}{}", &id[..8])
        })
}

/// Archive entry name per copy, unique within the archive.
pub fn archive_entry_names(copies: &[CopyFeedback]) -> Vec<String> {
    let mut used = HashSet::new();
    copies
        .iter()
        .map(|copy| {
            let base = base_name(copy);
            let mut candidate = format!("{base}.pdf");
            let mut n = 2;
            while !used.insert(candidate.to_lowercase()) {
                candidate = format!("{base}-{n}.pdf");
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Build the `.zip` bytes from named entries.
pub fn build_archive(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ExportError> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    for (name, bytes) in entries {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(bytes)?;
    }

    Ok(zip.finish()?.into_inner())
}

/// Export every copy and write the archive to `dest`.
pub fn export_archive(
    copies: &[CopyFeedback],
    pdf_source: &dyn PdfSource,
    store: &dyn FileStore,
    dest: &Path,
    cancel: &CancelToken,
) -> Result<PathBuf, ExportError> {
    if copies.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let names = archive_entry_names(copies);
    let mut entries = Vec::with_capacity(copies.len());
    for (copy, name) in copies.iter().zip(names) {
        cancel.check()?;
        if !store.exists(&copy.pdf_path) {
            return Err(ExportError::FileNotFound(copy.pdf_path.clone()));
        }
        let source = store.read(&copy.pdf_path).map_err(ExportError::from_read)?;
        let graded = render_graded_pdf(copy, &source, pdf_source, cancel)?;
        entries.push((name, graded));
    }

    let archive = build_archive(&entries)?;
    cancel.check()?;
    store.write(dest, &archive).map_err(ExportError::from_write)?;

    tracing::info!(copies = copies.len(), bytes = archive.len(), dest = %dest.display(), "Archive exported");
    Ok(dest.to_path_buf())
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use zip::ZipArchive;

    use super::*;
    use crate::pdf::fixtures::pdf_with_pages;
    use crate::pdf::LopdfSource;
    use crate::storage::MemoryFileStore;

    fn named(name: Option<&str>, path: &str) -> CopyFeedback {
        let mut copy = CopyFeedback::new(path);
        copy.student_name = name.map(str::to_string);
        copy
    }

    #[test]
    fn sanitizes_names() {
        assert_eq!(sanitize_file_name("Jean Dupont").as_deref(), Some("Jean_Dupont"));
        assert_eq!(sanitize_file_name("  a/b\\c:d  ").as_deref(), Some("abcd"));
        assert_eq!(sanitize_file_name("Zoë  O'Neil").as_deref(), Some("Zoë_ONeil"));
        assert_eq!(sanitize_file_name("../.."), None);
        assert_eq!(sanitize_file_name("   "), None);
    }

    #[test]
    fn names_fall_back_to_id_and_dedupe() {
        let anon = named(None, "/a.pdf");
        let copies = vec![
            named(Some("Ana"), "/1.pdf"),
            named(Some("ana"), "/2.pdf"),
            named(Some("Ana"), "/3.pdf"),
            anon.clone(),
        ];
        let names = archive_entry_names(&copies);
        assert_eq!(names[0], "Ana.pdf");
        assert_eq!(names[1], "ana-2.pdf");
        assert_eq!(names[2], "Ana-3.pdf");
        let expected = format!("copy-{}.pdf", &anon.id.simple().to_string()[..8]);
        assert_eq!(names[3], expected);
    }

    #[test]
    fn archive_contains_one_pdf_per_copy() {
        let store = MemoryFileStore::new();
        let pdf = pdf_with_pages(&[(600, 800)]);
        store.write(Path::new("/x/a.pdf"), &pdf).unwrap();
        store.write(Path::new("/x/b.pdf"), &pdf).unwrap();
        let copies = vec![named(Some("Alice"), "/x/a.pdf"), named(Some("Bob"), "/x/b.pdf")];

        let dest = Path::new("/out/all.zip");
        export_archive(&copies, &LopdfSource, &store, dest, &CancelToken::new()).unwrap();

        let bytes = store.read(dest).unwrap();
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut names = Vec::new();
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i).unwrap();
            names.push(entry.name().to_string());
            let mut content = Vec::new();
            entry.read_to_end(&mut content).unwrap();
            assert!(content.starts_with(b"%PDF"));
        }
        assert_eq!(names, vec!["Alice.pdf", "Bob.pdf"]);
    }

    #[test]
    fn empty_collection_and_missing_sources_fail() {
        let store = MemoryFileStore::new();
        let dest = Path::new("/out/all.zip");
        assert!(matches!(
            export_archive(&[], &LopdfSource, &store, dest, &CancelToken::new()),
            Err(ExportError::NothingToExport)
        ));
        let copies = vec![named(Some("Ghost"), "/x/ghost.pdf")];
        assert!(matches!(
            export_archive(&copies, &LopdfSource, &store, dest, &CancelToken::new()),
            Err(ExportError::FileNotFound(_))
        ));
        assert!(!store.exists(dest));
    }
}
