//! Split a scanned batch into one PDF per student copy.

use lopdf::Document;

use super::PdfError;

/// Split `bytes` into chunks of `pages_per_chunk` pages, in page order.
/// The last chunk holds whatever pages remain.
pub fn split_pages(bytes: &[u8], pages_per_chunk: usize) -> Result<Vec<Vec<u8>>, PdfError> {
    if pages_per_chunk == 0 {
        return Err(PdfError::InvalidChunkSize);
    }
    let doc = Document::load_mem(bytes).map_err(|e| PdfError::Parse(e.to_string()))?;
    if doc.is_encrypted() {
        return Err(PdfError::Encrypted);
    }
    let pages: Vec<u32> = doc.get_pages().keys().copied().collect();

    let mut outputs = Vec::new();
    for chunk in pages.chunks(pages_per_chunk) {
        let to_drop: Vec<u32> = pages.iter().copied().filter(|p| !chunk.contains(p)).collect();

        let mut part = doc.clone();
        part.delete_pages(&to_drop);
        part.prune_objects();

        let mut buf = Vec::new();
        part.save_to(&mut buf).map_err(|e| PdfError::Write(e.to_string()))?;
        outputs.push(buf);
    }

    tracing::info!(pages = pages.len(), chunks = outputs.len(), "PDF split");
    Ok(outputs)
}
