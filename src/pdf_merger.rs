use lopdf::{Document, Object, ObjectId};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Appends whole PDF documents, in insertion order, into one file.
pub struct PdfMerger {
    documents: Vec<(PathBuf, Document)>,
}

impl PdfMerger {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
        }
    }

    pub async fn add_pdf(&mut self, path: &Path) -> Result<()> {
        let data = fs::read(path)
            .await
            .map_err(|e| Error::Merge(format!("Failed to read PDF file {}: {}", path.display(), e)))?;

        let document = Document::load_mem(&data)
            .map_err(|e| Error::Merge(format!("Failed to parse PDF file {}: {}", path.display(), e)))?;

        debug!("Loaded PDF with {} pages from {}", document.get_pages().len(), path.display());
        self.documents.push((path.to_path_buf(), document));

        Ok(())
    }

    /// Builds the merged document without writing it.
    pub fn into_document(self) -> Result<Document> {
        let mut documents = self.documents.into_iter();
        let Some((first_path, mut merged)) = documents.next() else {
            return Err(Error::Merge("No PDFs added to merge".to_string()));
        };

        let pages_id: ObjectId = merged
            .catalog()
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(|pages| pages.as_reference())
            .map_err(|e| Error::Merge(format!("{} has no page tree: {}", first_path.display(), e)))?;

        let mut page_ids: Vec<ObjectId> = merged.get_pages().into_values().collect();
        debug!("First document has {} pages", page_ids.len());

        let mut max_id = merged.max_id;

        for (path, mut document) in documents {
            // Renumber objects to avoid conflicts
            document.renumber_objects_with(max_id + 1);
            max_id = document.max_id;

            let pages = document.get_pages();
            debug!("Appending {} pages from {}", pages.len(), path.display());

            merged.objects.extend(document.objects);
            page_ids.extend(pages.into_values());
        }

        merged.max_id = max_id;

        for page_id in &page_ids {
            if let Ok(page) = merged
                .get_object_mut(*page_id)
                .and_then(|object| object.as_dict_mut())
            {
                page.set("Parent", pages_id);
            }
        }

        let pages_dict = merged
            .get_object_mut(pages_id)
            .and_then(|object| object.as_dict_mut())
            .map_err(|e| Error::Merge(format!("Broken page tree in {}: {}", first_path.display(), e)))?;

        pages_dict.set("Count", page_ids.len() as i64);
        pages_dict.set(
            "Kids",
            page_ids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
        );

        Ok(merged)
    }

    /// Writes the merged document and returns its page count.
    pub async fn save(self, output_path: &Path) -> Result<usize> {
        let document_count = self.documents.len();
        info!("Starting PDF merge process with {} documents", document_count);

        let mut merged = self.into_document()?;
        let page_count = merged.get_pages().len();
        info!("Finalizing merged PDF with {} total pages", page_count);

        let mut data = Vec::new();
        merged
            .save_to(&mut data)
            .map_err(|e| Error::Merge(format!("Failed to serialize merged PDF: {e}")))?;

        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| Error::io(parent, e))?;
        }

        fs::write(output_path, data)
            .await
            .map_err(|e| Error::io(output_path, e))?;

        info!("Successfully merged {} PDFs into {}", document_count, output_path.display());
        Ok(page_count)
    }
}

impl Default for PdfMerger {
    fn default() -> Self {
        Self::new()
    }
}

/// Merges `paths` in order into `output`. Any unreadable input aborts the merge.
pub async fn merge_pdfs(paths: &[PathBuf], output: &Path) -> Result<usize> {
    let mut merger = PdfMerger::new();
    for path in paths {
        merger.add_pdf(path).await?;
    }
    merger.save(output).await
}

/// Every `*.pdf` directly inside `dir`, sorted by file name.
pub async fn collect_pdfs(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir).await.map_err(|e| Error::io(dir, e))?;
    let mut pdf_files = Vec::new();

    while let Some(entry) = entries.next_entry().await.map_err(|e| Error::io(dir, e))? {
        let path = entry.path();
        if path.extension().is_some_and(|extension| extension == "pdf") {
            pdf_files.push(path);
        }
    }

    // Numbered files merge in sequence.
    pdf_files.sort();
    Ok(pdf_files)
}
