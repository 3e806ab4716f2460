//! Page geometry and rotation read from PDF files.
//!
//! Only the page tree is inspected: sizes come from `/MediaBox` and display rotation
//! from `/Rotate`, both inheritable from ancestor `/Pages` nodes.

use doc_model::{ModelError, PageRecord, PageRotation, PageSize, PageTable};
use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

// Guards against cyclic /Parent chains in malformed files.
const MAX_INHERITANCE_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    pub fn raw(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub enum OpenSource {
    Path(PathBuf),
    Bytes(Vec<u8>),
}

impl From<&Path> for OpenSource {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfEngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("document has no pages")]
    NoPages,
    #[error("page {page} has an unusable /Rotate: {source}")]
    InvalidRotate {
        page: u32,
        #[source]
        source: ModelError,
    },
}

/// Page metadata backend. Page indices are 0-based here; [`PageTable`] is 1-based.
pub trait PdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError>;
    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError>;
    fn page_rotation(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageRotation, PdfEngineError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError>;

    /// Snapshot every page of an open document for reading-order comparisons.
    fn page_table(&self, handle: DocumentHandle) -> Result<PageTable, PdfEngineError> {
        let count = self.page_count(handle)?;
        let mut pages = Vec::with_capacity(count as usize);
        for index in 0..count {
            let size = self.page_size(handle, index)?;
            let rotation = self.page_rotation(handle, index)?;
            pages.push(PageRecord::new(size.width, size.height, rotation.code()));
        }
        Ok(PageTable::new(pages))
    }
}

#[derive(Debug, Clone, Copy)]
struct PageInfo {
    size: PageSize,
    rotation: PageRotation,
}

#[derive(Debug, Default)]
pub struct LopdfEngine {
    next_handle: u64,
    docs: HashMap<DocumentHandle, Vec<PageInfo>>,
}

impl LopdfEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn parse_pages(bytes: &[u8]) -> Result<Vec<PageInfo>, PdfEngineError> {
        if bytes.windows("/Encrypt".len()).any(|window| window == b"/Encrypt") {
            return Err(PdfEngineError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut infos = Vec::with_capacity(pages.len());

        for (page_number, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;

            let size = inherited(&doc, dict, b"MediaBox")
                .and_then(|obj| media_box_size(&doc, obj))
                .unwrap_or_else(|| {
                    debug!(page = page_number, "no usable MediaBox, assuming US Letter");
                    PageSize::default()
                });

            let degrees = inherited(&doc, dict, b"Rotate")
                .and_then(|obj| resolve(&doc, obj).as_i64().ok())
                .unwrap_or(0);
            let rotation = PageRotation::from_degrees(degrees)
                .map_err(|source| PdfEngineError::InvalidRotate { page: page_number, source })?;

            infos.push(PageInfo { size, rotation });
        }

        if infos.is_empty() {
            return Err(PdfEngineError::NoPages);
        }

        Ok(infos)
    }

    fn pages(&self, handle: DocumentHandle) -> Result<&[PageInfo], PdfEngineError> {
        self.docs
            .get(&handle)
            .map(Vec::as_slice)
            .ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }

    fn page(&self, handle: DocumentHandle, page_index: u32) -> Result<PageInfo, PdfEngineError> {
        let pages = self.pages(handle)?;
        pages.get(page_index as usize).copied().ok_or(PdfEngineError::PageOutOfRange {
            page: page_index,
            page_count: pages.len() as u32,
        })
    }
}

impl PdfEngine for LopdfEngine {
    fn open(&mut self, source: OpenSource) -> Result<DocumentHandle, PdfEngineError> {
        let bytes = match source {
            OpenSource::Path(path) => fs::read(path)?,
            OpenSource::Bytes(bytes) => bytes,
        };

        let pages = Self::parse_pages(&bytes)?;

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        debug!(handle = handle.raw(), pages = pages.len(), "opened document");
        self.docs.insert(handle, pages);

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, PdfEngineError> {
        Ok(self.pages(handle)?.len() as u32)
    }

    fn page_size(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageSize, PdfEngineError> {
        Ok(self.page(handle, page_index)?.size)
    }

    fn page_rotation(
        &self,
        handle: DocumentHandle,
        page_index: u32,
    ) -> Result<PageRotation, PdfEngineError> {
        Ok(self.page(handle, page_index)?.rotation)
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), PdfEngineError> {
        self.docs.remove(&handle).map(|_| ()).ok_or(PdfEngineError::InvalidHandle(handle.raw()))
    }
}

pub fn default_engine() -> LopdfEngine {
    LopdfEngine::new()
}

/// Open `path`, read its page table and release the document again.
pub fn read_page_table(path: &Path) -> Result<PageTable, PdfEngineError> {
    let mut engine = default_engine();
    let handle = engine.open(OpenSource::from(path))?;
    let table = engine.page_table(handle)?;
    engine.close(handle)?;
    Ok(table)
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> &'a Object {
    doc.dereference(object).map(|(_, resolved)| resolved).unwrap_or(object)
}

/// Look `key` up on the page, then on each ancestor through `/Parent`.
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut node = page;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(value);
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn media_box_size(doc: &Document, object: &Object) -> Option<PageSize> {
    let array = resolve(doc, object).as_array().ok()?;
    if array.len() != 4 {
        return None;
    }
    let coord = |index: usize| resolve(doc, &array[index]).as_float().ok().map(f64::from);
    let (x0, y0, x1, y1) = (coord(0)?, coord(1)?, coord(2)?, coord(3)?);
    Some(PageSize::new((x1 - x0).abs(), (y1 - y0).abs()))
}
