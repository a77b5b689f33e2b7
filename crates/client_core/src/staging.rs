use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use serde::Serialize;
use shared::domain::{DocumentKind, UploadId};

use crate::error::StagingError;

/// Largest document accepted for staging (500 MiB).
pub const MAX_UPLOAD_BYTES: u64 = 500 * 1024 * 1024;

/// Where the bytes of a staged document come from when the request is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    Path(PathBuf),
    Memory(Arc<Vec<u8>>),
}

/// Metadata handed over by whatever picked the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileMeta {
    pub name: String,
    pub size_bytes: u64,
    pub source: UploadSource,
}

impl FileMeta {
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            size_bytes: bytes.len() as u64,
            source: UploadSource::Memory(Arc::new(bytes)),
        }
    }

    /// Lower-cased extension of `name`, without the dot.
    pub fn extension(&self) -> Option<String> {
        Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    pub upload_id: UploadId,
    pub kind: DocumentKind,
    pub name: String,
    pub size_bytes: u64,
    pub source: UploadSource,
}

/// Read-only view of one slot for renderers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagedFileSummary {
    pub kind: DocumentKind,
    pub name: String,
    pub size_bytes: u64,
}

impl From<&StagedFile> for StagedFileSummary {
    fn from(file: &StagedFile) -> Self {
        Self {
            kind: file.kind,
            name: file.name.clone(),
            size_bytes: file.size_bytes,
        }
    }
}

/// Holds at most one pending CSV and one pending PDF.
#[derive(Debug, Clone, Default)]
pub struct UploadStaging {
    csv: Option<StagedFile>,
    pdf: Option<StagedFile>,
    next_upload_id: u64,
}

/// Checks type then size, returning the slot the file belongs in.
pub fn validate(meta: &FileMeta) -> Result<DocumentKind, StagingError> {
    let kind = meta
        .extension()
        .as_deref()
        .and_then(DocumentKind::from_extension)
        .ok_or_else(|| StagingError::InvalidFileType {
            name: meta.name.clone(),
        })?;
    if meta.size_bytes > MAX_UPLOAD_BYTES {
        return Err(StagingError::FileTooLarge {
            name: meta.name.clone(),
            size_bytes: meta.size_bytes,
            limit_bytes: MAX_UPLOAD_BYTES,
        });
    }
    Ok(kind)
}

impl UploadStaging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates `meta` and places it in its slot, replacing any previous file
    /// of the same kind.
    pub fn stage(&mut self, meta: FileMeta) -> Result<&StagedFile, StagingError> {
        let kind = validate(&meta)?;
        self.next_upload_id += 1;
        let staged = StagedFile {
            upload_id: UploadId(self.next_upload_id),
            kind,
            name: meta.name,
            size_bytes: meta.size_bytes,
            source: meta.source,
        };
        Ok(&*self.slot_mut(kind).insert(staged))
    }

    pub fn remove(&mut self, kind: DocumentKind) -> Option<StagedFile> {
        self.slot_mut(kind).take()
    }

    pub fn get(&self, kind: DocumentKind) -> Option<&StagedFile> {
        match kind {
            DocumentKind::Csv => self.csv.as_ref(),
            DocumentKind::Pdf => self.pdf.as_ref(),
        }
    }

    pub fn csv(&self) -> Option<&StagedFile> {
        self.csv.as_ref()
    }

    pub fn pdf(&self) -> Option<&StagedFile> {
        self.pdf.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.csv.is_none() && self.pdf.is_none()
    }

    pub fn clear(&mut self) {
        self.csv = None;
        self.pdf = None;
    }

    /// Empties the slots that still hold one of `consumed`. Files staged after
    /// the request was captured are left in place.
    pub fn release_consumed(&mut self, consumed: &[UploadId]) -> usize {
        let mut released = 0;
        for kind in DocumentKind::ALL {
            let slot = self.slot_mut(kind);
            if slot
                .as_ref()
                .is_some_and(|file| consumed.contains(&file.upload_id))
            {
                *slot = None;
                released += 1;
            }
        }
        released
    }

    pub fn summaries(&self) -> Vec<StagedFileSummary> {
        DocumentKind::ALL
            .into_iter()
            .filter_map(|kind| self.get(kind))
            .map(StagedFileSummary::from)
            .collect()
    }

    fn slot_mut(&mut self, kind: DocumentKind) -> &mut Option<StagedFile> {
        match kind {
            DocumentKind::Csv => &mut self.csv,
            DocumentKind::Pdf => &mut self.pdf,
        }
    }
}
