//! Metadata dump and media archive export
//!
//! Both exports work on an [`ExportSnapshot`], an owned copy of a session taken when
//! the export starts, so pages appended while an archive is being packed never leak
//! into it.
//!
//! The archive is built strictly sequentially: one proxy fetch at a time, in store
//! order. An item whose payload cannot be fetched is skipped and the export carries
//! on; only archive-level failures abort.

use crate::client::MediaProxy;
use crate::config::ExportConfig;
use crate::error::{Error, Result};
use crate::feed::{FeedQuery, slugify};
use crate::types::{ExportProgress, FeedEvent, MediaId, MediaRecord, ProfileRecord};
use serde::{Deserialize, Serialize};
use std::io::{Cursor, Write};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Owned copy of a session's data at the moment an export starts
#[derive(Clone, Debug, PartialEq)]
pub struct ExportSnapshot {
    /// Query of the exported session
    pub query: FeedQuery,
    /// Profile header, for profile feeds
    pub profile: Option<ProfileRecord>,
    /// Records in store order
    pub records: Vec<MediaRecord>,
}

impl ExportSnapshot {
    /// Metadata dump of this snapshot
    ///
    /// # Errors
    ///
    /// Returns [`Error::SerializationFailed`] if encoding fails.
    pub fn metadata(&self) -> Result<Vec<u8>> {
        export_metadata(self.profile.as_ref(), &self.records)
    }

    /// Stem for export file and folder names
    ///
    /// Profile feeds use the backend's profile username when the session has one,
    /// otherwise the searched name.
    pub fn export_stem(&self) -> String {
        match (&self.query, &self.profile) {
            (FeedQuery::Profile { .. }, Some(profile)) if !profile.username.trim().is_empty() => {
                slugify(&profile.username)
            }
            _ => self.query.export_stem(),
        }
    }

    /// Suggested file name for [`ExportSnapshot::metadata`]
    pub fn metadata_file_name(&self) -> String {
        format!("{}_{}", self.export_stem(), self.query.kind().dump_suffix())
    }

    /// Suggested file name for the media archive
    pub fn archive_file_name(&self) -> String {
        format!("{}_media.zip", self.export_stem())
    }
}

/// Archive entry name of a record, safe to use as a single path component
fn entry_file_name(record: &MediaRecord) -> String {
    let name: String = record
        .file_name()
        .chars()
        .map(|c| if matches!(c, '/' | '\\' | ':') { '_' } else { c })
        .collect();
    let trimmed = name.trim_start_matches('.');
    if trimmed.is_empty() {
        format!("{}.{}", record.id, record.kind.extension())
    } else {
        trimmed.to_string()
    }
}

#[derive(Serialize)]
struct MetadataDump<'a> {
    profile: Option<&'a ProfileRecord>,
    media: &'a [MediaRecord],
}

/// Serialize `{profile, media}` as pretty-printed JSON
///
/// No network I/O. Records keep their store order.
///
/// # Errors
///
/// Returns [`Error::SerializationFailed`] if encoding fails.
pub fn export_metadata(profile: Option<&ProfileRecord>, records: &[MediaRecord]) -> Result<Vec<u8>> {
    let dump = MetadataDump {
        profile,
        media: records,
    };
    let bytes = serde_json::to_vec_pretty(&dump)?;
    debug!(records = records.len(), bytes = bytes.len(), "metadata export encoded");
    Ok(bytes)
}

/// An item left out of the archive
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedItem {
    /// Record identifier
    pub id: MediaId,
    /// Entry name the item would have used
    pub file_name: String,
    /// Why the payload could not be fetched
    pub reason: String,
}

/// A finished archive
#[derive(Clone, Debug, PartialEq)]
pub struct ArchiveOutput {
    /// Suggested file name for the archive
    pub file_name: String,
    /// Zip bytes
    pub bytes: Vec<u8>,
    /// Number of files written
    pub files: usize,
    /// Items that were skipped, in store order
    pub skipped: Vec<SkippedItem>,
}

/// Packs every record of a snapshot into a zip archive through a [`MediaProxy`]
#[derive(Clone)]
pub struct ArchiveExporter {
    proxy: Arc<dyn MediaProxy>,
    config: ExportConfig,
    event_tx: Option<broadcast::Sender<FeedEvent>>,
}

impl ArchiveExporter {
    /// Create an exporter that reports progress only through the callback
    pub fn new(proxy: Arc<dyn MediaProxy>, config: ExportConfig) -> Self {
        Self {
            proxy,
            config,
            event_tx: None,
        }
    }

    /// Also emit export events on `event_tx`
    pub fn with_events(mut self, event_tx: broadcast::Sender<FeedEvent>) -> Self {
        self.event_tx = Some(event_tx);
        self
    }

    fn emit(&self, event: FeedEvent) {
        if let Some(tx) = &self.event_tx {
            tx.send(event).ok();
        }
    }

    /// Build the archive for `snapshot`
    ///
    /// `on_progress` is called once after every item, skipped or not, with a
    /// monotonically increasing `done`. An empty snapshot returns `Ok(None)` without
    /// touching the proxy.
    ///
    /// # Errors
    ///
    /// Only archive-level failures ([`Error::Archive`], [`Error::Io`]) abort the
    /// export. Per-item fetch failures end up in [`ArchiveOutput::skipped`].
    pub async fn export<F>(
        &self,
        snapshot: &ExportSnapshot,
        mut on_progress: F,
    ) -> Result<Option<ArchiveOutput>>
    where
        F: FnMut(ExportProgress),
    {
        let total = snapshot.records.len();
        if total == 0 {
            debug!(query = %snapshot.query, "nothing to export");
            return Ok(None);
        }

        let folder = self
            .config
            .group_in_folder
            .then(|| snapshot.export_stem());
        info!(query = %snapshot.query, total, "starting archive export");

        let options = zip::write::FileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
        let mut files = 0;
        let mut skipped = Vec::new();

        for (index, record) in snapshot.records.iter().enumerate() {
            let file_name = entry_file_name(record);

            match self.proxy.fetch_media(record.download_url()).await {
                Ok(bytes) => {
                    let entry = match &folder {
                        Some(folder) => format!("{}/{}", folder, file_name),
                        None => file_name.clone(),
                    };
                    writer.start_file(entry, options)?;
                    writer.write_all(&bytes)?;
                    files += 1;
                    debug!(id = %record.id, %file_name, bytes = bytes.len(), "added archive entry");
                }
                Err(e) => {
                    let failure = Error::ItemExportFailed {
                        file_name: file_name.clone(),
                        reason: e.to_string(),
                    };
                    warn!(id = %record.id, error = %failure, "skipping item");
                    self.emit(FeedEvent::ExportItemSkipped {
                        id: record.id,
                        file_name: file_name.clone(),
                        error: failure.to_string(),
                    });
                    skipped.push(SkippedItem {
                        id: record.id,
                        file_name,
                        reason: e.to_string(),
                    });
                }
            }

            let progress = ExportProgress {
                done: index + 1,
                total,
            };
            on_progress(progress);
            self.emit(FeedEvent::ExportProgress {
                done: progress.done,
                total,
            });
        }

        let bytes = writer.finish()?.into_inner();
        info!(
            files,
            skipped = skipped.len(),
            bytes = bytes.len(),
            "archive export finished"
        );
        self.emit(FeedEvent::ExportComplete {
            files,
            skipped: skipped.len(),
        });

        Ok(Some(ArchiveOutput {
            file_name: snapshot.archive_file_name(),
            bytes,
            files,
            skipped,
        }))
    }
}
