use crate::{
    entities::{uploaded_file, UploadedFile, UploadedFileModel},
    errors::ServiceError,
    events::{Event, EventSender},
};
use rand::distributions::Alphanumeric;
use rand::{thread_rng, Rng};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, ModelTrait, Set};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

const STORED_NAME_LEN: usize = 16;

/// Stores uploaded product photos on disk under generated names and keeps a
/// record row per upload. Concurrent uploads cannot collide: every call gets
/// a fresh random storage name.
#[derive(Clone)]
pub struct FileStorageService {
    db: Arc<DatabaseConnection>,
    upload_dir: PathBuf,
    event_sender: Arc<EventSender>,
}

impl FileStorageService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        upload_dir: impl Into<PathBuf>,
        event_sender: Arc<EventSender>,
    ) -> Self {
        Self {
            db,
            upload_dir: upload_dir.into(),
            event_sender,
        }
    }

    fn generate_storage_name() -> String {
        thread_rng()
            .sample_iter(&Alphanumeric)
            .take(STORED_NAME_LEN)
            .map(char::from)
            .collect()
    }

    /// Write the blob to disk and insert its record. The caller-supplied file
    /// name is untrusted and only kept for display.
    #[instrument(skip(self, data), fields(len = data.len()))]
    pub async fn store(
        &self,
        data: &[u8],
        content_type: &str,
        original_name: &str,
    ) -> Result<UploadedFileModel, ServiceError> {
        let stored_file_name = Self::generate_storage_name();
        let path = self.upload_dir.join(&stored_file_name);

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| ServiceError::InternalError(format!("create upload dir: {}", e)))?;
        tokio::fs::write(&path, data)
            .await
            .map_err(|e| ServiceError::InternalError(format!("write upload: {}", e)))?;

        let record = uploaded_file::ActiveModel {
            id: Set(Uuid::new_v4()),
            file_name: Set(original_name.to_string()),
            stored_file_name: Set(stored_file_name),
            path: Set(path.to_string_lossy().into_owned()),
            content_type: Set(content_type.to_string()),
        };

        let record = match record.insert(&*self.db).await {
            Ok(record) => record,
            Err(e) => {
                // The row never landed; don't leave the blob behind.
                if let Err(unlink) = tokio::fs::remove_file(&path).await {
                    warn!("failed to remove stored file after insert error: {}", unlink);
                }
                return Err(ServiceError::DatabaseError(e));
            }
        };

        self.event_sender
            .send_or_log(Event::FileStored(record.id))
            .await;

        info!(file_id = %record.id, "stored uploaded file");
        Ok(record)
    }

    /// Fetch a file record by id.
    pub async fn get(&self, id: Uuid) -> Result<UploadedFileModel, ServiceError> {
        UploadedFile::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| {
                ServiceError::not_found("file id", "invalid file id or file does not exist")
            })
    }

    /// Read the bytes of a stored file.
    #[instrument(skip(self))]
    pub async fn read(&self, id: Uuid) -> Result<(Vec<u8>, String), ServiceError> {
        let record = self.get(id).await?;

        let bytes = tokio::fs::read(&record.path).await.map_err(|_| {
            ServiceError::not_found("file", "file does not exist or is unreadable")
        })?;

        if bytes.is_empty() {
            return Err(ServiceError::EmptyContent {
                field: "file".to_string(),
                message: "file invalid or empty or deleted".to_string(),
            });
        }

        Ok((bytes, record.content_type))
    }

    /// Remove a stored file: best-effort unlink, then delete the record.
    #[instrument(skip(self, record), fields(file_id = %record.id))]
    pub async fn remove(&self, record: &UploadedFileModel) -> Result<(), ServiceError> {
        if let Err(e) = tokio::fs::remove_file(&record.path).await {
            warn!("failed to unlink stored file {}: {}", record.path, e);
        }

        let id = record.id;
        record.clone().delete(&*self.db).await?;

        self.event_sender.send_or_log(Event::FileRemoved(id)).await;
        Ok(())
    }
}
