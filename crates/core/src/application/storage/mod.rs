// Storage Service - buffer save/load against the save store
//
// Every save or load returns a request id immediately; the result arrives
// as a `save_load` envelope carrying `id`, `status` and `error`.

mod buffer_pool;
mod path;

pub use buffer_pool::BufferPool;
pub use path::{locate, SaveLocation, DEFAULT_CONTAINER};

use crate::application::correlation::EventSender;
use crate::application::issuer::AsyncIssuer;
use crate::domain::{AsyncChannel, Envelope, FileError, RequestId, UserId};
use crate::error::{AppError, Result};
use crate::port::{BlobWrite, SaveStore, UserDirectory};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

struct PendingSave {
    id: RequestId,
    blob: String,
    data: Vec<u8>,
}

struct OpenGroup {
    container: String,
    members: Vec<PendingSave>,
}

#[derive(Default)]
struct StorageState {
    user: UserId,
    uwp_compatibility: bool,
    group: Option<OpenGroup>,
}

pub struct StorageService {
    store: Arc<dyn SaveStore>,
    directory: Arc<dyn UserDirectory>,
    buffers: BufferPool,
    issuer: AsyncIssuer,
    state: Mutex<StorageState>,
}

impl StorageService {
    pub fn new(
        store: Arc<dyn SaveStore>,
        directory: Arc<dyn UserDirectory>,
        buffers: BufferPool,
        issuer: AsyncIssuer,
    ) -> Self {
        Self {
            store,
            directory,
            buffers,
            issuer,
            state: Mutex::new(StorageState::default()),
        }
    }

    fn state(&self) -> Result<MutexGuard<'_, StorageState>> {
        self.state
            .lock()
            .map_err(|_| AppError::Internal("storage state lock poisoned".to_string()))
    }

    pub fn buffers(&self) -> &BufferPool {
        &self.buffers
    }

    /// Associate later saves and loads with `user`; the null user locks them
    pub fn set_savedata_user(&self, user: UserId) -> Result<()> {
        self.state()?.user = user;
        info!(user = %user, "Save data user set");
        Ok(())
    }

    pub fn savedata_user(&self) -> Result<UserId> {
        Ok(self.state()?.user)
    }

    pub fn set_savedata_uwp_compatibility(&self, enabled: bool) -> Result<()> {
        self.state()?.uwp_compatibility = enabled;
        Ok(())
    }

    pub fn save_buffer(
        &self,
        buffer: i32,
        filename: &str,
        offset: i64,
        size: i64,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        if filename.trim().is_empty() {
            return Err(AppError::Validation("filename must not be empty".to_string()));
        }
        let data = self.buffers.with(buffer, |bytes| {
            let (start, end) = save_range(bytes.len(), offset, size)?;
            Ok::<_, AppError>(bytes[start..end].to_vec())
        })??;

        let mut state = self.state()?;
        let id = self.issuer.issue()?;

        if let Some(group) = state.group.as_mut() {
            debug!(request_id = %id, filename, "Save queued in group");
            group.members.push(PendingSave {
                id,
                blob: filename.replace('\\', "/"),
                data,
            });
            return Ok(id);
        }

        let location = locate(filename, state.uwp_compatibility);
        let user = state.user;
        drop(state);

        self.commit(
            user,
            location.container,
            vec![PendingSave {
                id,
                blob: location.blob,
                data,
            }],
            None,
        );
        Ok(id)
    }

    /// `size == -1` loads into the rest of the buffer from `offset`
    pub fn load_buffer(
        &self,
        buffer: i32,
        filename: &str,
        offset: i64,
        size: i64,
    ) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        if filename.trim().is_empty() {
            return Err(AppError::Validation("filename must not be empty".to_string()));
        }
        let len = self.buffers.len(buffer)?;
        let (start, end) = load_range(len, offset, size)?;

        let state = self.state()?;
        let location = locate(filename, state.uwp_compatibility);
        let user = state.user;
        drop(state);

        let id = self.issuer.issue()?;
        let store = Arc::clone(&self.store);
        let directory = Arc::clone(&self.directory);
        let buffers = self.buffers.clone();

        self.issuer.complete(async move {
            let read = if Self::user_known(directory.as_ref(), user) {
                store
                    .read_blob(user, &location.container, &location.blob)
                    .await
            } else {
                Err(FileError::UserNotFound)
            };

            match read {
                Ok(bytes) => {
                    let load_size = bytes.len().min(end - start);
                    match buffers.write(buffer, start, &bytes[..load_size]) {
                        Ok(()) => save_load_envelope(id, Ok(()))
                            .with("file_size", bytes.len() as u64)
                            .with("load_size", load_size as u64),
                        Err(e) => {
                            warn!(request_id = %id, error = %e, "Load target buffer vanished");
                            save_load_envelope(id, Err(FileError::UnknownError))
                                .with("file_size", bytes.len() as u64)
                                .with("load_size", 0)
                        }
                    }
                }
                Err(error) => save_load_envelope(id, Err(error))
                    .with("file_size", 0)
                    .with("load_size", 0),
            }
        });
        Ok(id)
    }

    pub fn save_group_begin(&self, container: &str) -> Result<()> {
        self.issuer.ensure_running()?;
        let mut state = self.state()?;
        if state.group.is_some() {
            return Err(AppError::Conflict("save group is already open".to_string()));
        }
        let container = container.trim_matches(|c| c == '/' || c == '\\');
        state.group = Some(OpenGroup {
            container: if container.is_empty() {
                DEFAULT_CONTAINER.to_string()
            } else {
                container.to_string()
            },
            members: Vec::new(),
        });
        Ok(())
    }

    /// Commit the open group; member envelopes are followed by one for the group id
    pub fn save_group_end(&self) -> Result<RequestId> {
        self.issuer.ensure_running()?;
        let mut state = self.state()?;
        if state.group.is_none() {
            return Err(AppError::InvalidState("no save group opened".to_string()));
        }
        let id = self.issuer.issue()?;
        let user = state.user;
        let Some(group) = state.group.take() else {
            return Err(AppError::InvalidState("no save group opened".to_string()));
        };
        drop(state);

        info!(
            request_id = %id,
            container = %group.container,
            members = group.members.len(),
            "Committing save group"
        );
        self.commit(user, group.container, group.members, Some(id));
        Ok(id)
    }

    fn user_known(directory: &dyn UserDirectory, user: UserId) -> bool {
        !user.is_null() && directory.profile(user).is_some()
    }

    fn commit(
        &self,
        user: UserId,
        container: String,
        members: Vec<PendingSave>,
        group_id: Option<RequestId>,
    ) {
        let store = Arc::clone(&self.store);
        let directory = Arc::clone(&self.directory);

        self.issuer.spawn_with_events(move |events: EventSender| async move {
            let ids: Vec<RequestId> = members.iter().map(|m| m.id).collect();
            let result = if !Self::user_known(directory.as_ref(), user) {
                Err(FileError::UserNotFound)
            } else if members.is_empty() {
                Ok(())
            } else {
                let blobs = members
                    .into_iter()
                    .map(|m| BlobWrite::new(m.blob, m.data))
                    .collect();
                store.write_blobs(user, &container, blobs).await
            };

            if let Err(error) = result {
                warn!(user = %user, container = %container, error = %error, "Save failed");
            }
            for id in ids {
                events.post(save_load_envelope(id, result));
            }
            if let Some(group_id) = group_id {
                events.post(save_load_envelope(group_id, result));
            }
        });
    }
}

fn save_load_envelope(id: RequestId, result: std::result::Result<(), FileError>) -> Envelope {
    let error = result.err().unwrap_or(FileError::NoError);
    Envelope::new(AsyncChannel::SaveLoad)
        .with("id", id.value())
        .with("status", if result.is_ok() { 1 } else { 0 })
        .with("error", error.code())
}

fn out_of_range() -> AppError {
    AppError::Validation("offset and/or size argument out of range".to_string())
}

fn save_range(len: usize, offset: i64, size: i64) -> Result<(usize, usize)> {
    let len = i64::try_from(len).map_err(|_| out_of_range())?;
    let end = offset.checked_add(size).ok_or_else(out_of_range)?;
    if offset < 0 || offset >= len || size < 1 || end > len {
        return Err(out_of_range());
    }
    Ok((offset as usize, end as usize))
}

fn load_range(len: usize, offset: i64, size: i64) -> Result<(usize, usize)> {
    let size = if size == -1 {
        i64::try_from(len)
            .ok()
            .and_then(|len| len.checked_sub(offset))
            .ok_or_else(out_of_range)?
    } else {
        size
    };
    save_range(len, offset, size)
}
