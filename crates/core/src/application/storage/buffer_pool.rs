// Buffer Pool - slot registry of byte buffers addressed by index

use crate::application::constants::MAX_BUFFER_BYTES;
use crate::error::{AppError, Result};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared table of buffers. Freed slots are handed out again lowest-first.
#[derive(Clone, Default)]
pub struct BufferPool {
    slots: Arc<Mutex<Vec<Option<Vec<u8>>>>>,
}

impl BufferPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn check_size(size: usize) -> Result<()> {
        if size > MAX_BUFFER_BYTES {
            return Err(AppError::Validation(format!(
                "buffer size {} exceeds {} bytes",
                size, MAX_BUFFER_BYTES
            )));
        }
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<Option<Vec<u8>>>>> {
        self.slots
            .lock()
            .map_err(|_| AppError::Internal("buffer pool lock poisoned".to_string()))
    }

    /// Allocate a zero-filled buffer and return its index
    pub fn create(&self, size: usize) -> Result<i32> {
        Self::check_size(size)?;
        let mut slots = self.lock()?;
        let index = match slots.iter().position(Option::is_none) {
            Some(free) => {
                slots[free] = Some(vec![0; size]);
                free
            }
            None => {
                slots.push(Some(vec![0; size]));
                slots.len() - 1
            }
        };
        i32::try_from(index).map_err(|_| AppError::Internal("buffer pool exhausted".to_string()))
    }

    /// Copy `data` into the buffer at `offset`, growing it if needed
    pub fn write(&self, index: i32, offset: usize, data: &[u8]) -> Result<()> {
        let end = offset
            .checked_add(data.len())
            .ok_or_else(|| AppError::Validation("write offset out of range".to_string()))?;
        Self::check_size(end)?;
        let mut slots = self.lock()?;
        let buffer = Self::slot_mut(&mut slots, index)?;
        if buffer.len() < end {
            buffer.resize(end, 0);
        }
        buffer[offset..end].copy_from_slice(data);
        Ok(())
    }

    pub fn read(&self, index: i32) -> Result<Vec<u8>> {
        self.with(index, |buffer| buffer.to_vec())
    }

    pub fn delete(&self, index: i32) -> Result<()> {
        let mut slots = self.lock()?;
        Self::slot_mut(&mut slots, index)?;
        slots[index as usize] = None;
        while matches!(slots.last(), Some(None)) {
            slots.pop();
        }
        Ok(())
    }

    pub fn len(&self, index: i32) -> Result<usize> {
        self.with(index, |buffer| buffer.len())
    }

    pub fn exists(&self, index: i32) -> bool {
        self.len(index).is_ok()
    }

    /// Borrow a buffer for the duration of `f`
    pub fn with<T>(&self, index: i32, f: impl FnOnce(&[u8]) -> T) -> Result<T> {
        let slots = self.lock()?;
        usize::try_from(index)
            .ok()
            .and_then(|i| slots.get(i))
            .and_then(Option::as_ref)
            .map(|buffer| f(buffer))
            .ok_or_else(|| AppError::NotFound(format!("buffer {}", index)))
    }

    fn slot_mut(slots: &mut [Option<Vec<u8>>], index: i32) -> Result<&mut Vec<u8>> {
        usize::try_from(index)
            .ok()
            .and_then(|i| slots.get_mut(i))
            .and_then(Option::as_mut)
            .ok_or_else(|| AppError::NotFound(format!("buffer {}", index)))
    }
}
