// Copyright 2025 the Parley Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Sharing a cache between the UI thread and the render thread.
//!
//! Rasterization is rare once a cache is warm, so one lock around the whole cache is enough:
//! hold it across a lookup-or-rasterize call, and across reading the atlas pixels and
//! generation for upload.

use std::sync::{Arc, Mutex, MutexGuard};

/// A cache behind a single shared lock.
#[derive(Debug, Default)]
pub struct SharedAtlas<T> {
    inner: Arc<Mutex<T>>,
}

impl<T> SharedAtlas<T> {
    /// Wraps `atlas`.
    pub fn new(atlas: T) -> Self {
        Self {
            inner: Arc::new(Mutex::new(atlas)),
        }
    }

    /// Locks the cache for exclusive use.
    ///
    /// A panic on another thread while it held the lock does not poison the cache for good:
    /// entries are only inserted once fully written, so the state is still consistent.
    pub fn lock(&self) -> MutexGuard<'_, T> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl<T> Clone for SharedAtlas<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
