//! Exclusive ownership of a single native handle.
//!
//! [`Owned`] is the one scoped-handle type behind every resource wrapper in
//! the crate. A [`HandleKind`] supplies the raw handle type and the release
//! function; the null check of [`RawHandle`] is the failure predicate used at
//! construction. The wrapper borrows the backend for `'a`, which is always
//! derived from the guard or parent handle the resource depends on.

use std::{fmt, marker::PhantomData};

use tracing::trace;

use crate::{
    backend::{Backend, RawHandle},
    Result, SdlError,
};

/// Describes one kind of native resource.
pub trait HandleKind<B: Backend> {
    type Raw: RawHandle;

    /// Human readable kind name used in logs and errors.
    const NAME: &'static str;

    fn release(backend: &B, raw: Self::Raw);
}

/// Owns at most one native handle of kind `K` and releases it on drop.
pub struct Owned<'a, B: Backend, K: HandleKind<B>> {
    backend: &'a B,
    raw: Option<K::Raw>,
    _kind: PhantomData<K>,
}

impl<'a, B: Backend, K: HandleKind<B>> Owned<'a, B, K> {
    /// Wraps the result of a native creation call. A null handle is turned
    /// into [`SdlError::Native`] naming `call`.
    pub(crate) fn create(backend: &'a B, call: &'static str, raw: K::Raw) -> Result<Self> {
        if raw.is_null() {
            let message = backend.last_error();
            return Err(SdlError::native(call, message));
        }

        trace!(kind = K::NAME, ?raw, "acquired handle");
        Ok(Self {
            backend,
            raw: Some(raw),
            _kind: PhantomData,
        })
    }

    /// A wrapper that owns nothing yet. Dropping it is a no-op.
    pub fn empty(backend: &'a B) -> Self {
        Self {
            backend,
            raw: None,
            _kind: PhantomData,
        }
    }

    /// Adopts a raw handle. A null handle yields the empty state.
    ///
    /// # Safety
    /// `raw` must be a live handle of kind `K` created through `backend`, and
    /// nothing else may release it.
    pub unsafe fn from_raw(backend: &'a B, raw: K::Raw) -> Self {
        let mut owned = Self::empty(backend);
        if !raw.is_null() {
            owned.raw = Some(raw);
        }
        owned
    }

    /// The owned raw handle, `None` once taken.
    pub fn raw(&self) -> Option<K::Raw> {
        self.raw
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_none()
    }

    pub fn backend(&self) -> &'a B {
        self.backend
    }

    /// Moves ownership out, leaving `self` empty.
    pub fn take(&mut self) -> Self {
        Self {
            backend: self.backend,
            raw: self.raw.take(),
            _kind: PhantomData,
        }
    }

    /// Releases the currently owned handle, if any, then takes over `other`.
    pub fn replace(&mut self, mut other: Self) {
        self.reset();
        self.backend = other.backend;
        self.raw = other.raw.take();
    }

    /// Releases the owned handle now and leaves `self` empty.
    pub fn reset(&mut self) {
        if let Some(raw) = self.raw.take() {
            trace!(kind = K::NAME, ?raw, "releasing handle");
            K::release(self.backend, raw);
        }
    }

    /// Gives up ownership without releasing.
    pub fn into_raw(mut self) -> Option<K::Raw> {
        self.raw.take()
    }

    /// The raw handle for a forwarding call, or [`SdlError::EmptyHandle`].
    pub(crate) fn require(&self) -> Result<K::Raw> {
        self.raw.ok_or(SdlError::EmptyHandle(K::NAME))
    }
}

impl<B: Backend, K: HandleKind<B>> Drop for Owned<'_, B, K> {
    fn drop(&mut self) {
        self.reset();
    }
}

impl<B: Backend, K: HandleKind<B>> fmt::Debug for Owned<'_, B, K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Owned")
            .field("kind", &K::NAME)
            .field("raw", &self.raw)
            .finish()
    }
}

/// Maps a native status return onto `Result`, negative meaning failure.
pub(crate) fn check<B: Backend>(backend: &B, call: &'static str, status: i32) -> Result<()> {
    if status < 0 {
        let message = backend.last_error();
        Err(SdlError::native(call, message))
    } else {
        Ok(())
    }
}
