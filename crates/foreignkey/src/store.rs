//! The output store boundary and an in-memory implementation

use crate::context::{Interrupt, ResolveContext};
use crate::document::OutputDocument;
use crate::types::ResourceId;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;

/// Failure reported by an output store
///
/// `Clone` because one store result is shared by every reference to the
/// same resource.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The pass was cancelled or timed out before or during the call
    #[error("store call {0}")]
    Interrupted(Interrupt),

    /// The backend failed (I/O, database, corrupt document)
    #[error("{message}")]
    Backend { message: String },
}

impl StoreError {
    /// Wrap any backend error
    pub fn backend(err: impl std::fmt::Display) -> Self {
        Self::Backend {
            message: err.to_string(),
        }
    }
}

impl From<Interrupt> for StoreError {
    fn from(reason: Interrupt) -> Self {
        Self::Interrupted(reason)
    }
}

/// Read access to previously persisted resource outputs
///
/// The sole boundary between the resolver and stored state. `Ok(None)`
/// means no document exists for the identity.
pub trait OutputStore: Send + Sync {
    /// Fetch the output document of one resource
    fn get(
        &self,
        id: &ResourceId,
        ctx: &ResolveContext,
    ) -> Result<Option<OutputDocument>, StoreError>;
}

impl<S: OutputStore + ?Sized> OutputStore for &S {
    fn get(
        &self,
        id: &ResourceId,
        ctx: &ResolveContext,
    ) -> Result<Option<OutputDocument>, StoreError> {
        (**self).get(id, ctx)
    }
}

impl<S: OutputStore + ?Sized> OutputStore for Box<S> {
    fn get(
        &self,
        id: &ResourceId,
        ctx: &ResolveContext,
    ) -> Result<Option<OutputDocument>, StoreError> {
        (**self).get(id, ctx)
    }
}

impl<S: OutputStore + ?Sized> OutputStore for Arc<S> {
    fn get(
        &self,
        id: &ResourceId,
        ctx: &ResolveContext,
    ) -> Result<Option<OutputDocument>, StoreError> {
        (**self).get(id, ctx)
    }
}

/// `HashMap`-backed store for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<ResourceId, OutputDocument>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document, builder style
    pub fn with(self, id: ResourceId, document: impl Into<OutputDocument>) -> Self {
        self.insert(id, document);
        self
    }

    /// Store or replace the document for `id`
    pub fn insert(&self, id: ResourceId, document: impl Into<OutputDocument>) {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, document.into());
    }

    /// Remove the document for `id`
    pub fn remove(&self, id: &ResourceId) -> Option<OutputDocument> {
        self.documents
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)
    }

    pub fn len(&self) -> usize {
        self.documents
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputStore for MemoryStore {
    fn get(
        &self,
        id: &ResourceId,
        ctx: &ResolveContext,
    ) -> Result<Option<OutputDocument>, StoreError> {
        ctx.check()?;
        let documents = self
            .documents
            .read()
            .map_err(|_| StoreError::backend("memory store lock poisoned"))?;
        Ok(documents.get(id).cloned())
    }
}
