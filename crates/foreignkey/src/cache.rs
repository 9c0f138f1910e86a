//! Per-pass read-through document cache with single-flight fetches

use crate::context::{ResolveContext, ResolveProgress};
use crate::document::OutputDocument;
use crate::store::{OutputStore, StoreError};
use crate::types::ResourceId;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

/// Outcome of one store fetch, shared by every reader of the same key
pub type Fetched = Result<Option<Arc<OutputDocument>>, StoreError>;

/// Caches output documents by `(Kind, Env, Name)` for one resolution pass
///
/// Each key owns a `OnceLock`: the first caller runs the store fetch and
/// concurrent callers for the same key block until it finishes, so the
/// store sees at most one `get` per key. Failures are cached too.
pub struct DocumentCache<'s, S: ?Sized> {
    store: &'s S,
    entries: Mutex<HashMap<ResourceId, Arc<OnceLock<Fetched>>>>,
}

impl<'s, S: OutputStore + ?Sized> DocumentCache<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Fetch the document for `id`, reading through to the store once
    pub fn get<P: ResolveProgress + ?Sized>(
        &self,
        id: &ResourceId,
        ctx: &ResolveContext,
        progress: &P,
    ) -> Fetched {
        let cell = {
            let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(entries.entry(id.clone()).or_default())
        };

        let mut fetched_here = false;
        let result = cell.get_or_init(|| {
            fetched_here = true;
            self.fetch(id, ctx, progress)
        });
        if !fetched_here {
            log::debug!("Cache hit for {id}");
        }
        result.clone()
    }

    /// Number of distinct resources requested so far
    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn fetch<P: ResolveProgress + ?Sized>(
        &self,
        id: &ResourceId,
        ctx: &ResolveContext,
        progress: &P,
    ) -> Fetched {
        ctx.check()?;
        progress.on_fetch_start(id);
        log::debug!("Fetching outputs of {id}");

        let result = self.store.get(id, ctx).map(|doc| doc.map(Arc::new));
        match &result {
            Ok(Some(_)) => {}
            Ok(None) => log::debug!("No outputs stored for {id}"),
            Err(e) => log::debug!("Store failed for {id}: {e}"),
        }
        progress.on_fetch_complete(id, matches!(result, Ok(Some(_))));
        result
    }
}
