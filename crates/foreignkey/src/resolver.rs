//! Resolution engine - substitutes every reference in a spec with the
//! literal it points at

use crate::cache::DocumentCache;
use crate::context::{NoProgress, ResolveContext, ResolveProgress};
use crate::error::{Failure, ReferenceError, ResolveError, Result};
use crate::scalar::ScalarValue;
use crate::store::{OutputStore, StoreError};
use crate::types::{Address, Reference, ResourceId};
use crate::walk::{RefSlot, Walk, walk_refs};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeSet;
use std::ops::Deref;

/// Default number of store lookups in flight
pub const DEFAULT_JOBS: usize = 4;

/// Options for a resolution pass
#[derive(Debug, Clone)]
pub struct ResolveOptions {
    /// Worker threads for store lookups and extraction (1 = sequential)
    pub jobs: usize,
    /// Environment inherited by references that omit `env`, normally the
    /// referencing resource's `metadata.env`
    pub default_env: Option<String>,
    /// Cancellation and deadline
    pub context: ResolveContext,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            jobs: DEFAULT_JOBS,
            default_env: None,
            context: ResolveContext::default(),
        }
    }
}

impl ResolveOptions {
    pub fn jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn default_env(mut self, env: impl Into<String>) -> Self {
        self.default_env = Some(env.into());
        self
    }

    pub fn context(mut self, context: ResolveContext) -> Self {
        self.context = context;
        self
    }
}

/// A spec in which every value-or-ref field holds a literal
///
/// Only the resolver constructs this, so holding one is proof the pass
/// succeeded. Read-only from then on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Resolved<S>(S);

impl<S> Resolved<S> {
    /// Borrow the resolved spec
    pub fn as_inner(&self) -> &S {
        &self.0
    }

    /// Take the resolved spec
    pub fn into_inner(self) -> S {
        self.0
    }

    /// Wrap a spec without resolving it
    #[cfg(test)]
    pub(crate) fn assume_resolved(spec: S) -> Self {
        Self(spec)
    }
}

impl<S> Deref for Resolved<S> {
    type Target = S;

    fn deref(&self) -> &S {
        &self.0
    }
}

/// Resolves specs against one output store
pub struct Resolver<S> {
    store: S,
    options: ResolveOptions,
}

impl<S: OutputStore> Resolver<S> {
    /// Create a resolver with default options
    pub fn new(store: S) -> Self {
        Self::with_options(store, ResolveOptions::default())
    }

    pub fn with_options(store: S, options: ResolveOptions) -> Self {
        Self { store, options }
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Resolve every reference in `spec`
    pub fn resolve<T: Walk>(&self, spec: T) -> Result<Resolved<T>> {
        self.resolve_with_progress(spec, &NoProgress)
    }

    /// Resolve every reference in `spec`, reporting to `progress`
    ///
    /// On failure the spec is dropped; a partially substituted spec never
    /// leaves this function.
    pub fn resolve_with_progress<T: Walk, P: ResolveProgress>(
        &self,
        mut spec: T,
        progress: &P,
    ) -> Result<Resolved<T>> {
        let outcome = self.resolve_in_place(&mut spec, progress);
        progress.on_pass_complete();
        outcome.map(|()| Resolved(spec))
    }

    fn resolve_in_place<T: Walk, P: ResolveProgress>(&self, spec: &mut T, progress: &P) -> Result<()> {
        let default_env = self.options.default_env.as_deref();
        let mut work: Vec<Work<'_>> = walk_refs(spec)
            .filter_map(|slot| Work::plan(slot, default_env))
            .collect();

        let ids: BTreeSet<ResourceId> = work
            .iter()
            .filter_map(|w| w.address.as_ref())
            .map(Address::resource_id)
            .collect();

        progress.on_pass_start(work.len(), ids.len());
        if work.is_empty() {
            log::debug!("No references to resolve");
            return Ok(());
        }
        log::debug!(
            "Resolving {} reference(s) across {} resource(s)",
            work.len(),
            ids.len()
        );

        let ctx = &self.options.context;
        let cache = DocumentCache::new(&self.store);
        let jobs = self.options.jobs.max(1);

        if jobs == 1 || work.len() == 1 {
            for id in &ids {
                let _ = cache.get(id, ctx, progress);
            }
            if ctx.check().is_ok() {
                for item in &mut work {
                    item.resolve(&cache, ctx, progress);
                }
            }
        } else {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(jobs)
                .build()
                .map_err(|e| ResolveError::ThreadPool(e.to_string()))?;

            pool.install(|| {
                // All documents land in the cache before any extraction
                ids.par_iter().for_each(|id| {
                    let _ = cache.get(id, ctx, progress);
                });
                if ctx.check().is_ok() {
                    work.par_iter_mut()
                        .for_each(|item| item.resolve(&cache, ctx, progress));
                }
            });
        }

        if let Err(reason) = ctx.check() {
            let failures = work
                .into_iter()
                .filter_map(|w| w.known_failure(&cache, ctx))
                .collect::<Vec<_>>();
            log::warn!("Resolution {reason} with {} failure(s) known", failures.len());
            return Err(ResolveError::Interrupted { reason, failures });
        }

        let total = work.len();
        let failures: Vec<ReferenceError> = work.into_iter().filter_map(|w| w.error).collect();
        for failure in &failures {
            log::warn!("{failure}");
            progress.on_failed(failure);
        }

        if failures.is_empty() {
            log::info!(
                "Resolved {total} reference(s) from {} resource(s)",
                ids.len()
            );
            Ok(())
        } else {
            log::info!(
                "{} of {total} reference(s) could not be resolved",
                failures.len()
            );
            Err(ResolveError::Unresolved { failures })
        }
    }
}

/// Resolve `spec` against `store` with default options
pub fn resolve<T: Walk, S: OutputStore + ?Sized>(spec: T, store: &S) -> Result<Resolved<T>> {
    Resolver::new(store).resolve(spec)
}

/// One reference awaiting substitution
struct Work<'a> {
    slot: RefSlot<'a>,
    reference: Reference,
    address: Option<Address>,
    error: Option<ReferenceError>,
}

impl<'a> Work<'a> {
    /// Complete the slot's address, or `None` if the slot is a literal
    fn plan(slot: RefSlot<'a>, default_env: Option<&str>) -> Option<Self> {
        let reference = slot.reference()?.clone();
        let (address, error) = match reference.address(slot.defaults(), default_env) {
            Ok(address) => (Some(address), None),
            Err(message) => {
                let error = ReferenceError {
                    path: slot.path().to_string(),
                    reference: reference.clone(),
                    address: None,
                    failure: Failure::InvalidReference { message },
                };
                (None, Some(error))
            }
        };
        Some(Self {
            slot,
            reference,
            address,
            error,
        })
    }

    /// Fetch, extract, convert and write back
    fn resolve<S, P>(&mut self, cache: &DocumentCache<'_, S>, ctx: &ResolveContext, progress: &P)
    where
        S: OutputStore + ?Sized,
        P: ResolveProgress,
    {
        let Some(address) = &self.address else {
            return;
        };
        let outcome = lookup(address, cache, ctx, progress)
            .and_then(|value| self.slot.assign(&value).map_err(Failure::from));
        match outcome {
            Ok(()) => {
                log::trace!("{} <- {address}", self.slot.path());
                progress.on_resolved(self.slot.path(), address);
            }
            Err(failure) => self.error = Some(self.fail(failure)),
        }
    }

    /// The failure this reference is known to have without further store
    /// calls, for reporting an interrupted pass
    fn known_failure<S: OutputStore + ?Sized>(
        self,
        cache: &DocumentCache<'_, S>,
        ctx: &ResolveContext,
    ) -> Option<ReferenceError> {
        if self.error.is_some() {
            return self.error;
        }
        let address = self.address.as_ref()?;
        // The context has tripped, so the cache answers without the store
        match cache.get(&address.resource_id(), ctx, &NoProgress) {
            Ok(None) => Some(self.fail(Failure::ResourceNotFound)),
            Err(e @ StoreError::Backend { .. }) => Some(self.fail(Failure::Store(e))),
            _ => None,
        }
    }

    fn fail(&self, failure: Failure) -> ReferenceError {
        ReferenceError {
            path: self.slot.path().to_string(),
            reference: self.reference.clone(),
            address: self.address.clone(),
            failure,
        }
    }
}

fn lookup<S, P>(
    address: &Address,
    cache: &DocumentCache<'_, S>,
    ctx: &ResolveContext,
    progress: &P,
) -> std::result::Result<ScalarValue, Failure>
where
    S: OutputStore + ?Sized,
    P: ResolveProgress,
{
    let document = cache
        .get(&address.resource_id(), ctx, progress)?
        .ok_or(Failure::ResourceNotFound)?;
    Ok(document.extract(&address.field_path)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{CancelToken, Interrupt};
    use crate::document::OutputDocument;
    use crate::error::ErrorCategory;
    use crate::impl_walk;
    use crate::kind::ResourceKind;
    use crate::store::MemoryStore;
    use crate::types::{FieldDefaults, Int32ValueOrRef, ReferenceValue, StringValueOrRef};
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq, Default, Serialize)]
    struct Container {
        port: Int32ValueOrRef,
        replicas: Int32ValueOrRef,
    }

    impl_walk!(Container { port, replicas });

    #[derive(Debug, Clone, PartialEq, Default, Serialize)]
    struct ClusterSpec {
        cluster_role_arn: StringValueOrRef,
        subnet_ids: Vec<StringValueOrRef>,
        container: Option<Container>,
        description: String,
    }

    impl_walk!(ClusterSpec {
        cluster_role_arn => FieldDefaults::kind(ResourceKind::AwsIamRole).field_path("status.outputs.arn"),
        subnet_ids => FieldDefaults::kind(ResourceKind::AwsVpc),
        container,
    });

    fn role_ref() -> Reference {
        Reference::new(
            ResourceKind::AwsIamRole,
            "prod",
            "eks-role",
            "status.outputs.arn",
        )
    }

    fn role_id() -> ResourceId {
        ResourceId::new(ResourceKind::AwsIamRole, "prod", "eks-role")
    }

    fn vpc_id() -> ResourceId {
        ResourceId::new(ResourceKind::AwsVpc, "prod", "main-vpc")
    }

    fn store() -> MemoryStore {
        MemoryStore::new()
            .with(
                role_id(),
                json!({"status": {"outputs": {"arn": "arn:aws:iam::123:role/eks-role"}}}),
            )
            .with(
                vpc_id(),
                json!({"status": {"outputs": {
                    "private_subnets": ["a", "b"],
                    "subnet_a": "subnet-aaa",
                    "subnet_b": "subnet-bbb",
                    "port": "100",
                    "name": "abc"
                }}}),
            )
    }

    fn vpc_ref(field: &str) -> Reference {
        Reference {
            field_path: Some(format!("status.outputs.{field}")),
            ..Reference::named("main-vpc")
        }
    }

    fn mixed_spec() -> ClusterSpec {
        ClusterSpec {
            cluster_role_arn: role_ref().into(),
            subnet_ids: vec![
                vpc_ref("subnet_a").into(),
                "subnet-literal".into(),
                vpc_ref("subnet_b").into(),
            ],
            container: Some(Container {
                port: Reference::new(ResourceKind::AwsVpc, "prod", "main-vpc", "status.outputs.port")
                    .into(),
                replicas: 2.into(),
            }),
            description: "cluster".into(),
        }
    }

    /// Counts `get` calls per resource
    #[derive(Default)]
    struct CountingStore {
        inner: MemoryStore,
        calls: Mutex<Vec<ResourceId>>,
    }

    impl OutputStore for CountingStore {
        fn get(
            &self,
            id: &ResourceId,
            ctx: &ResolveContext,
        ) -> std::result::Result<Option<OutputDocument>, StoreError> {
            self.calls.lock().unwrap().push(id.clone());
            std::thread::sleep(Duration::from_millis(5));
            self.inner.get(id, ctx)
        }
    }

    #[test]
    fn test_eks_role_scenario() {
        let spec = ClusterSpec {
            cluster_role_arn: role_ref().into(),
            ..Default::default()
        };
        let resolved = resolve(spec, &store()).unwrap();
        assert_eq!(
            resolved.cluster_role_arn,
            ReferenceValue::Literal("arn:aws:iam::123:role/eks-role".to_string())
        );
    }

    #[test]
    fn test_missing_resource_scenario() {
        let spec = ClusterSpec {
            cluster_role_arn: role_ref().into(),
            ..Default::default()
        };
        let err = resolve(spec, &MemoryStore::new()).unwrap_err();
        assert_eq!(err.categories(), vec![ErrorCategory::ResourceNotFound]);
        let failure = &err.failures()[0];
        assert_eq!(failure.address.as_ref().unwrap().resource_id(), role_id());
        let text = err.to_string();
        assert!(text.contains("ResourceNotFound"));
        assert!(text.contains("AwsIamRole/prod/eks-role#status.outputs.arn"));
    }

    #[test]
    fn test_mixed_spec_resolves_with_defaults() {
        let resolver = Resolver::with_options(store(), ResolveOptions::default().default_env("prod"));
        let resolved = resolver.resolve(mixed_spec()).unwrap();

        let subnets: Vec<_> = resolved.subnet_ids.iter().map(|s| s.value()).collect();
        assert_eq!(subnets, vec!["subnet-aaa", "subnet-literal", "subnet-bbb"]);
        let container = resolved.container.as_ref().unwrap();
        assert_eq!(container.port, ReferenceValue::Literal(100));
        assert_eq!(container.replicas, ReferenceValue::Literal(2));
        assert_eq!(resolved.description, "cluster");
    }

    #[test]
    fn test_literal_spec_is_unchanged() {
        let spec = ClusterSpec {
            cluster_role_arn: "arn:literal".into(),
            subnet_ids: vec!["a".into(), "b".into()],
            container: Some(Container {
                port: 80.into(),
                replicas: 1.into(),
            }),
            description: "d".into(),
        };
        let store = CountingStore::default();
        let resolved = resolve(spec.clone(), &store).unwrap();
        assert_eq!(resolved.as_inner(), &spec);
        assert!(store.calls.lock().unwrap().is_empty());

        // And resolving the result again changes nothing
        let again = resolve(resolved.into_inner(), &store).unwrap();
        assert_eq!(again.into_inner(), spec);
    }

    #[test]
    fn test_resolution_is_deterministic() {
        let options = ResolveOptions::default().default_env("prod").jobs(8);
        let first = Resolver::with_options(store(), options.clone())
            .resolve(mixed_spec())
            .unwrap();
        let second = Resolver::with_options(store(), options.jobs(1))
            .resolve(mixed_spec())
            .unwrap();
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }

    #[test]
    fn test_single_flight_per_resource() {
        let store = CountingStore {
            inner: store(),
            ..Default::default()
        };
        let spec = ClusterSpec {
            subnet_ids: (0..16).map(|_| vpc_ref("subnet_a").into()).collect(),
            ..Default::default()
        };
        let resolver = Resolver::with_options(&store, ResolveOptions::default().default_env("prod").jobs(8));
        let resolved = resolver.resolve(spec).unwrap();

        assert!(resolved.subnet_ids.iter().all(|s| s.value() == "subnet-aaa"));
        assert_eq!(*store.calls.lock().unwrap(), vec![vpc_id()]);
    }

    #[test]
    fn test_failures_are_aggregated() {
        let spec = ClusterSpec {
            cluster_role_arn: Reference::new(ResourceKind::AwsIamRole, "prod", "ghost", "status.outputs.arn").into(),
            subnet_ids: vec![
                vpc_ref("nodes_subnet_id").into(),
                vpc_ref("private_subnets").into(),
            ],
            ..Default::default()
        };
        let err = Resolver::with_options(store(), ResolveOptions::default().default_env("prod"))
            .resolve(spec)
            .unwrap_err();

        let failures = err.failures();
        assert_eq!(failures.len(), 3);
        assert_eq!(failures[0].path, "cluster_role_arn");
        assert_eq!(failures[0].category(), ErrorCategory::ResourceNotFound);
        assert_eq!(failures[1].path, "subnet_ids[0]");
        assert_eq!(failures[1].category(), ErrorCategory::FieldNotFound);
        assert_eq!(failures[2].path, "subnet_ids[1]");
        assert_eq!(failures[2].category(), ErrorCategory::NotScalar);
    }

    #[test]
    fn test_store_failure_reported_with_other_failures() {
        /// Fails every read of one resource
        struct BrokenStore {
            inner: MemoryStore,
            broken: ResourceId,
        }

        impl OutputStore for BrokenStore {
            fn get(
                &self,
                id: &ResourceId,
                ctx: &ResolveContext,
            ) -> std::result::Result<Option<OutputDocument>, StoreError> {
                if *id == self.broken {
                    return Err(StoreError::backend("database disk image is malformed"));
                }
                self.inner.get(id, ctx)
            }
        }

        let store = BrokenStore {
            inner: store(),
            broken: role_id(),
        };
        let spec = ClusterSpec {
            cluster_role_arn: role_ref().into(),
            subnet_ids: vec![vpc_ref("subnet_a").into(), vpc_ref("missing").into()],
            ..Default::default()
        };
        let err = Resolver::with_options(&store, ResolveOptions::default().default_env("prod"))
            .resolve(spec)
            .unwrap_err();

        let failures = err.failures();
        assert_eq!(failures.len(), 2);
        assert_eq!(failures[0].path, "cluster_role_arn");
        assert_eq!(failures[0].category(), ErrorCategory::StoreFailed);
        assert!(failures[0].failure.to_string().contains("malformed"));
        assert_eq!(failures[1].path, "subnet_ids[1]");
        assert_eq!(failures[1].category(), ErrorCategory::FieldNotFound);
        assert_eq!(
            err.categories(),
            vec![ErrorCategory::FieldNotFound, ErrorCategory::StoreFailed]
        );
    }

    #[test]
    fn test_int32_fidelity() {
        let port_ref = |field: &str| -> Int32ValueOrRef {
            Reference::new(ResourceKind::AwsVpc, "prod", "main-vpc", format!("status.outputs.{field}")).into()
        };

        let ok = ClusterSpec {
            container: Some(Container {
                port: port_ref("port"),
                replicas: 1.into(),
            }),
            ..Default::default()
        };
        let resolved = resolve(ok, &store()).unwrap();
        assert_eq!(resolved.container.as_ref().unwrap().port.literal(), Some(&100));

        let bad = ClusterSpec {
            container: Some(Container {
                port: port_ref("name"),
                replicas: 1.into(),
            }),
            ..Default::default()
        };
        let err = resolve(bad, &store()).unwrap_err();
        assert_eq!(err.categories(), vec![ErrorCategory::TypeConversionFailed]);
        assert_eq!(err.failures()[0].path, "container.port");
    }

    #[test]
    fn test_incomplete_reference_is_reported() {
        let spec = ClusterSpec {
            subnet_ids: vec![vpc_ref("subnet_a").into()],
            container: Some(Container {
                port: Reference::named("main-vpc").into(),
                replicas: 1.into(),
            }),
            ..Default::default()
        };
        // No default env, and the port field declares no default kind
        let err = resolve(spec, &store()).unwrap_err();
        let failures = err.failures();
        assert_eq!(failures.len(), 2);
        assert!(failures.iter().all(|f| f.category() == ErrorCategory::InvalidReference));
        assert!(failures[0].to_string().contains("env is required"));
        assert!(failures[1].to_string().contains("kind is required"));
    }

    #[test]
    fn test_cancelled_pass_returns_no_spec() {
        let token = CancelToken::new();
        token.cancel();
        let options = ResolveOptions::default().context(ResolveContext::new().with_cancel(token));
        let store = CountingStore {
            inner: store(),
            ..Default::default()
        };
        let err = Resolver::with_options(&store, options)
            .resolve(mixed_spec())
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Interrupted {
                reason: Interrupt::Cancelled,
                ..
            }
        ));
        assert!(store.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_cancellation_mid_pass_stops_fetching() {
        /// Trips the shared token from inside the first fetch
        struct CancellingStore {
            token: CancelToken,
            calls: AtomicUsize,
        }

        impl OutputStore for CancellingStore {
            fn get(
                &self,
                _id: &ResourceId,
                ctx: &ResolveContext,
            ) -> std::result::Result<Option<OutputDocument>, StoreError> {
                ctx.check()?;
                self.calls.fetch_add(1, Ordering::SeqCst);
                self.token.cancel();
                Ok(None)
            }
        }

        let token = CancelToken::new();
        let store = CancellingStore {
            token: token.clone(),
            calls: AtomicUsize::new(0),
        };
        let options = ResolveOptions::default()
            .default_env("prod")
            .jobs(1)
            .context(ResolveContext::new().with_cancel(token));
        let err = Resolver::with_options(&store, options)
            .resolve(mixed_spec())
            .unwrap_err();

        match err {
            ResolveError::Interrupted { reason, failures } => {
                assert_eq!(reason, Interrupt::Cancelled);
                // Only the first resource was fetched; it was missing
                assert_eq!(store.calls.load(Ordering::SeqCst), 1);
                assert!(failures.iter().all(|f| f.category() == ErrorCategory::ResourceNotFound));
                assert!(!failures.is_empty());
            }
            other => panic!("expected interruption, got {other}"),
        }
    }

    #[test]
    fn test_timeout_before_start() {
        let options = ResolveOptions::default()
            .default_env("prod")
            .context(ResolveContext::new().with_timeout(Duration::ZERO));
        let err = Resolver::with_options(store(), options)
            .resolve(mixed_spec())
            .unwrap_err();
        assert!(matches!(
            err,
            ResolveError::Interrupted {
                reason: Interrupt::TimedOut,
                ..
            }
        ));
    }
}
