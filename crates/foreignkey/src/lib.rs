//! # Foreignkey
//!
//! Cross-resource reference resolution for declarative cloud resource specs.
//!
//! A spec field that must point at another resource (a subnet ID, a cluster
//! ARN, a DNS zone) is typed as a [`ReferenceValue`]: either a literal or a
//! [`Reference`] into another resource's published outputs. Before a spec
//! is provisioned, every reference is replaced by the literal it addresses.
//!
//! ## Core Concepts
//!
//! - **ReferenceValue**: literal-or-reference field, wire-compatible with
//!   `{"value": ...}` / `{"value_from": {...}}`
//! - **Walk**: implemented by every spec type to expose its reference fields
//! - **OutputStore**: read access to persisted output documents
//! - **Resolver**: fetches, extracts, converts and substitutes, collecting
//!   every failure into one report
//! - **StackInput**: the resolved spec bundled with credentials and metadata
//!
//! ## Example
//!
//! ```ignore
//! use foreignkey::{
//!     impl_walk, FieldDefaults, MemoryStore, Reference, ResourceId, ResourceKind,
//!     ResourceMetadata, Resolver, ResolveOptions, StringValueOrRef, assemble,
//! };
//!
//! #[derive(Debug, Default)]
//! struct EksSpec {
//!     cluster_role_arn: StringValueOrRef,
//! }
//!
//! impl_walk!(EksSpec {
//!     cluster_role_arn => FieldDefaults::kind(ResourceKind::AwsIamRole)
//!         .field_path("status.outputs.arn"),
//! });
//!
//! let store = MemoryStore::new().with(
//!     ResourceId::new(ResourceKind::AwsIamRole, "prod", "eks-role"),
//!     serde_json::json!({"status": {"outputs": {"arn": "arn:aws:iam::123:role/eks-role"}}}),
//! );
//!
//! let spec = EksSpec { cluster_role_arn: Reference::named("eks-role").into() };
//! let resolver = Resolver::with_options(store, ResolveOptions::default().default_env("prod"));
//! let resolved = resolver.resolve(spec)?;
//! let input = assemble(
//!     resolved,
//!     None,
//!     ResourceMetadata::new(ResourceKind::AwsEksCluster, "main", "prod"),
//! )?;
//! ```
//!
//! ## Provider Traits
//!
//! - [`OutputStore`]: where output documents come from
//! - [`ResolveProgress`]: receives progress updates
//!
//! Cancellation and deadlines travel in a [`ResolveContext`] down to every
//! store call.

pub mod cache;
pub mod context;
pub mod document;
pub mod error;
pub mod kind;
pub mod resolver;
pub mod scalar;
pub mod stack_input;
pub mod store;
pub mod types;
pub mod walk;

// Re-export main types at crate root
pub use cache::DocumentCache;
pub use context::{CancelToken, Interrupt, NoProgress, ResolveContext, ResolveProgress};
pub use document::{ExtractError, OutputDocument, extract};
pub use error::{AssembleError, ErrorCategory, Failure, ReferenceError, ResolveError, Result};
pub use kind::{ParseKindError, Provider, ResourceKind};
pub use resolver::{DEFAULT_JOBS, ResolveOptions, Resolved, Resolver, resolve};
pub use scalar::{ConversionError, Scalar, ScalarValue};
pub use stack_input::{ProviderCredentials, ResourceMetadata, StackInput, assemble};
pub use store::{MemoryStore, OutputStore, StoreError};
pub use types::{
    Address, BoolValueOrRef, FieldDefaults, Int32ValueOrRef, Int64ValueOrRef, RefField, Reference,
    ReferenceValue, ResourceId, StringValueOrRef,
};
pub use walk::{RefSlot, RefSlots, Walk, Walker, unresolved_paths, walk_refs};
