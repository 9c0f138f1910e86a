//! Resource catalog: typed specs and YAML manifest loading
//!
//! A manifest is the declarative document a user writes for one resource:
//!
//! ```yaml
//! apiVersion: aws.project-planton.org/v1
//! kind: AwsEksCluster
//! metadata:
//!   name: main
//!   env: prod
//! spec:
//!   cluster_role_arn:
//!     value_from:
//!       name: eks-role
//! ```
//!
//! [`CatalogManifest`] dispatches on `kind` to the matching spec type.
//! Commands operate on any of them through [`ManifestVisitor`].

pub mod aws;
pub mod gcp;
pub mod kubernetes;

use foreignkey::{ParseKindError, ResourceKind, ResourceMetadata, Walk, Walker};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors loading a manifest
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid manifest: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid manifest: {0}")]
    Schema(#[from] serde_json::Error),

    #[error("manifest has no 'kind'")]
    MissingKind,

    #[error(transparent)]
    UnknownKind(#[from] ParseKindError),

    #[error("kind {kind} is not in the catalog (supported: {supported})")]
    Unsupported { kind: ResourceKind, supported: String },

    #[error("apiVersion '{found}' does not match kind {kind} (expected '{expected}')")]
    ApiVersion {
        kind: ResourceKind,
        expected: String,
        found: String,
    },
}

/// Decode YAML through the JSON data model
///
/// Keeps the `{value: ...}` / `{value_from: ...}` single-key form for
/// enums, independent of the YAML library's tag conventions.
pub(crate) fn from_yaml<T: DeserializeOwned>(text: &str) -> Result<T, CatalogError> {
    let value: serde_json::Value = serde_yaml::from_str(text)?;
    Ok(serde_json::from_value(value)?)
}

/// `metadata` block of a manifest
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestMetadata {
    pub name: String,
    /// Environment references without `env` inherit
    #[serde(skip_serializing_if = "String::is_empty")]
    pub env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

/// One resource manifest with a typed spec
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct Manifest<S> {
    pub api_version: String,
    pub kind: ResourceKind,
    pub metadata: ManifestMetadata,
    pub spec: S,
}

impl<S> Manifest<S> {
    /// Metadata handed to the stack input
    pub fn resource_metadata(&self) -> ResourceMetadata {
        ResourceMetadata {
            kind: self.kind,
            name: self.metadata.name.clone(),
            env: self.metadata.env.clone(),
            id: self.metadata.id.clone(),
            org: self.metadata.org.clone(),
            labels: self.metadata.labels.clone(),
        }
    }
}

/// Reference paths are rooted at `spec`
impl<S: Walk> Walk for Manifest<S> {
    fn walk<'a>(&'a mut self, walker: &mut Walker<'a>) {
        walker.field("spec", &mut self.spec);
    }
}

/// `apiVersion` every manifest of `kind` must carry
pub fn expected_api_version(kind: ResourceKind) -> String {
    format!("{}.project-planton.org/v1", kind.provider())
}

/// Bounds shared by every catalog spec
pub trait Spec: Walk + Serialize + DeserializeOwned + Clone + fmt::Debug + Send {}

impl<T> Spec for T where T: Walk + Serialize + DeserializeOwned + Clone + fmt::Debug + Send {}

/// Operation over a manifest of any catalog kind
pub trait ManifestVisitor {
    type Output;

    fn visit<S: Spec>(self, manifest: Manifest<S>) -> Self::Output;
}

macro_rules! catalog {
    ($($kind:ident => $spec:ty,)+) => {
        /// A manifest of any supported kind
        #[derive(Debug, Clone, PartialEq)]
        pub enum CatalogManifest {
            $($kind(Manifest<$spec>),)+
        }

        impl CatalogManifest {
            /// Kinds with a spec type in this build
            pub const SUPPORTED: &'static [ResourceKind] = &[$(ResourceKind::$kind,)+];

            fn decode(kind: ResourceKind, value: serde_json::Value) -> Result<Self, CatalogError> {
                match kind {
                    $(ResourceKind::$kind => Ok(Self::$kind(serde_json::from_value(value)?)),)+
                    other => Err(CatalogError::Unsupported {
                        kind: other,
                        supported: supported_list(),
                    }),
                }
            }

            pub fn kind(&self) -> ResourceKind {
                match self {
                    $(Self::$kind(_) => ResourceKind::$kind,)+
                }
            }

            pub fn api_version(&self) -> &str {
                match self {
                    $(Self::$kind(m) => &m.api_version,)+
                }
            }

            pub fn metadata(&self) -> &ManifestMetadata {
                match self {
                    $(Self::$kind(m) => &m.metadata,)+
                }
            }

            /// Run `visitor` on the typed manifest
            pub fn accept<V: ManifestVisitor>(self, visitor: V) -> V::Output {
                match self {
                    $(Self::$kind(m) => visitor.visit(m),)+
                }
            }
        }
    };
}

catalog! {
    AwsEcsService => aws::AwsEcsServiceSpec,
    AwsEksCluster => aws::AwsEksClusterSpec,
    GcpRouterNat => gcp::GcpRouterNatSpec,
    GcpCertManagerCert => gcp::GcpCertManagerCertSpec,
    KubernetesDeployment => kubernetes::KubernetesDeploymentSpec,
}

fn supported_list() -> String {
    CatalogManifest::SUPPORTED
        .iter()
        .map(ResourceKind::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

impl CatalogManifest {
    /// Parse a manifest, dispatching on its `kind`
    pub fn from_yaml(text: &str) -> Result<Self, CatalogError> {
        let value: serde_json::Value = from_yaml(text)?;
        let kind: ResourceKind = value
            .get("kind")
            .and_then(serde_json::Value::as_str)
            .ok_or(CatalogError::MissingKind)?
            .parse()?;

        let manifest = Self::decode(kind, value)?;

        let expected = expected_api_version(kind);
        if manifest.api_version() != expected {
            return Err(CatalogError::ApiVersion {
                kind,
                expected,
                found: manifest.api_version().to_string(),
            });
        }
        log::debug!("Loaded {} manifest '{}'", kind, manifest.metadata().name);
        Ok(manifest)
    }

    /// Read and parse a manifest file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        use anyhow::Context;

        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Could not read manifest: {}", path.display()))?;
        Self::from_yaml(&text).with_context(|| format!("Invalid manifest: {}", path.display()))
    }

    pub fn is_supported(kind: ResourceKind) -> bool {
        Self::SUPPORTED.contains(&kind)
    }
}
