//! Stack input assembly - the bundle handed to a provisioning adapter

use crate::error::AssembleError;
use crate::kind::{Provider, ResourceKind};
use crate::resolver::Resolved;
use crate::walk::{Walk, unresolved_paths};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

const REDACTED: &str = "********";

/// Identity and labels of the resource being provisioned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMetadata {
    pub kind: ResourceKind,
    pub name: String,
    /// Environment the resource is deployed to; references that omit
    /// `env` inherit it
    #[serde(default)]
    pub env: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub org: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl ResourceMetadata {
    pub fn new(kind: ResourceKind, name: impl Into<String>, env: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            env: env.into(),
            id: None,
            org: None,
            labels: BTreeMap::new(),
        }
    }

    /// The environment, or `None` when unset
    pub fn env(&self) -> Option<&str> {
        Some(self.env.as_str()).filter(|e| !e.is_empty())
    }
}

/// Credentials for one cloud provider
///
/// Deserialises from a provider config file such as
///
/// ```yaml
/// provider: aws
/// access_key_id: AKIA...
/// secret_access_key: ...
/// region: us-east-1
/// ```
///
/// `Debug` and `Display` never show the values.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderCredentials {
    pub provider: Provider,
    #[serde(flatten)]
    pub values: BTreeMap<String, String>,
}

impl ProviderCredentials {
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            values: BTreeMap::new(),
        }
    }

    /// Add a value, builder style
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// A copy with every value masked, for printing
    pub fn redacted(&self) -> Self {
        Self {
            provider: self.provider,
            values: self
                .values
                .keys()
                .map(|k| (k.clone(), REDACTED.to_string()))
                .collect(),
        }
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("provider", &self.provider)
            .field("keys", &self.values.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} credentials", self.provider)?;
        if !self.values.is_empty() {
            let keys: Vec<&str> = self.values.keys().map(String::as_str).collect();
            write!(f, " ({})", keys.join(", "))?;
        }
        Ok(())
    }
}

/// Everything a provisioning adapter needs, fully resolved
///
/// Immutable once assembled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackInput<S> {
    metadata: ResourceMetadata,
    target: S,
    #[serde(skip_serializing_if = "Option::is_none")]
    provider_credentials: Option<ProviderCredentials>,
}

impl<S> StackInput<S> {
    pub fn metadata(&self) -> &ResourceMetadata {
        &self.metadata
    }

    /// The resolved spec
    pub fn target(&self) -> &S {
        &self.target
    }

    pub fn provider_credentials(&self) -> Option<&ProviderCredentials> {
        self.provider_credentials.as_ref()
    }

    /// A copy safe to print: credential values masked
    pub fn redacted(&self) -> Self
    where
        S: Clone,
    {
        Self {
            metadata: self.metadata.clone(),
            target: self.target.clone(),
            provider_credentials: self.provider_credentials.as_ref().map(ProviderCredentials::redacted),
        }
    }
}

/// Bundle a resolved spec with credentials and metadata
///
/// Re-walks the spec first. A remaining reference means the resolver's
/// contract was broken and yields [`AssembleError::InvariantViolation`].
pub fn assemble<S: Walk>(
    resolved: Resolved<S>,
    credentials: Option<ProviderCredentials>,
    metadata: ResourceMetadata,
) -> Result<StackInput<S>, AssembleError> {
    let mut target = resolved.into_inner();

    let paths = unresolved_paths(&mut target);
    if !paths.is_empty() {
        log::error!(
            "Resolved spec for {} still holds {} reference(s)",
            metadata.name,
            paths.len()
        );
        return Err(AssembleError::InvariantViolation { paths });
    }

    if let Some(creds) = &credentials {
        let expected = metadata.kind.provider();
        if creds.provider != expected {
            return Err(AssembleError::ProviderMismatch {
                kind: metadata.kind,
                expected,
                found: creds.provider,
            });
        }
    }

    log::debug!("Assembled stack input for {} {}", metadata.kind, metadata.name);
    Ok(StackInput {
        metadata,
        target,
        provider_credentials: credentials,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impl_walk;
    use crate::types::{Reference, StringValueOrRef};

    #[derive(Debug, Clone, PartialEq, Default, Serialize)]
    struct Spec {
        role_arn: StringValueOrRef,
        subnets: Vec<StringValueOrRef>,
    }

    impl_walk!(Spec { role_arn, subnets });

    fn metadata() -> ResourceMetadata {
        ResourceMetadata::new(ResourceKind::AwsEksCluster, "main", "prod")
    }

    #[test]
    fn test_assemble_resolved_spec() {
        let spec = Spec {
            role_arn: "arn:aws:iam::123:role/eks".into(),
            subnets: vec!["subnet-a".into()],
        };
        let creds = ProviderCredentials::new(Provider::Aws).with("region", "us-east-1");
        let input = assemble(Resolved::assume_resolved(spec.clone()), Some(creds), metadata()).unwrap();

        assert_eq!(input.target(), &spec);
        assert_eq!(input.metadata().name, "main");
        assert_eq!(input.provider_credentials().unwrap().get("region"), Some("us-east-1"));
    }

    #[test]
    fn test_assemble_rejects_leftover_references() {
        let spec = Spec {
            role_arn: "arn".into(),
            subnets: vec!["a".into(), Reference::named("vpc").into()],
        };
        let err = assemble(Resolved::assume_resolved(spec), None, metadata()).unwrap_err();
        assert_eq!(
            err,
            AssembleError::InvariantViolation {
                paths: vec!["subnets[1]".to_string()]
            }
        );
    }

    #[test]
    fn test_assemble_rejects_wrong_provider() {
        let creds = ProviderCredentials::new(Provider::Gcp);
        let err = assemble(Resolved::assume_resolved(Spec::default()), Some(creds), metadata()).unwrap_err();
        assert_eq!(
            err,
            AssembleError::ProviderMismatch {
                kind: ResourceKind::AwsEksCluster,
                expected: Provider::Aws,
                found: Provider::Gcp,
            }
        );
    }

    #[test]
    fn test_credentials_are_redacted_in_output() {
        let creds = ProviderCredentials::new(Provider::Aws).with("secret_access_key", "hunter2");
        assert!(!format!("{creds:?}").contains("hunter2"));
        assert_eq!(creds.to_string(), "aws credentials (secret_access_key)");

        let input = assemble(Resolved::assume_resolved(Spec::default()), Some(creds), metadata())
            .unwrap()
            .redacted();
        let json = serde_json::to_string(&input).unwrap();
        assert!(!json.contains("hunter2"));
        assert!(json.contains(REDACTED));
    }

    #[test]
    fn test_credentials_from_yaml() {
        let creds: ProviderCredentials = serde_yaml::from_str(
            "provider: aws\naccess_key_id: AKIA\nsecret_access_key: s3cret\nregion: us-west-2\n",
        )
        .unwrap();
        assert_eq!(creds.provider, Provider::Aws);
        assert_eq!(creds.get("region"), Some("us-west-2"));
        assert_eq!(creds.values.len(), 3);
    }

    #[test]
    fn test_metadata_env() {
        assert_eq!(metadata().env(), Some("prod"));
        assert_eq!(ResourceMetadata::new(ResourceKind::AwsVpc, "v", "").env(), None);
    }
}
