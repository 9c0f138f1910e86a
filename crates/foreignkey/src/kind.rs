//! Resource kinds and the cloud providers that own them
//!
//! A kind selects the schema of a declared resource and, for references,
//! the shape of the output document being addressed.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error returned when a kind or provider name is not recognised
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {what}: '{input}'")]
pub struct ParseKindError {
    what: &'static str,
    input: String,
}

/// Cloud provider that owns a resource kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Provider {
    Atlas,
    Auth0,
    Aws,
    Azure,
    Civo,
    Cloudflare,
    Confluent,
    DigitalOcean,
    Gcp,
    Kubernetes,
    Snowflake,
}

impl Provider {
    /// Every provider, in display order
    pub const ALL: [Provider; 11] = [
        Provider::Atlas,
        Provider::Auth0,
        Provider::Aws,
        Provider::Azure,
        Provider::Civo,
        Provider::Cloudflare,
        Provider::Confluent,
        Provider::DigitalOcean,
        Provider::Gcp,
        Provider::Kubernetes,
        Provider::Snowflake,
    ];

    /// Lowercase name used in config files and CLI flags
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Atlas => "atlas",
            Self::Auth0 => "auth0",
            Self::Aws => "aws",
            Self::Azure => "azure",
            Self::Civo => "civo",
            Self::Cloudflare => "cloudflare",
            Self::Confluent => "confluent",
            Self::DigitalOcean => "digitalocean",
            Self::Gcp => "gcp",
            Self::Kubernetes => "kubernetes",
            Self::Snowflake => "snowflake",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = ParseKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| ParseKindError {
                what: "provider",
                input: s.to_string(),
            })
    }
}

impl Serialize for Provider {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Provider {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

macro_rules! resource_kinds {
    ($($kind:ident = $id:literal => $provider:ident,)+) => {
        /// A kind of declared cloud resource
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ResourceKind {
            $($kind,)+
        }

        impl ResourceKind {
            /// Every known kind, ordered by id
            pub const ALL: &'static [ResourceKind] = &[$(ResourceKind::$kind,)+];

            /// PascalCase name, as written in manifests
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$kind => stringify!($kind),)+
                }
            }

            /// Stable numeric id of the kind
            pub fn id(&self) -> u32 {
                match self {
                    $(Self::$kind => $id,)+
                }
            }

            /// Provider that provisions this kind
            pub fn provider(&self) -> Provider {
                match self {
                    $(Self::$kind => Provider::$provider,)+
                }
            }
        }
    };
}

resource_kinds! {
    ConfluentKafka = 50 => Confluent,
    MongodbAtlas = 51 => Atlas,
    SnowflakeDatabase = 52 => Snowflake,
    Auth0Client = 100 => Auth0,
    Auth0Connection = 101 => Auth0,
    AwsAlb = 200 => Aws,
    AwsCertManagerCert = 201 => Aws,
    AwsCloudFront = 202 => Aws,
    AwsDynamodb = 203 => Aws,
    AwsEcrRepo = 204 => Aws,
    AwsEcsCluster = 205 => Aws,
    AwsEcsService = 206 => Aws,
    AwsEksCluster = 207 => Aws,
    AwsIamRole = 208 => Aws,
    AwsLambda = 209 => Aws,
    AwsRdsCluster = 210 => Aws,
    AwsRdsInstance = 211 => Aws,
    AwsRoute53Zone = 212 => Aws,
    AwsS3Bucket = 213 => Aws,
    AwsSecretsManager = 214 => Aws,
    AwsSecurityGroup = 215 => Aws,
    AwsStaticWebsite = 216 => Aws,
    AwsVpc = 217 => Aws,
    AzureAksCluster = 400 => Azure,
    AzureKeyVault = 401 => Azure,
    CivoDnsZone = 500 => Civo,
    CivoKubernetesCluster = 501 => Civo,
    CloudflareDnsZone = 520 => Cloudflare,
    CloudflareR2Bucket = 521 => Cloudflare,
    DigitalOceanDatabaseCluster = 540 => DigitalOcean,
    DigitalOceanKubernetesCluster = 541 => DigitalOcean,
    GcpArtifactRegistryRepo = 600 => Gcp,
    GcpCloudCdn = 601 => Gcp,
    GcpCloudFunction = 602 => Gcp,
    GcpCloudRun = 603 => Gcp,
    GcpCloudSql = 604 => Gcp,
    GcpDnsZone = 605 => Gcp,
    GcpGcsBucket = 606 => Gcp,
    GcpGkeAddonBundle = 607 => Gcp,
    GcpGkeCluster = 608 => Gcp,
    GcpSecretsManager = 609 => Gcp,
    GcpStaticWebsite = 610 => Gcp,
    GcpProject = 611 => Gcp,
    GcpVpc = 612 => Gcp,
    GcpSubnetwork = 613 => Gcp,
    GcpRouterNat = 614 => Gcp,
    GcpCertManagerCert = 615 => Gcp,
    GcpGkeClusterCore = 616 => Gcp,
    GcpGkeNodePool = 617 => Gcp,
    KubernetesDeployment = 800 => Kubernetes,
    KubernetesCronJob = 801 => Kubernetes,
    KubernetesStatefulSet = 802 => Kubernetes,
    KubernetesPostgres = 810 => Kubernetes,
    KubernetesRedis = 811 => Kubernetes,
    KubernetesExternalDns = 820 => Kubernetes,
    KubernetesCertManager = 821 => Kubernetes,
}

impl ResourceKind {
    /// Lowercase hyphenated form (`AwsIamRole` -> `aws-iam-role`)
    pub fn kebab_name(&self) -> String {
        let name = self.as_str();
        let mut out = String::with_capacity(name.len() + 4);
        let mut prev: Option<char> = None;
        for c in name.chars() {
            if c.is_ascii_uppercase()
                && prev.is_some_and(|p| p.is_ascii_lowercase() || p.is_ascii_digit())
            {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            prev = Some(c);
        }
        out
    }

    /// All kinds owned by a provider
    pub fn for_provider(provider: Provider) -> impl Iterator<Item = ResourceKind> {
        Self::ALL
            .iter()
            .copied()
            .filter(move |k| k.provider() == provider)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ParseKindError;

    /// Parse leniently: `AwsIamRole`, `aws-iam-role`, `aws_iam_role` and
    /// `AWSIAMROLE` all name the same kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        if wanted.is_empty() {
            return Err(ParseKindError {
                what: "resource kind",
                input: s.to_string(),
            });
        }
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str().to_ascii_lowercase() == wanted)
            .ok_or_else(|| ParseKindError {
                what: "resource kind",
                input: s.to_string(),
            })
    }
}

impl Serialize for ResourceKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ResourceKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

fn normalize(s: &str) -> String {
    s.trim()
        .chars()
        .filter(|c| *c != '-' && *c != '_')
        .map(|c| c.to_ascii_lowercase())
        .collect()
}
