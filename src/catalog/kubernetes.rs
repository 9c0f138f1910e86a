//! Kubernetes specs

use super::aws::ContainerImage;
use foreignkey::{Int32ValueOrRef, StringValueOrRef, impl_walk};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KubernetesDeploymentSpec {
    pub namespace: StringValueOrRef,
    pub version: String,
    pub container: DeploymentContainer,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub availability: Option<DeploymentAvailability>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeploymentContainer {
    pub app: DeploymentApp,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeploymentApp {
    pub image: ContainerImage,
    pub env: DeploymentEnv,
    pub ports: Vec<DeploymentPort>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeploymentEnv {
    /// Plain environment variables; values may come from other resources
    pub variables: BTreeMap<String, StringValueOrRef>,
    /// Secret names, passed through untouched
    pub secrets: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeploymentPort {
    pub name: String,
    pub container_port: i32,
    pub service_port: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeploymentAvailability {
    pub min_replicas: Int32ValueOrRef,
}

impl_walk!(KubernetesDeploymentSpec {
    namespace,
    container,
    availability,
});

impl_walk!(DeploymentContainer { app });
impl_walk!(DeploymentApp { env });
impl_walk!(DeploymentEnv { variables });
impl_walk!(DeploymentAvailability { min_replicas });
