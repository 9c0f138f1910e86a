//! AWS specs

use foreignkey::{
    BoolValueOrRef, FieldDefaults, Int32ValueOrRef, ResourceKind, StringValueOrRef, Walk, Walker,
    impl_walk,
};
use serde::{Deserialize, Serialize};

const IAM_ROLE_ARN: FieldDefaults =
    FieldDefaults::kind(ResourceKind::AwsIamRole).field_path("status.outputs.arn");
const SECURITY_GROUP_ID: FieldDefaults =
    FieldDefaults::kind(ResourceKind::AwsSecurityGroup).field_path("status.outputs.security_group_id");

// ============================================================================
// AwsEksCluster
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsEksClusterSpec {
    /// Subnets for the control plane ENIs (at least two AZs)
    pub subnet_ids: Vec<StringValueOrRef>,
    pub cluster_role_arn: StringValueOrRef,
    pub node_role_arn: StringValueOrRef,
    pub security_groups: Vec<StringValueOrRef>,
    pub version: String,
    pub disable_public_endpoint: bool,
    pub public_access_cidrs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<AwsEksClusterLogging>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsEksClusterLogging {
    /// Ship control plane logs to CloudWatch
    pub enabled: BoolValueOrRef,
}

impl_walk!(AwsEksClusterSpec {
    subnet_ids => FieldDefaults::kind(ResourceKind::AwsVpc),
    cluster_role_arn => IAM_ROLE_ARN,
    node_role_arn => IAM_ROLE_ARN,
    security_groups => SECURITY_GROUP_ID,
    logging,
});

impl_walk!(AwsEksClusterLogging { enabled });

// ============================================================================
// AwsEcsService
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsEcsServiceSpec {
    pub cluster_arn: StringValueOrRef,
    pub network: AwsEcsServiceNetwork,
    pub container: AwsEcsServiceContainer,
    pub iam: AwsEcsServiceIam,
    pub alb: AlbTarget,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsEcsServiceNetwork {
    pub subnets: Vec<StringValueOrRef>,
    pub security_groups: Vec<StringValueOrRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsEcsServiceContainer {
    pub image: ContainerImage,
    /// CPU units (256 = 0.25 vCPU)
    pub cpu: i32,
    /// Memory in MiB
    pub memory: i32,
    pub port: Int32ValueOrRef,
    pub replicas: Int32ValueOrRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerImage {
    pub repo: String,
    pub tag: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AwsEcsServiceIam {
    pub task_execution_role_arn: StringValueOrRef,
    pub task_role_arn: StringValueOrRef,
}

/// Load balancer the service registers with
///
/// Written as `alb: {arn: ...}` or `alb: none`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlbTarget {
    Arn(StringValueOrRef),
    #[default]
    None,
}

impl Walk for AlbTarget {
    fn walk<'a>(&'a mut self, walker: &mut Walker<'a>) {
        match self {
            Self::Arn(arn) => walker.field_with(
                "arn",
                arn,
                FieldDefaults::kind(ResourceKind::AwsAlb).field_path("status.outputs.load_balancer_arn"),
            ),
            Self::None => {}
        }
    }
}

impl_walk!(AwsEcsServiceSpec {
    cluster_arn => FieldDefaults::kind(ResourceKind::AwsEcsCluster)
        .field_path("status.outputs.cluster_arn"),
    network,
    container,
    iam,
    alb,
});

impl_walk!(AwsEcsServiceNetwork {
    subnets => FieldDefaults::kind(ResourceKind::AwsVpc),
    security_groups => SECURITY_GROUP_ID,
});

impl_walk!(AwsEcsServiceContainer { port, replicas });

impl_walk!(AwsEcsServiceIam {
    task_execution_role_arn => IAM_ROLE_ARN,
    task_role_arn => IAM_ROLE_ARN,
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::from_yaml;
    use foreignkey::{Reference, ReferenceValue, walk_refs};

    fn paths<W: Walk>(spec: &mut W) -> Vec<String> {
        walk_refs(spec).map(|slot| slot.path().to_string()).collect()
    }

    #[test]
    fn test_eks_walk_order_and_defaults() {
        let mut spec = AwsEksClusterSpec {
            subnet_ids: vec!["subnet-a".into(), Reference::named("main-vpc").into()],
            cluster_role_arn: Reference::named("eks-role").into(),
            logging: Some(AwsEksClusterLogging {
                enabled: true.into(),
            }),
            ..Default::default()
        };

        assert_eq!(
            paths(&mut spec),
            vec![
                "subnet_ids[0]",
                "subnet_ids[1]",
                "cluster_role_arn",
                "node_role_arn",
                "logging.enabled",
            ]
        );

        let slots: Vec<_> = walk_refs(&mut spec).collect();
        assert_eq!(slots[1].defaults().kind, Some(ResourceKind::AwsVpc));
        assert_eq!(slots[1].defaults().field_path, None);
        assert_eq!(slots[2].defaults().field_path, Some("status.outputs.arn"));
        // Nested messages start from a clean slate
        assert_eq!(slots[4].defaults(), &FieldDefaults::default());
    }

    #[test]
    fn test_alb_oneof_wire_form() {
        let none: AlbTarget = from_yaml("none").unwrap();
        assert_eq!(none, AlbTarget::None);

        let arn: AlbTarget = from_yaml("arn:\n  value_from:\n    name: main-alb\n").unwrap();
        assert_eq!(arn, AlbTarget::Arn(Reference::named("main-alb").into()));
    }

    #[test]
    fn test_alb_walks_active_branch_only() {
        let mut spec = AwsEcsServiceSpec::default();
        assert!(!paths(&mut spec).contains(&"alb.arn".to_string()));

        spec.alb = AlbTarget::Arn(Reference::named("main-alb").into());
        let mut slots = walk_refs(&mut spec);
        let alb = slots.find(|s| s.path() == "alb.arn").unwrap();
        assert_eq!(alb.defaults().kind, Some(ResourceKind::AwsAlb));
    }

    #[test]
    fn test_ecs_nested_paths() {
        let mut spec = AwsEcsServiceSpec {
            network: AwsEcsServiceNetwork {
                subnets: vec![ReferenceValue::Literal("subnet-1".to_string())],
                security_groups: vec![Reference::named("web-sg").into()],
            },
            ..Default::default()
        };
        assert_eq!(
            paths(&mut spec),
            vec![
                "cluster_arn",
                "network.subnets[0]",
                "network.security_groups[0]",
                "container.port",
                "container.replicas",
                "iam.task_execution_role_arn",
                "iam.task_role_arn",
            ]
        );
    }
}
