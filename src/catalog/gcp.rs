//! GCP specs

use foreignkey::{FieldDefaults, ResourceKind, StringValueOrRef, impl_walk};
use serde::{Deserialize, Serialize};

const PROJECT_ID: FieldDefaults =
    FieldDefaults::kind(ResourceKind::GcpProject).field_path("status.outputs.project_id");

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GcpCertManagerCertSpec {
    pub project_id: StringValueOrRef,
    pub primary_domain_name: String,
    pub alternate_domain_names: Vec<String>,
    /// Zone that receives the DNS validation records
    pub cloud_dns_zone_id: StringValueOrRef,
}

impl_walk!(GcpCertManagerCertSpec {
    project_id => PROJECT_ID,
    cloud_dns_zone_id => FieldDefaults::kind(ResourceKind::GcpDnsZone)
        .field_path("status.outputs.zone_id"),
});

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GcpRouterNatSpec {
    pub project_id: StringValueOrRef,
    pub region: String,
    pub vpc_self_link: StringValueOrRef,
    /// Subnetworks to NAT; empty means every subnetwork in the region
    pub subnetwork_self_links: Vec<StringValueOrRef>,
}

impl_walk!(GcpRouterNatSpec {
    project_id => PROJECT_ID,
    vpc_self_link => FieldDefaults::kind(ResourceKind::GcpVpc)
        .field_path("status.outputs.network_self_link"),
    subnetwork_self_links => FieldDefaults::kind(ResourceKind::GcpSubnetwork)
        .field_path("status.outputs.subnetwork_self_link"),
});
