//! Core types for cross-resource references

use crate::kind::ResourceKind;
use crate::scalar::Scalar;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A pointer to a field in another resource's published outputs
///
/// This is the schema-level form: `kind`, `env` and `field_path` may be
/// omitted and are then filled in from the referencing field's defaults and
/// the referencing resource's environment (see [`Reference::address`]).
/// Unknown members are rejected so a misspelled one cannot fall back to a
/// default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Reference {
    /// Kind of the referenced resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ResourceKind>,
    /// Environment the referenced resource was deployed to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env: Option<String>,
    /// Name of the referenced resource
    #[serde(default)]
    pub name: String,
    /// Dot-delimited path into the referenced resource's output document
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
}

impl Reference {
    /// Create a fully-specified reference
    pub fn new(
        kind: ResourceKind,
        env: impl Into<String>,
        name: impl Into<String>,
        field_path: impl Into<String>,
    ) -> Self {
        Self {
            kind: Some(kind),
            env: Some(env.into()),
            name: name.into(),
            field_path: Some(field_path.into()),
        }
    }

    /// Create a reference naming only the target resource
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            kind: None,
            env: None,
            name: name.into(),
            field_path: None,
        }
    }

    /// Fill in missing members and produce a complete address
    ///
    /// Precedence: explicit member, then field default, then (for `env`)
    /// the referencing resource's environment.
    pub fn address(
        &self,
        defaults: &FieldDefaults,
        default_env: Option<&str>,
    ) -> Result<Address, String> {
        if self.name.trim().is_empty() {
            return Err("name is required".to_string());
        }
        let kind = self
            .kind
            .or(defaults.kind)
            .ok_or_else(|| "kind is required (field declares no default kind)".to_string())?;
        let env = self
            .env
            .as_deref()
            .filter(|e| !e.is_empty())
            .or(default_env.filter(|e| !e.is_empty()))
            .ok_or_else(|| "env is required (no environment to inherit)".to_string())?;
        let field_path = self
            .field_path
            .as_deref()
            .filter(|p| !p.is_empty())
            .or(defaults.field_path)
            .ok_or_else(|| {
                "field_path is required (field declares no default field path)".to_string()
            })?;

        Ok(Address {
            kind,
            env: env.to_string(),
            name: self.name.clone(),
            field_path: field_path.to_string(),
        })
    }
}

/// Renders as an address, with `?` for members still missing
impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            Some(kind) => write!(f, "{kind}")?,
            None => f.write_str("?")?,
        }
        write!(
            f,
            "/{}/{}#{}",
            self.env.as_deref().unwrap_or("?"),
            self.name,
            self.field_path.as_deref().unwrap_or("?")
        )
    }
}

/// Per-field defaults for references that omit members
///
/// Mirrors the `default_kind` / `default_kind_field_path` options the
/// schema attaches to value-or-ref fields.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FieldDefaults {
    pub kind: Option<ResourceKind>,
    pub field_path: Option<&'static str>,
}

impl FieldDefaults {
    /// Defaults naming only a kind
    pub const fn kind(kind: ResourceKind) -> Self {
        Self {
            kind: Some(kind),
            field_path: None,
        }
    }

    /// Add a default field path
    pub const fn field_path(mut self, path: &'static str) -> Self {
        self.field_path = Some(path);
        self
    }
}

/// Identity of a deployed resource instance: `(Kind, Env, Name)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub env: String,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceKind, env: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            env: env.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.kind, self.env, self.name)
    }
}

/// A fully-populated reference: `(Kind, Env, Name, FieldPath)`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Address {
    pub kind: ResourceKind,
    pub env: String,
    pub name: String,
    pub field_path: String,
}

impl Address {
    /// The resource this address points into
    pub fn resource_id(&self) -> ResourceId {
        ResourceId::new(self.kind, self.env.clone(), self.name.clone())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}#{}",
            self.kind, self.env, self.name, self.field_path
        )
    }
}

/// A spec field that is either a literal or a reference to another
/// resource's output
///
/// Serialised like the schema's value-or-ref messages: exactly one of
/// `{"value": ...}` or `{"value_from": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ReferenceValue<T> {
    /// A directly usable value
    #[serde(rename = "value")]
    Literal(T),
    /// An unresolved pointer
    #[serde(rename = "value_from")]
    Ref(Reference),
}

impl<T> ReferenceValue<T> {
    /// The literal, if resolved
    pub fn literal(&self) -> Option<&T> {
        match self {
            Self::Literal(v) => Some(v),
            Self::Ref(_) => None,
        }
    }

    /// The reference, if unresolved
    pub fn reference(&self) -> Option<&Reference> {
        match self {
            Self::Literal(_) => None,
            Self::Ref(r) => Some(r),
        }
    }

    /// Check if this field still holds a reference
    pub fn is_ref(&self) -> bool {
        matches!(self, Self::Ref(_))
    }
}

impl<T: Default> ReferenceValue<T> {
    /// The literal value, or `T::default()` for an unresolved reference
    ///
    /// Provisioning adapters read fields this way once a spec has been
    /// resolved, at which point every field is a literal.
    pub fn value(&self) -> T
    where
        T: Clone,
    {
        self.literal().cloned().unwrap_or_default()
    }
}

impl<T: Default> Default for ReferenceValue<T> {
    fn default() -> Self {
        Self::Literal(T::default())
    }
}

impl<T> From<Reference> for ReferenceValue<T> {
    fn from(r: Reference) -> Self {
        Self::Ref(r)
    }
}

impl From<&str> for ReferenceValue<String> {
    fn from(s: &str) -> Self {
        Self::Literal(s.to_string())
    }
}

impl From<String> for ReferenceValue<String> {
    fn from(s: String) -> Self {
        Self::Literal(s)
    }
}

impl From<i32> for ReferenceValue<i32> {
    fn from(v: i32) -> Self {
        Self::Literal(v)
    }
}

impl From<bool> for ReferenceValue<bool> {
    fn from(v: bool) -> Self {
        Self::Literal(v)
    }
}

/// `StringValueOrRef` in the schema
pub type StringValueOrRef = ReferenceValue<String>;
/// `Int32ValueOrRef` in the schema
pub type Int32ValueOrRef = ReferenceValue<i32>;
/// `Int64ValueOrRef` in the schema
pub type Int64ValueOrRef = ReferenceValue<i64>;
/// `BoolValueOrRef` in the schema
pub type BoolValueOrRef = ReferenceValue<bool>;

/// Object-safe view of a `ReferenceValue<T>` for any scalar `T`
///
/// This is the handle the walker hands out: it exposes the reference and
/// lets the resolver replace it in place without knowing `T`.
pub trait RefField: Send {
    /// The reference, if this field is not yet a literal
    fn reference(&self) -> Option<&Reference>;

    /// Declared literal type, for error reports
    fn type_name(&self) -> &'static str;

    /// Replace the field with a literal converted from `value`
    fn assign(
        &mut self,
        value: &crate::scalar::ScalarValue,
    ) -> Result<(), crate::scalar::ConversionError>;
}

impl<T: Scalar> RefField for ReferenceValue<T> {
    fn reference(&self) -> Option<&Reference> {
        ReferenceValue::reference(self)
    }

    fn type_name(&self) -> &'static str {
        T::TYPE_NAME
    }

    fn assign(
        &mut self,
        value: &crate::scalar::ScalarValue,
    ) -> Result<(), crate::scalar::ConversionError> {
        *self = Self::Literal(T::from_scalar(value)?);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_or_ref_wire_form() {
        let literal: StringValueOrRef = serde_json::from_str(r#"{"value": "subnet-abc"}"#).unwrap();
        assert_eq!(literal, ReferenceValue::Literal("subnet-abc".to_string()));

        let reference: StringValueOrRef = serde_json::from_str(
            r#"{"value_from": {"kind": "AwsIamRole", "env": "prod", "name": "eks-role", "field_path": "status.outputs.arn"}}"#,
        )
        .unwrap();
        assert_eq!(
            reference,
            ReferenceValue::Ref(Reference::new(
                ResourceKind::AwsIamRole,
                "prod",
                "eks-role",
                "status.outputs.arn"
            ))
        );

        let port: Int32ValueOrRef = serde_json::from_str(r#"{"value": 8080}"#).unwrap();
        assert_eq!(port.literal(), Some(&8080));
    }

    #[test]
    fn test_both_variants_set_is_rejected() {
        let both = serde_json::from_str::<StringValueOrRef>(
            r#"{"value": "x", "value_from": {"name": "y"}}"#,
        );
        assert!(both.is_err());
    }

    #[test]
    fn test_misspelled_reference_member_is_rejected() {
        let err = serde_json::from_str::<StringValueOrRef>(
            r#"{"value_from": {"kind": "AwsVpc", "env": "prod", "name": "v", "feild_path": "status.outputs.wanted"}}"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("feild_path"), "{err}");
    }

    #[test]
    fn test_partial_reference_round_trip() {
        let r: StringValueOrRef =
            serde_json::from_str(r#"{"value_from": {"name": "my-postgres"}}"#).unwrap();
        assert_eq!(r.reference(), Some(&Reference::named("my-postgres")));
        assert_eq!(
            serde_json::to_string(&r).unwrap(),
            r#"{"value_from":{"name":"my-postgres"}}"#
        );
    }

    #[test]
    fn test_address_applies_defaults() {
        let defaults =
            FieldDefaults::kind(ResourceKind::GcpProject).field_path("status.outputs.project_id");
        let address = Reference::named("main-project")
            .address(&defaults, Some("prod"))
            .unwrap();
        assert_eq!(address.kind, ResourceKind::GcpProject);
        assert_eq!(address.env, "prod");
        assert_eq!(address.field_path, "status.outputs.project_id");
        assert_eq!(
            address.to_string(),
            "GcpProject/prod/main-project#status.outputs.project_id"
        );
    }

    #[test]
    fn test_address_explicit_members_win() {
        let defaults = FieldDefaults::kind(ResourceKind::GcpProject).field_path("a.b");
        let reference = Reference::new(ResourceKind::GcpVpc, "dev", "vpc", "status.outputs.x");
        let address = reference.address(&defaults, Some("prod")).unwrap();
        assert_eq!(address.kind, ResourceKind::GcpVpc);
        assert_eq!(address.env, "dev");
        assert_eq!(address.field_path, "status.outputs.x");
    }

    #[test]
    fn test_address_missing_members() {
        let none = FieldDefaults::default();
        assert_eq!(
            Reference::named("").address(&none, Some("prod")).unwrap_err(),
            "name is required"
        );
        assert!(Reference::named("x").address(&none, Some("prod")).unwrap_err().starts_with("kind"));

        let kind_only = FieldDefaults::kind(ResourceKind::AwsVpc);
        assert!(Reference::named("x").address(&kind_only, None).unwrap_err().starts_with("env"));
        assert!(
            Reference::named("x")
                .address(&kind_only, Some("prod"))
                .unwrap_err()
                .starts_with("field_path")
        );
    }

    #[test]
    fn test_ref_field_assign() {
        let mut field: Int32ValueOrRef = Reference::named("db").into();
        let handle: &mut dyn RefField = &mut field;
        assert_eq!(handle.type_name(), "int32");
        handle.assign(&"100".into()).unwrap();
        assert_eq!(field, ReferenceValue::Literal(100));
    }
}
