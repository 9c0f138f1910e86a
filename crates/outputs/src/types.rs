//! Data types for the outputs crate

use chrono::{DateTime, Utc};
use foreignkey::ResourceId;
use serde::{Deserialize, Serialize};

/// One stored output document, as listed by a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredOutput {
    /// Identity of the resource that published the document
    pub id: ResourceId,
    /// When the document was last written
    pub updated_at: DateTime<Utc>,
    /// Size of the serialized document in bytes
    pub size: u64,
}

/// Validate an env or name used as a storage key
pub(crate) fn check_name(what: &'static str, value: &str) -> crate::Result<()> {
    if value.is_empty() || value.contains(['/', '\\']) || value.contains("..") {
        return Err(crate::Error::InvalidName {
            what,
            value: value.to_string(),
        });
    }
    Ok(())
}

/// Validate every storage key of `id`
pub(crate) fn check_id(id: &ResourceId) -> crate::Result<()> {
    check_name("env", &id.env)?;
    check_name("name", &id.name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use foreignkey::ResourceKind;

    #[test]
    fn test_check_name() {
        assert!(check_name("name", "eks-role").is_ok());
        assert!(check_name("name", "v1.2").is_ok());
        for bad in ["", "a/b", "a\\b", "..", "x..y"] {
            assert!(check_name("name", bad).is_err(), "value: {bad}");
        }
    }

    #[test]
    fn test_check_id() {
        assert!(check_id(&ResourceId::new(ResourceKind::AwsVpc, "prod", "main")).is_ok());
        let err = check_id(&ResourceId::new(ResourceKind::AwsVpc, "", "main")).unwrap_err();
        assert!(err.to_string().starts_with("invalid env ''"));
    }
}
