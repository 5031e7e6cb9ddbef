//! Generated names for registered models and endpoint configurations.
//!
//! Model names are `<prefix>-<YYYY-MM-DD-HH-MM-SS>-<8 hex>`; the random
//! suffix keeps two deploys within the same second from colliding.
//! Configuration names are `<environment>-<model name>`.

use crate::error::{CutoverError, CutoverResult};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Longest name the platform accepts for models, configurations and endpoints.
pub const MAX_NAME_LEN: usize = 63;

/// Checks `name` against platform naming rules.
pub fn validate_resource_name(name: &str) -> CutoverResult<()> {
    let invalid = |reason: &str| CutoverError::InvalidName { name: name.to_string(), reason: reason.to_string() };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(invalid(&format!("longer than {MAX_NAME_LEN} characters")));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(invalid("only ASCII letters, digits and '-' are allowed"));
    }
    if name.starts_with('-') || name.ends_with('-') {
        return Err(invalid("must not start or end with '-'"));
    }
    Ok(())
}

#[derive(Debug, Clone)]
pub struct ResourceNamer {
    prefix: String,
    environment: String,
}

impl ResourceNamer {
    #[must_use]
    pub fn new(prefix: impl Into<String>, environment: impl Into<String>) -> Self {
        Self { prefix: prefix.into(), environment: environment.into() }
    }

    /// A fresh model name stamped with the current time.
    pub fn model_name(&self) -> CutoverResult<String> {
        self.model_name_at(Utc::now())
    }

    pub fn model_name_at(&self, now: DateTime<Utc>) -> CutoverResult<String> {
        let suffix: String = Uuid::new_v4().simple().to_string().chars().take(8).collect();
        let name = format!("{}-{}-{suffix}", self.prefix, now.format("%Y-%m-%d-%H-%M-%S"));
        validate_resource_name(&name)?;
        Ok(name)
    }

    /// The configuration name paired with `model_name`.
    pub fn config_name(&self, model_name: &str) -> CutoverResult<String> {
        let name = format!("{}-{model_name}", self.environment);
        validate_resource_name(&name)?;
        Ok(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::HashSet;

    #[test]
    fn test_model_name_format() {
        let namer = ResourceNamer::new("search-ltr", "staging");
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        let name = namer.model_name_at(now).unwrap();

        assert!(name.starts_with("search-ltr-2024-03-09-14-05-07-"), "{name}");
        assert_eq!(name.len(), "search-ltr-2024-03-09-14-05-07-".len() + 8);
    }

    #[test]
    fn test_same_second_names_are_distinct() {
        let namer = ResourceNamer::new("search-ltr", "staging");
        let now = Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 7).unwrap();

        let names: HashSet<_> = (0..50).map(|_| namer.model_name_at(now).unwrap()).collect();
        assert_eq!(names.len(), 50);
    }

    #[test]
    fn test_config_name_prefixes_environment() {
        let namer = ResourceNamer::new("search-ltr", "integration");
        assert_eq!(namer.config_name("search-ltr-x").unwrap(), "integration-search-ltr-x");
    }

    #[test]
    fn test_overlong_config_name_is_rejected() {
        let namer = ResourceNamer::new("search-ltr", "a-very-long-environment-name-for-testing");
        let model = namer.model_name().unwrap();
        let err = namer.config_name(&model).unwrap_err();
        assert!(matches!(err, CutoverError::InvalidName { .. }));
    }

    #[test]
    fn test_validate_resource_name_rules() {
        assert!(validate_resource_name("staging-search-ltr-endpoint").is_ok());
        assert!(validate_resource_name("").is_err());
        assert!(validate_resource_name("has_underscore").is_err());
        assert!(validate_resource_name("-leading").is_err());
        assert!(validate_resource_name("trailing-").is_err());
        assert!(validate_resource_name(&"a".repeat(64)).is_err());
    }
}
