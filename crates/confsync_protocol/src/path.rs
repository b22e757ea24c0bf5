//! Configuration paths.
//!
//! A path identifies one configuration entry. Two shapes are accepted:
//!
//! - `datadog/<org_id>/<product>/<config_id>/<name>`
//! - `employee/<product>/<config_id>/<name>`
//!
//! Every segment must be non-empty and `org_id` must be all ASCII digits.
//! The org id is kept as written so a parsed path prints back unchanged.

use crate::error::{ParseError, ParseResult};
use std::fmt;
use std::str::FromStr;

/// Origin of a configuration path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PathSource {
    /// Configuration scoped to an organization.
    Datadog {
        /// Organization ID, digits as written.
        org_id: String,
    },
    /// Configuration pushed by an employee.
    Employee,
}

/// A parsed configuration path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Path {
    source: PathSource,
    product: String,
    config_id: String,
    name: String,
}

impl Path {
    /// Creates a path from its structured fields.
    pub fn new(
        source: PathSource,
        product: impl Into<String>,
        config_id: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            source,
            product: product.into(),
            config_id: config_id.into(),
            name: name.into(),
        }
    }

    /// Parses a raw path string.
    pub fn parse(raw: &str) -> ParseResult<Self> {
        let invalid = || ParseError::invalid_path(raw);

        let segments: Vec<&str> = raw.split('/').collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(invalid());
        }

        let (source, rest) = match segments.as_slice() {
            ["datadog", org_id, rest @ ..] => {
                if !org_id.bytes().all(|b| b.is_ascii_digit()) {
                    return Err(invalid());
                }
                let org_id = org_id.to_string();
                (PathSource::Datadog { org_id }, rest)
            }
            ["employee", rest @ ..] => (PathSource::Employee, rest),
            _ => return Err(invalid()),
        };

        match rest {
            [product, config_id, name] => Ok(Self::new(source, *product, *config_id, *name)),
            _ => Err(invalid()),
        }
    }

    /// Returns the path source.
    #[must_use]
    pub fn source(&self) -> &PathSource {
        &self.source
    }

    /// Returns the product this configuration belongs to.
    #[must_use]
    pub fn product(&self) -> &str {
        &self.product
    }

    /// Returns the configuration ID.
    #[must_use]
    pub fn config_id(&self) -> &str {
        &self.config_id
    }

    /// Returns the file name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            PathSource::Datadog { org_id } => write!(
                f,
                "datadog/{}/{}/{}/{}",
                org_id, self.product, self.config_id, self.name
            ),
            PathSource::Employee => write!(
                f,
                "employee/{}/{}/{}",
                self.product, self.config_id, self.name
            ),
        }
    }
}

impl FromStr for Path {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parse_datadog_path() {
        let path = Path::parse("datadog/2/ASM_FEATURES/asm_features_activation/config").unwrap();
        assert_eq!(
            path.source(),
            &PathSource::Datadog {
                org_id: "2".into()
            }
        );
        assert_eq!(path.product(), "ASM_FEATURES");
        assert_eq!(path.config_id(), "asm_features_activation");
        assert_eq!(path.name(), "config");
    }

    #[test]
    fn parse_employee_path() {
        let path = Path::parse("employee/ASM_DD/blocked_ips/config").unwrap();
        assert_eq!(path.source(), &PathSource::Employee);
        assert_eq!(path.product(), "ASM_DD");
        assert_eq!(path.to_string(), "employee/ASM_DD/blocked_ips/config");
    }

    #[test]
    fn rejects_malformed_paths() {
        for raw in [
            "",
            "p1",
            "datadog/2/ASM/config",
            "datadog/x/ASM/id/config",
            "datadog/2/ASM/id/config/extra",
            "datadog/2//id/config",
            "employee/ASM/id",
            "employee/ASM/id/",
            "other/ASM/id/config",
        ] {
            let err = Path::parse(raw).unwrap_err();
            assert_eq!(err, ParseError::invalid_path(raw), "accepted {raw:?}");
        }
    }

    #[test]
    fn equality_is_structural() {
        let a = Path::parse("datadog/2/ASM/id/config").unwrap();
        let b = Path::new(
            PathSource::Datadog {
                org_id: "2".into(),
            },
            "ASM",
            "id",
            "config",
        );
        assert_eq!(a, b);
        assert_ne!(a, Path::parse("datadog/3/ASM/id/config").unwrap());
    }

    #[test]
    fn org_id_is_kept_as_written() {
        let raw = "datadog/02/ASM_DD/a/config";
        let path = Path::parse(raw).unwrap();
        assert_eq!(path.to_string(), raw);
        assert_ne!(path, Path::parse("datadog/2/ASM_DD/a/config").unwrap());

        let long = "datadog/123456789012345678901234/ASM_DD/a/config";
        assert_eq!(Path::parse(long).unwrap().to_string(), long);
    }

    proptest! {
        #[test]
        fn display_parses_back(
            org in "[0-9]{1,24}",
            product in "[A-Z_]{1,16}",
            id in "[a-z0-9_-]{1,24}",
            name in "[a-z]{1,12}",
        ) {
            let path = Path::new(PathSource::Datadog { org_id: org }, product, id, name);
            prop_assert_eq!(Path::parse(&path.to_string()).unwrap(), path);
        }
    }
}
