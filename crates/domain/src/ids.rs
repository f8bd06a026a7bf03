use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;

macro_rules! define_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Build an ID, rejecting empty or whitespace-only strings.
            pub fn new(value: impl Into<String>) -> Result<Self, DomainError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err(DomainError::invalid_id(format!(
                        "{} cannot be empty",
                        stringify!($name)
                    )));
                }
                Ok(Self(value))
            }

            /// Build an ID from a value already known to be non-blank.
            pub(crate) fn from_trusted(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl PartialEq<str> for $name {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $name {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

// World-template identifiers are author-chosen strings like "char-001"
define_id!(CardId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_id_rejects_blank() {
        assert!(CardId::new("  ").is_err());
        assert_eq!(CardId::new("char-001").unwrap(), "char-001");
    }

    #[test]
    fn card_id_is_transparent_in_json() {
        let id: CardId = serde_json::from_str("\"setting-oort\"").unwrap();
        assert_eq!(id.as_str(), "setting-oort");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"setting-oort\"");
    }
}
