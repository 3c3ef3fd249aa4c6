//! Identifiers assigned by the remote store

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The remote store may send its identifiers either as JSON numbers or as JSON strings
#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Number(u64),
    Text(String),
}

/// Defines an identifier newtype, that is never empty once it has been built
macro_rules! remote_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name {
            content: String,
        }

        impl $name {
            /// Returns `None` in case `raw` is empty (or only made of whitespaces)
            pub fn new<S: ToString>(raw: S) -> Option<Self> {
                let content = raw.to_string().trim().to_string();
                if content.is_empty() {
                    None
                } else {
                    Some(Self { content })
                }
            }

            pub fn as_str(&self) -> &str {
                &self.content
            }
        }

        impl From<u64> for $name {
            fn from(n: u64) -> Self {
                Self { content: n.to_string() }
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> Result<(), std::fmt::Error> {
                write!(f, "{}", self.content)
            }
        }

        /// Used to support serde
        impl Serialize for $name {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: Serializer,
            {
                serializer.serialize_str(&self.content)
            }
        }

        /// Used to support serde
        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D>(deserializer: D) -> Result<$name, D::Error>
            where
                D: Deserializer<'de>,
            {
                match RawId::deserialize(deserializer)? {
                    RawId::Number(n) => Ok(Self::from(n)),
                    RawId::Text(s) => Self::new(&s)
                        .ok_or_else(|| serde::de::Error::custom(concat!("empty ", stringify!($name)))),
                }
            }
        }
    }
}

remote_id!(
    /// Identifier of a reservation, assigned by the remote store on creation
    ReservationId
);
remote_id!(
    /// Identifier of a task
    TaskId
);
remote_id!(
    /// Identifier of an attendance record
    AttendanceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_ids_are_refused() {
        assert!(ReservationId::new("").is_none());
        assert!(ReservationId::new("   ").is_none());
        assert_eq!(ReservationId::new(" 12 ").unwrap().as_str(), "12");
    }

    #[test]
    fn ids_accept_numbers_and_strings() {
        let from_number: ReservationId = serde_json::from_str("42").unwrap();
        let from_text: ReservationId = serde_json::from_str("\"42\"").unwrap();
        assert_eq!(from_number, from_text);
        assert_eq!(serde_json::to_string(&from_number).unwrap(), "\"42\"");

        assert!(serde_json::from_str::<TaskId>("\"\"").is_err());
        assert!(serde_json::from_str::<TaskId>("null").is_err());
    }
}
