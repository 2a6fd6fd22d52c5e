//! Closed sets persisted as integer ordinals.

use serde::{Deserialize, Serialize};

/// Outcome of profiling a single resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeStatus {
    Done,
    NotFound,
    AccessDenied,
    Error,
    Identified,
    NotIdentified,
}

/// What kind of file-system entity a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceType {
    File,
    Container,
    Folder,
}

/// How the identification results were obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdentificationMethod {
    Binary,
    Extension,
    Container,
    NullMethod,
}

macro_rules! ordinal_enum {
    ($ty:ident { $($variant:ident = $n:literal),+ $(,)? }) => {
        impl $ty {
            /// Stored integer ordinal.
            pub fn ordinal(self) -> i64 {
                match self {
                    $(Self::$variant => $n,)+
                }
            }

            /// Inverse of [`Self::ordinal`]; `None` for unknown values.
            pub fn from_ordinal(value: i64) -> Option<Self> {
                match value {
                    $($n => Some(Self::$variant),)+
                    _ => None,
                }
            }
        }
    };
}

ordinal_enum!(NodeStatus {
    Done = 0,
    NotFound = 1,
    AccessDenied = 2,
    Error = 3,
    Identified = 4,
    NotIdentified = 5,
});

ordinal_enum!(ResourceType {
    File = 0,
    Container = 1,
    Folder = 2,
});

ordinal_enum!(IdentificationMethod {
    Binary = 0,
    Extension = 1,
    Container = 2,
    NullMethod = 3,
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_round_trip() {
        for status in [
            NodeStatus::Done,
            NodeStatus::NotFound,
            NodeStatus::AccessDenied,
            NodeStatus::Error,
            NodeStatus::Identified,
            NodeStatus::NotIdentified,
        ] {
            assert_eq!(NodeStatus::from_ordinal(status.ordinal()), Some(status));
        }
        assert_eq!(ResourceType::from_ordinal(2), Some(ResourceType::Folder));
        assert_eq!(IdentificationMethod::from_ordinal(9), None);
    }
}
