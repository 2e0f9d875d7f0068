use thiserror::Error;

/// Which registry index a key collision was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyIndex {
    Name,
    Alias,
}

impl std::fmt::Display for KeyIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name => f.write_str("name"),
            Self::Alias => f.write_str("alias"),
        }
    }
}

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("duplicate {index} key {key:?}: claimed by district {first} and {second}")]
    DuplicateKey {
        index: KeyIndex,
        key: String,
        first: String,
        second: String,
    },

    #[error("duplicate district id {0}")]
    DuplicateId(String),

    #[error("district {id}: {field} {raw:?} normalises to an empty key")]
    EmptyKey {
        id: String,
        field: KeyIndex,
        raw: String,
    },

    #[error("district record with empty id (name {0:?})")]
    EmptyId(String),
}

#[derive(Debug, Error)]
#[error("invalid resolver config: {0}")]
pub struct ConfigError(pub String);
