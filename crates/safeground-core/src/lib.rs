//! District resolution for evalNm free text: registry, normaliser, tiered resolver.

pub mod error;
pub mod model;
pub mod normalize;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod stats;

pub use error::{ConfigError, KeyIndex, RegistryError};
pub use model::{DistrictRecord, ResolutionResult, ResolvedRecord, Tier, UnmatchedReason};
pub use normalize::{NormalizedText, normalize};
pub use registry::Registry;
pub use resolver::{BatchOutcome, Resolution, Resolver, ResolverConfig, TierTrace};
pub use stats::{AcceptanceReport, DEFAULT_TARGET_RATE, ResolutionStats};
