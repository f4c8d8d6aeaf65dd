use serde::{Deserialize, Serialize};
use std::fmt;

pub mod config_diff;
pub mod log_entry;
pub mod site_config;

// Re-exports for convenience
pub use config_diff::*;
pub use log_entry::*;
pub use site_config::*;

/// Monitored platforms. The set is closed: a stored configuration naming
/// any other platform fails to deserialize.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlatformId {
    #[serde(rename = "amazon")]
    Amazon,
    #[serde(rename = "productHunt")]
    ProductHunt,
}

impl PlatformId {
    pub const ALL: [PlatformId; 2] = [PlatformId::Amazon, PlatformId::ProductHunt];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlatformId::Amazon => "amazon",
            PlatformId::ProductHunt => "productHunt",
        }
    }
}

impl fmt::Display for PlatformId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracked selector fields, in the order they are reported.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Container,
    Title,
    Price,
    Description,
    Image,
    Link,
}

impl Field {
    pub const ALL: [Field; 6] = [
        Field::Container,
        Field::Title,
        Field::Price,
        Field::Description,
        Field::Image,
        Field::Link,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Container => "container",
            Field::Title => "title",
            Field::Price => "price",
            Field::Description => "description",
            Field::Image => "image",
            Field::Link => "link",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
