use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Field, PlatformId};

/// The winning container selector plus informational probe data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContainerSelector {
    pub selector: String,
    pub count: usize,
    #[serde(default)]
    pub sample_html: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PlatformSelectors {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<ContainerSelector>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

/// A field's resolved value: a plain selector, or the container descriptor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum SelectorValue {
    Container(ContainerSelector),
    Plain(String),
}

impl SelectorValue {
    pub fn selector(&self) -> &str {
        match self {
            SelectorValue::Container(container) => &container.selector,
            SelectorValue::Plain(selector) => selector,
        }
    }
}

impl PlatformSelectors {
    pub fn get(&self, field: Field) -> Option<SelectorValue> {
        match field {
            Field::Container => self.container.clone().map(SelectorValue::Container),
            Field::Title => self.title.clone().map(SelectorValue::Plain),
            Field::Price => self.price.clone().map(SelectorValue::Plain),
            Field::Description => self.description.clone().map(SelectorValue::Plain),
            Field::Image => self.image.clone().map(SelectorValue::Plain),
            Field::Link => self.link.clone().map(SelectorValue::Plain),
        }
    }

    /// Plain selector for a non-container field.
    pub fn plain(&self, field: Field) -> Option<&str> {
        match field {
            Field::Container => None,
            Field::Title => self.title.as_deref(),
            Field::Price => self.price.as_deref(),
            Field::Description => self.description.as_deref(),
            Field::Image => self.image.as_deref(),
            Field::Link => self.link.as_deref(),
        }
    }

    pub fn set_plain(&mut self, field: Field, selector: String) {
        match field {
            Field::Container => {}
            Field::Title => self.title = Some(selector),
            Field::Price => self.price = Some(selector),
            Field::Description => self.description = Some(selector),
            Field::Image => self.image = Some(selector),
            Field::Link => self.link = Some(selector),
        }
    }

    pub fn container_selector(&self) -> Option<&str> {
        self.container.as_ref().map(|c| c.selector.as_str())
    }

    pub fn is_empty(&self) -> bool {
        Field::ALL.iter().all(|field| self.get(*field).is_none())
    }
}

/// One platform's inspection output as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlatformInspection {
    pub platform: String,
    pub url: String,
    pub inspected_at: DateTime<Utc>,
    pub selectors: PlatformSelectors,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteConfig {
    pub inspected_at: DateTime<Utc>,
    pub platforms: BTreeMap<PlatformId, PlatformInspection>,
}

impl SiteConfig {
    pub fn new(platforms: BTreeMap<PlatformId, PlatformInspection>) -> Self {
        Self {
            inspected_at: Utc::now(),
            platforms,
        }
    }

    pub fn platform(&self, id: PlatformId) -> Option<&PlatformInspection> {
        self.platforms.get(&id)
    }

    pub fn selectors(&self, id: PlatformId) -> Option<&PlatformSelectors> {
        self.platform(id).map(|p| &p.selectors)
    }
}
