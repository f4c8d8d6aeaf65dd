use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::RefreshConfig;
use crate::dom::{first_match, non_empty_attribute, non_empty_text, DomElement, DomProvider};
use crate::models::{Field, PlatformId, PlatformInspection, SiteConfig};
use crate::store::write_json_atomic;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshReport {
    pub count: usize,
    pub success: bool,
}

/// Consumes a resolved selector configuration to fetch and store data.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DataRefresher: Send + Sync {
    async fn refresh(&self, config: &SiteConfig) -> Result<RefreshReport>;
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub rank: usize,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    pub platform: String,
    pub scraped_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductFeed {
    pub success: bool,
    pub count: usize,
    pub products: Vec<Product>,
    pub last_update: DateTime<Utc>,
}

/// Extracts products from every platform that has a container selector and
/// writes them to a JSON feed.
pub struct ProductRefresher {
    dom: Arc<dyn DomProvider>,
    output_path: PathBuf,
    config: RefreshConfig,
}

impl ProductRefresher {
    pub fn new(dom: Arc<dyn DomProvider>, output_path: impl Into<PathBuf>, config: RefreshConfig) -> Self {
        Self {
            dom,
            output_path: output_path.into(),
            config,
        }
    }

    /// Products from one platform page. The document is closed before returning.
    pub fn extract_platform(&self, id: PlatformId, inspection: &PlatformInspection) -> Result<Vec<Product>> {
        let Some(container_selector) = inspection.selectors.container_selector() else {
            return Ok(Vec::new());
        };

        let document = self
            .dom
            .open(&inspection.url)
            .map_err(|e| AppError::inspection(id.as_str(), e))?;
        let containers = document.find(container_selector).unwrap_or_default();
        tracing::info!("{}: found {} containers", inspection.platform, containers.len());

        let base_url = Url::parse(&inspection.url).ok();
        let mut products = Vec::new();

        for container in containers.iter().take(self.config.items_per_platform) {
            let rank = products.len() + 1;
            if let Some(product) = extract_product(container.as_ref(), inspection, base_url.as_ref(), rank) {
                tracing::debug!("#{}: {}", rank, product.title);
                products.push(product);
            }
        }

        Ok(products)
    }
}

#[async_trait]
impl DataRefresher for ProductRefresher {
    async fn refresh(&self, config: &SiteConfig) -> Result<RefreshReport> {
        let mut products = Vec::new();
        let mut attempted = 0;
        let mut failures = Vec::new();

        for (index, (id, inspection)) in config.platforms.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(Duration::from_millis(self.config.platform_delay_ms)).await;
            }
            if inspection.selectors.container.is_none() {
                tracing::warn!("{}: no container selector, skipping", inspection.platform);
                continue;
            }

            attempted += 1;
            match self.extract_platform(*id, inspection) {
                Ok(found) => {
                    tracing::info!("{}: scraped {} products", inspection.platform, found.len());
                    products.extend(found);
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    failures.push(e.to_string());
                }
            }
        }

        if attempted > 0 && failures.len() == attempted {
            return Err(AppError::Refresh(failures.join("; ")));
        }

        // An empty page must not wipe the last good feed
        if products.is_empty() {
            tracing::warn!("No products found, keeping {}", self.output_path.display());
            return Ok(RefreshReport {
                count: 0,
                success: false,
            });
        }

        let feed = ProductFeed {
            success: true,
            count: products.len(),
            products,
            last_update: Utc::now(),
        };
        write_json_atomic(&self.output_path, &feed)?;
        tracing::info!("Saved {} products to {}", feed.count, self.output_path.display());

        Ok(RefreshReport {
            count: feed.count,
            success: true,
        })
    }
}

fn extract_product(
    container: &dyn DomElement,
    inspection: &PlatformInspection,
    base_url: Option<&Url>,
    rank: usize,
) -> Option<Product> {
    let selectors = &inspection.selectors;
    let field_text = |field: Field| {
        selectors
            .plain(field)
            .and_then(|selector| first_match(container, selector))
            .and_then(|element| non_empty_text(element.as_ref()))
    };
    let field_attribute = |field: Field, attribute: &str| {
        selectors
            .plain(field)
            .and_then(|selector| first_match(container, selector))
            .and_then(|element| non_empty_attribute(element.as_ref(), attribute))
    };
    let any_attribute = |selector: &str, attribute: &str| {
        first_match(container, selector).and_then(|element| non_empty_attribute(element.as_ref(), attribute))
    };

    let title = field_text(Field::Title)
        .or_else(|| field_attribute(Field::Title, "alt"))
        .or_else(|| any_attribute("img", "alt"))
        .or_else(|| any_attribute("a", "aria-label"));

    let link = field_attribute(Field::Link, "href")
        .or_else(|| any_attribute("a", "href"))
        .map(|href| absolutize(&href, base_url));

    if title.is_none() && link.is_none() {
        return None;
    }

    let image = field_attribute(Field::Image, "src")
        .filter(|src| src.starts_with("http"))
        .or_else(|| any_attribute("img", "src").filter(|src| src.starts_with("http")));

    Some(Product {
        rank,
        title: title.unwrap_or_else(|| format!("{} Product #{}", inspection.platform, rank)),
        price: field_text(Field::Price),
        description: field_text(Field::Description),
        image,
        link,
        platform: inspection.platform.clone(),
        scraped_at: Utc::now(),
    })
}

fn absolutize(href: &str, base_url: Option<&Url>) -> String {
    base_url
        .and_then(|base| base.join(href).ok())
        .map(|url| url.to_string())
        .unwrap_or_else(|| href.to_string())
}
