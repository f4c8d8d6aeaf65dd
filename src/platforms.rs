//! Build-time catalog of monitored platforms and their ranked candidates.

use crate::models::{Field, PlatformId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorCandidate {
    pub selector: String,
    /// Position in the declared list; lower is tried first.
    pub priority: usize,
}

/// Ranked candidates for one non-container field.
#[derive(Debug, Clone)]
pub struct FieldProbe {
    pub field: Field,
    pub candidates: Vec<SelectorCandidate>,
    /// Attributes that count as a hit when the element text is empty.
    pub attributes: Vec<&'static str>,
}

#[derive(Debug, Clone)]
pub struct PlatformSpec {
    pub id: PlatformId,
    pub name: &'static str,
    pub url: &'static str,
    pub containers: Vec<SelectorCandidate>,
    pub fields: Vec<FieldProbe>,
    /// How many leading containers are sampled when resolving fields.
    pub sample_size: usize,
}

pub fn ranked(selectors: &[&str]) -> Vec<SelectorCandidate> {
    selectors
        .iter()
        .enumerate()
        .map(|(priority, selector)| SelectorCandidate {
            selector: selector.to_string(),
            priority,
        })
        .collect()
}

impl FieldProbe {
    pub fn new(field: Field, selectors: &[&str], attributes: &[&'static str]) -> Self {
        Self {
            field,
            candidates: ranked(selectors),
            attributes: attributes.to_vec(),
        }
    }
}

pub fn amazon() -> PlatformSpec {
    PlatformSpec {
        id: PlatformId::Amazon,
        name: "Amazon",
        url: "https://www.amazon.com/Best-Sellers/zgbs",
        containers: ranked(&[
            ".p13n-sc-uncoverable-faceout",
            "[data-asin]",
            ".zg-carousel-general-faceout",
            ".zg-grid-general-faceout",
            ".zg-item-immersion",
            "div[id][class*=\"p13n\"]",
        ]),
        fields: vec![
            FieldProbe::new(
                Field::Title,
                &[
                    "span.aok-inline-block",
                    ".p13n-sc-truncate",
                    "span[class*=\"truncate\"]",
                    "div[class*=\"title\"]",
                    // Sometimes the title only lives in the image alt
                    "img[alt]",
                ],
                &["alt"],
            ),
            FieldProbe::new(
                Field::Price,
                &[
                    ".a-price .a-offscreen",
                    ".p13n-sc-price",
                    "span[class*=\"price\"]",
                    ".a-price-whole",
                ],
                &[],
            ),
            FieldProbe::new(Field::Image, &["img"], &["src"]),
            FieldProbe::new(Field::Link, &["a.a-link-normal"], &["href"]),
        ],
        sample_size: 3,
    }
}

pub fn product_hunt() -> PlatformSpec {
    PlatformSpec {
        id: PlatformId::ProductHunt,
        name: "Product Hunt",
        url: "https://www.producthunt.com/",
        containers: ranked(&[
            "article",
            "div[data-test*=\"post\"]",
            "[class*=\"Post\"]",
            "div[class*=\"item\"]",
            "section article",
        ]),
        fields: vec![
            FieldProbe::new(
                Field::Title,
                &["h3", "h2", "h1", "a[href*=\"/posts/\"]", "[class*=\"title\"]"],
                &[],
            ),
            FieldProbe::new(
                Field::Description,
                &["p", "span[class*=\"tagline\"]", "div[class*=\"description\"]"],
                &[],
            ),
            FieldProbe::new(Field::Link, &["a"], &["href"]),
        ],
        sample_size: 5,
    }
}

/// All platforms in the fixed order they are probed and reported.
pub fn catalog() -> Vec<PlatformSpec> {
    PlatformId::ALL
        .iter()
        .map(|id| match id {
            PlatformId::Amazon => amazon(),
            PlatformId::ProductHunt => product_hunt(),
        })
        .collect()
}
