use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::dom::{
    first_match, non_empty_attribute, non_empty_text, DomDocument, DomElement, DomErrorKind, DomProvider,
};
use crate::models::{ContainerSelector, PlatformInspection, PlatformSelectors};
use crate::platforms::{FieldProbe, PlatformSpec, SelectorCandidate};
use crate::utils::error::{AppError, Result};

/// Outcome of evaluating one container candidate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeResult {
    pub selector: String,
    pub match_count: usize,
    pub sample_markup: Option<String>,
    pub matched: bool,
    pub error: Option<DomErrorKind>,
}

/// Everything learned about one platform from a single document.
#[derive(Debug, Clone)]
pub struct PlatformProbe {
    pub selectors: PlatformSelectors,
    pub containers: Vec<ProbeResult>,
}

pub struct SelectorProbe {
    sample_markup_limit: usize,
}

impl SelectorProbe {
    pub fn new(sample_markup_limit: usize) -> Self {
        Self { sample_markup_limit }
    }

    /// Opens the platform page and probes it. Only a failure to load the
    /// page is an error; individual selector failures are probe misses.
    pub fn probe(&self, spec: &PlatformSpec, dom: &dyn DomProvider) -> Result<PlatformInspection> {
        tracing::info!("Inspecting {} at {}", spec.name, spec.url);

        let document = dom
            .open(spec.url)
            .map_err(|e| AppError::inspection(spec.id.as_str(), e))?;
        let probe = self.probe_document(spec, document.as_ref());
        drop(document);

        match probe.selectors.container_selector() {
            Some(container) => tracing::info!("{}: best container '{}'", spec.name, container),
            None => tracing::warn!("{}: no container candidate matched", spec.name),
        }

        Ok(PlatformInspection {
            platform: spec.name.to_string(),
            url: spec.url.to_string(),
            inspected_at: Utc::now(),
            selectors: probe.selectors,
        })
    }

    pub fn probe_document(&self, spec: &PlatformSpec, document: &dyn DomDocument) -> PlatformProbe {
        let containers = self.evaluate_containers(document, &spec.containers);
        let mut selectors = PlatformSelectors::default();

        let Some(best) = select_container(&containers) else {
            return PlatformProbe { selectors, containers };
        };
        let winner = &containers[best];

        selectors.container = Some(ContainerSelector {
            selector: winner.selector.clone(),
            count: winner.match_count,
            sample_html: winner.sample_markup.clone().unwrap_or_default(),
        });

        match document.find(&winner.selector) {
            Ok(elements) => {
                let sampled: Vec<_> = elements.into_iter().take(spec.sample_size).collect();
                for field_probe in &spec.fields {
                    if let Some(selector) = resolve_field(&sampled, field_probe) {
                        selectors.set_plain(field_probe.field, selector);
                    }
                }
            }
            Err(e) => {
                tracing::warn!("{}: re-querying container '{}' failed: {}", spec.name, winner.selector, e);
            }
        }

        PlatformProbe { selectors, containers }
    }

    /// Counts matches for every candidate in declared order. A markup sample
    /// is captured each time a candidate becomes the best so far.
    pub fn evaluate_containers(&self, document: &dyn DomDocument, candidates: &[SelectorCandidate]) -> Vec<ProbeResult> {
        let mut best_count = 0;
        let mut results = Vec::with_capacity(candidates.len());

        for candidate in candidates {
            let result = match document.find(&candidate.selector) {
                Ok(elements) => {
                    let count = elements.len();
                    let sample_markup = if count > best_count {
                        best_count = count;
                        elements[0]
                            .outer_html()
                            .ok()
                            .map(|html| truncate_markup(&html, self.sample_markup_limit))
                    } else {
                        None
                    };
                    ProbeResult {
                        selector: candidate.selector.clone(),
                        match_count: count,
                        sample_markup,
                        matched: count > 0,
                        error: None,
                    }
                }
                Err(e) => {
                    tracing::debug!("'{}': error - {}", candidate.selector, e);
                    ProbeResult {
                        selector: candidate.selector.clone(),
                        match_count: 0,
                        sample_markup: None,
                        matched: false,
                        error: Some(e.kind),
                    }
                }
            };

            tracing::debug!("'{}': {} elements", result.selector, result.match_count);
            results.push(result);
        }

        results
    }
}

/// Index of the first candidate with the strictly greatest non-zero count.
pub fn select_container(results: &[ProbeResult]) -> Option<usize> {
    let mut best: Option<(usize, usize)> = None;
    for (index, result) in results.iter().enumerate() {
        if result.match_count == 0 {
            continue;
        }
        match best {
            Some((_, count)) if result.match_count <= count => {}
            _ => best = Some((index, result.match_count)),
        }
    }
    best.map(|(index, _)| index)
}

/// First candidate, in declared order, that yields text or a relevant
/// attribute inside at least one sampled container.
fn resolve_field(containers: &[Box<dyn DomElement + '_>], field_probe: &FieldProbe) -> Option<String> {
    for candidate in &field_probe.candidates {
        let found = containers
            .iter()
            .filter(|container| yields_value(container.as_ref(), &candidate.selector, &field_probe.attributes))
            .count();

        tracing::debug!(
            "{} '{}': found in {}/{} containers",
            field_probe.field,
            candidate.selector,
            found,
            containers.len()
        );

        if found > 0 {
            return Some(candidate.selector.clone());
        }
    }

    tracing::debug!("{}: no candidate matched", field_probe.field);
    None
}

fn yields_value(container: &dyn DomElement, selector: &str, attributes: &[&str]) -> bool {
    let Some(element) = first_match(container, selector) else {
        return false;
    };
    non_empty_text(element.as_ref()).is_some()
        || attributes
            .iter()
            .any(|name| non_empty_attribute(element.as_ref(), name).is_some())
}

fn truncate_markup(html: &str, limit: usize) -> String {
    html.chars().take(limit).collect()
}
