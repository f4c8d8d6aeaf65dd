use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::sync::RwLock;

use super::{DomDocument, DomElement, DomError, DomProvider, DomResult};

/// A parsed markup snapshot queried with the `scraper` crate.
pub struct HtmlDocument {
    document: Html,
}

pub struct HtmlElement<'a> {
    element: ElementRef<'a>,
}

impl HtmlDocument {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
        }
    }
}

fn parse_selector(selector: &str) -> DomResult<Selector> {
    Selector::parse(selector).map_err(|_| DomError::invalid_selector(selector))
}

impl DomDocument for HtmlDocument {
    fn find(&self, selector: &str) -> DomResult<Vec<Box<dyn DomElement + '_>>> {
        let css_selector = parse_selector(selector)?;
        Ok(self
            .document
            .select(&css_selector)
            .map(|element| Box::new(HtmlElement { element }) as Box<dyn DomElement + '_>)
            .collect())
    }
}

impl<'a> DomElement for HtmlElement<'a> {
    fn text(&self) -> DomResult<String> {
        Ok(self.element.text().collect::<Vec<_>>().join(" "))
    }

    fn attribute(&self, name: &str) -> DomResult<Option<String>> {
        Ok(self.element.value().attr(name).map(str::to_string))
    }

    fn outer_html(&self) -> DomResult<String> {
        Ok(self.element.html())
    }

    fn find(&self, selector: &str) -> DomResult<Vec<Box<dyn DomElement + '_>>> {
        let css_selector = parse_selector(selector)?;
        Ok(self
            .element
            .select(&css_selector)
            .map(|element| Box::new(HtmlElement { element }) as Box<dyn DomElement + '_>)
            .collect())
    }
}

/// Serves fixed markup per URL. Pages can be swapped between cycles,
/// which makes it the deterministic stand-in for a live browser.
#[derive(Default)]
pub struct StaticPages {
    pages: RwLock<HashMap<String, String>>,
}

impl StaticPages {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(self, url: &str, html: &str) -> Self {
        self.set_page(url, html);
        self
    }

    pub fn set_page(&self, url: &str, html: &str) {
        let mut pages = self.pages.write().unwrap_or_else(|e| e.into_inner());
        pages.insert(url.to_string(), html.to_string());
    }

    pub fn remove_page(&self, url: &str) {
        let mut pages = self.pages.write().unwrap_or_else(|e| e.into_inner());
        pages.remove(url);
    }
}

impl DomProvider for StaticPages {
    fn open(&self, url: &str) -> DomResult<Box<dyn DomDocument>> {
        let pages = self.pages.read().unwrap_or_else(|e| e.into_inner());
        let html = pages
            .get(url)
            .ok_or_else(|| DomError::navigation(format!("No page registered for {}", url)))?;
        Ok(Box::new(HtmlDocument::parse(html)))
    }
}
