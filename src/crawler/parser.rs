//! HTML parser for extracting links and robots directives
//!
//! This module handles parsing fetched documents to extract:
//! - Links to follow (`a`, `link` and `area` hrefs, `frame` and `iframe` srcs)
//! - The `<base href>` override
//! - `<meta name="robots">` follow/index directives
//! - The detected text encoding

use crate::crawler::charset;
use crate::{CrawlError, Result};

use scraper::{Html, Selector};
use std::collections::HashSet;

/// Everything a worker needs from a fetched document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    /// Raw `<base href>` value, if the document declares one
    pub base: Option<String>,

    /// Raw link strings in document order, without duplicates
    pub links: Vec<String>,

    /// False if the robots meta tag says `nofollow`
    pub follow: bool,

    /// False if the robots meta tag says `noindex`
    pub index: bool,

    /// Name of the encoding the document was decoded with
    pub encoding: String,
}

/// Extracts links and metadata from raw document bytes
pub trait Extractor: Send + Sync {
    /// # Arguments
    ///
    /// * `body` - The raw bytes as fetched
    /// * `hints` - Encoding labels from the transport, most trusted first
    fn extract(&self, body: &[u8], hints: &[String]) -> Result<Extracted>;
}

/// Extractor built on `scraper`
pub struct HtmlExtractor {
    links: Selector,
    base: Selector,
    meta: Selector,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self {
            links: selector("a[href], link[href], area[href], frame[src], iframe[src]")?,
            base: selector("base[href]")?,
            meta: selector("meta[name][content]")?,
        })
    }
}

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| CrawlError::Extraction {
        message: format!("invalid selector {css}: {e}"),
    })
}

impl Extractor for HtmlExtractor {
    fn extract(&self, body: &[u8], hints: &[String]) -> Result<Extracted> {
        let decoded = charset::detect(body, hints);
        let document = Html::parse_document(&decoded.text);

        let mut seen = HashSet::new();
        let mut links = Vec::new();
        for element in document.select(&self.links) {
            let attr = match element.value().name() {
                "frame" | "iframe" => "src",
                _ => "href",
            };
            let Some(link) = element.value().attr(attr).map(str::trim) else {
                continue;
            };
            if !link.is_empty() && seen.insert(link.to_string()) {
                links.push(link.to_string());
            }
        }

        let base = document
            .select(&self.base)
            .filter_map(|element| element.value().attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty())
            .map(str::to_string);

        let mut follow = true;
        let mut index = true;
        for element in document.select(&self.meta) {
            let is_robots = element
                .value()
                .attr("name")
                .is_some_and(|name| name.trim().eq_ignore_ascii_case("robots"));
            if !is_robots {
                continue;
            }
            let content = element
                .value()
                .attr("content")
                .unwrap_or_default()
                .to_ascii_lowercase();
            for directive in content.split(',').map(str::trim) {
                match directive {
                    "nofollow" => follow = false,
                    "noindex" => index = false,
                    "none" => {
                        follow = false;
                        index = false;
                    }
                    _ => {}
                }
            }
        }

        Ok(Extracted {
            base,
            links,
            follow,
            index,
            encoding: decoded.charset.name().to_string(),
        })
    }
}
