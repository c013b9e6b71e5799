use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::naming::claim_unique_name;

/// How a site groups its pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitKind {
    Chapter,
    /// Implicit single unit of a site without chapters.
    Flat,
}

/// One image of a work unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// 1-based, drives the output file name.
    pub index: u32,
    /// Navigation URL the page was listed under.
    pub page_url: String,
    /// Final image URL once known.
    pub image_url: Option<String>,
}

impl Page {
    pub fn resolved(index: u32, page_url: impl Into<String>, image_url: impl Into<String>) -> Self {
        Self {
            index,
            page_url: page_url.into(),
            image_url: Some(image_url.into()),
        }
    }

    pub fn unresolved(index: u32, page_url: impl Into<String>) -> Self {
        Self {
            index,
            page_url: page_url.into(),
            image_url: None,
        }
    }

    pub fn is_resolved(&self) -> bool {
        self.image_url.is_some()
    }
}

/// A chapter, or the single implicit unit of a flat source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkUnit {
    pub kind: UnitKind,
    /// 1-based position, oldest chapter first.
    pub index: u32,
    pub name: String,
    pub url: String,
    pub pages: Vec<Page>,
}

impl WorkUnit {
    pub fn chapter(index: u32, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: UnitKind::Chapter,
            index,
            name: name.into(),
            url: url.into(),
            pages: Vec::new(),
        }
    }

    pub fn flat(url: impl Into<String>, pages: Vec<Page>) -> Self {
        Self {
            kind: UnitKind::Flat,
            index: 1,
            name: FLAT_UNIT_NAME.to_string(),
            url: url.into(),
            pages,
        }
    }

    pub fn has_pages(&self) -> bool {
        !self.pages.is_empty()
    }
}

const FLAT_UNIT_NAME: &str = "pages";

/// Position of a page inside the source forest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PageId {
    pub source: usize,
    pub unit: usize,
    pub page: usize,
}

/// One manga title rooted at one input URL. Owns its units and pages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub url: String,
    pub title: String,
    pub units: Vec<WorkUnit>,
}

impl Source {
    pub fn new(url: impl Into<String>, title: impl Into<String>, units: Vec<WorkUnit>) -> Self {
        let mut source = Self {
            url: url.into(),
            title: title.into(),
            units,
        };
        source.normalize_units();
        source
    }

    /// A source without chapter grouping: every page lives in one flat unit.
    pub fn flat(url: impl Into<String>, title: impl Into<String>, pages: Vec<Page>) -> Self {
        let url = url.into();
        let unit = WorkUnit::flat(url.clone(), pages);
        Self::new(url, title, vec![unit])
    }

    pub fn page(&self, unit: usize, page: usize) -> Option<&Page> {
        self.units.get(unit).and_then(|u| u.pages.get(page))
    }

    pub fn page_count(&self) -> usize {
        self.units.iter().map(|u| u.pages.len()).sum()
    }

    pub fn unit_by_url(&self, url: &str) -> Option<&WorkUnit> {
        self.units.iter().find(|u| u.url == url)
    }

    /// Iterates `(unit position, page position, unit, page)` in declared order.
    pub fn pages(&self) -> impl Iterator<Item = (usize, usize, &WorkUnit, &Page)> {
        self.units.iter().enumerate().flat_map(|(ui, unit)| {
            unit.pages
                .iter()
                .enumerate()
                .map(move |(pi, page)| (ui, pi, unit, page))
        })
    }

    /// Appends units known from an earlier run that the fresh listing no longer shows.
    pub fn retain_missing_units(&mut self, earlier: &Source) {
        let missing: Vec<WorkUnit> = earlier
            .units
            .iter()
            .filter(|old| self.unit_by_url(&old.url).is_none())
            .cloned()
            .collect();
        if missing.is_empty() {
            return;
        }
        self.units.extend(missing);
        self.normalize_units();
    }

    /// Renumbers units 1..=n in their current order and makes names unique
    /// as directory names, see [`claim_unique_name`].
    pub fn normalize_units(&mut self) {
        let mut taken = HashSet::new();
        for (pos, unit) in self.units.iter_mut().enumerate() {
            unit.index = pos as u32 + 1;
            let name = unit.name.trim();
            let base = if name.is_empty() {
                format!("chapter{:04}", unit.index)
            } else {
                name.to_string()
            };
            unit.name = claim_unique_name(&mut taken, &base);
        }
    }
}

/// Title to use when a landing page carries none: last path segment, else host.
pub fn placeholder_title(url: &str) -> String {
    let Ok(parsed) = Url::parse(url) else {
        return "untitled".to_string();
    };
    let segment = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(|s| s.replace(['-', '_'], " "));
    match segment {
        Some(s) if !s.trim().is_empty() => s.trim().to_string(),
        _ => parsed
            .host_str()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| "untitled".to_string()),
    }
}
