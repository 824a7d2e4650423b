// src/extractors/heading.rs

// --- Imports ---
use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::pdf::PageSource;
use crate::utils::error::ExtractError;

// --- Constants ---
/// Organizational prefixes that open a ministry/agency section in the announcement.
pub const DEFAULT_HEADING_PREFIXES: &[&str] = &[
    "MINISTERIO", "AGENCIA", "JEFATURA", "ORGANISMO", "CONFEDERACION",
    "INSTITUTO", "FONDO", "MUTUALIDAD", "TESORERIA", "CONSEJO",
    "BIBLIOTECA", "CENTRO", "ENTIDAD", "GERENCIA", "MUSEO",
    "OFICINA", "S.GRAL", "COMISION", "MANCOMUNIDAD",
];

// Compiled once; the default prefix list is known to be valid.
static DEFAULT_HEADING_RE: Lazy<Regex> = Lazy::new(|| {
    build_prefix_regex(DEFAULT_HEADING_PREFIXES).expect("Failed to compile DEFAULT_HEADING_RE")
});

// --- Data Structures ---
/// Heading found on each page, keyed by 1-based page number.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HeadingMap {
    headings: BTreeMap<u32, String>,
}

impl HeadingMap {
    pub fn insert(&mut self, page: u32, heading: String) {
        self.headings.insert(page, heading);
    }

    pub fn get(&self, page: u32) -> Option<&str> {
        self.headings.get(&page).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.headings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headings.is_empty()
    }
}

/// Finds the ministry/agency heading of each page.
pub struct HeadingLocator {
    pattern: Regex,
}

impl HeadingLocator {
    /// Locator for the built-in prefix list.
    pub fn new() -> Self {
        Self { pattern: DEFAULT_HEADING_RE.clone() }
    }

    /// Locator for a custom prefix list. Prefixes are matched literally at the start of a line.
    pub fn with_prefixes<S: AsRef<str>>(prefixes: &[S]) -> Result<Self, ExtractError> {
        Ok(Self { pattern: build_prefix_regex(prefixes)? })
    }

    /// Returns the first line starting with a known prefix, trimmed.
    pub fn locate(&self, page_text: &str) -> Option<String> {
        page_text
            .lines()
            .find(|line| self.pattern.is_match(line))
            .map(|line| line.trim().to_string())
    }

    /// Scans every page of `source` once, before any table extraction.
    pub fn scan<S: PageSource + ?Sized>(&self, source: &S) -> Result<HeadingMap, ExtractError> {
        let mut map = HeadingMap::default();
        for page in 1..=source.page_count() {
            let text = source.page_text(page)?;
            match self.locate(&text) {
                Some(heading) => {
                    tracing::debug!("Page {}: heading '{}'", page, heading);
                    map.insert(page, heading);
                }
                None => tracing::trace!("Page {}: no heading line", page),
            }
        }
        tracing::info!("Found headings on {} of {} pages", map.len(), source.page_count());
        Ok(map)
    }
}

impl Default for HeadingLocator {
    fn default() -> Self {
        Self::new()
    }
}

fn build_prefix_regex<S: AsRef<str>>(prefixes: &[S]) -> Result<Regex, ExtractError> {
    let alternatives: Vec<String> = prefixes
        .iter()
        .map(|p| p.as_ref())
        .filter(|p| !p.is_empty())
        .map(regex::escape)
        .collect();
    if alternatives.is_empty() {
        return Err(ExtractError::InvalidPrefixes("at least one non-empty prefix is required".to_string()));
    }
    let pattern = format!("^(?:{})", alternatives.join("|"));
    Regex::new(&pattern).map_err(|e| ExtractError::RegexError(e.to_string()))
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::{MemorySource, PageLayout};

    #[test]
    fn test_first_matching_line_wins_and_is_trimmed() {
        let locator = HeadingLocator::new();
        let text = "Anexo I\nMINISTERIO DE HACIENDA   \nAGENCIA ESTATAL\n";
        assert_eq!(locator.locate(text).as_deref(), Some("MINISTERIO DE HACIENDA"));
    }

    #[test]
    fn test_no_match_yields_none() {
        let locator = HeadingLocator::new();
        assert_eq!(locator.locate("Relación de puestos\nPágina 3"), None);
        assert_eq!(locator.locate(""), None);
    }

    #[test]
    fn test_prefix_must_open_the_line() {
        let locator = HeadingLocator::new();
        // Mid-line and case-variant occurrences do not count.
        assert_eq!(locator.locate("Organismo adscrito al MINISTERIO"), None);
        assert_eq!(locator.locate("ministerio de cultura"), None);
    }

    #[test]
    fn test_prefixes_are_literal() {
        let locator = HeadingLocator::new();
        // "S.GRAL" must not let '.' match any character.
        assert_eq!(locator.locate("SXGRAL TECNICA"), None);
        assert_eq!(locator.locate("S.GRAL TECNICA").as_deref(), Some("S.GRAL TECNICA"));
    }

    #[test]
    fn test_custom_prefixes() {
        let locator = HeadingLocator::with_prefixes(&["CONSORCIO"]).unwrap();
        assert_eq!(locator.locate("MINISTERIO X\nCONSORCIO Y").as_deref(), Some("CONSORCIO Y"));
        assert!(matches!(
            HeadingLocator::with_prefixes::<&str>(&[]),
            Err(ExtractError::InvalidPrefixes(_))
        ));
        assert!(HeadingLocator::with_prefixes(&[""]).is_err());
    }

    #[test]
    fn test_scan_records_at_most_one_heading_per_page() {
        let mut first = PageLayout::new(1, 595.0, 842.0);
        first.push_text("MINISTERIO DE EXAMPLE", 40.0, 60.0, 10.0);
        first.push_text("MINISTERIO SEGUNDO", 40.0, 80.0, 10.0);
        let mut second = PageLayout::new(2, 595.0, 842.0);
        second.push_text("Sin cabecera", 40.0, 60.0, 10.0);
        let source = MemorySource { pages: vec![first, second] };

        let map = HeadingLocator::new().scan(&source).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(1), Some("MINISTERIO DE EXAMPLE"));
        assert_eq!(map.get(2), None);
        assert!(!map.is_empty());

        let untitled = MemorySource { pages: vec![source.pages[1].clone()] };
        assert!(HeadingLocator::new().scan(&untitled).unwrap().is_empty());
    }
}
