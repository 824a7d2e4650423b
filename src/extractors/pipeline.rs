// src/extractors/pipeline.rs

// --- Imports ---
use crate::config::ExtractionConfig;
use crate::extractors::heading::HeadingLocator;
use crate::extractors::rows::{Record, RowNormalizer};
use crate::extractors::table::StrategyChain;
use crate::pdf::PageSource;
use crate::utils::error::ExtractError;

// --- Data Structures ---
/// Everything one run produced, records in page order then row order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub records: Vec<Record>,
    pub page_count: u32,
    pub pages_with_headings: usize,
    pub pages_with_records: usize,
}

/// Heading pass over the whole document, then per-page table extraction.
pub struct VacancyExtractor {
    locator: HeadingLocator,
    chain: StrategyChain,
    normalizer: RowNormalizer,
}

impl VacancyExtractor {
    pub fn new(locator: HeadingLocator, chain: StrategyChain, normalizer: RowNormalizer) -> Self {
        Self { locator, chain, normalizer }
    }

    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        Ok(Self::new(
            HeadingLocator::with_prefixes(&config.heading_prefixes)?,
            StrategyChain::from_kinds(&config.strategies),
            RowNormalizer::new(config.column_map()),
        ))
    }

    pub fn extract<S: PageSource + ?Sized>(&self, source: &S) -> Result<Extraction, ExtractError> {
        let headings = self.locator.scan(source)?;
        let page_count = source.page_count();
        if headings.is_empty() && page_count > 0 {
            tracing::warn!("No ministry/agency heading found on any page; MINISTERIO will be empty");
        }
        tracing::info!(
            "Extracting tables from {} pages with strategies {:?}",
            page_count,
            self.chain.names()
        );

        let mut extraction = Extraction {
            page_count,
            pages_with_headings: headings.len(),
            ..Default::default()
        };
        for page in 1..=page_count {
            let layout = source.page_layout(page)?;
            let records = self
                .chain
                .run_until(&layout, |tables| self.normalizer.normalize(tables, &headings, page));

            tracing::info!("Page {}/{}: {} records", page, page_count, records.len());
            if !records.is_empty() {
                extraction.pages_with_records += 1;
            }
            extraction.records.extend(records);
        }

        tracing::info!(
            "Extracted {} records from {} of {} pages",
            extraction.records.len(),
            extraction.pages_with_records,
            page_count
        );
        Ok(extraction)
    }
}

impl Default for VacancyExtractor {
    fn default() -> Self {
        Self::new(HeadingLocator::default(), StrategyChain::default(), RowNormalizer::default())
    }
}
