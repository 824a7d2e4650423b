// src/extractors/mod.rs
pub mod heading;
pub mod pipeline;
pub mod rows;
pub mod table;

// Re-export key extraction types for convenience
#[allow(unused_imports)]
pub use heading::{HeadingLocator, HeadingMap};
#[allow(unused_imports)]
pub use pipeline::{Extraction, VacancyExtractor};
#[allow(unused_imports)]
pub use rows::{ColumnMap, ColumnRule, Record, RowNormalizer, SemanticColumn};
#[allow(unused_imports)]
pub use table::{LatticeStrategy, StrategyChain, StrategyKind, StreamStrategy, TableStrategy};
