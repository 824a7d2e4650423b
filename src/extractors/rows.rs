// src/extractors/rows.rs

// --- Imports ---
use serde::{Deserialize, Serialize};

use crate::extractors::heading::HeadingMap;
use crate::pdf::RawTable;

// --- Data Structures ---
/// One vacancy row as written to the spreadsheet. Field order is the column order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Record {
    #[serde(rename = "MINISTERIO")]
    pub ministerio: String,
    #[serde(rename = "CDIR")]
    pub cdir: String,
    #[serde(rename = "CDES")]
    pub cdes: String,
    #[serde(rename = "PROVINCIA")]
    pub provincia: String,
    #[serde(rename = "LOCALIDAD")]
    pub localidad: String,
    #[serde(rename = "PUESTO")]
    pub puesto: String,
    #[serde(rename = "CPUESTO")]
    pub cpuesto: String,
    #[serde(rename = "ESPECIFICO")]
    pub especifico: String,
}

impl Record {
    pub const COLUMNS: [&'static str; 8] = [
        "MINISTERIO",
        "CDIR",
        "CDES",
        "PROVINCIA",
        "LOCALIDAD",
        "PUESTO",
        "CPUESTO",
        "ESPECIFICO",
    ];
}

/// The four table columns a vacancy listing must have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticColumn {
    Directorate,
    Province,
    JobTitle,
    Specific,
}

impl SemanticColumn {
    pub const ALL: [SemanticColumn; 4] = [
        SemanticColumn::Directorate,
        SemanticColumn::Province,
        SemanticColumn::JobTitle,
        SemanticColumn::Specific,
    ];
}

/// "A header label containing `contains` is the `column` column."
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnRule {
    pub column: SemanticColumn,
    pub contains: String,
}

impl ColumnRule {
    pub fn new(column: SemanticColumn, contains: &str) -> Self {
        Self { column, contains: contains.to_string() }
    }
}

/// Positions of the four semantic columns within one table's header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnIndices {
    pub directorate: usize,
    pub province: usize,
    pub job_title: usize,
    pub specific: usize,
}

/// Ordered header-label rules. Several rules may target the same column;
/// they are tried in order and the first label containing the substring wins.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    rules: Vec<ColumnRule>,
}

impl ColumnMap {
    pub fn new(rules: Vec<ColumnRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[ColumnRule] {
        &self.rules
    }

    /// Columns with no usable (non-empty) rule.
    pub fn uncovered(&self) -> Vec<SemanticColumn> {
        SemanticColumn::ALL
            .into_iter()
            .filter(|column| {
                !self
                    .rules
                    .iter()
                    .any(|rule| rule.column == *column && !rule.contains.is_empty())
            })
            .collect()
    }

    fn find(&self, column: SemanticColumn, header: &[String]) -> Option<usize> {
        self.rules
            .iter()
            .filter(|rule| rule.column == column && !rule.contains.is_empty())
            .find_map(|rule| header.iter().position(|label| label.contains(rule.contains.as_str())))
    }

    /// Maps a header row to column positions, or `None` if any column is missing.
    pub fn resolve(&self, header: &[String]) -> Option<ColumnIndices> {
        Some(ColumnIndices {
            directorate: self.find(SemanticColumn::Directorate, header)?,
            province: self.find(SemanticColumn::Province, header)?,
            job_title: self.find(SemanticColumn::JobTitle, header)?,
            specific: self.find(SemanticColumn::Specific, header)?,
        })
    }
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self::new(vec![
            ColumnRule::new(SemanticColumn::Directorate, "CENTRO DIRECTIVO"),
            ColumnRule::new(SemanticColumn::Province, "PROVINCIA"),
            ColumnRule::new(SemanticColumn::JobTitle, "PUESTO DE TRABAJO"),
            ColumnRule::new(SemanticColumn::Specific, "ESPECÍFICO"),
        ])
    }
}

// --- Normalizer ---
/// Turns raw tables into flat records.
pub struct RowNormalizer {
    columns: ColumnMap,
}

impl RowNormalizer {
    pub fn new(columns: ColumnMap) -> Self {
        Self { columns }
    }

    /// Records for every data row of every table whose header has all four columns.
    /// Tables missing a column are skipped.
    pub fn normalize(&self, tables: &[RawTable], headings: &HeadingMap, page: u32) -> Vec<Record> {
        let ministerio = headings.get(page).unwrap_or_default();
        let mut records = Vec::new();

        for (index, table) in tables.iter().enumerate() {
            let header = match table.header() {
                Some(header) => header,
                None => continue,
            };
            let columns = match self.columns.resolve(header) {
                Some(columns) => columns,
                None => {
                    tracing::debug!(
                        "Page {}: table {} lacks required columns, header {:?}",
                        page,
                        index,
                        header
                    );
                    continue;
                }
            };

            for row in table.data_rows() {
                let (cdir, cdes) = split_cell(row, columns.directorate);
                let (provincia, localidad) = split_cell(row, columns.province);
                let (puesto, cpuesto) = split_cell(row, columns.job_title);
                // Line 0 of the specific cell is a label; only line 1 is kept.
                let (_, especifico) = split_cell(row, columns.specific);
                tracing::trace!("Page {}: row {:?}", page, row);

                records.push(Record {
                    ministerio: ministerio.to_string(),
                    cdir,
                    cdes,
                    provincia,
                    localidad,
                    puesto,
                    cpuesto,
                    especifico,
                });
            }
        }
        records
    }
}

impl Default for RowNormalizer {
    fn default() -> Self {
        Self::new(ColumnMap::default())
    }
}

/// First and second `\n`-separated lines of cell `index`, trimmed; missing parts are empty.
fn split_cell(row: &[String], index: usize) -> (String, String) {
    let mut lines = row.get(index).map(|cell| cell.split('\n')).into_iter().flatten();
    let first = lines.next().unwrap_or_default().trim().to_string();
    let second = lines.next().unwrap_or_default().trim().to_string();
    (first, second)
}

// --- Tests ---
#[cfg(test)]
mod tests {
    use super::*;

    fn table(rows: &[&[&str]]) -> RawTable {
        RawTable::new(
            rows.iter()
                .map(|row| row.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    fn headings(page: u32, heading: &str) -> HeadingMap {
        let mut map = HeadingMap::default();
        map.insert(page, heading.to_string());
        map
    }

    fn listing() -> RawTable {
        table(&[
            &["Nº", "CENTRO DIRECTIVO", "PROVINCIA\nLOCALIDAD", "PUESTO DE TRABAJO", "ESPECÍFICO"],
            &[
                "1",
                "Dirección General\nSubdirección X",
                "MADRID\nGetafe",
                "Jefe de Servicio\n1234567",
                "Complemento\n12.345,67",
            ],
        ])
    }

    #[test]
    fn test_splits_cells_and_attaches_heading() {
        let normalizer = RowNormalizer::default();
        let records = normalizer.normalize(&[listing()], &headings(3, "MINISTERIO DE EXAMPLE"), 3);

        assert_eq!(
            records,
            vec![Record {
                ministerio: "MINISTERIO DE EXAMPLE".into(),
                cdir: "Dirección General".into(),
                cdes: "Subdirección X".into(),
                provincia: "MADRID".into(),
                localidad: "Getafe".into(),
                puesto: "Jefe de Servicio".into(),
                cpuesto: "1234567".into(),
                especifico: "12.345,67".into(),
            }]
        );
    }

    #[test]
    fn test_single_line_cells_leave_second_field_empty() {
        let raw = table(&[
            &["CENTRO DIRECTIVO", "PROVINCIA", "PUESTO DE TRABAJO", "ESPECÍFICO"],
            &["  Dirección General  ", "SEVILLA", "Auxiliar", "Solo etiqueta"],
        ]);
        let records = RowNormalizer::default().normalize(&[raw], &HeadingMap::default(), 1);

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.ministerio, "");
        assert_eq!(record.cdir, "Dirección General");
        assert_eq!(record.cdes, "");
        assert_eq!(record.localidad, "");
        assert_eq!(record.especifico, "", "line 0 of the specific cell is never used");
    }

    #[test]
    fn test_column_order_does_not_matter() {
        let reordered = table(&[
            &["ESPECÍFICO", "PUESTO DE TRABAJO", "PROVINCIA\nLOCALIDAD", "CENTRO DIRECTIVO", "Nº"],
            &[
                "Complemento\n12.345,67",
                "Jefe de Servicio\n1234567",
                "MADRID\nGetafe",
                "Dirección General\nSubdirección X",
                "1",
            ],
        ]);
        let map = headings(1, "MINISTERIO DE EXAMPLE");
        let normalizer = RowNormalizer::default();

        assert_eq!(
            normalizer.normalize(&[reordered], &map, 1),
            normalizer.normalize(&[listing()], &map, 1)
        );
    }

    #[test]
    fn test_table_missing_a_column_is_skipped() {
        let incomplete = table(&[
            &["CENTRO DIRECTIVO", "PROVINCIA", "PUESTO DE TRABAJO"],
            &["D.G. Uno", "MADRID", "Técnico"],
        ]);
        let normalizer = RowNormalizer::default();
        let map = HeadingMap::default();

        assert!(normalizer.normalize(&[incomplete.clone()], &map, 1).is_empty());
        // A complete table on the same page still contributes.
        assert_eq!(normalizer.normalize(&[incomplete, listing()], &map, 1).len(), 1);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalizer = RowNormalizer::default();
        let map = headings(2, "AGENCIA TRIBUTARIA");
        let tables = [listing(), listing()];

        let first = normalizer.normalize(&tables, &map, 2);
        let second = normalizer.normalize(&tables, &map, 2);
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn test_short_rows_read_missing_cells_as_empty() {
        let raw = table(&[
            &["CENTRO DIRECTIVO", "PROVINCIA", "PUESTO DE TRABAJO", "ESPECÍFICO"],
            &["D.G. Uno\nS.G. Dos"],
        ]);
        let records = RowNormalizer::default().normalize(&[raw], &HeadingMap::default(), 1);

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].cdes, "S.G. Dos");
        assert_eq!(records[0].provincia, "");
        assert_eq!(records[0].puesto, "");
    }

    #[test]
    fn test_alternative_labels_are_tried_in_order() {
        let mut rules = ColumnMap::default().rules().to_vec();
        rules.push(ColumnRule::new(SemanticColumn::Specific, "ESPECIFICO"));
        let map = ColumnMap::new(rules);

        let header: Vec<String> = ["CENTRO DIRECTIVO", "PROVINCIA", "PUESTO DE TRABAJO", "C. ESPECIFICO"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(
            map.resolve(&header),
            Some(ColumnIndices { directorate: 0, province: 1, job_title: 2, specific: 3 })
        );
        assert_eq!(ColumnMap::default().resolve(&header), None);
    }

    #[test]
    fn test_uncovered_columns() {
        assert!(ColumnMap::default().uncovered().is_empty());
        let map = ColumnMap::new(vec![
            ColumnRule::new(SemanticColumn::Directorate, "CENTRO"),
            ColumnRule::new(SemanticColumn::Province, ""),
        ]);
        assert_eq!(
            map.uncovered(),
            vec![SemanticColumn::Province, SemanticColumn::JobTitle, SemanticColumn::Specific]
        );
    }

    #[test]
    fn test_record_columns_match_serialized_names() {
        let json = serde_json::to_value(Record::default()).unwrap();
        let keys: Vec<&str> = json.as_object().unwrap().keys().map(String::as_str).collect();
        let mut expected = Record::COLUMNS.to_vec();
        expected.sort_unstable();
        assert_eq!(keys, expected, "serde_json maps sort their keys");
    }
}
