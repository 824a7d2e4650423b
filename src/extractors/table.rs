// src/extractors/table.rs

// --- Imports ---
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::pdf::{group_lines, render_block, render_line, Glyph, PageLayout, RawTable};

// --- Constants ---
/// Parallel rulings closer than this (pt) are the same line.
const SNAP_TOLERANCE: f64 = 3.0;
/// Collinear rulings with a gap up to this (pt) are joined.
const JOIN_TOLERANCE: f64 = 3.0;
/// Slack (pt) when testing whether a horizontal and a vertical ruling touch.
const INTERSECTION_TOLERANCE: f64 = 3.0;
/// A gap wider than this many ems between glyphs on one line separates two columns.
const COLUMN_GAP_EMS: f64 = 1.0;

// --- Strategy Trait ---
/// One way of finding tables on a page.
pub trait TableStrategy {
    fn name(&self) -> &'static str;
    fn extract_tables(&self, layout: &PageLayout) -> Vec<RawTable>;
}

/// Strategy names as they appear in the settings file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Cells bounded by drawn ruling lines.
    Lattice,
    /// Columns inferred from whitespace between text.
    Stream,
}

impl StrategyKind {
    pub fn build(self) -> Box<dyn TableStrategy> {
        match self {
            StrategyKind::Lattice => Box::new(LatticeStrategy),
            StrategyKind::Stream => Box::new(StreamStrategy),
        }
    }
}

/// Ordered strategies, tried one after another until one yields something usable.
pub struct StrategyChain {
    strategies: Vec<Box<dyn TableStrategy>>,
}

impl StrategyChain {
    pub fn new(strategies: Vec<Box<dyn TableStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn from_kinds(kinds: &[StrategyKind]) -> Self {
        Self::new(kinds.iter().map(|kind| kind.build()).collect())
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Runs each strategy on `layout` and hands its tables to `accept`; returns the
    /// first non-empty result, or an empty one when every strategy comes up short.
    pub fn run_until<T, F>(&self, layout: &PageLayout, mut accept: F) -> Vec<T>
    where
        F: FnMut(&[RawTable]) -> Vec<T>,
    {
        for strategy in &self.strategies {
            let tables = strategy.extract_tables(layout);
            tracing::debug!(
                "Page {}: {} strategy found {} tables",
                layout.page,
                strategy.name(),
                tables.len()
            );
            let accepted = accept(tables.as_slice());
            if !accepted.is_empty() {
                tracing::debug!("Page {}: using {} strategy", layout.page, strategy.name());
                return accepted;
            }
        }
        tracing::debug!("Page {}: no strategy produced usable rows", layout.page);
        Vec::new()
    }
}

impl Default for StrategyChain {
    fn default() -> Self {
        Self::from_kinds(&[StrategyKind::Lattice, StrategyKind::Stream])
    }
}

// --- Lattice ---
/// Finds grids of intersecting ruling lines and fills each cell with the text inside it.
pub struct LatticeStrategy;

/// A ruling reduced to one axis: `pos` is its fixed coordinate, `start..end` its extent.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Span {
    pos: f64,
    start: f64,
    end: f64,
}

/// Cell edges of one table plus the vertical rulings that drew them.
/// A vertical may cross only some rows; text is split only where one actually runs.
struct Grid {
    xs: Vec<f64>,
    ys: Vec<f64>,
    verticals: Vec<Span>,
}

impl TableStrategy for LatticeStrategy {
    fn name(&self) -> &'static str {
        "lattice"
    }

    fn extract_tables(&self, layout: &PageLayout) -> Vec<RawTable> {
        let horizontals = merge_spans(
            layout
                .rulings
                .iter()
                .filter(|r| r.is_horizontal())
                .map(|r| Span { pos: (r.top + r.bottom) / 2.0, start: r.x0, end: r.x1 })
                .collect(),
        );
        let verticals = merge_spans(
            layout
                .rulings
                .iter()
                .filter(|r| r.is_vertical())
                .map(|r| Span { pos: (r.x0 + r.x1) / 2.0, start: r.top, end: r.bottom })
                .collect(),
        );

        let mut grids: Vec<Grid> = connected_grids(&horizontals, &verticals)
            .into_iter()
            .filter(|(hs, vs)| hs.len() >= 2 && vs.len() >= 2)
            .map(|(hs, vs)| Grid {
                xs: cluster_positions(vs.iter().map(|s| s.pos).collect()),
                ys: cluster_positions(hs.iter().map(|s| s.pos).collect()),
                verticals: vs,
            })
            .filter(|grid| grid.xs.len() >= 2 && grid.ys.len() >= 2)
            .collect();
        grids.sort_by(|a, b| a.ys[0].total_cmp(&b.ys[0]).then(a.xs[0].total_cmp(&b.xs[0])));

        grids
            .iter()
            .map(|grid| grid.fill(&layout.glyphs))
            .filter(|table| !table.rows.is_empty())
            .collect()
    }
}

/// Snaps nearly-collinear spans to a shared position, then joins overlapping ones.
fn merge_spans(mut spans: Vec<Span>) -> Vec<Span> {
    spans.sort_by(|a, b| a.pos.total_cmp(&b.pos));

    let mut groups: Vec<Vec<Span>> = Vec::new();
    for span in spans {
        match groups.last_mut() {
            Some(group) if span.pos - mean_pos(group) <= SNAP_TOLERANCE => group.push(span),
            _ => groups.push(vec![span]),
        }
    }

    let mut merged = Vec::new();
    for mut group in groups {
        let pos = mean_pos(&group);
        group.sort_by(|a, b| a.start.total_cmp(&b.start));
        let mut current: Option<Span> = None;
        for span in group {
            current = match current {
                Some(mut open) if span.start <= open.end + JOIN_TOLERANCE => {
                    open.end = open.end.max(span.end);
                    Some(open)
                }
                Some(open) => {
                    merged.push(open);
                    Some(Span { pos, ..span })
                }
                None => Some(Span { pos, ..span }),
            };
        }
        merged.extend(current);
    }
    merged
}

fn mean_pos(group: &[Span]) -> f64 {
    group.iter().map(|s| s.pos).sum::<f64>() / group.len() as f64
}

fn touches(h: &Span, v: &Span) -> bool {
    v.pos >= h.start - INTERSECTION_TOLERANCE
        && v.pos <= h.end + INTERSECTION_TOLERANCE
        && h.pos >= v.start - INTERSECTION_TOLERANCE
        && h.pos <= v.end + INTERSECTION_TOLERANCE
}

/// Groups rulings into connected components of touching horizontal/vertical pairs.
fn connected_grids(horizontals: &[Span], verticals: &[Span]) -> Vec<(Vec<Span>, Vec<Span>)> {
    let offset = horizontals.len();
    let mut parent: Vec<usize> = (0..offset + verticals.len()).collect();

    for (i, h) in horizontals.iter().enumerate() {
        for (j, v) in verticals.iter().enumerate() {
            if touches(h, v) {
                let (a, b) = (find_root(&mut parent, i), find_root(&mut parent, offset + j));
                if a != b {
                    parent[b] = a;
                }
            }
        }
    }

    let mut order: Vec<usize> = Vec::new();
    let mut components: HashMap<usize, (Vec<Span>, Vec<Span>)> = HashMap::new();
    for index in 0..parent.len() {
        let root = find_root(&mut parent, index);
        let entry = components.entry(root).or_insert_with(|| {
            order.push(root);
            (Vec::new(), Vec::new())
        });
        if index < offset {
            entry.0.push(horizontals[index]);
        } else {
            entry.1.push(verticals[index - offset]);
        }
    }

    order
        .into_iter()
        .filter_map(|root| components.remove(&root))
        .collect()
}

fn find_root(parent: &mut [usize], mut index: usize) -> usize {
    while parent[index] != index {
        parent[index] = parent[parent[index]];
        index = parent[index];
    }
    index
}

/// Sorted distinct positions, with values within the snap tolerance collapsed to their mean.
fn cluster_positions(mut values: Vec<f64>) -> Vec<f64> {
    values.sort_by(f64::total_cmp);
    let mut clusters: Vec<Vec<f64>> = Vec::new();
    for value in values {
        match clusters.last_mut() {
            Some(cluster) if value - cluster.iter().sum::<f64>() / cluster.len() as f64 <= SNAP_TOLERANCE => {
                cluster.push(value)
            }
            _ => clusters.push(vec![value]),
        }
    }
    clusters
        .iter()
        .map(|c| c.iter().sum::<f64>() / c.len() as f64)
        .collect()
}

/// Index of the interval of `edges` containing `value`, if any.
fn interval_index(edges: &[f64], value: f64) -> Option<usize> {
    let (first, last) = (*edges.first()?, *edges.last()?);
    if edges.len() < 2 || value < first || value > last {
        return None;
    }
    let index = edges.partition_point(|&edge| edge <= value);
    Some(index.saturating_sub(1).min(edges.len() - 2))
}

impl Grid {
    /// Places each run of text in the cell holding its first glyph, so a label
    /// written across a spanning cell stays whole. Rows with no text are dropped.
    fn fill(&self, glyphs: &[Glyph]) -> RawTable {
        let mut cells: Vec<Vec<Vec<&Glyph>>> =
            vec![vec![Vec::new(); self.xs.len() - 1]; self.ys.len() - 1];

        let glyphs: Vec<&Glyph> = glyphs.iter().collect();
        for line in group_lines(&glyphs) {
            for run in self.split_at_rulings(&line) {
                let anchor = match run.iter().find(|g| !g.is_blank()) {
                    Some(anchor) => anchor,
                    None => continue,
                };
                if let (Some(col), Some(row)) = (
                    interval_index(&self.xs, anchor.center_x()),
                    interval_index(&self.ys, anchor.center_y()),
                ) {
                    cells[row][col].extend(run);
                }
            }
        }

        let rows = cells
            .iter()
            .map(|row| row.iter().map(|cell| render_block(cell)).collect::<Vec<String>>())
            .filter(|row| row.iter().any(|cell| !cell.is_empty()))
            .collect();
        RawTable::new(rows)
    }

    /// Splits one visual line wherever a vertical ruling crossing it lies between two glyphs.
    fn split_at_rulings<'a>(&self, line: &[&'a Glyph]) -> Vec<Vec<&'a Glyph>> {
        let mut runs: Vec<Vec<&Glyph>> = Vec::new();
        let mut current: Vec<&Glyph> = Vec::new();
        let mut last_x: Option<f64> = None;

        for glyph in line {
            if !glyph.is_blank() {
                let (x, y) = (glyph.center_x(), glyph.center_y());
                if let Some(prev) = last_x {
                    let divided = self
                        .verticals
                        .iter()
                        .any(|v| v.pos > prev && v.pos <= x && v.start <= y && y <= v.end);
                    if divided {
                        runs.push(std::mem::take(&mut current));
                    }
                }
                last_x = Some(x);
            }
            current.push(*glyph);
        }
        runs.push(current);
        runs
    }
}

// --- Stream ---
/// Treats each text line as a row and infers columns from the gaps between text runs.
pub struct StreamStrategy;

/// A run of text on one line, separated from its neighbours by a column-sized gap.
#[derive(Debug, Clone, PartialEq)]
struct Chunk {
    text: String,
    x0: f64,
    x1: f64,
}

impl Chunk {
    fn center(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }
}

impl TableStrategy for StreamStrategy {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn extract_tables(&self, layout: &PageLayout) -> Vec<RawTable> {
        let glyphs: Vec<&Glyph> = layout.glyphs.iter().collect();
        let lines: Vec<Vec<Chunk>> = group_lines(&glyphs)
            .iter()
            .map(|line| split_chunks(line))
            .filter(|chunks| !chunks.is_empty())
            .collect();

        // The table starts at the first line with the usual column count, so a
        // running page header with fewer runs above it is not taken as the header row.
        let mode = match modal_chunk_count(&lines) {
            Some(mode) => mode,
            None => return Vec::new(),
        };
        let first = lines.iter().position(|chunks| chunks.len() == mode);
        let last = lines.iter().rposition(|chunks| chunks.len() >= 2);
        let region = match (first, last) {
            (Some(first), Some(last)) if first < last => &lines[first..=last],
            _ => return Vec::new(),
        };

        let columns = column_intervals(region, mode);
        if columns.len() < 2 {
            return Vec::new();
        }
        let boundaries: Vec<f64> = columns.windows(2).map(|w| (w[0].1 + w[1].0) / 2.0).collect();

        let rows = region
            .iter()
            .map(|chunks| {
                let mut row = vec![String::new(); columns.len()];
                for chunk in chunks {
                    let cell = &mut row[boundaries.partition_point(|&b| b <= chunk.center())];
                    if !cell.is_empty() {
                        cell.push(' ');
                    }
                    cell.push_str(&chunk.text);
                }
                row
            })
            .collect();
        vec![RawTable::new(rows)]
    }
}

fn split_chunks(line: &[&Glyph]) -> Vec<Chunk> {
    let mut chunks = Vec::new();
    let mut current: Vec<&Glyph> = Vec::new();
    let mut last_end: Option<f64> = None;

    for glyph in line {
        if !glyph.is_blank() {
            if let Some(end) = last_end {
                if glyph.x0 - end > glyph.size * COLUMN_GAP_EMS {
                    chunks.extend(make_chunk(&current));
                    current.clear();
                }
            }
            last_end = Some(glyph.x1);
        }
        current.push(*glyph);
    }
    chunks.extend(make_chunk(&current));
    chunks
}

fn make_chunk(glyphs: &[&Glyph]) -> Option<Chunk> {
    let text = render_line(glyphs);
    if text.is_empty() {
        return None;
    }
    let inked = glyphs.iter().filter(|g| !g.is_blank());
    let x0 = inked.clone().map(|g| g.x0).fold(f64::INFINITY, f64::min);
    let x1 = inked.map(|g| g.x1).fold(f64::NEG_INFINITY, f64::max);
    Some(Chunk { text, x0, x1 })
}

/// Most common chunk count among lines with at least two chunks (ties go to the larger count).
fn modal_chunk_count(lines: &[Vec<Chunk>]) -> Option<usize> {
    let mut counts: HashMap<usize, usize> = HashMap::new();
    for chunks in lines.iter().filter(|c| c.len() >= 2) {
        *counts.entry(chunks.len()).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(count, _)| count)
}

/// Column extents taken from the lines with `mode` chunks, overlapping extents merged.
fn column_intervals(region: &[Vec<Chunk>], mode: usize) -> Vec<(f64, f64)> {
    let mut intervals = vec![(f64::INFINITY, f64::NEG_INFINITY); mode];
    for chunks in region.iter().filter(|c| c.len() == mode) {
        for (interval, chunk) in intervals.iter_mut().zip(chunks) {
            interval.0 = interval.0.min(chunk.x0);
            interval.1 = interval.1.max(chunk.x1);
        }
    }
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0));

    let mut merged: Vec<(f64, f64)> = Vec::new();
    for interval in intervals {
        match merged.last_mut() {
            Some(last) if interval.0 <= last.1 => last.1 = last.1.max(interval.1),
            _ => merged.push(interval),
        }
    }
    merged
}
