// src/pdf/models.rs
//! Page geometry as seen by the table strategies.
//!
//! All coordinates are in PDF points with the origin at the top-left corner of
//! the page, so `y` (and `baseline`) grow downward.

/// Segments whose extent along one axis is below this are treated as lying on the other axis.
pub const AXIS_TOLERANCE: f64 = 1.0;

/// Glyphs whose baselines differ by less than this fraction of the font size share a line.
const LINE_TOLERANCE: f64 = 0.5;

/// A horizontal gap wider than this fraction of the font size separates two words.
const WORD_GAP: f64 = 0.25;

/// A single decoded character placed on the page.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub text: String,
    pub x0: f64,
    pub x1: f64,
    pub baseline: f64,
    pub size: f64,
}

impl Glyph {
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    pub fn center_x(&self) -> f64 {
        (self.x0 + self.x1) / 2.0
    }

    /// Vertical middle of the glyph's lowercase body.
    pub fn center_y(&self) -> f64 {
        self.baseline - self.size * 0.35
    }
}

/// An axis-aligned ruling line (table border, underline, hairline rule).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl Ruling {
    /// Builds a ruling from two corners in any order.
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0: x0.min(x1),
            top: top.min(bottom),
            x1: x0.max(x1),
            bottom: top.max(bottom),
        }
    }

    pub fn horizontal(y: f64, x0: f64, x1: f64) -> Self {
        Self::new(x0, y, x1, y)
    }

    pub fn vertical(x: f64, top: f64, bottom: f64) -> Self {
        Self::new(x, top, x, bottom)
    }

    pub fn is_horizontal(&self) -> bool {
        self.bottom - self.top <= AXIS_TOLERANCE && self.x1 - self.x0 > AXIS_TOLERANCE
    }

    pub fn is_vertical(&self) -> bool {
        self.x1 - self.x0 <= AXIS_TOLERANCE && self.bottom - self.top > AXIS_TOLERANCE
    }
}

/// Everything the table strategies need to know about one page.
#[derive(Debug, Clone, Default)]
pub struct PageLayout {
    pub page: u32,
    pub width: f64,
    pub height: f64,
    pub glyphs: Vec<Glyph>,
    pub rulings: Vec<Ruling>,
}

impl PageLayout {
    pub fn new(page: u32, width: f64, height: f64) -> Self {
        Self {
            page,
            width,
            height,
            ..Default::default()
        }
    }

    /// Page text, one visual line per `\n`-separated line, top to bottom.
    pub fn text(&self) -> String {
        let glyphs: Vec<&Glyph> = self.glyphs.iter().collect();
        group_lines(&glyphs)
            .iter()
            .map(|line| render_line(line))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A grid of cell texts as produced by one table strategy.
/// Row 0 is the header row; cells may hold several `\n`-separated lines.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(|row| row.as_slice())
    }

    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(1..).unwrap_or(&[])
    }
}

/// Groups glyphs into visual lines, top to bottom, each sorted left to right.
pub fn group_lines<'a>(glyphs: &[&'a Glyph]) -> Vec<Vec<&'a Glyph>> {
    let mut sorted = glyphs.to_vec();
    sorted.sort_by(|a, b| a.baseline.total_cmp(&b.baseline).then(a.x0.total_cmp(&b.x0)));

    let mut lines: Vec<Vec<&Glyph>> = Vec::new();
    let mut anchor = f64::NAN;
    for glyph in sorted {
        let tolerance = glyph.size.max(1.0) * LINE_TOLERANCE;
        match lines.last_mut() {
            Some(line) if (glyph.baseline - anchor).abs() <= tolerance => line.push(glyph),
            _ => {
                anchor = glyph.baseline;
                lines.push(vec![glyph]);
            }
        }
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.x0.total_cmp(&b.x0));
    }
    lines
}

/// Renders one visual line. Blank glyphs and word-sized gaps become a single space.
pub fn render_line(line: &[&Glyph]) -> String {
    let mut out = String::new();
    let mut last_end: Option<f64> = None;

    for glyph in line {
        if glyph.is_blank() {
            if !out.is_empty() && !out.ends_with(' ') {
                out.push(' ');
            }
            continue;
        }
        if let Some(end) = last_end {
            if glyph.x0 - end > glyph.size * WORD_GAP && !out.ends_with(' ') {
                out.push(' ');
            }
        }
        out.push_str(&glyph.text);
        last_end = Some(glyph.x1);
    }

    out.trim().to_string()
}

/// Renders a set of glyphs as `\n`-joined lines (the text of one table cell).
pub fn render_block(glyphs: &[&Glyph]) -> String {
    group_lines(glyphs)
        .iter()
        .map(|line| render_line(line))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
impl PageLayout {
    /// Lays out `text` as fixed-pitch glyphs (half an em wide) starting at `x`.
    pub(crate) fn push_text(&mut self, text: &str, x: f64, baseline: f64, size: f64) {
        let advance = size * 0.5;
        for (i, ch) in text.chars().enumerate() {
            let x0 = x + advance * i as f64;
            self.glyphs.push(Glyph {
                text: ch.to_string(),
                x0,
                x1: x0 + advance,
                baseline,
                size,
            });
        }
    }

    /// Adds the borders of a grid with the given column and row edges.
    pub(crate) fn push_grid(&mut self, xs: &[f64], ys: &[f64]) {
        let (left, right) = (xs[0], xs[xs.len() - 1]);
        let (top, bottom) = (ys[0], ys[ys.len() - 1]);
        for &y in ys {
            self.rulings.push(Ruling::horizontal(y, left, right));
        }
        for &x in xs {
            self.rulings.push(Ruling::vertical(x, top, bottom));
        }
    }
}
