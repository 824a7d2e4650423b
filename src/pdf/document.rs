// src/pdf/document.rs
use std::path::Path as FsPath;

use pdf_extract::{ColorSpace, Document, MediaBox, OutputDev, OutputError, Path, PathOp, Transform};

use crate::pdf::models::{PageLayout, Glyph, Ruling, AXIS_TOLERANCE};
use crate::utils::error::PdfError;

/// Filled rectangles thinner than this are drawn rules, not boxes.
const HAIRLINE: f64 = 2.0;

/// Read access to the pages of a document. Pages are numbered from 1.
pub trait PageSource {
    fn page_count(&self) -> u32;

    /// Positioned glyphs and ruling lines of one page.
    fn page_layout(&self, page: u32) -> Result<PageLayout, PdfError>;

    /// Plain text of one page, one visual line per `\n`-separated line.
    fn page_text(&self, page: u32) -> Result<String, PdfError> {
        Ok(self.page_layout(page)?.text())
    }
}

/// A PDF loaded once and kept open for the whole run.
pub struct PdfDocument {
    document: Document,
    page_count: u32,
}

impl PdfDocument {
    /// Loads the PDF at `path`, decrypting it with the empty password if needed.
    pub fn open<P: AsRef<FsPath>>(path: P) -> Result<Self, PdfError> {
        tracing::debug!("Loading PDF from {}", path.as_ref().display());
        let document = Document::load(path.as_ref())?;
        Self::from_document(document)
    }

    /// Loads a PDF held in memory.
    #[cfg(test)]
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let document = Document::load_mem(bytes)?;
        Self::from_document(document)
    }

    fn from_document(mut document: Document) -> Result<Self, PdfError> {
        if document.is_encrypted() {
            tracing::debug!("Document is encrypted, trying the empty user password");
            document.decrypt("")?;
        }
        let page_count = document.get_pages().len() as u32;
        tracing::debug!("Document has {} pages", page_count);
        Ok(Self { document, page_count })
    }
}

impl PageSource for PdfDocument {
    fn page_count(&self) -> u32 {
        self.page_count
    }

    fn page_layout(&self, page: u32) -> Result<PageLayout, PdfError> {
        check_page(page, self.page_count)?;

        let mut collector = LayoutCollector::new(page);
        pdf_extract::output_doc_page(&self.document, &mut collector, page)?;
        let layout = collector.into_layout();

        tracing::trace!(
            "Page {} ({:.0}x{:.0} pt): {} glyphs, {} rulings",
            page,
            layout.width,
            layout.height,
            layout.glyphs.len(),
            layout.rulings.len()
        );
        Ok(layout)
    }
}

fn check_page(page: u32, count: u32) -> Result<(), PdfError> {
    if page == 0 || page > count {
        return Err(PdfError::PageOutOfRange { page, count });
    }
    Ok(())
}

/// Records glyphs and axis-aligned path segments while pdf-extract walks a page.
struct LayoutCollector {
    layout: PageLayout,
    page_left: f64,
    page_top: f64,
}

impl LayoutCollector {
    fn new(page: u32) -> Self {
        Self {
            layout: PageLayout::new(page, 0.0, 0.0),
            page_left: 0.0,
            page_top: 0.0,
        }
    }

    fn into_layout(self) -> PageLayout {
        self.layout
    }

    /// Maps a user-space point through `ctm` into top-down page coordinates.
    fn to_page(&self, ctm: &Transform, x: f64, y: f64) -> (f64, f64) {
        let px = ctm.m11 * x + ctm.m21 * y + ctm.m31;
        let py = ctm.m12 * x + ctm.m22 * y + ctm.m32;
        (px - self.page_left, self.page_top - py)
    }

    fn push_path(&mut self, ctm: &Transform, path: &Path) {
        let mut start: Option<(f64, f64)> = None;
        let mut current: Option<(f64, f64)> = None;

        for op in &path.ops {
            match *op {
                PathOp::MoveTo(x, y) => {
                    let point = self.to_page(ctm, x, y);
                    start = Some(point);
                    current = Some(point);
                }
                PathOp::LineTo(x, y) => {
                    let point = self.to_page(ctm, x, y);
                    if let Some(from) = current {
                        self.push_segment(from, point);
                    }
                    current = Some(point);
                }
                PathOp::CurveTo(_, _, _, _, x, y) => {
                    current = Some(self.to_page(ctm, x, y));
                }
                PathOp::Rect(x, y, width, height) => {
                    self.push_rect(ctm, x, y, width, height);
                }
                PathOp::Close => {
                    if let (Some(from), Some(to)) = (current, start) {
                        self.push_segment(from, to);
                    }
                    current = start;
                }
            }
        }
    }

    fn push_segment(&mut self, from: (f64, f64), to: (f64, f64)) {
        let (dx, dy) = ((to.0 - from.0).abs(), (to.1 - from.1).abs());
        if dy <= AXIS_TOLERANCE && dx > AXIS_TOLERANCE {
            let y = (from.1 + to.1) / 2.0;
            self.layout.rulings.push(Ruling::horizontal(y, from.0, to.0));
        } else if dx <= AXIS_TOLERANCE && dy > AXIS_TOLERANCE {
            let x = (from.0 + to.0) / 2.0;
            self.layout.rulings.push(Ruling::vertical(x, from.1, to.1));
        }
        // diagonals never border a table cell
    }

    fn push_rect(&mut self, ctm: &Transform, x: f64, y: f64, width: f64, height: f64) {
        let corners = [
            self.to_page(ctm, x, y),
            self.to_page(ctm, x + width, y),
            self.to_page(ctm, x + width, y + height),
            self.to_page(ctm, x, y + height),
        ];
        let left = corners.iter().map(|c| c.0).fold(f64::INFINITY, f64::min);
        let right = corners.iter().map(|c| c.0).fold(f64::NEG_INFINITY, f64::max);
        let top = corners.iter().map(|c| c.1).fold(f64::INFINITY, f64::min);
        let bottom = corners.iter().map(|c| c.1).fold(f64::NEG_INFINITY, f64::max);
        let (w, h) = (right - left, bottom - top);

        if w <= HAIRLINE && h <= HAIRLINE {
            return;
        }
        if h <= HAIRLINE {
            self.layout.rulings.push(Ruling::horizontal((top + bottom) / 2.0, left, right));
        } else if w <= HAIRLINE {
            self.layout.rulings.push(Ruling::vertical((left + right) / 2.0, top, bottom));
        } else {
            self.layout.rulings.extend([
                Ruling::horizontal(top, left, right),
                Ruling::horizontal(bottom, left, right),
                Ruling::vertical(left, top, bottom),
                Ruling::vertical(right, top, bottom),
            ]);
        }
    }
}

impl OutputDev for LayoutCollector {
    fn begin_page(
        &mut self,
        page_num: u32,
        media_box: &MediaBox,
        _art_box: Option<(f64, f64, f64, f64)>,
    ) -> Result<(), OutputError> {
        self.page_left = media_box.llx;
        self.page_top = media_box.ury;
        self.layout = PageLayout::new(
            page_num,
            media_box.urx - media_box.llx,
            media_box.ury - media_box.lly,
        );
        Ok(())
    }

    fn end_page(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn output_character(
        &mut self,
        trm: &Transform,
        width: f64,
        _spacing: f64,
        font_size: f64,
        text: &str,
    ) -> Result<(), OutputError> {
        let size = font_size * (trm.m11 * trm.m22 - trm.m12 * trm.m21).abs().sqrt();
        let x0 = trm.m31 - self.page_left;
        self.layout.glyphs.push(Glyph {
            text: text.to_string(),
            x0,
            x1: x0 + width * size,
            baseline: self.page_top - trm.m32,
            size,
        });
        Ok(())
    }

    fn begin_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_word(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn end_line(&mut self) -> Result<(), OutputError> {
        Ok(())
    }

    fn stroke(
        &mut self,
        ctm: &Transform,
        _colorspace: &ColorSpace,
        _color: &[f64],
        path: &Path,
    ) -> Result<(), OutputError> {
        self.push_path(ctm, path);
        Ok(())
    }

    fn fill(
        &mut self,
        ctm: &Transform,
        _colorspace: &ColorSpace,
        _color: &[f64],
        path: &Path,
    ) -> Result<(), OutputError> {
        self.push_path(ctm, path);
        Ok(())
    }
}

/// Pages built by hand, for exercising the pipeline without a PDF file.
#[cfg(test)]
pub(crate) struct MemorySource {
    pub pages: Vec<PageLayout>,
}

#[cfg(test)]
impl PageSource for MemorySource {
    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_layout(&self, page: u32) -> Result<PageLayout, PdfError> {
        check_page(page, self.page_count())?;
        Ok(self.pages[page as usize - 1].clone())
    }
}
