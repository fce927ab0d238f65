//! PDF rendering of report flowables
//!
//! Layout runs twice: the first pass finds the page of every heading, the
//! second fills those page numbers into the table of contents. TOC entries
//! never wrap, so both passes paginate identically.
//!
//! Text uses the standard Times fonts with WinAnsi encoding; widths come
//! from an approximate per-character table.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

use super::document::{BarChart, Flowable};
use super::ReportError;

// A4 portrait, points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 72.0;
const CONTENT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const TOP: f32 = PAGE_HEIGHT - MARGIN;
const BOTTOM: f32 = MARGIN;
const FOOTER_Y: f32 = 54.0;

const BODY_SIZE: f32 = 11.0;
const LEADING: f32 = 1.3;

const CHART_WIDTH: f32 = 400.0;
const CHART_HEIGHT: f32 = 200.0;
const PLOT_OFFSET: f32 = 50.0;
const PLOT_WIDTH: f32 = 300.0;
const PLOT_HEIGHT: f32 = 125.0;
const MAX_TICKS: usize = 10;
const MAX_LABEL_CHARS: usize = 24;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }
}

/// Document-level strings
#[derive(Debug, Clone)]
pub struct PdfMeta {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub subject: String,
}

#[derive(Debug, Clone, PartialEq)]
struct TocEntry {
    level: u8,
    text: String,
    page: usize,
}

/// Render flowables into PDF bytes
pub fn render_pdf(meta: &PdfMeta, flowables: &[Flowable]) -> Result<Vec<u8>, ReportError> {
    let placeholder: Vec<TocEntry> = flowables
        .iter()
        .filter_map(|f| match f {
            Flowable::Heading { level, text } if *level <= 2 => Some(TocEntry {
                level: *level,
                text: text.clone(),
                page: 0,
            }),
            _ => None,
        })
        .collect();

    let first = Layout::run(meta, flowables, &placeholder);
    let second = Layout::run(meta, flowables, &first.toc);

    write_document(meta, second.pages)
}

// ========================================
// Text measurement
// ========================================

/// Approximate glyph width in ems for the Times faces
fn char_width(c: char) -> f32 {
    match c {
        ' ' => 0.25,
        'i' | 'j' | 'l' | '.' | ',' | ';' | ':' | '\'' | '!' | '|' => 0.28,
        'f' | 't' | 'r' | 'I' | '(' | ')' | '[' | ']' | '-' => 0.33,
        'm' | 'w' => 0.75,
        'M' | 'W' => 0.9,
        '0'..='9' => 0.5,
        c if c.is_ascii_uppercase() => 0.7,
        _ => 0.47,
    }
}

fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let ems: f32 = text.chars().map(char_width).sum();
    let factor = if font == Font::Bold { 1.05 } else { 1.0 };
    ems * size * factor
}

/// Greedy word wrap; words wider than a line are split
fn wrap(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{} {}", current, word)
        };

        if text_width(&candidate, font, size) <= max_width {
            current = candidate;
            continue;
        }

        if !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }

        for c in word.chars() {
            current.push(c);
            if text_width(&current, font, size) > max_width && current.chars().count() > 1 {
                current.pop();
                lines.push(std::mem::take(&mut current));
                current.push(c);
            }
        }
    }

    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut short: String = text.chars().take(max_chars - 3).collect();
        short.push_str("...");
        short
    }
}

/// WinAnsi bytes; characters outside Latin-1 become '?'
fn encode_text(text: &str) -> Object {
    let bytes = text
        .chars()
        .map(|c| match c as u32 {
            code @ 0x20..=0x7e | code @ 0xa0..=0xff => code as u8,
            _ => b'?',
        })
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

// ========================================
// Drawing primitives
// ========================================

fn text_ops(font: Font, size: f32, x: f32, y: f32, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.resource().into(), size.into()]),
        Operation::new("Td", vec![x.into(), y.into()]),
        Operation::new("Tj", vec![encode_text(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn rotated_text_ops(size: f32, x: f32, y: f32, degrees: f32, text: &str) -> Vec<Operation> {
    let (sin, cos) = degrees.to_radians().sin_cos();
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![Font::Regular.resource().into(), size.into()]),
        Operation::new(
            "Tm",
            vec![
                cos.into(),
                sin.into(),
                (-sin).into(),
                cos.into(),
                x.into(),
                y.into(),
            ],
        ),
        Operation::new("Tj", vec![encode_text(text)]),
        Operation::new("ET", vec![]),
    ]
}

fn line_ops(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<Operation> {
    vec![
        Operation::new("m", vec![x1.into(), y1.into()]),
        Operation::new("l", vec![x2.into(), y2.into()]),
        Operation::new("S", vec![]),
    ]
}

fn chart_ops(chart: &BarChart, left: f32, bottom: f32) -> Vec<Operation> {
    let x0 = left + PLOT_OFFSET;
    let y0 = bottom + PLOT_OFFSET;
    let max = chart.axis_max();
    let mut ops = vec![
        Operation::new("q", vec![]),
        Operation::new("w", vec![0.5_f32.into()]),
        Operation::new("RG", vec![0.into(), 0.into(), 0.into()]),
    ];

    // Value axis, 0..=max in steps of 1, thinned to about MAX_TICKS labels
    let step = max.div_ceil(MAX_TICKS).max(1);
    ops.extend(line_ops(x0, y0, x0, y0 + PLOT_HEIGHT));
    for value in (0..=max).step_by(step) {
        let y = y0 + PLOT_HEIGHT * value as f32 / max as f32;
        let label = value.to_string();
        ops.extend(line_ops(x0 - 3.0, y, x0, y));
        ops.extend(text_ops(
            Font::Regular,
            8.0,
            x0 - 6.0 - text_width(&label, Font::Regular, 8.0),
            y - 3.0,
            &label,
        ));
    }

    // Category axis
    ops.extend(line_ops(x0, y0, x0 + PLOT_WIDTH, y0));

    let slots = chart.values.len().max(1) as f32;
    let slot = PLOT_WIDTH / slots;
    let bar_width = slot * 0.6;
    ops.push(Operation::new("rg", vec![0.3_f32.into(), 0.5_f32.into(), 0.7_f32.into()]));
    for (index, value) in chart.values.iter().enumerate() {
        let height = PLOT_HEIGHT * *value as f32 / max as f32;
        let x = x0 + slot * index as f32 + (slot - bar_width) / 2.0;
        if height > 0.0 {
            ops.push(Operation::new(
                "re",
                vec![x.into(), y0.into(), bar_width.into(), height.into()],
            ));
            ops.push(Operation::new("f", vec![]));
        }
    }

    ops.push(Operation::new("rg", vec![0.into(), 0.into(), 0.into()]));
    for (index, label) in chart.labels.iter().enumerate() {
        let center = x0 + slot * index as f32 + slot / 2.0;
        ops.extend(rotated_text_ops(
            8.0,
            center - 4.0,
            y0 - 12.0,
            30.0,
            &truncate(label, MAX_LABEL_CHARS),
        ));
    }

    ops.push(Operation::new("Q", vec![]));
    ops
}

// ========================================
// Layout
// ========================================

struct Layout<'a> {
    pages: Vec<Vec<Operation>>,
    cursor: f32,
    /// Nothing drawn on the current page yet
    fresh: bool,
    toc: Vec<TocEntry>,
    toc_source: &'a [TocEntry],
}

impl<'a> Layout<'a> {
    fn run(meta: &PdfMeta, flowables: &[Flowable], toc_source: &'a [TocEntry]) -> Self {
        let mut layout = Layout {
            pages: vec![title_page_ops(meta)],
            cursor: TOP,
            fresh: false,
            toc: Vec::new(),
            toc_source,
        };

        for flowable in flowables {
            layout.place(flowable);
        }

        // Drop a trailing empty page left by a final page break
        if layout.fresh && layout.pages.len() > 1 {
            layout.pages.pop();
        }

        layout
    }

    fn page_number(&self) -> usize {
        self.pages.len()
    }

    fn new_page(&mut self) {
        self.pages.push(Vec::new());
        self.cursor = TOP;
        self.fresh = true;
    }

    /// Start a new page unless `height` still fits on this one
    fn reserve(&mut self, height: f32) {
        if self.cursor - height < BOTTOM && !self.fresh {
            self.new_page();
        }
    }

    fn draw(&mut self, ops: Vec<Operation>) {
        if let Some(page) = self.pages.last_mut() {
            page.extend(ops);
        }
        self.fresh = false;
    }

    fn text_line(&mut self, font: Font, size: f32, x: f32, text: &str) {
        let height = size * LEADING;
        self.reserve(height);
        self.cursor -= height;
        self.draw(text_ops(font, size, x, self.cursor + size * 0.25, text));
    }

    fn place(&mut self, flowable: &Flowable) {
        match flowable {
            Flowable::Heading { level, text } => self.heading(*level, text),
            Flowable::Paragraph(text) => {
                for line in wrap(text, Font::Regular, BODY_SIZE, CONTENT_WIDTH) {
                    self.text_line(Font::Regular, BODY_SIZE, MARGIN, &line);
                }
                self.cursor -= BODY_SIZE * 0.4;
            }
            Flowable::Spacer(height) => {
                self.cursor = (self.cursor - height).max(BOTTOM);
            }
            Flowable::BarChart(chart) => {
                self.reserve(CHART_HEIGHT);
                self.cursor -= CHART_HEIGHT;
                let ops = chart_ops(chart, MARGIN + (CONTENT_WIDTH - CHART_WIDTH) / 2.0, self.cursor);
                self.draw(ops);
            }
            Flowable::PageBreak => {
                if !self.fresh {
                    self.new_page();
                }
            }
            Flowable::TableOfContents => self.table_of_contents(),
        }
    }

    fn heading(&mut self, level: u8, text: &str) {
        let size = match level {
            1 => 18.0,
            2 => 14.0,
            _ => 12.0,
        };

        // Keep the heading together with at least one body line
        self.reserve(size * 1.6 + BODY_SIZE * LEADING * 2.0);
        if !self.fresh {
            self.cursor -= size * 0.6;
        }

        if level <= 2 {
            self.toc.push(TocEntry {
                level,
                text: text.to_string(),
                page: self.page_number(),
            });
        }

        for line in wrap(text, Font::Bold, size, CONTENT_WIDTH) {
            self.text_line(Font::Bold, size, MARGIN, &line);
        }
        self.cursor -= size * 0.3;
    }

    fn table_of_contents(&mut self) {
        self.text_line(Font::Bold, 18.0, MARGIN, "Table of Contents");
        self.cursor -= 8.0;

        for entry in self.toc_source {
            let indent = if entry.level == 1 { 0.0 } else { 20.0 };
            let page = if entry.page == 0 {
                String::new()
            } else {
                entry.page.to_string()
            };
            let page_x = PAGE_WIDTH - MARGIN - text_width(&page, Font::Regular, BODY_SIZE);

            let available = CONTENT_WIDTH - indent - 40.0;
            let mut text = entry.text.clone();
            while text_width(&text, Font::Regular, BODY_SIZE) > available && text.chars().count() > 4
            {
                let keep = text.chars().count() - 4;
                text = format!("{}...", text.chars().take(keep).collect::<String>());
            }

            self.text_line(Font::Regular, BODY_SIZE, MARGIN + indent, &text);
            let y = self.cursor + BODY_SIZE * 0.25;
            self.draw(text_ops(Font::Regular, BODY_SIZE, page_x, y, &page));
        }
    }
}

fn title_page_ops(meta: &PdfMeta) -> Vec<Operation> {
    let mut ops = Vec::new();

    let title_size = 64.0;
    let mut y = PAGE_HEIGHT * 2.0 / 3.0;
    for line in wrap(&meta.title, Font::Bold, title_size, CONTENT_WIDTH) {
        let x = (PAGE_WIDTH - text_width(&line, Font::Bold, title_size)) / 2.0;
        ops.extend(text_ops(Font::Bold, title_size, x.max(MARGIN), y, &line));
        y -= title_size * 1.1;
    }

    if !meta.subtitle.is_empty() {
        let size = 16.0;
        let mut y = PAGE_HEIGHT / 3.0;
        for line in wrap(&meta.subtitle, Font::Regular, size, CONTENT_WIDTH) {
            let x = (PAGE_WIDTH - text_width(&line, Font::Regular, size)) / 2.0;
            ops.extend(text_ops(Font::Regular, size, x.max(MARGIN), y, &line));
            y -= size * LEADING;
        }
    }

    ops
}

// ========================================
// Document assembly
// ========================================

fn write_document(meta: &PdfMeta, pages: Vec<Vec<Operation>>) -> Result<Vec<u8>, ReportError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular_id = doc.add_object(font_dictionary("Times-Roman"));
    let bold_id = doc.add_object(font_dictionary("Times-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular_id,
            "F2" => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for (index, mut operations) in pages.into_iter().enumerate() {
        let number = index + 1;
        if number > 1 {
            let footer = format!("Page {} {}", number, meta.title);
            operations.extend(text_ops(Font::Regular, 9.0, MARGIN, FOOTER_Y, &footer));
        }

        let content = Content { operations };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id: ObjectId = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => encode_text(&meta.title),
        "Author" => encode_text(&meta.author),
        "Subject" => encode_text(&meta.subject),
        "Creator" => encode_text("epic-server"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn font_dictionary(base_font: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base_font,
        "Encoding" => "WinAnsiEncoding",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> PdfMeta {
        PdfMeta {
            title: "Epic Report".into(),
            subtitle: "Quarterly".into(),
            author: "alice".into(),
            subject: "Survey answers".into(),
        }
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "word ".repeat(200);
        let lines = wrap(&text, Font::Regular, BODY_SIZE, CONTENT_WIDTH);

        assert!(lines.len() > 1);
        assert!(lines
            .iter()
            .all(|l| text_width(l, Font::Regular, BODY_SIZE) <= CONTENT_WIDTH));
    }

    #[test]
    fn test_wrap_splits_long_words() {
        let lines = wrap(&"x".repeat(500), Font::Regular, BODY_SIZE, 100.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat().len(), 500);
    }

    #[test]
    fn test_encode_text_replaces_unsupported_chars() {
        assert_eq!(
            encode_text("café ✓"),
            Object::String(b"caf\xe9 ?".to_vec(), StringFormat::Literal)
        );
    }

    #[test]
    fn test_truncate_labels() {
        assert_eq!(truncate("short", 24), "short");
        assert_eq!(truncate(&"a".repeat(30), 24).chars().count(), 24);
    }

    #[test]
    fn test_toc_page_numbers_point_at_headings() {
        let flowables = vec![
            Flowable::PageBreak,
            Flowable::TableOfContents,
            Flowable::PageBreak,
            Flowable::Heading {
                level: 1,
                text: "First".into(),
            },
            Flowable::PageBreak,
            Flowable::Heading {
                level: 1,
                text: "Second".into(),
            },
            Flowable::Heading {
                level: 3,
                text: "Not listed".into(),
            },
        ];

        let layout = Layout::run(&meta(), &flowables, &[]);
        let pages: Vec<(&str, usize)> = layout
            .toc
            .iter()
            .map(|e| (e.text.as_str(), e.page))
            .collect();
        assert_eq!(pages, vec![("First", 3), ("Second", 4)]);
        assert_eq!(layout.pages.len(), 4);
    }

    #[test]
    fn test_long_paragraph_overflows_onto_new_pages() {
        let flowables = vec![
            Flowable::PageBreak,
            Flowable::Paragraph("lorem ipsum ".repeat(2000)),
        ];

        let layout = Layout::run(&meta(), &flowables, &[]);
        assert!(layout.pages.len() > 3);
    }

    #[test]
    fn test_render_produces_loadable_pdf() {
        let flowables = vec![
            Flowable::Spacer(36.0),
            Flowable::PageBreak,
            Flowable::TableOfContents,
            Flowable::PageBreak,
            Flowable::Heading {
                level: 1,
                text: "Program: Alpha".into(),
            },
            Flowable::Paragraph("No recorded answers.".into()),
            Flowable::BarChart(BarChart {
                labels: vec!["Y".into(), "N".into()],
                values: vec![3, 1],
            }),
        ];

        let bytes = render_pdf(&meta(), &flowables).unwrap();
        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert!(contains(&bytes, b"(No recorded answers.)"));
        assert!(contains(&bytes, b"(Page 2 Epic Report)"));
        assert!(contains(&bytes, b"Times-Bold"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
    }
}
