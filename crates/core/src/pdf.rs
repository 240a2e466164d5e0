//! PDF rendering of reports and consent forms.
//!
//! Documents are first laid out as a flat list of [`Block`]s, then drawn onto
//! US Letter pages with the PDF base-14 Helvetica faces. Text is wrapped by an
//! average glyph width, which is close enough for Helvetica body text.

use crate::error::{CaseError, CaseResult};
use crate::export::{
    scores_line, text_fields, CHAT_TITLE, REPORT_TITLE, VISUALISATIONS_NOTE, VISUALISATIONS_TITLE,
};
use crate::report::Report;
use printpdf::{
    BuiltinFont, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference, PdfLayerReference,
    Point,
};

const PAGE_WIDTH_MM: f32 = 215.9;
const PAGE_HEIGHT_MM: f32 = 279.4;
const MARGIN_MM: f32 = 18.0;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica advance as a fraction of the font size.
const AVG_GLYPH_EM: f32 = 0.55;
const LAYER: &str = "Layer 1";

/// One unit of document layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Title(String),
    Heading(String),
    Paragraph(String),
    Bullet(String),
    Chat { role: String, content: String },
    Rule,
    PageBreak,
}

/// Lays out a report in the same order as the Markdown rendering.
pub fn report_blocks(report: &Report) -> Vec<Block> {
    let mut blocks = vec![Block::Title(REPORT_TITLE.into())];

    for (heading, body) in text_fields(report) {
        push_section(&mut blocks, heading, &body);
    }

    let assessment = &report.assessment;
    blocks.push(Block::Heading("Ethical Coherence Analysis".into()));
    blocks.push(Block::Paragraph(format!("Severity level: {}", assessment.severity)));
    blocks.extend(assessment.warnings.iter().map(|w| Block::Bullet(w.clone())));
    if !assessment.recommendations.is_empty() {
        blocks.push(Block::Paragraph(format!(
            "Recommendations: {}",
            assessment.recommendations.join(" ")
        )));
    }

    blocks.push(Block::Heading("Multi-perspective Analysis".into()));
    for (stakeholder, scores) in report.perspectives.iter() {
        blocks.push(Block::Paragraph(format!(
            "{}: {}",
            stakeholder.label(),
            scores_line(scores)
        )));
    }

    push_section(&mut blocks, "Deliberative Analysis (AI)", &report.deliberative_analysis);

    blocks.push(Block::PageBreak);
    blocks.push(Block::Title(VISUALISATIONS_TITLE.into()));
    blocks.push(Block::Paragraph(VISUALISATIONS_NOTE.into()));

    if !report.chat_history.is_empty() {
        blocks.push(Block::PageBreak);
        blocks.push(Block::Title(CHAT_TITLE.into()));
        blocks.extend(report.chat_history.iter().map(|message| Block::Chat {
            role: message.role.to_string(),
            content: message.content.trim().to_string(),
        }));
    }

    blocks
}

fn push_section(blocks: &mut Vec<Block>, heading: &str, body: &str) {
    if body.trim().is_empty() {
        return;
    }
    blocks.push(Block::Heading(heading.into()));
    blocks.extend(body.trim().lines().map(|line| Block::Paragraph(line.to_string())));
}

/// Lays out consent text line by line.
///
/// Dash-only lines become rules, upper-case lines become headings (the one
/// naming the consent becomes the title) and everything else is body text.
pub fn consent_blocks(text: &str) -> Vec<Block> {
    text.trim_matches('\n')
        .lines()
        .map(|line| {
            let trimmed = line.trim();
            if !trimmed.is_empty() && trimmed.chars().all(|c| c == '-') {
                Block::Rule
            } else if is_upper_case(trimmed) && !trimmed.starts_with('-') {
                if trimmed.contains("CONSENT") {
                    Block::Title(trimmed.into())
                } else {
                    Block::Heading(trimmed.into())
                }
            } else {
                Block::Paragraph(line.trim_end().into())
            }
        })
        .collect()
}

fn is_upper_case(line: &str) -> bool {
    line.chars().any(char::is_alphabetic)
        && line
            .chars()
            .filter(|c| c.is_alphabetic())
            .all(char::is_uppercase)
}

/// Greedy word wrap to `max_chars` columns; over-long words are split.
pub(crate) fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();
        while word.len() > max_chars {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(max_chars);
            lines.push(word.into_iter().collect());
            word = rest;
        }
        let needed = if current_len == 0 { word.len() } else { current_len + 1 + word.len() };
        if needed > max_chars && current_len > 0 {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }
    if current_len > 0 || lines.is_empty() {
        lines.push(current);
    }
    lines
}

/// Maps text into what the base-14 fonts can show (Latin-1).
pub(crate) fn pdf_safe(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => out.push(' '),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2013}' | '\u{2014}' | '\u{2022}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            c if c.is_control() => {}
            c if (c as u32) <= 0xFF => out.push(c),
            _ => out.push('?'),
        }
    }
    out
}

#[derive(Clone, Copy)]
enum Face {
    Regular,
    Bold,
    Oblique,
}

struct PageWriter {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    oblique: IndirectFontRef,
    /// Baseline of the next line, in mm from the page bottom.
    y: f32,
}

fn pdf_error(err: printpdf::Error) -> CaseError {
    CaseError::Pdf(err.to_string())
}

impl PageWriter {
    fn new(title: &str) -> CaseResult<Self> {
        let (doc, page, layer) =
            PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;
        let oblique = doc
            .add_builtin_font(BuiltinFont::HelveticaOblique)
            .map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            oblique,
            y: PAGE_HEIGHT_MM - MARGIN_MM,
        })
    }

    fn at_page_top(&self) -> bool {
        self.y >= PAGE_HEIGHT_MM - MARGIN_MM
    }

    fn new_page(&mut self) {
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), LAYER);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT_MM - MARGIN_MM;
    }

    fn space(&mut self, mm: f32) {
        if !self.at_page_top() {
            self.y -= mm;
        }
    }

    fn text(&mut self, text: &str, size: f32, face: Face, indent: f32) {
        let leading = size * PT_TO_MM * 1.4;
        let usable = PAGE_WIDTH_MM - 2.0 * MARGIN_MM - indent;
        let max_chars = (usable / (size * PT_TO_MM * AVG_GLYPH_EM)) as usize;
        let font = match face {
            Face::Regular => &self.regular,
            Face::Bold => &self.bold,
            Face::Oblique => &self.oblique,
        }
        .clone();

        for line in wrap(&pdf_safe(text), max_chars) {
            if self.y - leading < MARGIN_MM {
                self.new_page();
            }
            self.y -= leading;
            self.layer
                .use_text(line, size, Mm(MARGIN_MM + indent), Mm(self.y), &font);
        }
    }

    fn rule(&mut self) {
        if self.y - 4.0 < MARGIN_MM {
            self.new_page();
        }
        self.y -= 2.0;
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN_MM), Mm(self.y)), false),
                (Point::new(Mm(PAGE_WIDTH_MM - MARGIN_MM), Mm(self.y)), false),
            ],
            is_closed: false,
        });
        self.y -= 2.0;
    }

    fn block(&mut self, block: &Block) {
        match block {
            Block::Title(text) => {
                self.space(4.0);
                self.text(text, 16.0, Face::Bold, 0.0);
                self.space(5.0);
            }
            Block::Heading(text) => {
                self.space(4.0);
                self.text(text, 12.0, Face::Bold, 0.0);
                self.space(1.5);
            }
            Block::Paragraph(text) => {
                self.text(text, 10.0, Face::Regular, 0.0);
            }
            Block::Bullet(text) => {
                self.text(&format!("- {text}"), 10.0, Face::Regular, 4.0);
            }
            Block::Chat { role, content } => {
                self.text(&format!("{role}:"), 9.0, Face::Bold, 0.0);
                for line in content.lines() {
                    self.text(line, 9.0, Face::Oblique, 4.0);
                }
                self.space(2.0);
            }
            Block::Rule => self.rule(),
            Block::PageBreak => {
                if !self.at_page_top() {
                    self.new_page();
                }
            }
        }
    }

    fn finish(self) -> CaseResult<Vec<u8>> {
        self.doc.save_to_bytes().map_err(pdf_error)
    }
}

/// Draws blocks into a PDF document and returns its bytes.
pub fn render_blocks(title: &str, blocks: &[Block]) -> CaseResult<Vec<u8>> {
    let mut writer = PageWriter::new(title)?;
    for block in blocks {
        writer.block(block);
    }
    writer.finish()
}

pub fn render_report_pdf(report: &Report) -> CaseResult<Vec<u8>> {
    let title = format!("{REPORT_TITLE} {}", report.case_id);
    render_blocks(&title, &report_blocks(report))
}

pub fn render_consent_pdf(consent_text: &str) -> CaseResult<Vec<u8>> {
    render_blocks("Informed Consent", &consent_blocks(consent_text))
}
