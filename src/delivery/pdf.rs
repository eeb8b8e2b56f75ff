use printpdf::{BuiltinFont, Mm, PdfDocument};

use super::DeliveryError;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const DOCUMENT_TITLE: &str = "Executive Churn Report";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Body,
}

impl LineStyle {
    fn font_size(&self) -> f32 {
        match self {
            LineStyle::Title => 18.0,
            LineStyle::Heading => 13.0,
            LineStyle::Body => 10.5,
        }
    }

    fn leading_mm(&self) -> f32 {
        match self {
            LineStyle::Title => 10.0,
            LineStyle::Heading => 7.5,
            LineStyle::Body => 5.0,
        }
    }

    /// Approximate characters per line for Helvetica at this size.
    fn wrap_at(&self) -> usize {
        match self {
            LineStyle::Title => 50,
            LineStyle::Heading => 70,
            LineStyle::Body => 90,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    pub text: String,
    pub style: LineStyle,
}

/// Built-in PDF fonts only cover Latin-1, so typographic punctuation is
/// folded to ASCII and anything else outside the range becomes `?`.
fn fold_to_latin1(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' | '\u{2022}' => '-',
            c if (c as u32) < 0x100 => c,
            _ => '?',
        })
        .collect()
}

fn strip_inline_markup(text: &str) -> String {
    text.replace("**", "").replace("__", "").replace(['`', '*'], "")
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Flatten Markdown into styled, wrapped lines. Blank source lines are kept
/// as empty body lines so paragraphs stay separated.
pub fn layout(markdown: &str) -> Vec<Line> {
    let mut out = Vec::new();

    for raw in markdown.lines() {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            out.push(Line {
                text: String::new(),
                style: LineStyle::Body,
            });
            continue;
        }

        let hashes = trimmed.chars().take_while(|&c| c == '#').count();
        let (style, text) = match hashes {
            0 => match trimmed
                .strip_prefix("- ")
                .or_else(|| trimmed.strip_prefix("* "))
            {
                Some(item) => (LineStyle::Body, format!("- {item}")),
                None => (LineStyle::Body, trimmed.to_string()),
            },
            1 => (LineStyle::Title, trimmed[1..].trim().to_string()),
            _ => (LineStyle::Heading, trimmed[hashes..].trim().to_string()),
        };

        let text = fold_to_latin1(&strip_inline_markup(&text));
        for piece in wrap(&text, style.wrap_at()) {
            out.push(Line { text: piece, style });
        }
    }

    out
}

fn pdf_error(e: printpdf::Error) -> DeliveryError {
    DeliveryError::Pdf(e.to_string())
}

/// Render a Markdown report as an A4 PDF.
pub fn render_report_pdf(markdown: &str) -> Result<Vec<u8>, DeliveryError> {
    let (doc, page, layer) =
        PdfDocument::new(DOCUMENT_TITLE, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "text");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold).map_err(pdf_error)?;

    let mut canvas = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;
    let mut pages = 1;

    for line in layout(markdown) {
        let leading = line.style.leading_mm();
        if y - leading < MARGIN_MM {
            let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "text");
            canvas = doc.get_page(page).get_layer(layer);
            y = PAGE_HEIGHT_MM - MARGIN_MM;
            pages += 1;
        }
        y -= leading;

        if line.text.is_empty() {
            continue;
        }
        let font = match line.style {
            LineStyle::Body => &regular,
            LineStyle::Title | LineStyle::Heading => &bold,
        };
        canvas.use_text(line.text, line.style.font_size(), Mm(MARGIN_MM), Mm(y), font);
    }

    tracing::debug!(pages, "Report PDF rendered");
    doc.save_to_bytes().map_err(pdf_error)
}
