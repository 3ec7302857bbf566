//! Minimal PDF 1.4 writer.
//!
//! Supports what printed business documents need: text in the standard
//! Helvetica faces (WinAnsi encoded), stroked lines and gray filled
//! rectangles, on any number of A4 pages. Content streams are left
//! uncompressed.

use std::fmt::Write as _;

pub const PAGE_WIDTH: f32 = 595.0;
pub const PAGE_HEIGHT: f32 = 842.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Regular,
    Bold,
}

impl Font {
    fn resource_name(self) -> &'static str {
        match self {
            Font::Regular => "F1",
            Font::Bold => "F2",
        }
    }

    fn base_font(self) -> &'static str {
        match self {
            Font::Regular => "Helvetica",
            Font::Bold => "Helvetica-Bold",
        }
    }
}

// Glyph advance widths (1/1000 em) for ASCII 32..=126.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    278, 278, 584, 584, 584, 556, 1015, // ':'..'@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    278, 278, 278, 469, 556, 333, // '['..'`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333,
    500, 278, 556, 500, 722, 500, 500, 500, // 'a'..'z'
    334, 260, 334, 584, // '{'..'~'
];

const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // '0'..'9'
    333, 333, 584, 584, 584, 611, 975, // ':'..'@'
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722,
    667, 611, 722, 667, 944, 667, 667, 611, // 'A'..'Z'
    333, 278, 333, 584, 556, 333, // '['..'`'
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389,
    556, 333, 611, 556, 778, 556, 556, 500, // 'a'..'z'
    389, 280, 389, 584, // '{'..'~'
];

const FALLBACK_WIDTH: u16 = 556;

fn glyph_width(ch: char, font: Font) -> u16 {
    let table = match font {
        Font::Regular => &HELVETICA_WIDTHS,
        Font::Bold => &HELVETICA_BOLD_WIDTHS,
    };
    match ch as u32 {
        c @ 32..=126 => table[(c - 32) as usize],
        _ => FALLBACK_WIDTH,
    }
}

/// Rendered width of `text` in points
pub fn text_width(text: &str, font: Font, size: f32) -> f32 {
    let units: u32 = text.chars().map(|c| u32::from(glyph_width(c, font))).sum();
    units as f32 * size / 1000.0
}

/// Greedy word wrap to `max_width`; words longer than a line are split.
pub fn wrap_text(text: &str, font: Font, size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
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

            // Hard-split a single word that does not fit on its own
            let mut piece = String::new();
            for ch in word.chars() {
                piece.push(ch);
                if text_width(&piece, font, size) > max_width && piece.chars().count() > 1 {
                    piece.pop();
                    lines.push(std::mem::take(&mut piece));
                    piece.push(ch);
                }
            }
            current = piece;
        }
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Map a char to its WinAnsiEncoding byte, `?` when unrepresentable
fn win_ansi(ch: char) -> u8 {
    match ch {
        ' '..='~' => ch as u8,
        '\u{A0}'..='\u{FF}' => ch as u32 as u8,
        '€' => 0x80,
        '‚' => 0x82,
        '„' => 0x84,
        '…' => 0x85,
        '‘' => 0x91,
        '’' => 0x92,
        '“' => 0x93,
        '”' => 0x94,
        '•' => 0x95,
        '–' => 0x96,
        '—' => 0x97,
        '™' => 0x99,
        '\t' => b' ',
        _ => b'?',
    }
}

/// PDF literal string body: delimiters escaped, non-ASCII as octal
fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match win_ansi(ch) {
            b'(' => out.push_str("\\("),
            b')' => out.push_str("\\)"),
            b'\\' => out.push_str("\\\\"),
            b @ 0x20..=0x7E => out.push(b as char),
            b => {
                let _ = write!(out, "\\{:03o}", b);
            }
        }
    }
    out
}

/// Drawing operations of one page (origin bottom-left, units in points)
#[derive(Debug, Default, Clone)]
pub struct Page {
    ops: String,
}

impl Page {
    pub fn text(&mut self, x: f32, y: f32, font: Font, size: f32, text: &str) {
        let _ = writeln!(
            self.ops,
            "BT /{} {:.1} Tf {:.2} {:.2} Td ({}) Tj ET",
            font.resource_name(),
            size,
            x,
            y,
            escape_text(text)
        );
    }

    /// Text whose right edge sits at `right`
    pub fn text_right(&mut self, right: f32, y: f32, font: Font, size: f32, text: &str) {
        let x = right - text_width(text, font, size);
        self.text(x, y, font, size, text);
    }

    pub fn line(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, width: f32) {
        let _ = writeln!(
            self.ops,
            "{:.2} w {:.2} {:.2} m {:.2} {:.2} l S",
            width, x1, y1, x2, y2
        );
    }

    /// Filled rectangle; `gray` from 0 (black) to 1 (white)
    pub fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, gray: f32) {
        let _ = writeln!(
            self.ops,
            "q {:.2} g {:.2} {:.2} {:.2} {:.2} re f Q",
            gray.clamp(0.0, 1.0),
            x,
            y,
            width,
            height
        );
    }
}

#[derive(Debug, Clone)]
pub struct PdfDocument {
    title: String,
    pages: Vec<Page>,
}

impl PdfDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pages: Vec::new(),
        }
    }

    /// Append a blank page and return it for drawing
    pub fn add_page(&mut self) -> &mut Page {
        let index = self.pages.len();
        self.pages.push(Page::default());
        &mut self.pages[index]
    }

    /// Last page, created when the document is still empty
    pub fn current_page(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }
        let index = self.pages.len() - 1;
        &mut self.pages[index]
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn page_mut(&mut self, index: usize) -> Option<&mut Page> {
        self.pages.get_mut(index)
    }

    /// Serialize the document. An empty document gets one blank page.
    pub fn render(mut self) -> Vec<u8> {
        if self.pages.is_empty() {
            self.pages.push(Page::default());
        }

        // Object layout: 1 catalog, 2 page tree, 3-4 fonts, 5 info,
        // then a (page, content) pair per page.
        let first_page_obj = 6;
        let mut objects: Vec<String> = Vec::new();

        let kids: Vec<String> = (0..self.pages.len())
            .map(|i| format!("{} 0 R", first_page_obj + i * 2))
            .collect();

        objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());
        objects.push(format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            self.pages.len()
        ));
        for font in [Font::Regular, Font::Bold] {
            objects.push(format!(
                "<< /Type /Font /Subtype /Type1 /BaseFont /{} /Encoding /WinAnsiEncoding >>",
                font.base_font()
            ));
        }
        objects.push(format!(
            "<< /Title ({}) /Producer (folio-backend) >>",
            escape_text(&self.title)
        ));

        for (i, page) in self.pages.iter().enumerate() {
            let content_obj = first_page_obj + i * 2 + 1;
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] \
                 /Resources << /Font << /F1 3 0 R /F2 4 0 R >> >> /Contents {} 0 R >>",
                PAGE_WIDTH, PAGE_HEIGHT, content_obj
            ));
            objects.push(format!(
                "<< /Length {} >>\nstream\n{}endstream",
                page.ops.len(),
                page.ops
            ));
        }

        let mut out: Vec<u8> = Vec::new();
        out.extend_from_slice(b"%PDF-1.4\n%\xE2\xE3\xCF\xD3\n");

        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(out.len());
            out.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }

        let xref_offset = out.len();
        let mut trailer = format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1);
        for offset in offsets {
            let _ = write!(trailer, "{:010} 00000 n \n", offset);
        }
        let _ = write!(
            trailer,
            "trailer\n<< /Size {} /Root 1 0 R /Info 5 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_offset
        );
        out.extend_from_slice(trailer.as_bytes());
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn as_text(bytes: &[u8]) -> String {
        String::from_utf8_lossy(bytes).into_owned()
    }

    #[test]
    fn escapes_delimiters_and_encodes_latin() {
        assert_eq!(escape_text("a (b) \\c"), "a \\(b\\) \\\\c");
        assert_eq!(escape_text("Café €"), "Caf\\351 \\200");
        assert_eq!(escape_text("✓"), "?");
    }

    #[test]
    fn measures_text() {
        // "Hi": H=722, i=222
        assert!((text_width("Hi", Font::Regular, 10.0) - 9.44).abs() < 0.001);
        assert!(text_width("Total", Font::Bold, 10.0) > text_width("Total", Font::Regular, 10.0));
    }

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_text(
            "the quick brown fox jumps over the lazy dog",
            Font::Regular,
            10.0,
            60.0,
        );
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, Font::Regular, 10.0) <= 60.0);
        }
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn splits_overlong_words_and_keeps_blank_lines() {
        let lines = wrap_text(&"W".repeat(40), Font::Regular, 10.0, 50.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), "W".repeat(40));

        let lines = wrap_text("one\n\ntwo", Font::Regular, 10.0, 200.0);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn renders_valid_structure() {
        let mut doc = PdfDocument::new("Test (doc)");
        let page = doc.add_page();
        page.text(50.0, 800.0, Font::Bold, 12.0, "Hello");
        page.line(50.0, 790.0, 545.0, 790.0, 0.5);
        doc.add_page().fill_rect(0.0, 0.0, 10.0, 10.0, 0.9);

        let bytes = doc.render();
        let text = as_text(&bytes);
        assert!(text.starts_with("%PDF-1.4"));
        assert!(text.trim_end().ends_with("%%EOF"));
        assert!(text.contains("/Count 2"));
        assert!(text.contains("(Hello) Tj"));
        assert!(text.contains("/Title (Test \\(doc\\))"));

        let startxref = text
            .rsplit("startxref\n")
            .next()
            .and_then(|rest| rest.lines().next())
            .and_then(|n| n.parse::<usize>().ok())
            .unwrap();
        assert!(bytes[startxref..].starts_with(b"xref"));

        // Every xref entry points at the start of its object
        let xref = &text[startxref..];
        for (i, entry) in xref.lines().skip(3).take(9).enumerate() {
            let offset: usize = entry[..10].parse().unwrap();
            let expected = format!("{} 0 obj", i + 1);
            assert!(bytes[offset..].starts_with(expected.as_bytes()), "object {}", i + 1);
        }
    }

    #[test]
    fn empty_document_has_one_page() {
        let text = as_text(&PdfDocument::new("Empty").render());
        assert!(text.contains("/Count 1"));
    }
}
