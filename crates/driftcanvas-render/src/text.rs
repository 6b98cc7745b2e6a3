//! Note text measurement and paragraph-aware word wrapping.

use ab_glyph::{Font, FontArc, GlyphId, ScaleFont};

/// Measures the advance width of a run of text at a font size.
pub trait TextMeasure {
    /// Width of `text` laid out on one line.
    fn width(&self, text: &str, size: f32) -> f32;

    /// Distance between consecutive baselines.
    fn line_height(&self, size: f32) -> f32 {
        size * 1.3
    }

    /// Distance from the top of a line to its baseline.
    fn ascent(&self, size: f32) -> f32 {
        size
    }
}

/// Every character advances by the same fraction of the font size.
///
/// Used when no font is loaded, and in tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvance {
    /// Advance per character, as a fraction of the font size.
    pub ratio: f32,
}

impl Default for FixedAdvance {
    fn default() -> Self {
        Self { ratio: 0.55 }
    }
}

impl TextMeasure for FixedAdvance {
    fn width(&self, text: &str, size: f32) -> f32 {
        text.chars().count() as f32 * size * self.ratio
    }
}

impl TextMeasure for FontArc {
    fn width(&self, text: &str, size: f32) -> f32 {
        let scaled = self.as_scaled(size);
        let mut width = 0.0;
        let mut last: Option<GlyphId> = None;
        for ch in text.chars() {
            let id = self.glyph_id(ch);
            if let Some(prev) = last {
                width += scaled.kern(prev, id);
            }
            width += scaled.h_advance(id);
            last = Some(id);
        }
        width
    }

    fn line_height(&self, size: f32) -> f32 {
        let scaled = self.as_scaled(size);
        scaled.height() + scaled.line_gap()
    }

    fn ascent(&self, size: f32) -> f32 {
        self.as_scaled(size).ascent()
    }
}

/// Wrap `text` to lines no wider than `max_width`.
///
/// Explicit newlines always start a new line and empty paragraphs are kept as
/// empty lines. Words wider than a full line are broken between characters.
pub fn wrap_text(text: &str, max_width: f32, size: f32, measure: &impl TextMeasure) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end_matches('\r');
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{line} {word}")
            };
            if measure.width(&candidate, size) <= max_width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if measure.width(word, size) <= max_width {
                line = word.to_string();
            } else {
                // Break an overlong word; the tail stays open for following words.
                for ch in word.chars() {
                    line.push(ch);
                    if line.chars().count() > 1 && measure.width(&line, size) > max_width {
                        line.pop();
                        lines.push(std::mem::replace(&mut line, ch.to_string()));
                    }
                }
            }
        }
        lines.push(line);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    // 10 units per character at size 10.
    const MEASURE: FixedAdvance = FixedAdvance { ratio: 1.0 };

    #[test]
    fn test_wraps_on_word_boundaries() {
        let lines = wrap_text("the quick brown fox", 100.0, 10.0, &MEASURE);
        assert_eq!(lines, vec!["the quick", "brown fox"]);
    }

    #[test]
    fn test_keeps_paragraphs_and_blank_lines() {
        let lines = wrap_text("first\n\nsecond line", 1000.0, 10.0, &MEASURE);
        assert_eq!(lines, vec!["first", "", "second line"]);
    }

    #[test]
    fn test_breaks_long_words() {
        let lines = wrap_text("abcdefghij xy", 40.0, 10.0, &MEASURE);
        assert_eq!(lines, vec!["abcd", "efgh", "ij", "xy"]);
    }

    #[test]
    fn test_empty_text_is_one_empty_line() {
        assert_eq!(wrap_text("", 50.0, 10.0, &MEASURE), vec![String::new()]);
    }
}
