//! Text metrics for the standard Helvetica faces.
//!
//! Widths are the Adobe AFM advance widths (per 1000 em) for the printable
//! ASCII range. Anything else measures as a digit.

use super::surface::FontFace;

const FALLBACK_WIDTH: u16 = 556;

#[rustfmt::skip]
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' ' .. '/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,                               // '0' .. '9'
    278, 278, 584, 584, 584, 556, 1015,                                             // ':' .. '@'
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,                // 'A' .. 'M'
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,                // 'N' .. 'Z'
    278, 278, 278, 469, 556, 333,                                                   // '[' .. '`'
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,                // 'a' .. 'm'
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,                // 'n' .. 'z'
    334, 260, 334, 584,                                                             // '{' .. '~'
];

#[rustfmt::skip]
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

fn char_width(c: char, font: FontFace) -> u16 {
    let table = match font {
        FontFace::Regular => &HELVETICA,
        FontFace::Bold => &HELVETICA_BOLD,
    };
    let code = c as u32;
    if (32..=126).contains(&code) {
        table[(code - 32) as usize]
    } else {
        FALLBACK_WIDTH
    }
}

/// Advance width of `text` at `size` points.
pub fn text_width(text: &str, size: f64, font: FontFace) -> f64 {
    let units: u32 = text.chars().map(|c| u32::from(char_width(c, font))).sum();
    f64::from(units) * size / 1000.0
}

/// Greedy word wrap so each line fits `max_width` points. Words longer
/// than a line are kept whole on their own line.
pub fn wrap_text(text: &str, max_width: f64, size: f64, font: FontFace) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if !current.is_empty() && text_width(&candidate, size, font) > max_width {
                lines.push(std::mem::take(&mut current));
                current.push_str(word);
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Encode text for a WinAnsi-encoded standard font. Unmappable characters become '?'.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{a0}'..='\u{ff}' => c as u32 as u8,
            '€' => 0x80,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '…' => 0x85,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_uniform() {
        assert_eq!(text_width("0123456789", 10.0, FontFace::Regular), 55.6);
        assert_eq!(text_width("42", 10.0, FontFace::Bold), 11.12);
    }

    #[test]
    fn bold_is_wider_than_regular() {
        let text = "Total score";
        assert!(text_width(text, 10.0, FontFace::Bold) > text_width(text, 10.0, FontFace::Regular));
    }

    #[test]
    fn width_scales_with_size() {
        let w10 = text_width("Abc", 10.0, FontFace::Regular);
        let w20 = text_width("Abc", 20.0, FontFace::Regular);
        assert!((w20 - 2.0 * w10).abs() < 1e-9);
        assert_eq!(text_width("", 12.0, FontFace::Bold), 0.0);
    }

    #[test]
    fn wrap_respects_width() {
        let lines = wrap_text("the quick brown fox jumps over the lazy dog", 60.0, 9.0, FontFace::Regular);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, 9.0, FontFace::Regular) <= 60.0 || !line.contains(' '));
        }
        assert_eq!(lines.join(" "), "the quick brown fox jumps over the lazy dog");
    }

    #[test]
    fn wrap_keeps_explicit_newlines_and_empty_input() {
        assert_eq!(wrap_text("a\nb", 500.0, 9.0, FontFace::Regular), vec!["a", "b"]);
        assert_eq!(wrap_text("", 100.0, 9.0, FontFace::Regular), vec![String::new()]);
    }

    #[test]
    fn win_ansi_maps_latin1_and_punctuation() {
        assert_eq!(to_win_ansi("Aé"), vec![b'A', 0xe9]);
        assert_eq!(to_win_ansi("a–b"), vec![b'a', 0x96, b'b']);
        assert_eq!(to_win_ansi("✓"), vec![b'?']);
    }
}
