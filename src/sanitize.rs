/// Normalise transcript text before it reaches measurement or drawing.
///
/// Control characters (other than newline and tab) and zero-width marks are
/// dropped, Latin ligatures are expanded, typographic punctuation is folded to
/// ASCII and full-width alphanumerics are converted to their half-width forms.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\n' | '\t' => out.push(ch),
            '\u{0000}'..='\u{001F}' | '\u{007F}'..='\u{009F}' => {}
            '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}' => {}
            '\u{FB00}' => out.push_str("ff"),
            '\u{FB01}' => out.push_str("fi"),
            '\u{FB02}' => out.push_str("fl"),
            '\u{FB03}' => out.push_str("ffi"),
            '\u{FB04}' => out.push_str("ffl"),
            '\u{FB05}' | '\u{FB06}' => out.push_str("st"),
            '\u{00C6}' => out.push_str("AE"),
            '\u{00E6}' => out.push_str("ae"),
            '\u{0152}' => out.push_str("OE"),
            '\u{0153}' => out.push_str("oe"),
            '\u{00DF}' => out.push_str("ss"),
            '\u{1E9E}' => out.push_str("SS"),
            '\u{201C}' | '\u{201D}' | '\u{2033}' => out.push('"'),
            '\u{2018}' | '\u{2019}' | '\u{2032}' => out.push('\''),
            '\u{2014}' => out.push_str("--"),
            '\u{2013}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{2022}' => out.push('\u{00B7}'),
            '\u{2217}' | '\u{2731}' | '\u{2732}' | '\u{2605}' | '\u{2606}' => out.push('*'),
            '\u{2795}' | '\u{FF0B}' => out.push('+'),
            '\u{FF10}'..='\u{FF19}' | '\u{FF21}'..='\u{FF3A}' | '\u{FF41}'..='\u{FF5A}' => {
                out.push(char::from_u32(ch as u32 - 0xFEE0).unwrap_or(ch));
            }
            '\u{3000}' => out.push(' '),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::clean_text;

    #[test]
    fn strips_controls_and_zero_width() {
        assert_eq!(clean_text("a\u{0007}b\u{200B}c\u{FEFF}"), "abc");
        assert_eq!(clean_text("line\n\tnext"), "line\n\tnext");
    }

    #[test]
    fn folds_typography() {
        assert_eq!(clean_text("\u{201C}hi\u{201D} \u{2014} ok\u{2026}"), "\"hi\" -- ok...");
        assert_eq!(clean_text("\u{FB01}le \u{00E6}"), "file ae");
        assert_eq!(clean_text("\u{FF21}\u{FF42}\u{FF13}\u{3000}x"), "Ab3 x");
    }

    #[test]
    fn leaves_cjk_alone() {
        assert_eq!(clean_text("你好，世界"), "你好，世界");
    }
}
