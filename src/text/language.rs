//! Coarse script detection: is this text predominantly Chinese?

/// Detected language family. Only the CJK distinction matters to the
/// joining and spacing rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    Chinese,
    #[default]
    Other,
}

impl Language {
    pub fn is_cjk(self) -> bool {
        self == Language::Chinese
    }
}

/// CJK unified ideographs, extension A, and compatibility ideographs.
pub fn is_cjk_char(c: char) -> bool {
    matches!(c,
        '\u{4E00}'..='\u{9FFF}' | '\u{3400}'..='\u{4DBF}' | '\u{F900}'..='\u{FAFF}')
}

/// Chinese when ideographs make up at least 30% of alphabetic characters.
pub fn detect(text: &str) -> Language {
    let mut cjk = 0usize;
    let mut letters = 0usize;
    for c in text.chars() {
        if is_cjk_char(c) {
            cjk += 1;
            letters += 1;
        } else if c.is_alphabetic() {
            letters += 1;
        }
    }
    if letters > 0 && cjk * 10 >= letters * 3 {
        Language::Chinese
    } else {
        Language::Other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_chinese() {
        assert_eq!(detect("第一章 总则 本办法适用于"), Language::Chinese);
        assert_eq!(detect("PDF 文档解析器"), Language::Chinese);
    }

    #[test]
    fn detects_other() {
        assert_eq!(detect("The quick brown fox"), Language::Other);
        assert_eq!(detect("12345"), Language::Other);
        assert_eq!(detect(""), Language::Other);
    }
}
