//! Numbering-scheme recognition for heading detection.
//!
//! A line is a "base title" when it starts with one of the ordered rules in
//! [`TITLE_RULES`] and survives the exclusion checks (percentages, long IDs,
//! decimals). The index of the matching rule is the numbering style: two
//! headings are only siblings when they were recognized by the same rule.

use std::cmp::Ordering;
use std::sync::LazyLock;

use regex::Regex;

/// Lines longer than this are not base titles (unless the cutoff is disabled).
pub const MAX_BASE_HEADING_LEN: usize = 40;
/// Keyword headings are short by nature.
pub const MAX_KEYWORD_HEADING_LEN: usize = 20;
/// Length cap for lines carrying a top-level marker such as a signature page.
pub const MAX_TOP_KEYWORD_HEADING_LEN: usize = 40;

/// Ordered heading rules. The position is the style discriminator.
const TITLE_RULES: [&str; 12] = [
    r"^目录",
    r"^\d+\.\d+\.\d+\.\d+",
    r"^\d+\.\d+\.\d+",
    r"^\d+\.\d+",
    r"^[\d.]+\s",
    r"^[\d.]{2,}",
    r"^[(（]*\d+[)）]*\s",
    r"^第[\d一二三四五六七八九十]+章",
    r"^第[\d一二三四五六七八九十]+条",
    r"^第[\d.]+条",
    r"^[(（][一二三四五六七八九十]+[)）]",
    r"^附件[\d一二三四五六七八九十]+",
];

static RE_TITLE_RULES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    TITLE_RULES
        .iter()
        .map(|rule| Regex::new(rule).unwrap())
        .collect()
});

static RE_ONLY_NUMBER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[\d.]+$").unwrap());
static RE_CHINESE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[一二三四五六七八九十]+").unwrap());
static RE_DOTTED_4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+\.\d+").unwrap());
static RE_DOTTED_3: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.\d+\.\d+").unwrap());
static RE_DOTTED_2: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+\.\d+").unwrap());
static RE_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());
static RE_DECIMALS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\.(\d+)").unwrap());

static RE_LEADING_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d+").unwrap());
static RE_PAREN_DIGITS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\(\d+\)").unwrap());
static RE_PAREN_ROMAN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\([ivx]+(,[ivx]+)?\)").unwrap());
static RE_PAREN_LETTER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\([a-z]\)").unwrap());

/// A successful base-title match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TitleMatch {
    /// The matched numbering prefix, e.g. `"1.2"` or `"第三章"`.
    pub prefix: String,
    /// Index of the rule that matched.
    pub rule: usize,
}

/// Check whether `text` starts with a recognized numbering prefix.
///
/// `max_len` caps the full line length in characters; `None` disables the
/// cutoff for callers that already trust the line is a heading.
pub fn is_base_title(text: &str, max_len: Option<usize>) -> Option<TitleMatch> {
    let text = text.replace('．', ".");
    for (rule, re) in RE_TITLE_RULES.iter().enumerate() {
        if let Some(m) = re.find(&text) {
            if passes_exclusions(m.as_str(), &text, max_len) {
                return Some(TitleMatch {
                    prefix: m.as_str().to_string(),
                    rule,
                });
            }
        }
    }
    None
}

fn passes_exclusions(prefix: &str, full: &str, max_len: Option<usize>) -> bool {
    let number = get_number_str(prefix);
    // Percentages near the start are data, not headings.
    if let Some(pos) = full.chars().position(|c| c == '%') {
        if pos < 10 {
            return false;
        }
    }
    if let Some(max) = max_len {
        if full.chars().count() > max {
            return false;
        }
    }
    // Years, IDs and other long bare numbers.
    if number.chars().count() >= 3 && number.chars().all(char::is_numeric) {
        return false;
    }
    if count_decimal_places(&number) >= 3 {
        return false;
    }
    !RE_ONLY_NUMBER.is_match(full)
}

fn count_decimal_places(text: &str) -> usize {
    RE_DECIMALS
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().chars().count())
        .unwrap_or(0)
}

/// Short line containing one of the configured keywords.
pub fn is_keyword_title(text: &str, keywords: &[String]) -> bool {
    if text.chars().count() > MAX_KEYWORD_HEADING_LEN {
        return false;
    }
    keywords
        .iter()
        .any(|k| !k.is_empty() && text.contains(k.as_str()))
}

/// Convert a Chinese numeral to its value.
///
/// 十/百/千 multiply the pending digit (a bare 十 counts as ten), 万/亿
/// close a section. 零 is a placeholder. Unknown characters are ignored.
pub fn chinese_to_arabic(text: &str) -> u64 {
    let mut total: u64 = 0;
    let mut section: u64 = 0;
    let mut digit: u64 = 0;
    for c in text.trim().chars() {
        match c {
            '零' => digit = 0,
            '一' => digit = 1,
            '二' | '两' => digit = 2,
            '三' => digit = 3,
            '四' => digit = 4,
            '五' => digit = 5,
            '六' => digit = 6,
            '七' => digit = 7,
            '八' => digit = 8,
            '九' => digit = 9,
            '十' | '百' | '千' => {
                let unit = match c {
                    '十' => 10,
                    '百' => 100,
                    _ => 1000,
                };
                section += digit.max(1) * unit;
                digit = 0;
            }
            '万' => {
                total += (section + digit).max(1) * 10_000;
                section = 0;
                digit = 0;
            }
            '亿' => {
                total = (total + section + digit).max(1) * 100_000_000;
                section = 0;
                digit = 0;
            }
            _ => {}
        }
    }
    total + section + digit
}

/// Extract the comparable number token from a heading prefix.
///
/// Chinese numerals win over Arabic ones; dotted numbers are returned with
/// their deepest form first. Falls back to the text itself.
pub fn get_number_str(text: &str) -> String {
    if let Some(m) = RE_CHINESE_RUN.find(text) {
        return chinese_to_arabic(m.as_str()).to_string();
    }
    for re in [&*RE_DOTTED_4, &*RE_DOTTED_3, &*RE_DOTTED_2, &*RE_DIGITS] {
        if let Some(m) = re.find(text) {
            return m.as_str().to_string();
        }
    }
    text.to_string()
}

/// Compare two number tokens segment-wise.
///
/// Returns `None` when they are incomparable: different segment counts,
/// differing non-last segments, or non-numeric segments. Two absent tokens
/// compare equal; one absent token is incomparable.
pub fn compare_number_str(a: Option<&str>, b: Option<&str>) -> Option<Ordering> {
    match (a, b) {
        (None, None) => Some(Ordering::Equal),
        (Some(a), Some(b)) => compare_tokens(a, b),
        _ => None,
    }
}

fn compare_tokens(a: &str, b: &str) -> Option<Ordering> {
    if a == b {
        return Some(Ordering::Equal);
    }
    let left: Vec<&str> = a.split('.').collect();
    let right: Vec<&str> = b.split('.').collect();
    if left.len() != right.len() {
        return None;
    }
    let last = left.len() - 1;
    for (i, (l, r)) in left.iter().zip(&right).enumerate() {
        let l: u64 = l.trim().parse().ok()?;
        let r: u64 = r.trim().parse().ok()?;
        if i == last {
            return Some(l.cmp(&r));
        }
        if l != r {
            return None;
        }
    }
    None
}

/// `(a)`..`(z)`, falling back to `(n)` past 26.
pub fn number_to_letter(n: usize) -> String {
    if (1..=26).contains(&n) {
        format!("({})", (b'a' + (n - 1) as u8) as char)
    } else {
        format!("({n})")
    }
}

/// Lowercase roman numeral in parentheses for 1..=100; tens and ones are
/// comma-joined when not a single symbol, e.g. `(xx,iii)`.
pub fn number_to_roman(n: usize) -> String {
    const ONES: [&str; 11] = ["", "i", "ii", "iii", "iv", "v", "vi", "vii", "viii", "ix", "x"];
    const TENS: [&str; 11] = [
        "", "x", "xx", "xxx", "xl", "l", "lx", "lxx", "lxxx", "xc", "c",
    ];
    match n {
        1..=10 => format!("({})", ONES[n]),
        11..=100 if n % 10 == 0 => format!("({})", TENS[n / 10]),
        11..=99 => format!("({},{})", TENS[n / 10], ONES[n % 10]),
        _ => format!("({n})"),
    }
}

/// Next numbering style below `parent`: digit, `(n)`, `(letter)`, `(roman)`,
/// then `*` for anything deeper.
pub fn calc_index_by_level(parent: &str, n: usize) -> String {
    if parent.is_empty() {
        n.to_string()
    } else if RE_LEADING_DIGITS.is_match(parent) {
        format!("({n})")
    } else if RE_PAREN_DIGITS.is_match(parent) {
        number_to_letter(n)
    } else if RE_PAREN_ROMAN.is_match(parent) {
        "*".to_string()
    } else if RE_PAREN_LETTER.is_match(parent) {
        number_to_roman(n)
    } else {
        "*".to_string()
    }
}

/// Leading index token of a heading (up to the first space).
pub fn get_index_str(text: &str) -> &str {
    text.split(' ').next().unwrap_or(text)
}

/// Number of non-empty dot segments in the heading's index token.
pub fn get_index_level(text: &str) -> usize {
    get_index_str(text)
        .split('.')
        .filter(|s| !s.is_empty())
        .count()
}

/// Numbering segments carried by a heading's own text, e.g. `["2", "3"]`
/// for `"2.3 Scope"`. Empty when the text is not a base title.
pub fn get_real_index(text: &str) -> Vec<String> {
    if is_base_title(text, None).is_none() {
        return Vec::new();
    }
    let token = get_index_str(text);
    let segments: Vec<String> = token
        .split('.')
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect();
    if segments.len() > 1 {
        segments
    } else {
        vec![get_number_str(token)]
    }
}

/// Synthesized index markers produced by [`calc_index_by_level`].
pub fn is_synthesized_marker(token: &str) -> bool {
    token == "*"
        || RE_PAREN_DIGITS.is_match(token)
        || RE_PAREN_ROMAN.is_match(token)
        || RE_PAREN_LETTER.is_match(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dotted_numbers_are_titles() {
        let m = is_base_title("1.2 Background", Some(MAX_BASE_HEADING_LEN)).unwrap();
        assert_eq!(m.prefix, "1.2");
        assert_eq!(m.rule, 3);

        let m = is_base_title("1.2.3.4 Deep", None).unwrap();
        assert_eq!(m.rule, 1);

        let m = is_base_title("1. 概述", None).unwrap();
        assert_eq!(m.rule, 4);
    }

    #[test]
    fn chinese_markers_are_titles() {
        assert_eq!(is_base_title("第三章 总则", None).unwrap().rule, 7);
        assert_eq!(is_base_title("第十一条 定义", None).unwrap().rule, 8);
        assert_eq!(is_base_title("（二）适用范围", None).unwrap().rule, 10);
        assert_eq!(is_base_title("附件一 说明", None).unwrap().rule, 11);
        assert_eq!(is_base_title("目录", None).unwrap().rule, 0);
    }

    #[test]
    fn fullwidth_period_is_normalized() {
        let m = is_base_title("2．1 范围", None).unwrap();
        assert_eq!(m.prefix, "2.1");
    }

    #[test]
    fn exclusions() {
        // percentage at the start
        assert!(is_base_title("12.5% of revenue", None).is_none());
        // bare number
        assert!(is_base_title("3.14", None).is_none());
        // long number such as a year
        assert!(is_base_title("2023 annual report", None).is_none());
        // three decimal places
        assert!(is_base_title("1.234 kg of flour", None).is_none());
        // too long for the cutoff, fine without it
        let long = format!("1.1 {}", "x".repeat(60));
        assert!(is_base_title(&long, Some(MAX_BASE_HEADING_LEN)).is_none());
        assert!(is_base_title(&long, None).is_some());
    }

    #[test]
    fn plain_text_is_not_a_title() {
        assert!(is_base_title("The quick brown fox", None).is_none());
        assert!(is_base_title("", None).is_none());
    }

    #[test]
    fn keyword_titles() {
        let keywords = vec!["Definitions".to_string()];
        assert!(is_keyword_title("Definitions", &keywords));
        assert!(!is_keyword_title(
            "Definitions used throughout this long agreement",
            &keywords
        ));
        assert!(!is_keyword_title("Scope", &keywords));
        assert!(!is_keyword_title("Scope", &[String::new()]));
    }

    #[test]
    fn chinese_numerals() {
        assert_eq!(chinese_to_arabic("一"), 1);
        assert_eq!(chinese_to_arabic("十"), 10);
        assert_eq!(chinese_to_arabic("十一"), 11);
        assert_eq!(chinese_to_arabic("二十"), 20);
        assert_eq!(chinese_to_arabic("五十九"), 59);
        assert_eq!(chinese_to_arabic("一百零五"), 105);
        assert_eq!(chinese_to_arabic("三千二百"), 3200);
        assert_eq!(chinese_to_arabic("三万二千"), 32_000);
    }

    #[test]
    fn number_tokens() {
        assert_eq!(get_number_str("第十一条"), "11");
        assert_eq!(get_number_str("附件二"), "2");
        assert_eq!(get_number_str("(1)"), "1");
        assert_eq!(get_number_str("1.2"), "1.2");
        assert_eq!(get_number_str("1.2.3.4"), "1.2.3.4");
        assert_eq!(get_number_str("1. "), "1");
        assert_eq!(get_number_str("abc"), "abc");
    }

    #[test]
    fn comparing_tokens() {
        assert_eq!(compare_number_str(Some("2"), Some("1")), Some(Ordering::Greater));
        assert_eq!(compare_number_str(Some("1"), Some("2")), Some(Ordering::Less));
        assert_eq!(compare_number_str(Some("19"), Some("2")), Some(Ordering::Greater));
        assert_eq!(compare_number_str(Some("1.1"), Some("1")), None);
        assert_eq!(compare_number_str(Some("1.2"), Some("1.5")), Some(Ordering::Less));
        assert_eq!(compare_number_str(Some("1.2"), Some("2.5")), None);
        assert_eq!(compare_number_str(Some("a"), Some("b")), None);
        assert_eq!(compare_number_str(None, None), Some(Ordering::Equal));
        assert_eq!(compare_number_str(Some("1"), None), None);
    }

    #[test]
    fn index_by_level_chain() {
        assert_eq!(calc_index_by_level("", 3), "3");
        assert_eq!(calc_index_by_level("1.2.3", 2), "(2)");
        assert_eq!(calc_index_by_level("(2)", 3), "(c)");
        assert_eq!(calc_index_by_level("(c)", 4), "(iv)");
        assert_eq!(calc_index_by_level("(iv)", 1), "*");
        assert_eq!(calc_index_by_level("*", 1), "*");
    }

    #[test]
    fn roman_and_letters() {
        assert_eq!(number_to_roman(9), "(ix)");
        assert_eq!(number_to_roman(20), "(xx)");
        assert_eq!(number_to_roman(23), "(xx,iii)");
        assert_eq!(number_to_roman(101), "(101)");
        assert_eq!(number_to_letter(1), "(a)");
        assert_eq!(number_to_letter(27), "(27)");
    }

    #[test]
    fn real_index() {
        assert_eq!(get_real_index("2.3 Scope"), vec!["2", "3"]);
        assert_eq!(get_real_index("1. 概述"), vec!["1"]);
        assert_eq!(get_real_index("第三章 总则"), vec!["3"]);
        assert!(get_real_index("Introduction").is_empty());
        assert_eq!(get_index_level("1.2 x"), 2);
        assert_eq!(get_index_level("1."), 1);
    }

    #[test]
    fn synthesized_markers() {
        assert!(is_synthesized_marker("(3)"));
        assert!(is_synthesized_marker("(c)"));
        assert!(is_synthesized_marker("(iv)"));
        assert!(is_synthesized_marker("*"));
        assert!(!is_synthesized_marker("1.2"));
    }
}
