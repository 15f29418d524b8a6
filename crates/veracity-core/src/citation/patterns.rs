//! Shared text patterns for narrative analysis.
//!
//! Citation markers, quantitative claims, factual assertions, section
//! headers and sentence boundaries. Used by the citation validator and by
//! the brief-generation gate, so both read a narrative the same way.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // =========================================================================
    // CITATIONS
    // =========================================================================

    /// `[Fact #3]`, `[Fact 3]`, `[Facts #1, #4]`, `[Facts 2 and 5]`
    pub static ref CITATION_PATTERN: Regex = Regex::new(
        r"(?i)\[\s*facts?\s*#?\s*\d+(?:\s*(?:,|and|&)\s*#?\s*\d+)*\s*\]"
    ).unwrap();

    static ref DIGITS: Regex = Regex::new(r"\d+").unwrap();

    // =========================================================================
    // QUANTITATIVE CLAIMS (checked in priority order)
    // =========================================================================

    static ref QUANTITATIVE_PATTERNS: Vec<(QuantityKind, Regex)> = vec![
        (QuantityKind::Percentage, Regex::new(
            r"(?i)\d+(?:[.,]\d+)?\s*(?:%|percent\b|per cent\b|percentage points?\b|pp\b)"
        ).unwrap()),
        (QuantityKind::Currency, Regex::new(
            r"(?i)(?:[$€£¥]\s?\d[\d,]*(?:\.\d+)?(?:\s*(?:thousand|million|billion|trillion|bn|[kmb])\b)?)|(?:\b\d[\d,]*(?:\.\d+)?\s*(?:usd|eur|gbp|dollars|euros|pounds)\b)"
        ).unwrap()),
        (QuantityKind::Magnitude, Regex::new(
            r"(?i)\b\d+(?:[.,]\d+)?\s?(?:thousand|million|billion|trillion)\b|\b\d+(?:\.\d+)?(?:k|m|bn|b)\b"
        ).unwrap()),
        (QuantityKind::Multiplier, Regex::new(
            r"(?i)\b\d+(?:\.\d+)?x\b"
        ).unwrap()),
        (QuantityKind::Number, Regex::new(
            r"\b\d[\d,]*(?:\.\d+)?\b"
        ).unwrap()),
    ];

    // =========================================================================
    // QUALITATIVE FACTUAL ASSERTIONS
    // =========================================================================

    pub static ref FACTUAL_ASSERTION_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("attribution", Regex::new(
            r"(?i)\b(according to|reported(ly)?|reports that|announced|stated that|confirmed that|disclosed)\b"
        ).unwrap()),
        ("research claim", Regex::new(
            r"(?i)\b(studies|research|data|surveys?|analysts?|evidence)\s+(show|shows|showed|indicate|indicates|suggest|suggests|found|finds|reveal|reveals|confirm|confirms)\b"
        ).unwrap()),
        ("market position", Regex::new(
            r"(?i)\b(market leader|largest|biggest|leading provider|fastest[- ]growing|dominant player|dominates|most popular|number one|#1)\b"
        ).unwrap()),
        ("corporate event", Regex::new(
            r"(?i)\b(acquired|launched|partnered with|raised|filed for|expanded into|merged with|was founded|headquartered in)\b"
        ).unwrap()),
    ];

    /// Conclusions that need support from cited facts.
    pub static ref CONCLUSION_PATTERN: Regex = Regex::new(
        r"(?i)\b(therefore|thus|consequently|as a result|this means that|we conclude|this proves|this demonstrates|it follows that)\b"
    ).unwrap();

    // =========================================================================
    // STATED AGGREGATES
    // =========================================================================

    /// "sample size: 100", "sample size of 100", "n = 100"
    pub static ref SAMPLE_SIZE_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:sample size|n)\s*(?:of|:|=|was|is)\s*(\d[\d,]*)\b"
    ).unwrap();

    /// "based on 100 responses", "analyzed 45 facts", "across 12 sources"
    pub static ref COUNTED_NOUN_PATTERN: Regex = Regex::new(
        r"(?i)\b(?:based on|analy[sz]ed|reviewed|across|from|covering)\s+(\d[\d,]*)\s+(records|responses|data points|reviews|rows|samples|respondents|facts)\b"
    ).unwrap();

    // =========================================================================
    // CONTRADICTIONS
    // =========================================================================

    pub static ref INCREASE_PATTERN: Regex = Regex::new(
        r"(?i)\b(increas(?:e|ed|es|ing)|gr(?:ew|ow|ows|owing)|rose|rises|rising|climb(?:ed|s|ing)?|surg(?:ed|es|ing)|improv(?:ed|es|ing))\b"
    ).unwrap();

    pub static ref DECREASE_PATTERN: Regex = Regex::new(
        r"(?i)\b(decreas(?:e|ed|es|ing)|declin(?:e|ed|es|ing)|fell|fall(?:s|ing)?|dropp(?:ed|ing)|drops|shr(?:ank|ink|inks|inking)|deteriorat(?:ed|es|ing))\b"
    ).unwrap();

    pub static ref ALWAYS_PATTERN: Regex = Regex::new(
        r"(?i)\b(always|every time|without exception|invariably|in all cases)\b"
    ).unwrap();

    pub static ref NEVER_PATTERN: Regex = Regex::new(
        r"(?i)\b(never|under no circumstances|at no point|in no case)\b"
    ).unwrap();

    // =========================================================================
    // STRUCTURE
    // =========================================================================

    static ref HEADER_PATTERN: Regex = Regex::new(r"^\s{0,3}#{1,6}\s+(.+?)\s*#*\s*$").unwrap();
}

const STOPWORDS: &[&str] = &[
    "the", "and", "that", "this", "with", "from", "have", "has", "had", "was", "were", "are",
    "for", "our", "their", "its", "over", "into", "than", "been", "also", "while", "which",
    "year", "quarter", "period", "significantly", "sharply", "slightly",
];

/// Kind of quantitative statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityKind {
    Percentage,
    Currency,
    Magnitude,
    Multiplier,
    Number,
}

/// A quantitative claim found in text.
#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    pub kind: QuantityKind,
    pub text: String,
    pub start: usize,
    pub end: usize,
}

/// A citation marker and the fact ids it references.
#[derive(Debug, Clone, PartialEq)]
pub struct Citation {
    pub ids: Vec<u64>,
    pub start: usize,
    pub end: usize,
}

/// A sentence (or header line) with byte offsets into the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Sentence<'a> {
    pub text: &'a str,
    pub start: usize,
    pub end: usize,
    /// Index into `sections()` of the section holding this sentence
    pub section: usize,
    pub is_header: bool,
}

/// A section of the narrative, introduced by a markdown header.
///
/// Text before the first header forms a section with no title.
#[derive(Debug, Clone, PartialEq)]
pub struct Section<'a> {
    pub title: Option<&'a str>,
    /// Body text, excluding the header line
    pub body: &'a str,
    pub start: usize,
    pub end: usize,
}

/// Find all citation markers in text.
pub fn citations(text: &str) -> Vec<Citation> {
    CITATION_PATTERN
        .find_iter(text)
        .map(|m| Citation {
            ids: DIGITS
                .find_iter(m.as_str())
                .map(|d| d.as_str().parse::<u64>().unwrap_or(u64::MAX))
                .collect(),
            start: m.start(),
            end: m.end(),
        })
        .collect()
}

/// True if the text carries at least one citation marker.
pub fn has_citation(text: &str) -> bool {
    CITATION_PATTERN.is_match(text)
}

/// Blank out citation markers, keeping byte offsets stable.
fn mask_citations(text: &str) -> String {
    let mut masked = text.to_string();
    for m in CITATION_PATTERN.find_iter(text) {
        masked.replace_range(m.range(), &" ".repeat(m.len()));
    }
    masked
}

/// Find quantitative claims in text, ignoring citation markers, years and
/// small integers.
pub fn quantities(text: &str) -> Vec<Quantity> {
    let masked = mask_citations(text);
    let mut found: Vec<Quantity> = Vec::new();

    for (kind, regex) in QUANTITATIVE_PATTERNS.iter() {
        for m in regex.find_iter(&masked) {
            let overlaps = found.iter().any(|q| m.start() < q.end && q.start < m.end());
            if overlaps {
                continue;
            }
            if *kind == QuantityKind::Number && !is_significant_number(m.as_str()) {
                continue;
            }
            found.push(Quantity {
                kind: *kind,
                text: text[m.range()].to_string(),
                start: m.start(),
                end: m.end(),
            });
        }
    }

    found.sort_by_key(|q| q.start);
    found
}

/// Bare numbers count as claims unless they are years or below ten.
fn is_significant_number(raw: &str) -> bool {
    if raw.contains('.') {
        return true;
    }
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    let value = match digits.parse::<u64>() {
        Ok(v) => v,
        Err(_) => return true,
    };
    let looks_like_year = !raw.contains(',') && digits.len() == 4 && (1900..=2099).contains(&value);
    value >= 10 && !looks_like_year
}

/// Name of the first qualitative-assertion pattern matching the text.
pub fn factual_assertion(text: &str) -> Option<&'static str> {
    FACTUAL_ASSERTION_PATTERNS
        .iter()
        .find(|(_, regex)| regex.is_match(text))
        .map(|(name, _)| *name)
}

/// Title of a markdown header line, if the line is one.
pub fn header_title(line: &str) -> Option<&str> {
    HEADER_PATTERN
        .captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Split text into sections at markdown headers.
pub fn sections(text: &str) -> Vec<Section<'_>> {
    let mut sections = Vec::new();
    let mut current_title: Option<&str> = None;
    let mut current_start = 0;
    let mut body_start = 0;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        if let Some(title) = header_title(line.trim_end_matches(['\n', '\r'])) {
            if offset > 0 || current_title.is_some() {
                sections.push(Section {
                    title: current_title,
                    body: &text[body_start..offset],
                    start: current_start,
                    end: offset,
                });
            }
            current_title = Some(title);
            current_start = offset;
            body_start = offset + line.len();
        }
        offset += line.len();
    }

    if offset > 0 || current_title.is_some() {
        sections.push(Section {
            title: current_title,
            body: &text[body_start.min(offset)..offset],
            start: current_start,
            end: offset,
        });
    }

    sections
}

/// Find the body of the first section whose title contains `name`
/// (case-insensitive).
pub fn section_body<'a>(text: &'a str, name: &str) -> Option<&'a str> {
    let wanted = normalize_title(name);
    sections(text)
        .into_iter()
        .find(|s| s.title.map(|t| normalize_title(t).contains(&wanted)).unwrap_or(false))
        .map(|s| s.body)
}

/// True if a section with a matching title exists.
pub fn has_section(text: &str, name: &str) -> bool {
    section_body(text, name).is_some()
}

fn normalize_title(title: &str) -> String {
    title
        .trim()
        .trim_end_matches(':')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Split text into sentences and header lines with byte offsets.
///
/// Sentences end at `.`, `!` or `?` followed by whitespace, and at line
/// breaks. Decimal points do not split.
pub fn sentences(text: &str) -> Vec<Sentence<'_>> {
    let mut out = Vec::new();
    let mut section = 0;
    let mut seen_header = false;
    let mut offset = 0;

    for line in text.split_inclusive('\n') {
        let line_start = offset;
        offset += line.len();
        let content = line.trim_end_matches(['\n', '\r']);

        if header_title(content).is_some() {
            if seen_header || line_start > 0 {
                section += 1;
            }
            seen_header = true;
            push_trimmed(&mut out, text, line_start, line_start + content.len(), section, true);
            continue;
        }

        let bytes = content.as_bytes();
        let mut start = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let terminal = matches!(b, b'.' | b'!' | b'?');
            let followed_by_space = bytes.get(i + 1).map(|n| n.is_ascii_whitespace()).unwrap_or(true);
            if terminal && followed_by_space {
                push_trimmed(&mut out, text, line_start + start, line_start + i + 1, section, false);
                start = i + 1;
            }
        }
        if start < content.len() {
            push_trimmed(&mut out, text, line_start + start, line_start + content.len(), section, false);
        }
    }

    out
}

fn push_trimmed<'a>(
    out: &mut Vec<Sentence<'a>>,
    text: &'a str,
    start: usize,
    end: usize,
    section: usize,
    is_header: bool,
) {
    let raw = &text[start..end];
    let leading = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if trimmed.chars().any(|c| c.is_alphanumeric()) {
        out.push(Sentence {
            text: trimmed,
            start: start + leading,
            end: start + leading + trimmed.len(),
            section,
            is_header,
        });
    }
}

/// Count words: whitespace-separated tokens holding at least one
/// alphanumeric character.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace()
        .filter(|token| token.chars().any(|c| c.is_alphanumeric()))
        .count()
}

/// Significant lower-cased words of a subject phrase.
pub fn topic_words(phrase: &str) -> Vec<String> {
    phrase
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() > 2 && !w.chars().all(|c| c.is_ascii_digit()))
        .map(|w| w.to_lowercase())
        .filter(|w| !STOPWORDS.contains(&w.as_str()))
        .collect()
}

/// True if two topics share enough significant words to be the same subject.
pub fn topics_overlap(a: &[String], b: &[String]) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    let shared = a.iter().filter(|w| b.contains(w)).count();
    shared > 0 && shared * 2 >= a.len().min(b.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_citation_formats() {
        let found = citations("Revenue grew [Fact #3]. Churn fell [Fact 4]. Both [Facts #1, #2 and 5].");
        assert_eq!(found.len(), 3);
        assert_eq!(found[0].ids, vec![3]);
        assert_eq!(found[1].ids, vec![4]);
        assert_eq!(found[2].ids, vec![1, 2, 5]);
    }

    #[test]
    fn test_quantities_detected() {
        let q = quantities("Revenue hit $4.2 million, up 35% from 1,200 units and 3x faster.");
        let kinds: Vec<QuantityKind> = q.iter().map(|q| q.kind).collect();
        assert!(kinds.contains(&QuantityKind::Currency));
        assert!(kinds.contains(&QuantityKind::Percentage));
        assert!(kinds.contains(&QuantityKind::Number));
        assert!(kinds.contains(&QuantityKind::Multiplier));
    }

    #[test]
    fn test_years_small_numbers_and_citations_ignored() {
        assert!(quantities("In 2024 the team shipped 3 releases [Fact #12].").is_empty());
    }

    #[test]
    fn test_sentences_do_not_split_decimals() {
        let s = sentences("CTR was 5.2 percent. Next sentence here!");
        assert_eq!(s.len(), 2);
        assert_eq!(s[0].text, "CTR was 5.2 percent.");
        assert_eq!(s[1].text, "Next sentence here!");
    }

    #[test]
    fn test_sentence_offsets_point_into_text() {
        let text = "# Title\nFirst one. Second one.\n";
        for s in sentences(text) {
            assert_eq!(&text[s.start..s.end], s.text);
        }
    }

    #[test]
    fn test_sections_split_on_headers() {
        let text = "Intro line\n# Executive Summary\nSummary body.\n## Key Findings\nFindings.\n";
        let secs = sections(text);
        assert_eq!(secs.len(), 3);
        assert_eq!(secs[0].title, None);
        assert_eq!(secs[1].title, Some("Executive Summary"));
        assert_eq!(secs[1].body, "Summary body.\n");
        assert_eq!(section_body(text, "key findings"), Some("Findings.\n"));
        assert!(!has_section(text, "Recommendations"));
    }

    #[test]
    fn test_sentence_sections_match_sections() {
        let text = "# A\nOne.\n# B\nTwo.\n";
        let s = sentences(text);
        let body: Vec<usize> = s.iter().filter(|s| !s.is_header).map(|s| s.section).collect();
        assert_eq!(body, vec![0, 1]);
        assert_eq!(sections(text).len(), 2);
    }

    #[test]
    fn test_word_count_ignores_markup() {
        assert_eq!(word_count("## Heading  - one two\n* three"), 4);
    }

    #[test]
    fn test_factual_assertion() {
        assert_eq!(factual_assertion("Acme acquired Beta Corp."), Some("corporate event"));
        assert_eq!(factual_assertion("Studies show adoption is broad."), Some("research claim"));
        assert_eq!(factual_assertion("We will meet next week."), None);
    }

    #[test]
    fn test_topics_overlap() {
        let a = topic_words("Mobile revenue");
        let b = topic_words("Our mobile revenue");
        let c = topic_words("Desktop traffic");
        assert!(topics_overlap(&a, &b));
        assert!(!topics_overlap(&a, &c));
    }
}
