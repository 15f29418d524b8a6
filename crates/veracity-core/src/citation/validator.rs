//! Fabrication and citation checks over a generated narrative.
//!
//! The fact list is the only legitimate source of claims. Anything numeric
//! that does not cite it is treated as fabricated.

use std::collections::BTreeSet;
use thiserror::Error;

use crate::config::CitationConfig;
use crate::location::{self, LocationBuilder};
use crate::types::{Fact, IssueSeverity, IssueType, ValidationIssue};

use super::patterns::{
    self, Sentence, ALWAYS_PATTERN, CONCLUSION_PATTERN, COUNTED_NOUN_PATTERN, DECREASE_PATTERN,
    INCREASE_PATTERN, NEVER_PATTERN, SAMPLE_SIZE_PATTERN,
};

/// Words of subject context taken before a directional verb.
const SUBJECT_WINDOW: usize = 6;

/// Errors raised when the validator cannot trust its own input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CitationError {
    #[error("Duplicate fact id #{0}")]
    DuplicateFactId(u32),

    #[error("Fact ids must be contiguous from 1: expected #{expected}, found #{found}")]
    NonContiguousFacts { expected: u32, found: u32 },
}

/// Everything the validator needs to judge one narrative.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeInput<'a> {
    pub narrative: &'a str,
    pub facts: &'a [Fact],

    /// Size of the underlying dataset, when known
    pub record_count: Option<u64>,
}

impl<'a> NarrativeInput<'a> {
    pub fn new(narrative: &'a str, facts: &'a [Fact]) -> Self {
        Self {
            narrative,
            facts,
            record_count: None,
        }
    }

    pub fn with_record_count(mut self, count: u64) -> Self {
        self.record_count = Some(count);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Absolute {
    Always,
    Never,
}

struct Stance<'s, K> {
    kind: K,
    topic: Vec<String>,
    sentence: &'s Sentence<'s>,
}

/// Cross-checks narrative claims against a finite list of verified facts.
pub struct CitationValidator {
    config: CitationConfig,
}

impl CitationValidator {
    pub fn new(config: CitationConfig) -> Self {
        Self { config }
    }

    /// Run every check and return the issues found, in narrative order per
    /// check.
    pub fn validate(&self, input: &NarrativeInput<'_>) -> Result<Vec<ValidationIssue>, CitationError> {
        check_fact_ids(input.facts)?;

        let text = input.narrative;
        let sentences = patterns::sentences(text);
        let fact_count = input.facts.len() as u64;

        let mut issues = Vec::new();
        issues.extend(self.check_references(text, fact_count));

        let (aggregate_issues, verified_spans) = self.check_aggregates(input);
        issues.extend(self.check_claims(&sentences, &verified_spans));
        issues.extend(aggregate_issues);
        issues.extend(self.check_contradictions(&sentences));
        issues.extend(self.check_completeness(text));
        issues.extend(self.check_interpretation(text, &sentences));

        tracing::debug!(
            sentences = sentences.len(),
            facts = fact_count,
            issues = issues.len(),
            "Citation validation complete"
        );

        Ok(issues)
    }

    /// Citation markers must reference a fact in `[1, fact_count]`.
    fn check_references(&self, text: &str, fact_count: u64) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for citation in patterns::citations(text) {
            for id in citation.ids.iter().filter(|id| **id == 0 || **id > fact_count) {
                issues.push(ValidationIssue {
                    severity: IssueSeverity::Critical,
                    issue_type: IssueType::InvalidReference,
                    description: format!(
                        "Citation references fact #{} but only {} facts exist",
                        id, fact_count
                    ),
                    location: location::narrative(citation.start, citation.end),
                    evidence: text[citation.start..citation.end].to_string(),
                    recommendation: format!(
                        "Cite a fact between #1 and #{} or remove the claim",
                        fact_count
                    ),
                });
            }
        }

        issues
    }

    /// Quantitative claims need a citation in the same sentence, headers
    /// included. Qualitative factual assertions need one too, at lower
    /// severity, but header titles are not read as assertions.
    fn check_claims(
        &self,
        sentences: &[Sentence<'_>],
        verified: &[(usize, usize)],
    ) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();

        for sentence in sentences {
            if patterns::has_citation(sentence.text) {
                continue;
            }

            let quantities: Vec<_> = patterns::quantities(sentence.text)
                .into_iter()
                .filter(|q| {
                    let (start, end) = (sentence.start + q.start, sentence.start + q.end);
                    !verified.iter().any(|(vs, ve)| start >= *vs && end <= *ve)
                })
                .collect();

            if !quantities.is_empty() {
                let values: Vec<&str> = quantities.iter().map(|q| q.text.as_str()).collect();
                issues.push(ValidationIssue {
                    severity: IssueSeverity::Critical,
                    issue_type: IssueType::Fabrication,
                    description: format!(
                        "Quantitative claim without a fact citation: {}",
                        values.join(", ")
                    ),
                    location: location::narrative(sentence.start, sentence.end),
                    evidence: sentence.text.to_string(),
                    recommendation: "Cite the supporting fact as [Fact #N] or remove the number"
                        .to_string(),
                });
                continue;
            }

            if sentence.is_header {
                continue;
            }

            if let Some(kind) = patterns::factual_assertion(sentence.text) {
                issues.push(ValidationIssue {
                    severity: IssueSeverity::High,
                    issue_type: IssueType::MissingCitation,
                    description: format!("Factual claim ({}) without a citation", kind),
                    location: location::narrative(sentence.start, sentence.end),
                    evidence: sentence.text.to_string(),
                    recommendation: "Add a [Fact #N] citation or rephrase as opinion".to_string(),
                });
            }
        }

        issues
    }

    /// Stated dataset sizes must match the data. Returns the issues plus the
    /// spans of aggregates that were checked, which are exempt from the
    /// fabrication check.
    fn check_aggregates(&self, input: &NarrativeInput<'_>) -> (Vec<ValidationIssue>, Vec<(usize, usize)>) {
        let text = input.narrative;
        let mut issues = Vec::new();
        let mut spans = Vec::new();

        let mut stated: Vec<(usize, usize, u64, Option<u64>, &str)> = Vec::new();

        for caps in SAMPLE_SIZE_PATTERN.captures_iter(text) {
            let (Some(whole), Some(number)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            stated.push((whole.start(), whole.end(), parse_count(number.as_str()), input.record_count, "sample size"));
        }

        for caps in COUNTED_NOUN_PATTERN.captures_iter(text) {
            let (Some(whole), Some(number), Some(noun)) = (caps.get(0), caps.get(1), caps.get(2)) else {
                continue;
            };
            let actual = if noun.as_str().eq_ignore_ascii_case("facts") {
                Some(input.facts.len() as u64)
            } else {
                input.record_count
            };
            stated.push((whole.start(), whole.end(), parse_count(number.as_str()), actual, noun.as_str()));
        }

        for (start, end, claimed, actual, label) in stated {
            let Some(actual) = actual else {
                continue;
            };
            spans.push((start, end));
            if claimed != actual {
                issues.push(ValidationIssue {
                    severity: IssueSeverity::Critical,
                    issue_type: IssueType::DataIntegrity,
                    description: format!(
                        "Stated {} of {} contradicts the actual count of {}",
                        label, claimed, actual
                    ),
                    location: location::narrative(start, end),
                    evidence: text[start..end].to_string(),
                    recommendation: format!("Correct the stated {} to {}", label, actual),
                });
            }
        }

        (issues, spans)
    }

    /// Opposite directional or absolute claims about the same subject in
    /// different sections.
    fn check_contradictions(&self, sentences: &[Sentence<'_>]) -> Vec<ValidationIssue> {
        let mut directional: Vec<Stance<'_, Direction>> = Vec::new();
        let mut absolute: Vec<Stance<'_, Absolute>> = Vec::new();

        for sentence in sentences.iter().filter(|s| !s.is_header) {
            let up = INCREASE_PATTERN.find(sentence.text);
            let down = DECREASE_PATTERN.find(sentence.text);
            match (up, down) {
                (Some(m), None) => directional.push(Stance {
                    kind: Direction::Up,
                    topic: subject_before(sentence.text, m.start()),
                    sentence,
                }),
                (None, Some(m)) => directional.push(Stance {
                    kind: Direction::Down,
                    topic: subject_before(sentence.text, m.start()),
                    sentence,
                }),
                _ => {}
            }

            let always = ALWAYS_PATTERN.find(sentence.text);
            let never = NEVER_PATTERN.find(sentence.text);
            match (always, never) {
                (Some(m), None) => absolute.push(Stance {
                    kind: Absolute::Always,
                    topic: patterns::topic_words(&sentence.text[m.end()..]),
                    sentence,
                }),
                (None, Some(m)) => absolute.push(Stance {
                    kind: Absolute::Never,
                    topic: patterns::topic_words(&sentence.text[m.end()..]),
                    sentence,
                }),
                _ => {}
            }
        }

        let mut issues = conflicting_pairs(&directional, "directional");
        issues.extend(conflicting_pairs(&absolute, "absolute"));
        issues
    }

    /// Required sections must exist.
    fn check_completeness(&self, text: &str) -> Vec<ValidationIssue> {
        self.config
            .required_sections
            .iter()
            .filter(|name| !patterns::has_section(text, name))
            .map(|name| ValidationIssue {
                severity: IssueSeverity::Medium,
                issue_type: IssueType::Completeness,
                description: format!("Required section '{}' is missing", name),
                location: location::section(name),
                evidence: String::new(),
                recommendation: format!("Add a '{}' section", name),
            })
            .collect()
    }

    /// Conclusions in sections that cite nothing.
    fn check_interpretation(&self, text: &str, sentences: &[Sentence<'_>]) -> Vec<ValidationIssue> {
        let sections = patterns::sections(text);
        let section_cites: Vec<bool> = sections
            .iter()
            .map(|s| patterns::has_citation(s.body))
            .collect();

        sentences
            .iter()
            .filter(|s| !s.is_header && CONCLUSION_PATTERN.is_match(s.text))
            .filter(|s| !patterns::has_citation(s.text))
            .filter(|s| !section_cites.get(s.section).copied().unwrap_or(false))
            .map(|s| ValidationIssue {
                severity: IssueSeverity::Low,
                issue_type: IssueType::Interpretation,
                description: "Conclusion is not supported by any cited fact in its section"
                    .to_string(),
                location: location::narrative(s.start, s.end),
                evidence: s.text.to_string(),
                recommendation: "Tie the conclusion to the facts it rests on".to_string(),
            })
            .collect()
    }
}

impl Default for CitationValidator {
    fn default() -> Self {
        Self::new(CitationConfig::default())
    }
}

/// Facts must be numbered `1..=n` with no duplicates.
fn check_fact_ids(facts: &[Fact]) -> Result<(), CitationError> {
    let mut seen = BTreeSet::new();
    for fact in facts {
        if !seen.insert(fact.id) {
            return Err(CitationError::DuplicateFactId(fact.id));
        }
    }
    for (expected, found) in (1u32..).zip(seen.iter().copied()) {
        if expected != found {
            return Err(CitationError::NonContiguousFacts { expected, found });
        }
    }
    Ok(())
}

fn parse_count(raw: &str) -> u64 {
    raw.chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(u64::MAX)
}

fn subject_before(text: &str, verb_start: usize) -> Vec<String> {
    let words = patterns::topic_words(&text[..verb_start]);
    let skip = words.len().saturating_sub(SUBJECT_WINDOW);
    words.into_iter().skip(skip).collect()
}

fn conflicting_pairs<K: PartialEq>(stances: &[Stance<'_, K>], label: &str) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    for (i, a) in stances.iter().enumerate() {
        for b in &stances[i + 1..] {
            if a.kind == b.kind || a.sentence.section == b.sentence.section {
                continue;
            }
            if !patterns::topics_overlap(&a.topic, &b.topic) {
                continue;
            }
            issues.push(ValidationIssue {
                severity: IssueSeverity::High,
                issue_type: IssueType::Contradiction,
                description: format!(
                    "Conflicting {} claims about '{}'",
                    label,
                    a.topic.join(" ")
                ),
                location: LocationBuilder::new()
                    .narrative(a.sentence.start, a.sentence.end)
                    .narrative(b.sentence.start, b.sentence.end)
                    .build(),
                evidence: format!("'{}' vs '{}'", a.sentence.text, b.sentence.text),
                recommendation: "Reconcile the two statements against the cited facts".to_string(),
            });
        }
    }

    issues
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Confidence;

    fn facts(n: u32) -> Vec<Fact> {
        (1..=n)
            .map(|id| Fact {
                id,
                category: "market".to_string(),
                claim: format!("claim {}", id),
                source_ref: format!("https://example.com/{}", id),
                confidence: Confidence::High,
            })
            .collect()
    }

    fn run(text: &str, facts: &[Fact]) -> Vec<ValidationIssue> {
        CitationValidator::default()
            .validate(&NarrativeInput::new(text, facts))
            .unwrap()
    }

    #[test]
    fn test_cited_numbers_pass() {
        let issues = run("Revenue grew 35% to $4.2 million [Fact #1].", &facts(1));
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_uncited_number_is_fabrication() {
        let issues = run("Revenue grew 35% last year.", &facts(3));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Fabrication);
        assert_eq!(issues[0].severity, IssueSeverity::Critical);
        assert_eq!(issues[0].location, "narrative[0:27]");
    }

    #[test]
    fn test_uncited_number_in_header_is_fabrication() {
        let issues = run(
            "# Revenue jumped 45% to $4.2 million\nThe team reviewed the quarter.\n",
            &facts(2),
        );
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Fabrication);
        assert_eq!(issues[0].severity, IssueSeverity::Critical);
        assert_eq!(issues[0].location, "narrative[0:36]");
    }

    #[test]
    fn test_header_titles_are_not_assertions() {
        let issues = run("## Who is the market leader\nWe compare vendors below.\n", &facts(1));
        assert!(issues.is_empty(), "{:?}", issues);

        let cited = run("# Revenue up 45% [Fact #1]\nDetails follow.\n", &facts(1));
        assert!(cited.is_empty(), "{:?}", cited);
    }

    #[test]
    fn test_out_of_range_citation_is_invalid_reference() {
        let issues = run("Churn fell to 4% [Fact #9].", &facts(3));
        assert!(issues
            .iter()
            .any(|i| i.issue_type == IssueType::InvalidReference && i.severity == IssueSeverity::Critical));
    }

    #[test]
    fn test_fact_zero_is_invalid() {
        let issues = run("See [Fact #0].", &facts(3));
        assert_eq!(issues[0].issue_type, IssueType::InvalidReference);
    }

    #[test]
    fn test_uncited_assertion_is_missing_citation() {
        let issues = run("Acme acquired Beta Corp to expand its reach.", &facts(2));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::MissingCitation);
        assert_eq!(issues[0].severity, IssueSeverity::High);
    }

    #[test]
    fn test_sample_size_mismatch() {
        let input = NarrativeInput::new("The sample size: 100 was drawn from panel data.", &[])
            .with_record_count(40);
        let issues = CitationValidator::default().validate(&input).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::DataIntegrity);
        assert!(issues[0].description.contains("40"));
    }

    #[test]
    fn test_matching_aggregate_is_not_fabrication() {
        let input = NarrativeInput::new("This brief analyzed 12 facts in total.", &[])
            .with_record_count(0);
        let fact_list = facts(12);
        let input = NarrativeInput { facts: &fact_list, ..input };
        let issues = CitationValidator::default().validate(&input).unwrap();
        assert!(issues.is_empty(), "{:?}", issues);
    }

    #[test]
    fn test_contradiction_across_sections() {
        let text = "# Findings\nMobile revenue increased sharply [Fact #1].\n\n# Outlook\nMobile revenue declined over the period [Fact #2].\n";
        let issues = run(text, &facts(2));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Contradiction);
        assert_eq!(issues[0].severity, IssueSeverity::High);
    }

    #[test]
    fn test_same_section_is_not_contradiction() {
        let text = "Mobile revenue increased early [Fact #1]. Mobile revenue declined later [Fact #2].";
        assert!(run(text, &facts(2)).is_empty());
    }

    #[test]
    fn test_missing_required_section() {
        let validator = CitationValidator::new(CitationConfig {
            required_sections: vec!["Executive Summary".to_string(), "Sources".to_string()],
        });
        let text = "# Executive Summary\nNothing numeric here.\n";
        let issues = validator.validate(&NarrativeInput::new(text, &[])).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Completeness);
        assert_eq!(issues[0].severity, IssueSeverity::Medium);
    }

    #[test]
    fn test_unsupported_conclusion_is_low() {
        let issues = run("# Outlook\nTherefore the strategy should change.\n", &facts(1));
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].issue_type, IssueType::Interpretation);
        assert_eq!(issues[0].severity, IssueSeverity::Low);
    }

    #[test]
    fn test_plain_narrative_has_no_issues() {
        assert!(run("This note summarises our plan. We will talk soon.", &[]).is_empty());
        assert!(run("", &[]).is_empty());
    }

    #[test]
    fn test_duplicate_fact_ids_rejected() {
        let mut list = facts(2);
        list[1].id = 1;
        let result = CitationValidator::default().validate(&NarrativeInput::new("x", &list));
        assert_eq!(result, Err(CitationError::DuplicateFactId(1)));
    }

    #[test]
    fn test_gapped_fact_ids_rejected() {
        let mut list = facts(3);
        list[2].id = 5;
        let result = CitationValidator::default().validate(&NarrativeInput::new("x", &list));
        assert_eq!(
            result,
            Err(CitationError::NonContiguousFacts { expected: 3, found: 5 })
        );
    }
}
