//! Visa sponsorship evidence scanner.
//!
//! Splits page text into sentences and keeps the ones mentioning a
//! sponsorship phrase. Matching is plain case-insensitive substring search on
//! whatever text the page yields, so navigation text and boilerplate produce
//! false positives; the negation pass is a heuristic, not a classifier.

use regex::{Regex, RegexBuilder};

use crate::model::VisaVerdict;

/// Phrases that mark a sentence as sponsorship evidence.
pub const SPONSORSHIP_KEYWORDS: [&str; 6] = [
    "visa sponsorship",
    "sponsors visa",
    "visa support",
    "work visa",
    "sponsor h1b",
    "sponsor visa",
];

/// Words that turn an evidence sentence into a "no".
pub const NEGATION_KEYWORDS: [&str; 7] = [
    "no",
    "not",
    "without",
    "do not",
    "does not",
    "cannot",
    "unavailable",
];

/// Words whose trailing period does not end a sentence.
const ABBREVIATIONS: [&str; 15] = [
    "e.g", "i.e", "etc", "inc", "ltd", "co", "corp", "mr", "mrs", "ms", "dr", "vs", "u.s", "jr",
    "sr",
];

/// Sentences that matched a sponsorship keyword, plus the overall verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisaEvidence {
    pub verdict: VisaVerdict,
    pub sentences: Vec<String>,
}

impl VisaEvidence {
    /// Evidence as a single log cell.
    pub fn text(&self) -> String {
        self.sentences.join(" | ")
    }
}

pub struct VisaScanner {
    keywords: Regex,
    negations: Regex,
    negation_filter: bool,
}

impl VisaScanner {
    /// Compiles the keyword sets. With `negation_filter` off, any evidence
    /// sentence yields `Yes`.
    pub fn new(negation_filter: bool) -> Result<Self, regex::Error> {
        let keywords = alternation(&SPONSORSHIP_KEYWORDS, false)?;
        let negations = alternation(&NEGATION_KEYWORDS, true)?;
        Ok(Self {
            keywords,
            negations,
            negation_filter,
        })
    }

    pub fn scan(&self, text: &str) -> VisaEvidence {
        self.scan_blocks(&[text])
    }

    /// Scans separately rendered blocks of text (paragraphs, list items).
    /// A sentence never runs across a block boundary.
    pub fn scan_blocks<S: AsRef<str>>(&self, blocks: &[S]) -> VisaEvidence {
        let sentences: Vec<String> = blocks
            .iter()
            .flat_map(|block| split_sentences(block.as_ref()))
            .filter(|sentence| self.keywords.is_match(sentence))
            .collect();

        let negated = self.negation_filter
            && sentences
                .iter()
                .any(|sentence| self.negations.is_match(sentence));

        let verdict = if sentences.is_empty() || negated {
            VisaVerdict::No
        } else {
            VisaVerdict::Yes
        };

        VisaEvidence { verdict, sentences }
    }
}

fn alternation(words: &[&str], whole_words: bool) -> Result<Regex, regex::Error> {
    let body = words
        .iter()
        .map(|word| regex::escape(word).replace(' ', r"\s+"))
        .collect::<Vec<_>>()
        .join("|");
    let pattern = if whole_words {
        format!(r"\b(?:{body})\b")
    } else {
        format!("(?:{body})")
    };
    RegexBuilder::new(&pattern).case_insensitive(true).build()
}

/// Splits text into sentences at `.` or `?` followed by whitespace (or the
/// end of the text). A period after a known abbreviation or a single capital
/// initial does not split. Whitespace inside each sentence is collapsed.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut chars = text.char_indices().peekable();

    while let Some((idx, ch)) = chars.next() {
        if ch != '.' && ch != '?' {
            continue;
        }
        let at_boundary = match chars.peek() {
            Some((_, next)) => next.is_whitespace(),
            None => true,
        };
        if !at_boundary || (ch == '.' && ends_with_abbreviation(&text[start..idx])) {
            continue;
        }
        let end = idx + ch.len_utf8();
        push_sentence(&mut sentences, &text[start..end]);
        start = end;
    }
    push_sentence(&mut sentences, &text[start..]);

    sentences
}

fn push_sentence(sentences: &mut Vec<String>, raw: &str) {
    let sentence = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if !sentence.is_empty() {
        sentences.push(sentence);
    }
}

fn ends_with_abbreviation(before: &str) -> bool {
    let word = before
        .rsplit(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or_default();

    let mut letters = word.chars();
    if let (Some(only), None) = (letters.next(), letters.next()) {
        if only.is_ascii_uppercase() {
            return true;
        }
    }

    ABBREVIATIONS.contains(&word.to_ascii_lowercase().as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scanner() -> VisaScanner {
        VisaScanner::new(true).unwrap()
    }

    #[test]
    fn test_offer_is_yes_with_sentence_as_evidence() {
        let evidence = scanner().scan("We offer visa sponsorship for all roles.");
        assert_eq!(evidence.verdict, VisaVerdict::Yes);
        assert_eq!(
            evidence.sentences,
            vec!["We offer visa sponsorship for all roles.".to_string()]
        );
    }

    #[test]
    fn test_negated_mention_is_no_but_keeps_evidence() {
        let evidence = scanner().scan("We do not offer visa sponsorship.");
        assert_eq!(evidence.verdict, VisaVerdict::No);
        assert_eq!(
            evidence.sentences,
            vec!["We do not offer visa sponsorship.".to_string()]
        );
    }

    #[test]
    fn test_no_keywords_is_no_with_empty_evidence() {
        let evidence = scanner().scan("We are hiring engineers. Apply today!");
        assert_eq!(evidence.verdict, VisaVerdict::No);
        assert!(evidence.sentences.is_empty());
        assert_eq!(evidence.text(), "");
    }

    #[test]
    fn test_one_negated_sentence_flips_whole_page() {
        let text = "We provide work visa support. Visa sponsorship is unavailable for interns.";
        let evidence = scanner().scan(text);
        assert_eq!(evidence.sentences.len(), 2);
        assert_eq!(evidence.verdict, VisaVerdict::No);
    }

    #[test]
    fn test_negation_filter_can_be_disabled() {
        let evidence = VisaScanner::new(false)
            .unwrap()
            .scan("We cannot provide visa sponsorship.");
        assert_eq!(evidence.verdict, VisaVerdict::Yes);
    }

    #[test]
    fn test_keywords_are_case_insensitive() {
        let evidence = scanner().scan("Acme SPONSORS VISAS for senior hires.");
        assert_eq!(evidence.verdict, VisaVerdict::Yes);
    }

    #[test]
    fn test_negation_needs_whole_words() {
        // "know" and "note" must not count as "no" / "not".
        let evidence = scanner().scan("Note that we know how to sponsor visa applications.");
        assert_eq!(evidence.verdict, VisaVerdict::Yes);
    }

    #[test]
    fn test_only_matching_sentences_are_evidence() {
        let text = "Join our team. We sponsor H1B transfers? Benefits include lunch.";
        let evidence = scanner().scan(text);
        assert_eq!(evidence.sentences, vec!["We sponsor H1B transfers?".to_string()]);
        assert_eq!(evidence.verdict, VisaVerdict::Yes);
    }

    #[test]
    fn test_unpunctuated_blocks_stay_separate_sentences() {
        let blocks = ["Home No results Jobs", "Visa sponsorship available"];
        let evidence = scanner().scan_blocks(&blocks);
        assert_eq!(evidence.verdict, VisaVerdict::Yes);
        assert_eq!(evidence.sentences, vec!["Visa sponsorship available".to_string()]);

        let joined = scanner().scan(&blocks.join(" "));
        assert_eq!(joined.verdict, VisaVerdict::No);
    }

    #[test]
    fn test_split_on_period_and_question_mark() {
        let sentences = split_sentences("One.  Two?\nThree");
        assert_eq!(sentences, vec!["One.", "Two?", "Three"]);
    }

    #[test]
    fn test_split_keeps_abbreviations_and_initials() {
        let sentences =
            split_sentences("Acme Inc. hires in the U.S. and EU, e.g. Berlin. Ask J. Doe.");
        assert_eq!(
            sentences,
            vec![
                "Acme Inc. hires in the U.S. and EU, e.g. Berlin.",
                "Ask J. Doe."
            ]
        );
    }

    #[test]
    fn test_split_ignores_periods_inside_tokens() {
        let sentences = split_sentences("See acme.example/jobs for details. Thanks");
        assert_eq!(sentences, vec!["See acme.example/jobs for details.", "Thanks"]);
    }

    #[test]
    fn test_split_collapses_whitespace() {
        let sentences = split_sentences("  We  offer\n\tvisa   support.  ");
        assert_eq!(sentences, vec!["We offer visa support."]);
    }
}
