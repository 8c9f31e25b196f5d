//! Quiz text parsing — structured questions from the generation backend's
//! markdown quiz format.
//!
//! Blocks are separated by a line containing only `---`. Each block carries
//! its question as the first bold span, options as `- A. text` list lines,
//! and the correct answer as a `Correct Answer: A` line.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

static RE_QUESTION_NUMBERED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\*\*Q\d*\.\s*(.*?)\*\*").unwrap());
static RE_QUESTION_BOLD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)\*\*(.*?)\*\*").unwrap());
static RE_OPTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*-\s*([A-Z])\.\s*(.+)$").unwrap());
static RE_ANSWER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Correct Answer:\s*([A-Z])").unwrap());
static RE_BLOCK_SEP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*---\s*$").unwrap());

/// One answer option within a question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuizOption {
    pub id: char,
    pub text: String,
}

/// A parsed multiple-choice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: Vec<QuizOption>,
    pub correct_answer: char,
}

/// Raised when no well-formed question could be extracted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuizParseError;

impl std::fmt::Display for QuizParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "no well-formed quiz questions found")
    }
}

impl std::error::Error for QuizParseError {}

/// Parse raw quiz markdown into structured questions.
///
/// Blocks missing options or an answer line are skipped; if every block is
/// skipped the whole parse fails so the caller can ask for a regeneration.
pub fn parse_quiz(raw: &str) -> Result<Vec<QuizQuestion>, QuizParseError> {
    let mut questions = Vec::new();

    for block in RE_BLOCK_SEP.split(raw) {
        let block = block.trim();
        if block.is_empty() {
            continue;
        }

        let question = RE_QUESTION_NUMBERED
            .captures(block)
            .or_else(|| RE_QUESTION_BOLD.captures(block))
            .map(|c| c[1].trim().to_string())
            .unwrap_or_else(|| "Question text not found".to_string());

        let options: Vec<QuizOption> = RE_OPTION
            .captures_iter(block)
            .map(|c| QuizOption {
                id: c[1].chars().next().unwrap(),
                text: c[2].trim().to_string(),
            })
            .collect();

        let correct_answer = RE_ANSWER
            .captures(block)
            .map(|c| c[1].to_uppercase().chars().next().unwrap());

        if let Some(answer) = correct_answer {
            if !options.is_empty() {
                questions.push(QuizQuestion {
                    question,
                    options,
                    correct_answer: answer,
                });
            }
        }
    }

    if questions.is_empty() {
        Err(QuizParseError)
    } else {
        Ok(questions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
**Q1. What is the boiling point of water?**

- A. 90 degrees Celsius
- B. 100 degrees Celsius
- C. 110 degrees Celsius

<details>Correct Answer: B</details>

---

**Q2. Which planet is closest to the sun?**

- A. Venus
- B. Earth
- C. Mercury

Correct Answer: C
";

    #[test]
    fn parses_two_questions() {
        let qs = parse_quiz(SAMPLE).unwrap();
        assert_eq!(qs.len(), 2);
        assert_eq!(qs[0].question, "What is the boiling point of water?");
        assert_eq!(qs[0].options.len(), 3);
        assert_eq!(qs[0].correct_answer, 'B');
        assert_eq!(qs[1].correct_answer, 'C');
        assert_eq!(qs[1].options[2].text, "Mercury");
    }

    #[test]
    fn unnumbered_bold_question_accepted() {
        let raw = "**A plain bold question?**\n- A. yes\n- B. no\nCorrect Answer: A";
        let qs = parse_quiz(raw).unwrap();
        assert_eq!(qs[0].question, "A plain bold question?");
    }

    #[test]
    fn case_insensitive_answer_line() {
        let raw = "**Q?**\n- A. x\n- B. y\ncorrect answer: b";
        let qs = parse_quiz(raw).unwrap();
        assert_eq!(qs[0].correct_answer, 'B');
    }

    #[test]
    fn block_without_answer_is_skipped() {
        let raw = format!("**Orphan?**\n- A. x\n\n---\n\n{SAMPLE}");
        let qs = parse_quiz(&raw).unwrap();
        assert_eq!(qs.len(), 2);
    }

    #[test]
    fn unparseable_input_is_an_error() {
        assert!(parse_quiz("nothing structured here").is_err());
        assert!(parse_quiz("").is_err());
    }
}
