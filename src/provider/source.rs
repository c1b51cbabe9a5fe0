//! Fallback answer resolution for questions the spec has no entry for.
//!
//! Scripted (file-driven) and interactive (prompt-driven) resolution are
//! interchangeable strategies: the engine consults the page's answer map
//! first and asks its `AnswerSource` only on a miss.

use crate::spec::{AnswerSpec, OneOrMany};
use crate::{Error, Result};
use std::io::{BufRead, Write};

/// Synthesizes an answer for a question the spec does not cover.
pub trait AnswerSource: Send {
    /// `options` is the provider-formatted label text of every selectable
    /// input, empty for pure text questions.
    fn answer_for(&mut self, identifier: &str, title: &str, options: &[String])
        -> Result<AnswerSpec>;
}

/// Interactive source: lists the options on stdout and reads the answer from
/// stdin. Numeric tokens become selection indices, anything else is a text
/// payload; commas separate multiple values.
#[derive(Debug, Default)]
pub struct PromptSource;

impl PromptSource {
    pub fn new() -> Self {
        Self
    }
}

impl AnswerSource for PromptSource {
    fn answer_for(
        &mut self,
        identifier: &str,
        title: &str,
        options: &[String],
    ) -> Result<AnswerSpec> {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();

        writeln!(stdout, "[{}] {}", identifier, title)?;
        let digits = options.len().to_string().len();
        for (i, option) in options.iter().enumerate() {
            writeln!(stdout, "\t{:>width$}/{} {}", i + 1, options.len(), option, width = digits)?;
        }
        let hint = if options.len() > 1 {
            " (separate multiple values with ',')"
        } else {
            ""
        };
        write!(stdout, "> Your answer{}: ", hint)?;
        stdout.flush()?;

        let mut line = String::new();
        stdin.lock().read_line(&mut line)?;
        parse_reply(&line)
    }
}

/// Strict source for fully scripted runs: any fallback request is an error.
#[derive(Debug, Default)]
pub struct NoFallback;

impl AnswerSource for NoFallback {
    fn answer_for(
        &mut self,
        identifier: &str,
        title: &str,
        _options: &[String],
    ) -> Result<AnswerSpec> {
        Err(Error::Config(format!(
            "no scripted answer for question '{}' ({})",
            identifier, title
        )))
    }
}

fn parse_reply(line: &str) -> Result<AnswerSpec> {
    let values: Vec<String> = line
        .split(',')
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();

    let mut answer = AnswerSpec::default();
    if !values.is_empty() && values.iter().all(|v| v.parse::<u32>().is_ok()) {
        let nos: Vec<u32> = values.iter().map(|v| v.parse().unwrap()).collect();
        answer.no = Some(OneOrMany::Many(nos));
    } else if !values.is_empty() {
        answer.val = Some(OneOrMany::Many(values));
    }
    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_reply_becomes_indices() {
        let answer = parse_reply("1, 3\n").unwrap();
        assert_eq!(answer.selection_indices(), vec![1, 3]);
        assert!(answer.val.is_none());
    }

    #[test]
    fn test_text_reply_becomes_payload() {
        let answer = parse_reply("hello world\n").unwrap();
        assert_eq!(answer.text_payload(), vec!["hello world"]);
    }

    #[test]
    fn test_empty_reply_is_empty_answer() {
        let answer = parse_reply("\n").unwrap();
        assert!(answer.is_empty());
    }

    #[test]
    fn test_no_fallback_errors() {
        let mut source = NoFallback;
        assert!(source.answer_for("1", "Title", &[]).is_err());
    }
}
