use std::io::{self, BufRead, Write};

use colored::Colorize;

use super::{parse_score, ReviewEntry, ReviewSource};
use crate::error::{AppError, AppResult};
use crate::storage::TestResult;

/// Interactive reviewer reading judgments from the terminal.
///
/// Required fields re-prompt until valid; end-of-input (Ctrl-D) stops the
/// pass and leaves the rest of the session pending.
pub struct TerminalReviewSource;

impl TerminalReviewSource {
    /// Create a terminal reviewer
    pub fn new() -> Self {
        Self
    }

    fn read_line(&self, prompt: &str) -> AppResult<Option<String>> {
        print!("{} ", prompt);
        io::stdout().flush().map_err(|e| AppError::Internal {
            message: format!("stdout flush failed: {}", e),
        })?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .map_err(|e| AppError::Internal {
                message: format!("stdin read failed: {}", e),
            })?;

        if read == 0 {
            // EOF: reviewer is done for now
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }
}

impl Default for TerminalReviewSource {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewSource for TerminalReviewSource {
    fn collect(
        &mut self,
        result: &TestResult,
        position: usize,
        total: usize,
    ) -> AppResult<Option<ReviewEntry>> {
        println!();
        println!(
            "{}",
            format!("Question {}/{}", position, total).cyan().bold()
        );
        println!(
            "{} {}",
            format!("[{}]", result.question_type).yellow(),
            result.question_text
        );
        println!();
        println!("{} ({})", "Model answer".cyan().bold(), result.model);
        println!("{}", result.llm_response);
        println!();

        let actual_response = loop {
            match self.read_line(&"Actual response from the real person:".green().to_string())? {
                None => return Ok(None),
                Some(line) if line.is_empty() => {
                    println!("{}", "A response is required.".red());
                }
                Some(line) => break line,
            }
        };

        println!();
        println!("Rate the similarity:");
        println!("  1 = Completely different");
        println!("  2 = Somewhat different");
        println!("  3 = Neutral/Mixed");
        println!("  4 = Quite similar");
        println!("  5 = Very similar/accurate");

        let similarity_score = loop {
            match self.read_line("Similarity score [1-5]:")? {
                None => return Ok(None),
                Some(line) => match parse_score(&line) {
                    Some(score) => break score,
                    None => println!("{}", "Enter a whole number from 1 to 5.".red()),
                },
            }
        };

        let notes = match self.read_line("Notes (optional):")? {
            None => return Ok(None),
            Some(line) if line.is_empty() => None,
            Some(line) => Some(line),
        };

        Ok(Some(ReviewEntry {
            actual_response,
            similarity_score,
            notes,
        }))
    }
}
