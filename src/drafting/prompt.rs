//! Prompt assembly from case facts and correspondence.

use std::fmt::Write;

use crate::bundle::composer::truncate_chars;
use crate::case::models::{Case, Message};

/// Characters of each message body included in a prompt.
pub const PROMPT_BODY_LIMIT: usize = 1500;
/// Characters of evidence context included in a prompt.
pub const PROMPT_CONTEXT_LIMIT: usize = 50_000;

/// Correspondence digest fed to the model, one block per message.
pub fn evidence_context(messages: &[Message]) -> String {
    let mut context = String::new();
    for m in messages {
        let _ = write!(
            context,
            "DATE: {} | SENDER: {}\nCONTENT: {}\n---\n",
            m.date_sent,
            m.sender,
            truncate_chars(m.body(), PROMPT_BODY_LIMIT)
        );
    }
    truncate_chars(&context, PROMPT_CONTEXT_LIMIT).to_string()
}

/// Instruction for the letter before action.
pub fn letter_prompt(case: &Case, context: &str) -> String {
    format!(
        "ACT AS A UK BARRISTER. WRITE A LETTER BEFORE ACTION.\n\
         REF: {}.\n\
         FACTS: {}.\n\
         EVIDENCE DATABASE:\n\
         {}\n\
         INSTRUCTION: Cite specific emails and dates from database. \
         Demand remedy in 14 days. TONE: Cold, Formal.",
        case.title, case.summary, context
    )
}

/// Free-form question about a case.
pub fn consult_prompt(case: &Case, context: &str, question: &str) -> String {
    format!("CASE:{}\nEVIDENCE:{}\nQ:{}", case.title, context, question)
}
