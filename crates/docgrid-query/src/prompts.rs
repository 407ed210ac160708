//! Prompt templates and response shapes.

use docgrid_core::{Rule, RuleType};
use docgrid_llm::ResponseShape;
use serde_json::json;

use crate::types::AnswerType;

fn type_instruction(ty: AnswerType) -> &'static str {
    match ty {
        AnswerType::Int => "Answer with a single integer.",
        AnswerType::Bool => "Answer with true or false.",
        AnswerType::Str => "Answer with a short text. If the answer is not in the context, answer \"not found\".",
        AnswerType::IntArray => "Answer with a list of integers. Use an empty list if there are none.",
        AnswerType::StrArray => "Answer with a list of short texts. Use an empty list if there are none.",
    }
}

/// Rules rendered as numbered instructions. Entity resolution happens after
/// answering and is not shown to the model.
pub fn rule_instructions(rules: &[Rule]) -> String {
    let lines: Vec<String> = rules
        .iter()
        .filter_map(|rule| match rule.rule_type {
            RuleType::MustReturn if !rule.options.is_empty() => Some(format!(
                "Only answer with values from this list: {}.",
                rule.options.join(", ")
            )),
            RuleType::MayReturn if !rule.options.is_empty() => Some(format!(
                "Prefer values from this list where they fit: {}.",
                rule.options.join(", ")
            )),
            RuleType::MaxLength => rule
                .length
                .or_else(|| rule.options.first().and_then(|o| o.trim().parse().ok()))
                .map(|n| format!("Keep the answer to at most {} items or characters.", n)),
            _ => None,
        })
        .collect();

    lines
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{}. {}", i + 1, line))
        .collect::<Vec<_>>()
        .join("\n")
}

fn with_rules(mut prompt: String, rules: &[Rule]) -> String {
    let instructions = rule_instructions(rules);
    if !instructions.is_empty() {
        prompt.push_str("\n\nFollow these rules:\n");
        prompt.push_str(&instructions);
    }
    prompt
}

/// Prompt for answering from retrieved document chunks.
pub fn retrieval_prompt(query: &str, context: &str, rules: &[Rule], ty: AnswerType) -> String {
    let prompt = format!(
        "Answer the question using only the document excerpts below.\n\n\
         Question: {}\n\n\
         Excerpts:\n{}\n\n\
         {}",
        query,
        if context.trim().is_empty() { "(none)" } else { context },
        type_instruction(ty)
    );
    with_rules(prompt, rules)
}

/// Prompt for questions answered without a document.
pub fn inference_prompt(query: &str, rules: &[Rule], ty: AnswerType) -> String {
    let prompt = format!(
        "Answer the question from the information it contains and general knowledge.\n\n\
         Question: {}\n\n\
         {}",
        query,
        type_instruction(ty)
    );
    with_rules(prompt, rules)
}

/// JSON shape with a single `answer` field of the declared type.
pub fn response_shape(ty: AnswerType) -> ResponseShape {
    let schema = match ty {
        AnswerType::Int => json!({"type": "integer"}),
        AnswerType::Bool => json!({"type": "boolean"}),
        AnswerType::Str => json!({"type": "string"}),
        AnswerType::IntArray => json!({"type": "array", "items": {"type": "integer"}}),
        AnswerType::StrArray => json!({"type": "array", "items": {"type": "string"}}),
    };
    ResponseShape::single_field(format!("answer_{}", ty.as_str()), "answer", schema)
}
