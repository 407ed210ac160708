//! Query routing.

use crate::types::{AnswerType, QueryKind, QueryRequest, NO_DOCUMENT_ID};

/// Pick the retrieval strategy for a request.
///
/// The no-document sentinel always means inference. An explicit decomposition
/// tag wins next. Rules or a boolean answer call for hybrid search; anything
/// else is a plain similarity search.
pub fn route(request: &QueryRequest) -> QueryKind {
    let prompt = &request.prompt;
    if request.document_id == NO_DOCUMENT_ID {
        QueryKind::Inference
    } else if prompt.kind == Some(QueryKind::Decomposition) {
        QueryKind::Decomposition
    } else if !prompt.rules.is_empty() || prompt.answer_type == AnswerType::Bool {
        QueryKind::Hybrid
    } else {
        QueryKind::SimpleVector
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::QueryPrompt;
    use docgrid_core::{Rule, RuleType};

    fn request(doc: &str, prompt: QueryPrompt) -> QueryRequest {
        QueryRequest::new(doc, prompt)
    }

    #[test]
    fn test_sentinel_is_inference_even_with_tag() {
        let prompt = QueryPrompt::new("p", "What is 2+2?", AnswerType::Int)
            .with_kind(QueryKind::Decomposition);
        assert_eq!(route(&request(NO_DOCUMENT_ID, prompt)), QueryKind::Inference);
    }

    #[test]
    fn test_decomposition_tag() {
        let prompt = QueryPrompt::new("p", "Who and when?", AnswerType::Str)
            .with_kind(QueryKind::Decomposition)
            .with_rules(vec![Rule::new(RuleType::MayReturn, vec!["x".into()])]);
        assert_eq!(route(&request("doc", prompt)), QueryKind::Decomposition);
    }

    #[test]
    fn test_rules_or_bool_is_hybrid() {
        let with_rules = QueryPrompt::new("p", "Which city?", AnswerType::Str)
            .with_rules(vec![Rule::new(RuleType::MustReturn, vec!["Paris".into()])]);
        assert_eq!(route(&request("doc", with_rules)), QueryKind::Hybrid);

        let boolean = QueryPrompt::new("p", "Is it signed?", AnswerType::Bool);
        assert_eq!(route(&request("doc", boolean)), QueryKind::Hybrid);
    }

    #[test]
    fn test_plain_is_simple_vector() {
        let prompt = QueryPrompt::new("p", "Summarize", AnswerType::Str);
        assert_eq!(route(&request("doc", prompt)), QueryKind::SimpleVector);
    }

    #[test]
    fn test_other_tags_are_ignored() {
        let prompt = QueryPrompt::new("p", "Summarize", AnswerType::Str).with_kind(QueryKind::Hybrid);
        assert_eq!(route(&request("doc", prompt)), QueryKind::SimpleVector);
    }
}
