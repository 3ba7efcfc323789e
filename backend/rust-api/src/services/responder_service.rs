use async_trait::async_trait;
use regex::Regex;

use crate::models::chat::{ChatResponse, ReplySource};

/// Strategy for answering free-form study questions. The keyword matcher
/// below is the default; a real language backend can replace it without
/// touching the practice engine.
#[async_trait]
pub trait ConversationResponder: Send + Sync {
    async fn respond(&self, message: &str) -> anyhow::Result<ChatResponse>;
}

struct Template {
    topic: &'static str,
    pattern: Regex,
    reply: &'static str,
    suggestions: &'static [&'static str],
}

pub struct KeywordResponder {
    templates: Vec<Template>,
}

const FALLBACK_REPLY: &str = "I can help with exam topics such as design patterns, databases, \
networking, algorithms and project management. Try asking about one of them, or start a \
practice session to find your weak points.";

impl KeywordResponder {
    pub fn new() -> anyhow::Result<Self> {
        let specs: [(&str, &str, &str, &[&str]); 6] = [
            (
                "design_patterns",
                r"(?i)\b(design patterns?|singleton|factory|observer|strategy|adapter)\b",
                "Design-pattern questions usually test intent: name the problem the pattern \
                 solves, then match the participants. Creational patterns control object \
                 creation, structural patterns compose objects, behavioral patterns assign \
                 responsibilities.",
                &["What is the difference between Strategy and State?", "When is Singleton a bad idea?"],
            ),
            (
                "databases",
                r"(?i)\b(database|sql|normal form|normalization|transaction|index)\b",
                "For database questions check normal forms first (1NF atomic values, 2NF no \
                 partial dependency, 3NF no transitive dependency), then transaction \
                 isolation levels and what anomaly each one prevents.",
                &["Explain BCNF with an example", "Which isolation level prevents phantom reads?"],
            ),
            (
                "networking",
                r"(?i)\b(network|tcp|udp|ip|osi|subnet|routing|http)\b",
                "Networking items lean on the layer model: identify the layer, then the \
                 protocol and its port or header field. Subnetting questions reduce to \
                 counting host bits.",
                &["How many hosts fit in a /26?", "Why is TCP connection setup three-way?"],
            ),
            (
                "algorithms",
                r"(?i)\b(algorithm|complexity|sort|sorting|big.?o|recursion|dynamic programming)\b",
                "Algorithm questions usually ask for a complexity bound. Write the recurrence, \
                 then solve it with the master theorem or by counting loop iterations.",
                &["What is the complexity of quicksort in the worst case?", "When does greedy beat DP?"],
            ),
            (
                "project_management",
                r"(?i)\b(project|critical path|schedule|earned value|risk|wbs)\b",
                "Project-management calculations repeat: critical path is the longest path, \
                 float is late start minus early start, and earned value compares EV against \
                 PV and AC.",
                &["How do I compute total float?", "What does CPI < 1 mean?"],
            ),
            (
                "study_plan",
                r"(?i)\b(study plan|review|wrong (answers?|questions?)|weak|mistakes?)\b",
                "Start each session with your review queue, then let the practice batch pull \
                 from your weakest knowledge points. Re-answer a missed question correctly to \
                 clear it.",
                &["Show my weak knowledge points", "Start a review session"],
            ),
        ];

        let templates = specs
            .into_iter()
            .map(|(topic, pattern, reply, suggestions)| {
                Ok(Template {
                    topic,
                    pattern: Regex::new(pattern)?,
                    reply,
                    suggestions,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { templates })
    }

    fn reply_for(&self, message: &str) -> ChatResponse {
        match self.templates.iter().find(|t| t.pattern.is_match(message)) {
            Some(template) => ChatResponse {
                reply: collapse_whitespace(template.reply),
                topic: template.topic.to_string(),
                suggestions: template.suggestions.iter().map(|s| s.to_string()).collect(),
                source: ReplySource::Keyword,
            },
            None => ChatResponse {
                reply: collapse_whitespace(FALLBACK_REPLY),
                topic: "general".to_string(),
                suggestions: vec![
                    "Explain database normal forms".to_string(),
                    "What should I review today?".to_string(),
                ],
                source: ReplySource::Fallback,
            },
        }
    }
}

#[async_trait]
impl ConversationResponder for KeywordResponder {
    async fn respond(&self, message: &str) -> anyhow::Result<ChatResponse> {
        let response = self.reply_for(message);
        tracing::debug!(
            topic = %response.topic,
            source = ?response.source,
            "keyword responder matched"
        );
        Ok(response)
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn responder() -> KeywordResponder {
        KeywordResponder::new().unwrap()
    }

    #[test]
    fn matches_topic_keywords_case_insensitively() {
        let r = responder();
        assert_eq!(r.reply_for("How does the SINGLETON pattern work?").topic, "design_patterns");
        assert_eq!(r.reply_for("what is 3rd normal form").topic, "databases");
        assert_eq!(r.reply_for("tcp vs udp").topic, "networking");
    }

    #[test]
    fn unmatched_message_falls_back() {
        let response = responder().reply_for("hello there");
        assert_eq!(response.source, ReplySource::Fallback);
        assert_eq!(response.topic, "general");
        assert!(!response.suggestions.is_empty());
    }

    #[test]
    fn replies_are_single_spaced() {
        let response = responder().reply_for("critical path");
        assert!(!response.reply.contains("  "));
    }

    #[test]
    fn respond_through_trait_object() {
        let responder: Box<dyn ConversationResponder> = Box::new(responder());
        let response = tokio_test::block_on(responder.respond("my wrong answers")).unwrap();
        assert_eq!(response.topic, "study_plan");
    }
}
