//! Prompt templates with `{name}` placeholders.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use bankchat_shared::{BankChatError, Result};

/// Matches `{identifier}` placeholders.
static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// The banking assistant prompt fed to the chat model on every turn.
pub const BANKING_ASSISTANT_TEMPLATE: &str = "
You are a helpful banking assistant. Use the context below to answer the question accurately and professionally.

If the question is related to the provided context, give a detailed and helpful answer.
If the question is not related to banking or the context, politely say that you can only help with banking-related questions.

Context:
{context}

Question: {question}

Answer:
";

/// A text template whose placeholders are checked at construction.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    variables: BTreeSet<String>,
}

impl PromptTemplate {
    /// Parse `template` and require that every name in `required` appears
    /// as a placeholder.
    pub fn new(template: impl Into<String>, required: &[&str]) -> Result<Self> {
        let template = template.into();
        let variables: BTreeSet<String> = PLACEHOLDER_RE
            .captures_iter(&template)
            .map(|c| c[1].to_string())
            .collect();

        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|name| !variables.contains(*name))
            .collect();
        if !missing.is_empty() {
            return Err(BankChatError::validation(format!(
                "prompt template is missing placeholder(s): {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            template,
            variables,
        })
    }

    /// The fixed `{context}` / `{question}` banking template.
    pub fn banking_assistant() -> Self {
        Self::new(BANKING_ASSISTANT_TEMPLATE, &["context", "question"])
            .expect("built-in template has its placeholders")
    }

    /// Placeholder names found in the template.
    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.variables.iter().map(String::as_str)
    }

    /// Substitute placeholders in a single pass. Placeholders without a value
    /// are left as-is, and substituted text is never re-scanned.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        PLACEHOLDER_RE
            .replace_all(&self.template, |caps: &regex::Captures<'_>| {
                let name = &caps[1];
                values
                    .iter()
                    .find(|(key, _)| *key == name)
                    .map(|(_, value)| (*value).to_string())
                    .unwrap_or_else(|| caps[0].to_string())
            })
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn banking_template_has_both_placeholders() {
        let prompt = PromptTemplate::banking_assistant();
        let vars: Vec<&str> = prompt.variables().collect();
        assert_eq!(vars, vec!["context", "question"]);
    }

    #[test]
    fn render_substitutes_values() {
        let prompt = PromptTemplate::banking_assistant();
        let text = prompt.render(&[
            ("context", "Lost cards can be frozen in the app."),
            ("question", "I lost my credit card, what should I do?"),
        ]);
        assert!(text.contains("Context:\nLost cards can be frozen in the app.\n"));
        assert!(text.contains("Question: I lost my credit card, what should I do?\n"));
        assert!(text.trim_end().ends_with("Answer:"));
        assert!(!text.contains("{context}"));
    }

    #[test]
    fn substituted_text_is_not_rescanned() {
        let prompt = PromptTemplate::new("{context}|{question}", &[]).unwrap();
        let text = prompt.render(&[("context", "{question}"), ("question", "q")]);
        assert_eq!(text, "{question}|q");
    }

    #[test]
    fn unknown_placeholders_are_kept() {
        let prompt = PromptTemplate::new("Hi {name}, {greeting}", &["name"]).unwrap();
        assert_eq!(prompt.render(&[("name", "Ada")]), "Hi Ada, {greeting}");
    }

    #[test]
    fn missing_required_placeholder_rejected() {
        let err = PromptTemplate::new("Only {context}", &["context", "question"]).unwrap_err();
        assert!(err.to_string().contains("question"));
    }
}
