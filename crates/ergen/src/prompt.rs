//! Prompt construction.
//!
//! Four prompts drive the pipeline: diagram generation from a description,
//! SQL export, audit, and fix-apply. Wording is fixed here; the SQL dialect
//! and audit language come from [`PromptConfig`].

use std::fmt;

use crate::config::{PromptConfig, SqlDialect};

/// A non-empty prompt ready to be sent to a [`TextGenerator`](crate::client::TextGenerator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt(String);

impl Prompt {
    /// Wraps prompt text, returning `None` when it is blank.
    pub fn new(text: impl Into<String>) -> Option<Self> {
        let text = text.into();
        (!text.trim().is_empty()).then_some(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Prompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Relationship syntax the validator accepts most reliably.
const RELATIONSHIP_RULE: &str = "Write relationships as `ENTITY_A ||--o{ ENTITY_B : label`, with the \
     cardinality symbols |o, ||, }o or }| on the left and o|, ||, o{ or |{ on the right.";

const LABEL_RULE: &str = "Every relationship needs a label after the ':'.";

/// Builds the pipeline's prompts.
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sql_dialect: SqlDialect,
    response_language: String,
}

impl PromptBuilder {
    pub fn new(config: &PromptConfig) -> Self {
        Self {
            sql_dialect: config.sql_dialect(),
            response_language: config.response_language().to_string(),
        }
    }

    /// Prompt asking for `erDiagram` markup describing `description`.
    pub fn diagram(&self, description: &str) -> Prompt {
        Prompt(format!(
            "You are an expert data engineer. Generate Mermaid.js 'erDiagram' code for: \"{description}\".\n\
             RULES:\n\
             1. Return ONLY the code. No explanations and no greetings.\n\
             2. Use 'erDiagram' syntax.\n\
             3. Do NOT use spaces in entity names (use_underscores).\n\
             4. Do NOT use special characters or accents.\n\
             5. {RELATIONSHIP_RULE}\n\
             6. {LABEL_RULE}"
        ))
    }

    /// Prompt asking for the SQL schema of a validated diagram.
    pub fn sql(&self, markup: &str) -> Prompt {
        Prompt(format!(
            "Convert this ER diagram to SQL ({dialect}):\n{markup}\n\n\
             RULES:\n\
             1. Return formatted, readable SQL.\n\
             2. Use line breaks and proper indentation.\n\
             3. Only CREATE TABLE statements.\n\
             4. Return ONLY the code. No explanations and no greetings.",
            dialect = self.sql_dialect,
        ))
    }

    /// Prompt asking for a quality audit of a validated diagram.
    pub fn audit(&self, markup: &str) -> Prompt {
        Prompt(format!(
            "Analyze this ER diagram:\n{markup}\n\n\
             Look for modelling errors and suggest improvements. Respond in Markdown, in {language}.",
            language = self.response_language,
        ))
    }

    /// Prompt asking for the diagram rewritten to apply an audit.
    pub fn fix(&self, markup: &str, audit: &str) -> Prompt {
        Prompt(format!(
            "Act as a senior data engineer.\n\n\
             This is the current Mermaid ER code:\n{markup}\n\n\
             This is an audit report with errors and suggestions:\n{audit}\n\n\
             YOUR TASK: Rewrite the complete Mermaid code applying the corrections suggested in the audit.\n\
             RULES:\n\
             1. Keep the 'erDiagram' syntax.\n\
             2. Return ONLY the clean code. No explanations, no markdown and no greetings.\n\
             3. Fix the relationships and attributes the audit mentions.\n\
             4. {RELATIONSHIP_RULE}\n\
             5. {LABEL_RULE}"
        ))
    }
}
