//! Prompts shipped with askdb.
//!
//! Each can be replaced per workspace by `.askdb/prompts/<id>.yml`.

/// Turns a (question, literal answer) pair into a sentence.
pub const ANSWER_REPHRASE: &str = "answer.rephrase";

/// Writes SQL for a question from retrieved schema, docs and examples.
pub const SQL_GENERATE: &str = "sql.generate";

/// Guesses the business question an example query answers.
pub const SQL_QUESTION: &str = "sql.question";

const ANSWER_REPHRASE_YAML: &str = r#"
id: answer.rephrase
title: Rephrase a literal answer as a sentence
apiVersion: "1.0"
template: "Rewrite the question '{{question}}' as a declarative sentence with a answer '{{answer}}'."
variables: [question, answer]
"#;

const SQL_GENERATE_YAML: &str = r#"
id: sql.generate
title: Generate SQL from retrieved context
apiVersion: "1.0"
system: |
  You are a {{dialect}} expert. Please help to generate a SQL query to answer the question. Your response should ONLY be based on the given context and follow the response guidelines and format instructions.

  ===Tables
  {{tables}}
  {{#if documentation}}

  ===Additional Context

  {{documentation}}
  {{/if}}

  ===Response Guidelines
  1. If the provided context is sufficient, please generate a valid SQL query without any explanations for the question.
  2. If the provided context is almost sufficient but requires knowledge of a specific string in a particular column, please generate an intermediate SQL query to find the distinct strings in that column. Prepend the query with a comment saying intermediate_sql
  3. If the provided context is insufficient, please explain why it can't be generated.
  4. Please use the most relevant table(s).
  5. If the question has been asked and answered before, please repeat the answer exactly as it was given before.
  6. Ensure that the output SQL is {{dialect}}-compliant and executable, and free of syntax errors.
template: "{{question}}"
variables: [dialect, tables, question]
"#;

const SQL_QUESTION_YAML: &str = r#"
id: sql.question
title: Guess the question behind a query
apiVersion: "1.0"
system: "The user will give you SQL and you will try to guess what the business question this query is answering. Return just the question without any additional explanation. Do not reference the table name in the question."
template: "{{sql}}"
variables: [sql]
"#;

/// YAML source of a built-in prompt.
pub fn source(id: &str) -> Option<&'static str> {
    match id {
        ANSWER_REPHRASE => Some(ANSWER_REPHRASE_YAML),
        SQL_GENERATE => Some(SQL_GENERATE_YAML),
        SQL_QUESTION => Some(SQL_QUESTION_YAML),
        _ => None,
    }
}

/// Ids of every built-in prompt.
pub fn ids() -> [&'static str; 3] {
    [ANSWER_REPHRASE, SQL_GENERATE, SQL_QUESTION]
}
