//! Prompt builder for rendering templates.

use crate::types::{BuiltPrompt, BuiltPromptMetadata, PromptDefinition};
use askdb_core::{AppError, AppResult};
use handlebars::Handlebars;
use std::collections::HashMap;

/// Build a prompt from a definition and input variables.
///
/// Every variable the definition declares must be present; extra variables
/// are allowed and simply unused by the template.
///
/// # Example
/// ```no_run
/// use askdb_prompt::{build_prompt, builtin_prompt};
/// use std::collections::HashMap;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let def = builtin_prompt("answer.rephrase")?;
/// let mut vars = HashMap::new();
/// vars.insert("question".to_string(), "How many films?".to_string());
/// vars.insert("answer".to_string(), "1000".to_string());
///
/// let built = build_prompt(&def, vars)?;
/// println!("User prompt: {}", built.user);
/// # Ok(())
/// # }
/// ```
pub fn build_prompt(
    definition: &PromptDefinition,
    variables: HashMap<String, String>,
) -> AppResult<BuiltPrompt> {
    tracing::trace!("Building prompt: {}", definition.id);

    let missing: Vec<&str> = definition
        .variables
        .iter()
        .filter(|name| !variables.contains_key(name.as_str()))
        .map(String::as_str)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::Prompt(format!(
            "Prompt '{}' is missing variables: {}",
            definition.id,
            missing.join(", ")
        )));
    }

    let system = definition
        .system
        .as_deref()
        .map(|template| render_template(template, &variables))
        .transpose()?
        .map(|s| s.trim_end().to_string());
    let user = render_template(&definition.template, &variables)?;

    Ok(BuiltPrompt {
        system,
        user,
        metadata: BuiltPromptMetadata {
            source_prompt_id: definition.id.clone(),
            resolved_variables: variables,
        },
    })
}

/// Render a Handlebars template with variables.
fn render_template(template: &str, variables: &HashMap<String, String>) -> AppResult<String> {
    let mut handlebars = Handlebars::new();

    // Prompts are plain text; HTML escaping would mangle quotes in SQL.
    handlebars.register_escape_fn(handlebars::no_escape);

    handlebars
        .register_template_string("prompt", template)
        .map_err(|e| AppError::Prompt(format!("Failed to register template: {}", e)))?;

    handlebars
        .render("prompt", variables)
        .map_err(|e| AppError::Prompt(format!("Failed to render template: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use crate::loader::builtin_prompt;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_simple_template() {
        let result = render_template("Question: {{prompt}}", &vars(&[("prompt", "Hello")]));
        assert_eq!(result.unwrap(), "Question: Hello");
    }

    #[test]
    fn test_no_html_escaping() {
        let result = render_template("{{sql}}", &vars(&[("sql", "WHERE rating = 'PG-13' AND a < b")]));
        assert_eq!(result.unwrap(), "WHERE rating = 'PG-13' AND a < b");
    }

    #[test]
    fn test_rephrase_prompt_shape() {
        let def = builtin_prompt(builtin::ANSWER_REPHRASE).unwrap();
        let built = build_prompt(
            &def,
            vars(&[
                ("question", "How many active customers are there?"),
                ("answer", "584"),
            ]),
        )
        .unwrap();

        assert!(built.system.is_none());
        assert_eq!(
            built.user,
            "Rewrite the question 'How many active customers are there?' as a declarative sentence with a answer '584'."
        );
        assert_eq!(built.metadata.source_prompt_id, "answer.rephrase");
    }

    #[test]
    fn test_sql_prompt_omits_empty_documentation() {
        let def = builtin_prompt(builtin::SQL_GENERATE).unwrap();
        let built = build_prompt(
            &def,
            vars(&[
                ("dialect", "PostgreSQL"),
                ("tables", "CREATE TABLE film (film_id SERIAL);"),
                ("documentation", ""),
                ("question", "How many films?"),
            ]),
        )
        .unwrap();

        let system = built.system.unwrap();
        assert!(system.starts_with("You are a PostgreSQL expert."));
        assert!(system.contains("CREATE TABLE film"));
        assert!(!system.contains("===Additional Context"));
        assert!(system.contains("PostgreSQL-compliant"));
        assert_eq!(built.user, "How many films?");
    }

    #[test]
    fn test_sql_prompt_includes_documentation() {
        let def = builtin_prompt(builtin::SQL_GENERATE).unwrap();
        let built = build_prompt(
            &def,
            vars(&[
                ("dialect", "PostgreSQL"),
                ("tables", "CREATE TABLE film (film_id SERIAL);"),
                ("documentation", "Rental Rate: Daily cost to rent a film"),
                ("question", "q"),
            ]),
        )
        .unwrap();

        let system = built.system.unwrap();
        assert!(system.contains("===Additional Context"));
        assert!(system.contains("Rental Rate: Daily cost"));
    }

    #[test]
    fn test_missing_variable_is_error() {
        let def = builtin_prompt(builtin::ANSWER_REPHRASE).unwrap();
        let result = build_prompt(&def, vars(&[("question", "q")]));
        let err = result.unwrap_err().to_string();
        assert!(err.contains("answer"));
    }
}
