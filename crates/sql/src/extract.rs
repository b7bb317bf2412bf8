//! Pulling SQL out of model replies.

/// Marker the model puts on a query it needs to run before answering.
pub const INTERMEDIATE_SQL_MARKER: &str = "intermediate_sql";

/// Extract the SQL statement from a model reply.
///
/// Tries, in order: a ```` ```sql ```` fenced block, any fenced block, the
/// first `WITH`/`SELECT` statement up to its `;`. Falls back to the trimmed
/// reply, which then usually fails [`is_sql_valid`].
pub fn extract_sql(response: &str) -> String {
    if let Some(block) = fenced_block(response, Some("sql")) {
        return block;
    }
    if let Some(block) = fenced_block(response, None) {
        return block;
    }
    if let Some(statement) = first_statement(response) {
        return statement;
    }
    response.trim().to_string()
}

/// Whether `sql` is a read-only statement we are willing to run.
///
/// Leading `--` comment lines are skipped; the first keyword must be
/// `SELECT` or `WITH`.
pub fn is_sql_valid(sql: &str) -> bool {
    let first_word = strip_leading_comments(sql)
        .split(|c: char| c.is_whitespace() || c == '(')
        .find(|w| !w.is_empty())
        .map(str::to_ascii_uppercase);

    matches!(first_word.as_deref(), Some("SELECT") | Some("WITH"))
}

/// Whether the reply asks for an intermediate query first.
pub fn wants_intermediate_sql(response: &str) -> bool {
    response.contains(INTERMEDIATE_SQL_MARKER)
}

fn strip_leading_comments(sql: &str) -> &str {
    let mut rest = sql.trim_start();
    while rest.starts_with("--") {
        rest = match rest.find('\n') {
            Some(end) => rest[end + 1..].trim_start(),
            None => "",
        };
    }
    rest
}

/// Body of the first fenced code block, optionally with a given language tag.
fn fenced_block(response: &str, language: Option<&str>) -> Option<String> {
    let lower = response.to_ascii_lowercase();
    let fence_start = match language {
        Some(lang) => lower.find(&format!("```{}", lang))?,
        None => lower.find("```")?,
    };

    // Skip the rest of the opening fence line (language tag, if any)
    let after_fence = fence_start + 3;
    let body_start = response[after_fence..]
        .find('\n')
        .map(|i| after_fence + i + 1)?;
    let body_len = response[body_start..].find("```")?;

    let body = response[body_start..body_start + body_len].trim();
    if body.is_empty() {
        None
    } else {
        Some(body.to_string())
    }
}

/// First `WITH` or `SELECT` statement, through its terminating `;` if any.
fn first_statement(response: &str) -> Option<String> {
    let lower = response.to_ascii_lowercase();
    let start = [find_keyword(&lower, "with"), find_keyword(&lower, "select")]
        .into_iter()
        .flatten()
        .min()?;

    let rest = &response[start..];
    let statement = match rest.find(';') {
        Some(end) => &rest[..=end],
        None => rest,
    };
    Some(statement.trim().to_string())
}

/// Byte offset of `keyword` as a whole word followed by whitespace.
fn find_keyword(haystack: &str, keyword: &str) -> Option<usize> {
    let bytes = haystack.as_bytes();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(keyword) {
        let start = from + pos;
        let end = start + keyword.len();
        let boundary_before = start == 0 || !is_word_byte(bytes[start - 1]);
        let whitespace_after = bytes.get(end).is_some_and(|b| b.is_ascii_whitespace());
        if boundary_before && whitespace_after {
            return Some(start);
        }
        from = end;
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_'
}
