//! Literal answer extraction.

use askdb_core::{AppError, AppResult};
use askdb_sql::table::render_cell;
use askdb_sql::AskResponse;

/// Literal used when the generator returned no table at all.
pub const NO_ANSWER_SENTINEL: &str = "Could not extract answer";

/// First cell of the first row, rendered as text.
///
/// A missing table yields [`NO_ANSWER_SENTINEL`]; a table without that cell
/// is [`AppError::NoAnswer`].
pub fn extract_answer(response: &AskResponse) -> AppResult<String> {
    let Some(table) = &response.table else {
        return Ok(NO_ANSWER_SENTINEL.to_string());
    };

    table
        .cell(0, 0)
        .map(render_cell)
        .ok_or_else(|| AppError::NoAnswer("query returned no rows".to_string()))
}
