//! Training material for the DVD rental sample database.
//!
//! The schema was taken with `pg_dump --schema-only`; the glossary and the
//! example queries are retrieval context only and are never enforced.

/// DDL of every table in the database.
pub const SCHEMA_DDL: &str = include_str!("../data/schema.sql");

/// Business terminology and rules.
pub const GLOSSARY: &str = include_str!("../data/glossary.md");

const EXAMPLE_QUERIES: &str = include_str!("../data/queries.sql");

/// Representative queries, in file order, without trailing semicolons.
pub fn example_queries() -> Vec<&'static str> {
    EXAMPLE_QUERIES
        .split(';')
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_covers_core_tables() {
        for table in ["actor", "film", "customer", "rental", "payment", "inventory"] {
            assert!(
                SCHEMA_DDL.contains(&format!("CREATE TABLE {} (", table)),
                "missing table {}",
                table
            );
        }
        assert!(SCHEMA_DDL.contains("CREATE TYPE mpaa_rating"));
    }

    #[test]
    fn test_glossary_terms() {
        assert!(GLOSSARY.starts_with("Business Terminology"));
        assert!(GLOSSARY.contains("Rental Rate: Daily cost to rent a film"));
        assert!(GLOSSARY.contains("Business Rules:"));
    }

    #[test]
    fn test_ten_example_queries() {
        let queries = example_queries();
        assert_eq!(queries.len(), 10);
        assert!(queries[0].starts_with("SELECT customer_id, first_name"));
        assert!(queries.iter().all(|q| q.starts_with("SELECT")));
        assert!(queries.iter().all(|q| !q.ends_with(';')));
    }
}
