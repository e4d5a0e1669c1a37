//! Prompt construction from schema metadata.

use crate::database::Schema;

/// Hint suffixes cycled by iteration index. The first variant is the base
/// prompt itself so the unhinted phrasing stays in rotation.
pub const HINTS: [&str; 5] = [
    "",
    "\nHint: use GROUP BY if aggregation is required.",
    "\nHint: use JOIN to combine multiple tables.",
    "\nHint: consider adding WHERE clause.",
    "\nHint: use ORDER BY to sort results.",
];

/// Build the base prompt: instructions, the introspected schema, and the
/// question. Column names with spaces or parentheses get quoted so the
/// model sees them the way SQLite expects them back.
pub fn base_prompt(schema: &Schema, question: &str) -> String {
    let mut schema_lines = Vec::new();
    for (table, info) in schema {
        schema_lines.push(format!("Table `{table}` has the following columns:"));
        for (column, declared_type) in info.columns.iter().zip(info.types.iter()) {
            let quoted = if column.contains(' ') || column.contains('(') {
                format!("\"{column}\"")
            } else {
                column.clone()
            };
            schema_lines.push(format!(" - {quoted} ({declared_type})"));
        }
    }
    let schema_text = schema_lines.join("\n");

    format!(
        "You are an expert in generating valid SQLite SQL queries.\n\
         \n\
         Instructions:\n\
         - Use **only** the tables and columns provided in the schema.\n\
         - Use **double quotes** around column names with spaces or special characters.\n\
         - End your query with a semicolon.\n\
         - Only use valid SQL syntax that works in SQLite.\n\
         \n\
         Schema:\n\
         {schema_text}\n\
         \n\
         Question:\n\
         \"{question}\"\n\
         \n\
         SQL Query:\n"
    )
}

/// Base prompt plus the hint suffix for iteration `index`.
pub fn prompt_variant(base: &str, index: usize) -> String {
    format!("{base}{}", HINTS[index % HINTS.len()])
}
