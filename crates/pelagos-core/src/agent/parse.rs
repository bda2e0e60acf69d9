//! Interpreting what the model sent back from the query phase.

use serde_json::Value;

use crate::llm_io::extract_json_fragment;

const SQL_KEYS: [&str; 4] = ["sql", "query", "sql_query", "sqlQuery"];
const ANSWER_KEYS: [&str; 3] = ["answer", "final_answer", "finalAnswer"];

/// A reply either carries a statement to run or answers the user directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmReply {
    Sql(String),
    Answer(String),
}

/// Accepts, in order: a JSON object with `sql`/`query`/`answer` keys, an
/// XML-tagged `<sql>` block, a fenced ```sql block, bare `SELECT ...` text,
/// and finally any non-empty prose as a direct answer.
pub fn parse_reply(raw: &str) -> Option<LlmReply> {
    if let Some(fragment) = extract_json_fragment(raw) {
        if let Ok(value) = serde_json::from_str::<Value>(&fragment) {
            for key in SQL_KEYS {
                if let Some(sql) = non_empty_str(&value, key) {
                    return Some(LlmReply::Sql(sql));
                }
            }
            for key in ANSWER_KEYS {
                if let Some(answer) = non_empty_str(&value, key) {
                    return Some(LlmReply::Answer(answer));
                }
            }
        }
    }
    if let Some(sql) = between_markers(raw, "<sql>", "</sql>") {
        return Some(LlmReply::Sql(sql));
    }
    if let Some(sql) = fenced_sql(raw) {
        return Some(LlmReply::Sql(sql));
    }
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let upper = trimmed.to_uppercase();
    if upper.starts_with("SELECT ") || upper.starts_with("WITH ") {
        return Some(LlmReply::Sql(trimmed.to_string()));
    }
    Some(LlmReply::Answer(trimmed.to_string()))
}

fn non_empty_str(value: &Value, key: &str) -> Option<String> {
    let text = value.get(key)?.as_str()?.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn between_markers(raw: &str, open: &str, close: &str) -> Option<String> {
    let start = raw.find(open)? + open.len();
    let rest = &raw[start..];
    let end = rest.find(close)?;
    let inner = rest[..end].trim();
    (!inner.is_empty()).then(|| inner.to_string())
}

fn fenced_sql(raw: &str) -> Option<String> {
    let start = raw
        .find("```sql")
        .map(|pos| pos + "```sql".len())
        .or_else(|| raw.find("```SQL").map(|pos| pos + "```SQL".len()))?;
    let rest = &raw[start..];
    let end = rest.find("```")?;
    let inner = rest[..end].trim();
    (!inner.is_empty()).then(|| inner.to_string())
}

/// Pulls the port names a generated query was filtering on, so an empty
/// result can trigger the historical lookup for the same pair. Understands
/// `LIKE '%name%'` and quoted equality operands, with or without `LOWER()`.
pub fn extract_like_ports(sql: &str) -> (Option<String>, Option<String>) {
    let lower = sql.to_lowercase();
    (
        column_operand(&lower, "origin_port"),
        column_operand(&lower, "destination_port"),
    )
}

fn column_operand(lower_sql: &str, column_prefix: &str) -> Option<String> {
    let mut search = 0;
    while let Some(pos) = lower_sql
        .get(search..)
        .and_then(|rest| rest.find(column_prefix))
    {
        let abs = search + pos;
        if let Some(value) = quoted_operand(&lower_sql[abs..]) {
            return Some(value);
        }
        search = abs + column_prefix.len();
    }
    None
}

fn quoted_operand(window: &str) -> Option<String> {
    let (op_pos, op_len) = window
        .find(" like ")
        .map(|pos| (pos, " like ".len()))
        .or_else(|| window.find('=').map(|pos| (pos, 1)))?;
    // The operand must belong to this column mention, not a later clause.
    if op_pos >= 80 {
        return None;
    }
    let mut after = window[op_pos + op_len..].trim_start();
    if let Some(rest) = after.strip_prefix("lower(") {
        after = rest.trim_start();
    }
    let quote = after.chars().next()?;
    if quote != '\'' && quote != '"' {
        return None;
    }
    let inner = &after[1..];
    let end = inner.find(quote)?;
    let value = inner[..end].trim_matches('%').trim();
    (!value.is_empty()).then(|| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_sql_and_answer_keys_are_understood() {
        assert_eq!(
            parse_reply(r#"{"sql": "SELECT 1"}"#),
            Some(LlmReply::Sql("SELECT 1".to_string()))
        );
        assert_eq!(
            parse_reply(r#"{"query": "SELECT 2"}"#),
            Some(LlmReply::Sql("SELECT 2".to_string()))
        );
        assert_eq!(
            parse_reply(r#"{"sqlQuery": "SELECT 3"}"#),
            Some(LlmReply::Sql("SELECT 3".to_string()))
        );
        assert_eq!(
            parse_reply(r#"{"answer": "No ferries today."}"#),
            Some(LlmReply::Answer("No ferries today.".to_string()))
        );
    }

    #[test]
    fn json_wrapped_in_prose_is_still_found() {
        let raw = "Sure, here is the query:\n```json\n{\"sql\": \"SELECT 1\"}\n```";
        assert_eq!(parse_reply(raw), Some(LlmReply::Sql("SELECT 1".to_string())));
    }

    #[test]
    fn sql_tags_and_fences_are_understood() {
        assert_eq!(
            parse_reply("<sql>SELECT * FROM ports</sql>"),
            Some(LlmReply::Sql("SELECT * FROM ports".to_string()))
        );
        assert_eq!(
            parse_reply("```sql\nSELECT * FROM ports\n```"),
            Some(LlmReply::Sql("SELECT * FROM ports".to_string()))
        );
    }

    #[test]
    fn bare_select_counts_as_sql_and_prose_as_answer() {
        assert_eq!(
            parse_reply("SELECT name FROM ports"),
            Some(LlmReply::Sql("SELECT name FROM ports".to_string()))
        );
        assert_eq!(
            parse_reply("There are no ferries on that day."),
            Some(LlmReply::Answer("There are no ferries on that day.".to_string()))
        );
        assert_eq!(parse_reply("   "), None);
    }

    #[test]
    fn like_ports_are_extracted_from_generated_sql() {
        let sql = "SELECT * FROM route_details \
                   WHERE LOWER(origin_port_name) LIKE '%piraeus%' \
                   AND LOWER(destination_port_name) LIKE '%naxos%'";
        assert_eq!(
            extract_like_ports(sql),
            (Some("piraeus".to_string()), Some("naxos".to_string()))
        );
    }

    #[test]
    fn equality_operands_are_extracted_too() {
        let sql = "SELECT * FROM route_details \
                   WHERE LOWER(origin_port_name) = LOWER('Milos') \
                   AND destination_port_code = 'KMS'";
        assert_eq!(
            extract_like_ports(sql),
            (Some("milos".to_string()), Some("kms".to_string()))
        );
    }

    #[test]
    fn queries_without_port_filters_yield_nothing() {
        assert_eq!(
            extract_like_ports("SELECT COUNT(*) FROM schedules"),
            (None, None)
        );
    }
}
