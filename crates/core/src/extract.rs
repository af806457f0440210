//! Locates the assistant text inside an agent runtime response.
//!
//! The runtime's response shape differs between deployments and SDK
//! versions. Each known shape has its own attempt function; they are tried in
//! order and the first hit wins. `None` means no known shape matched, and the
//! caller falls back to dumping the raw JSON.

use serde_json::Value;

/// One extraction attempt over `(whole response, candidate)`.
type Attempt = fn(&Value, &Value) -> Option<String>;

const ATTEMPTS: [Attempt; 4] =
    [candidate_content, candidate_message_content, candidate_string, top_level_text];

pub fn extract_text(response: &Value) -> Option<String> {
    if !response.is_object() {
        return response.as_str().map(str::to_string);
    }

    let candidate = candidate(response);
    ATTEMPTS.iter().find_map(|attempt| attempt(response, candidate))
}

/// `result`, else `message`, else the response itself.
fn candidate(response: &Value) -> &Value {
    response.get("result").or_else(|| response.get("message")).unwrap_or(response)
}

fn candidate_content(_: &Value, candidate: &Value) -> Option<String> {
    joined_text_blocks(candidate.get("content")?, "\n")
}

fn candidate_message_content(_: &Value, candidate: &Value) -> Option<String> {
    joined_text_blocks(candidate.get("message")?.get("content")?, "\n")
}

fn candidate_string(_: &Value, candidate: &Value) -> Option<String> {
    candidate.as_str().map(str::to_string)
}

fn top_level_text(response: &Value, _: &Value) -> Option<String> {
    response.get("text").and_then(Value::as_str).filter(|text| !text.is_empty()).map(str::to_string)
}

/// Non-empty `text` fields of a `[{ "text": … }]` list.
pub fn text_blocks(content: &Value) -> Vec<&str> {
    let Some(items) = content.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .filter_map(|item| item.get("text").and_then(Value::as_str))
        .filter(|text| !text.is_empty())
        .collect()
}

/// Joins [`text_blocks`], or `None` when there are none.
pub fn joined_text_blocks(content: &Value, separator: &str) -> Option<String> {
    let texts = text_blocks(content);
    (!texts.is_empty()).then(|| texts.join(separator))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{extract_text, joined_text_blocks};

    #[test]
    fn result_content_blocks_are_joined_with_newlines() {
        let response = json!({"result": {"content": [{"text": "hola"}, {"text": "mundo"}]}});
        assert_eq!(extract_text(&response).as_deref(), Some("hola\nmundo"));
    }

    #[test]
    fn message_is_used_when_result_is_absent() {
        let response = json!({"message": {"role": "assistant", "content": [{"text": "saldo: 10"}]}});
        assert_eq!(extract_text(&response).as_deref(), Some("saldo: 10"));
    }

    #[test]
    fn nested_message_content_inside_result() {
        let response = json!({
            "result": {"message": {"content": [{"text": "a"}, {"image": {}}, {"text": "b"}]}}
        });
        assert_eq!(extract_text(&response).as_deref(), Some("a\nb"));
    }

    #[test]
    fn string_result_is_returned_directly() {
        assert_eq!(extract_text(&json!({"result": "listo"})).as_deref(), Some("listo"));
    }

    #[test]
    fn top_level_text_is_the_last_resort() {
        assert_eq!(extract_text(&json!({"text": "hi"})).as_deref(), Some("hi"));
        assert_eq!(
            extract_text(&json!({"result": {"status": "ok"}, "text": "fallback"})).as_deref(),
            Some("fallback")
        );
    }

    #[test]
    fn unknown_shapes_yield_none_instead_of_failing() {
        for response in [
            json!({"status": "ok"}),
            json!({"result": {"content": []}}),
            json!({"result": {"content": [{"text": ""}]}}),
            json!({"result": null}),
            json!({"text": 5}),
            json!(42),
            json!(null),
        ] {
            assert_eq!(extract_text(&response), None, "response {response}");
        }
    }

    #[test]
    fn bare_string_response_is_text() {
        assert_eq!(extract_text(&json!("plain")).as_deref(), Some("plain"));
    }

    #[test]
    fn joined_blocks_skip_non_text_items() {
        let content = json!([{"text": "x"}, "loose", {"toolUse": {}}, {"text": "y"}]);
        assert_eq!(joined_text_blocks(&content, "").as_deref(), Some("xy"));
        assert_eq!(joined_text_blocks(&json!("not a list"), ""), None);
    }
}
