use serde::Serialize;
use serde_json::Value;

/// Which context slot an entry point binds; drives the self-describing
/// documentation attached to error responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    Graph,
    Vertex,
    Edge,
}

impl Scope {
    fn description(self) -> &'static str {
        match self {
            Scope::Graph => "evaluate an ad-hoc traversal script for a graph",
            Scope::Vertex => "evaluate an ad-hoc traversal script for a vertex",
            Scope::Edge => "evaluate an ad-hoc traversal script for an edge",
        }
    }
}

const API_SCRIPT: &str = "the traversal script to be evaluated";
const API_SHOW_TYPES: &str =
    "displays the properties of the elements with their native data type (default is false)";
const API_RETURN_KEYS: &str =
    "an array of element property keys to return (default is to return all element properties)";

/// Machine-readable description of the endpoint's accepted parameters,
/// attached to every error response so a failure is self-diagnosing.
#[derive(Debug, Serialize)]
pub struct ApiDoc {
    description: &'static str,
    parameters: ApiParameters,
}

#[derive(Debug, Serialize)]
struct ApiParameters {
    script: &'static str,
    #[serde(rename = "rexster.showTypes")]
    show_types: &'static str,
    #[serde(rename = "rexster.returnKeys")]
    return_keys: &'static str,
}

impl ApiDoc {
    fn for_scope(scope: Scope) -> Self {
        Self {
            description: scope.description(),
            parameters: ApiParameters {
                script: API_SCRIPT,
                show_types: API_SHOW_TYPES,
                return_keys: API_RETURN_KEYS,
            },
        }
    }
}

/// Success form of the response contract. When the evaluation produced no
/// value the `results` field is omitted entirely, so callers can tell "no
/// return value" apart from "empty result set".
#[derive(Debug, Serialize)]
pub struct SuccessEnvelope {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    results: Option<Vec<Value>>,
}

/// Failure form of the response contract.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    success: bool,
    error: String,
    api: ApiDoc,
}

pub fn success(results: Option<Vec<Value>>) -> SuccessEnvelope {
    SuccessEnvelope {
        success: true,
        results,
    }
}

pub fn error(message: impl Into<String>, scope: Scope) -> ErrorEnvelope {
    ErrorEnvelope {
        success: false,
        error: message.into(),
        api: ApiDoc::for_scope(scope),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_with_no_value_omits_results_entirely() {
        let rendered = serde_json::to_value(success(None)).unwrap();

        assert_eq!(rendered, json!({ "success": true }));
    }

    #[test]
    fn success_with_empty_results_keeps_the_array() {
        let rendered = serde_json::to_value(success(Some(Vec::new()))).unwrap();

        assert_eq!(rendered, json!({ "success": true, "results": [] }));
    }

    #[test]
    fn success_with_results_lists_them() {
        let rendered = serde_json::to_value(success(Some(vec![json!(true)]))).unwrap();

        assert_eq!(rendered, json!({ "success": true, "results": [true] }));
    }

    #[test]
    fn error_carries_message_and_api_documentation() {
        let rendered = serde_json::to_value(error("no script provided", Scope::Vertex)).unwrap();

        assert_eq!(rendered["success"], json!(false));
        assert_eq!(rendered["error"], json!("no script provided"));
        assert!(rendered["api"]["description"]
            .as_str()
            .unwrap()
            .contains("vertex"));
        let parameters = rendered["api"]["parameters"].as_object().unwrap();
        assert!(parameters.contains_key("script"));
        assert!(parameters.contains_key("rexster.showTypes"));
        assert!(parameters.contains_key("rexster.returnKeys"));
    }
}
