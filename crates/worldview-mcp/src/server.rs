use std::io::{self, BufRead, Write};

use anyhow::Context;
use serde_json::{json, Value};
use tracing::{debug, warn};

use worldview_core::{ConceptGraph, GraphStore};

use crate::protocol::{ErrorCode, Request, Response};
use crate::tools;

const SERVER_NAME: &str = "worldview";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
const PROTOCOL_VERSION: &str = "2024-11-05";

const WORLDVIEW_INSTRUCTIONS: &str = "\
Worldview keeps a persistent map of concepts and the causal links between them.\n\
\n\
ADD (worldview_add_concept): register a concept before linking it. Re-adding an existing \
name is harmless and keeps the original description.\n\
\n\
LINK (worldview_link): record that a cause leads to an effect. Both must already exist.\n\
\n\
SHOW (worldview_show): print every chain of causes, starting from concepts nothing causes.";

/// Server state for one stdio connection.
pub struct Session<'a> {
    store: &'a dyn GraphStore,
    graph: &'a mut ConceptGraph,
    instructions: String,
}

impl<'a> Session<'a> {
    /// `graph` is the state loaded from `store`; mutating tools save through
    /// `store` before the change reaches `graph`.
    pub fn new(
        store: &'a dyn GraphStore,
        graph: &'a mut ConceptGraph,
        extra: Option<&str>,
    ) -> Self {
        let instructions = match extra {
            Some(extra) => format!("{WORLDVIEW_INSTRUCTIONS}\n\n{extra}"),
            None => WORLDVIEW_INSTRUCTIONS.to_string(),
        };
        Self {
            store,
            graph,
            instructions,
        }
    }

    /// Handle one input line. Returns `None` for blank lines and
    /// notifications.
    pub fn handle_line(&mut self, line: &str) -> Option<Response> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let request: Request = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                warn!("unparseable request: {e}");
                return Some(Response::error(
                    Value::Null,
                    ErrorCode::Parse,
                    format!("parse error: {e}"),
                ));
            }
        };

        debug!("request: {}", request.method);
        let id = request.id?;
        Some(self.dispatch(id, &request.method, &request.params))
    }

    fn dispatch(&mut self, id: Value, method: &str, params: &Value) -> Response {
        match method {
            "initialize" => Response::result(
                id,
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": { "tools": {} },
                    "serverInfo": { "name": SERVER_NAME, "version": SERVER_VERSION },
                    "instructions": self.instructions
                }),
            ),
            "ping" => Response::result(id, json!({})),
            "tools/list" => Response::result(id, tools::tool_definitions()),
            "tools/call" => {
                let Some(name) = params.get("name").and_then(Value::as_str) else {
                    return Response::error(id, ErrorCode::InvalidParams, "missing tool name");
                };
                let args = params.get("arguments").cloned().unwrap_or_else(|| json!({}));
                let result = tools::call_tool(self.store, self.graph, name, &args);
                Response::result(id, result.to_value())
            }
            other => Response::error(
                id,
                ErrorCode::MethodNotFound,
                format!("method not found: {other}"),
            ),
        }
    }
}

/// Serve newline-delimited JSON-RPC from `input`, one response line per
/// request, until `input` is exhausted.
pub fn serve<R: BufRead, W: Write>(
    input: R,
    output: &mut W,
    session: &mut Session<'_>,
) -> anyhow::Result<()> {
    for line in input.lines() {
        let line = line.context("reading request")?;
        if let Some(response) = session.handle_line(&line) {
            serde_json::to_writer(&mut *output, &response)?;
            output.write_all(b"\n")?;
            output.flush()?;
        }
    }
    Ok(())
}

/// Run the MCP server on stdio. Blocks until stdin is closed.
pub fn run_server(
    store: &dyn GraphStore,
    graph: &mut ConceptGraph,
    instructions: Option<&str>,
) -> anyhow::Result<()> {
    let mut session = Session::new(store, graph, instructions);
    serve(io::stdin().lock(), &mut io::stdout(), &mut session)
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldview_store::JsonFileStore;

    fn run(input: &str, store: &JsonFileStore, graph: &mut ConceptGraph) -> Vec<Value> {
        let mut session = Session::new(store, graph, None);
        let mut out = Vec::new();
        serve(input.as_bytes(), &mut out, &mut session).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    fn temp_store() -> (tempfile::TempDir, JsonFileStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("w.json"));
        (dir, store)
    }

    #[test]
    fn test_initialize_and_ping() {
        let (_dir, store) = temp_store();
        let mut graph = ConceptGraph::new();

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#,
            "\n"
        );
        let responses = run(input, &store, &mut graph);

        assert_eq!(responses.len(), 2);
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(responses[0]["result"]["serverInfo"]["name"], "worldview");
        assert_eq!(responses[1]["id"], 2);
        assert_eq!(responses[1]["result"], json!({}));
    }

    #[test]
    fn test_extra_instructions_appended() {
        let (_dir, store) = temp_store();
        let mut graph = ConceptGraph::new();
        let mut session = Session::new(&store, &mut graph, Some("Prefer short names."));

        let resp = session
            .handle_line(r#"{"jsonrpc":"2.0","id":1,"method":"initialize"}"#)
            .unwrap();
        let value = serde_json::to_value(&resp).unwrap();
        let text = value["result"]["instructions"].as_str().unwrap();
        assert!(text.starts_with("Worldview keeps"));
        assert!(text.ends_with("Prefer short names."));
    }

    #[test]
    fn test_parse_error_and_unknown_method() {
        let (_dir, store) = temp_store();
        let mut graph = ConceptGraph::new();

        let input = "not json\n{\"jsonrpc\":\"2.0\",\"id\":7,\"method\":\"nope\"}\n";
        let responses = run(input, &store, &mut graph);

        assert_eq!(responses[0]["error"]["code"], -32700);
        assert_eq!(responses[0]["id"], Value::Null);
        assert_eq!(responses[1]["error"]["code"], -32601);
        assert_eq!(responses[1]["id"], 7);
    }

    #[test]
    fn test_tools_call_session() {
        let (_dir, store) = temp_store();
        let mut graph = ConceptGraph::new();

        let calls = [
            json!({"name": "worldview_add_concept", "arguments": {"name": "A"}}),
            json!({"name": "worldview_add_concept", "arguments": {"name": "B"}}),
            json!({"name": "worldview_link", "arguments": {"cause": "A", "effect": "B"}}),
            json!({"name": "worldview_link", "arguments": {"cause": "A", "effect": "Z"}}),
            json!({"name": "worldview_show"}),
        ];
        let input: String = calls
            .iter()
            .enumerate()
            .map(|(i, params)| {
                let req = json!({
                    "jsonrpc": "2.0",
                    "id": i,
                    "method": "tools/call",
                    "params": params
                });
                format!("{req}\n")
            })
            .collect();
        let responses = run(&input, &store, &mut graph);

        assert_eq!(responses.len(), 5);
        assert_eq!(responses[2]["result"]["content"][0]["text"], "Linked: A -> B");
        assert_eq!(responses[2]["result"]["isError"], false);
        assert_eq!(responses[3]["result"]["isError"], true);
        assert_eq!(responses[3]["result"]["content"][0]["text"], "Unknown effect concept: Z");
        assert_eq!(responses[4]["result"]["content"][0]["text"], "A\n  B");
        assert_eq!(store.load().unwrap(), graph);
    }

    #[test]
    fn test_tools_call_missing_name() {
        let (_dir, store) = temp_store();
        let mut graph = ConceptGraph::new();

        let input = "{\"jsonrpc\":\"2.0\",\"id\":1,\"method\":\"tools/call\"}\n";
        let responses = run(input, &store, &mut graph);
        assert_eq!(responses[0]["error"]["code"], -32602);
    }
}
