use serde_json::{json, Value};
use tracing::{info, warn};

use worldview_core::{ConceptGraph, GraphStore};

use crate::protocol::ToolResult;

// ---------------------------------------------------------------------------
// Tool schemas for tools/list
// ---------------------------------------------------------------------------

pub fn tool_definitions() -> Value {
    json!({
        "tools": [
            {
                "name": "worldview_add_concept",
                "description": "Register a concept in the worldview. Adding a name that already exists changes nothing; the first description is kept.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "name": {
                            "type": "string",
                            "description": "Unique concept name"
                        },
                        "description": {
                            "type": "string",
                            "default": "",
                            "description": "Free-text description (optional)"
                        }
                    },
                    "required": ["name"]
                }
            },
            {
                "name": "worldview_link",
                "description": "Record that one concept causes another. Both concepts must already exist. Linking the same pair twice is a no-op.",
                "inputSchema": {
                    "type": "object",
                    "properties": {
                        "cause": {
                            "type": "string",
                            "description": "Name of the cause concept"
                        },
                        "effect": {
                            "type": "string",
                            "description": "Name of the effect concept"
                        }
                    },
                    "required": ["cause", "effect"]
                }
            },
            {
                "name": "worldview_show",
                "description": "Render the worldview as an indented forest, starting from every concept that nothing causes.",
                "inputSchema": {
                    "type": "object",
                    "properties": {}
                }
            },
            {
                "name": "worldview_list_concepts",
                "description": "List all concepts with their descriptions, sorted by name.",
                "inputSchema": {
                    "type": "object",
                    "properties": {}
                }
            }
        ]
    })
}

// ---------------------------------------------------------------------------
// Tool dispatch
// ---------------------------------------------------------------------------

pub fn call_tool(
    store: &dyn GraphStore,
    graph: &mut ConceptGraph,
    name: &str,
    args: &Value,
) -> ToolResult {
    match name {
        "worldview_add_concept" => tool_add_concept(store, graph, args),
        "worldview_link" => tool_link(store, graph, args),
        "worldview_show" => tool_show(graph),
        "worldview_list_concepts" => tool_list_concepts(graph),
        _ => ToolResult::error(format!("unknown tool: {name}")),
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn get_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

/// Persist `next` and only then make it the live graph.
fn commit(
    store: &dyn GraphStore,
    graph: &mut ConceptGraph,
    next: ConceptGraph,
) -> Result<(), ToolResult> {
    store
        .save(&next)
        .map_err(|e| ToolResult::error(format!("failed to save: {e}")))?;
    *graph = next;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tool handlers
// ---------------------------------------------------------------------------

fn tool_add_concept(
    store: &dyn GraphStore,
    graph: &mut ConceptGraph,
    args: &Value,
) -> ToolResult {
    let name = get_str(args, "name").map(str::trim).unwrap_or("");
    if name.is_empty() {
        return ToolResult::error("Concept name required");
    }
    let description = get_str(args, "description").map(str::trim).unwrap_or("");

    let mut next = graph.clone();
    if !next.add_concept(name, description) {
        return ToolResult::ok(format!("Concept already exists: {name}"));
    }
    if let Err(e) = commit(store, graph, next) {
        return e;
    }

    info!("added concept {name}");
    ToolResult::ok(format!("Added concept: {name}"))
}

fn tool_link(store: &dyn GraphStore, graph: &mut ConceptGraph, args: &Value) -> ToolResult {
    let cause = get_str(args, "cause").map(str::trim).unwrap_or("");
    let effect = get_str(args, "effect").map(str::trim).unwrap_or("");
    if cause.is_empty() || effect.is_empty() {
        return ToolResult::error("Cause and effect required");
    }

    let mut next = graph.clone();
    match next.link(cause, effect) {
        Ok(true) => {}
        Ok(false) => return ToolResult::ok(format!("Already linked: {cause} -> {effect}")),
        Err(e) => {
            warn!("link rejected: {e}");
            return ToolResult::error(e.to_string());
        }
    }
    if let Err(e) = commit(store, graph, next) {
        return e;
    }

    info!("linked {cause} -> {effect}");
    ToolResult::ok(format!("Linked: {cause} -> {effect}"))
}

fn tool_show(graph: &ConceptGraph) -> ToolResult {
    ToolResult::ok(graph.render_text())
}

fn tool_list_concepts(graph: &ConceptGraph) -> ToolResult {
    if graph.is_empty() {
        return ToolResult::ok("No concepts yet.");
    }

    let mut output = String::new();
    for (name, concept) in graph.concepts() {
        if concept.description.is_empty() {
            output.push_str(&format!("{name}\n"));
        } else {
            output.push_str(&format!("{name}: {}\n", concept.description));
        }
    }
    ToolResult::ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use worldview_store::JsonFileStore;

    fn setup() -> (tempfile::TempDir, JsonFileStore, ConceptGraph) {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("worldview.json"));
        (dir, store, ConceptGraph::new())
    }

    fn add(store: &JsonFileStore, graph: &mut ConceptGraph, name: &str, desc: &str) -> ToolResult {
        let args = json!({ "name": name, "description": desc });
        call_tool(store, graph, "worldview_add_concept", &args)
    }

    fn link(
        store: &JsonFileStore,
        graph: &mut ConceptGraph,
        cause: &str,
        effect: &str,
    ) -> ToolResult {
        let args = json!({ "cause": cause, "effect": effect });
        call_tool(store, graph, "worldview_link", &args)
    }

    #[test]
    fn test_tool_definitions_lists_all_tools() {
        let defs = tool_definitions();
        let names: Vec<&str> = defs["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "worldview_add_concept",
                "worldview_link",
                "worldview_show",
                "worldview_list_concepts"
            ]
        );
    }

    #[test]
    fn test_add_concept_persists() {
        let (_dir, store, mut graph) = setup();
        let res = add(&store, &mut graph, " Sun ", "star");
        assert_eq!(res, ToolResult::ok("Added concept: Sun"));

        let loaded = store.load().unwrap();
        assert_eq!(loaded.concept("Sun").unwrap().description, "star");
        assert_eq!(loaded, graph);
    }

    #[test]
    fn test_add_existing_concept_keeps_description() {
        let (_dir, store, mut graph) = setup();
        add(&store, &mut graph, "Sun", "star");
        let res = add(&store, &mut graph, "Sun", "lamp");

        assert_eq!(res, ToolResult::ok("Concept already exists: Sun"));
        assert_eq!(graph.concept("Sun").unwrap().description, "star");
    }

    #[test]
    fn test_add_blank_name_rejected() {
        let (_dir, store, mut graph) = setup();
        let res = add(&store, &mut graph, "   ", "");
        assert_eq!(res, ToolResult::error("Concept name required"));
        assert!(graph.is_empty());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_link_and_show() {
        let (_dir, store, mut graph) = setup();
        for name in ["Sun", "Heat", "Drought"] {
            add(&store, &mut graph, name, "");
        }
        let res = link(&store, &mut graph, "Sun", "Heat");
        assert_eq!(res, ToolResult::ok("Linked: Sun -> Heat"));
        link(&store, &mut graph, "Heat", "Drought");

        let again = link(&store, &mut graph, "Sun", "Heat");
        assert_eq!(again, ToolResult::ok("Already linked: Sun -> Heat"));

        let shown = call_tool(&store, &mut graph, "worldview_show", &json!({}));
        assert_eq!(shown.text, "Sun\n  Heat\n    Drought");
        assert_eq!(store.load().unwrap(), graph);
    }

    #[test]
    fn test_link_trims_names_like_add() {
        let (_dir, store, mut graph) = setup();
        add(&store, &mut graph, " Sun", "");
        add(&store, &mut graph, "Heat ", "");

        let res = link(&store, &mut graph, " Sun", " Heat ");
        assert_eq!(res, ToolResult::ok("Linked: Sun -> Heat"));
        assert_eq!(graph.effects_of("Sun"), ["Heat"]);
    }

    #[test]
    fn test_link_unknown_concept_reports_side_and_leaves_state() {
        let (_dir, store, mut graph) = setup();
        add(&store, &mut graph, "Sun", "");
        let saved = std::fs::read_to_string(store.path()).unwrap();
        let before = graph.clone();

        let res = link(&store, &mut graph, "Sun", "Rain");
        assert_eq!(res, ToolResult::error("Unknown effect concept: Rain"));
        assert_eq!(graph, before);
        assert_eq!(std::fs::read_to_string(store.path()).unwrap(), saved);
    }

    #[test]
    fn test_link_missing_or_blank_arguments() {
        let (_dir, store, mut graph) = setup();
        let missing = call_tool(&store, &mut graph, "worldview_link", &json!({"cause": "Sun"}));
        assert_eq!(missing, ToolResult::error("Cause and effect required"));

        let blank = link(&store, &mut graph, "  ", "Sun");
        assert_eq!(blank, ToolResult::error("Cause and effect required"));
    }

    #[test]
    fn test_show_empty() {
        let (_dir, store, mut graph) = setup();
        let res = call_tool(&store, &mut graph, "worldview_show", &json!({}));
        assert_eq!(res, ToolResult::ok("Worldview is empty"));
    }

    #[test]
    fn test_list_concepts_sorted() {
        let (_dir, store, mut graph) = setup();
        add(&store, &mut graph, "Sun", "star");
        add(&store, &mut graph, "Heat", "");

        let res = call_tool(&store, &mut graph, "worldview_list_concepts", &json!({}));
        assert_eq!(res.text, "Heat\nSun: star\n");
    }

    #[test]
    fn test_failed_save_keeps_graph() {
        let dir = tempfile::tempdir().unwrap();
        // a directory where the file should be makes the rename fail
        let path = dir.path().join("worldview.json");
        std::fs::create_dir_all(path.join("occupied")).unwrap();
        let store = JsonFileStore::new(&path);
        let mut graph = ConceptGraph::new();

        let res = add(&store, &mut graph, "Sun", "");
        assert!(res.is_error);
        assert!(res.text.starts_with("failed to save"));
        assert!(graph.is_empty());
    }

    #[test]
    fn test_unknown_tool() {
        let (_dir, store, mut graph) = setup();
        let res = call_tool(&store, &mut graph, "worldview_delete", &json!({}));
        assert_eq!(res, ToolResult::error("unknown tool: worldview_delete"));
    }
}
