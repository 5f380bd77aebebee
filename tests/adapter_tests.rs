//! Cross-family adapter behavior through the public API.

use pretty_assertions::assert_eq;
use serde_json::json;

use tessera::adapter::text_fallback::parse_completion;
use tessera::adapter::{AdapterFamily, AdapterRegistry, PreparedCapability, ToolChoice};
use tessera::schema::translate;
use tessera::types::{CanonicalToolCall, CanonicalToolResult, Message, Role};

const FAMILIES: [AdapterFamily; 4] = [
    AdapterFamily::FunctionCall,
    AdapterFamily::ToolUse,
    AdapterFamily::FunctionDeclaration,
    AdapterFamily::TextFallback,
];

fn lookup_capability() -> PreparedCapability {
    PreparedCapability::new(
        "knowledge_lookup",
        "Look up an entity",
        translate(&json!({
            "type": "object",
            "additionalProperties": false,
            "properties": {
                "entity": { "type": "string", "description": "Gene or protein" },
                "depth": { "type": "integer", "enum": [1, 2, 3] }
            },
            "required": ["entity"]
        })),
    )
}

#[test]
fn every_family_advertises_the_capability() {
    let capability = lookup_capability();
    for family in FAMILIES {
        let tools = family.adapter().convert_capabilities(std::slice::from_ref(&capability));
        assert_eq!(tools.capability_count(), 1, "{family}");
        match family {
            AdapterFamily::TextFallback => {
                let prose = tools.prose().unwrap();
                assert!(prose.contains("### knowledge_lookup"));
                assert!(prose.contains("`entity` (string) (required)"));
            }
            _ => assert_eq!(tools.native_tools().len(), 1, "{family}"),
        }
    }
}

#[test]
fn declaration_shapes_follow_each_dialect() {
    let capability = lookup_capability();
    let caps = std::slice::from_ref(&capability);

    let function_call = AdapterFamily::FunctionCall.adapter().convert_capabilities(caps);
    let tool = &function_call.native_tools()[0];
    assert_eq!(tool["type"], "function");
    assert_eq!(tool["function"]["name"], "knowledge_lookup");
    assert_eq!(tool["function"]["parameters"]["required"], json!(["entity"]));

    let tool_use = AdapterFamily::ToolUse.adapter().convert_capabilities(caps);
    let tool = &tool_use.native_tools()[0];
    assert_eq!(tool["name"], "knowledge_lookup");
    assert_eq!(tool["input_schema"]["type"], "object");
    assert_eq!(
        tool["input_schema"]["properties"]["depth"]["enum"],
        json!([1, 2, 3])
    );

    let declarations = AdapterFamily::FunctionDeclaration
        .adapter()
        .convert_capabilities(caps);
    let declaration = &declarations.native_tools()[0]["functionDeclarations"][0];
    assert_eq!(declaration["name"], "knowledge_lookup");
    assert!(declaration["parameters"].get("additionalProperties").is_none());
}

#[test]
fn no_capabilities_means_nothing_to_advertise() {
    for family in FAMILIES {
        let tools = family.adapter().convert_capabilities(&[]);
        assert!(tools.is_empty(), "{family}");
    }
}

#[test]
fn results_round_trip_through_each_renderer() {
    let call = CanonicalToolCall::new("call_1", "knowledge_lookup", json!({ "entity": "BRCA1" }));
    let result = CanonicalToolResult::success("call_1", "knowledge_lookup", "tumor suppressor");
    for family in FAMILIES {
        let adapter = family.adapter();
        let transcript = vec![
            Message::user("BRCA1?"),
            adapter.format_invocation("Checking.", std::slice::from_ref(&call)),
            adapter.format_results(std::slice::from_ref(&result)),
        ];
        let rendered = adapter.render_messages(&transcript);
        let flat = serde_json::to_string(&rendered).unwrap();
        assert!(flat.contains("tumor suppressor"), "{family}: {flat}");
        assert!(flat.contains("knowledge_lookup") || flat.contains("call_1"), "{family}");
    }
}

#[test]
fn text_fallback_results_are_user_turns() {
    let adapter = AdapterFamily::TextFallback.adapter();
    let message = adapter.format_results(&[
        CanonicalToolResult::success("call_1", "knowledge_lookup", "ok"),
        CanonicalToolResult::failure("call_2", "knowledge_fail", "backend unavailable"),
    ]);
    assert_eq!(message.role, Role::User);
    assert_eq!(
        message.text(),
        "[Tool 'knowledge_lookup' returned]\nok\n\n[Tool 'knowledge_fail' failed]\nbackend unavailable"
    );
}

#[test]
fn text_fallback_reads_tagged_calls() {
    let (narrative, calls) = parse_completion(
        "Checking both.\n<tool_call>{\"name\": \"knowledge_lookup\", \"arguments\": {\"entity\": \"TP53\"}}</tool_call>\n<tool_call>{\"tool\": \"knowledge_lookup\", \"arguments\": {\"entity\": \"MDM2\"}}</tool_call>",
    );
    assert_eq!(narrative, "Checking both.");
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[1].input, json!({ "entity": "MDM2" }));
    assert_ne!(calls[0].correlation_id, calls[1].correlation_id);
}

#[test]
fn tool_choice_translation_per_family() {
    let required = ToolChoice::Required;
    assert_eq!(
        AdapterFamily::FunctionCall.adapter().tool_choice(&required),
        Some(json!("required"))
    );
    assert_eq!(
        AdapterFamily::ToolUse.adapter().tool_choice(&required),
        Some(json!({ "type": "any" }))
    );
    assert_eq!(
        AdapterFamily::FunctionDeclaration.adapter().tool_choice(&required),
        Some(json!({ "functionCallingConfig": { "mode": "ANY" } }))
    );
    assert_eq!(AdapterFamily::TextFallback.adapter().tool_choice(&required), None);
}

#[test]
fn registry_overrides_family_selection() {
    let mut registry = AdapterRegistry::new();
    assert_eq!(registry.family_for("openrouter"), AdapterFamily::FunctionCall);
    assert_eq!(registry.family_for("llama-local"), AdapterFamily::TextFallback);
    registry.register_family("llama-local", AdapterFamily::FunctionCall);
    assert_eq!(
        registry.adapter_for("LLAMA-LOCAL").family(),
        AdapterFamily::FunctionCall
    );
}
