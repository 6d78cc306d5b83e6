use reqwest::Method;
use serde_json::json;

use screen_discovery::screen::screen_model::Bounds;
use screen_discovery::session::appium::{
    W3C_ELEMENT_KEY, WireCommand, parse_element_refs, parse_rect, parse_response,
    parse_session_id,
};
use screen_discovery::session::capabilities::Capabilities;
use screen_discovery::session::driver::{ElementRef, Locator};
use screen_discovery::session::error::SessionError;

// ============================================================================
// Response envelopes
// ============================================================================

#[test]
fn ok_envelope_yields_value() {
    let value = parse_response("get_text", 200, r#"{"value": "Dome"}"#).unwrap();
    assert_eq!(value, json!("Dome"));
}

#[test]
fn empty_body_is_null_value() {
    assert_eq!(parse_response("back", 200, "  ").unwrap(), json!(null));
}

#[test]
fn error_envelope_becomes_protocol_error() {
    let body = r#"{"value": {"error": "no such element", "message": "not here", "stacktrace": ""}}"#;
    match parse_response("find_elements", 404, body).unwrap_err() {
        SessionError::Protocol {
            command,
            error,
            message,
        } => {
            assert_eq!(command, "find_elements");
            assert_eq!(error, "no such element");
            assert_eq!(message, "not here");
        }
        other => panic!("unexpected error: {:?}", other),
    }
}

#[test]
fn non_success_status_without_envelope_is_an_error() {
    let err = parse_response("click", 500, r#"{"value": null}"#).unwrap_err();
    assert!(err.to_string().contains("HTTP status 500"));
    assert!(!err.is_fatal());
}

#[test]
fn invalid_json_body_is_a_parse_error() {
    let err = parse_response("get_rect", 200, "<html>").unwrap_err();
    assert!(matches!(err, SessionError::JsonParse { .. }));
}

// ============================================================================
// Payload extraction
// ============================================================================

#[test]
fn element_refs_accept_w3c_and_legacy_keys() {
    let value = json!([
        { W3C_ELEMENT_KEY: "a1" },
        { "ELEMENT": "b2" },
    ]);
    let refs = parse_element_refs("find_elements", &value).unwrap();
    assert_eq!(refs, vec![ElementRef::new("a1"), ElementRef::new("b2")]);
    assert!(parse_element_refs("find_elements", &json!([])).unwrap().is_empty());
}

#[test]
fn malformed_element_refs_are_rejected() {
    assert!(matches!(
        parse_element_refs("find_elements", &json!({"a": 1})),
        Err(SessionError::MalformedResponse { .. })
    ));
    assert!(parse_element_refs("find_elements", &json!([{ "id": "x" }])).is_err());
}

#[test]
fn rect_rounds_fractional_pixels() {
    let value = json!({ "x": 10.4, "y": 20.6, "width": 300, "height": 48 });
    assert_eq!(
        parse_rect("get_rect", &value).unwrap(),
        Bounds {
            x: 10,
            y: 21,
            width: 300,
            height: 48
        }
    );
    assert!(parse_rect("get_rect", &json!({ "x": 1 })).is_err());
}

#[test]
fn session_id_is_required() {
    let value = json!({ "sessionId": "abc-123", "capabilities": {} });
    assert_eq!(parse_session_id(&value).unwrap(), "abc-123");
    assert!(parse_session_id(&json!({})).is_err());
}

// ============================================================================
// Wire commands
// ============================================================================

#[test]
fn find_elements_uses_locator_strategy() {
    let locator = Locator::parse("android=new UiSelector().text(\"Go\")").unwrap();
    let command = WireCommand::find_elements(&locator);

    assert_eq!(command.method(), Method::POST);
    assert_eq!(command.path("s1"), "/session/s1/elements");
    assert_eq!(
        command.body(),
        Some(json!({ "using": "-android uiautomator", "value": "new UiSelector().text(\"Go\")" }))
    );
}

#[test]
fn element_commands_address_the_element() {
    let attribute = WireCommand::Attribute {
        element: "e7".into(),
        name: "resource-id".into(),
    };
    assert_eq!(attribute.method(), Method::GET);
    assert_eq!(attribute.path("s1"), "/session/s1/element/e7/attribute/resource-id");
    assert_eq!(attribute.body(), None);

    let click = WireCommand::Click { element: "e7".into() };
    assert_eq!(click.path("s1"), "/session/s1/element/e7/click");
    assert_eq!(click.body(), Some(json!({})));
}

#[test]
fn session_level_commands() {
    assert_eq!(WireCommand::Back.path("s1"), "/session/s1/back");
    assert_eq!(WireCommand::Back.method(), Method::POST);
    assert_eq!(
        WireCommand::CurrentActivity.path("s1"),
        "/session/s1/appium/device/current_activity"
    );
    assert_eq!(WireCommand::DeleteSession.method(), Method::DELETE);
    assert_eq!(WireCommand::DeleteSession.path("s1"), "/session/s1");
    assert_eq!(
        WireCommand::NewSession { body: json!({}) }.path("ignored"),
        "/session"
    );
}

#[test]
fn tap_is_a_touch_pointer_sequence() {
    let body = WireCommand::tap(120, 340).body().unwrap();
    let pointer = &body["actions"][0];
    assert_eq!(pointer["parameters"]["pointerType"], "touch");
    assert_eq!(pointer["actions"][0]["type"], "pointerMove");
    assert_eq!(pointer["actions"][0]["x"], 120);
    assert_eq!(pointer["actions"][0]["y"], 340);
    assert_eq!(pointer["actions"][3]["type"], "pointerUp");
}

// ============================================================================
// Capabilities and error classification
// ============================================================================

#[test]
fn capabilities_use_vendor_prefix() {
    let caps = Capabilities {
        device_name: Some("emulator-5554".into()),
        app_package: Some("com.example.garden".into()),
        ..Capabilities::default()
    };
    let body = caps.to_new_session_body();
    let always = &body["capabilities"]["alwaysMatch"];

    assert_eq!(always["platformName"], "Android");
    assert_eq!(always["appium:automationName"], "UiAutomator2");
    assert_eq!(always["appium:deviceName"], "emulator-5554");
    assert_eq!(always["appium:appPackage"], "com.example.garden");
    assert_eq!(always["appium:noReset"], true);
    assert!(always.get("appium:app").is_none());
    assert_eq!(body["capabilities"]["firstMatch"], json!([{}]));
}

#[test]
fn only_session_ending_errors_are_fatal() {
    assert!(SessionError::protocol("click", "invalid session id", "gone").is_fatal());
    assert!(SessionError::protocol("new_session", "session not created", "no device").is_fatal());
    assert!(SessionError::NoSession("released".into()).is_fatal());

    assert!(!SessionError::protocol("click", "stale element reference", "").is_fatal());
    assert!(!SessionError::protocol("find_elements", "invalid selector", "").is_fatal());
    assert!(!SessionError::InvalidLocator("css=x".into()).is_fatal());
}
