#![allow(dead_code)]

use screen_discovery::explorer::exploration::ExplorerConfig;
use screen_discovery::screen::screen_model::{ElementDescriptor, ElementKind};
use screen_discovery::screen::snapshot::DiscoveryConfig;
use screen_discovery::session::mock::{MockNode, MockSession};

pub const HOME_ACTIVITY: &str = ".MainActivity";
pub const SPECIMEN_ACTIVITY: &str = ".SpecimenActivity";
pub const DOME_ACTIVITY: &str = ".DomeActivity";

/// Explorer settings for tests: no settling, no screenshots.
pub fn quick_config(max_clicks: usize) -> ExplorerConfig {
    ExplorerConfig {
        max_clicks,
        settle_ms: 0,
        verify_back: true,
        discovery: DiscoveryConfig::default(),
    }
}

/// Home screen with a single "Dome" entry that expands into the harvest menu.
pub fn dome_app() -> MockSession {
    MockSession::new()
        .screen(
            "home",
            HOME_ACTIVITY,
            vec![MockNode::button("Dome")
                .resource_id("com.example.garden:id/dome")
                .bounds(0, 100, 400, 80)
                .navigates_to("dome")],
        )
        .screen(
            "dome",
            DOME_ACTIVITY,
            vec![
                MockNode::button("Harvesting").bounds(0, 100, 400, 80),
                MockNode::button("Media Moisture").bounds(0, 200, 400, 80),
            ],
        )
}

/// The full walkthrough app: home → Specimen → Dome → Harvesting → Media Moisture.
pub fn specimen_app() -> MockSession {
    MockSession::new()
        .screen(
            "home",
            HOME_ACTIVITY,
            vec![
                MockNode::label("Welcome"),
                MockNode::button("Specimen")
                    .bounds(0, 300, 400, 80)
                    .navigates_to("specimen"),
                MockNode::button("Settings").navigates_to("settings"),
            ],
        )
        .screen(
            "specimen",
            SPECIMEN_ACTIVITY,
            vec![
                MockNode::label("Specimens"),
                MockNode::button("Dome").navigates_to("dome"),
            ],
        )
        .screen(
            "dome",
            DOME_ACTIVITY,
            vec![
                MockNode::button("Harvesting").navigates_to("harvesting"),
                MockNode::button("Media Moisture").navigates_to("moisture"),
            ],
        )
        .screen(
            "harvesting",
            ".HarvestingActivity",
            vec![
                MockNode::label("Harvest log"),
                MockNode::button("Media Moisture").navigates_to("moisture"),
            ],
        )
        .screen(
            "moisture",
            ".MoistureActivity",
            vec![MockNode::label("Moisture 42%")],
        )
        .screen("settings", ".SettingsActivity", vec![MockNode::label("Settings")])
}

/// A start screen with `count` buttons that all open the same detail screen.
pub fn many_buttons_app(count: usize) -> MockSession {
    let buttons = (1..=count)
        .map(|i| MockNode::button(&format!("Item {}", i)).navigates_to("detail"))
        .collect();
    MockSession::new()
        .screen("list", ".ListActivity", buttons)
        .screen("detail", ".DetailActivity", vec![MockNode::label("Detail")])
}

pub fn descriptor(kind: ElementKind, text: &str) -> ElementDescriptor {
    let mut d = ElementDescriptor::empty(kind);
    d.text = text.to_string();
    d.class_name = "android.widget.Button".to_string();
    d.clickable = kind == ElementKind::Clickable;
    d.enabled = true;
    d
}
