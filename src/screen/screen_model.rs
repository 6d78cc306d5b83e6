use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Element kinds
// ============================================================================

/// Category under which an element was discovered.
///
/// Declaration order is the fixed discovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Clickable,
    Input,
    Text,
    Image,
    List,
    Checkbox,
    Scrollable,
    Custom,
}

impl ElementKind {
    /// All kinds in discovery order.
    pub const ALL: [ElementKind; 8] = [
        ElementKind::Clickable,
        ElementKind::Input,
        ElementKind::Text,
        ElementKind::Image,
        ElementKind::List,
        ElementKind::Checkbox,
        ElementKind::Scrollable,
        ElementKind::Custom,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Clickable => "clickable",
            ElementKind::Input => "input",
            ElementKind::Text => "text",
            ElementKind::Image => "image",
            ElementKind::List => "list",
            ElementKind::Checkbox => "checkbox",
            ElementKind::Scrollable => "scrollable",
            ElementKind::Custom => "custom",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Element descriptor
// ============================================================================

/// On-screen rectangle. All-zero when it could not be read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: i64,
    pub y: i64,
    pub width: i64,
    pub height: i64,
}

impl Bounds {
    pub fn is_zero(&self) -> bool {
        *self == Bounds::default()
    }

    pub fn center(&self) -> (i64, i64) {
        (self.x + self.width / 2, self.y + self.height / 2)
    }

    pub fn contains(&self, x: i64, y: i64) -> bool {
        x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
    }
}

/// One discovered UI node at a point in time.
///
/// Created fresh on every discovery pass and never mutated afterwards.
/// Identity is structural (see `structural_key`), never referential.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDescriptor {
    pub kind: ElementKind,

    /// Visible text, trimmed; empty if none
    pub text: String,

    /// Content description; empty if none
    pub accessibility_label: String,

    /// Resource id; empty if none
    pub identifier: String,

    /// Platform widget class
    pub class_name: String,

    pub bounds: Bounds,
    pub enabled: bool,
    pub clickable: bool,
    pub checked: bool,

    /// Locators to re-find this node, most stable first
    pub selectors: Vec<String>,
}

/// Equality key used to suppress duplicates: (identifier, text, class).
pub type StructuralKey<'a> = (&'a str, &'a str, &'a str);

impl ElementDescriptor {
    /// Descriptor with every field at its documented default.
    pub fn empty(kind: ElementKind) -> Self {
        Self {
            kind,
            text: String::new(),
            accessibility_label: String::new(),
            identifier: String::new(),
            class_name: String::new(),
            bounds: Bounds::default(),
            enabled: false,
            clickable: false,
            checked: false,
            selectors: Vec::new(),
        }
    }

    pub fn structural_key(&self) -> StructuralKey<'_> {
        (&self.identifier, &self.text, &self.class_name)
    }

    /// Whether a human can recognise this element in a report.
    pub fn has_human_label(&self) -> bool {
        !self.text.is_empty() || !self.accessibility_label.is_empty()
    }

    /// Short display name: text, then label, then identifier, then class.
    pub fn display_name(&self) -> &str {
        [
            self.text.as_str(),
            self.accessibility_label.as_str(),
            self.identifier.as_str(),
            self.class_name.as_str(),
        ]
        .into_iter()
        .find(|s| !s.is_empty())
        .unwrap_or("<unnamed>")
    }
}

// ============================================================================
// Screen snapshot
// ============================================================================

/// Screen id recorded when the platform could not report one.
pub const UNKNOWN_SCREEN: &str = "<unknown>";

/// Full discovery result for one loaded screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenSnapshot {
    pub screen_id: String,
    pub captured_at: DateTime<Utc>,

    /// Discovery order within each kind; every kind is present
    pub elements_by_kind: BTreeMap<ElementKind, Vec<ElementDescriptor>>,

    /// File name of the saved screenshot, if capture succeeded
    pub screenshot_ref: Option<String>,
}

impl ScreenSnapshot {
    pub fn elements(&self, kind: ElementKind) -> &[ElementDescriptor] {
        self.elements_by_kind
            .get(&kind)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All descriptors, kinds in discovery order.
    pub fn all_elements(&self) -> impl Iterator<Item = &ElementDescriptor> {
        self.elements_by_kind.values().flatten()
    }

    pub fn element_count(&self) -> usize {
        self.elements_by_kind.values().map(Vec::len).sum()
    }

    /// Texts of all descriptors with visible text, in discovery order.
    pub fn visible_texts(&self) -> Vec<&str> {
        self.all_elements()
            .map(|d| d.text.as_str())
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Stable fingerprint of the screen's structure: a hash over the sorted
    /// structural keys of every descriptor, independent of bounds and time.
    pub fn structure_fingerprint(&self) -> String {
        use sha1::{Digest, Sha1};

        let mut keys: Vec<String> = self
            .all_elements()
            .map(|d| {
                let (id, text, class) = d.structural_key();
                format!("{}\u{1f}{}\u{1f}{}\u{1f}{}", d.kind, id, text, class)
            })
            .collect();
        keys.sort();

        let mut hasher = Sha1::new();
        hasher.update(self.screen_id.as_bytes());
        for key in &keys {
            hasher.update(b"\x1e");
            hasher.update(key.as_bytes());
        }
        format!("{:x}", hasher.finalize())
    }
}
