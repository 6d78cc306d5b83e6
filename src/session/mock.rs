use std::collections::{HashMap, HashSet};
use std::time::Duration;

use crate::screen::screen_model::Bounds;
use crate::session::driver::{AutomationSession, ElementRef, Locator, LocatorStrategy};
use crate::session::error::SessionError;

/// Marker in `MockNode::failing` meaning every getter fails.
const ALL_GETTERS: &str = "*";

// ============================================================================
// Scripted application model
// ============================================================================

/// One node of a scripted screen.
#[derive(Debug, Clone, PartialEq)]
pub struct MockNode {
    pub class_name: String,
    pub text: String,
    pub content_desc: String,
    pub resource_id: String,
    pub bounds: Bounds,
    pub displayed: bool,
    pub enabled: bool,
    pub clickable: bool,
    pub checked: bool,
    pub scrollable: bool,

    /// Screen pushed onto the back stack when this node is clicked
    pub navigates_to: Option<String>,

    /// Getter names that fail for this node ("*" for all)
    pub failing: HashSet<String>,
}

impl MockNode {
    pub fn new(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            text: String::new(),
            content_desc: String::new(),
            resource_id: String::new(),
            bounds: Bounds::default(),
            displayed: true,
            enabled: true,
            clickable: false,
            checked: false,
            scrollable: false,
            navigates_to: None,
            failing: HashSet::new(),
        }
    }

    /// A clickable `android.widget.Button` with visible text.
    pub fn button(text: &str) -> Self {
        Self::new("android.widget.Button").text(text).clickable()
    }

    /// A plain `android.widget.TextView`.
    pub fn label(text: &str) -> Self {
        Self::new("android.widget.TextView").text(text)
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn description(mut self, desc: &str) -> Self {
        self.content_desc = desc.to_string();
        self
    }

    pub fn resource_id(mut self, id: &str) -> Self {
        self.resource_id = id.to_string();
        self
    }

    pub fn bounds(mut self, x: i64, y: i64, width: i64, height: i64) -> Self {
        self.bounds = Bounds { x, y, width, height };
        self
    }

    pub fn clickable(mut self) -> Self {
        self.clickable = true;
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn scrollable(mut self) -> Self {
        self.scrollable = true;
        self
    }

    pub fn hidden(mut self) -> Self {
        self.displayed = false;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn navigates_to(mut self, screen: &str) -> Self {
        self.navigates_to = Some(screen.to_string());
        self
    }

    /// Make one getter fail ("text", "content-desc", "resource-id", "class",
    /// "clickable", "checked", "enabled", "rect", "displayed").
    pub fn failing(mut self, getter: &str) -> Self {
        self.failing.insert(getter.to_string());
        self
    }

    /// Make every getter fail, as a stale node would.
    pub fn broken(self) -> Self {
        self.failing(ALL_GETTERS)
    }

    fn fails(&self, getter: &str) -> bool {
        self.failing.contains(ALL_GETTERS) || self.failing.contains(getter)
    }

    fn attribute_value(&self, name: &str) -> Option<String> {
        let flag = |b: bool| Some(b.to_string());
        match name {
            "text" => Some(self.text.clone()),
            "content-desc" | "contentDescription" => Some(self.content_desc.clone()),
            "resource-id" | "resourceId" => Some(self.resource_id.clone()),
            "class" | "className" => Some(self.class_name.clone()),
            "clickable" => flag(self.clickable),
            "checked" => flag(self.checked),
            "enabled" => flag(self.enabled),
            "displayed" => flag(self.displayed),
            "scrollable" => flag(self.scrollable),
            _ => None,
        }
    }
}

/// A scripted screen: an activity name plus its nodes in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct MockScreen {
    pub activity: String,
    pub nodes: Vec<MockNode>,
}

/// One remote action observed by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockInteraction {
    Click { screen: String, text: String },
    Tap { x: i64, y: i64 },
    Back,
    Wait(Duration),
}

// ============================================================================
// MockSession
// ============================================================================

/// In-memory `AutomationSession` over a scripted set of screens.
///
/// Evaluates the locator forms the selector synthesizer emits (simple
/// attribute/class XPath, `UiSelector` chains, accessibility ids, resource
/// ids). Anything else fails as an invalid selector, like a real driver.
#[derive(Debug, Clone, Default)]
pub struct MockSession {
    screens: HashMap<String, MockScreen>,
    stack: Vec<String>,
    failing_queries: Vec<String>,
    screenshot_fails: bool,
    screen_id_fails: bool,
    back_lands_on: Option<String>,
    lose_session_on_click: Option<String>,
    lose_session_on_back: bool,
    session_lost: bool,

    /// Every click, tap, back and wait in call order
    pub interactions: Vec<MockInteraction>,

    /// Number of `quit()` calls
    pub quit_calls: usize,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a screen. The first screen added is where the app starts.
    pub fn screen(mut self, name: &str, activity: &str, nodes: Vec<MockNode>) -> Self {
        self.screens.insert(
            name.to_string(),
            MockScreen {
                activity: activity.to_string(),
                nodes,
            },
        );
        if self.stack.is_empty() {
            self.stack.push(name.to_string());
        }
        self
    }

    /// Any query whose locator string contains `fragment` fails.
    pub fn failing_query(mut self, fragment: &str) -> Self {
        self.failing_queries.push(fragment.to_string());
        self
    }

    pub fn failing_screenshot(mut self) -> Self {
        self.screenshot_fails = true;
        self
    }

    pub fn failing_screen_id(mut self) -> Self {
        self.screen_id_fails = true;
        self
    }

    /// After every back navigation, the app shows `screen` instead of the
    /// previous one.
    pub fn back_lands_on(mut self, screen: &str) -> Self {
        self.back_lands_on = Some(screen.to_string());
        self
    }

    /// Clicking the node with this text kills the session.
    pub fn lose_session_on_click(mut self, text: &str) -> Self {
        self.lose_session_on_click = Some(text.to_string());
        self
    }

    /// The first back navigation kills the session.
    pub fn lose_session_on_back(mut self) -> Self {
        self.lose_session_on_back = true;
        self
    }

    /// Name of the screen currently on top.
    pub fn current_screen(&self) -> Option<&str> {
        self.stack.last().map(String::as_str)
    }

    /// Texts of clicked nodes, in order.
    pub fn clicked_texts(&self) -> Vec<String> {
        self.interactions
            .iter()
            .filter_map(|i| match i {
                MockInteraction::Click { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn back_count(&self) -> usize {
        self.interactions
            .iter()
            .filter(|i| matches!(i, MockInteraction::Back))
            .count()
    }

    fn check_alive(&self, command: &str) -> Result<(), SessionError> {
        if self.session_lost {
            Err(SessionError::protocol(
                command,
                "invalid session id",
                "A session is either terminated or not started",
            ))
        } else {
            Ok(())
        }
    }

    fn top(&self, command: &str) -> Result<(&str, &MockScreen), SessionError> {
        let name = self
            .stack
            .last()
            .ok_or_else(|| SessionError::protocol(command, "unknown error", "no screen loaded"))?;
        let screen = self.screens.get(name).ok_or_else(|| {
            SessionError::protocol(command, "unknown error", format!("unknown screen '{}'", name))
        })?;
        Ok((name.as_str(), screen))
    }

    /// Resolve an element reference to its node, failing as stale when the
    /// node's screen is no longer on top.
    fn node(&self, element: &ElementRef, command: &str) -> Result<&MockNode, SessionError> {
        self.check_alive(command)?;
        let (screen_name, screen) = self.top(command)?;
        let stale = || {
            SessionError::protocol(
                command,
                "stale element reference",
                format!("element {} is no longer attached", element),
            )
        };

        let (owner, index) = element.id().rsplit_once('#').ok_or_else(stale)?;
        if owner != screen_name {
            return Err(stale());
        }
        let index: usize = index.parse().map_err(|_| stale())?;
        screen.nodes.get(index).ok_or_else(stale)
    }

    fn getter<'a>(
        &'a self,
        element: &ElementRef,
        command: &str,
        getter: &str,
    ) -> Result<&'a MockNode, SessionError> {
        let node = self.node(element, command)?;
        if node.fails(getter) {
            return Err(SessionError::protocol(
                command,
                "stale element reference",
                format!("{} of {} could not be read", getter, element),
            ));
        }
        Ok(node)
    }
}

impl AutomationSession for MockSession {
    fn find_elements(&mut self, locator: &Locator) -> Result<Vec<ElementRef>, SessionError> {
        let command = "find_elements";
        self.check_alive(command)?;

        let rendered = locator.to_string();
        if self.failing_queries.iter().any(|f| rendered.contains(f.as_str())) {
            return Err(SessionError::protocol(
                command,
                "invalid selector",
                format!("unsupported locator {}", rendered),
            ));
        }

        let query = MockQuery::from_locator(locator).ok_or_else(|| {
            SessionError::protocol(
                command,
                "invalid selector",
                format!("cannot evaluate {}", rendered),
            )
        })?;

        let (screen_name, screen) = self.top(command)?;
        let matches: Vec<ElementRef> = screen
            .nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| query.matches(node))
            .map(|(i, _)| ElementRef::new(format!("{}#{}", screen_name, i)))
            .collect();

        Ok(match query.nth {
            Some(n) => matches.into_iter().nth(n).into_iter().collect(),
            None => matches,
        })
    }

    fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>, SessionError> {
        let node = self.getter(element, "get_attribute", name)?;
        Ok(node.attribute_value(name))
    }

    fn text(&mut self, element: &ElementRef) -> Result<String, SessionError> {
        Ok(self.getter(element, "get_text", "text")?.text.clone())
    }

    fn is_displayed(&mut self, element: &ElementRef) -> Result<bool, SessionError> {
        Ok(self.getter(element, "is_displayed", "displayed")?.displayed)
    }

    fn is_enabled(&mut self, element: &ElementRef) -> Result<bool, SessionError> {
        Ok(self.getter(element, "is_enabled", "enabled")?.enabled)
    }

    fn rect(&mut self, element: &ElementRef) -> Result<Bounds, SessionError> {
        Ok(self.getter(element, "get_rect", "rect")?.bounds)
    }

    fn click(&mut self, element: &ElementRef) -> Result<(), SessionError> {
        let (text, target) = {
            let node = self.node(element, "click")?;
            (node.text.clone(), node.navigates_to.clone())
        };
        let screen = self.current_screen().unwrap_or_default().to_string();
        self.interactions.push(MockInteraction::Click {
            screen,
            text: text.clone(),
        });

        if self.lose_session_on_click.as_deref() == Some(text.as_str()) {
            self.session_lost = true;
            return Err(SessionError::protocol(
                "click",
                "invalid session id",
                "instrumentation process crashed",
            ));
        }

        if let Some(target) = target {
            if !self.screens.contains_key(&target) {
                return Err(SessionError::protocol(
                    "click",
                    "unknown error",
                    format!("unknown screen '{}'", target),
                ));
            }
            self.stack.push(target);
        }
        Ok(())
    }

    fn tap(&mut self, x: i64, y: i64) -> Result<(), SessionError> {
        self.check_alive("perform_actions")?;
        self.interactions.push(MockInteraction::Tap { x, y });

        let target = {
            let (_, screen) = self.top("perform_actions")?;
            screen
                .nodes
                .iter()
                .find(|n| n.displayed && n.bounds.contains(x, y))
                .and_then(|n| n.navigates_to.clone())
        };
        if let Some(target) = target {
            self.stack.push(target);
        }
        Ok(())
    }

    fn back(&mut self) -> Result<(), SessionError> {
        if self.lose_session_on_back {
            self.session_lost = true;
        }
        self.check_alive("back")?;
        self.interactions.push(MockInteraction::Back);

        if self.stack.len() > 1 {
            self.stack.pop();
        }
        if let Some(landing) = &self.back_lands_on {
            if let Some(top) = self.stack.last_mut() {
                *top = landing.clone();
            }
        }
        Ok(())
    }

    fn screenshot_png(&mut self) -> Result<Vec<u8>, SessionError> {
        self.check_alive("screenshot")?;
        if self.screenshot_fails {
            return Err(SessionError::protocol(
                "screenshot",
                "unknown error",
                "screen capture is disabled (FLAG_SECURE)",
            ));
        }
        let (name, _) = self.top("screenshot")?;
        let mut png = b"\x89PNG\r\n\x1a\n".to_vec();
        png.extend_from_slice(name.as_bytes());
        Ok(png)
    }

    fn page_source(&mut self) -> Result<String, SessionError> {
        self.check_alive("page_source")?;
        let (_, screen) = self.top("page_source")?;
        let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<hierarchy>\n");
        for node in &screen.nodes {
            xml.push_str(&format!(
                "  <{class} text=\"{text}\" content-desc=\"{desc}\" resource-id=\"{id}\" clickable=\"{clickable}\" displayed=\"{displayed}\" />\n",
                class = node.class_name,
                text = node.text,
                desc = node.content_desc,
                id = node.resource_id,
                clickable = node.clickable,
                displayed = node.displayed,
            ));
        }
        xml.push_str("</hierarchy>\n");
        Ok(xml)
    }

    fn current_screen_id(&mut self) -> Result<String, SessionError> {
        self.check_alive("current_activity")?;
        if self.screen_id_fails {
            return Err(SessionError::protocol(
                "current_activity",
                "unknown error",
                "could not determine activity",
            ));
        }
        Ok(self.top("current_activity")?.1.activity.clone())
    }

    fn wait(&mut self, duration: Duration) {
        self.interactions.push(MockInteraction::Wait(duration));
    }

    fn quit(&mut self) -> Result<(), SessionError> {
        self.quit_calls += 1;
        Ok(())
    }
}

// ============================================================================
// Locator evaluation
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Predicate {
    Equals(String, String),
    Contains(String, String),
}

/// A locator reduced to "class + attribute predicates + optional index".
#[derive(Debug, Clone, PartialEq, Default)]
struct MockQuery {
    class: Option<String>,
    predicates: Vec<Predicate>,
    /// 0-based index into the match list
    nth: Option<usize>,
}

impl MockQuery {
    fn from_locator(locator: &Locator) -> Option<Self> {
        match locator.strategy {
            LocatorStrategy::XPath => parse_xpath(&locator.value),
            LocatorStrategy::UiAutomator => parse_ui_selector(&locator.value),
            LocatorStrategy::AccessibilityId => Some(MockQuery {
                predicates: vec![Predicate::Equals(
                    "content-desc".into(),
                    locator.value.clone(),
                )],
                ..Default::default()
            }),
            LocatorStrategy::Id => Some(MockQuery {
                predicates: vec![Predicate::Equals("resource-id".into(), locator.value.clone())],
                ..Default::default()
            }),
        }
    }

    fn matches(&self, node: &MockNode) -> bool {
        if let Some(class) = &self.class {
            if &node.class_name != class {
                return false;
            }
        }
        self.predicates.iter().all(|p| match p {
            Predicate::Equals(attr, value) => {
                node.attribute_value(attr).as_deref() == Some(value.as_str())
            }
            Predicate::Contains(attr, value) => node
                .attribute_value(attr)
                .is_some_and(|v| v.contains(value.as_str())),
        })
    }
}

/// Parse `//Tag[pred]...` or `(//Tag[pred]...)[n]`.
fn parse_xpath(expr: &str) -> Option<MockQuery> {
    let expr = expr.trim();
    let (path, nth) = if let Some(rest) = expr.strip_prefix('(') {
        let close = rest.rfind(")[")?;
        let index: usize = rest[close + 2..].strip_suffix(']')?.trim().parse().ok()?;
        (&rest[..close], Some(index.checked_sub(1)?))
    } else {
        (expr, None)
    };

    let mut cursor = Cursor::new(path.strip_prefix("//")?);
    let tag = cursor
        .take_while(|c| c.is_alphanumeric() || c == '.' || c == '_' || c == '$' || c == '*');
    if tag.is_empty() {
        return None;
    }

    let mut query = MockQuery {
        class: (tag != "*").then(|| tag.to_string()),
        predicates: Vec::new(),
        nth,
    };

    while !cursor.at_end() {
        cursor.expect('[')?;
        query.predicates.push(parse_xpath_predicate(&mut cursor)?);
        cursor.expect(']')?;
    }
    Some(query)
}

fn parse_xpath_predicate(cursor: &mut Cursor) -> Option<Predicate> {
    if cursor.eat("contains(") {
        cursor.expect('@')?;
        let attr = cursor.take_while(|c| c.is_alphanumeric() || c == '-' || c == '_');
        cursor.skip_spaces();
        cursor.expect(',')?;
        cursor.skip_spaces();
        let value = cursor.quoted(false)?;
        cursor.expect(')')?;
        return Some(Predicate::Contains(attr.to_string(), value));
    }

    cursor.expect('@')?;
    let attr = cursor.take_while(|c| c.is_alphanumeric() || c == '-' || c == '_');
    cursor.expect('=')?;
    let value = cursor.quoted(false)?;
    Some(Predicate::Equals(attr.to_string(), value))
}

/// Parse `new UiSelector().method(arg)...`.
fn parse_ui_selector(expr: &str) -> Option<MockQuery> {
    let mut cursor = Cursor::new(expr.trim().strip_prefix("new UiSelector()")?);
    let mut query = MockQuery::default();

    while !cursor.at_end() {
        cursor.expect('.')?;
        let method = cursor.take_while(|c| c.is_alphanumeric());
        cursor.expect('(')?;

        match method {
            "text" | "description" | "resourceId" | "className" => {
                let value = cursor.quoted(true)?;
                if method == "className" {
                    query.class = Some(value);
                } else {
                    let attr = match method {
                        "text" => "text",
                        "description" => "content-desc",
                        _ => "resource-id",
                    };
                    query.predicates.push(Predicate::Equals(attr.into(), value));
                }
            }
            "textContains" | "descriptionContains" => {
                let value = cursor.quoted(true)?;
                let attr = if method == "textContains" { "text" } else { "content-desc" };
                query.predicates.push(Predicate::Contains(attr.into(), value));
            }
            "clickable" | "scrollable" | "checked" | "enabled" => {
                let flag = cursor.take_while(|c| c.is_alphabetic());
                if flag != "true" && flag != "false" {
                    return None;
                }
                query
                    .predicates
                    .push(Predicate::Equals(method.into(), flag.to_string()));
            }
            "instance" => {
                let n = cursor.take_while(|c| c.is_ascii_digit());
                query.nth = Some(n.parse().ok()?);
            }
            _ => return None,
        }

        cursor.expect(')')?;
    }
    Some(query)
}

/// Minimal character cursor for the locator parsers above.
struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { rest: input }
    }

    fn at_end(&self) -> bool {
        self.rest.is_empty()
    }

    fn eat(&mut self, token: &str) -> bool {
        match self.rest.strip_prefix(token) {
            Some(rest) => {
                self.rest = rest;
                true
            }
            None => false,
        }
    }

    fn expect(&mut self, c: char) -> Option<()> {
        self.rest = self.rest.strip_prefix(c)?;
        Some(())
    }

    fn skip_spaces(&mut self) {
        self.rest = self.rest.trim_start();
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| !pred(*c))
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (head, tail) = self.rest.split_at(end);
        self.rest = tail;
        head
    }

    /// Read a quoted literal. With `escapes`, backslash escapes are honoured
    /// (Java string syntax); XPath literals have none.
    fn quoted(&mut self, escapes: bool) -> Option<String> {
        let quote = self.rest.chars().next().filter(|c| *c == '"' || *c == '\'')?;
        let mut out = String::new();
        let mut chars = self.rest[1..].char_indices();

        while let Some((i, c)) = chars.next() {
            if escapes && c == '\\' {
                let (_, escaped) = chars.next()?;
                out.push(escaped);
            } else if c == quote {
                self.rest = &self.rest[1 + i + c.len_utf8()..];
                return Some(out);
            } else {
                out.push(c);
            }
        }
        None
    }
}
