//! In-memory CSS sheet engine.
//!
//! [`CssEngine`] renders canonical style objects to CSS text and tracks which
//! sheets are attached. Attached sheets are ordered by site index (then by
//! creation order), so [`CssEngine::to_css`] reproduces the cascade a browser
//! would see.
//!
//! # Rendering Rules
//!
//! | Canonical entry | Output |
//! |-----------------|--------|
//! | class `root` | `.{prefix}root-{sheet}-{rule} { ... }` |
//! | `@global` → `selector` | `selector { ... }` |
//! | `@keyframes spin` | `@keyframes {prefix}spin-{sheet} { 0% { ... } }` |
//! | nested `&:hover` | parent selector substituted for `&` |
//! | nested `span` (no `&`) | `parent span` |
//!
//! Property names are converted from camelCase to kebab-case. Numbers get a
//! `px` unit unless the property is unitless (`opacity`, `zIndex`, ...).
//!
//! Keyframe names are scoped per sheet like class names, so two sites may
//! declare the same animation name. Inside string values, `$spin` refers to
//! the sheet's own `spin` animation and is replaced by its generated name.

use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::rc::Rc;

use once_cell::unsync::OnceCell;
use serde_json::{Map, Value};

use super::{ClassNames, Sheet, SheetEngine, SheetOptions};
use crate::error::EngineError;
use crate::style::{CanonicalStyle, GLOBAL_KEY, KEYFRAMES_PREFIX};

/// Properties whose numeric values are emitted without a unit.
const UNITLESS: &[&str] = &[
    "animationIterationCount",
    "columnCount",
    "flex",
    "flexGrow",
    "flexShrink",
    "fontWeight",
    "lineHeight",
    "opacity",
    "order",
    "orphans",
    "widows",
    "zIndex",
    "zoom",
];

thread_local! {
    static DEFAULT_ENGINE: OnceCell<CssEngine> = const { OnceCell::new() };
}

/// Returns this thread's shared engine, creating it on first use.
///
/// Every call on the same thread returns a handle to the same registry.
pub fn default_engine() -> CssEngine {
    DEFAULT_ENGINE.with(|cell| cell.get_or_init(CssEngine::new).clone())
}

#[derive(Debug, Default)]
struct Registry {
    next_sheet: u64,
    next_rule: u64,
    live: usize,
    attached: BTreeMap<(usize, u64), Rc<str>>,
}

/// CSS-text sheet engine with an attached-sheet registry.
///
/// Cloning is cheap; clones share the same registry.
///
/// # Example
///
/// ```rust
/// use sharestyle::{evaluate, CssEngine, Fragment, SheetEngine, SheetOptions, StyleDefs, StyleDescriptor};
///
/// let defs: StyleDescriptor<(), ()> = StyleDefs::new()
///     .class("title", Fragment::new().set("fontSize", 14).set("fontWeight", 700))
///     .into();
/// let engine = CssEngine::new();
/// let mut sheet = engine
///     .create(&evaluate(&defs, &(), &()), &SheetOptions::default())
///     .unwrap();
/// sheet.attach();
///
/// let class = sheet.classes().get("title").unwrap().to_string();
/// assert!(engine.to_css().contains(&format!(".{class} {{")));
/// assert!(engine.to_css().contains("font-size: 14px;"));
/// assert!(engine.to_css().contains("font-weight: 700;"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CssEngine {
    registry: Rc<RefCell<Registry>>,
}

impl CssEngine {
    /// Creates an engine with an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Concatenates the CSS of every attached sheet in cascade order.
    pub fn to_css(&self) -> String {
        let registry = self.registry.borrow();
        let mut out = String::new();
        for css in registry.attached.values() {
            out.push_str(css);
        }
        out
    }

    /// Number of attached sheets.
    pub fn attached_count(&self) -> usize {
        self.registry.borrow().attached.len()
    }

    /// Number of sheets created and not yet removed.
    pub fn sheet_count(&self) -> usize {
        self.registry.borrow().live
    }

    /// Returns true if both handles share one registry.
    pub fn same_registry(&self, other: &CssEngine) -> bool {
        Rc::ptr_eq(&self.registry, &other.registry)
    }
}

impl SheetEngine for CssEngine {
    fn create(
        &self,
        style: &CanonicalStyle,
        options: &SheetOptions,
    ) -> Result<Box<dyn Sheet>, EngineError> {
        let mut registry = self.registry.borrow_mut();
        let sheet_id = registry.next_sheet + 1;

        let mut writer = CssWriter {
            prefix: options.prefix.as_deref().unwrap_or(""),
            sheet_id,
            next_rule: registry.next_rule,
            out: String::new(),
            classes: ClassNames::new(),
            animations: Vec::new(),
        };
        writer.write_style(style)?;

        // Ids are committed only once rendering succeeded.
        registry.next_sheet = sheet_id;
        registry.next_rule = writer.next_rule;
        registry.live += 1;

        let mut css = String::new();
        if let Some(meta) = &options.meta {
            let _ = writeln!(css, "/* {} */", meta);
        }
        match &options.media {
            Some(media) => {
                let _ = writeln!(css, "@media {} {{", media);
                css.push_str(&writer.out);
                css.push_str("}\n");
            }
            None => css.push_str(&writer.out),
        }

        tracing::trace!(sheet_id, index = options.index, "created css sheet");
        Ok(Box::new(CssSheet {
            id: sheet_id,
            index: options.index,
            css: Rc::from(css),
            classes: writer.classes,
            attached: false,
            registry: Rc::clone(&self.registry),
        }))
    }
}

/// A sheet created by [`CssEngine`].
#[derive(Debug)]
pub struct CssSheet {
    id: u64,
    index: usize,
    css: Rc<str>,
    classes: ClassNames,
    attached: bool,
    registry: Rc<RefCell<Registry>>,
}

impl CssSheet {
    /// The rendered CSS text of this sheet.
    pub fn css(&self) -> &str {
        &self.css
    }
}

impl Sheet for CssSheet {
    fn classes(&self) -> &ClassNames {
        &self.classes
    }

    fn attach(&mut self) {
        if self.attached {
            return;
        }
        self.registry
            .borrow_mut()
            .attached
            .insert((self.index, self.id), Rc::clone(&self.css));
        self.attached = true;
    }

    fn detach(&mut self) {
        if !self.attached {
            return;
        }
        self.registry
            .borrow_mut()
            .attached
            .remove(&(self.index, self.id));
        self.attached = false;
    }

    fn is_attached(&self) -> bool {
        self.attached
    }

    fn remove(mut self: Box<Self>) {
        self.detach();
        self.registry.borrow_mut().live -= 1;
        tracing::trace!(sheet_id = self.id, "removed css sheet");
    }
}

struct CssWriter<'a> {
    prefix: &'a str,
    sheet_id: u64,
    next_rule: u64,
    out: String,
    classes: ClassNames,
    /// `($name, generated)`, longest name first.
    animations: Vec<(String, String)>,
}

impl CssWriter<'_> {
    fn write_style(&mut self, style: &CanonicalStyle) -> Result<(), EngineError> {
        for name in style.rules().filter_map(|(key, _)| key.strip_prefix(KEYFRAMES_PREFIX)) {
            let generated = format!("{}{}-{}", self.prefix, name, self.sheet_id);
            self.classes.insert_animation(name, generated.clone());
            self.animations.push((format!("${name}"), generated));
        }
        self.animations.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        for (key, body) in style.rules() {
            if key == GLOBAL_KEY {
                let selectors = as_object(key, body)?;
                for (selector, rule) in selectors {
                    self.write_rule(selector, selector, rule)?;
                }
            } else if let Some(name) = key.strip_prefix(KEYFRAMES_PREFIX) {
                self.write_keyframes(name, as_object(key, body)?)?;
            } else if key.starts_with('@') {
                return Err(EngineError::UnsupportedAtRule(key.to_string()));
            } else {
                self.write_class(key, body)?;
            }
        }
        Ok(())
    }

    fn write_class(&mut self, class: &str, body: &Value) -> Result<(), EngineError> {
        if class.is_empty() {
            return Err(EngineError::EmptyClassName);
        }
        self.next_rule += 1;
        let generated = format!("{}{}-{}-{}", self.prefix, class, self.sheet_id, self.next_rule);
        let selector = format!(".{generated}");
        let start = self.out.len();
        self.write_rule(class, &selector, body)?;
        let source = self.out[start..].to_string();
        self.classes.insert(class, generated, source);
        Ok(())
    }

    fn write_rule(&mut self, rule: &str, selector: &str, body: &Value) -> Result<(), EngineError> {
        let body = as_object(rule, body)?;
        let (declarations, nested) = declarations(rule, body, &self.animations)?;
        if !declarations.is_empty() {
            let _ = writeln!(self.out, "{} {{", selector);
            self.out.push_str(&declarations);
            self.out.push_str("}\n");
        }
        for (child, child_body) in nested {
            let child_selector = if child.contains('&') {
                child.replace('&', selector)
            } else {
                format!("{selector} {child}")
            };
            self.write_rule(rule, &child_selector, child_body)?;
        }
        Ok(())
    }

    fn write_keyframes(&mut self, name: &str, stops: &Map<String, Value>) -> Result<(), EngineError> {
        let generated = self.classes.animation(name).unwrap_or(name).to_string();
        let _ = writeln!(self.out, "@keyframes {} {{", generated);
        for (stop, body) in stops {
            let (declarations, _) = declarations(name, as_object(name, body)?, &self.animations)?;
            let _ = writeln!(self.out, "  {} {{", stop);
            for line in declarations.lines() {
                let _ = writeln!(self.out, "  {}", line);
            }
            self.out.push_str("  }\n");
        }
        self.out.push_str("}\n");
        Ok(())
    }
}

fn as_object<'v>(rule: &str, value: &'v Value) -> Result<&'v Map<String, Value>, EngineError> {
    value.as_object().ok_or_else(|| EngineError::InvalidRule {
        rule: rule.to_string(),
    })
}

/// Splits a rule body into rendered declarations and nested blocks.
fn declarations<'v>(
    rule: &str,
    body: &'v Map<String, Value>,
    animations: &[(String, String)],
) -> Result<(String, Vec<(&'v str, &'v Value)>), EngineError> {
    let mut out = String::new();
    let mut nested = Vec::new();
    for (property, value) in body {
        match value {
            Value::String(s) => {
                let _ = writeln!(out, "  {}: {};", kebab_case(property), animation_refs(s, animations));
            }
            Value::Number(n) => {
                let unit = if UNITLESS.contains(&property.as_str()) || n.as_f64() == Some(0.0) {
                    ""
                } else {
                    "px"
                };
                let _ = writeln!(out, "  {}: {}{};", kebab_case(property), n, unit);
            }
            Value::Object(_) => nested.push((property.as_str(), value)),
            other => {
                return Err(EngineError::InvalidValue {
                    rule: rule.to_string(),
                    property: property.clone(),
                    value: other.to_string(),
                })
            }
        }
    }
    Ok((out, nested))
}

/// Replaces `$name` references with generated animation names.
fn animation_refs<'s>(value: &'s str, animations: &[(String, String)]) -> Cow<'s, str> {
    if !value.contains('$') {
        return Cow::Borrowed(value);
    }
    let mut out = value.to_string();
    for (reference, generated) in animations {
        out = out.replace(reference.as_str(), generated);
    }
    Cow::Owned(out)
}

/// Converts `backgroundColor` to `background-color`.
fn kebab_case(property: &str) -> String {
    let mut out = String::with_capacity(property.len() + 4);
    for c in property.chars() {
        if c.is_ascii_uppercase() {
            out.push('-');
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn style(value: Value) -> CanonicalStyle {
        CanonicalStyle::from(value.as_object().cloned().unwrap())
    }

    fn options(index: usize) -> SheetOptions {
        SheetOptions {
            index,
            ..SheetOptions::default()
        }
    }

    #[test]
    fn test_kebab_case() {
        assert_eq!(kebab_case("backgroundColor"), "background-color");
        assert_eq!(kebab_case("WebkitTransition"), "-webkit-transition");
        assert_eq!(kebab_case("--custom"), "--custom");
    }

    #[test]
    fn test_generated_names_use_prefix_and_are_unique() {
        let engine = CssEngine::new();
        let opts = SheetOptions {
            prefix: Some("btn-".to_string()),
            ..SheetOptions::default()
        };
        let css = style(json!({"root": {"color": "red"}}));
        let a = engine.create(&css, &opts).unwrap();
        let b = engine.create(&css, &opts).unwrap();

        let a_name = a.classes().get("root").unwrap();
        let b_name = b.classes().get("root").unwrap();
        assert!(a_name.starts_with("btn-root-"));
        assert_ne!(a_name, b_name);
    }

    #[test]
    fn test_sheet_is_created_detached() {
        let engine = CssEngine::new();
        let sheet = engine
            .create(&style(json!({"root": {"color": "red"}})), &options(0))
            .unwrap();
        assert!(!sheet.is_attached());
        assert_eq!(engine.attached_count(), 0);
        assert_eq!(engine.sheet_count(), 1);
        assert_eq!(engine.to_css(), "");
    }

    #[test]
    fn test_attach_detach_remove() {
        let engine = CssEngine::new();
        let mut sheet = engine
            .create(&style(json!({"root": {"color": "red"}})), &options(0))
            .unwrap();
        sheet.attach();
        sheet.attach();
        assert_eq!(engine.attached_count(), 1);
        assert!(engine.to_css().contains("color: red;"));

        sheet.detach();
        assert_eq!(engine.attached_count(), 0);
        sheet.attach();
        sheet.remove();
        assert_eq!(engine.attached_count(), 0);
        assert_eq!(engine.sheet_count(), 0);
    }

    #[test]
    fn test_cascade_follows_site_index() {
        let engine = CssEngine::new();
        let mut late = engine
            .create(&style(json!({"late": {"color": "red"}})), &options(5))
            .unwrap();
        let mut early = engine
            .create(&style(json!({"early": {"color": "blue"}})), &options(1))
            .unwrap();
        late.attach();
        early.attach();

        let css = engine.to_css();
        let early_at = css.find(early.classes().get("early").unwrap()).unwrap();
        let late_at = css.find(late.classes().get("late").unwrap()).unwrap();
        assert!(early_at < late_at);
    }

    #[test]
    fn test_nested_selectors_and_globals() {
        let engine = CssEngine::new();
        let sheet = engine
            .create(
                &style(json!({
                    "@global": {"body": {"margin": 0, "&:hover": {"color": "red"}}},
                    "link": {"color": "blue", "&:hover": {"color": "navy"}, "span": {"opacity": 0.5}}
                })),
                &options(0),
            )
            .unwrap();
        let sheet = attached_css(&engine, sheet);
        assert!(sheet.contains("body {\n  margin: 0;\n}\n"));
        assert!(sheet.contains("body:hover {\n  color: red;\n}\n"));
        assert!(sheet.contains(":hover {\n  color: navy;\n}\n"));
        assert!(sheet.contains(" span {\n  opacity: 0.5;\n}\n"));
    }

    #[test]
    fn test_keyframes_and_media() {
        let engine = CssEngine::new();
        let opts = SheetOptions {
            media: Some("print".to_string()),
            meta: Some("Spinner".to_string()),
            ..SheetOptions::default()
        };
        let sheet = engine
            .create(
                &style(json!({"@keyframes spin": {"from": {"opacity": 0}, "100%": {"opacity": 1}}})),
                &opts,
            )
            .unwrap();
        let css = attached_css(&engine, sheet);
        assert!(css.starts_with("/* Spinner */\n@media print {\n"));
        assert!(css.contains("@keyframes spin-1 {\n"));
        assert!(css.contains("  from {\n    opacity: 0;\n  }\n"));
        assert!(css.trim_end().ends_with('}'));
    }

    #[test]
    fn test_keyframes_are_scoped_per_sheet() {
        let engine = CssEngine::new();
        let opts = SheetOptions {
            prefix: Some("ui-".to_string()),
            ..SheetOptions::default()
        };
        let body = json!({
            "@keyframes fade": {"from": {"opacity": 0}, "to": {"opacity": 1}},
            "@keyframes fadeOut": {"from": {"opacity": 1}, "to": {"opacity": 0}},
            "root": {"animation": "$fade 1s", "animationName": "$fadeOut"}
        });
        let mut first = engine.create(&style(body.clone()), &opts).unwrap();
        let mut second = engine.create(&style(body), &opts).unwrap();
        assert_eq!(first.classes().animation("fade"), Some("ui-fade-1"));
        assert_eq!(second.classes().animation("fade"), Some("ui-fade-2"));

        first.attach();
        second.attach();
        let css = engine.to_css();
        assert!(css.contains("@keyframes ui-fade-1 {"));
        assert!(css.contains("@keyframes ui-fade-2 {"));
        assert!(css.contains("animation: ui-fade-1 1s;"));
        assert!(css.contains("animation-name: ui-fadeOut-1;"));
        assert!(css.contains("animation: ui-fade-2 1s;"));
    }

    #[test]
    fn test_source_is_recorded_per_class() {
        let engine = CssEngine::new();
        let sheet = engine
            .create(&style(json!({"root": {"paddingTop": 4}})), &options(0))
            .unwrap();
        let source = sheet.classes().source("root").unwrap();
        assert!(source.contains("padding-top: 4px;"));
    }

    #[test]
    fn test_invalid_structures_are_rejected() {
        let engine = CssEngine::new();
        let cases = [
            (json!({"": {"color": "red"}}), EngineError::EmptyClassName),
            (
                json!({"root": "red"}),
                EngineError::InvalidRule { rule: "root".to_string() },
            ),
            (
                json!({"root": {"visible": true}}),
                EngineError::InvalidValue {
                    rule: "root".to_string(),
                    property: "visible".to_string(),
                    value: "true".to_string(),
                },
            ),
            (
                json!({"@font-face": {}}),
                EngineError::UnsupportedAtRule("@font-face".to_string()),
            ),
        ];
        for (input, expected) in cases {
            match engine.create(&style(input), &options(0)) {
                Err(err) => assert_eq!(err, expected),
                Ok(_) => panic!("expected {:?}", expected),
            }
        }
        assert_eq!(engine.sheet_count(), 0);
    }

    #[test]
    fn test_default_engine_is_memoized_per_thread() {
        let a = default_engine();
        let b = default_engine();
        assert!(a.same_registry(&b));
        assert!(!a.same_registry(&CssEngine::new()));
    }

    fn attached_css(engine: &CssEngine, mut sheet: Box<dyn Sheet>) -> String {
        sheet.attach();
        let css = engine.to_css();
        sheet.remove();
        css
    }
}
