use std::collections::BTreeMap;

use super::Value;

/// State of one active `FOR:` loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopFrame {
    /// Loop variable name, e.g. `i`.
    pub index_key: String,
    pub start: i64,
    pub end: i64,
    pub current: i64,
}

/// Per-evaluation store bridging the build-context and evaluate passes.
///
/// Loop state is kept apart from resolved field values, so a field can never
/// collide with a loop slot. Nested loops stack their frames, innermost last.
/// A context belongs to exactly one evaluation and is discarded afterwards.
#[derive(Debug, Clone, Default)]
pub struct Context {
    frames: Vec<LoopFrame>,
    fields: BTreeMap<String, Value>,
    bounds: BTreeMap<String, (i64, i64)>,
}

impl Context {
    /// Create an empty context.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a resolved value to a field key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        self.fields.insert(key.into(), value);
    }

    /// Look up the value bound to a field key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of resolved field bindings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Resolved field bindings, ordered by key.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The innermost active loop, if any.
    #[must_use]
    pub fn frame(&self) -> Option<&LoopFrame> {
        self.frames.last()
    }

    /// Active loops, innermost first.
    pub fn frames(&self) -> impl Iterator<Item = &LoopFrame> {
        self.frames.iter().rev()
    }

    /// Make `frame` the innermost active loop.
    pub fn enter_loop(&mut self, frame: LoopFrame) {
        self.frames.push(frame);
    }

    /// Leave the innermost loop, making its enclosing loop active again.
    pub fn leave_loop(&mut self) -> Option<LoopFrame> {
        self.frames.pop()
    }

    /// Set the current index of the innermost loop. No-op outside a loop.
    pub fn set_current_index(&mut self, index: i64) {
        if let Some(frame) = self.frames.last_mut() {
            frame.current = index;
        }
    }

    /// Record the resolved `[start, end)` bounds of a loop header.
    pub fn set_bounds(&mut self, header: impl Into<String>, start: i64, end: i64) {
        self.bounds.insert(header.into(), (start, end));
    }

    /// Bounds recorded for a loop header by the build-context pass.
    #[must_use]
    pub fn bounds(&self, header: &str) -> Option<(i64, i64)> {
        self.bounds.get(header).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(key: &str, end: i64) -> LoopFrame {
        LoopFrame {
            index_key: key.to_owned(),
            start: 0,
            end,
            current: 0,
        }
    }

    #[test]
    fn set_and_get() {
        let mut ctx = Context::new();
        ctx.insert("foo", Value::from("bar"));
        assert_eq!(ctx.get("foo"), Some(&Value::String("bar".to_owned())));
    }

    #[test]
    fn overwrite_value() {
        let mut ctx = Context::new();
        ctx.insert("foo", Value::from("bar"));
        ctx.insert("foo", Value::Int(10));
        assert_eq!(ctx.get("foo"), Some(&Value::Int(10)));
        assert_eq!(ctx.len(), 1);
    }

    #[test]
    fn contains_key() {
        let mut ctx = Context::new();
        ctx.insert("foo", Value::from("bar"));
        assert!(ctx.contains_key("foo"));
        assert!(!ctx.contains_key("bar"));
    }

    #[test]
    fn empty_context() {
        let ctx = Context::new();
        assert!(ctx.is_empty());
        assert_eq!(ctx.get("anything"), None);
        assert!(ctx.frame().is_none());
    }

    #[test]
    fn fields_are_ordered() {
        let mut ctx = Context::new();
        ctx.insert("b", Value::Int(2));
        ctx.insert("a", Value::Int(1));
        let keys: Vec<&str> = ctx.fields().map(|(k, _)| k).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn loop_slots_do_not_collide_with_fields() {
        let mut ctx = Context::new();
        ctx.insert("i", Value::from("field named i"));
        ctx.enter_loop(frame("i", 3));
        ctx.set_current_index(2);
        assert_eq!(ctx.frame().map(|f| f.current), Some(2));
        assert_eq!(ctx.get("i"), Some(&Value::from("field named i")));
        assert_eq!(ctx.leave_loop().map(|f| f.current), Some(2));
        assert!(ctx.frame().is_none());
    }

    #[test]
    fn nested_loop_restores_outer_frame() {
        let mut ctx = Context::new();
        ctx.enter_loop(frame("i", 4));
        ctx.set_current_index(1);

        ctx.enter_loop(frame("j", 2));
        ctx.set_current_index(0);
        let keys: Vec<&str> = ctx.frames().map(|f| f.index_key.as_str()).collect();
        assert_eq!(keys, ["j", "i"]);
        ctx.leave_loop();

        let outer = ctx.frame().unwrap();
        assert_eq!(outer.index_key, "i");
        assert_eq!(outer.current, 1);
        assert_eq!(outer.end, 4);
        ctx.leave_loop();
        assert!(ctx.frame().is_none());
    }

    #[test]
    fn set_current_index_outside_loop_is_noop() {
        let mut ctx = Context::new();
        ctx.set_current_index(5);
        assert!(ctx.frame().is_none());
    }

    #[test]
    fn bounds_by_header() {
        let mut ctx = Context::new();
        ctx.set_bounds("i=0:domino.size()", 0, 4);
        assert_eq!(ctx.bounds("i=0:domino.size()"), Some((0, 4)));
        assert_eq!(ctx.bounds("j=0:other.size()"), None);
    }
}
