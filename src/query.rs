use crate::types::{EvalError, Value};

/// Read access to an input document by dotted path.
///
/// Paths are dot-separated field names; a numeric segment indexes into an
/// array, as in `domino.0.type`. The evaluator only ever calls this during
/// the build-context pass.
pub trait Document {
    /// Resolve a path to a scalar value.
    ///
    /// Returns `Ok(None)` when the path does not exist or holds `null`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::UnsupportedType`] when the path holds a value
    /// that is not a scalar.
    fn lookup(&self, path: &str) -> Result<Option<Value>, EvalError>;

    /// Number of elements of the array at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EvalError::PathNotFound`] when the path does not exist and
    /// [`EvalError::NotAnArray`] when it holds something other than an array.
    fn length(&self, path: &str) -> Result<usize, EvalError>;
}

fn walk<'a>(root: &'a serde_json::Value, path: &str) -> Option<&'a serde_json::Value> {
    path.split('.').try_fold(root, |node, segment| match node {
        serde_json::Value::Object(map) => map.get(segment),
        serde_json::Value::Array(items) => items.get(segment.parse::<usize>().ok()?),
        _ => None,
    })
}

impl Document for serde_json::Value {
    fn lookup(&self, path: &str) -> Result<Option<Value>, EvalError> {
        match walk(self, path) {
            None | Some(serde_json::Value::Null) => Ok(None),
            Some(found) => Value::try_from(found).map(Some),
        }
    }

    fn length(&self, path: &str) -> Result<usize, EvalError> {
        match walk(self, path) {
            Some(serde_json::Value::Array(items)) => Ok(items.len()),
            Some(_) => Err(EvalError::NotAnArray {
                path: path.to_owned(),
            }),
            None => Err(EvalError::PathNotFound {
                path: path.to_owned(),
            }),
        }
    }
}

impl<D: Document + ?Sized> Document for &D {
    fn lookup(&self, path: &str) -> Result<Option<Value>, EvalError> {
        (**self).lookup(path)
    }

    fn length(&self, path: &str) -> Result<usize, EvalError> {
        (**self).length(path)
    }
}
