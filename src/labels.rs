//! Label value normalization.
//!
//! Every label value is lowercased before it becomes part of a series key so
//! that `GET` and `get` never split a series. Label *names* are fixed by each
//! family's descriptor and are never built per call.

/// Lowercase a label value.
pub fn normalize(value: &str) -> String {
    value.to_lowercase()
}

/// Lowercase, sort and comma-join several values into one label value.
pub fn join_sorted<S: AsRef<str>>(values: &[S]) -> String {
    let mut normalized: Vec<String> = values.iter().map(|v| normalize(v.as_ref())).collect();
    normalized.sort();
    normalized.join(",")
}

/// Ordered label values for one series, already normalized.
///
/// The order matches the label names of the family the set is used with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct LabelSet {
    values: Vec<String>,
}

impl LabelSet {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            values: values.into_iter().map(|v| normalize(v.as_ref())).collect(),
        }
    }

    /// Copy of this set with a result code appended as the last value.
    pub fn with_code(&self, code: &str) -> Self {
        let mut values = self.values.clone();
        values.push(normalize(code));
        Self { values }
    }

    pub fn values(&self) -> Vec<&str> {
        self.values.iter().map(String::as_str).collect()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.values.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_set_lowercases_values() {
        let set = LabelSet::new(["GET", "/Foo"]);
        assert_eq!(set.values(), vec!["get", "/foo"]);
        assert_eq!(set, LabelSet::new(["get", "/foo"]));
    }

    #[test]
    fn with_code_appends_normalized_code() {
        let set = LabelSet::new(["orders"]).with_code("NOT_FOUND");
        assert_eq!(set.values(), vec!["orders", "not_found"]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn join_sorted_is_order_insensitive() {
        assert_eq!(join_sorted(&["Users", "accounts"]), "accounts,users");
        assert_eq!(join_sorted(&["accounts", "USERS"]), "accounts,users");
        assert_eq!(join_sorted::<&str>(&[]), "");
    }
}
