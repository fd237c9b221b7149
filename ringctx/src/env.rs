//! Environment variables as a `KEY=VALUE` store.
//!
//! [`Env`] has value semantics: cloning it produces an independent store.
//! A [`Ring`](crate::Ring) holds its environment behind an `Arc` and never
//! mutates it in place; every environment mutator on a ring clones first.
//!
//! The free functions (`lookup_in`, `set_in`, ...) work on raw `KEY=VALUE`
//! sequences such as the output of [`std::env::vars`]. They build a temporary
//! [`Env`] and never modify their input.

use std::collections::HashMap;

/// Environment variable store parsed from `KEY=VALUE` lines.
///
/// Entries with no `=`, with an empty key, or empty lines are dropped while
/// parsing. When a key repeats, the last occurrence wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Env {
    vars: HashMap<String, String>,
}

impl Env {
    /// Parse `KEY=VALUE` lines into a new store.
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            vars: split(lines),
        }
    }

    /// Build a store from the current process environment.
    ///
    /// Variables that are not valid unicode are converted lossily.
    pub fn from_os() -> Self {
        let vars = std::env::vars_os()
            .map(|(key, value)| {
                (
                    key.to_string_lossy().into_owned(),
                    value.to_string_lossy().into_owned(),
                )
            })
            .filter(|(key, _)| !key.is_empty())
            .collect();
        Self { vars }
    }

    /// Return the value of `key`, or `None` when it is not set.
    ///
    /// A variable set to the empty string returns `Some("")`.
    pub fn lookup(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    /// Return the value of `key`, or `""` when it is not set. Use
    /// [`Env::lookup`] to tell an empty value from a missing one.
    pub fn get(&self, key: &str) -> &str {
        self.lookup(key).unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.vars.insert(key.into(), value.into());
    }

    /// Set every pair from `src`, overwriting existing keys.
    pub fn set_from<K, V>(&mut self, src: impl IntoIterator<Item = (K, V)>)
    where
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in src {
            self.set(key, value);
        }
    }

    /// Set every entry parsed from `KEY=VALUE` lines, overwriting existing
    /// keys.
    pub fn set_with<I, S>(&mut self, lines: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.set_from(split(lines));
    }

    pub fn unset(&mut self, key: &str) {
        self.vars.remove(key);
    }

    /// Serialize to `KEY=VALUE` lines in no particular order.
    ///
    /// An empty store returns an empty, unallocated vector.
    pub fn all(&self) -> Vec<String> {
        if self.vars.is_empty() {
            return Vec::new();
        }
        self.vars
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over `(key, value)` pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<S: AsRef<str>> FromIterator<S> for Env {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Parse `KEY=VALUE` lines into a map.
///
/// The first `=` separates key from value, so values may contain `=`.
pub fn split<I, S>(lines: I) -> HashMap<String, String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut vars = HashMap::new();
    for line in lines {
        let Some((key, value)) = line.as_ref().split_once('=') else {
            continue;
        };
        if key.is_empty() {
            continue;
        }
        vars.insert(key.to_string(), value.to_string());
    }
    vars
}

/// Look up `key` in raw `KEY=VALUE` lines.
pub fn lookup_in<S: AsRef<str>>(env: &[S], key: &str) -> Option<String> {
    Env::new(env).lookup(key).map(str::to_string)
}

/// Return the value of `key` in raw lines, or `""` when it is not set.
pub fn get_in<S: AsRef<str>>(env: &[S], key: &str) -> String {
    lookup_in(env, key).unwrap_or_default()
}

/// Return the value of `key` in raw lines, or `default` when it is not set.
pub fn get_or<S: AsRef<str>>(env: &[S], key: &str, default: &str) -> String {
    lookup_in(env, key).unwrap_or_else(|| default.to_string())
}

/// Return new lines with `key` set to `value`.
pub fn set_in<S: AsRef<str>>(env: &[S], key: &str, value: &str) -> Vec<String> {
    let mut store = Env::new(env);
    store.set(key, value);
    store.all()
}

/// Return new lines without `key`.
pub fn unset_in<S: AsRef<str>>(env: &[S], key: &str) -> Vec<String> {
    let mut store = Env::new(env);
    store.unset(key);
    store.all()
}

/// Return new lines with every pair from `src` set.
///
/// With an empty `src` the input is copied as is, including malformed
/// lines.
pub fn merge_from<S, K, V>(env: &[S], src: impl IntoIterator<Item = (K, V)>) -> Vec<String>
where
    S: AsRef<str>,
    K: Into<String>,
    V: Into<String>,
{
    let mut src = src.into_iter().peekable();
    if src.peek().is_none() {
        return env.iter().map(|line| line.as_ref().to_string()).collect();
    }
    let mut store = Env::new(env);
    store.set_from(src);
    store.all()
}

/// Return `env` when given, otherwise the process environment as lines.
pub fn or_os(env: Option<Vec<String>>) -> Vec<String> {
    env.unwrap_or_else(|| Env::from_os().all())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(mut lines: Vec<String>) -> Vec<String> {
        lines.sort();
        lines
    }

    #[test]
    fn parse_drops_malformed_entries() {
        let env = Env::new(["A=1", "", "NOEQ", "=orphan", "B="]);
        assert_eq!(env.len(), 2);
        assert_eq!(env.lookup("A"), Some("1"));
        assert_eq!(env.lookup("B"), Some(""));
        assert_eq!(env.lookup("NOEQ"), None);
    }

    #[test]
    fn parse_splits_on_first_equals() {
        let env = Env::new(["URL=a=b=c"]);
        assert_eq!(env.get("URL"), "a=b=c");
    }

    #[test]
    fn parse_last_duplicate_wins() {
        let env = Env::new(["A=1", "B=2", "A=3"]);
        assert_eq!(sorted(env.all()), vec!["A=3", "B=2"]);
    }

    #[test]
    fn lookup_distinguishes_empty_from_missing() {
        let env = Env::new(["EMPTY="]);
        assert_eq!(env.lookup("EMPTY"), Some(""));
        assert_eq!(env.lookup("MISSING"), None);
        assert_eq!(env.get("EMPTY"), "");
        assert_eq!(env.get("MISSING"), "");
    }

    #[test]
    fn all_of_empty_store_is_unallocated() {
        let env = Env::new(Vec::<String>::new());
        let all = env.all();
        assert!(all.is_empty());
        assert_eq!(all.capacity(), 0);
    }

    #[test]
    fn set_and_unset_mutate_in_place() {
        let mut env = Env::new(["A=1"]);
        env.set("A", "2");
        env.set("B", "3");
        env.unset("A");
        env.unset("NOT_THERE");
        assert_eq!(env.all(), vec!["B=3"]);
    }

    #[test]
    fn set_with_overwrites_existing() {
        let mut env = Env::new(["A=1", "B=2"]);
        env.set_with(["B=20", "C=30", "broken"]);
        assert_eq!(sorted(env.all()), vec!["A=1", "B=20", "C=30"]);
    }

    #[test]
    fn clone_is_independent() {
        let env = Env::new(["A=1"]);
        let mut copy = env.clone();
        copy.set("A", "2");
        assert_eq!(env.get("A"), "1");
        assert_eq!(copy.get("A"), "2");
    }

    #[test]
    fn helpers_do_not_mutate_input() {
        let env = vec!["A=1".to_string(), "B=2".to_string()];

        assert_eq!(lookup_in(&env, "A"), Some("1".to_string()));
        assert_eq!(lookup_in(&env, "C"), None);
        assert_eq!(get_in(&env, "C"), "");
        assert_eq!(get_or(&env, "C", "dflt"), "dflt");
        assert_eq!(get_or(&env, "A", "dflt"), "1");
        assert_eq!(sorted(set_in(&env, "C", "3")), vec!["A=1", "B=2", "C=3"]);
        assert_eq!(unset_in(&env, "A"), vec!["B=2"]);

        assert_eq!(env, vec!["A=1", "B=2"]);
    }

    #[test]
    fn merge_from_overwrites_and_copies() {
        let env = ["A=1", "B=2"];
        let merged = merge_from(&env, [("B", "20"), ("C", "3")]);
        assert_eq!(sorted(merged), vec!["A=1", "B=20", "C=3"]);

        let untouched = merge_from(&env, Vec::<(String, String)>::new());
        assert_eq!(untouched, vec!["A=1", "B=2"]);
    }

    #[test]
    fn or_os_prefers_given_env() {
        let env = vec!["A=1".to_string()];
        assert_eq!(or_os(Some(env.clone())), env);
    }
}
