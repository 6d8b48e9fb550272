//! Path parameters captured during a match.

use std::collections::HashMap;

/// Destination for captured path parameters.
///
/// Implemented by whatever request context the surrounding server carries;
/// the router writes `name -> value` pairs into it once a route matches.
pub trait ParamSink {
    /// Record one captured parameter.
    fn set_param(&mut self, name: &str, value: &str);
}

/// Ordered list of captured parameters, in pattern order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    inner: Vec<(String, String)>,
}

impl Params {
    /// Create an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push((name.into(), value.into()));
    }

    /// Value of the first parameter called `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Iterate over `(name, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Write every parameter into `sink`, in capture order.
    pub fn replay_into<S: ParamSink + ?Sized>(&self, sink: &mut S) {
        for (name, value) in &self.inner {
            sink.set_param(name, value);
        }
    }
}

impl ParamSink for Params {
    fn set_param(&mut self, name: &str, value: &str) {
        self.push(name, value);
    }
}

impl ParamSink for HashMap<String, String> {
    fn set_param(&mut self, name: &str, value: &str) {
        self.insert(name.to_string(), value.to_string());
    }
}

impl ParamSink for Vec<(String, String)> {
    fn set_param(&mut self, name: &str, value: &str) {
        self.push((name.to_string(), value.to_string()));
    }
}

/// Sink that drops everything. Used when only the match outcome matters.
#[derive(Debug, Default, Clone, Copy)]
pub struct Discard;

impl ParamSink for Discard {
    fn set_param(&mut self, _name: &str, _value: &str) {}
}
