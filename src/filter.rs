//! Record filtering by field values
//!
//! Filter rules are configured as `key:value` pairs. The key side is a
//! [`FieldSpec`] (alternative field names), the value side a comma-separated
//! list of allowed values. A record passes when every rule resolves and its
//! stringified value is one of the rule's allowed values.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::warn;

use crate::record::{FieldSpec, Record};
use crate::sink::Sink;

/// One field-to-allowed-values rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterRule {
    field: FieldSpec,
    allowed: BTreeSet<String>,
}

impl FilterRule {
    /// Build a rule from a field spec and a comma-separated list of values
    ///
    /// # Examples
    ///
    /// ```
    /// use logstash_kafka_tail::filter::FilterRule;
    /// use logstash_kafka_tail::record::Record;
    ///
    /// let rule = FilterRule::new("level,severity", "ERROR,WARN");
    /// let record = Record::from_json(br#"{"severity": "WARN"}"#).unwrap();
    /// assert!(rule.matches(&record));
    /// ```
    pub fn new(field: &str, values: &str) -> Self {
        Self {
            field: FieldSpec::parse(field),
            allowed: values.split(',').map(str::to_string).collect(),
        }
    }

    /// Field spec this rule resolves
    pub fn field(&self) -> &FieldSpec {
        &self.field
    }

    /// Allowed values, sorted
    pub fn allowed(&self) -> impl Iterator<Item = &str> {
        self.allowed.iter().map(String::as_str)
    }

    /// Returns true when the field resolves to one of the allowed values
    pub fn matches(&self, record: &Record) -> bool {
        match record.resolve_string(&self.field) {
            Some(value) => self.allowed.contains(&value),
            None => false,
        }
    }
}

/// Set of filter rules, all of which must hold.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterRules {
    rules: Vec<FilterRule>,
}

impl FilterRules {
    /// Create an empty rule set that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key:value` entries.
    ///
    /// Entries without a `:` are skipped with a warning. When the same key
    /// appears more than once the later entry replaces the earlier one.
    ///
    /// # Examples
    ///
    /// ```
    /// use logstash_kafka_tail::filter::FilterRules;
    ///
    /// let rules = FilterRules::parse(["type:app", "level:ERROR,WARN"]);
    /// assert_eq!(rules.len(), 2);
    /// assert_eq!(rules.summary(), "type=app, level=ERROR|WARN");
    /// ```
    pub fn parse<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = Self::new();
        for entry in entries {
            let entry = entry.as_ref();
            match entry.split_once(':') {
                Some((field, values)) => rules.insert(FilterRule::new(field, values)),
                None => warn!(filter = %entry, "Ignoring filter without ':' separator"),
            }
        }
        rules
    }

    /// Add a rule, replacing any rule for the same field spec
    pub fn insert(&mut self, rule: FilterRule) {
        match self.rules.iter_mut().find(|r| r.field == rule.field) {
            Some(existing) => *existing = rule,
            None => self.rules.push(rule),
        }
    }

    /// Returns true when every rule holds for the record
    pub fn accepts(&self, record: &Record) -> bool {
        self.rules.iter().all(|rule| rule.matches(record))
    }

    /// Number of rules
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true when no rules are configured
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterate over the configured rules
    pub fn iter(&self) -> impl Iterator<Item = &FilterRule> {
        self.rules.iter()
    }

    /// Human-readable summary for logging
    pub fn summary(&self) -> String {
        if self.rules.is_empty() {
            return "no filters (all records)".to_string();
        }

        self.rules
            .iter()
            .map(|rule| {
                format!(
                    "{}={}",
                    rule.field,
                    rule.allowed().collect::<Vec<_>>().join("|")
                )
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Sink decorator that forwards only records accepted by its rules.
///
/// Rejected records are dropped silently.
pub struct Filter<S> {
    rules: Arc<FilterRules>,
    downstream: S,
}

impl<S: Sink> Filter<S> {
    /// Wrap a downstream sink
    pub fn new(rules: impl Into<Arc<FilterRules>>, downstream: S) -> Self {
        Self {
            rules: rules.into(),
            downstream,
        }
    }

    /// Returns true when the record passes every rule
    pub fn accepts(&self, record: &Record) -> bool {
        self.rules.accepts(record)
    }
}

#[async_trait::async_trait]
impl<S: Sink> Sink for Filter<S> {
    async fn print(&self, record: Record) {
        if self.accepts(&record) {
            self.downstream.print(record).await;
        }
    }
}
