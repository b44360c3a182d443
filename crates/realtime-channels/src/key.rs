//! Subscription keys and their canonical channel names.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Value a change feed filters on. Upstream filters compare either numbers
/// or strings, so both canonicalize to the same text form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Numeric filter value (foreign keys, counters)
    Int(i64),
    /// String filter value (UUIDs, slugs)
    Text(String),
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Int(value) => write!(f, "{}", value),
            FilterValue::Text(value) => write!(f, "{}", value),
        }
    }
}

impl From<i64> for FilterValue {
    fn from(value: i64) -> Self {
        FilterValue::Int(value)
    }
}

impl From<&str> for FilterValue {
    fn from(value: &str) -> Self {
        FilterValue::Text(value.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(value: String) -> Self {
        FilterValue::Text(value)
    }
}

/// Equality filter on a single column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnFilter {
    /// Column name
    pub column: String,
    /// Value the column must equal
    pub value: FilterValue,
}

/// Identifies one logical upstream change feed.
///
/// A filterless key is scoped to the whole table. Two keys with the same
/// canonical name share one upstream feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionKey {
    /// Table the feed watches
    pub table: String,
    /// Optional column filter
    #[serde(default)]
    pub filter: Option<ColumnFilter>,
}

impl SubscriptionKey {
    /// Key covering every change on a table.
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            filter: None,
        }
    }

    /// Key covering changes where `column` equals `value`.
    pub fn filtered(
        table: impl Into<String>,
        column: impl Into<String>,
        value: impl Into<FilterValue>,
    ) -> Self {
        Self {
            table: table.into(),
            filter: Some(ColumnFilter {
                column: column.into(),
                value: value.into(),
            }),
        }
    }

    /// Canonical channel name: `realtime:{table}` or
    /// `realtime:{table}:{column}:{value}`.
    pub fn channel_name(&self) -> String {
        match &self.filter {
            Some(filter) => format!(
                "realtime:{}:{}:{}",
                self.table, filter.column, filter.value
            ),
            None => format!("realtime:{}", self.table),
        }
    }

    /// Filter expression for upstream transports (`column=eq.value`), if
    /// this key is filtered.
    pub fn filter_expr(&self) -> Option<String> {
        self.filter
            .as_ref()
            .map(|f| format!("{}=eq.{}", f.column, f.value))
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.channel_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filterless_channel_name() {
        let key = SubscriptionKey::table("tasks");
        assert_eq!(key.channel_name(), "realtime:tasks");
        assert_eq!(key.filter_expr(), None);
    }

    #[test]
    fn numeric_filter_channel_name() {
        let key = SubscriptionKey::filtered("tasks", "project_id", 7);
        assert_eq!(key.channel_name(), "realtime:tasks:project_id:7");
        assert_eq!(key.filter_expr(), Some("project_id=eq.7".to_string()));
    }

    #[test]
    fn string_filter_channel_name() {
        let key = SubscriptionKey::filtered("automations", "automation_id", "auto-1");
        assert_eq!(key.channel_name(), "realtime:automations:automation_id:auto-1");
        assert_eq!(key.filter_expr(), Some("automation_id=eq.auto-1".to_string()));
    }

    #[test]
    fn same_key_same_name() {
        let a = SubscriptionKey::filtered("tasks", "project_id", 7);
        let b = SubscriptionKey::filtered("tasks", "project_id", 7);
        assert_eq!(a, b);
        assert_eq!(a.channel_name(), b.channel_name());
    }

    #[test]
    fn filtered_and_filterless_differ() {
        let a = SubscriptionKey::table("tasks");
        let b = SubscriptionKey::filtered("tasks", "project_id", 7);
        assert_ne!(a.channel_name(), b.channel_name());
    }

    #[test]
    fn filter_value_untagged_serde() {
        let int: FilterValue = serde_json::from_str("7").unwrap();
        assert_eq!(int, FilterValue::Int(7));
        let text: FilterValue = serde_json::from_str("\"auto-1\"").unwrap();
        assert_eq!(text, FilterValue::Text("auto-1".to_string()));
    }
}
