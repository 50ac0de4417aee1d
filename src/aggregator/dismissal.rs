use crate::events::{Alert, AlertCategory};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

/// Ids of alerts a single viewer has hidden
///
/// Starts empty and only grows; nothing is ever removed automatically.
#[derive(Debug, Clone, Default)]
pub struct DismissalSet {
    ids: HashSet<String>,
}

impl DismissalSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an id as dismissed, returning `false` if it already was
    pub fn insert(&mut self, id: &str) -> bool {
        self.ids.insert(id.to_string())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Category selection applied to an alert view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(AlertCategory),
}

impl CategoryFilter {
    /// Whether the alert passes this filter
    pub fn matches(&self, alert: &Alert) -> bool {
        match self {
            CategoryFilter::All => true,
            CategoryFilter::Only(category) => alert.category == *category,
        }
    }
}

impl From<AlertCategory> for CategoryFilter {
    fn from(category: AlertCategory) -> Self {
        CategoryFilter::Only(category)
    }
}

impl FromStr for CategoryFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "all" => Ok(CategoryFilter::All),
            "health" => Ok(CategoryFilter::Only(AlertCategory::Health)),
            "system" => Ok(CategoryFilter::Only(AlertCategory::System)),
            "reminder" => Ok(CategoryFilter::Only(AlertCategory::Reminder)),
            other => Err(format!(
                "unknown category '{}', expected all, health, system or reminder",
                other
            )),
        }
    }
}

impl fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CategoryFilter::All => "all",
            CategoryFilter::Only(AlertCategory::Health) => "health",
            CategoryFilter::Only(AlertCategory::System) => "system",
            CategoryFilter::Only(AlertCategory::Reminder) => "reminder",
        };
        f.write_str(name)
    }
}
