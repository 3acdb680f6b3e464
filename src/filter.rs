use std::collections::{HashMap, HashSet};
use std::str::FromStr;

use tracing::warn;

use crate::catalog;
use crate::error::ConfigError;

/// Decides which runtime events may propagate.
pub trait EventFilter: Send + Sync {
    fn allows_all(&self) -> bool;

    fn allows_all_in(&self, category: &str) -> bool;

    fn allows(&self, category: &str, action: &str) -> bool;
}

/// Evaluates `filter` from the widest query to the narrowest.
///
/// A missing filter denies everything.
pub fn is_permitted(filter: Option<&dyn EventFilter>, category: &str, action: &str) -> bool {
    let Some(filter) = filter else {
        return false;
    };
    if filter.allows_all() {
        return true;
    }
    if category.is_empty() {
        return false;
    }
    if filter.allows_all_in(category) {
        return true;
    }
    !action.is_empty() && filter.allows(category, action)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterRule {
    All,
    Category(String),
    Action { category: String, action: String },
}

impl FromStr for FilterRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rule = s.trim().to_ascii_lowercase();
        if rule == "*" || rule == "all" {
            return Ok(Self::All);
        }
        let (category, action) = match rule.split_once(':') {
            Some((category, action)) => (category.trim(), Some(action.trim())),
            None => (rule.as_str(), None),
        };
        if category.is_empty() || category == "*" {
            return Err(format!("rule `{s}` has no category"));
        }
        match action {
            None | Some("*") => Ok(Self::Category(category.to_string())),
            Some("") => Err(format!("rule `{s}` has an empty action")),
            Some(action) => Ok(Self::Action {
                category: category.to_string(),
                action: action.to_string(),
            }),
        }
    }
}

impl FilterRule {
    /// Whether the rule can match anything the runtime reports.
    pub fn is_known(&self) -> bool {
        match self {
            Self::All => true,
            Self::Category(category) => catalog::actions_of(category).is_some(),
            Self::Action { category, action } => catalog::actions_of(category)
                .is_some_and(|actions| actions.contains(&action.as_str())),
        }
    }
}

/// Filter assembled from configuration rules such as `container:die`.
#[derive(Debug, Clone, Default)]
pub struct RuleFilter {
    all: bool,
    categories: HashSet<String>,
    actions: HashMap<String, HashSet<String>>,
}

impl RuleFilter {
    pub fn from_rules<I>(rules: I) -> Self
    where
        I: IntoIterator<Item = FilterRule>,
    {
        let mut filter = Self::default();
        for rule in rules {
            if !rule.is_known() {
                warn!(?rule, "filter rule names no known runtime event and never matches");
            }
            match rule {
                FilterRule::All => filter.all = true,
                FilterRule::Category(category) => {
                    filter.categories.insert(category);
                }
                FilterRule::Action { category, action } => {
                    filter.actions.entry(category).or_default().insert(action);
                }
            }
        }
        filter
    }

    /// Parse textual rules.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidField` for the first rule that cannot be
    /// parsed.
    pub fn parse<S: AsRef<str>>(rules: &[S]) -> std::result::Result<Self, ConfigError> {
        let parsed = rules
            .iter()
            .map(|rule| {
                FilterRule::from_str(rule.as_ref()).map_err(|message| ConfigError::InvalidField {
                    field: "events.filter",
                    message,
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::from_rules(parsed))
    }
}

impl EventFilter for RuleFilter {
    fn allows_all(&self) -> bool {
        self.all
    }

    fn allows_all_in(&self, category: &str) -> bool {
        self.categories.contains(category)
    }

    fn allows(&self, category: &str, action: &str) -> bool {
        self.actions
            .get(category)
            .is_some_and(|actions| actions.contains(action))
    }
}

#[cfg(test)]
mod tests {
    use super::{EventFilter, FilterRule, RuleFilter, is_permitted};
    use std::str::FromStr;

    struct WideOpen;

    impl EventFilter for WideOpen {
        fn allows_all(&self) -> bool {
            true
        }

        fn allows_all_in(&self, _category: &str) -> bool {
            panic!("category query must not run after a global allow")
        }

        fn allows(&self, _category: &str, _action: &str) -> bool {
            panic!("exact query must not run after a global allow")
        }
    }

    struct CategoryOnly;

    impl EventFilter for CategoryOnly {
        fn allows_all(&self) -> bool {
            false
        }

        fn allows_all_in(&self, category: &str) -> bool {
            category == "container"
        }

        fn allows(&self, _category: &str, _action: &str) -> bool {
            panic!("exact query must not run after a category allow")
        }
    }

    fn parse(rules: &[&str]) -> RuleFilter {
        match RuleFilter::parse(rules) {
            Ok(filter) => filter,
            Err(err) => panic!("rules should parse: {err}"),
        }
    }

    #[test]
    fn missing_filter_denies() {
        assert!(!is_permitted(None, "container", "die"));
    }

    #[test]
    fn global_allow_short_circuits() {
        assert!(is_permitted(Some(&WideOpen), "network", "connect"));
    }

    #[test]
    fn category_allow_short_circuits() {
        assert!(is_permitted(Some(&CategoryOnly), "container", "anything"));
    }

    #[test]
    fn exact_rule_matches_only_its_action() {
        let filter = parse(&["image:pull"]);
        assert!(is_permitted(Some(&filter), "image", "pull"));
        assert!(!is_permitted(Some(&filter), "image", "push"));
        assert!(!is_permitted(Some(&filter), "container", "pull"));
    }

    #[test]
    fn empty_category_is_denied_without_global_allow() {
        let filter = parse(&["container"]);
        assert!(!is_permitted(Some(&filter), "", "die"));
        assert!(is_permitted(Some(&parse(&["*"])), "", "die"));
    }

    #[test]
    fn empty_rule_set_denies_everything() {
        let filter = RuleFilter::default();
        assert!(!is_permitted(Some(&filter), "container", "die"));
    }

    #[test]
    fn rule_parsing() {
        assert_eq!(FilterRule::from_str("ALL"), Ok(FilterRule::All));
        assert_eq!(
            FilterRule::from_str(" Volume:* "),
            Ok(FilterRule::Category("volume".to_string()))
        );
        assert_eq!(
            FilterRule::from_str("container:die"),
            Ok(FilterRule::Action {
                category: "container".to_string(),
                action: "die".to_string(),
            })
        );
        assert!(FilterRule::from_str(":die").is_err());
        assert!(FilterRule::from_str("image:").is_err());
        assert!(RuleFilter::parse(&["container", ""]).is_err());
    }

    #[test]
    fn unknown_rules_are_kept_but_flagged() {
        let rule = |s: &str| FilterRule::from_str(s).unwrap_or(FilterRule::All);
        assert!(rule("network:connect").is_known());
        assert!(rule("volume").is_known());
        assert!(!rule("plugin").is_known());
        assert!(!rule("volume:die").is_known());

        let filter = parse(&["plugin:enable"]);
        assert!(filter.allows("plugin", "enable"));
    }
}
