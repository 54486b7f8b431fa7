//! # Topic pattern parsing and matching.
//!
//! An [`Identifier`] names an event as `name:action` and doubles as the
//! subscription pattern language. Parsing is **permissive**: no string is
//! ever rejected; anything that fits no wildcard form falls through to the
//! bare-name rule.
//!
//! ## Grammar (checked in this order)
//! ```text
//! "name:*"       any action for `name`            (mode = NameOnly)
//! "*:action"     any name for `action`            (mode = ActionOnly)
//! "name:action"  exact pair; action "call" means  (mode = All)
//!                the set {entry, exit}
//! "name"         exact name, actions default to   (mode = All)
//!                {entry, exit}
//! ```
//!
//! `"*:*"` is legal and matches every topic and every action. For the
//! `name:action` form the split happens at the **last** colon, so
//! `"a:b:c"` parses as name `a:b`, action `c`.
//!
//! ## Matching
//! - `All`: names equal **and** action sets intersect.
//! - `NameOnly`: names equal (actions ignored).
//! - `ActionOnly`: action sets intersect (names ignored).
//!
//! A wildcarded (`None`) action set intersects with everything. Guard
//! predicates are not part of the identifier; they live on the subscription
//! entry and are evaluated only after the topic/action match succeeds.

use std::collections::BTreeSet;
use std::fmt;

/// Action published before a wrapped exposition runs.
pub const ACTION_ENTRY: &str = "entry";

/// Action published after a wrapped exposition runs.
pub const ACTION_EXIT: &str = "exit";

/// Shorthand action that expands to `{entry, exit}` when parsed.
pub const ACTION_CALL: &str = "call";

/// Which fields participate in the match predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    /// Both name and actions must match.
    All,
    /// Only the name must match; any action passes.
    NameOnly,
    /// Only the actions must intersect; any name passes.
    ActionOnly,
}

/// Parsed topic pattern. Immutable after construction.
///
/// `name = None` means "any topic name"; `actions = None` means "any action".
/// Exactly one [`MatchMode`] is selected at construction, consistent with
/// which fields are wildcarded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identifier {
    name: Option<String>,
    actions: Option<BTreeSet<String>>,
    mode: MatchMode,
}

impl Identifier {
    /// Parses a pattern string. Never fails.
    pub fn parse(pattern: &str) -> Self {
        if let Some(name) = pattern.strip_suffix(":*") {
            if name == "*" {
                // "*:*": both fields wildcarded.
                return Self {
                    name: None,
                    actions: None,
                    mode: MatchMode::ActionOnly,
                };
            }
            return Self {
                name: Some(name.to_string()),
                actions: None,
                mode: MatchMode::NameOnly,
            };
        }
        if let Some(action) = pattern.strip_prefix("*:") {
            // No "call" expansion on this path; only name:action expands it.
            return Self {
                name: None,
                actions: Some(BTreeSet::from([action.to_string()])),
                mode: MatchMode::ActionOnly,
            };
        }
        if let Some(split) = pattern.rfind(':') {
            let (name, action) = (&pattern[..split], &pattern[split + 1..]);
            let actions = if action == ACTION_CALL {
                entry_exit()
            } else {
                BTreeSet::from([action.to_string()])
            };
            return Self {
                name: Some(name.to_string()),
                actions: Some(actions),
                mode: MatchMode::All,
            };
        }
        Self {
            name: Some(pattern.to_string()),
            actions: Some(entry_exit()),
            mode: MatchMode::All,
        }
    }

    /// Derives a single-action exact identifier from this one, keeping the
    /// name. Used to stamp `entry`/`exit` events for a wrapped exposition.
    pub fn with_action(&self, action: &str) -> Self {
        Self {
            name: self.name.clone(),
            actions: Some(BTreeSet::from([action.to_string()])),
            mode: MatchMode::All,
        }
    }

    /// Topic/action match between this pattern and a published identifier.
    ///
    /// Guards are evaluated separately by the bus, and only after this
    /// returns `true`.
    pub fn matches(&self, published: &Identifier) -> bool {
        match self.mode {
            MatchMode::All => {
                self.name == published.name && actions_intersect(&self.actions, &published.actions)
            }
            MatchMode::NameOnly => self.name == published.name,
            MatchMode::ActionOnly => actions_intersect(&self.actions, &published.actions),
        }
    }

    /// Topic name, if not wildcarded.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Action set, if not wildcarded.
    pub fn actions(&self) -> Option<&BTreeSet<String>> {
        self.actions.as_ref()
    }

    /// Selected match mode.
    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    /// True when both name and actions are concrete (publishable as-is).
    pub fn is_concrete(&self) -> bool {
        self.name.is_some() && self.actions.is_some()
    }

    /// One `"name:action"` string per action, for introspection listings.
    pub fn topic_strings(&self) -> Vec<String> {
        let name = self.name.as_deref().unwrap_or("*");
        match &self.actions {
            Some(actions) => actions.iter().map(|a| format!("{name}:{a}")).collect(),
            None => vec![format!("{name}:*")],
        }
    }

    /// Owned registry-bucket key: the exact topic name, or `None` for the
    /// wildcard-name bucket.
    pub(crate) fn bucket_key(&self) -> Option<String> {
        self.name.clone()
    }

    /// Whether the action set contains `action` (false when wildcarded).
    pub(crate) fn has_action(&self, action: &str) -> bool {
        self.actions
            .as_ref()
            .is_some_and(|set| set.contains(action))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.as_deref().unwrap_or("*");
        match &self.actions {
            Some(actions) => {
                let joined = actions.iter().cloned().collect::<Vec<_>>().join(",");
                write!(f, "{name}:{joined}")
            }
            None => write!(f, "{name}:*"),
        }
    }
}

fn entry_exit() -> BTreeSet<String> {
    BTreeSet::from([ACTION_ENTRY.to_string(), ACTION_EXIT.to_string()])
}

/// A `None` set is a wildcard and intersects with everything.
fn actions_intersect(lhs: &Option<BTreeSet<String>>, rhs: &Option<BTreeSet<String>>) -> bool {
    match (lhs, rhs) {
        (Some(a), Some(b)) => !a.is_disjoint(b),
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bare_name_defaults_to_entry_exit() {
        let id = Identifier::parse("sample");
        assert_eq!(id.name(), Some("sample"));
        assert_eq!(id.mode(), MatchMode::All);
        let actions = id.actions().expect("concrete actions");
        assert!(actions.contains("entry"));
        assert!(actions.contains("exit"));
        assert_eq!(actions.len(), 2);
    }

    #[test]
    fn test_name_action_pair() {
        let id = Identifier::parse("sample:run");
        assert_eq!(id.name(), Some("sample"));
        assert_eq!(id.mode(), MatchMode::All);
        assert!(id.has_action("run"));
        assert!(!id.has_action("entry"));
    }

    #[test]
    fn test_call_expands_to_entry_exit() {
        let id = Identifier::parse("sample:call");
        let actions = id.actions().expect("concrete actions");
        assert_eq!(actions.len(), 2);
        assert!(actions.contains("entry"));
        assert!(actions.contains("exit"));
    }

    #[test]
    fn test_any_action_wildcard() {
        let id = Identifier::parse("sample:*");
        assert_eq!(id.name(), Some("sample"));
        assert_eq!(id.mode(), MatchMode::NameOnly);
        assert!(id.actions().is_none());
    }

    #[test]
    fn test_any_name_wildcard() {
        let id = Identifier::parse("*:entry");
        assert_eq!(id.name(), None);
        assert_eq!(id.mode(), MatchMode::ActionOnly);
        assert!(id.has_action("entry"));
    }

    #[test]
    fn test_double_wildcard_matches_everything() {
        let wild = Identifier::parse("*:*");
        assert!(wild.matches(&Identifier::parse("sample")));
        assert!(wild.matches(&Identifier::parse("other:weird")));
        assert!(wild.matches(&Identifier::parse("*:entry")));
    }

    #[test]
    fn test_split_happens_at_last_colon() {
        let id = Identifier::parse("a:b:c");
        assert_eq!(id.name(), Some("a:b"));
        assert!(id.has_action("c"));
    }

    #[test]
    fn test_match_all_requires_intersection() {
        let sub = Identifier::parse("t:run");
        assert!(sub.matches(&Identifier::parse("t:run")));
        assert!(!sub.matches(&Identifier::parse("t:stop")));
        assert!(!sub.matches(&Identifier::parse("other:run")));
    }

    #[test]
    fn test_bare_names_intersect_on_default_actions() {
        let sub = Identifier::parse("t");
        assert!(sub.matches(&Identifier::parse("t:entry")));
        assert!(sub.matches(&Identifier::parse("t:exit")));
        assert!(!sub.matches(&Identifier::parse("t:other")));
    }

    #[test]
    fn test_name_only_ignores_actions() {
        let sub = Identifier::parse("t:*");
        assert!(sub.matches(&Identifier::parse("t:anything")));
        assert!(!sub.matches(&Identifier::parse("u:anything")));
    }

    #[test]
    fn test_action_only_ignores_name() {
        let sub = Identifier::parse("*:boom");
        assert!(sub.matches(&Identifier::parse("x:boom")));
        assert!(sub.matches(&Identifier::parse("y:boom")));
        assert!(!sub.matches(&Identifier::parse("x:calm")));
    }

    #[test]
    fn test_with_action_keeps_name() {
        let id = Identifier::parse("op").with_action(ACTION_ENTRY);
        assert_eq!(id.name(), Some("op"));
        assert!(id.has_action("entry"));
        assert!(!id.has_action("exit"));
        assert_eq!(id.mode(), MatchMode::All);
    }

    #[test]
    fn test_display_and_topic_strings() {
        assert_eq!(Identifier::parse("t:run").to_string(), "t:run");
        assert_eq!(Identifier::parse("t:*").to_string(), "t:*");
        assert_eq!(Identifier::parse("*:run").to_string(), "*:run");
        assert_eq!(
            Identifier::parse("t").topic_strings(),
            vec!["t:entry".to_string(), "t:exit".to_string()]
        );
    }

    #[test]
    fn test_is_concrete() {
        assert!(Identifier::parse("t:run").is_concrete());
        assert!(Identifier::parse("t").is_concrete());
        assert!(!Identifier::parse("t:*").is_concrete());
        assert!(!Identifier::parse("*:run").is_concrete());
    }
}
