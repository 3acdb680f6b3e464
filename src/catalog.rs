//! Static action tables shared by the whole pipeline.
//!
//! Severity and display names are keyed by action alone. `create` and
//! `destroy` exist in several categories and resolve to a single entry.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use crate::types::Severity;

pub const CONTAINER_ACTIONS: &[&str] = &[
    "attach",
    "commit",
    "copy",
    "create",
    "destroy",
    "die",
    "exec_create",
    "exec_start",
    "export",
    "kill",
    "oom",
    "pause",
    "rename",
    "resize",
    "restart",
    "start",
    "stop",
    "top",
    "unpause",
    "update",
];

pub const IMAGE_ACTIONS: &[&str] = &["delete", "import", "pull", "push", "tag", "untag"];

pub const VOLUME_ACTIONS: &[&str] = &["create", "mount", "unmount", "destroy"];

pub const NETWORK_ACTIONS: &[&str] = &["create", "connect", "disconnect", "destroy"];

/// (action, severity, display name)
const ACTIONS: &[(&str, Severity, &str)] = &[
    ("attach", Severity::Info, "Attached"),
    ("commit", Severity::Info, "Committed"),
    ("copy", Severity::Info, "Copied"),
    ("create", Severity::Info, "Created"),
    ("destroy", Severity::Warning, "Destroyed"),
    ("die", Severity::Warning, "Died"),
    ("exec_create", Severity::Info, "Exec Created"),
    ("exec_start", Severity::Info, "Exec Started"),
    ("export", Severity::Info, "Exported"),
    ("kill", Severity::Warning, "Killed"),
    ("oom", Severity::Warning, "Out of Memory"),
    ("pause", Severity::Info, "Paused"),
    ("rename", Severity::Info, "Renamed"),
    ("resize", Severity::Info, "Resized"),
    ("restart", Severity::Warning, "Restarted"),
    ("start", Severity::Info, "Started"),
    ("stop", Severity::Info, "Stopped"),
    ("top", Severity::Info, "Top"),
    ("unpause", Severity::Info, "Unpaused"),
    ("update", Severity::Info, "Updated"),
    ("delete", Severity::Info, "Deleted"),
    ("import", Severity::Info, "Imported"),
    ("pull", Severity::Info, "Pulled"),
    ("push", Severity::Info, "Pushed"),
    ("tag", Severity::Info, "Tagged"),
    ("untag", Severity::Info, "Untagged"),
    ("mount", Severity::Info, "Mounted"),
    ("unmount", Severity::Info, "Unmounted"),
    ("connect", Severity::Info, "Connected"),
    ("disconnect", Severity::Info, "Disconnected"),
];

#[derive(Debug, Clone, Copy)]
struct ActionInfo {
    severity: Severity,
    display_name: &'static str,
}

static TABLE: LazyLock<HashMap<&'static str, ActionInfo>> = LazyLock::new(|| {
    ACTIONS
        .iter()
        .map(|&(action, severity, display_name)| {
            (
                action,
                ActionInfo {
                    severity,
                    display_name,
                },
            )
        })
        .collect()
});

static IMAGE_SET: LazyLock<HashSet<&'static str>> =
    LazyLock::new(|| IMAGE_ACTIONS.iter().copied().collect());

/// Severity of a supported action, `None` when the action is not notifiable.
pub fn severity_of(action: &str) -> Option<Severity> {
    TABLE.get(action).map(|info| info.severity)
}

/// Past-tense label, falling back to the action itself.
pub fn display_name(action: &str) -> &str {
    TABLE.get(action).map_or(action, |info| info.display_name)
}

pub fn is_image_action(action: &str) -> bool {
    IMAGE_SET.contains(action)
}

/// Actions the runtime reports for `category`, `None` for an unknown category.
pub fn actions_of(category: &str) -> Option<&'static [&'static str]> {
    match category {
        "container" => Some(CONTAINER_ACTIONS),
        "image" => Some(IMAGE_ACTIONS),
        "volume" => Some(VOLUME_ACTIONS),
        "network" => Some(NETWORK_ACTIONS),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        ACTIONS, CONTAINER_ACTIONS, IMAGE_ACTIONS, NETWORK_ACTIONS, VOLUME_ACTIONS, actions_of,
        display_name, is_image_action, severity_of,
    };
    use crate::types::Severity;
    use std::collections::HashSet;

    #[test]
    fn every_category_action_is_classified() {
        for action in CONTAINER_ACTIONS
            .iter()
            .chain(IMAGE_ACTIONS)
            .chain(VOLUME_ACTIONS)
            .chain(NETWORK_ACTIONS)
        {
            assert!(severity_of(action).is_some(), "missing entry for {action}");
        }
    }

    #[test]
    fn table_has_no_duplicate_keys() {
        let keys: HashSet<_> = ACTIONS.iter().map(|(action, _, _)| *action).collect();
        assert_eq!(keys.len(), ACTIONS.len());
    }

    #[test]
    fn shared_actions_resolve_identically() {
        assert_eq!(severity_of("create"), Some(Severity::Info));
        assert_eq!(display_name("create"), "Created");
        assert_eq!(severity_of("destroy"), Some(Severity::Warning));
        assert_eq!(display_name("destroy"), "Destroyed");
    }

    #[test]
    fn warning_actions() {
        for action in ["destroy", "die", "kill", "oom", "restart"] {
            assert_eq!(severity_of(action), Some(Severity::Warning), "{action}");
        }
        assert_eq!(severity_of("start"), Some(Severity::Info));
    }

    #[test]
    fn unknown_action_is_not_classified() {
        assert_eq!(severity_of("frobnicate"), None);
        assert_eq!(display_name("frobnicate"), "frobnicate");
    }

    #[test]
    fn image_membership() {
        assert!(is_image_action("untag"));
        assert!(is_image_action("pull"));
        assert!(!is_image_action("create"));
        assert!(!is_image_action("die"));
    }

    #[test]
    fn categories_map_to_their_action_lists() {
        assert_eq!(actions_of("image"), Some(IMAGE_ACTIONS));
        assert!(actions_of("volume").is_some_and(|actions| actions.contains(&"mount")));
        assert!(actions_of("network").is_some_and(|actions| !actions.contains(&"mount")));
        assert_eq!(actions_of("plugin"), None);
    }
}
