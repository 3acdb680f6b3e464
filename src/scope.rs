//! Works out which entity an event is about.
//!
//! Runtime events carry either a container id or an image digest in `id`.
//! The only dependable hint is whether the `image` attribute repeats the id;
//! category membership and the `untag`/`delete` exception break the tie.

use crate::catalog::is_image_action;

const DIGEST_PREFIX: &str = "sha256:";
const SHORT_ID_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot determine container image for {action} event")]
pub struct Unresolved {
    pub action: String,
    /// Scope built so far, at most the host clause.
    pub partial: String,
}

/// Strip the digest marker untag/delete events put in front of the id.
pub fn normalize_id(id: &str) -> &str {
    match id.strip_prefix(DIGEST_PREFIX) {
        Some(rest) if !rest.is_empty() => rest,
        _ => id,
    }
}

pub fn short_id(id: &str) -> &str {
    id.char_indices()
        .nth(SHORT_ID_LEN)
        .map_or(id, |(end, _)| &id[..end])
}

/// Resolve the scope expression for one event.
///
/// # Errors
///
/// Returns [`Unresolved`] for an image event that has neither an id nor an
/// `image` attribute. The error keeps the partial scope so the caller can
/// still emit the notification.
pub fn resolve(
    machine_id: Option<&str>,
    actor_id: &str,
    image: Option<&str>,
    action: &str,
) -> std::result::Result<String, Unresolved> {
    let host = machine_id
        .filter(|id| !id.is_empty())
        .map(|id| format!("host.mac={id}"));
    let image = image.unwrap_or_default();
    let id = normalize_id(actor_id);

    let entity = if id.is_empty() {
        if is_image_action(action) && image.is_empty() {
            return Err(Unresolved {
                action: action.to_string(),
                partial: host.unwrap_or_default(),
            });
        }
        None
    } else {
        Some(entity_clause(id, image, action))
    };

    Ok(match (host, entity) {
        (Some(host), Some(entity)) => format!("{host} and {entity}"),
        (Some(host), None) => host,
        (None, Some(entity)) => entity,
        (None, None) => String::new(),
    })
}

fn entity_clause(id: &str, image: &str, action: &str) -> String {
    if image == id {
        format!("container.image={image}")
    } else if is_image_action(action) {
        if action == "untag" || action == "delete" {
            format!("container.id={}", short_id(id))
        } else if !image.is_empty() {
            format!("container.image={image}")
        } else {
            format!("container.image={id}")
        }
    } else {
        format!("container.id={}", short_id(id))
    }
}
