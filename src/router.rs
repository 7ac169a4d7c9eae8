//! The relevance predicate: should a given client receive a given
//! notification? Pure and synchronous — any data it needs (like group
//! membership) is fetched by the caller beforehand, so this stays
//! trivially unit-testable without a network.

use crate::models::{Client, Notification};

/// `client_group_names` is the caller-resolved set of ADO group display
/// names `client` belongs to (the second element of
/// [`crate::identity::Identity::groups`]'s return value); pass an empty
/// slice if group membership couldn't be resolved or the client has no
/// `ado_user_id`. Matching is case-insensitive, per ADO's own display-name
/// comparison semantics.
pub fn is_relevant(client: &Client, notification: &Notification, client_group_names: &[String]) -> bool {
    if !client.active {
        return false;
    }
    if !client.subscribes_to(&notification.event_type) {
        return false;
    }

    // Manual broadcasts carry no actor and target everyone subscribed.
    if notification.actor_id.is_none() && notification.mentions.is_empty() {
        return true;
    }

    // Never echo a notification back to the person who caused it, unless
    // they were explicitly mentioned (e.g. a PR author reviewing their own update).
    let is_actor = notification
        .actor_id
        .as_deref()
        .is_some_and(|id| id == client.ado_user_id && !client.ado_user_id.is_empty());
    let is_mentioned = notification.mentions.user_ids.iter().any(|id| id == &client.ado_user_id);
    if is_actor && !is_mentioned {
        return false;
    }

    // No mentions at all: broadcast to every other relevant subscriber.
    if notification.mentions.is_empty() {
        return true;
    }

    if is_mentioned {
        return true;
    }

    client_group_names
        .iter()
        .any(|g| notification.mentions.names.iter().any(|n| n.eq_ignore_ascii_case(g)))
}
