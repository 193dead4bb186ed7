//! Token resolution for `/setguild` and `/setchannel`.
//!
//! A token is tried, in order, as a 1-based index into the cached list, as a
//! numeric platform id, and as a case-insensitive exact name. The first rule
//! that matches wins, so `"2"` picks the second entry even when some other
//! entity happens to have id 2.
//!
//! When nothing matches, the best fuzzy match (skim algorithm) is offered as a
//! suggestion.

use crate::domain::{ChannelRef, GuildRef, ServiceError, Snowflake};
use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;

/// Something that can be picked by index, id or name.
pub trait Named {
    fn id(&self) -> Snowflake;
    fn name(&self) -> &str;
}

impl Named for GuildRef {
    fn id(&self) -> Snowflake {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

impl Named for ChannelRef {
    fn id(&self) -> Snowflake {
        self.id
    }
    fn name(&self) -> &str {
        &self.name
    }
}

/// Resolves `token` against `items`.
///
/// # Errors
///
/// [`ServiceError::NotFound`] with an optional fuzzy suggestion when no rule
/// matches.
///
/// # Example
///
/// ```rust
/// use chatbridge::domain::GuildRef;
/// use chatbridge::service::resolve::resolve;
///
/// let guilds = vec![
///     GuildRef { id: 2, name: "Two".into() },
///     GuildRef { id: 77, name: "Lounge".into() },
/// ];
/// assert_eq!(resolve(&guilds, "2", "Guild").unwrap().name, "Lounge");
/// assert_eq!(resolve(&guilds, "lounge", "Guild").unwrap().id, 77);
/// ```
pub fn resolve<'a, T: Named>(items: &'a [T], token: &str, what: &'static str) -> Result<&'a T, ServiceError> {
    let token = token.trim().trim_start_matches('#');

    if let Ok(number) = token.parse::<u64>() {
        let by_index = usize::try_from(number)
            .ok()
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| items.get(i));
        if let Some(item) = by_index {
            tracing::debug!(token, what, "resolved by index");
            return Ok(item);
        }
        if let Some(item) = items.iter().find(|item| item.id() == number) {
            tracing::debug!(token, what, "resolved by id");
            return Ok(item);
        }
    }

    let lowered = token.to_lowercase();
    if let Some(item) = items.iter().find(|item| item.name().to_lowercase() == lowered) {
        tracing::debug!(token, what, "resolved by name");
        return Ok(item);
    }

    Err(ServiceError::NotFound {
        what,
        token: token.to_string(),
        suggestion: suggest(items, token),
    })
}

/// Best fuzzy match for `token` among the item names.
#[must_use]
pub fn suggest<T: Named>(items: &[T], token: &str) -> Option<String> {
    if token.is_empty() {
        return None;
    }
    let matcher = SkimMatcherV2::default().ignore_case();
    items
        .iter()
        .filter_map(|item| {
            matcher
                .fuzzy_match(item.name(), token)
                .map(|score| (score, item.name()))
        })
        .max_by_key(|(score, _)| *score)
        .map(|(_, name)| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> Vec<ChannelRef> {
        vec![
            ChannelRef { id: 500, guild_id: 1, name: "general".to_string() },
            ChannelRef { id: 1, guild_id: 1, name: "Announcements".to_string() },
            ChannelRef { id: 900, guild_id: 1, name: "dev-chat".to_string() },
        ]
    }

    #[test]
    fn test_index_beats_id() {
        let items = channels();
        // "1" is both index 1 (general) and the id of Announcements.
        assert_eq!(resolve(&items, "1", "Channel").unwrap().name, "general");
    }

    #[test]
    fn test_id_when_index_out_of_range() {
        let items = channels();
        assert_eq!(resolve(&items, "900", "Channel").unwrap().name, "dev-chat");
    }

    #[test]
    fn test_case_insensitive_name() {
        let items = channels();
        assert_eq!(resolve(&items, "ANNOUNCEMENTS", "Channel").unwrap().id, 1);
        assert_eq!(resolve(&items, "#general", "Channel").unwrap().id, 500);
    }

    #[test]
    fn test_zero_is_not_an_index() {
        let items = channels();
        let err = resolve(&items, "0", "Channel").unwrap_err();
        assert!(matches!(err, ServiceError::NotFound { .. }));
    }

    #[test]
    fn test_not_found_suggests_closest_name() {
        let items = channels();
        match resolve(&items, "devchat", "Channel") {
            Err(ServiceError::NotFound { suggestion, what, .. }) => {
                assert_eq!(what, "Channel");
                assert_eq!(suggestion.as_deref(), Some("dev-chat"));
            }
            other => panic!("expected NotFound, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_list() {
        let items: Vec<GuildRef> = vec![];
        assert!(resolve(&items, "anything", "Guild").is_err());
    }
}
