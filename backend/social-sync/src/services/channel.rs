//! Deterministic addressing of two-party chat channels

use doc_store::CollectionPath;

use crate::domain::ChannelId;
use crate::error::{SyncError, SyncResult};

const JOINER: char = '_';

/// Canonical channel id for a pair of users.
///
/// Symmetric in its arguments: both ids are sorted and joined with `_`.
/// Ids containing `_` are rejected so distinct pairs never share a channel.
pub fn channel_id(a: &str, b: &str) -> SyncResult<ChannelId> {
    for id in [a, b] {
        if id.trim().is_empty() {
            return Err(SyncError::InvalidArgument(
                "participant id must not be empty".to_string(),
            ));
        }
        if let Some(reserved) = id.chars().find(|c| *c == '/' || *c == JOINER) {
            return Err(SyncError::InvalidArgument(format!(
                "participant id '{}' contains '{}'",
                id, reserved
            )));
        }
    }
    if a == b {
        return Err(SyncError::InvalidArgument(
            "a channel needs two distinct participants".to_string(),
        ));
    }

    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    Ok(ChannelId(format!("{}{}{}", first, JOINER, second)))
}

/// Message collection of a channel: `chats/{channel}/messages`
pub fn messages_collection(channel: &ChannelId) -> SyncResult<CollectionPath> {
    Ok(CollectionPath::new(format!("chats/{}/messages", channel))?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_id_is_symmetric() {
        let ab = channel_id("u1", "u2").unwrap();
        let ba = channel_id("u2", "u1").unwrap();
        assert_eq!(ab, ba);
        assert_eq!(ab.as_str(), "u1_u2");
    }

    #[test]
    fn test_channel_id_sorts_lexicographically() {
        assert_eq!(channel_id("zed", "amy").unwrap().as_str(), "amy_zed");
        assert_eq!(channel_id("u10", "u9").unwrap().as_str(), "u10_u9");
    }

    #[test]
    fn test_channel_id_rejects_invalid_pairs() {
        assert!(matches!(
            channel_id("u1", "u1"),
            Err(SyncError::InvalidArgument(_))
        ));
        assert!(channel_id("", "u1").is_err());
        assert!(channel_id("u1", " ").is_err());
        assert!(channel_id("u1", "a/b").is_err());
    }

    #[test]
    fn test_joiner_in_id_is_rejected() {
        // Would otherwise collide with channel_id("a", "b_c")
        assert!(matches!(
            channel_id("a_b", "c"),
            Err(SyncError::InvalidArgument(_))
        ));
        assert!(matches!(
            channel_id("a", "b_c"),
            Err(SyncError::InvalidArgument(_))
        ));
        assert!(channel_id("_", "c").is_err());
    }

    #[test]
    fn test_messages_collection_path() {
        let channel = channel_id("u2", "u1").unwrap();
        assert_eq!(
            messages_collection(&channel).unwrap().as_str(),
            "chats/u1_u2/messages"
        );
    }
}
