use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Which half of the feed a notification lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    Unseen,
    Seen,
}

impl Partition {
    pub fn of(seen: bool) -> Self {
        if seen {
            Partition::Seen
        } else {
            Partition::Unseen
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sender {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub profile_pic: String,
}

/// Payload describing the object that triggered the notification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotificationDetails {
    pub notification_text: String,
    pub notification_image: String,
    pub entity_type: String,
    pub entity_id: String,
    pub header_id: String,
    pub entity: serde_json::Map<String, serde_json::Value>,
    pub content: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub sender: Sender,
    #[serde(default)]
    pub receiver_id: Option<String>,
    #[serde(default)]
    pub details: NotificationDetails,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub seen: bool,
}

/// Where activating a notification should take the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeepLink {
    Post(String),
    Profile(String),
}

impl Notification {
    pub fn partition(&self) -> Partition {
        Partition::of(self.seen)
    }

    pub fn display_text(&self) -> &str {
        if self.details.notification_text.is_empty() {
            &self.kind
        } else {
            &self.details.notification_text
        }
    }

    /// Feed entities link to their post (preferring `feedId` over the entity's own id),
    /// everything else links to the sender's profile.
    pub fn deep_link(&self) -> DeepLink {
        if self.details.entity_type == "feed" {
            let entity_id = self
                .details
                .entity
                .get("_id")
                .and_then(|v| v.as_str());
            if let Some(entity_id) = entity_id {
                let post_id = self
                    .details
                    .entity
                    .get("feedId")
                    .and_then(|v| v.as_str())
                    .unwrap_or(entity_id);
                return DeepLink::Post(post_id.to_string());
            }
        }
        DeepLink::Profile(self.sender.id.clone())
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    /// Build a notification whose timestamp orders by the trailing digit of `id`.
    pub fn notification(id: &str, seen: bool) -> Notification {
        let minute = id
            .chars()
            .filter_map(|c| c.to_digit(10))
            .last()
            .unwrap_or(0);
        Notification {
            id: id.to_string(),
            kind: "reaction".into(),
            sender: Sender {
                id: format!("user-{id}"),
                name: format!("User {id}"),
                profile_pic: String::new(),
            },
            receiver_id: None,
            details: NotificationDetails::default(),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 12, minute, 0).unwrap(),
            seen,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixtures::notification;
    use super::*;

    const WIRE_SAMPLE: &str = r#"{
        "_id": "n-1",
        "type": "comment",
        "sender": { "id": "u-9", "name": "Ada", "profilePic": "ada.png" },
        "receiverId": "u-1",
        "details": {
            "notificationText": "Ada commented on your post",
            "notificationImage": "",
            "entityType": "feed",
            "entityId": "c-3",
            "headerId": "h-1",
            "entity": { "_id": "c-3", "feedId": "p-42" },
            "content": "nice"
        },
        "timestamp": "2024-03-01T10:00:00.000Z",
        "seen": false
    }"#;

    #[test]
    fn test_deserializes_service_payload() {
        let n: Notification = serde_json::from_str(WIRE_SAMPLE).unwrap();
        assert_eq!(n.id, "n-1");
        assert_eq!(n.kind, "comment");
        assert_eq!(n.sender.profile_pic, "ada.png");
        assert_eq!(n.details.content.as_deref(), Some("nice"));
        assert_eq!(n.partition(), Partition::Unseen);
    }

    #[test]
    fn test_deep_link_prefers_feed_id() {
        let n: Notification = serde_json::from_str(WIRE_SAMPLE).unwrap();
        assert_eq!(n.deep_link(), DeepLink::Post("p-42".into()));
    }

    #[test]
    fn test_deep_link_falls_back_to_entity_id() {
        let mut n: Notification = serde_json::from_str(WIRE_SAMPLE).unwrap();
        n.details.entity.remove("feedId");
        assert_eq!(n.deep_link(), DeepLink::Post("c-3".into()));
    }

    #[test]
    fn test_deep_link_to_profile_for_other_entities() {
        let n = notification("a1", false);
        assert_eq!(n.deep_link(), DeepLink::Profile("user-a1".into()));
    }

    #[test]
    fn test_display_text_falls_back_to_kind() {
        let n = notification("a1", false);
        assert_eq!(n.display_text(), "reaction");
    }
}
