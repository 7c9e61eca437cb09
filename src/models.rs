use chrono::Utc;
use serde::{Deserialize, Serialize};

/// What the body of a message carries.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Kind { Text, Photo }

/// Chat message vs system info notice.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum Category { Message, Info }

/// One relayed message. Immutable once built; identity for
/// deduplication is the (ts, pseudo, content) triple.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub pseudo:   String,
    pub content:  String,        // text, or a data: URL for photos
    pub kind:     Kind,
    pub category: Category,
    pub ts:       i64,           // unix epoch millis
}

pub const SYSTEM_PSEUDO: &str = "system";

pub fn now_ms() -> i64 { Utc::now().timestamp_millis() }

pub fn now_iso() -> String { Utc::now().to_rfc3339() }

impl ChatMessage {
    pub fn text(pseudo: &str, content: &str) -> Self {
        Self {
            pseudo: pseudo.into(), content: content.into(),
            kind: Kind::Text, category: Category::Message, ts: now_ms(),
        }
    }

    pub fn photo(pseudo: &str, data_url: &str) -> Self {
        Self {
            pseudo: pseudo.into(), content: data_url.into(),
            kind: Kind::Photo, category: Category::Message, ts: now_ms(),
        }
    }

    /// System notice shown to other room members ("<pseudo> joined").
    pub fn info(content: String) -> Self {
        Self {
            pseudo: SYSTEM_PSEUDO.into(), content,
            kind: Kind::Text, category: Category::Info, ts: now_ms(),
        }
    }

    pub fn dedup_key(&self) -> (i64, &str, &str) {
        (self.ts, &self.pseudo, &self.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_field_names() {
        let m = ChatMessage { pseudo: "alice".into(), content: "hi".into(),
                              kind: Kind::Text, category: Category::Message, ts: 42 };
        let v = serde_json::to_value(&m).unwrap();
        assert_eq!(v["pseudo"], "alice");
        assert_eq!(v["kind"], "text");
        assert_eq!(v["category"], "MESSAGE");
        assert_eq!(v["ts"], 42);
    }

    #[test]
    fn dedup_key_is_the_triple() {
        let a = ChatMessage { pseudo: "a".into(), content: "x".into(),
                              kind: Kind::Text, category: Category::Message, ts: 1 };
        let mut b = a.clone();
        b.category = Category::Info;          // category is not part of identity
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
