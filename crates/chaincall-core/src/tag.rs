//! Caller-chosen correlation keys for batched calls.
//!
//! A [`Tag`] is a primitive, an ordered list of primitives, or a keyed record
//! of primitives. Tags are stored under their canonical [`TagKey`]: the JSON
//! text of the tag with record keys sorted. Two tags that are structurally
//! equal therefore land in the same slot, however they were constructed.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A single tag primitive.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    Bool(bool),
    Int(i64),
    UInt(u64),
    Str(String),
}

/// A correlation key supplied by the caller (or generated).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Tag {
    Value(TagValue),
    List(Vec<TagValue>),
    Record(BTreeMap<String, TagValue>),
}

/// Canonical string form of a [`Tag`], used as the storage key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagKey(String);

impl TagKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Tag {
    /// A fresh, collision-free tag: `tag:<unix-millis>:<uuid-v4>`.
    pub fn generate() -> Self {
        Tag::Value(TagValue::Str(format!(
            "tag:{}:{}",
            chrono::Utc::now().timestamp_millis(),
            uuid::Uuid::new_v4()
        )))
    }

    /// Canonical storage key.
    ///
    /// Integers of any signedness normalize to their decimal text, so `1i32`
    /// and `1u64` collide while the string `"1"` does not.
    pub fn normalize(&self) -> TagKey {
        let canonical = match self {
            Tag::Value(v) => canonical_value(v),
            Tag::List(items) => {
                let parts: Vec<String> = items.iter().map(canonical_value).collect();
                format!("[{}]", parts.join(","))
            }
            Tag::Record(fields) => {
                // BTreeMap iterates in key order, which fixes the layout.
                let parts: Vec<String> = fields
                    .iter()
                    .map(|(k, v)| format!("{}:{}", quote(k), canonical_value(v)))
                    .collect();
                format!("{{{}}}", parts.join(","))
            }
        };
        TagKey(canonical)
    }

    /// Build a record tag from `(key, value)` pairs.
    pub fn record<K, V, I>(fields: I) -> Self
    where
        K: Into<String>,
        V: Into<TagValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        Tag::Record(
            fields
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

fn canonical_value(v: &TagValue) -> String {
    match v {
        TagValue::Bool(b) => b.to_string(),
        TagValue::Int(i) => i.to_string(),
        TagValue::UInt(u) => u.to_string(),
        TagValue::Str(s) => quote(s),
    }
}

fn quote(s: &str) -> String {
    // serde_json escaping never fails for a plain string.
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{s}\""))
}

impl From<TagValue> for Tag {
    fn from(v: TagValue) -> Self {
        Tag::Value(v)
    }
}

impl From<&Tag> for TagKey {
    fn from(tag: &Tag) -> Self {
        tag.normalize()
    }
}

impl From<Tag> for TagKey {
    fn from(tag: Tag) -> Self {
        tag.normalize()
    }
}

impl From<&TagKey> for TagKey {
    fn from(key: &TagKey) -> Self {
        key.clone()
    }
}

impl From<&str> for TagKey {
    fn from(v: &str) -> Self {
        Tag::from(v).normalize()
    }
}

impl From<String> for TagKey {
    fn from(v: String) -> Self {
        Tag::from(v).normalize()
    }
}

macro_rules! signed_tag_value {
    ($($t:ty),*) => {$(
        impl From<$t> for TagValue {
            fn from(v: $t) -> Self {
                TagValue::Int(v as i64)
            }
        }
        impl From<$t> for Tag {
            fn from(v: $t) -> Self {
                Tag::Value(v.into())
            }
        }
        impl From<$t> for TagKey {
            fn from(v: $t) -> Self {
                Tag::from(v).normalize()
            }
        }
    )*};
}

macro_rules! unsigned_tag_value {
    ($($t:ty),*) => {$(
        impl From<$t> for TagValue {
            fn from(v: $t) -> Self {
                TagValue::UInt(v as u64)
            }
        }
        impl From<$t> for Tag {
            fn from(v: $t) -> Self {
                Tag::Value(v.into())
            }
        }
        impl From<$t> for TagKey {
            fn from(v: $t) -> Self {
                Tag::from(v).normalize()
            }
        }
    )*};
}

signed_tag_value!(i8, i16, i32, i64, isize);
unsigned_tag_value!(u8, u16, u32, u64, usize);

impl From<bool> for TagValue {
    fn from(v: bool) -> Self {
        TagValue::Bool(v)
    }
}

impl From<&str> for TagValue {
    fn from(v: &str) -> Self {
        TagValue::Str(v.to_string())
    }
}

impl From<String> for TagValue {
    fn from(v: String) -> Self {
        TagValue::Str(v)
    }
}

impl From<bool> for Tag {
    fn from(v: bool) -> Self {
        Tag::Value(v.into())
    }
}

impl From<&str> for Tag {
    fn from(v: &str) -> Self {
        Tag::Value(v.into())
    }
}

impl From<String> for Tag {
    fn from(v: String) -> Self {
        Tag::Value(v.into())
    }
}

impl<T: Into<TagValue>> From<Vec<T>> for Tag {
    fn from(items: Vec<T>) -> Self {
        Tag::List(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<TagValue>, const N: usize> From<[T; N]> for Tag {
    fn from(items: [T; N]) -> Self {
        Tag::List(items.into_iter().map(Into::into).collect())
    }
}

impl<K: Into<String>, V: Into<TagValue>> From<BTreeMap<K, V>> for Tag {
    fn from(fields: BTreeMap<K, V>) -> Self {
        Tag::record(fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structurally_equal_records_share_a_key() {
        let a = Tag::record([("a", TagValue::from("x")), ("b", TagValue::from(1u64))]);
        let b = Tag::record([("b", TagValue::from(1i32)), ("a", TagValue::from("x"))]);
        assert_eq!(a.normalize(), b.normalize());
        assert_eq!(a.normalize().as_str(), r#"{"a":"x","b":1}"#);
    }

    #[test]
    fn strings_and_numbers_stay_distinct() {
        assert_ne!(Tag::from(1).normalize(), Tag::from("1").normalize());
        assert_eq!(Tag::from(1u8).normalize(), Tag::from(1i64).normalize());
    }

    #[test]
    fn list_order_matters() {
        assert_eq!(Tag::from([0, 0]).normalize().as_str(), "[0,0]");
        assert_ne!(
            Tag::from(vec![1, 2]).normalize(),
            Tag::from(vec![2, 1]).normalize()
        );
        assert_ne!(Tag::from([1]).normalize(), Tag::from(1).normalize());
    }

    #[test]
    fn large_integers_keep_full_precision() {
        let key = Tag::from(u64::MAX).normalize();
        assert_eq!(key.as_str(), "18446744073709551615");
    }

    #[test]
    fn generated_tags_are_unique() {
        let a = Tag::generate();
        let b = Tag::generate();
        assert_ne!(a.normalize(), b.normalize());
        assert!(a.normalize().as_str().starts_with("\"tag:"));
    }

    #[test]
    fn string_keys_are_escaped() {
        let key = Tag::from("a\"b").normalize();
        assert_eq!(key.as_str(), r#""a\"b""#);
    }
}
