use std::str;

use fjall::{Slice, UserKey};

/// Membership index key: `collection IRI \0 member IRI`.
#[derive(Clone)]
pub(super) struct MemberKey(Slice);

impl MemberKey {
    pub(super) fn new(collection: &str, member: &str) -> MemberKey {
        let mut key = vec![];
        key.extend_from_slice(collection.as_bytes());
        key.push(0);
        key.extend_from_slice(member.as_bytes());
        MemberKey(key.into())
    }
    /// Scan prefix matching every member of `collection` and nothing else.
    pub(super) fn prefix(collection: &str) -> Vec<u8> {
        let mut prefix = collection.as_bytes().to_vec();
        prefix.push(0);
        prefix
    }
    pub(super) fn member(&self) -> Option<&str> {
        let mut parts = self.0.splitn(2, |&b| b == 0);
        parts.next()?;
        str::from_utf8(parts.next()?).ok()
    }
}

impl From<MemberKey> for UserKey {
    fn from(value: MemberKey) -> Self {
        value.0
    }
}

impl AsRef<[u8]> for MemberKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<&[u8]> for MemberKey {
    fn from(value: &[u8]) -> Self {
        MemberKey(Slice::new(value))
    }
}

#[cfg(test)]
mod tests {
    use super::MemberKey;

    #[test]
    fn split_member() {
        let key = MemberKey::new("http://local/widgets", "http://local/widgets/1");
        assert_eq!(key.member(), Some("http://local/widgets/1"));
        assert!(key.as_ref().starts_with(&MemberKey::prefix("http://local/widgets")));
        assert!(!key.as_ref().starts_with(&MemberKey::prefix("http://local/widget")));
    }

    #[test]
    fn malformed_key() {
        let key = MemberKey::from(&b"no-separator"[..]);
        assert_eq!(key.member(), None);
    }
}
