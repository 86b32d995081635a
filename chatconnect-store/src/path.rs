use std::fmt::{Display, Formatter};

/// A slash-separated path to a collection of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

/// A slash-separated path to a single document.
///
/// A document path is always a collection path with one trailing id segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentPath(String);

impl CollectionPath {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Returns the path of a document directly inside this collection.
    pub fn doc(&self, id: &str) -> DocumentPath {
        DocumentPath(format!("{}/{}", self.0, id))
    }

    /// Returns true if the document is a direct child of this collection.
    ///
    /// Documents of nested subcollections are not children.
    pub fn contains(&self, doc: &DocumentPath) -> bool {
        doc.0
            .strip_prefix(&self.0)
            .and_then(|rest| rest.strip_prefix('/'))
            .map(|id| !id.is_empty() && !id.contains('/'))
            .unwrap_or(false)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl DocumentPath {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The final segment of the path, identifying the document inside its collection.
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The collection this document lives in.
    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((head, _)) => CollectionPath(head.to_string()),
            None => CollectionPath(String::new()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Display for DocumentPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_doc_and_id() {
        let rooms = CollectionPath::new("artifacts/app/rooms");
        let room = rooms.doc("X7K2QT");

        assert_eq!(room.as_str(), "artifacts/app/rooms/X7K2QT");
        assert_eq!(room.id(), "X7K2QT");
        assert_eq!(room.parent(), rooms);
    }

    #[test]
    fn test_contains_direct_children_only() {
        let users = CollectionPath::new("artifacts/app/users");

        assert!(
            users.contains(&users.doc("A")),
            "direct child should be contained"
        );
        assert!(
            !users.contains(&DocumentPath::new("artifacts/app/users/A/profile/userProfile")),
            "subcollection document should not be contained"
        );
        assert!(
            !users.contains(&DocumentPath::new("artifacts/app/usersextra/A")),
            "sibling collection with a shared prefix should not be contained"
        );
        assert!(
            !users.contains(&DocumentPath::new("artifacts/app/rooms/A")),
            "unrelated document should not be contained"
        );
    }
}
