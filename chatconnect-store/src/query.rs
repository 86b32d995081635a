use serde_json::Value;

use crate::{CollectionPath, Document, Fields};

/// A filter over the documents of a single collection.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    /// Matches documents whose field equals the value.
    FieldEquals { field: String, value: Value },
    /// Matches documents whose array field contains the value.
    ArrayContains { field: String, value: Value },
}

/// A query over the direct documents of one collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: CollectionPath,
    pub filter: Filter,
}

impl Query {
    pub fn all(collection: CollectionPath) -> Self {
        Self {
            collection,
            filter: Filter::All,
        }
    }

    pub fn field_equals(collection: CollectionPath, field: &str, value: impl Into<Value>) -> Self {
        Self {
            collection,
            filter: Filter::FieldEquals {
                field: field.to_string(),
                value: value.into(),
            },
        }
    }

    pub fn array_contains(collection: CollectionPath, field: &str, value: impl Into<Value>) -> Self {
        Self {
            collection,
            filter: Filter::ArrayContains {
                field: field.to_string(),
                value: value.into(),
            },
        }
    }

    /// Returns true if the document belongs to this query's result set.
    pub fn matches(&self, document: &Document) -> bool {
        self.collection.contains(&document.path) && self.filter.matches(&document.fields)
    }
}

impl Filter {
    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Filter::All => true,
            Filter::FieldEquals { field, value } => fields.get(field) == Some(value),
            Filter::ArrayContains { field, value } => fields
                .get(field)
                .and_then(Value::as_array)
                .map(|items| items.contains(value))
                .unwrap_or(false),
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn fields(value: Value) -> Fields {
        match value {
            Value::Object(fields) => fields,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_field_equals() {
        let filter = Filter::FieldEquals {
            field: "username".to_string(),
            value: json!("alice"),
        };

        assert!(filter.matches(&fields(json!({ "username": "alice" }))));
        assert!(!filter.matches(&fields(json!({ "username": "bob" }))));
        assert!(!filter.matches(&fields(json!({ "email": "alice" }))));
    }

    #[test]
    fn test_array_contains() {
        let filter = Filter::ArrayContains {
            field: "users".to_string(),
            value: json!("A"),
        };

        assert!(filter.matches(&fields(json!({ "users": ["A", "B"] }))));
        assert!(!filter.matches(&fields(json!({ "users": ["B"] }))));
        assert!(
            !filter.matches(&fields(json!({ "users": "A" }))),
            "a non-array field should never match"
        );
    }
}
