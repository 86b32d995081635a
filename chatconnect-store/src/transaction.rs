use crate::{Document, DocumentPath, Fields, Query, Result};

/// The operations a store implementation provides to a running transaction.
pub trait TransactionOps {
    fn get(&mut self, path: &DocumentPath) -> Result<Option<Document>>;
    fn query(&mut self, query: &Query) -> Result<Vec<Document>>;
    fn set(&mut self, path: &DocumentPath, fields: Fields);
    fn delete(&mut self, path: &DocumentPath);
}

/// A handle to an in-progress transaction.
///
/// Reads observe the state the transaction started from. Writes are staged
/// and become visible only once the transaction commits.
pub struct Transaction<'a> {
    ops: &'a mut dyn TransactionOps,
}

impl<'a> Transaction<'a> {
    pub fn new(ops: &'a mut dyn TransactionOps) -> Self {
        Self { ops }
    }

    /// Reads a single document, if it exists.
    pub fn get(&mut self, path: &DocumentPath) -> Result<Option<Document>> {
        self.ops.get(path)
    }

    /// Returns the documents matching a query.
    pub fn query(&mut self, query: &Query) -> Result<Vec<Document>> {
        self.ops.query(query)
    }

    /// Stages a create or overwrite of the document at the path.
    pub fn set(&mut self, path: &DocumentPath, fields: Fields) {
        self.ops.set(path, fields)
    }

    /// Stages a delete of the document at the path.
    pub fn delete(&mut self, path: &DocumentPath) {
        self.ops.delete(path)
    }
}
