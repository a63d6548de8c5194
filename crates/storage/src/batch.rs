//! Staged write batches
//!
//! A `WriteBatch` collects mutations that an engine applies as one unit:
//! either every operation becomes visible or none does.

/// A single staged mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite a value
    Put {
        /// Key bytes
        key: Vec<u8>,
        /// Value bytes
        value: Vec<u8>,
    },

    /// Remove a key (absent keys are ignored)
    Delete {
        /// Key bytes
        key: Vec<u8>,
    },
}

impl BatchOp {
    /// Key this operation touches
    pub fn key(&self) -> &[u8] {
        match self {
            BatchOp::Put { key, .. } | BatchOp::Delete { key } => key,
        }
    }
}

/// Ordered list of mutations applied atomically by a storage engine
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    /// Create an empty batch
    pub fn new() -> Self {
        WriteBatch { ops: Vec::new() }
    }

    /// Create an empty batch with room for `capacity` operations
    pub fn with_capacity(capacity: usize) -> Self {
        WriteBatch {
            ops: Vec::with_capacity(capacity),
        }
    }

    /// Stage a put
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Put {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    /// Stage a delete
    pub fn delete(&mut self, key: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(BatchOp::Delete { key: key.into() });
        self
    }

    /// Number of staged operations
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check if nothing is staged
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Iterate over staged operations in order
    pub fn iter(&self) -> std::slice::Iter<'_, BatchOp> {
        self.ops.iter()
    }
}

impl IntoIterator for WriteBatch {
    type Item = BatchOp;
    type IntoIter = std::vec::IntoIter<BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl<'a> IntoIterator for &'a WriteBatch {
    type Item = &'a BatchOp;
    type IntoIter = std::slice::Iter<'a, BatchOp>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_preserves_order() {
        let mut batch = WriteBatch::new();
        batch.put("a", "1").delete("b").put("a", "2");

        assert_eq!(batch.len(), 3);
        let keys: Vec<&[u8]> = batch.iter().map(|op| op.key()).collect();
        assert_eq!(keys, vec![&b"a"[..], &b"b"[..], &b"a"[..]]);
        assert_eq!(
            batch.into_iter().last(),
            Some(BatchOp::Put {
                key: b"a".to_vec(),
                value: b"2".to_vec()
            })
        );
    }

    #[test]
    fn test_empty_batch() {
        let batch = WriteBatch::with_capacity(8);
        assert!(batch.is_empty());
        assert_eq!(batch.len(), 0);
    }
}
