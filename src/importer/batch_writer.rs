// ==========================================
// 销售线索 CRM - 分块批量写入器
// ==========================================
// 职责: 按单批次上限切分写入操作，逐块顺序提交，累计写入数
// 红线: 任一块失败立即返回错误，调用方按"全有或全无"计数
// ==========================================

use crate::domain::types::RecordKind;
use crate::repository::document_store::{DocumentStore, WriteOp};
use crate::repository::error::RepositoryResult;
use tracing::debug;

pub struct BatchWriter<'a, S: DocumentStore + ?Sized> {
    store: &'a S,
    chunk_size: usize,
}

impl<'a, S: DocumentStore + ?Sized> BatchWriter<'a, S> {
    /// 块大小取 配置上限 与 存储上限 的较小值
    pub fn new(store: &'a S, configured_ceiling: usize) -> Self {
        let chunk_size = configured_ceiling.min(store.max_batch_ops()).max(1);
        Self { store, chunk_size }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// 顺序写入全部操作
    ///
    /// # 返回
    /// - Ok(usize): 各块写入数之和
    /// - Err: 首个失败块的错误（此前的块可能已提交）
    pub async fn write_all(&self, kind: RecordKind, ops: Vec<WriteOp>) -> RepositoryResult<usize> {
        let total = ops.len();
        let mut written = 0;
        let mut remaining = ops;
        let mut chunk_index = 0;

        while !remaining.is_empty() {
            let rest = remaining.split_off(self.chunk_size.min(remaining.len()));
            let chunk_len = remaining.len();

            written += self.store.batch_write(kind, remaining).await?;
            chunk_index += 1;
            debug!(
                kind = %kind,
                chunk = chunk_index,
                chunk_len = chunk_len,
                written = written,
                total = total,
                "批次写入完成"
            );

            remaining = rest;
        }

        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::document_store::StoredDocument;
    use crate::repository::error::RepositoryError;
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct RecordingStore {
        max_ops: usize,
        fail_on_call: Option<usize>,
        calls: Mutex<Vec<usize>>,
    }

    impl RecordingStore {
        fn new(max_ops: usize) -> Self {
            Self {
                max_ops,
                fail_on_call: None,
                calls: Mutex::new(Vec::new()),
            }
        }

        fn chunk_sizes(&self) -> Vec<usize> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl DocumentStore for RecordingStore {
        fn max_batch_ops(&self) -> usize {
            self.max_ops
        }

        async fn get_all(&self, _kind: RecordKind) -> RepositoryResult<Vec<StoredDocument>> {
            Ok(Vec::new())
        }

        async fn batch_write(&self, _kind: RecordKind, ops: Vec<WriteOp>) -> RepositoryResult<usize> {
            let mut calls = self.calls.lock().unwrap();
            calls.push(ops.len());
            if self.fail_on_call == Some(calls.len()) {
                return Err(RepositoryError::DatabaseTransactionError("写入中断".to_string()));
            }
            if ops.len() > self.max_ops {
                return Err(RepositoryError::BatchLimitExceeded {
                    len: ops.len(),
                    max: self.max_ops,
                });
            }
            Ok(ops.len())
        }

        async fn get_or_create_many(
            &self,
            _kind: RecordKind,
            _names: Vec<String>,
        ) -> RepositoryResult<HashMap<String, String>> {
            Ok(HashMap::new())
        }

        async fn update_one(&self, _kind: RecordKind, _id: &str, _patch: Value) -> RepositoryResult<()> {
            Ok(())
        }
    }

    fn ops(n: usize) -> Vec<WriteOp> {
        (0..n)
            .map(|i| WriteOp {
                id: format!("L{}", i),
                data: json!({"name": format!("Lead {}", i)}),
            })
            .collect()
    }

    #[test]
    fn test_chunk_size_respects_both_ceilings() {
        let store = RecordingStore::new(500);
        assert_eq!(BatchWriter::new(&store, 200).chunk_size(), 200);
        assert_eq!(BatchWriter::new(&store, 1000).chunk_size(), 500);
        assert_eq!(BatchWriter::new(&store, 0).chunk_size(), 1);
    }

    #[tokio::test]
    async fn test_write_all_splits_into_ceil_chunks() {
        let store = RecordingStore::new(500);
        let written = BatchWriter::new(&store, 500)
            .write_all(RecordKind::Lead, ops(1201))
            .await
            .unwrap();

        assert_eq!(written, 1201);
        assert_eq!(store.chunk_sizes(), vec![500, 500, 201]);
    }

    #[tokio::test]
    async fn test_write_all_exact_multiple() {
        let store = RecordingStore::new(3);
        let written = BatchWriter::new(&store, 500)
            .write_all(RecordKind::Lead, ops(6))
            .await
            .unwrap();

        assert_eq!(written, 6);
        assert_eq!(store.chunk_sizes(), vec![3, 3]);
    }

    #[tokio::test]
    async fn test_write_all_empty_no_calls() {
        let store = RecordingStore::new(500);
        let written = BatchWriter::new(&store, 500)
            .write_all(RecordKind::Lead, Vec::new())
            .await
            .unwrap();

        assert_eq!(written, 0);
        assert!(store.chunk_sizes().is_empty());
    }

    #[tokio::test]
    async fn test_write_all_stops_on_failure() {
        let mut store = RecordingStore::new(2);
        store.fail_on_call = Some(2);

        let result = BatchWriter::new(&store, 500)
            .write_all(RecordKind::Lead, ops(5))
            .await;

        assert!(result.is_err());
        assert_eq!(store.chunk_sizes(), vec![2, 2]);
    }
}
