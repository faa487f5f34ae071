//! Batched mutation intents against the form context.
//!
//! Fields do not write registration/unregistration state directly:
//! they enqueue [`Transaction`] intents, and the whole batch commits at
//! the next settle boundary in kind-precedence order. This is what makes
//! path reclamation safe: when one field releases a path and another
//! claims it in the same batch, the claim wins and the release is
//! dropped.

use crate::context::FormContext;
use formwork_state::Path;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Transaction kinds in commit-precedence order: lower commits first.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum TxnKind {
    /// Permanently remove a path and prune empty ancestors.
    Destroy = 0,
    /// Blank a path without pruning (the slot may be reclaimed).
    Unset = 1,
    /// Write a value (path migration target).
    Set = 2,
    /// Full field initialization: value, touched and disabled flags,
    /// and consumption of the pending initial for the path.
    Init = 3,
}

/// A single deferred mutation intent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// What to do at commit time.
    pub kind: TxnKind,
    /// The target path.
    pub path: Path,
    /// Value payload for `Set`/`Init`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    /// Touched flag to write alongside the value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub touched: Option<bool>,
    /// Disabled flag to write alongside the value.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

impl Transaction {
    /// Create a `Set` transaction.
    #[inline]
    pub fn set(path: Path, value: Value) -> Self {
        Self {
            kind: TxnKind::Set,
            path,
            value: Some(value),
            touched: None,
            disabled: None,
        }
    }

    /// Create an `Init` transaction. A `None` value falls back to the
    /// form's pending initial for the path at commit time.
    #[inline]
    pub fn init(path: Path, value: Option<Value>) -> Self {
        Self {
            kind: TxnKind::Init,
            path,
            value,
            touched: None,
            disabled: None,
        }
    }

    /// Create an `Unset` transaction.
    #[inline]
    pub fn unset(path: Path) -> Self {
        Self {
            kind: TxnKind::Unset,
            path,
            value: None,
            touched: None,
            disabled: None,
        }
    }

    /// Create a `Destroy` transaction.
    #[inline]
    pub fn destroy(path: Path) -> Self {
        Self {
            kind: TxnKind::Destroy,
            path,
            value: None,
            touched: None,
            disabled: None,
        }
    }

    /// Attach a touched flag (builder pattern).
    #[inline]
    pub fn with_touched(mut self, touched: bool) -> Self {
        self.touched = Some(touched);
        self
    }

    /// Attach a disabled flag (builder pattern).
    #[inline]
    pub fn with_disabled(mut self, disabled: bool) -> Self {
        self.disabled = Some(disabled);
        self
    }
}

/// Collects transactions per batch and commits them in kind order.
///
/// Batches are identified by a generation token. A flush carrying a
/// stale token is a no-op, which guards against a superseded batch
/// double-committing.
pub struct TransactionManager {
    pending: Mutex<Vec<Transaction>>,
    generation: AtomicU64,
}

impl TransactionManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Run an intent callback against the current context and enqueue
    /// the transaction it returns, if any. Returns the batch token the
    /// intent joined.
    pub fn transaction(
        &self,
        ctx: &FormContext,
        f: impl FnOnce(&FormContext) -> Option<Transaction>,
    ) -> u64 {
        if let Some(txn) = f(ctx) {
            self.enqueue(txn)
        } else {
            self.batch_token()
        }
    }

    /// Enqueue a transaction into the current batch.
    ///
    /// The batch is a set: an identical intent enqueued twice in the
    /// same batch is stored once.
    pub fn enqueue(&self, txn: Transaction) -> u64 {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        if !pending.contains(&txn) {
            pending.push(txn);
        }
        self.generation.load(Ordering::SeqCst)
    }

    /// The token of the batch currently collecting.
    pub fn batch_token(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Number of intents waiting in the current batch.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Commit the current batch and start a new one.
    pub fn flush(&self, ctx: &FormContext) {
        let batch = {
            let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            self.generation.fetch_add(1, Ordering::SeqCst);
            std::mem::take(&mut *pending)
        };
        commit_batch(ctx, batch);
    }

    /// Commit the current batch only if `token` still identifies it.
    ///
    /// Returns false (no-op) for a stale token.
    pub fn flush_if(&self, token: u64, ctx: &FormContext) -> bool {
        {
            let pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
            if self.generation.load(Ordering::SeqCst) != token {
                return false;
            }
            drop(pending);
        }
        self.flush(ctx);
        true
    }
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Dedup, normalize, sort, and commit one batch.
fn commit_batch(ctx: &FormContext, mut batch: Vec<Transaction>) {
    if batch.is_empty() {
        return;
    }

    // 1. Dedup: a release for a path that is also claimed in this batch
    //    is dropped; later-arriving ownership wins.
    let claimed: HashSet<Path> = batch
        .iter()
        .filter(|t| matches!(t.kind, TxnKind::Set | TxnKind::Init))
        .map(|t| t.path.clone())
        .collect();
    batch.retain(|t| {
        !(matches!(t.kind, TxnKind::Unset | TxnKind::Destroy) && claimed.contains(&t.path))
    });

    // 2. Normalize: a surviving unset is an abandonment, same as destroy.
    for txn in &mut batch {
        if txn.kind == TxnKind::Unset {
            txn.kind = TxnKind::Destroy;
        }
    }

    // 3. Releases before claims, plain sets before full initialization.
    batch.sort_by_key(|t| t.kind);

    // 4. Commit.
    for txn in batch {
        commit_one(ctx, txn);
    }
}

fn commit_one(ctx: &FormContext, txn: Transaction) {
    match txn.kind {
        TxnKind::Destroy => ctx.destroy_path(&txn.path),
        TxnKind::Unset => ctx.unset_path(&txn.path),
        TxnKind::Set => {
            ctx.set_field_value(&txn.path, txn.value.unwrap_or(Value::Null));
            if let Some(touched) = txn.touched {
                ctx.set_field_touched(&txn.path, touched);
            }
            if let Some(disabled) = txn.disabled {
                ctx.set_field_disabled(&txn.path, disabled);
            }
        }
        TxnKind::Init => {
            // The pending initial for this path is consumed either way,
            // so a later field claiming the same path never inherits a
            // stale snapshot.
            let snapshot = ctx.consume_initial(&txn.path);
            let effective = txn.value.or(snapshot).unwrap_or(Value::Null);
            ctx.set_field_value(&txn.path, effective);
            ctx.set_field_touched(&txn.path, txn.touched.unwrap_or(false));
            ctx.set_field_disabled(&txn.path, txn.disabled.unwrap_or(false));
        }
    }
}
