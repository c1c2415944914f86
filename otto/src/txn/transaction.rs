//! TXNPRINT rendering, grounded on `transaction.go`'s `String()` method.

use crate::txn::registry::TransactionEntry;
use crate::txn::txid::TxId;

/// Renders a transaction's bookkeeping the way the TXNPRINT command reports
/// it: id, mode, and the keys it touched.
pub fn describe(tx: TxId, entry: &TransactionEntry) -> String {
    let mode = if entry.read_only { "read-only" } else { "read-write" };
    let inserted: Vec<&str> = entry.inserted.iter().map(|(k, _)| k.as_str()).collect();
    let expired: Vec<&str> = entry.expired.iter().map(|(k, _)| k.as_str()).collect();
    format!(
        "txn {tx} ({mode}): inserted=[{}] expired=[{}]",
        inserted.join(", "),
        expired.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn describe_lists_touched_keys() {
        let mut entry = TransactionEntry::default();
        entry.inserted.push(("a".to_string(), 0));
        entry.expired.push(("b".to_string(), 1));
        let out = describe(9, &entry);
        assert!(out.contains("txn 9"));
        assert!(out.contains("inserted=[a]"));
        assert!(out.contains("expired=[b]"));
    }
}
