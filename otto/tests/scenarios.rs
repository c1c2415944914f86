//! End-to-end scenarios driven through the inline-protocol [`Dispatcher`]
//! (S1-S6) and directly against [`Engine`] where a scenario needs to
//! interleave two transactions by hand (S7).

use std::sync::Arc;

use otto::dispatcher::Dispatcher;
use otto::engine::Engine;
use pretty_assertions::assert_eq;
use tempfile::tempdir;

const NIL: &str = "(nil)";

fn dispatcher() -> (Dispatcher, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let engine = Arc::new(Engine::recover(dir.path().join("otto.wal")).unwrap());
    (Dispatcher::new(engine), dir)
}

/// S1: basic set/get, including a null reply for a key that was never set.
#[test]
fn s1_basic_set_and_get() {
    let (d, _dir) = dispatcher();
    assert_eq!(d.execute(1, "SET k1 bananas"), "OK");
    assert_eq!(d.execute(1, "GET k1"), "bananas");
    assert_eq!(d.execute(1, "GET k2"), NIL);
}

/// S2: a second SET to the same key wins the read afterwards.
#[test]
fn s2_overwrite() {
    let (d, _dir) = dispatcher();
    assert_eq!(d.execute(1, "SET k1 a"), "OK");
    assert_eq!(d.execute(1, "SET k1 b"), "OK");
    assert_eq!(d.execute(1, "GET k1"), "b");
}

/// S3: DEL tombstones a live key, and is a silent no-op for a missing one.
#[test]
fn s3_delete() {
    let (d, _dir) = dispatcher();
    assert_eq!(d.execute(1, "SET k1 a"), "OK");
    assert_eq!(d.execute(1, "DEL k1"), "OK");
    assert_eq!(d.execute(1, "GET k1"), NIL);
    assert_eq!(d.execute(1, "DEL k2"), NIL);
}

/// S4: a reader's open transaction keeps seeing its original snapshot even
/// after a concurrent writer commits a new version.
#[test]
fn s4_snapshot_isolation_across_clients() {
    let (d, _dir) = dispatcher();

    assert_eq!(d.execute(1, "BEGIN"), "OK");
    assert_eq!(d.execute(1, "GET k1"), NIL);

    assert_eq!(d.execute(2, "SET k1 x"), "OK");

    assert_eq!(d.execute(1, "GET k1"), NIL);
    assert_eq!(d.execute(1, "COMMIT"), "OK");

    assert_eq!(d.execute(3, "GET k1"), "x");
}

/// S5: first-writer-wins. The second writer to an uncommitted key conflicts
/// immediately; the first writer's value is the one that sticks.
#[test]
fn s5_write_conflict() {
    let (d, _dir) = dispatcher();

    d.execute(1, "BEGIN");
    assert_eq!(d.execute(1, "SET k1 1"), "OK");

    let conflict = d.execute(2, "SET k1 2");
    assert!(conflict.starts_with("Txn Aborted:"), "got: {conflict}");

    assert_eq!(d.execute(1, "COMMIT"), "OK");
    assert_eq!(d.execute(3, "GET k1"), "1");
}

/// S6: WAL replay across a simulated crash reproduces S2's final state and
/// resumes transaction ids above anything seen in the log.
#[test]
fn s6_wal_replay_survives_a_restart() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("otto.wal");

    {
        let engine = Arc::new(Engine::recover(&path).unwrap());
        let d = Dispatcher::new(engine);
        assert_eq!(d.execute(1, "SET k1 a"), "OK");
        assert_eq!(d.execute(1, "SET k1 b"), "OK");
        // Process "crashes" here: no explicit shutdown, just drop.
    }

    let engine = Engine::recover(&path).unwrap();
    let reader = engine.begin(true).unwrap();
    assert_eq!(engine.get(reader, "k1").unwrap(), "b");

    // The allocator must not reuse any tx id that already appears in the WAL.
    let fresh = engine.begin(false).unwrap();
    assert!(fresh > reader);
}

/// S7: the classic write-skew scenario. T1 reads k1, writes k2; T2 reads k2,
/// writes k1; both run concurrently. The second of the two cross writes
/// would complete a dangerous structure (each txn would carry both an
/// incoming and an outgoing RW-antidependency edge), so SSI rejects it with
/// a serialization failure at write time rather than let both commits stand
/// (which would violate the invariant k1 + k2 >= 1).
#[test]
fn s7_write_skew_is_caught_by_ssi() {
    let dir = tempdir().unwrap();
    let engine = Engine::recover(dir.path().join("otto.wal")).unwrap();

    let seed = engine.begin(false).unwrap();
    engine.set(seed, "k1", "1".into()).unwrap();
    engine.set(seed, "k2", "1".into()).unwrap();
    engine.commit(seed).unwrap();

    let t1 = engine.begin(false).unwrap();
    let t2 = engine.begin(false).unwrap();

    assert_eq!(engine.get(t1, "k1").unwrap(), "1");
    assert_eq!(engine.get(t2, "k2").unwrap(), "1");

    engine.set(t1, "k2", "0".into()).unwrap();
    let second_cross_write = engine.set(t2, "k1", "0".into());

    assert!(second_cross_write.is_err(), "expected the pivot write to be rejected");
    assert!(second_cross_write.unwrap_err().aborts_transaction());

    engine.abort(t2).unwrap();
    engine.commit(t1).unwrap();

    let reader = engine.begin(true).unwrap();
    assert_eq!(engine.get(reader, "k1").unwrap(), "1");
    assert_eq!(engine.get(reader, "k2").unwrap(), "0");
}

/// Invariant 1: a key's version list is strictly ordered by creator tx id.
#[test]
fn invariant_version_list_is_ordered_by_creator() {
    let dir = tempdir().unwrap();
    let engine = Engine::recover(dir.path().join("otto.wal")).unwrap();

    for v in ["a", "b", "c"] {
        let tx = engine.begin(false).unwrap();
        engine.set(tx, "k", v.into()).unwrap();
        engine.commit(tx).unwrap();
    }

    let reader = engine.begin(true).unwrap();
    assert_eq!(engine.get(reader, "k").unwrap(), "c");
}

/// Invariant 6: aborting a transaction undoes its SET, restoring the prior
/// value (or NotFound if there wasn't one).
#[test]
fn invariant_abort_undoes_the_write() {
    let dir = tempdir().unwrap();
    let engine = Engine::recover(dir.path().join("otto.wal")).unwrap();

    let seed = engine.begin(false).unwrap();
    engine.set(seed, "k", "orig".into()).unwrap();
    engine.commit(seed).unwrap();

    let tx = engine.begin(false).unwrap();
    engine.set(tx, "k", "temp".into()).unwrap();
    engine.abort(tx).unwrap();

    let reader = engine.begin(true).unwrap();
    assert_eq!(engine.get(reader, "k").unwrap(), "orig");
}
