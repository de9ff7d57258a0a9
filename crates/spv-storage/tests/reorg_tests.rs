//! Chain reorganisation scenarios: height deletion across collections

use spv_primitives::{Uint168, Uint256};
use spv_storage::{DataStore, HeaderStore, Headers, StorageError, StoreConfig};
use spv_types::{Header, QueItem, Tx};
use tempfile::TempDir;

const REORG_HEIGHT: u32 = 100;

fn create_temp_store() -> (DataStore, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let store = DataStore::open_with_config(temp_dir.path(), StoreConfig::for_testing()).unwrap();
    (store, temp_dir)
}

struct Fixture {
    txs: Vec<Tx>,
    owner: Uint168,
    item: QueItem,
}

/// Two txs with one outpoint each and one queue item, all at `REORG_HEIGHT`
fn populate(store: &DataStore) -> Fixture {
    let txs = vec![
        Tx::new(Uint256::from_bytes([0x11; 32]), REORG_HEIGHT, 1, vec![1]),
        Tx::new(Uint256::from_bytes([0x22; 32]), REORG_HEIGHT, 2, vec![2]),
    ];
    let owner = Uint168::from_bytes([0x21; 21]);
    let item = QueItem::new(Uint256::from_bytes([0x33; 32]), txs[0].hash, REORG_HEIGHT);

    let mut batch = store.batch();
    for tx in &txs {
        batch.txs().put(tx).unwrap();
        batch.ops().put(&tx.outpoint(0), &owner).unwrap();
    }
    batch.que().put(&item).unwrap();
    batch.commit().unwrap();

    Fixture { txs, owner, item }
}

fn assert_all_present(store: &DataStore, fixture: &Fixture) {
    for tx in &fixture.txs {
        assert_eq!(&store.txs().get(&tx.hash).unwrap(), tx);
        assert_eq!(
            store.ops().have_op(&tx.outpoint(0)).unwrap(),
            Some(fixture.owner)
        );
    }
    assert_eq!(store.que().get_all().unwrap(), vec![fixture.item.clone()]);
}

fn header_chain(len: u32) -> Vec<Header> {
    let mut chain: Vec<Header> = Vec::new();
    for height in (REORG_HEIGHT + 1 - len)..=REORG_HEIGHT {
        let previous = chain.last().map(|h| h.hash).unwrap_or(Uint256::ZERO);
        let mut hash = [0u8; 32];
        hash[..4].copy_from_slice(&height.to_be_bytes());
        hash[31] = 0xee;
        chain.push(Header::new(Uint256::from_bytes(hash), previous, height, height, vec![]));
    }
    chain
}

// =============================================================================
// Height deletion
// =============================================================================

#[test]
fn test_del_all_commit_removes_everything_at_height() {
    let (store, _temp) = create_temp_store();
    let fixture = populate(&store);
    let survivor = Tx::new(Uint256::from_bytes([0x44; 32]), REORG_HEIGHT - 1, 0, vec![]);
    store.txs().put(&survivor).unwrap();
    store.ops().put(&survivor.outpoint(0), &fixture.owner).unwrap();

    let mut batch = store.batch();
    let staged = batch.del_all(REORG_HEIGHT).unwrap();
    assert_eq!(staged, 5);

    // still visible until commit
    assert_all_present(&store, &fixture);
    batch.commit().unwrap();

    for tx in &fixture.txs {
        assert!(store.txs().get(&tx.hash).unwrap_err().is_not_found());
        assert_eq!(store.ops().have_op(&tx.outpoint(0)).unwrap(), None);
    }
    assert!(store.que().get_all().unwrap().is_empty());
    assert!(store.txs().get_ids(REORG_HEIGHT).unwrap().is_empty());

    assert_eq!(store.txs().get(&survivor.hash).unwrap(), survivor);
    assert_eq!(store.ops().get_all().unwrap(), vec![survivor.outpoint(0)]);
    assert_eq!(store.metrics().height_deletions(), 1);
}

#[test]
fn test_failed_commit_leaves_everything() {
    let (store, _temp) = create_temp_store();
    let fixture = populate(&store);

    let mut batch = store.batch();
    batch.del_all(REORG_HEIGHT).unwrap();

    store.database().close();
    let result = batch.commit();
    assert!(matches!(result, Err(StorageError::NotOpen)));
    assert_eq!(store.metrics().failed_commits(), 1);
    assert_eq!(store.metrics().height_deletions(), 0);

    store
        .database()
        .open_with_config(&StoreConfig::for_testing())
        .unwrap();
    assert_all_present(&store, &fixture);
}

#[test]
fn test_dropped_batch_leaves_everything() {
    let (store, _temp) = create_temp_store();
    let fixture = populate(&store);
    {
        let mut batch = store.batch();
        batch.del_all(REORG_HEIGHT).unwrap();
    }
    assert_all_present(&store, &fixture);
    assert_eq!(store.metrics().height_deletions(), 0);
}

#[test]
fn test_del_all_failure_applies_nothing() {
    let (store, _temp) = create_temp_store();
    let fixture = populate(&store);
    let extra = Tx::new(Uint256::from_bytes([0x55; 32]), REORG_HEIGHT + 1, 0, vec![]);

    {
        let mut batch = store.batch();
        batch.txs().put(&extra).unwrap();
        batch.ops().del(&fixture.txs[1].outpoint(0)).unwrap();

        store.database().close();
        assert!(matches!(
            batch.del_all(REORG_HEIGHT),
            Err(StorageError::NotOpen)
        ));
    }

    store
        .database()
        .open_with_config(&StoreConfig::for_testing())
        .unwrap();
    assert_all_present(&store, &fixture);
    assert!(store.txs().get(&extra.hash).unwrap_err().is_not_found());
    assert_eq!(store.metrics().height_deletions(), 0);
}

// =============================================================================
// Rewrites inside one batch
// =============================================================================

#[test]
fn test_reput_in_batch_moves_height() {
    let (store, _temp) = create_temp_store();
    let at_old = Tx::new(Uint256::from_bytes([0x66; 32]), REORG_HEIGHT, 0, vec![6]);
    let at_new = Tx::new(at_old.hash, REORG_HEIGHT + 1, 0, vec![6]);

    let mut batch = store.batch();
    batch.txs().put(&at_old).unwrap();
    batch.txs().put(&at_new).unwrap();
    batch.commit().unwrap();

    assert!(store.txs().get_ids(REORG_HEIGHT).unwrap().is_empty());
    assert_eq!(store.txs().get_ids(REORG_HEIGHT + 1).unwrap(), vec![at_new.hash]);
    assert_eq!(store.txs().get_all().unwrap(), vec![at_new.clone()]);

    // removing the old height must not orphan the new record
    let mut batch = store.batch();
    assert_eq!(batch.del_all(REORG_HEIGHT).unwrap(), 0);
    batch.commit().unwrap();
    assert_eq!(store.txs().get(&at_new.hash).unwrap(), at_new);
}

#[test]
fn test_put_then_del_in_batch() {
    let (store, _temp) = create_temp_store();
    let tx = Tx::new(Uint256::from_bytes([0x77; 32]), REORG_HEIGHT, 0, vec![]);
    let item = QueItem::new(Uint256::from_bytes([0x78; 32]), tx.hash, REORG_HEIGHT);

    let mut batch = store.batch();
    batch.txs().put(&tx).unwrap();
    batch.que().put(&item).unwrap();
    assert!(batch.txs().del(&tx.hash).unwrap());
    assert!(batch.que().del(&item.notify_id, &item.tx_id).unwrap());
    batch.commit().unwrap();

    assert!(store.txs().get(&tx.hash).unwrap_err().is_not_found());
    assert!(store.txs().get_ids(REORG_HEIGHT).unwrap().is_empty());
    assert_eq!(store.que().get(&item.notify_id, &item.tx_id).unwrap(), None);
    assert!(store.que().get_all().unwrap().is_empty());
}

#[test]
fn test_que_height_change_in_batch() {
    let (store, _temp) = create_temp_store();
    let mut item = QueItem::new(Uint256::from_bytes([0x88; 32]), Uint256::ZERO, REORG_HEIGHT);

    let mut batch = store.batch();
    batch.que().put(&item).unwrap();
    item.height = REORG_HEIGHT + 1;
    batch.que().put(&item).unwrap();
    batch.commit().unwrap();

    let mut batch = store.batch();
    assert_eq!(batch.del_all(REORG_HEIGHT).unwrap(), 0);
    batch.commit().unwrap();
    assert_eq!(store.que().get_all().unwrap(), vec![item]);
}

#[test]
fn test_del_all_on_empty_height() {
    let (store, _temp) = create_temp_store();
    let fixture = populate(&store);

    let mut batch = store.batch();
    assert_eq!(batch.del_all(REORG_HEIGHT + 1).unwrap(), 0);
    assert!(batch.is_empty());
    batch.commit().unwrap();
    assert_all_present(&store, &fixture);
}

// =============================================================================
// Headers share the batch
// =============================================================================

#[test]
fn test_header_rollback_commits_with_data() {
    let (store, _temp) = create_temp_store();
    let fixture = populate(&store);
    let chain = header_chain(3);
    for header in &chain {
        store.headers().put(header, true).unwrap();
    }

    let mut batch = store.batch();
    batch.del_all(REORG_HEIGHT).unwrap();
    let new_best = store
        .headers()
        .stage_rollback(REORG_HEIGHT, batch.naked_batch())
        .unwrap();
    assert_eq!(new_best.as_ref(), Some(&chain[1]));

    // nothing applied yet
    assert_eq!(store.headers().get_best().unwrap(), chain[2]);
    assert_all_present(&store, &fixture);

    batch.commit().unwrap();

    assert_eq!(store.headers().get_best().unwrap(), chain[1]);
    assert!(store
        .headers()
        .get_by_height(REORG_HEIGHT)
        .unwrap_err()
        .is_not_found());
    assert!(store.txs().get_ids(REORG_HEIGHT).unwrap().is_empty());
    assert!(store.que().get_all().unwrap().is_empty());
}

#[test]
fn test_header_rollback_discarded_with_batch() {
    let (store, _temp) = create_temp_store();
    let chain = header_chain(2);
    for header in &chain {
        store.headers().put(header, true).unwrap();
    }

    let mut batch = store.batch();
    let mut replacement = chain[1].clone();
    replacement.hash = Uint256::from_bytes([0x99; 32]);
    store
        .headers()
        .stage_rollback(REORG_HEIGHT, batch.naked_batch())
        .unwrap();
    store
        .headers()
        .stage_put(&replacement, true, batch.naked_batch());
    batch.rollback();

    assert_eq!(store.headers().get_best().unwrap(), chain[1]);
    assert!(store
        .headers()
        .get(&replacement.hash)
        .unwrap_err()
        .is_not_found());
}
