//! Open/create behavior of the B+-tree index against real files.

use std::sync::Arc;

use leafline::buffer::BufferPoolManager;
use leafline::common::{Datatype, Error, Operator, RecordId};
use leafline::index::btree::{BTreeIndex, NodeLayout, MAX_LEAF_CAPACITY};
use leafline::relation::MemoryRelation;
use leafline::IndexConfig;
use tempfile::tempdir;

const ATTR: usize = 4;
const RECORD_LEN: usize = 16;

fn relation(name: &str, keys: impl IntoIterator<Item = i32>) -> MemoryRelation {
    let mut relation = MemoryRelation::new(name);
    for key in keys {
        relation.push_int(ATTR, key, RECORD_LEN);
    }
    relation
}

fn small_config(dir: &std::path::Path) -> IndexConfig {
    IndexConfig::default()
        .with_data_dir(dir)
        .with_layout(NodeLayout::new(4, 3).unwrap())
}

fn all_rids(index: &mut BTreeIndex) -> Vec<RecordId> {
    index
        .scan_range(i32::MIN, Operator::Gte, i32::MAX, Operator::Lte)
        .unwrap()
}

#[test]
fn test_create_bulk_loads_relation() {
    let dir = tempdir().unwrap();
    let bpm = Arc::new(BufferPoolManager::new(16));
    let rel = relation("emp", [30, 10, 20, 50, 40, 60, 70]);

    let mut index = BTreeIndex::open_or_create(
        bpm,
        &small_config(dir.path()),
        &rel,
        ATTR,
        Datatype::Integer,
    )
    .unwrap();

    assert_eq!(index.index_name(), "emp.4");
    assert_eq!(index.relation_name(), "emp");
    assert_eq!(index.attr_offset(), ATTR);
    assert_eq!(index.attr_type(), Datatype::Integer);

    let keys: Vec<i32> = index.leaf_chain().unwrap().concat();
    assert_eq!(keys, vec![10, 20, 30, 40, 50, 60, 70]);

    // Record ids come back in key order.
    let rids = all_rids(&mut index);
    let expected: Vec<RecordId> = [1, 2, 0, 4, 3, 5, 6]
        .into_iter()
        .map(|i| rel.record_id(i))
        .collect();
    assert_eq!(rids, expected);
}

#[test]
fn test_reopen_adopts_root_without_reloading() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let bpm = Arc::new(BufferPoolManager::new(16));

    let first_root = {
        let rel = relation("emp", 0..40);
        let index =
            BTreeIndex::open_or_create(Arc::clone(&bpm), &config, &rel, ATTR, Datatype::Integer)
                .unwrap();
        index.root_page_id()
    };

    // Same parameters, different records: the stored tree must win.
    let rel = relation("emp", 1000..1010);
    let mut index =
        BTreeIndex::open_or_create(Arc::clone(&bpm), &config, &rel, ATTR, Datatype::Integer)
            .unwrap();

    assert_eq!(index.root_page_id(), first_root);
    assert_eq!(all_rids(&mut index).len(), 40);
    assert!(index
        .scan_range(1000, Operator::Gte, 1010, Operator::Lt)
        .unwrap()
        .is_empty());
}

#[test]
fn test_reopen_in_fresh_pool_sees_grown_tree() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());

    let (root, height) = {
        let bpm = Arc::new(BufferPoolManager::new(8));
        let rel = relation("deep", (0..200).rev());
        let index = BTreeIndex::open_or_create(bpm, &config, &rel, ATTR, Datatype::Integer).unwrap();
        (index.root_page_id(), index.height().unwrap())
    };
    assert!(height >= 4);

    let bpm = Arc::new(BufferPoolManager::new(8));
    let mut index =
        BTreeIndex::open_or_create(bpm, &config, &MemoryRelation::new("deep"), ATTR, Datatype::Integer)
            .unwrap();

    assert_eq!(index.root_page_id(), root);
    assert_eq!(index.height().unwrap(), height);
    assert_eq!(index.leaf_chain().unwrap().concat(), (0..200).collect::<Vec<_>>());
    assert_eq!(all_rids(&mut index).len(), 200);
}

#[test]
fn test_reopen_uses_stored_layout() {
    let dir = tempdir().unwrap();
    let bpm = Arc::new(BufferPoolManager::new(16));
    let rel = relation("emp", 0..30);

    drop(
        BTreeIndex::open_or_create(
            Arc::clone(&bpm),
            &small_config(dir.path()),
            &rel,
            ATTR,
            Datatype::Integer,
        )
        .unwrap(),
    );

    let full_page = IndexConfig::default().with_data_dir(dir.path());
    let index =
        BTreeIndex::open_or_create(bpm, &full_page, &rel, ATTR, Datatype::Integer).unwrap();

    assert_eq!(index.layout(), NodeLayout::new(4, 3).unwrap());
    assert_ne!(index.layout().leaf_capacity, MAX_LEAF_CAPACITY);
    assert_eq!(index.leaf_chain().unwrap().concat(), (0..30).collect::<Vec<_>>());
}

#[test]
fn test_reopen_with_other_relation_name_is_bad_index_info() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let bpm = Arc::new(BufferPoolManager::new(16));

    drop(
        BTreeIndex::open_or_create(
            Arc::clone(&bpm),
            &config,
            &relation("emp", 0..5),
            ATTR,
            Datatype::Integer,
        )
        .unwrap(),
    );
    std::fs::copy(dir.path().join("emp.4"), dir.path().join("dept.4")).unwrap();

    let result = BTreeIndex::open_or_create(
        Arc::clone(&bpm),
        &config,
        &relation("dept", 0..5),
        ATTR,
        Datatype::Integer,
    );
    match result {
        Err(Error::BadIndexInfo { index, reason }) => {
            assert_eq!(index, "dept.4");
            assert!(reason.contains("emp"), "{reason}");
        }
        other => panic!("expected BadIndexInfo, got {:?}", other.map(|_| ())),
    }

    // The rejected open released its file; the original still opens.
    assert_eq!(bpm.page_count(), 0);
    assert!(BTreeIndex::open_or_create(
        bpm,
        &config,
        &relation("emp", []),
        ATTR,
        Datatype::Integer
    )
    .is_ok());
}

#[test]
fn test_reopen_with_other_offset_or_type_is_bad_index_info() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path());
    let bpm = Arc::new(BufferPoolManager::new(16));
    let rel = relation("emp", 0..5);

    drop(BTreeIndex::open_or_create(Arc::clone(&bpm), &config, &rel, ATTR, Datatype::Integer).unwrap());

    let result = BTreeIndex::open_or_create(Arc::clone(&bpm), &config, &rel, ATTR, Datatype::Double);
    assert!(matches!(result, Err(Error::BadIndexInfo { .. })));

    std::fs::copy(dir.path().join("emp.4"), dir.path().join("emp.8")).unwrap();
    let result = BTreeIndex::open_or_create(bpm, &config, &rel, 8, Datatype::Integer);
    match result {
        Err(Error::BadIndexInfo { reason, .. }) => assert!(reason.contains("offset"), "{reason}"),
        other => panic!("expected BadIndexInfo, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_relation_name_too_long() {
    let dir = tempdir().unwrap();
    let bpm = Arc::new(BufferPoolManager::new(8));
    let rel = MemoryRelation::new("r".repeat(65));

    let result =
        BTreeIndex::open_or_create(bpm, &small_config(dir.path()), &rel, 0, Datatype::Integer);
    assert!(matches!(result, Err(Error::RelationNameTooLong { len: 65, max: 64 })));
}

#[test]
fn test_short_records_are_skipped_during_bulk_load() {
    let dir = tempdir().unwrap();
    let bpm = Arc::new(BufferPoolManager::new(8));
    let mut rel = relation("mixed", [3, 1]);
    rel.push(vec![0u8; ATTR + 2]);
    rel.push_int(ATTR, 2, RECORD_LEN);

    let index =
        BTreeIndex::open_or_create(bpm, &small_config(dir.path()), &rel, ATTR, Datatype::Integer)
            .unwrap();

    assert_eq!(index.leaf_chain().unwrap().concat(), vec![1, 2, 3]);
}

#[test]
fn test_drop_during_scan_releases_leaf() {
    let dir = tempdir().unwrap();
    let bpm = Arc::new(BufferPoolManager::new(8));
    let rel = relation("emp", 0..20);

    let mut index = BTreeIndex::open_or_create(
        Arc::clone(&bpm),
        &small_config(dir.path()),
        &rel,
        ATTR,
        Datatype::Integer,
    )
    .unwrap();
    index.start_scan(3, Operator::Gte, 10, Operator::Lte).unwrap();
    index.scan_next().unwrap();
    drop(index);

    assert_eq!(bpm.page_count(), 0);
    assert_eq!(bpm.free_frame_count(), 8);
    assert_eq!(bpm.stats().snapshot().stray_unpins, 0);
}

#[test]
fn test_config_pool_size_drives_pool() {
    let dir = tempdir().unwrap();
    let config = small_config(dir.path()).with_pool_size(5);
    let bpm = Arc::new(BufferPoolManager::new(config.pool_size));

    let index = BTreeIndex::open_or_create(
        Arc::clone(&bpm),
        &config,
        &relation("tiny", 0..100),
        ATTR,
        Datatype::Integer,
    )
    .unwrap();

    assert_eq!(bpm.pool_size(), 5);
    assert_eq!(index.leaf_chain().unwrap().concat(), (0..100).collect::<Vec<_>>());
}
