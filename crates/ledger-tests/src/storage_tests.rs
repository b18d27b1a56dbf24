//! Engine-level scenarios: profiles, prefix scans, snapshots.

use crate::generators::*;
use ledger_storage::{ColumnFamily, Engine, Profile, StoreConfig, WriteBatch};
use ledger_types::{AssetKey, TokenKey, TokenType};
use tempfile::TempDir;

fn open_engine(profile: Profile) -> (Engine, TempDir) {
    let tmp = TempDir::new().unwrap();
    let engine = Engine::open(&StoreConfig::new(tmp.path()).with_profile(profile)).unwrap();
    (engine, tmp)
}

#[test]
fn test_both_profiles_serve_both_families() {
    for profile in [Profile::Disk, Profile::Memory] {
        let (engine, _tmp) = open_engine(profile);

        let token_key = TokenKey::new(name("evt"), name("t1"));
        engine
            .put(ColumnFamily::Tokens, token_key.as_bytes(), b"tok")
            .unwrap();

        let asset_key = AssetKey::new(&test_address(1), test_symbol(1));
        engine
            .put(ColumnFamily::Assets, asset_key.as_bytes(), b"bal")
            .unwrap();

        assert_eq!(
            engine.get(ColumnFamily::Tokens, token_key.as_bytes()).unwrap(),
            Some(b"tok".to_vec())
        );
        assert_eq!(
            engine.get(ColumnFamily::Assets, asset_key.as_bytes()).unwrap(),
            Some(b"bal".to_vec())
        );
    }
}

/// A domain prefix scan returns exactly that domain's keys, in key
/// order, even with adjacent domains present.
#[test]
fn test_domain_prefix_scan_boundaries() {
    let (engine, _tmp) = open_engine(Profile::Disk);

    for (domain, key) in [
        ("aaa", "z"),
        ("aab", "a"),
        ("aab", "b"),
        ("aab", "c"),
        ("aac", "a"),
    ] {
        let token_key = TokenKey::new(name(domain), name(key));
        engine
            .put(ColumnFamily::Tokens, token_key.as_bytes(), key.as_bytes())
            .unwrap();
    }

    let entries: Vec<_> = engine
        .iter_prefix(ColumnFamily::Tokens, name("aab").as_bytes())
        .unwrap()
        .collect();
    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].1, b"a".to_vec());
    assert_eq!(entries[1].1, b"b".to_vec());
    assert_eq!(entries[2].1, b"c".to_vec());
}

/// The asset family's 33-byte prefix isolates one address's balances.
#[test]
fn test_address_prefix_scan_isolates_address() {
    let (engine, _tmp) = open_engine(Profile::Disk);

    let a = test_address(0x10);
    let b = test_address(0x20);
    for (addr, id) in [(&a, 1u32), (&a, 2), (&a, 3), (&b, 1)] {
        let key = AssetKey::new(addr, test_symbol(id));
        engine
            .put(ColumnFamily::Assets, key.as_bytes(), &id.to_le_bytes())
            .unwrap();
    }

    let prefix = AssetKey::address_prefix(&a);
    let entries: Vec<_> = engine
        .iter_prefix(ColumnFamily::Assets, &prefix)
        .unwrap()
        .collect();
    assert_eq!(entries.len(), 3);
    for (key, _) in &entries {
        assert_eq!(AssetKey::from_slice(key).unwrap().address().unwrap(), a);
    }
}

/// Snapshots pin the state a batch later overwrites.
#[test]
fn test_snapshot_isolation_across_batch() {
    let (engine, _tmp) = open_engine(Profile::Disk);
    let key = TokenKey::new(name("evt"), name("t1"));
    engine
        .put(ColumnFamily::Tokens, key.as_bytes(), b"v1")
        .unwrap();

    let snapshot = engine.snapshot();

    let mut batch = WriteBatch::new();
    batch.put(ColumnFamily::Tokens, key.as_bytes().to_vec(), b"v2".to_vec());
    batch.put(
        ColumnFamily::Assets,
        AssetKey::new(&test_address(1), test_symbol(1)).as_bytes().to_vec(),
        b"10".to_vec(),
    );
    engine.write_batch(batch, false).unwrap();

    assert_eq!(
        snapshot.get(ColumnFamily::Tokens, key.as_bytes()).unwrap(),
        Some(b"v1".to_vec())
    );
    assert_eq!(
        snapshot
            .get(
                ColumnFamily::Assets,
                AssetKey::new(&test_address(1), test_symbol(1)).as_bytes()
            )
            .unwrap(),
        None
    );
}

/// Fixed per-type prefixes land in the token family next to domain
/// prefixes without colliding.
#[test]
fn test_reserved_prefixes_do_not_collide_with_domains() {
    let (engine, _tmp) = open_engine(Profile::Disk);

    let domain_record = TokenKey::for_type(TokenType::Domain, None, name("evt")).unwrap();
    let token_record = TokenKey::new(name("evt"), name("evt"));
    assert_ne!(domain_record.as_bytes(), token_record.as_bytes());

    engine
        .put(ColumnFamily::Tokens, domain_record.as_bytes(), b"def")
        .unwrap();
    engine
        .put(ColumnFamily::Tokens, token_record.as_bytes(), b"tok")
        .unwrap();

    let entries: Vec<_> = engine
        .iter_prefix(ColumnFamily::Tokens, name("evt").as_bytes())
        .unwrap()
        .collect();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].1, b"tok".to_vec());
}
