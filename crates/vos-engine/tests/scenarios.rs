//! End-to-end scenarios exercising `Pool`/`Container` together, grounded in
//! the concrete walkthroughs used to validate the visibility rule, punch
//! semantics, and iteration (hole reads, epoch shadowing, mass punch,
//! single-value epoch expressions).

use vos_engine::iod::{Iod, IodEntry, IoUnit, RecxUnit};
use vos_engine::ops::fetch::{FetchEntry, FetchRequest, FetchUnit, FetchedValue};
use vos_engine::ops::punch::PunchTarget;
use vos_engine::ops::EpochExpr;
use vos_engine::{Container, Pool};
use vos_types::config::VosConfig;
use vos_types::ids::{ContainerId, ObjectFeatureBits, ObjectId, PoolId};
use vos_types::key::{Key, KeyClass};

fn open_container(dir: &std::path::Path) -> Container {
    let pool = Pool::new();
    let pool_id = PoolId(uuid::Uuid::nil());
    let mut config = VosConfig::default();
    config.scm_size_gb = 1;
    pool.open(
        pool_id,
        dir.join("pool.redb"),
        dir.join("blob.nvme"),
        config,
    )
    .expect("open pool");
    pool.open_container(pool_id, ContainerId(uuid::Uuid::nil()))
        .expect("open container")
}

fn oid(lo: u64) -> ObjectId {
    ObjectId::new(0, lo, ObjectFeatureBits::empty()).expect("valid oid")
}

fn key(bytes: &[u8]) -> Key {
    Key::new(bytes.to_vec(), KeyClass::Opaque).expect("valid key")
}

#[test]
fn hole_read_scenario() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut container = open_container(dir.path());

    container
        .update(
            oid(1),
            &Iod {
                epoch: 1,
                entries: vec![
                    IodEntry {
                        dkey: key(b"d0"),
                        akey: key(b"a0"),
                        unit: IoUnit::Array(vec![RecxUnit {
                            lo: 0,
                            hi: 1023,
                            rec_size: 1,
                            payload: vec![b'A'; 1024],
                        }]),
                    },
                    IodEntry {
                        dkey: key(b"d0"),
                        akey: key(b"a0"),
                        unit: IoUnit::Array(vec![RecxUnit {
                            lo: 2048,
                            hi: 3071,
                            rec_size: 1,
                            payload: vec![b'C'; 1024],
                        }]),
                    },
                ],
            },
        )
        .expect("update");

    let out = container
        .fetch(
            oid(1),
            &FetchRequest {
                epoch: 1,
                entries: vec![FetchEntry {
                    dkey: key(b"d0"),
                    akey: key(b"a0"),
                    unit: FetchUnit::Array {
                        lo: 0,
                        hi: 3071,
                        rec_size: 1,
                        skip_holes: false,
                    },
                }],
            },
        )
        .expect("fetch");

    let mut expected = vec![b'A'; 1024];
    expected.extend(vec![0u8; 1024]);
    expected.extend(vec![b'C'; 1024]);
    assert_eq!(out, vec![FetchedValue::Array(expected)]);
}

#[test]
fn epoch_shadowing_scenario() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut container = open_container(dir.path());

    container
        .update(
            oid(1),
            &Iod {
                epoch: 1,
                entries: vec![IodEntry {
                    dkey: key(b"d0"),
                    akey: key(b"a0"),
                    unit: IoUnit::Array(vec![RecxUnit {
                        lo: 0,
                        hi: 1023,
                        rec_size: 1,
                        payload: vec![b'A'; 1024],
                    }]),
                }],
            },
        )
        .expect("update e1");
    container
        .update(
            oid(1),
            &Iod {
                epoch: 2,
                entries: vec![IodEntry {
                    dkey: key(b"d0"),
                    akey: key(b"a0"),
                    unit: IoUnit::Array(vec![RecxUnit {
                        lo: 512,
                        hi: 1023,
                        rec_size: 1,
                        payload: vec![b'B'; 512],
                    }]),
                }],
            },
        )
        .expect("update e2");

    let request_at = |epoch| FetchRequest {
        epoch,
        entries: vec![FetchEntry {
            dkey: key(b"d0"),
            akey: key(b"a0"),
            unit: FetchUnit::Array {
                lo: 0,
                hi: 1023,
                rec_size: 1,
                skip_holes: false,
            },
        }],
    };

    let at_e2 = container.fetch(oid(1), &request_at(2)).expect("fetch e2");
    let mut expected_e2 = vec![b'A'; 512];
    expected_e2.extend(vec![b'B'; 512]);
    assert_eq!(at_e2, vec![FetchedValue::Array(expected_e2)]);

    let at_e1 = container.fetch(oid(1), &request_at(1)).expect("fetch e1");
    assert_eq!(at_e1, vec![FetchedValue::Array(vec![b'A'; 1024])]);
}

#[test]
fn punch_hides_descendants_scenario() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut container = open_container(dir.path());
    let object = oid(1);

    let mut entries = Vec::new();
    for n in 0u32..100 {
        entries.push(IodEntry {
            dkey: key(&n.to_be_bytes()),
            akey: key(b"a0"),
            unit: IoUnit::Array(vec![RecxUnit {
                lo: 0,
                hi: 0,
                rec_size: 1,
                payload: vec![1],
            }]),
        });
    }
    container.update(object, &Iod { epoch: 1, entries }).expect("update");

    for n in 0u32..10 {
        container
            .punch(object, 2, PunchTarget::Dkey(key(&n.to_be_bytes())))
            .expect("punch dkey");
    }

    let mut count_at_e2 = 0;
    let mut iter = container.dkey_iter(object, 0, 2, None).expect("dkey iter e2");
    loop {
        count_at_e2 += 1;
        if iter.advance().is_err() {
            break;
        }
    }
    assert_eq!(count_at_e2, 90);

    let mut count_at_e1 = 0;
    let mut iter = container.dkey_iter(object, 0, 1, None).expect("dkey iter e1");
    loop {
        count_at_e1 += 1;
        if iter.advance().is_err() {
            break;
        }
    }
    assert_eq!(count_at_e1, 100);
}

#[test]
fn single_value_epoch_expressions_scenario() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut container = open_container(dir.path());
    let object = oid(1);

    for epoch in [2u64, 4, 6, 8] {
        container
            .update(
                object,
                &Iod {
                    epoch,
                    entries: vec![IodEntry {
                        dkey: key(b"d0"),
                        akey: key(b"a0"),
                        unit: IoUnit::Single(vec![epoch as u8]),
                    }],
                },
            )
            .expect("update");
    }

    let le = container
        .fetch(
            object,
            &FetchRequest {
                epoch: 8,
                entries: vec![FetchEntry {
                    dkey: key(b"d0"),
                    akey: key(b"a0"),
                    unit: FetchUnit::Single {
                        expr: EpochExpr::Le,
                        epr_lo: 5,
                        epr_hi: 8,
                    },
                }],
            },
        )
        .expect("LE fetch");
    assert_eq!(le, vec![FetchedValue::Single(Some(vec![4]))]);

    let ge = container
        .fetch(
            object,
            &FetchRequest {
                epoch: 8,
                entries: vec![FetchEntry {
                    dkey: key(b"d0"),
                    akey: key(b"a0"),
                    unit: FetchUnit::Single {
                        expr: EpochExpr::Ge,
                        epr_lo: 5,
                        epr_hi: 8,
                    },
                }],
            },
        )
        .expect("GE fetch");
    assert_eq!(ge, vec![FetchedValue::Single(Some(vec![6]))]);

    let mut rr = container
        .single_iter(object, b"d0", b"a0", EpochExpr::Rr, 3, 7)
        .expect("RR iter");
    let mut seen = Vec::new();
    loop {
        seen.push(rr.current().0);
        if rr.advance().is_err() {
            break;
        }
    }
    assert_eq!(seen, vec![6, 4]);
}

#[test]
fn nested_iteration_does_not_require_parent_to_outlive_child() {
    // The DKEY/AKEY iterators snapshot their accepted keys eagerly rather
    // than borrowing the container across the nesting, so a child cursor
    // remains fully usable after its parent cursor has been dropped —
    // there is no "release order" footgun to assert against at runtime.
    let dir = tempfile::tempdir().expect("tempdir");
    let mut container = open_container(dir.path());
    let object = oid(1);

    container
        .update(
            object,
            &Iod {
                epoch: 1,
                entries: vec![IodEntry {
                    dkey: key(b"d0"),
                    akey: key(b"a0"),
                    unit: IoUnit::Single(b"x".to_vec()),
                }],
            },
        )
        .expect("update");

    let akeys = {
        let dkeys = container.dkey_iter(object, 0, 1, None).expect("dkey iter");
        container
            .akey_iter(object, dkeys.current(), 0, 1)
            .expect("akey iter")
        // `dkeys` drops here, before `akeys` is used below.
    };
    assert_eq!(akeys.current(), b"a0");
}
