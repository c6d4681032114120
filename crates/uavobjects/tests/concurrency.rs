// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Concurrent access to registry instances.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use uavobjects::{EventKind, FieldType, ObjectRegistry, ObjectSchema, RegistryConfig};

const BLOCK_ID: u32 = 0x0BAD_F00C;
const BLOCK_LEN: usize = 64;

fn block_registry() -> Arc<ObjectRegistry> {
    let registry = ObjectRegistry::new(RegistryConfig { event_capacity: 0 });
    registry
        .register(
            ObjectSchema::builder(BLOCK_ID, "Block")
                .single_instance(false)
                .array("Bytes", FieldType::UInt8, BLOCK_LEN - 4)
                .scalar("Tag", FieldType::UInt32)
                .build()
                .expect("schema"),
        )
        .expect("register");
    Arc::new(registry)
}

#[test]
fn test_unpack_never_tears_under_readers() {
    let registry = block_registry();
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let registry = Arc::clone(&registry);
        thread::spawn(move || {
            let mut rng = fastrand::Rng::with_seed(7);
            for _ in 0..5_000 {
                let fill = rng.u8(..);
                registry
                    .unpack_object(BLOCK_ID, 0, &[fill; BLOCK_LEN])
                    .expect("unpack");
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let stop = Arc::clone(&stop);
            thread::spawn(move || {
                let inst = registry.get_instance(BLOCK_ID, 0).expect("instance");
                let mut checked = 0u64;
                while !stop.load(Ordering::Relaxed) {
                    let bytes = inst.pack();
                    assert_eq!(bytes.len(), BLOCK_LEN);
                    assert!(
                        bytes.iter().all(|&b| b == bytes[0]),
                        "torn payload: {:?}",
                        bytes
                    );
                    checked += 1;
                }
                checked
            })
        })
        .collect();

    writer.join().expect("writer");
    stop.store(true, Ordering::Relaxed);
    for reader in readers {
        assert!(reader.join().expect("reader") > 0);
    }
}

#[test]
fn test_batched_update_is_atomic_for_readers() {
    let registry = block_registry();
    let inst = registry.create_instance(BLOCK_ID, 1).expect("instance");
    let stop = Arc::new(AtomicBool::new(false));

    let reader = {
        let inst = Arc::clone(&inst);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            while !stop.load(Ordering::Relaxed) {
                inst.read(|f| {
                    let first = f.get("Bytes", 0).expect("first").as_f64();
                    let last = f.get("Bytes", BLOCK_LEN - 5).expect("last").as_f64();
                    let tag = f.get("Tag", 0).expect("tag").as_f64();
                    assert_eq!(first, last);
                    assert_eq!(first, tag);
                });
            }
        })
    };

    for round in 0..2_000u32 {
        let v = (round % 200) as u8;
        inst.update(|f| {
            for i in 0..BLOCK_LEN - 4 {
                f.set("Bytes", i, v)?;
            }
            f.set("Tag", 0, u32::from(v))
        })
        .expect("update");
    }
    stop.store(true, Ordering::Relaxed);
    reader.join().expect("reader");
}

#[test]
fn test_independent_instances_and_events() {
    let registry = block_registry();
    let subs: Vec<_> = (1..=4)
        .map(|id| registry.subscribe(BLOCK_ID, id).expect("subscribe"))
        .collect();

    let handles: Vec<_> = (1..=4u32)
        .map(|id| {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..100 {
                    registry
                        .unpack_object(BLOCK_ID, id, &[id as u8; BLOCK_LEN])
                        .expect("unpack");
                }
            })
        })
        .collect();
    for h in handles {
        h.join().expect("worker");
    }

    assert_eq!(registry.instances(BLOCK_ID).len(), 5);
    for (sub, id) in subs.iter().zip(1..=4u32) {
        let inst = registry.get_instance(BLOCK_ID, id).expect("instance");
        assert_eq!(inst.pack(), vec![id as u8; BLOCK_LEN]);

        let events = sub.drain();
        assert_eq!(events.len(), 101);
        assert_eq!(events[0].kind, EventKind::Created);
        assert!(events[1..].iter().all(|e| e.kind == EventKind::Unpacked));
    }
}

#[test]
fn test_register_races_with_first_reference() {
    for round in 0..200u32 {
        let registry = Arc::new(ObjectRegistry::default());
        let id = 0x0100_0000 + (round << 1);
        let creator = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || loop {
                if let Ok(inst) = registry.create_instance(id, 0) {
                    return inst;
                }
                thread::yield_now();
            })
        };
        registry
            .register(
                ObjectSchema::builder(id, "Racer")
                    .scalar("X", FieldType::UInt8)
                    .build()
                    .expect("schema"),
            )
            .expect("register");
        let seen = creator.join().expect("creator");
        let stored = registry.get_instance(id, 0).expect("instance 0");
        assert!(Arc::ptr_eq(&seen, &stored), "round {}", round);
    }
}
