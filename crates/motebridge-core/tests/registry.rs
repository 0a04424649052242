use motebridge_core::{lock_bridge, BridgeConfig, BridgeRegistry, NodeTypeId};
use std::sync::Arc;
use std::thread;

#[test]
fn test_node_types_have_independent_memory() {
    let registry = BridgeRegistry::default();
    let lib1 = registry.register(NodeTypeId::new("Lib1")).unwrap();
    let lib2 = registry.register(NodeTypeId::new("Lib2")).unwrap();

    lock_bridge(&lib1).tick();
    lock_bridge(&lib1).tick();

    assert_eq!(lock_bridge(&lib1).read_i32("var1", 0).unwrap(), 3);
    assert_eq!(lock_bridge(&lib2).read_i32("var1", 0).unwrap(), 1);
    assert_eq!(
        registry.ids(),
        vec![NodeTypeId::new("Lib1"), NodeTypeId::new("Lib2")]
    );
}

#[test]
fn test_concurrent_ticks_are_serialized() {
    let registry = Arc::new(BridgeRegistry::new(BridgeConfig::default()));
    let id = NodeTypeId::new("Lib1");
    registry.register(id.clone()).unwrap();

    let workers: Vec<_> = (0..4)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let id = id.clone();
            thread::spawn(move || {
                let handle = registry.get(&id).unwrap();
                for _ in 0..250 {
                    lock_bridge(&handle).tick();
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let handle = registry.get(&id).unwrap();
    let bridge = lock_bridge(&handle);
    assert_eq!(bridge.read_i32("var1", 0).unwrap(), 1001);
    assert_eq!(bridge.read_u32("uvar1", 0).unwrap(), 1000);
}
