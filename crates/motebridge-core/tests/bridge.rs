use motebridge_core::prelude::*;
use motebridge_core::BridgeError;
use pretty_assertions::assert_eq;

fn registered(addr: i64) -> MemoryBridge {
    let mut bridge = MemoryBridge::new(&BridgeConfig::default()).unwrap();
    bridge.set_reference_address(addr).unwrap();
    bridge
}

fn i32_at(bridge: &MemoryBridge, rel: i64) -> i32 {
    let bytes = bridge.read_vec(rel, 4).unwrap();
    i32::from_ne_bytes(bytes.try_into().unwrap())
}

#[test]
fn test_read_matches_translated_address() {
    let bridge = registered(1000);
    let offset = bridge.offset().unwrap();
    let anchor_real = bridge.real_address_of("referenceVar").unwrap();
    assert_eq!(offset, anchor_real - 1000);

    let base = anchor_real - bridge.layout().anchor().offset as i64;
    for cell in bridge.symbols() {
        let rel = bridge.relative_address_of(&cell.name).unwrap();
        let n = cell.size() as i32;
        let real = rel + offset;
        let start = (real - base) as usize;
        assert_eq!(
            bridge.read_vec(rel, n).unwrap(),
            bridge.memory()[start..start + cell.size()].to_vec()
        );
    }
}

#[test]
fn test_initial_values_and_tick() {
    let mut bridge = registered(1000);
    let var1 = bridge.relative_address_of("var1").unwrap();
    let var2 = bridge.relative_address_of("var2").unwrap();
    let var3 = bridge.relative_address_of("var3").unwrap();

    assert_eq!(bridge.read_vec(var1, 4).unwrap(), 1i32.to_ne_bytes());
    assert_eq!(i32_at(&bridge, var2), 2);
    assert_eq!(i32_at(&bridge, var3), 2);

    bridge.tick();
    assert_eq!(bridge.read_vec(var1, 4).unwrap(), 2i32.to_ne_bytes());
}

#[test]
fn test_tick_touches_only_counters() {
    let mut bridge = registered(0x2000);
    let before = bridge.memory().to_vec();

    for _ in 0..5 {
        bridge.tick();
    }

    assert_eq!(bridge.read_i32("var1", 0).unwrap(), 6);
    assert_eq!(bridge.read_u32("uvar1", 0).unwrap(), 5);

    let var1 = bridge.layout().cell("var1").unwrap().range();
    let uvar1 = bridge.layout().cell("uvar1").unwrap().range();
    for (i, (a, b)) in before.iter().zip(bridge.memory()).enumerate() {
        if !var1.contains(&i) && !uvar1.contains(&i) {
            assert_eq!(a, b, "byte {} changed", i);
        }
    }
}

#[test]
fn test_set_memory_into_array() {
    let mut bridge = registered(1000);
    let arr1 = bridge.relative_address_of("arr1").unwrap();
    let index3 = arr1 + 3 * 4;

    bridge.write(index3, 4, &42i32.to_ne_bytes()).unwrap();
    assert_eq!(bridge.read_vec(index3, 4).unwrap(), 42i32.to_ne_bytes());

    for i in 0..10 {
        let expected = if i == 3 { 42 } else { 0 };
        assert_eq!(bridge.read_i32("arr1", i).unwrap(), expected);
    }
}

#[test]
fn test_write_read_round_trip_spans_cells() {
    let mut bridge = registered(-5000);
    let start = bridge.relative_address_of("arr2").unwrap() - 4;
    let payload: Vec<u8> = (0..44u8).collect();

    bridge.write(start, payload.len() as i32, &payload).unwrap();
    assert_eq!(bridge.read_vec(start, payload.len() as i32).unwrap(), payload);
}

#[test]
fn test_reregistration_changes_offset() {
    let mut bridge = registered(1000);
    let first = bridge.offset().unwrap();

    let second = bridge.set_reference_address(2000).unwrap();
    assert_eq!(first - second, 1000);
    assert_eq!(bridge.relative_address_of("referenceVar").unwrap(), 2000);
}

#[test]
fn test_strict_reregistration_rejected() {
    let config = BridgeConfig {
        allow_reregistration: false,
        ..BridgeConfig::default()
    };
    let mut bridge = MemoryBridge::new(&config).unwrap();
    let first = bridge.set_reference_address(1000).unwrap();

    assert_eq!(
        bridge.set_reference_address(2000),
        Err(BridgeError::AlreadyRegistered { offset: first })
    );
    assert_eq!(bridge.offset(), Some(first));
}

#[test]
fn test_out_of_bounds_rejected() {
    let mut bridge = registered(1000);
    let before = bridge.memory().to_vec();
    let last = bridge.relative_address_of("uvar2").unwrap();

    let err = bridge.read_vec(last, 64).unwrap_err();
    assert!(err.is_access_violation());

    let anchor = bridge.relative_address_of("var1").unwrap();
    let err = bridge.write(anchor - 4, 4, &[1, 2, 3, 4]).unwrap_err();
    assert!(matches!(err, BridgeError::OutOfBounds { length: 4, .. }));

    assert_eq!(bridge.memory(), before.as_slice());
}

#[test]
#[should_panic]
fn test_unchecked_out_of_bounds_panics() {
    let config = BridgeConfig {
        bounds_check: false,
        ..BridgeConfig::default()
    };
    let mut bridge = MemoryBridge::new(&config).unwrap();
    bridge.set_reference_address(0).unwrap();
    let var1 = bridge.relative_address_of("var1").unwrap();
    let _ = bridge.read_vec(var1 + 4096, 4);
}

#[test]
fn test_unchecked_in_bounds_access() {
    let config = BridgeConfig {
        bounds_check: false,
        ..BridgeConfig::default()
    };
    let mut bridge = MemoryBridge::new(&config).unwrap();
    bridge.set_reference_address(0).unwrap();
    let var2 = bridge.relative_address_of("var2").unwrap();

    bridge.write(var2, 4, &7i32.to_ne_bytes()).unwrap();
    assert_eq!(bridge.read_i32("var2", 0).unwrap(), 7);
}

#[test]
fn test_reset_returns_to_unregistered() {
    let mut bridge = registered(1000);
    bridge.tick();
    bridge.reset();

    assert_eq!(bridge.state(), BridgeState::Unregistered);
    assert_eq!(bridge.read_i32("var1", 0).unwrap(), 1);
    assert_eq!(bridge.read_vec(0, 4), Err(BridgeError::NotRegistered));
}

#[test]
fn test_custom_counters() {
    let config = BridgeConfig {
        observable_counter: "var3".to_string(),
        internal_counter: "uvar2".to_string(),
        ..BridgeConfig::default()
    };
    let mut bridge = MemoryBridge::new(&config).unwrap();
    bridge.tick();

    assert_eq!(bridge.read_i32("var1", 0).unwrap(), 1);
    assert_eq!(bridge.read_i32("var3", 0).unwrap(), 3);
    assert_eq!(bridge.read_u32("uvar2", 0).unwrap(), 1);
}
