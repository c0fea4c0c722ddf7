//! Tests for the lattice registry and built-in lattice types.

use kahn::lattice::registry::{LatticeOps, LatticeRegistry, Threshold};
use kahn::lattice::types::{GCounter, GSet, MaxInt};
use kahn::store::value::{Datum, TypeTag};

fn counter(entries: &[(&str, u64)]) -> Datum {
    Datum::map(
        entries
            .iter()
            .map(|(replica, count)| (replica.to_string(), Datum::Uint(*count))),
    )
}

// ============================================================================
// Registry tests
// ============================================================================

#[test]
fn default_registry_members() {
    let registry = LatticeRegistry::with_defaults();
    assert!(registry.is_lattice(&TypeTag::new("gcounter")));
    assert!(registry.is_lattice(&TypeTag::new("maxint")));
    assert!(registry.is_lattice(&TypeTag::new("gset")));
    assert!(!registry.is_lattice(&TypeTag::new("blob")));
    assert_eq!(registry.len(), 3);
}

#[test]
fn bottom_of_unknown_tag_is_none() {
    let registry = LatticeRegistry::with_defaults();
    assert!(registry.bottom(&TypeTag::new("blob")).is_none());
    assert_eq!(
        registry.bottom(&TypeTag::new("maxint")),
        Some(Datum::Int(i64::MIN))
    );
}

#[test]
fn threshold_never_met_for_unknown_tag() {
    let registry = LatticeRegistry::with_defaults();
    let threshold = Threshold::AtLeast(Datum::Int(0));
    assert!(!registry.threshold_met(&TypeTag::new("blob"), &Datum::Int(5), &threshold));
}

#[test]
fn threshold_at_least() {
    let registry = LatticeRegistry::with_defaults();
    let tag = TypeTag::new("maxint");
    let threshold = Threshold::AtLeast(Datum::Int(10));
    assert!(!registry.threshold_met(&tag, &Datum::Int(9), &threshold));
    assert!(registry.threshold_met(&tag, &Datum::Int(10), &threshold));
    assert!(registry.threshold_met(&tag, &Datum::Int(11), &threshold));
}

#[test]
fn threshold_strictly_greater() {
    let registry = LatticeRegistry::with_defaults();
    let tag = TypeTag::new("maxint");
    let threshold = Threshold::StrictlyGreater(Datum::Int(10));
    assert!(!registry.threshold_met(&tag, &Datum::Int(10), &threshold));
    assert!(registry.threshold_met(&tag, &Datum::Int(11), &threshold));
}

#[test]
fn threshold_on_counters_is_pointwise() {
    let registry = LatticeRegistry::with_defaults();
    let tag = TypeTag::new("gcounter");
    let threshold = Threshold::AtLeast(counter(&[("a", 2)]));
    assert!(!registry.threshold_met(&tag, &counter(&[("a", 1), ("b", 5)]), &threshold));
    assert!(registry.threshold_met(&tag, &counter(&[("a", 2)]), &threshold));
    assert!(registry.threshold_met(&tag, &counter(&[("a", 3), ("b", 1)]), &threshold));
}

// ============================================================================
// Lattice law tests
// ============================================================================

fn check_laws(ops: &dyn LatticeOps, samples: &[Datum]) {
    for a in samples {
        // Idempotence.
        assert_eq!(ops.join(a, a), *a);
        // Bottom is the least element.
        assert!(ops.leq(&ops.bottom(), a));
        assert_eq!(ops.join(&ops.bottom(), a), *a);
        for b in samples {
            // Commutativity.
            assert_eq!(ops.join(a, b), ops.join(b, a));
            // Join is an upper bound.
            assert!(ops.leq(a, &ops.join(a, b)));
            assert!(ops.leq(b, &ops.join(a, b)));
            for c in samples {
                // Associativity.
                assert_eq!(
                    ops.join(&ops.join(a, b), c),
                    ops.join(a, &ops.join(b, c))
                );
            }
        }
    }
}

#[test]
fn gcounter_laws() {
    let samples = [
        counter(&[]),
        counter(&[("a", 1)]),
        counter(&[("a", 3), ("b", 1)]),
        counter(&[("b", 2), ("c", 7)]),
    ];
    check_laws(&GCounter, &samples);
}

#[test]
fn maxint_laws() {
    let samples = [
        Datum::Int(i64::MIN),
        Datum::Int(-3),
        Datum::Int(0),
        Datum::Int(42),
    ];
    check_laws(&MaxInt, &samples);
}

#[test]
fn gset_laws() {
    let samples = [
        Datum::set([]),
        Datum::set([Datum::Int(1)]),
        Datum::set([Datum::Int(1), Datum::str("x")]),
        Datum::set([Datum::str("y")]),
    ];
    check_laws(&GSet, &samples);
}

// ============================================================================
// Type-specific behavior
// ============================================================================

#[test]
fn gcounter_increment_and_total() {
    let bottom = GCounter.bottom();
    let one = GCounter::increment(&bottom, "me");
    assert_eq!(one, counter(&[("me", 1)]));
    let two = GCounter::increment(&one, "me");
    assert_eq!(two, counter(&[("me", 2)]));
    let mixed = GCounter::increment(&two, "other");
    assert_eq!(GCounter::total(&mixed), 3);
}

#[test]
fn gcounter_join_is_pointwise_max() {
    let left = counter(&[("a", 3), ("b", 1)]);
    let right = counter(&[("a", 2), ("c", 4)]);
    assert_eq!(
        GCounter.join(&left, &right),
        counter(&[("a", 3), ("b", 1), ("c", 4)])
    );
}

#[test]
fn gset_join_is_union() {
    let left = Datum::set([Datum::Int(1), Datum::Int(2)]);
    let right = Datum::set([Datum::Int(2), Datum::Int(3)]);
    assert_eq!(
        GSet.join(&left, &right),
        Datum::set([Datum::Int(1), Datum::Int(2), Datum::Int(3)])
    );
    assert!(GSet.leq(&left, &GSet.join(&left, &right)));
    assert!(!GSet.leq(&GSet.join(&left, &right), &left));
}

#[test]
fn malformed_inputs_read_as_bottom() {
    // The executor treats data opaquely; lattice impls must stay total.
    assert_eq!(
        GCounter.join(&Datum::Int(5), &counter(&[("a", 1)])),
        counter(&[("a", 1)])
    );
    assert_eq!(MaxInt.join(&Datum::str("x"), &Datum::Int(3)), Datum::Int(3));
}
