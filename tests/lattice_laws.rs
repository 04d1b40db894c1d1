//! Integration tests: lattice laws and transfer-function soundness over
//! states that share one environment.

use karr_rs::*;

fn env_xyz() -> Environment {
    Environment::of_ints(["x", "y", "z"])
}

fn x() -> Var {
    Var::new("x")
}
fn y() -> Var {
    Var::new("y")
}
fn z() -> Var {
    Var::new("z")
}

fn assume(t: &AffEq, e: Texpr) -> AffEq {
    t.meet_tcons(&e.eq0())
}

/// A spread of sample states over {x, y, z}: ⊥, ⊤, points, lines, planes.
fn samples() -> Vec<AffEq> {
    let top = AffEq::top_env(&env_xyz());
    let x_is_1 = assume(&top, Texpr::var(x()).sub(Texpr::int(1)));
    let x_eq_y = assume(&top, Texpr::var(x()).sub(Texpr::var(y())));
    let diag = assume(&x_eq_y, Texpr::var(y()).sub(Texpr::var(z())));
    let point = assume(
        &assume(&x_is_1, Texpr::var(y()).sub(Texpr::int(2))),
        Texpr::var(z()).add(Texpr::int(3)),
    );
    let shifted = assume(&top, Texpr::var(x()).sub(Texpr::var(y())).sub(Texpr::int(7)));
    vec![
        AffEq::bot_env(&env_xyz()),
        top,
        x_is_1,
        x_eq_y,
        diag,
        point,
        shifted,
    ]
}

#[test]
fn test_order_laws() {
    let samples = samples();
    for a in &samples {
        // reflexivity
        assert!(a.leq(a), "reflexivity failed for {}", a);
        for b in &samples {
            // antisymmetry up to the canonical form
            if a.leq(b) && b.leq(a) {
                assert_eq!(a, b, "antisymmetry failed for {} and {}", a, b);
            }
            for c in &samples {
                // transitivity
                if a.leq(b) && b.leq(c) {
                    assert!(a.leq(c), "transitivity failed for {}, {}, {}", a, b, c);
                }
            }
        }
    }
}

#[test]
fn test_top_bottom_bounds() {
    let top = AffEq::top_env(&env_xyz());
    let bot = AffEq::bot_env(&env_xyz());
    for a in &samples() {
        assert!(bot.leq(a), "⊥ ⊑ {} failed", a);
        assert!(a.leq(&top), "{} ⊑ ⊤ failed", a);
    }
}

#[test]
fn test_meet_is_glb() {
    let samples = samples();
    for a in &samples {
        for b in &samples {
            let m = a.meet(b);
            assert!(m.leq(a), "meet({}, {}) not below lhs", a, b);
            assert!(m.leq(b), "meet({}, {}) not below rhs", a, b);
            for c in &samples {
                if c.leq(a) && c.leq(b) {
                    assert!(c.leq(&m), "{} is a lower bound of {} and {} above their meet", c, a, b);
                }
            }
        }
    }
}

#[test]
fn test_join_is_lub() {
    let samples = samples();
    for a in &samples {
        for b in &samples {
            let j = a.join(b);
            assert!(a.leq(&j), "join({}, {}) not above lhs", a, b);
            assert!(b.leq(&j), "join({}, {}) not above rhs", a, b);
            for c in &samples {
                if a.leq(c) && b.leq(c) {
                    assert!(j.leq(c), "{} is an upper bound of {} and {} below their join", c, a, b);
                }
            }
        }
    }
}

#[test]
fn test_idempotence_commutativity_absorption() {
    let samples = samples();
    for a in &samples {
        assert_eq!(a.meet(a), *a, "meet idempotence failed for {}", a);
        assert_eq!(a.join(a), *a, "join idempotence failed for {}", a);
        for b in &samples {
            assert_eq!(a.meet(b), b.meet(a), "meet commutativity failed");
            assert_eq!(a.join(b), b.join(a), "join commutativity failed");
            assert_eq!(a.meet(&a.join(b)), *a, "absorption (meet over join) failed for {}", a);
            assert_eq!(a.join(&a.meet(b)), *a, "absorption (join over meet) failed for {}", a);
        }
    }
}

#[test]
fn test_widen_covers_both_and_narrow_keeps_lhs() {
    let samples = samples();
    for a in &samples {
        for b in &samples {
            let w = a.widen(b);
            assert!(a.leq(&w), "widening does not cover lhs");
            assert!(b.leq(&w), "widening does not cover rhs");
            assert_eq!(a.narrow(b), *a);
        }
    }
}

#[test]
fn test_states_stay_in_normal_form() {
    let samples = samples();
    for a in &samples {
        for b in &samples {
            for t in [a.meet(b), a.join(b), a.widen(b)] {
                if let Some(m) = t.matrix() {
                    assert!(m.is_rref(), "result {} is not in normal form", t);
                }
            }
        }
        let forgotten = a.forget_vars(&[y()]);
        if let Some(m) = forgotten.matrix() {
            assert!(m.is_rref(), "forget left {} out of normal form", forgotten);
        }
        let assigned = a.assign_exp(&x(), &Texpr::var(y()).add(Texpr::int(1)));
        if let Some(m) = assigned.matrix() {
            assert!(m.is_rref(), "assignment left {} out of normal form", assigned);
        }
    }
}

#[test]
fn test_assign_soundness_on_points() {
    // γ(t) = {(1, 2, -3)}; after x := y + z the store is (-1, 2, -3),
    // which must satisfy the result
    let t = samples()[5].clone();
    let t2 = t.assign_exp(&x(), &Texpr::var(y()).add(Texpr::var(z())));
    let expected = assume(
        &assume(
            &assume(
                &AffEq::top_env(&env_xyz()),
                Texpr::var(x()).add(Texpr::int(1)),
            ),
            Texpr::var(y()).sub(Texpr::int(2)),
        ),
        Texpr::var(z()).add(Texpr::int(3)),
    );
    assert!(expected.leq(&t2));
    assert_eq!(expected, t2);
}

#[test]
fn test_guard_soundness() {
    // stores of {x = y} satisfying y = 1 all lie in the guarded state
    let t = assume(&AffEq::top_env(&env_xyz()), Texpr::var(x()).sub(Texpr::var(y())));
    let g = t.meet_tcons(&Texpr::var(y()).sub(Texpr::int(1)).eq0());
    let witness = assume(
        &assume(&AffEq::top_env(&env_xyz()), Texpr::var(x()).sub(Texpr::int(1))),
        Texpr::var(y()).sub(Texpr::int(1)),
    );
    assert!(witness.leq(&g));
}

#[test]
fn test_forget_soundness() {
    // forgetting x must cover every x-update of the original state
    let t = assume(
        &assume(&AffEq::top_env(&env_xyz()), Texpr::var(x()).sub(Texpr::int(1))),
        Texpr::var(y()).sub(Texpr::int(2)),
    );
    let h = t.forget_vars(&[x()]);
    assert!(t.leq(&h));
    let updated = t.assign_exp(&x(), &Texpr::int(100));
    assert!(updated.leq(&h));
}

#[test]
fn test_invariant_round_trip_over_samples() {
    for a in &samples() {
        if a.is_bot_env() {
            assert!(a.invariant().is_empty());
            continue;
        }
        let rebuilt = a
            .invariant()
            .iter()
            .fold(AffEq::top_env(a.env()), |acc, c| acc.meet_tcons(c));
        assert_eq!(&rebuilt, a, "invariant round trip failed for {}", a);
    }
}

#[test]
fn test_marshal_round_trip_over_samples() {
    for a in &samples() {
        assert_eq!(AffEq::unmarshal(a.marshal()), *a);
    }
}

#[test]
fn test_unify_grows_environments() {
    let a = AffEq::top_env(&Environment::of_ints(["x"]))
        .meet_tcons(&Texpr::var(x()).sub(Texpr::int(1)).eq0());
    let b = AffEq::top_env(&Environment::of_ints(["x", "y"]))
        .meet_tcons(&Texpr::var(y()).sub(Texpr::var(x())).eq0());
    let u = a.unify(&b);
    assert_eq!(u.env(), &Environment::of_ints(["x", "y"]));
    assert_eq!(u.to_string(), "[|x-1=0; y-1=0|]");
}
