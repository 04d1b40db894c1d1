//! Loop invariant discovery with the affine-equality domain.
//!
//! Analyzes the classic lockstep loop
//!
//! ```text
//! x := 0; y := 0;
//! while (...) { x := x + 1; y := y + 1; }
//! ```
//!
//! The Kleene iterates stabilize on the relational invariant `x - y = 0`,
//! which no non-relational domain can express.

use karr_rs::{AffEq, Environment, Texpr, Var};
use simplelog::*;

fn main() {
    TermLogger::init(LevelFilter::Info, Config::default(), TerminalMode::Mixed, ColorChoice::Auto).unwrap();

    println!("=== Affine loop invariants ===\n");

    let env = Environment::of_ints(["x", "y"]);
    let x = Var::new("x");
    let y = Var::new("y");

    // entry: x := 0; y := 0
    let entry = AffEq::top_env(&env)
        .assign_exp(&x, &Texpr::int(0))
        .assign_exp(&y, &Texpr::int(0));
    println!("entry state:     {}", entry);

    let body = |s: &AffEq| {
        s.assign_exp(&x, &Texpr::var(x.clone()).add(Texpr::int(1)))
            .assign_exp(&y, &Texpr::var(y.clone()).add(Texpr::int(1)))
    };

    // Kleene iteration; join doubles as widening on a fixed environment
    let mut inv = entry.clone();
    for i in 1.. {
        let next = inv.widen(&entry.join(&body(&inv)));
        println!("iteration {}:     {}", i, next);
        if next == inv {
            break;
        }
        inv = next;
    }
    println!("\nloop invariant:  {}", inv);

    // the invariant still pins the difference exactly
    let diff = Texpr::var(x.clone()).sub(Texpr::var(y.clone()));
    let (lo, hi) = inv.bound_texpr(&diff);
    println!("bounds of x - y: {:?} .. {:?}", lo, hi);

    // a guard contradicting the invariant prunes the path
    let infeasible = inv.meet_tcons(&diff.sub(Texpr::int(1)).eq0());
    println!("after x - y = 1: {}", infeasible);
}
