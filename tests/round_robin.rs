mod common;

use std::num::NonZeroUsize;

use common::*;
use sched_sim::*;

fn rr(quantum: usize) -> TestSim {
    let mut sim = simulator(PolicyKind::RoundRobin);
    sim.set_quantum(NonZeroUsize::new(quantum).unwrap());
    sim
}

#[test]
fn test_quantum_two_interleaving() {
    setup_test();
    let mut sim = rr(2);
    let a = add_busy(&mut sim, "A", 0, 3);
    let b = add_busy(&mut sim, "B", 0, 2);

    let outcomes: Vec<_> = (0..4).map(|_| step_checked(&mut sim)).collect();
    assert_eq!(
        outcomes,
        vec![
            StepOutcome::Ran {
                pid: a,
                instructions: 2
            },
            StepOutcome::Ran {
                pid: b,
                instructions: 2
            },
            StepOutcome::Ran {
                pid: a,
                instructions: 1
            },
            StepOutcome::Done,
        ]
    );
    assert_eq!(sim.trace().dispatch_order(), vec![a, a, b, b, a]);
    assert_eq!(sim.trace().bursts_of(a), vec![2, 1]);
    assert_all_finished(&sim);
}

#[test]
fn test_default_quantum_is_two() {
    setup_test();
    let mut sim = simulator(PolicyKind::RoundRobin);
    let a = add_busy(&mut sim, "A", 0, 5);
    assert_eq!(sim.state().quantum().get(), 2);

    run_checked(&mut sim);
    assert_eq!(sim.trace().bursts_of(a), vec![2, 2, 1]);
}

#[test]
fn test_quantum_one_alternates() {
    setup_test();
    let mut sim = rr(1);
    let a = add_busy(&mut sim, "A", 0, 2);
    let b = add_busy(&mut sim, "B", 0, 2);

    assert_eq!(run_checked(&mut sim), RunOutcome::Completed);
    assert_eq!(sim.trace().dispatch_order(), vec![a, b, a, b]);
}

#[test]
fn test_arrival_during_burst_queues_before_preempted() {
    setup_test();
    let mut sim = rr(3);
    let a = add_busy(&mut sim, "A", 0, 4);
    let b = add_busy(&mut sim, "B", 1, 1);

    step_checked(&mut sim);
    assert_eq!(sim.state().ready_queue().preview(), vec![b, a]);

    assert_eq!(run_checked(&mut sim), RunOutcome::Completed);
    assert_eq!(sim.trace().dispatch_order(), vec![a, a, a, b, a]);
}

#[test]
fn test_blocked_burst_is_abandoned() {
    setup_test();
    let mut sim = rr(2);
    let a = add(
        &mut sim,
        "A",
        0,
        0,
        &[
            "semWait file",
            "assign x 1",
            "assign y 1",
            "assign z 1",
            "semSignal file",
        ],
    );
    let b = add(
        &mut sim,
        "B",
        0,
        0,
        &["semWait file", "assign b 1", "semSignal file"],
    );

    assert_eq!(
        step_checked(&mut sim),
        StepOutcome::Ran {
            pid: a,
            instructions: 2
        }
    );
    assert_eq!(step_checked(&mut sim), StepOutcome::Blocked { pid: b });
    assert_eq!(sim.state().ready_queue().preview(), vec![a]);
    assert_eq!(
        sim.state().resources().get(ResourceKind::File).blocked().preview(),
        vec![b]
    );

    step_checked(&mut sim);
    // The signal wakes B; A finishes in the same burst.
    assert_eq!(
        step_checked(&mut sim),
        StepOutcome::Ran {
            pid: a,
            instructions: 1
        }
    );
    assert_eq!(sim.state().ready_queue().preview(), vec![b]);
    assert_eq!(sim.state().resources().get(ResourceKind::File).holder(), Some(b));

    assert_eq!(
        step_checked(&mut sim),
        StepOutcome::Ran {
            pid: b,
            instructions: 2
        }
    );
    assert_eq!(step_checked(&mut sim), StepOutcome::Done);

    assert_eq!(sim.trace().dispatch_order(), vec![a, a, b, a, a, a, b, b]);
    assert_eq!(woken(sim.trace()), vec![b]);
    assert!(sim.state().resources().get(ResourceKind::File).is_available());
    assert_all_finished(&sim);
}

#[test]
fn test_preemption_is_traced() {
    setup_test();
    let mut sim = rr(2);
    let a = add_busy(&mut sim, "A", 0, 4);

    run_checked(&mut sim);
    let preempted = sim
        .trace()
        .events()
        .iter()
        .filter(|e| e.kind == TraceKind::Preempted { pid: a })
        .count();
    assert_eq!(preempted, 1);
    assert_eq!(sim.trace().finish_tick(a), Some(4));
}
