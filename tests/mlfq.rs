mod common;

use common::*;
use sched_sim::*;

fn level(n: u8) -> Level {
    Level::new(n).unwrap()
}

#[test]
fn test_bursts_follow_level_quanta() {
    setup_test();
    let mut sim = simulator(PolicyKind::Mlfq);
    let a = add_busy(&mut sim, "A", 0, 6);

    step_checked(&mut sim);
    assert_eq!(sim.state().process(a).unwrap().mlfq_level, level(2));
    assert_eq!(sim.state().level_queue(level(2)).preview(), vec![a]);
    step_checked(&mut sim);
    assert_eq!(sim.state().process(a).unwrap().mlfq_level, level(3));

    assert_eq!(run_checked(&mut sim), RunOutcome::Completed);
    assert_eq!(sim.trace().bursts_of(a), vec![1, 2, 3]);
}

#[test]
fn test_bottom_level_keeps_quantum_eight() {
    setup_test();
    let mut sim = simulator(PolicyKind::Mlfq);
    let a = add_busy(&mut sim, "A", 0, 23);

    for _ in 0..4 {
        step_checked(&mut sim);
    }
    assert_eq!(sim.state().process(a).unwrap().mlfq_level, Level::BOTTOM);
    assert_eq!(sim.state().ready_queue().preview(), vec![a]);

    run_checked(&mut sim);
    assert_eq!(sim.trace().bursts_of(a), vec![1, 2, 4, 8, 8]);
    assert_all_finished(&sim);
}

#[test]
fn test_four_instruction_process() {
    setup_test();
    let mut sim = simulator(PolicyKind::Mlfq);
    let a = add_busy(&mut sim, "A", 0, 4);

    run_checked(&mut sim);
    assert_eq!(sim.trace().bursts_of(a), vec![1, 2, 1]);
}

#[test]
fn test_new_arrival_enters_top_level() {
    setup_test();
    let mut sim = simulator(PolicyKind::Mlfq);
    let a = add_busy(&mut sim, "A", 0, 10);
    let b = add_busy(&mut sim, "B", 2, 2);

    step_checked(&mut sim);
    step_checked(&mut sim);
    // B arrived during A's level-2 burst.
    assert_eq!(sim.state().level_queue(Level::TOP).preview(), vec![b]);
    assert_eq!(sim.state().level_queue(level(3)).preview(), vec![a]);

    assert_eq!(run_checked(&mut sim), RunOutcome::Completed);
    let order = sim.trace().dispatch_order();
    assert_eq!(&order[..9], &[a, a, a, b, b, a, a, a, a]);
    assert_eq!(sim.trace().bursts_of(b), vec![1, 1]);
}

#[test]
fn test_blocking_on_last_quantum_instruction_demotes_on_wake() {
    setup_test();
    let mut sim = simulator(PolicyKind::Mlfq);
    let a = add(
        &mut sim,
        "A",
        0,
        0,
        &["semWait file", "assign a 1", "semSignal file"],
    );
    let b = add(&mut sim, "B", 0, 0, &["semWait file", "assign c 1"]);

    step_checked(&mut sim);
    assert_eq!(step_checked(&mut sim), StepOutcome::Blocked { pid: b });
    let pcb = sim.state().process(b).unwrap();
    assert_eq!(pcb.mlfq_level, Level::TOP);
    assert!(pcb.demote_pending);

    // A's level-2 burst ends with the signal that wakes B.
    assert_eq!(
        step_checked(&mut sim),
        StepOutcome::Ran {
            pid: a,
            instructions: 2
        }
    );
    let pcb = sim.state().process(b).unwrap();
    assert_eq!(pcb.mlfq_level, level(2));
    assert!(!pcb.demote_pending);
    assert_eq!(sim.state().level_queue(level(2)).preview(), vec![b]);
    assert!(sim.trace().events().iter().any(|e| e.kind
        == TraceKind::Demoted {
            pid: b,
            level: level(2)
        }));

    assert_eq!(run_checked(&mut sim), RunOutcome::Completed);
    assert_all_finished(&sim);
}

#[test]
fn test_finishing_on_last_quantum_instruction_is_not_requeued() {
    setup_test();
    let mut sim = simulator(PolicyKind::Mlfq);
    let a = add_busy(&mut sim, "A", 0, 1);

    assert_eq!(
        step_checked(&mut sim),
        StepOutcome::Ran {
            pid: a,
            instructions: 1
        }
    );
    assert_eq!(sim.state().queued(), 0);
    assert_eq!(sim.state().process(a).unwrap().state, ProcessState::Finished);
    assert_eq!(step_checked(&mut sim), StepOutcome::Done);
}

#[test]
fn test_higher_level_always_served_first() {
    setup_test();
    let mut sim = simulator(PolicyKind::Mlfq);
    let a = add_busy(&mut sim, "A", 0, 3);
    let b = add_busy(&mut sim, "B", 0, 3);
    let c = add_busy(&mut sim, "C", 0, 3);

    run_checked(&mut sim);
    // Every process gets its level-1 burst before anyone runs at level 2.
    assert_eq!(sim.trace().dispatch_order(), vec![a, b, c, a, a, b, b, c, c]);
}
