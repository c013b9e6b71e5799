use manga_core::{update, ShutdownEffect, ShutdownMsg, ShutdownState};

#[test]
fn single_interrupt_walks_to_stopped() {
    let state = ShutdownState::default();
    assert!(state.accepts_new_tasks());

    let (state, effects) = update(state, ShutdownMsg::Interrupt);
    assert_eq!(state, ShutdownState::StopRequested);
    assert_eq!(effects, vec![ShutdownEffect::HaltScheduling]);
    assert!(!state.accepts_new_tasks());

    let (state, effects) = update(state, ShutdownMsg::DrainStarted { in_flight: 2 });
    assert_eq!(state, ShutdownState::Draining);
    assert!(effects.is_empty());

    let (state, effects) = update(state, ShutdownMsg::Drained);
    assert_eq!(state, ShutdownState::Stopped);
    assert_eq!(effects, vec![ShutdownEffect::Exit]);
}

#[test]
fn repeated_interrupts_are_ignored_in_every_later_state() {
    for state in [
        ShutdownState::StopRequested,
        ShutdownState::Draining,
        ShutdownState::Stopped,
    ] {
        let (next, effects) = update(state, ShutdownMsg::Interrupt);
        assert_eq!(next, state);
        assert_eq!(effects, vec![ShutdownEffect::IgnoredInterrupt]);
    }
}

#[test]
fn stop_with_nothing_in_flight_skips_draining() {
    let (state, _) = update(ShutdownState::Running, ShutdownMsg::Interrupt);
    let (state, effects) = update(state, ShutdownMsg::Drained);
    assert_eq!(state, ShutdownState::Stopped);
    assert_eq!(effects, vec![ShutdownEffect::Exit]);
}

#[test]
fn drain_messages_without_a_stop_are_noops() {
    let (state, effects) = update(ShutdownState::Running, ShutdownMsg::Drained);
    assert_eq!(state, ShutdownState::Running);
    assert!(effects.is_empty());

    let (state, effects) = update(
        ShutdownState::Running,
        ShutdownMsg::DrainStarted { in_flight: 1 },
    );
    assert_eq!(state, ShutdownState::Running);
    assert!(effects.is_empty());
}
