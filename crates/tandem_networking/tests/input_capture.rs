//! Keyboard and controller capture through the engine, and broadcast pacing.

mod common;

use std::time::{Duration, Instant};

use common::{at, connected_pair, engine, settle};
use tandem_networking::devices::BUTTON_DPAD_RIGHT;
use tandem_networking::{
    ControllerSnapshot, EngineConfig, EngineEvent, KeyCode, KeyOutcome, LoopbackNetwork,
    VirtualControllers,
};
use tandem_shared::{Arena, InputState, Slot};

fn frames_sent(engine: &tandem_networking::Engine) -> u64 {
    engine.session().channel_stats().map_or(0, |stats| stats.frames_sent)
}

#[test]
fn test_key_repeat_sends_one_input() {
    let (_network, mut host, mut guest) = connected_pair();
    let before = frames_sent(&guest);

    assert_eq!(guest.key(KeyCode::KeyD, true), KeyOutcome::Changed);
    for _ in 0..5 {
        assert_eq!(guest.key(KeyCode::KeyD, true), KeyOutcome::Unchanged);
    }
    assert_eq!(guest.key(KeyCode::ArrowRight, true), KeyOutcome::Unchanged);
    assert_eq!(guest.key(KeyCode::from("Space"), true), KeyOutcome::Unbound);
    assert_eq!(frames_sent(&guest) - before, 1);

    assert_eq!(guest.key(KeyCode::KeyD, false), KeyOutcome::Changed);
    assert_eq!(frames_sent(&guest) - before, 2);

    settle(&mut [&mut host, &mut guest]);
    assert!(host.session().remote_input().is_idle());
}

#[test]
fn test_host_keys_never_leave_the_process() {
    let (_network, mut host, mut guest) = connected_pair();
    let before = frames_sent(&host);

    host.key(KeyCode::KeyW, true);
    settle(&mut [&mut host, &mut guest]);

    assert_eq!(frames_sent(&host), before);
    assert!(host.session().local_input().up);
    assert!(guest.session().remote_input().is_idle());
}

#[test]
fn test_keys_via_event_queue() {
    let network = LoopbackNetwork::new();
    let mut solo = engine(&network);

    let _ = solo.sink().send(EngineEvent::Key {
        code: KeyCode::from("ArrowUp"),
        pressed: true,
    });
    solo.pump();

    assert_eq!(
        *solo.session().local_input(),
        InputState { up: true, ..InputState::IDLE }
    );
}

#[test]
fn test_host_binds_two_controllers() {
    let network = LoopbackNetwork::new();
    let pads = VirtualControllers::new();
    let mut host = engine(&network).with_controllers(Box::new(pads.clone()));
    let t0 = Instant::now();
    let arena = Arena::default();

    host.create_room("Ana").unwrap();
    settle(&mut [&mut host]);

    pads.plug(ControllerSnapshot::new(0, "pad-a"));
    pads.plug(ControllerSnapshot::new(1, "pad-b"));
    for index in 0..2 {
        host.handle(EngineEvent::ControllerConnected {
            index,
            name: format!("pad-{index}"),
        });
    }
    pads.set_stick(0, 0.0, -0.9);
    pads.set_button(1, BUTTON_DPAD_RIGHT, true);

    host.tick(t0);
    let controllers = host.session().controllers();
    assert_eq!((controllers.local(), controllers.remote()), (Some(0), Some(1)));
    assert!(host.session().local_input().up);
    assert!(host.session().remote_input().right);

    host.tick(at(t0, 100));
    let players = host.session().players();
    assert!(players.host.position.y < arena.spawn_point(Slot::Host).y);
    assert!(players.guest.position.x > arena.spawn_point(Slot::Guest).x);

    host.handle(EngineEvent::ControllerDisconnected {
        index: 1,
        name: "pad-1".into(),
    });
    pads.unplug(1);
    assert_eq!(host.session().controllers().remote(), None);
    assert!(host.session().remote_input().is_idle());
}

#[test]
fn test_guest_controller_sends_input() {
    let network = LoopbackNetwork::new();
    let pads = VirtualControllers::new();
    pads.plug(ControllerSnapshot::new(0, "pad-a"));
    pads.plug(ControllerSnapshot::new(1, "pad-b"));
    let mut host = engine(&network);
    // Present at startup, so polling is enabled without a connect event.
    let mut guest = engine(&network).with_controllers(Box::new(pads.clone()));
    assert!(guest.session().controllers().enabled());

    host.create_room("Ana").unwrap();
    settle(&mut [&mut host, &mut guest]);
    guest.join_room("Bo", "R1").unwrap();
    settle(&mut [&mut host, &mut guest]);
    let t0 = Instant::now();

    pads.set_stick(0, 0.8, 0.0);
    pads.set_stick(1, -0.8, 0.0);
    guest.tick(t0);
    settle(&mut [&mut host, &mut guest]);

    assert_eq!(guest.session().controllers().remote(), None);
    assert_eq!(
        *host.session().remote_input(),
        InputState { right: true, ..InputState::IDLE }
    );

    // Polls are paced; a tick 5 ms later does not sample.
    pads.set_stick(0, 0.0, 0.0);
    guest.tick(at(t0, 5));
    settle(&mut [&mut host, &mut guest]);
    assert!(host.session().remote_input().right);

    guest.tick(at(t0, 20));
    settle(&mut [&mut host, &mut guest]);
    assert!(host.session().remote_input().is_idle());
}

#[test]
fn test_resting_controller_overwrites_keyboard() {
    let network = LoopbackNetwork::new();
    let pads = VirtualControllers::new();
    pads.plug(ControllerSnapshot::new(0, "pad"));
    let mut host = engine(&network).with_controllers(Box::new(pads.clone()));
    host.create_room("Ana").unwrap();
    settle(&mut [&mut host]);
    let t0 = Instant::now();

    host.tick(t0);
    assert_eq!(host.session().controllers().local(), Some(0));
    host.key(KeyCode::KeyA, true);
    assert!(host.session().local_input().left);

    // Not yet due: the key survives until the next poll.
    host.tick(at(t0, 5));
    assert!(host.session().local_input().left);

    host.tick(at(t0, 20));
    assert!(host.session().local_input().is_idle());
}

#[test]
fn test_resting_controller_release_reaches_host() {
    let network = LoopbackNetwork::new();
    let pads = VirtualControllers::new();
    pads.plug(ControllerSnapshot::new(0, "pad"));
    let mut host = engine(&network);
    let mut guest = engine(&network).with_controllers(Box::new(pads.clone()));
    host.create_room("Ana").unwrap();
    settle(&mut [&mut host, &mut guest]);
    guest.join_room("Bo", "R1").unwrap();
    settle(&mut [&mut host, &mut guest]);
    let t0 = Instant::now();

    guest.tick(t0);
    guest.key(KeyCode::ArrowDown, true);
    settle(&mut [&mut host, &mut guest]);
    assert!(host.session().remote_input().down);

    let before = frames_sent(&guest);
    guest.tick(at(t0, 20));
    settle(&mut [&mut host, &mut guest]);

    assert_eq!(frames_sent(&guest) - before, 1);
    assert!(host.session().remote_input().is_idle());
}

fn broadcasts_over_one_second(tick_hz: u32) -> u64 {
    let (_network, mut host, mut guest) = connected_pair();
    let t0 = Instant::now();
    let step = Duration::from_secs(1) / tick_hz;

    host.tick(t0);
    let before = frames_sent(&host);
    for frame in 1..=tick_hz {
        host.tick(t0 + step * frame);
    }
    settle(&mut [&mut host, &mut guest]);
    frames_sent(&host) - before
}

#[test]
fn test_broadcast_rate_holds_across_tick_rates() {
    let expected = u64::from(EngineConfig::default().simulation.broadcast_hz);
    for tick_hz in [60, 90, 144, 240] {
        let sent = broadcasts_over_one_second(tick_hz);
        assert!(
            sent.abs_diff(expected) <= 1,
            "{tick_hz} Hz ticks sent {sent} snapshots"
        );
    }
}

#[test]
fn test_no_broadcast_without_guest() {
    let network = LoopbackNetwork::new();
    let mut host = engine(&network);
    let t0 = Instant::now();
    host.create_room("Ana").unwrap();
    settle(&mut [&mut host]);

    host.key(KeyCode::KeyD, true);
    for frame in 0..30 {
        host.tick(at(t0, frame * 16));
    }

    assert_eq!(host.session().simulation().stats().broadcasts, 0);
    assert!(host.session().players().host.position.x > Arena::default().spawn_point(Slot::Host).x);
}
