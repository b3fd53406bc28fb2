//! Shared helpers for the integration tests.

#![allow(dead_code)]

use std::time::{Duration, Instant};

use tandem_networking::{Engine, EngineConfig, LoopbackNetwork, Phase};

/// Engine on `network` with the default config.
pub fn engine(network: &LoopbackNetwork) -> Engine {
    Engine::new(EngineConfig::default(), Box::new(network.clone())).unwrap()
}

/// Pumps every engine until all queues are empty.
pub fn settle(engines: &mut [&mut Engine]) {
    loop {
        let handled: usize = engines.iter_mut().map(|engine| engine.pump()).sum();
        if handled == 0 {
            return;
        }
    }
}

/// `t0 + ms` milliseconds.
pub fn at(t0: Instant, ms: u64) -> Instant {
    t0 + Duration::from_millis(ms)
}

/// Host "Ana" on R1 with guest "Bo" attached, handshake complete.
pub fn connected_pair() -> (LoopbackNetwork, Engine, Engine) {
    let network = LoopbackNetwork::new();
    let mut host = engine(&network);
    let mut guest = engine(&network);

    host.create_room("Ana").unwrap();
    settle(&mut [&mut host, &mut guest]);
    guest.join_room("Bo", "R1").unwrap();
    settle(&mut [&mut host, &mut guest]);

    assert_eq!(host.session().phase(), Phase::Connected);
    assert_eq!(guest.session().phase(), Phase::Connected);
    (network, host, guest)
}
