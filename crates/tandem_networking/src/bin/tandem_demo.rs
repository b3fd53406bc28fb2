//! # Tandem Demo
//!
//! Runs a host and a guest in one process over the loopback transport and
//! plays a short scripted session: the guest drives with a virtual
//! controller, the host with the keyboard.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=tandem_networking=debug tandem_demo --seconds 5 --config tandem.toml
//! ```

use std::process::ExitCode;
use std::time::Instant;

use tandem_networking::devices::BUTTON_DPAD_UP;
use tandem_networking::{
    Command, ControllerSnapshot, Engine, EngineConfig, EngineEvent, EventSink, FrameClock,
    KeyCode, LoopbackNetwork, RenderSink, Scene, VirtualControllers, DISPLAY_HZ,
};
use tracing::{error, info};

/// Logs player positions every `every` frames.
struct TraceRenderer {
    label: &'static str,
    every: u64,
    frames: u64,
}

impl RenderSink for TraceRenderer {
    fn draw(&mut self, scene: &Scene<'_>) {
        self.frames += 1;
        if self.frames % self.every != 0 {
            return;
        }
        let (host, guest) = (&scene.players.host, &scene.players.guest);
        info!(
            view = self.label,
            mode = scene.mode,
            host = %format!("{} ({:.1}, {:.1})", scene.host_label, host.position.x, host.position.y),
            guest = %format!("{} ({:.1}, {:.1})", scene.guest_label, guest.position.x, guest.position.y),
            "frame"
        );
    }
}

struct Options {
    seconds: u64,
    config: Option<String>,
}

fn parse_args() -> Option<Options> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options {
        seconds: 4,
        config: None,
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--seconds" | "-s" => {
                if i + 1 < args.len() {
                    options.seconds = args[i + 1].parse().unwrap_or(4).max(1);
                    i += 1;
                }
            }
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    options.config = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Usage: tandem_demo [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --seconds <N>     Length of the scripted session (default: 4)");
                println!("  -c, --config <PATH>   TOML engine config");
                println!("  -h, --help            Print help");
                return None;
            }
            other => {
                eprintln!("Unknown argument: {other}");
            }
        }
        i += 1;
    }
    Some(options)
}

/// Posts `event`. Returns false if the engine behind `sink` is gone.
fn post(sink: &EventSink, event: impl Into<EngineEvent>) -> bool {
    match sink.send(event.into()) {
        Ok(()) => true,
        Err(err) => {
            error!(event = ?err.into_inner(), "Engine queue closed");
            false
        }
    }
}

/// Pumps both engines until neither has anything left to do.
fn settle(host: &mut Engine, guest: &mut Engine) {
    while host.pump() + guest.pump() > 0 {}
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tandem_networking=info,tandem_demo=info".into()),
        )
        .init();

    let Some(options) = parse_args() else {
        return ExitCode::SUCCESS;
    };
    let config = match options.config.as_deref().map(EngineConfig::load) {
        Some(Ok(config)) => config,
        Some(Err(err)) => {
            error!(error = %err, "Could not load config");
            return ExitCode::FAILURE;
        }
        None => EngineConfig::default(),
    };

    let network = LoopbackNetwork::new();
    let pads = VirtualControllers::new();

    let engines = Engine::new(config.clone(), Box::new(network.clone()))
        .and_then(|host| Ok((host, Engine::new(config, Box::new(network.clone()))?)));
    let (host, guest) = match engines {
        Ok(pair) => pair,
        Err(err) => {
            error!(error = %err, "Invalid engine config");
            return ExitCode::FAILURE;
        }
    };
    let mut host = host.with_renderer(Box::new(TraceRenderer {
        label: "host",
        every: u64::from(DISPLAY_HZ),
        frames: 0,
    }));
    let mut guest = guest
        .with_controllers(Box::new(pads.clone()))
        .with_renderer(Box::new(TraceRenderer {
            label: "guest",
            every: u64::from(DISPLAY_HZ),
            frames: 0,
        }));

    if let Err(err) = host.create_room("Ana") {
        error!(error = %err, "Could not create room");
        return ExitCode::FAILURE;
    }
    settle(&mut host, &mut guest);
    let Some(room) = host.session().room_id().cloned() else {
        error!(status = host.session().status(), "Host never got a room id");
        return ExitCode::FAILURE;
    };

    let guest_sink = guest.sink();
    let host_sink = host.sink();
    let join = Command::JoinRoom {
        name: "Bo".into(),
        room: room.to_string(),
    };
    if !post(&guest_sink, join) {
        return ExitCode::FAILURE;
    }
    settle(&mut host, &mut guest);

    let mut clock = FrameClock::new(DISPLAY_HZ);
    let mut interval = tokio::time::interval(clock.frame_duration());
    let total_frames = options.seconds * u64::from(DISPLAY_HZ);

    for frame in 0..total_frames {
        interval.tick().await;

        // Scripted input, one second per beat.
        let mut script: Vec<(&EventSink, EngineEvent)> = Vec::new();
        match frame {
            30 => {
                pads.plug(ControllerSnapshot::new(0, "Virtual Pad"));
                pads.set_stick(0, 0.9, 0.0);
                script.push((
                    &guest_sink,
                    EngineEvent::ControllerConnected {
                        index: 0,
                        name: "Virtual Pad".into(),
                    },
                ));
            }
            90 => {
                pads.set_stick(0, 0.0, 0.0);
                pads.set_button(0, BUTTON_DPAD_UP, true);
                script.push((
                    &host_sink,
                    EngineEvent::Key {
                        code: KeyCode::from("KeyS"),
                        pressed: true,
                    },
                ));
                script.push((&guest_sink, Command::SendChat("going up".into()).into()));
            }
            150 => {
                pads.set_button(0, BUTTON_DPAD_UP, false);
                script.push((
                    &host_sink,
                    EngineEvent::Key {
                        code: KeyCode::from("KeyS"),
                        pressed: false,
                    },
                ));
            }
            _ => {}
        }

        let start = clock.begin_frame(Instant::now());
        script.push((&host_sink, EngineEvent::Tick(start)));
        script.push((&guest_sink, EngineEvent::Tick(start)));
        if !script.into_iter().all(|(sink, event)| post(sink, event)) {
            return ExitCode::FAILURE;
        }
        settle(&mut host, &mut guest);
        clock.end_frame(start, Instant::now());
    }

    if !post(&guest_sink, Command::Leave) {
        return ExitCode::FAILURE;
    }
    settle(&mut host, &mut guest);

    let stats = clock.stats();
    info!(
        frames = stats.total_frames,
        late = stats.late_frames,
        avg_us = stats.avg_frame_us,
        broadcasts = host.session().simulation().stats().broadcasts,
        "Demo finished"
    );
    for entry in host.session().log().entries() {
        println!("host  {entry}");
    }
    for entry in guest.session().log().entries() {
        println!("guest {entry}");
    }
    ExitCode::SUCCESS
}
