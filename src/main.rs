//! Kickoff entry point
//!
//! Headless match runner: a local AI-vs-AI match, or a host/client session
//! over TCP, reporting the score through the log.

use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Context;
use clap::{Parser, ValueEnum};

use kickoff::net::{ConnectionState, NetworkSync, TcpTransport, Transport};
use kickoff::sim::{Controller, Team, tick};
use kickoff::snapshot::Renderer;
use kickoff::{RenderSnapshot, SimConfig, Stepper, TickInput, World};

/// Idle time between frames of a networked session
const FRAME_SLEEP: Duration = Duration::from_millis(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Two bots, simulated as fast as possible
    Local,
    /// Accept clients and own the ball, power-ups and score
    Host,
    /// Join a host with one bot-driven car
    Client,
}

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON config file; defaults apply to missing fields
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the effective config to this path and exit
    #[arg(long)]
    write_config: Option<PathBuf>,

    /// Match length in seconds
    #[arg(short, long, default_value_t = 60.0)]
    seconds: f32,

    /// RNG seed override
    #[arg(long)]
    seed: Option<u64>,

    #[arg(short, long, value_enum, default_value_t = Mode::Local)]
    mode: Mode,

    /// Listen address (host) or host address (client)
    #[arg(short, long, default_value = "127.0.0.1:7777")]
    addr: String,

    /// Player id announced by a client
    #[arg(long, default_value_t = 1000)]
    player_id: u32,
}

/// Logs a one-line summary about once per simulated second
struct LogRenderer {
    every: u64,
    next: u64,
}

impl Renderer for LogRenderer {
    fn render(&mut self, snapshot: &RenderSnapshot) {
        if snapshot.tick < self.next {
            return;
        }
        self.next = snapshot.tick + self.every;
        let ball = snapshot.ball().map(|b| b.position).unwrap_or_default();
        log::info!(
            "t={} ball=({:.2}, {:.2}, {:.2}) pickups={} score {:?}",
            snapshot.tick,
            ball.x,
            ball.y,
            ball.z,
            snapshot.visible_powerups().count(),
            snapshot.score
        );
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => SimConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    config.validate().context("invalid config")?;

    if let Some(path) = &args.write_config {
        config.save(path)?;
        log::info!("Wrote config to {}", path.display());
        return Ok(());
    }

    let mut renderer = LogRenderer {
        every: config.tick_rate.round().max(1.0) as u64,
        next: 0,
    };
    let duration = Duration::from_secs_f32(args.seconds.max(0.0));

    let world = match args.mode {
        Mode::Local => run_local(config, duration, &mut renderer),
        Mode::Host => {
            let transport = TcpTransport::listen(&args.addr)
                .with_context(|| format!("listening on {}", args.addr))?;
            let mut world = World::new(config);
            world.add_car(Team::Red, Controller::Ai);
            world.add_car(Team::Blue, Controller::Ai);
            run_session(NetworkSync::host(transport), world, duration, &mut renderer)
        }
        Mode::Client => {
            let transport = TcpTransport::connect(&args.addr)
                .with_context(|| format!("connecting to {}", args.addr))?;
            let mut sync = NetworkSync::client(transport);
            let mut world = World::new(config);
            world.authoritative = false;
            sync.add_local_player(&mut world, args.player_id, Team::Blue, Controller::Ai);
            run_session(sync, world, duration, &mut renderer)
        }
    };

    log::info!("Final score {:?} after {} ticks", world.score.table(), world.tick);
    Ok(())
}

fn run_local(config: SimConfig, duration: Duration, renderer: &mut impl Renderer) -> World {
    let ticks = (duration.as_secs_f32() * config.tick_rate).round() as u64;
    let mut world = World::new(config);
    world.add_car(Team::Red, Controller::Ai);
    world.add_car(Team::Blue, Controller::Ai);

    let input = TickInput::default();
    for _ in 0..ticks {
        tick(&mut world, &input);
        world.events.clear();
        renderer.render(&RenderSnapshot::capture(&world));
    }
    world
}

/// Real-time loop: poll peers, advance, publish, render
fn run_session<T: Transport>(
    mut sync: NetworkSync<T>,
    mut world: World,
    duration: Duration,
    renderer: &mut impl Renderer,
) -> World {
    let mut stepper = Stepper::new(&world.config);
    let input = TickInput::default();
    let start = Instant::now();
    let mut last = start;

    while start.elapsed() < duration {
        sync.poll(&mut world);
        if sync.state() == ConnectionState::Disconnected {
            log::warn!("Lost connection to host");
            break;
        }

        let now = Instant::now();
        let frame_dt = now.duration_since(last).as_secs_f32();
        last = now;
        if stepper.advance(&mut world, frame_dt, &input) > 0 {
            let events = world.drain_events();
            sync.publish(&world, &events);
            renderer.render(&RenderSnapshot::capture(&world));
        }
        thread::sleep(FRAME_SLEEP);
    }

    log::info!("Session stats: {:?}", sync.stats());
    sync.shutdown(&mut world);
    world
}
