use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tracing::{info, Level};

use arena_core::catalog::WeaponCatalog;
use arena_core::config::SimConfig;
use arena_core::net::session::{self, Session};
use arena_core::net::sync::{BufferedInterpolation, LatestSnapshot, SnapshotStrategy};
use arena_core::net::transport::MemoryHub;
use arena_core::net::protocol::InputFrame;
use arena_core::sim::constants::tick::{DT, TICK_DURATION_MS};
use arena_core::sim::context::SimContext;
use arena_core::util::vec2::Vec2;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .init();

    info!("Arena Core v{}", env!("CARGO_PKG_VERSION"));

    let config = SimConfig::load_or_default();
    config.validate().map_err(anyhow::Error::msg)?;
    info!(
        "Configuration loaded: room={}, name={}, arena={}",
        config.room, config.player_name, config.arena_half_extent
    );

    let hub = if config.loss > 0.0 {
        MemoryHub::with_loss(config.loss)
    } else {
        MemoryHub::new()
    };

    let strategy: Box<dyn SnapshotStrategy + Send> = if config.buffered_interp {
        Box::new(BufferedInterpolation::new(config.interp_delay_ms))
    } else {
        Box::<LatestSnapshot>::default()
    };

    let mut session = session::establish(&hub, &config.room, &config.player_name, strategy)?;
    info!("Session established as {:?}", session.role());

    let catalog = Arc::new(WeaponCatalog::builtin());
    let arena_half = Vec2::ONE * config.arena_half_extent;
    let mut ctx = SimContext::new(catalog, arena_half);

    if let Session::Host(_) = session {
        ctx.generate_arena(config.food_count, config.wall_count);
        let mut rng = rand::thread_rng();
        for _ in 0..config.dummy_count {
            let pos = random_position(&mut rng, arena_half * 0.4);
            ctx.spawn_dummy(pos);
        }
        for _ in 0..config.enemy_count {
            let pos = random_position(&mut rng, arena_half * 0.8);
            ctx.spawn_enemy(pos, 0);
        }
        let spawn = random_position(&mut rng, arena_half * 0.3);
        ctx.local_player = ctx.spawn_player(&config.player_name, spawn, 1);
        info!(
            "Arena ready: {} entities, local player {:?}",
            ctx.entities.len(),
            ctx.local_player
        );
    }

    let mut interval = tokio::time::interval(Duration::from_millis(TICK_DURATION_MS));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let run = async {
        loop {
            interval.tick().await;
            let now = session::now_ms();
            match &mut session {
                Session::Offline => ctx.step(DT),
                Session::Host(host) => host.step(&mut ctx, DT, now),
                Session::Client(client) => {
                    // Headless peer; send an idle frame to stay registered
                    let _ = client.send_input(InputFrame::default());
                    client.step(&mut ctx, DT, now);
                }
            }
            ctx.drain_audio();

            // Periodic status line, roughly every five seconds
            if ctx.tick % 150 == 0 {
                let stats = ctx.ui_stats();
                info!(
                    "tick={} entities={} score={} level={}",
                    ctx.tick, stats.live_entities, stats.score, stats.level
                );
            }
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
        }
        info!("Shutdown signal received");
    };

    tokio::select! {
        _ = run => {}
        _ = shutdown => {
            info!("Shutting down...");
        }
    }

    info!("Simulation stopped at tick {}", ctx.tick);
    Ok(())
}

fn random_position(rng: &mut impl Rng, half: Vec2) -> Vec2 {
    Vec2::new(
        rng.gen_range(-half.x..=half.x),
        rng.gen_range(-half.y..=half.y),
    )
}
