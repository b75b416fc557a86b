//! Skillcast - scripted skill system demo
//!
//! Spawns a player owner and a mirror that follows it in remote mode, plays
//! a timeline of input events through them, and exports a status snapshot.

mod demo;
mod settings;
mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skillcast_core::{FrameClock, OwnerId, TimeConfig};
use skillcast_remote::RuntimeAgent;
use skillcast_skill::{Dispatch, OwnerConfig, Outcome, SkillCatalog, SkillWorld};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use demo::Script;
use settings::DemoSettings;
use snapshot::{OwnerSnapshot, SnapshotData};

/// Seconds between two status pushes from the player to its mirror
const SYNC_INTERVAL: f64 = 1.0;

fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to set subscriber")?;

    info!("Starting skillcast demo...");

    let settings = DemoSettings::load();
    if std::env::args().any(|arg| arg == "--write-settings") {
        settings.save().context("Failed to save settings")?;
    }

    let catalog = match &settings.catalog_path {
        Some(path) => SkillCatalog::load(path)
            .with_context(|| format!("Failed to load skill catalog {}", path.display()))?,
        None => SkillCatalog::from_toml_str(demo::DEFAULT_CATALOG).context("Built-in skill catalog is invalid")?,
    };

    let mut world = SkillWorld::new(catalog, demo::logic_library());
    if settings.remote.enabled {
        let agent = RuntimeAgent::new(demo::simulated_authority(&settings.remote))
            .context("Failed to start remote agent")?
            .with_timeout(Duration::from_millis(settings.remote.timeout_ms));
        world = world.with_remote_agent(Arc::new(agent));
    }

    let mut player_config = settings.owner.clone();
    if player_config.preload.is_empty() {
        player_config.preload = world.catalog().ids().map(String::from).collect();
    }
    let player = world.spawn_owner(&player_config).context("Failed to spawn player")?;

    let mirror_config = OwnerConfig {
        local: false,
        ..player_config.clone()
    };
    let mirror = world.spawn_owner(&mirror_config).context("Failed to spawn mirror")?;
    world
        .router_mut(mirror)?
        .set_event_hook(|event| debug!("Mirror forwarded '{}' to the authority", event));

    let mut clock = FrameClock::new(TimeConfig {
        time_scale: settings.simulation.time_scale,
        ..Default::default()
    });
    let frame_delta = settings.simulation.frame_delta.max(0.001);
    let mut script = Script::demo();
    let mut next_sync = SYNC_INTERVAL;

    while clock.now() < settings.simulation.duration as f64 || !script.is_finished() {
        clock.advance(frame_delta);

        for event in script.due(clock.now()) {
            for dispatch in world.invoke(player, &event)? {
                log_dispatch(&event, &dispatch);
            }
            world.invoke(mirror, &event)?;
        }

        for (owner, report) in world.update(&clock) {
            if owner != player {
                continue;
            }
            for id in &report.committed {
                info!("'{}' confirmed by the authority", id);
            }
            for id in report.failed.iter().chain(&report.withdrawn) {
                info!("'{}' was not confirmed", id);
            }
            if report.regenerated > 0 {
                debug!("{} charges regenerated", report.regenerated);
            }
        }

        if clock.now() >= next_sync {
            next_sync += SYNC_INTERVAL;
            sync_mirror(&mut world, player, mirror)?;
        }

        std::thread::sleep(Duration::from_secs_f32(frame_delta));
    }

    if let Some(router) = world.router(player) {
        for (id, status) in router.status() {
            info!(
                "{}: {} charges, {:.2}s cooldown",
                id,
                status.charges,
                status.remaining_cooldown.max(0.0)
            );
        }
    }

    if settings.simulation.export_snapshot {
        export_and_verify(&mut world, player, clock.now())?;
    }

    info!("Demo finished after {} frames", clock.frame_count);
    Ok(())
}

fn log_dispatch(event: &str, dispatch: &Dispatch) {
    match dispatch.outcome {
        Outcome::Rejected(reason) => debug!("'{}' -> {}: {}", event, dispatch.skill_id, reason),
        outcome => info!("'{}' -> {} ({:?}): {:?}", event, dispatch.skill_id, dispatch.role, outcome),
    }
}

/// Push the player's status to its mirror, as an authority would.
fn sync_mirror(world: &mut SkillWorld, player: OwnerId, mirror: OwnerId) -> Result<()> {
    let status = world.router_mut(player)?.status();
    world.router_mut(mirror)?.set_status(&status);
    Ok(())
}

fn export_and_verify(world: &mut SkillWorld, player: OwnerId, now: f64) -> Result<()> {
    let owners: Vec<OwnerSnapshot> = world
        .owners()
        .filter_map(|owner| {
            world.router(owner).map(|router| OwnerSnapshot {
                owner,
                skills: router.status(),
            })
        })
        .collect();
    let data = SnapshotData::new(now, owners);

    let path = snapshot::export_snapshot(&snapshot::snapshot_dir()?, &data)?;
    info!("Exported snapshot to {}", path.display());

    // Restoring the export must leave the player unchanged
    let restored = snapshot::load_snapshot(&path)?;
    let status = restored
        .owner(player)
        .context("Player missing from the exported snapshot")?;
    let router = world.router_mut(player)?;
    router.set_status(status);
    debug!("Restored {} skills from the snapshot", router.status().len());
    Ok(())
}
