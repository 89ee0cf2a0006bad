//! Scripted walk-through exercising instant, pooled and channeled interactions.
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use glam::Vec3;
use serde_json::{Value, json};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};
use tracing::{debug, info, warn};

use interaction_core::{
    EntityId, Interactable, InteractionOption, InteractionResult, InteractionTag, Placement,
    ViewPoint, World, WorldCommand, WorldObject,
};
use interaction_runtime::{
    EventBus, ItemInstance, MemoryItemSink, RequesterHandle, Runtime, Topic,
};

use crate::config::DemoConfig;

/// Entities placed in the initial authoritative world.
#[derive(Debug, Clone, Copy)]
pub struct Scene {
    pub player: EntityId,
    pub chest: EntityId,
    pub lever: EntityId,
}

/// Builds the starting world: a player at the origin looking down +X, a chest
/// ahead and a lever behind.
pub fn build_world() -> Result<(World, Scene)> {
    let mut world = World::new();
    let player = world.spawn(WorldObject::new(
        Placement::at(Vec3::ZERO)
            .facing(Vec3::X)
            .with_view(ViewPoint {
                origin: Vec3::new(0.0, 0.0, 60.0),
                forward: Vec3::X,
            }),
    ))?;

    let chest = world.spawn(
        WorldObject::new(Placement::at(Vec3::new(300.0, 0.0, 0.0)))
            .with_radius(40.0)
            .with_interactable(
                Interactable::new(vec![
                    InteractionOption::new(InteractionTag::OPEN, "Open Chest").hold(),
                ])
                .with_priority(2)
                .with_handler(|interactor: EntityId, _kind: &InteractionTag| {
                    info!(target: "demo", %interactor, "chest opened");
                    InteractionResult::Success
                }),
            ),
    )?;

    let lever = world.spawn(
        WorldObject::new(Placement::at(Vec3::new(-400.0, 0.0, 0.0)))
            .with_radius(20.0)
            .with_interactable(Interactable::new(vec![InteractionOption::new(
                InteractionTag::USE,
                "Pull Lever",
            )
            .hold()])),
    )?;

    Ok((world, Scene { player, chest, lever }))
}

/// Runs the script and returns a JSON summary of the final state.
pub async fn run(config: DemoConfig) -> Result<Value> {
    let started = Instant::now();
    let (world, scene) = build_world()?;
    let sink = Arc::new(MemoryItemSink::new(8));

    let runtime = Runtime::builder()
        .config(config.runtime.clone())
        .world(world)
        .requester(scene.player)
        .item_sink(sink.clone())
        .build()
        .await
        .context("failed to build runtime")?;
    let authority = runtime.authority();
    let requester = runtime.requester(scene.player)?;
    let printers = spawn_printers(authority.event_bus());

    let sword = authority
        .spawn_item(
            ItemInstance::new("weapon.sword", "Sword", 1),
            Vec3::new(150.0, 40.0, 0.0),
        )
        .await?
        .context("item pool exhausted")?;
    let potion = authority
        .spawn_item(
            ItemInstance::new("consumable.potion", "Potion", 3),
            Vec3::new(1400.0, 0.0, 0.0),
        )
        .await?;
    debug!(target: "demo", %sword, ?potion, "items spawned");

    // Instant pickup of whatever scores best; the sword is closest.
    wait_for_target(&requester, Duration::from_secs(2)).await;
    let result = requester.try_interact(None).await?;
    info!(target: "demo", %result, "pickup requested");
    sleep(Duration::from_millis(300)).await;

    // Hold to open the chest.
    requester
        .start_channel_with(scene.chest, Some(InteractionTag::OPEN), 1.0)
        .await?;
    sleep(Duration::from_millis(1300)).await;

    // Walk towards the potion; the authority moves the body and replicas follow.
    authority
        .apply(WorldCommand::Move {
            id: scene.player,
            position: Vec3::new(1000.0, 0.0, 0.0),
        })
        .await?;
    sleep(Duration::from_millis(400)).await;
    if let Some(potion) = potion {
        let result = requester
            .try_interact_with(potion, Some(InteractionTag::PICKUP))
            .await?;
        info!(target: "demo", %result, "potion pickup requested");
    }
    sleep(Duration::from_millis(300)).await;

    // Back to the lever, then take a hit while channeling.
    authority
        .apply(WorldCommand::Move {
            id: scene.player,
            position: Vec3::new(-300.0, 0.0, 0.0),
        })
        .await?;
    sleep(Duration::from_millis(400)).await;
    match requester.start_channel_with(scene.lever, None, 3.0).await {
        Ok(()) => {
            sleep(Duration::from_millis(500)).await;
            let cancelled = authority.damage(scene.player).await?;
            info!(target: "demo", cancelled, "player damaged");
        }
        Err(error) => warn!(target: "demo", %error, "lever channel refused"),
    }

    if let Some(remaining) = config.duration.checked_sub(started.elapsed()) {
        sleep(remaining).await;
    }

    let status = requester.status().await?;
    let pool = authority.pool_stats().await?;
    let inventory: Vec<Value> = sink
        .items_of(scene.player)
        .into_iter()
        .map(|item| json!({ "definition": item.definition, "quantity": item.quantity }))
        .collect();

    // Workers stop only once every handle clone is gone.
    drop(requester);
    drop(authority);
    runtime.shutdown().await?;
    for printer in printers {
        if let Err(error) = printer.await {
            warn!(target: "demo", %error, "event printer failed");
        }
    }

    Ok(json!({
        "summary": {
            "status": status,
            "pool": pool,
            "inventory": inventory,
        }
    }))
}

async fn wait_for_target(requester: &RequesterHandle, limit: Duration) {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        match requester.status().await {
            Ok(status) if status.current_target.is_some() => return,
            Ok(_) => sleep(Duration::from_millis(50)).await,
            Err(error) => {
                warn!(target: "demo", %error, "status query failed");
                return;
            }
        }
    }
    warn!(target: "demo", "no target acquired in time");
}

/// One task per topic, printing each event as a JSON line until the bus closes.
fn spawn_printers(bus: &EventBus) -> Vec<JoinHandle<()>> {
    Topic::ALL
        .iter()
        .map(|topic| {
            let mut rx = bus.subscribe(*topic);
            let topic = *topic;
            tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(event) => match serde_json::to_string(&event) {
                            Ok(line) => println!("{line}"),
                            Err(error) => warn!(target: "demo", %error, "failed to encode event"),
                        },
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(target: "demo", %topic, skipped, "event printer lagged");
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_places_targets_around_the_player() {
        let (world, scene) = build_world().unwrap();
        assert_eq!(world.len(), 3);
        assert_eq!(world.distance(scene.player, scene.chest), Some(300.0));
        assert!(world.interactable(scene.lever).is_some());
        assert!(world.interactable(scene.player).is_none());
    }
}
