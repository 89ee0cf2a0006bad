//! End-to-end flows across the requester/authority boundary.
//!
//! Every test runs on paused time: the workers tick on their own intervals
//! and the clock only advances while the test awaits.

use std::sync::Arc;
use std::time::Duration;

use glam::Vec3;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::time::{sleep, timeout};

use interaction_core::{
    ChannelState, EntityId, InteractableEvent, InteractableSpec, InteractionEvent,
    InteractionOption, InteractionResult, InteractionTag, ObjectSpec, Placement, Role, World,
    WorldCommand, WorldObject,
};
use interaction_runtime::{
    Event, ItemInstance, MemoryItemSink, RequesterHandle, Runtime, RuntimeConfig, RuntimeError,
    Topic,
};

struct Harness {
    runtime: Runtime,
    player: EntityId,
    sink: Arc<MemoryItemSink>,
}

async fn harness() -> Harness {
    let mut world = World::new();
    let player = world.spawn(WorldObject::new(
        Placement::at(Vec3::ZERO).facing(Vec3::X),
    )).unwrap();
    let sink = Arc::new(MemoryItemSink::new(10));
    let runtime = Runtime::builder()
        .world(world)
        .requester(player)
        .item_sink(sink.clone())
        .build()
        .await
        .expect("runtime should start");
    Harness {
        runtime,
        player,
        sink,
    }
}

fn door_at(position: Vec3) -> ObjectSpec {
    ObjectSpec {
        placement: Placement::at(position),
        radius: 30.0,
        collidable: true,
        interactable: Some(InteractableSpec {
            enabled: true,
            options: vec![InteractionOption::new(InteractionTag::OPEN, "Open").hold()],
            priority: 0,
        }),
    }
}

async fn wait_for_target(requester: &RequesterHandle, target: Option<EntityId>) {
    for _ in 0..100 {
        let status = requester.status().await.expect("status");
        if status.current_target == target {
            return;
        }
        sleep(Duration::from_millis(50)).await;
    }
    panic!("requester never settled on {target:?}");
}

async fn wait_for_event(
    rx: &mut broadcast::Receiver<Event>,
    mut matches: impl FnMut(&Event) -> bool,
) -> Event {
    timeout(Duration::from_secs(10), async {
        loop {
            match rx.recv().await {
                Ok(event) if matches(&event) => return event,
                Ok(_) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => panic!("event bus closed"),
            }
        }
    })
    .await
    .expect("event not received in time")
}

/// Terminal event produced on the requester side.
fn requester_outcome(event: &Event) -> Option<(bool, InteractionResult)> {
    let inner = event.interactor_event()?;
    if inner.side != Role::Requester {
        return None;
    }
    match &inner.event {
        InteractionEvent::Completed { result, .. } => Some((true, *result)),
        InteractionEvent::Failed { result, .. } => Some((false, *result)),
        _ => None,
    }
}

#[tokio::test(start_paused = true)]
async fn pickup_completes_through_the_authority() {
    let Harness {
        runtime,
        player,
        sink,
    } = harness().await;
    let authority = runtime.authority();
    let requester = runtime.requester(player).unwrap();
    let mut interactions = runtime.subscribe(Topic::Interaction);

    let sword = ItemInstance::new("weapon.sword", "Sword", 1);
    let item = authority
        .spawn_item(sword.clone(), Vec3::new(200.0, 0.0, 0.0))
        .await
        .unwrap()
        .expect("pool should hand out an item");
    wait_for_target(&requester, Some(item)).await;

    let prompt = requester.status().await.unwrap().prompt.unwrap();
    assert_eq!(prompt.text, "Pick Up Sword");

    assert_eq!(
        requester.try_interact(None).await.unwrap(),
        InteractionResult::InProgress
    );
    let outcome = wait_for_event(&mut interactions, |event| requester_outcome(event).is_some()).await;
    assert_eq!(
        requester_outcome(&outcome),
        Some((true, InteractionResult::Success))
    );
    assert_eq!(sink.items_of(player), vec![sword]);

    // The pool parks the item on its next tick and the replica follows.
    wait_for_target(&requester, None).await;
    let stats = authority.pool_stats().await.unwrap();
    assert_eq!(stats.active, 0);
    assert_eq!(requester.status().await.unwrap().pending_requests, 0);

    drop((authority, requester));
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn local_precheck_rejects_without_a_round_trip() {
    let Harness {
        runtime, player, ..
    } = harness().await;
    let authority = runtime.authority();
    let requester = runtime.requester(player).unwrap();

    let mut spec = door_at(Vec3::new(100.0, 0.0, 0.0));
    if let Some(interactable) = spec.interactable.as_mut() {
        interactable.enabled = false;
    }
    let locked = authority.spawn(spec).await.unwrap();
    let far = authority.spawn(door_at(Vec3::new(5000.0, 0.0, 0.0))).await.unwrap();
    sleep(Duration::from_millis(200)).await;

    assert_eq!(
        requester.try_interact_with(locked, None).await.unwrap(),
        InteractionResult::NotAllowed
    );
    // A non-authoritative distance failure is reported as a plain failure.
    assert_eq!(
        requester.try_interact_with(far, None).await.unwrap(),
        InteractionResult::Failed
    );
    assert_eq!(
        requester.try_interact(None).await.unwrap(),
        InteractionResult::Failed
    );
    assert_eq!(requester.status().await.unwrap().pending_requests, 0);

    drop((authority, requester));
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn channel_completes_after_its_duration() {
    let Harness {
        runtime, player, ..
    } = harness().await;
    let authority = runtime.authority();
    let requester = runtime.requester(player).unwrap();
    let mut interactions = runtime.subscribe(Topic::Interaction);
    let mut interactables = runtime.subscribe(Topic::Interactable);

    let door = authority.spawn(door_at(Vec3::new(150.0, 0.0, 0.0))).await.unwrap();
    wait_for_target(&requester, Some(door)).await;

    requester.start_channel(None, 1.0).await.unwrap();
    let status = requester.status().await.unwrap();
    assert_eq!(status.channel_state, ChannelState::Channeling);

    let second = requester.start_channel(None, 1.0).await;
    assert!(matches!(second, Err(RuntimeError::Channel(_))));

    let outcome = wait_for_event(&mut interactions, |event| requester_outcome(event).is_some()).await;
    assert_eq!(
        requester_outcome(&outcome),
        Some((true, InteractionResult::Success))
    );

    let triggered = wait_for_event(&mut interactables, |event| {
        matches!(event, Event::Interactable { entity, event: InteractableEvent::Triggered { .. } } if *entity == door)
    })
    .await;
    let Event::Interactable {
        event: InteractableEvent::Triggered { interactor, kind },
        ..
    } = triggered
    else {
        unreachable!()
    };
    assert_eq!(interactor, player);
    assert_eq!(kind, InteractionTag::OPEN);

    let status = requester.status().await.unwrap();
    assert_eq!(status.channel_state, ChannelState::Idle);
    assert_eq!(status.pending_requests, 0);

    drop((authority, requester));
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn moving_away_cancels_the_channel() {
    let Harness {
        runtime, player, ..
    } = harness().await;
    let authority = runtime.authority();
    let requester = runtime.requester(player).unwrap();
    let mut interactions = runtime.subscribe(Topic::Interaction);

    let door = authority.spawn(door_at(Vec3::new(150.0, 0.0, 0.0))).await.unwrap();
    wait_for_target(&requester, Some(door)).await;
    requester.start_channel_with(door, None, 5.0).await.unwrap();

    authority
        .apply(WorldCommand::Move {
            id: player,
            position: Vec3::new(0.0, 120.0, 0.0),
        })
        .await
        .unwrap();

    let outcome = wait_for_event(&mut interactions, |event| requester_outcome(event).is_some()).await;
    assert_eq!(
        requester_outcome(&outcome),
        Some((false, InteractionResult::Cancelled))
    );

    drop((authority, requester));
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn damage_cancels_on_the_authority() {
    let Harness {
        runtime, player, ..
    } = harness().await;
    let authority = runtime.authority();
    let requester = runtime.requester(player).unwrap();
    let mut interactions = runtime.subscribe(Topic::Interaction);

    let door = authority.spawn(door_at(Vec3::new(150.0, 0.0, 0.0))).await.unwrap();
    wait_for_target(&requester, Some(door)).await;
    requester.start_channel(None, 5.0).await.unwrap();
    sleep(Duration::from_millis(200)).await;

    assert!(authority.damage(player).await.unwrap());
    let outcome = wait_for_event(&mut interactions, |event| requester_outcome(event).is_some()).await;
    assert_eq!(
        requester_outcome(&outcome),
        Some((false, InteractionResult::Cancelled))
    );
    assert!(!authority.damage(player).await.unwrap());

    drop((authority, requester));
    runtime.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn requester_cancel_is_immediate() {
    let Harness {
        runtime, player, ..
    } = harness().await;
    let authority = runtime.authority();
    let requester = runtime.requester(player).unwrap();

    let door = authority.spawn(door_at(Vec3::new(150.0, 0.0, 0.0))).await.unwrap();
    wait_for_target(&requester, Some(door)).await;
    requester.start_channel(None, 5.0).await.unwrap();

    assert!(requester.cancel_channel().await.unwrap());
    assert!(!requester.cancel_channel().await.unwrap());
    let status = requester.status().await.unwrap();
    assert_eq!(status.channel_state, ChannelState::Idle);
    assert_eq!(status.pending_requests, 0);

    // The authority drops its session silently, so nothing cancels later.
    sleep(Duration::from_millis(200)).await;
    assert!(!authority.damage(player).await.unwrap());

    drop((authority, requester));
    runtime.shutdown().await.unwrap();
}

#[tokio::test]
async fn builder_rejects_unusable_runtime_config() {
    for tick_rate_hz in [1.0e12, f32::INFINITY, f32::NAN, 0.0] {
        let config = RuntimeConfig {
            tick_rate_hz,
            ..RuntimeConfig::default()
        };
        let error = Runtime::builder()
            .config(config)
            .build()
            .await
            .err()
            .expect("an unusable tick rate must be refused");
        assert!(matches!(error, RuntimeError::InvalidTickRate(_)));
    }

    let config = RuntimeConfig {
        command_buffer_size: 0,
        ..RuntimeConfig::default()
    };
    let error = Runtime::builder().config(config).build().await.err();
    assert!(matches!(
        error,
        Some(RuntimeError::ZeroBuffer { name: "command" })
    ));
}

#[tokio::test]
async fn builder_rejects_unknown_bodies() {
    let error = Runtime::builder()
        .requester(EntityId(7))
        .build()
        .await
        .err()
        .expect("a requester needs a body");
    assert!(matches!(error, RuntimeError::MissingInteractor(EntityId(7))));

    let Harness { runtime, .. } = harness().await;
    assert!(matches!(
        runtime.requester(EntityId(42)),
        Err(RuntimeError::UnknownRequester(EntityId(42)))
    ));
    runtime.shutdown().await.unwrap();
}
