use std::sync::{Arc, Mutex};

use glam::Vec3;

use super::*;
use crate::channel::ChannelState;
use crate::interactable::Interactable;
use crate::types::InteractionOption;
use crate::world::{Placement, WorldObject};

type Log = Arc<Mutex<Vec<InteractionEvent>>>;

fn record(interactor: &mut Interactor) -> Log {
    let log: Log = Arc::default();
    let sink = Arc::clone(&log);
    interactor.subscribe(move |event| sink.lock().unwrap().push(event.clone()));
    log
}

fn kinds(log: &Log) -> Vec<EventKind> {
    log.lock().unwrap().iter().map(InteractionEvent::kind).collect()
}

/// Event kinds without the targeting pair, which ticking interleaves.
fn flow(log: &Log) -> Vec<EventKind> {
    kinds(log)
        .into_iter()
        .filter(|kind| !matches!(kind, EventKind::TargetFound | EventKind::TargetLost))
        .collect()
}

fn terminal(log: &Log) -> Vec<InteractionEvent> {
    log.lock()
        .unwrap()
        .iter()
        .filter(|event| event.is_terminal())
        .cloned()
        .collect()
}

struct Scene {
    world: World,
    player: EntityId,
    sword: EntityId,
    uses: Arc<Mutex<u32>>,
}

/// A player at the origin facing +X and a sword 200 units ahead.
fn scene() -> Scene {
    let mut world = World::new();
    let player = world.spawn(WorldObject::new(Placement::at(Vec3::ZERO).facing(Vec3::X))).unwrap();
    let uses = Arc::new(Mutex::new(0));
    let counter = Arc::clone(&uses);
    let sword = world.spawn(
        WorldObject::new(Placement::at(Vec3::new(200.0, 0.0, 0.0)))
            .with_radius(10.0)
            .with_interactable(
                Interactable::new(vec![InteractionOption::new(
                    InteractionTag::PICKUP,
                    "Pick Up Sword",
                )])
                .with_handler(move |_: EntityId, _: &InteractionTag| {
                    *counter.lock().unwrap() += 1;
                    InteractionResult::Success
                }),
            ),
    ).unwrap();
    Scene {
        world,
        player,
        sword,
        uses,
    }
}

fn uses(scene: &Scene) -> u32 {
    *scene.uses.lock().unwrap()
}

/// Requester on a replica plus its mirror on the authoritative world.
struct Split {
    scene: Scene,
    replica: World,
    requester: Interactor,
    mirror: Interactor,
}

fn split() -> Split {
    let scene = scene();
    let replica = World::from_snapshot(scene.world.snapshot()).unwrap();
    let config = InteractionConfig::default();
    Split {
        requester: Interactor::new(scene.player, Role::Requester, config.clone()),
        mirror: Interactor::new(scene.player, Role::Authority, config),
        scene,
        replica,
    }
}

impl Split {
    /// Delivers requests to the mirror and notifies back to the requester.
    fn pump(&mut self) {
        for request in self.requester.drain_requests() {
            self.mirror.handle_request(&mut self.scene.world, request);
        }
        for notify in self.mirror.drain_notifies() {
            self.requester.handle_notify(&self.replica, notify);
        }
    }

    fn tick(&mut self, dt: f32) {
        self.requester.tick(&mut self.replica, dt);
        self.mirror.tick(&mut self.scene.world, dt);
    }
}

// ============================================================================
// Targeting
// ============================================================================

#[test]
fn detection_pass_reports_found_then_lost() {
    let mut scene = scene();
    let mut interactor = Interactor::new(scene.player, Role::Standalone, InteractionConfig::default());
    let log = record(&mut interactor);

    interactor.update_targets(&scene.world);
    interactor.update_targets(&scene.world);
    assert_eq!(interactor.current_target(), Some(scene.sword));
    assert_eq!(
        *log.lock().unwrap(),
        vec![InteractionEvent::TargetFound {
            target: scene.sword
        }]
    );

    scene.world.interactable_mut(scene.sword).unwrap().disable();
    interactor.update_targets(&scene.world);
    interactor.update_targets(&scene.world);
    assert_eq!(interactor.current_target(), None);
    assert_eq!(kinds(&log), vec![EventKind::TargetFound, EventKind::TargetLost]);
}

#[test]
fn switching_best_target_emits_lost_before_found() {
    let mut scene = scene();
    let mut interactor = Interactor::new(scene.player, Role::Standalone, InteractionConfig::default());
    interactor.update_targets(&scene.world);
    let log = record(&mut interactor);

    let chest = scene.world.spawn(
        WorldObject::new(Placement::at(Vec3::new(50.0, 0.0, 0.0))).with_interactable(
            Interactable::new(vec![InteractionOption::new(InteractionTag::OPEN, "Open")])
                .with_priority(10),
        ),
    ).unwrap();
    interactor.update_targets(&scene.world);

    assert_eq!(
        *log.lock().unwrap(),
        vec![
            InteractionEvent::TargetLost {
                target: scene.sword
            },
            InteractionEvent::TargetFound { target: chest },
        ]
    );
    assert_eq!(interactor.prompt(&scene.world).unwrap().text, "Open");
}

#[test]
fn tick_runs_detection_on_cadence_only_for_detecting_roles() {
    let mut scene = scene();
    let config = InteractionConfig::default().with_detection_interval(0.5);
    let mut standalone = Interactor::new(scene.player, Role::Standalone, config.clone());
    let mut authority = Interactor::new(scene.player, Role::Authority, config);

    standalone.tick(&mut scene.world, 0.1);
    authority.tick(&mut scene.world, 0.1);

    assert_eq!(standalone.current_target(), Some(scene.sword));
    assert_eq!(authority.current_target(), None);

    scene.world.despawn(scene.sword);
    standalone.tick(&mut scene.world, 0.1);
    assert_eq!(standalone.current_target(), Some(scene.sword));
    for _ in 0..4 {
        standalone.tick(&mut scene.world, 0.1);
    }
    assert_eq!(standalone.current_target(), None);
}

// ============================================================================
// Instant path
// ============================================================================

#[test]
fn standalone_interaction_brackets_execution_with_events() {
    let mut scene = scene();
    let mut interactor = Interactor::new(scene.player, Role::Standalone, InteractionConfig::default());
    interactor.update_targets(&scene.world);
    let log = record(&mut interactor);

    let result = interactor.try_interact(&mut scene.world, None);

    assert_eq!(result, InteractionResult::Success);
    assert_eq!(uses(&scene), 1);
    assert_eq!(kinds(&log), vec![EventKind::Started, EventKind::Completed]);
    let events = log.lock().unwrap();
    let InteractionEvent::Started { context } = &events[0] else {
        panic!("expected started");
    };
    assert_eq!(context.distance, 200.0);
    assert_eq!(
        events[1],
        InteractionEvent::Completed {
            context: context.clone(),
            result: InteractionResult::Success
        }
    );
}

#[test]
fn local_validation_failures_emit_nothing() {
    let mut scene = scene();
    let mut interactor = Interactor::new(
        scene.player,
        Role::Standalone,
        InteractionConfig::default().with_range(150.0),
    );
    let log = record(&mut interactor);

    assert_eq!(interactor.try_interact(&mut scene.world, None), InteractionResult::Failed);
    assert_eq!(
        interactor.try_interact_with(&mut scene.world, scene.sword, None),
        InteractionResult::OutOfRange
    );

    scene.world.interactable_mut(scene.sword).unwrap().disable();
    assert_eq!(
        interactor.try_interact_with(&mut scene.world, scene.sword, None),
        InteractionResult::NotAllowed
    );
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(uses(&scene), 0);
}

#[test]
fn unknown_kind_fails_after_started() {
    let mut scene = scene();
    let mut interactor = Interactor::new(scene.player, Role::Standalone, InteractionConfig::default());
    let log = record(&mut interactor);

    let result =
        interactor.try_interact_with(&mut scene.world, scene.sword, Some(InteractionTag::TALK));

    assert_eq!(result, InteractionResult::Failed);
    assert_eq!(kinds(&log), vec![EventKind::Started, EventKind::Failed]);
}

#[test]
fn requester_gets_in_progress_then_exactly_one_outcome() {
    let mut split = split();
    let sword = split.scene.sword;
    let log = record(&mut split.requester);

    let result = split
        .requester
        .try_interact_with(&mut split.replica, sword, None);
    assert_eq!(result, InteractionResult::InProgress);
    assert!(log.lock().unwrap().is_empty());
    assert_eq!(uses(&split.scene), 0);

    let requests = split.requester.drain_requests();
    assert_eq!(requests.len(), 1);
    let notify_source = requests.clone();
    for request in requests {
        split.mirror.handle_request(&mut split.scene.world, request);
    }
    let notifies = split.mirror.drain_notifies();
    assert_eq!(notifies.len(), 1);
    assert_eq!(notifies[0].request, notify_source[0].id());
    assert_eq!(notifies[0].result, InteractionResult::Success);

    // A duplicated delivery must not produce a second event.
    for notify in [notifies[0].clone(), notifies[0].clone()] {
        split.requester.handle_notify(&split.replica, notify);
    }

    assert_eq!(uses(&split.scene), 1);
    assert_eq!(terminal(&log).len(), 1);
    assert_eq!(kinds(&log), vec![EventKind::Completed]);
    assert_eq!(split.requester.pending_requests(), 0);
}

#[test]
fn authority_rechecks_range_with_latency_tolerance() {
    let mut split = split();
    let sword = split.scene.sword;
    let config = InteractionConfig::default().with_range(200.0);
    split.requester = Interactor::new(split.scene.player, Role::Requester, config.clone());
    split.mirror = Interactor::new(split.scene.player, Role::Authority, config);
    let log = record(&mut split.requester);

    // 210 is past the requester's range but inside 200 * 1.1.
    split
        .scene
        .world
        .set_position(sword, Vec3::new(210.0, 0.0, 0.0))
        .unwrap();
    assert_eq!(
        split.requester.try_interact_with(&mut split.replica, sword, None),
        InteractionResult::InProgress
    );
    split.pump();
    assert_eq!(uses(&split.scene), 1);

    split
        .scene
        .world
        .set_position(sword, Vec3::new(230.0, 0.0, 0.0))
        .unwrap();
    split.requester.try_interact_with(&mut split.replica, sword, None);
    split.pump();
    assert_eq!(uses(&split.scene), 1);

    let outcomes: Vec<_> = terminal(&log)
        .into_iter()
        .map(|event| match event {
            InteractionEvent::Completed { result, .. } | InteractionEvent::Failed { result, .. } => {
                result
            }
            other => panic!("unexpected {other:?}"),
        })
        .collect();
    assert_eq!(
        outcomes,
        vec![InteractionResult::Success, InteractionResult::OutOfRange]
    );
}

#[test]
fn authority_reports_target_gone_between_request_and_processing() {
    let mut split = split();
    let sword = split.scene.sword;
    let log = record(&mut split.requester);

    split.requester.try_interact_with(&mut split.replica, sword, None);
    split.scene.world.despawn(sword);
    split.pump();

    assert_eq!(kinds(&log), vec![EventKind::Failed]);
    assert!(matches!(
        log.lock().unwrap()[0],
        InteractionEvent::Failed {
            result: InteractionResult::Failed,
            ..
        }
    ));
}

#[test]
fn requests_to_a_requester_are_ignored() {
    let mut split = split();
    let sword = split.scene.sword;
    split.requester.handle_request(
        &mut split.replica,
        AuthorityRequest::Interact {
            request: RequestId(0),
            target: sword,
            kind: None,
        },
    );
    assert!(split.requester.drain_notifies().is_empty());
}

// ============================================================================
// Channeled path
// ============================================================================

#[test]
fn standalone_channel_runs_to_completion() {
    let mut scene = scene();
    let mut interactor = Interactor::new(scene.player, Role::Standalone, InteractionConfig::default());
    let log = record(&mut interactor);

    interactor
        .start_channel(&scene.world, scene.sword, None, 10.0)
        .unwrap();
    for _ in 0..10 {
        interactor.tick(&mut scene.world, 1.0);
    }

    assert_eq!(flow(&log).first(), Some(&EventKind::Started));
    let events = log.lock().unwrap().clone();
    let progress: Vec<f32> = events
        .iter()
        .filter_map(|event| match event {
            InteractionEvent::Progress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect();
    assert_eq!(progress.len(), 10);
    assert!(progress.iter().all(|p| *p <= 1.0));
    assert_eq!(progress.last(), Some(&1.0));
    assert_eq!(events.last().map(InteractionEvent::kind), Some(EventKind::Completed));
    assert_eq!(uses(&scene), 1);
    assert_eq!(interactor.channel().state(), ChannelState::Idle);
}

#[test]
fn second_start_leaves_live_session_untouched() {
    let mut scene = scene();
    let other = scene
        .world
        .spawn(WorldObject::new(Placement::at(Vec3::new(0.0, 100.0, 0.0))).with_interactable(
            Interactable::new(vec![InteractionOption::new(InteractionTag::USE, "Use")]),
        )).unwrap();
    let mut interactor = Interactor::new(scene.player, Role::Standalone, InteractionConfig::default());

    interactor
        .start_channel(&scene.world, scene.sword, None, 10.0)
        .unwrap();
    interactor.tick(&mut scene.world, 2.0);

    assert_eq!(
        interactor.start_channel(&scene.world, other, None, 3.0),
        Err(ChannelError::AlreadyChanneling)
    );
    assert_eq!(interactor.channel().target(), Some(scene.sword));
    assert_eq!(interactor.channel().elapsed(), 2.0);
}

#[test]
fn moving_past_threshold_cancels_with_failed_event() {
    let mut scene = scene();
    let mut interactor = Interactor::new(scene.player, Role::Standalone, InteractionConfig::default());
    let log = record(&mut interactor);
    interactor
        .start_channel(&scene.world, scene.sword, Some(InteractionTag::PICKUP), 10.0)
        .unwrap();

    scene
        .world
        .set_position(scene.player, Vec3::new(0.0, 51.0, 0.0))
        .unwrap();
    interactor.tick(&mut scene.world, 1.0);

    assert_eq!(flow(&log), vec![EventKind::Started, EventKind::Failed]);
    assert!(matches!(
        terminal(&log).as_slice(),
        [InteractionEvent::Failed {
            result: InteractionResult::Cancelled,
            ..
        }]
    ));
    assert_eq!(uses(&scene), 0);
    assert!(!interactor.channel().is_channeling());
}

#[test]
fn damage_cancels_only_when_policy_allows() {
    let mut scene = scene();
    let config = InteractionConfig::default().with_cancel_policy(CancelPolicy::MOVEMENT);
    let mut tough = Interactor::new(scene.player, Role::Standalone, config);
    tough
        .start_channel(&scene.world, scene.sword, None, 10.0)
        .unwrap();
    assert!(!tough.notify_damage(&scene.world));
    assert!(tough.channel().is_channeling());

    let mut fragile = Interactor::new(scene.player, Role::Standalone, InteractionConfig::default());
    fragile
        .start_channel(&scene.world, scene.sword, None, 10.0)
        .unwrap();
    assert!(fragile.notify_damage(&scene.world));
    assert!(!fragile.channel().is_channeling());
    assert!(!fragile.cancel_channel(&scene.world));
    fragile.tick(&mut scene.world, 20.0);
    assert_eq!(uses(&scene), 0);
}

#[test]
fn remote_channel_completes_through_the_authority() {
    let mut split = split();
    let sword = split.scene.sword;
    let log = record(&mut split.requester);
    let mirror_log = record(&mut split.mirror);

    split
        .requester
        .start_channel(&split.replica, sword, None, 2.0)
        .unwrap();
    split.pump();
    assert!(split.mirror.channel().is_channeling());

    split.tick(1.0);
    split.tick(1.0);
    // Requester's clock finished without executing anything.
    assert_eq!(terminal(&log).len(), 0);
    split.pump();

    assert_eq!(uses(&split.scene), 1);
    assert_eq!(
        flow(&log),
        vec![
            EventKind::Started,
            EventKind::Progress,
            EventKind::Progress,
            EventKind::Completed
        ]
    );
    assert_eq!(kinds(&mirror_log).last(), Some(&EventKind::Completed));
    assert_eq!(split.requester.pending_requests(), 0);
}

#[test]
fn requester_cancel_is_applied_silently_on_the_authority() {
    let mut split = split();
    let sword = split.scene.sword;
    let log = record(&mut split.requester);

    split
        .requester
        .start_channel(&split.replica, sword, None, 5.0)
        .unwrap();
    split.pump();
    split.tick(1.0);

    assert!(split.requester.cancel_channel(&split.replica));
    let requests = split.requester.drain_requests();
    assert!(matches!(
        requests.as_slice(),
        [AuthorityRequest::ChannelCancel { .. }]
    ));
    for request in requests {
        split.mirror.handle_request(&mut split.scene.world, request);
    }

    assert!(!split.mirror.channel().is_channeling());
    assert!(split.mirror.drain_notifies().is_empty());
    assert_eq!(terminal(&log).len(), 1);
    assert_eq!(split.requester.pending_requests(), 0);
}

#[test]
fn lagging_requester_cancel_wins_locally_after_authority_completion() {
    let mut split = split();
    let sword = split.scene.sword;
    let log = record(&mut split.requester);

    split
        .requester
        .start_channel(&split.replica, sword, None, 2.0)
        .unwrap();
    split.pump();
    // Only the authority advances, so it finishes before the requester cancels.
    split.mirror.tick(&mut split.scene.world, 1.0);
    split.mirror.tick(&mut split.scene.world, 1.0);
    assert_eq!(uses(&split.scene), 1);

    assert!(split.requester.cancel_channel(&split.replica));
    split.pump();

    // The late success notify is stale: one local cancel, no second outcome.
    let outcomes = terminal(&log);
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0],
        InteractionEvent::Failed {
            result: InteractionResult::Cancelled,
            ..
        }
    ));
    assert_eq!(split.requester.pending_requests(), 0);
    assert!(!split.mirror.channel().is_channeling());
}

#[test]
fn authority_cancel_terminates_requester_session() {
    let mut split = split();
    let sword = split.scene.sword;
    let log = record(&mut split.requester);

    split
        .requester
        .start_channel(&split.replica, sword, None, 5.0)
        .unwrap();
    split.pump();
    split.tick(1.0);

    assert!(split.mirror.notify_damage(&split.scene.world));
    split.pump();

    assert!(!split.requester.channel().is_channeling());
    let outcomes = terminal(&log);
    assert_eq!(outcomes.len(), 1);
    assert!(matches!(
        outcomes[0],
        InteractionEvent::Failed {
            result: InteractionResult::Cancelled,
            ..
        }
    ));

    // Ticking on does not produce another terminal event.
    for _ in 0..10 {
        split.tick(1.0);
    }
    split.pump();
    assert_eq!(terminal(&log).len(), 1);
}

#[test]
fn rejected_remote_start_reports_specific_code() {
    let mut split = split();
    let sword = split.scene.sword;
    let log = record(&mut split.requester);

    split
        .requester
        .start_channel(&split.replica, sword, None, 5.0)
        .unwrap();
    split
        .scene
        .world
        .interactable_mut(sword)
        .unwrap()
        .disable();
    split.pump();

    assert!(!split.mirror.channel().is_channeling());
    assert!(!split.requester.channel().is_channeling());
    assert_eq!(
        terminal(&log),
        vec![InteractionEvent::Failed {
            context: split.replica.context(split.scene.player, Some(sword), None),
            result: InteractionResult::NotAllowed,
        }]
    );
}
