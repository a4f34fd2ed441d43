use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use treasure_core::{Entity, GlobalId, GraphError, GraphResult, HidingSpotId};
use treasure_game::{GameSetup, GameStatus, GameStore, InMemoryGameStore};
use treasure_graph::{
    ConnectionArgs, EngineConfig, Field, InProcessTransport, MutationRequest, MutationResponse,
    MutationState, NodeType, Selection, Session, Transport,
};

fn setup() -> GameSetup {
    GameSetup::default().with_turns(9).with_treasure_at(0)
}

fn watched_session(config: &EngineConfig) -> Session {
    let session = Session::start(&setup(), config).unwrap();
    session.watch_game(&Selection::all_of(NodeType::Game));
    session
        .watch_hiding_spots(&ConnectionArgs::default(), &Selection::all_of(NodeType::HidingSpot))
        .unwrap();
    session
}

fn game_ref() -> GlobalId {
    GlobalId::new("Game", "1")
}

fn spot_ref(id: u32) -> GlobalId {
    GlobalId::new("HidingSpot", id.to_string())
}

#[tokio::test(start_paused = true)]
async fn check_spot_predicts_then_reconciles_impact_fields() {
    let config = EngineConfig::default().with_dispatch_delay(Duration::from_secs(2));
    let session = watched_session(&config);

    let pending = session.check_spot(HidingSpotId::new(3));
    assert_eq!(
        pending.optimistic().to_json(),
        json!({
            "game": {"id": "R2FtZTox", "turnsRemaining": 8},
            "hidingSpot": {"id": "SGlkaW5nU3BvdDoz", "hasBeenChecked": true},
        })
    );
    session.read_client(|c| {
        assert_eq!(c.read(&game_ref(), Field::GameTurnsRemaining), Some(json!(8)));
        assert_eq!(c.read(&spot_ref(3), Field::HidingSpotHasBeenChecked), Some(json!(true)));
        assert!(c.has_optimistic_update(&spot_ref(3)));
    });

    let reconciled = pending.settle().await.unwrap();
    let mut fields: Vec<_> = reconciled.fields().map(|f| f.path()).collect();
    fields.sort();
    assert_eq!(
        fields,
        vec!["game.turnsRemaining", "hidingSpot.hasBeenChecked", "hidingSpot.hasTreasure"]
    );
    assert_eq!(reconciled.get(Field::HidingSpotHasTreasure), Some(&json!(false)));

    session.read_client(|c| {
        assert!(!c.has_optimistic_update(&spot_ref(3)));
        assert_eq!(c.read(&spot_ref(3), Field::HidingSpotHasTreasure), Some(json!(false)));
    });
}

#[tokio::test]
async fn only_watched_fields_are_reconciled() {
    let session = Session::start(&setup(), &EngineConfig::default()).unwrap();
    session
        .watch_hiding_spots(
            &ConnectionArgs::default(),
            &Selection::of([Field::HidingSpotHasBeenChecked]),
        )
        .unwrap();

    let reconciled = session.check_spot(HidingSpotId::new(1)).settle().await.unwrap();
    assert_eq!(reconciled.fields().collect::<Vec<_>>(), vec![Field::HidingSpotHasBeenChecked]);
}

#[tokio::test(start_paused = true)]
async fn back_to_back_checks_apply_in_order() {
    let config = EngineConfig::default().with_dispatch_delay(Duration::from_secs(2));
    let session = watched_session(&config);

    let first = session.check_spot(HidingSpotId::new(1));
    let second = session.check_spot(HidingSpotId::new(2));
    assert_eq!(first.conflict_key(), second.conflict_key());
    assert_eq!(second.optimistic().get(Field::GameTurnsRemaining), Some(&json!(7)));

    let first = first.settle().await.unwrap();
    assert_eq!(first.get(Field::GameTurnsRemaining), Some(&json!(8)));
    session.read_client(|c| {
        assert_eq!(c.pending_mutations(&game_ref()).len(), 1);
        assert_eq!(c.read(&game_ref(), Field::GameTurnsRemaining), Some(json!(7)));
    });

    let second = second.settle().await.unwrap();
    assert_eq!(second.get(Field::GameTurnsRemaining), Some(&json!(7)));
    assert_eq!(session.query().fetch_game().turns_remaining(), 7);
}

#[tokio::test]
async fn turns_never_go_below_zero() {
    let session = Session::start(
        &GameSetup::default().with_turns(1).with_treasure_at(8),
        &EngineConfig::default(),
    )
    .unwrap();
    session.watch_game(&Selection::all_of(NodeType::Game));

    let first = session.check_spot(HidingSpotId::new(0)).settle().await.unwrap();
    assert_eq!(first.get(Field::GameTurnsRemaining), Some(&json!(0)));
    assert_eq!(session.status(), GameStatus::Lost);

    let pending = session.check_spot(HidingSpotId::new(1));
    assert_eq!(pending.optimistic().get(Field::GameTurnsRemaining), Some(&json!(0)));
    let second = pending.settle().await.unwrap();
    assert_eq!(second.get(Field::GameTurnsRemaining), Some(&json!(0)));
}

#[tokio::test]
async fn unknown_spot_rolls_back_and_leaves_board_alone() {
    let session = watched_session(&EngineConfig::default());
    let mut transitions = session.subscribe();

    let err = session.check_spot(HidingSpotId::new(42)).settle().await.unwrap_err();
    assert!(matches!(err, GraphError::NotFound(_)));

    assert_eq!(session.query().fetch_game().turns_remaining(), 9);
    session.read_client(|c| {
        assert!(!c.has_optimistic_update(&game_ref()));
        assert_eq!(c.read(&game_ref(), Field::GameTurnsRemaining), Some(json!(9)));
    });

    let states: Vec<_> = std::iter::from_fn(|| transitions.try_recv().ok()).collect();
    assert_eq!(states.len(), 3);
    assert_eq!(states[2].state, MutationState::Failed);
    assert_eq!(states[2].error.as_deref(), Some("not_found"));
}

#[tokio::test(start_paused = true)]
async fn dispatch_timeout_rolls_back() {
    let config = EngineConfig::default()
        .with_dispatch_delay(Duration::from_secs(2))
        .with_dispatch_timeout(Duration::from_millis(500));
    let session = watched_session(&config);

    let err = session.check_spot(HidingSpotId::new(3)).settle().await.unwrap_err();
    assert_eq!(err, GraphError::Timeout(Duration::from_millis(500)));

    let spot = session
        .query()
        .registry()
        .store()
        .hiding_spot(HidingSpotId::new(3))
        .unwrap();
    assert!(!spot.has_been_checked());
    session.read_client(|c| {
        assert_eq!(c.read(&spot_ref(3), Field::HidingSpotHasBeenChecked), Some(json!(false)));
    });
}

#[tokio::test]
async fn transitions_follow_the_lifecycle() {
    let session = watched_session(&EngineConfig::default());
    let mut transitions = session.subscribe();

    let pending = session.check_spot(HidingSpotId::new(0));
    let id = pending.id();
    pending.settle().await.unwrap();

    let seen: Vec<_> = std::iter::from_fn(|| transitions.try_recv().ok()).collect();
    assert!(seen.iter().all(|t| t.mutation_id == id));
    assert_eq!(
        seen.iter().map(|t| t.state).collect::<Vec<_>>(),
        vec![MutationState::Pending, MutationState::Dispatched, MutationState::Reconciled]
    );
    assert_eq!(session.status(), GameStatus::Won);
}

#[tokio::test]
async fn unchecked_spots_hide_treasure() {
    let session = watched_session(&EngineConfig::default());

    let spot = session.query().fetch(&spot_ref(0).encode()).unwrap().unwrap();
    assert_eq!(spot.value(Field::HidingSpotHasTreasure), Some(json!(null)));
    session.read_client(|c| {
        assert_eq!(c.read(&spot_ref(0), Field::HidingSpotHasTreasure), Some(json!(null)));
    });
}

struct RejectingTransport;

#[async_trait]
impl Transport for RejectingTransport {
    async fn deliver(&self, _request: &MutationRequest) -> GraphResult<MutationResponse> {
        Err(GraphError::transport("server unavailable"))
    }
}

#[tokio::test]
async fn custom_transport_failures_surface_to_the_caller() {
    let store = Arc::new(InMemoryGameStore::new(&setup()).unwrap());
    let session =
        Session::with_transport(Arc::clone(&store), RejectingTransport, &EngineConfig::default());
    session.watch_game(&Selection::all_of(NodeType::Game));

    let err = session.check_spot(HidingSpotId::new(2)).settle().await.unwrap_err();
    assert!(matches!(err, GraphError::Transport(_)));
    assert_eq!(err.code(), "transport_error");
    assert_eq!(store.game().global_id(), game_ref());
    assert_eq!(session.shutdown().await, GameStatus::InProgress);
}

#[tokio::test]
async fn shutdown_settles_outstanding_mutations() {
    let store = Arc::new(InMemoryGameStore::new(&setup()).unwrap());
    let transport = InProcessTransport::new(Arc::clone(&store));
    let session = Session::with_transport(Arc::clone(&store), transport, &EngineConfig::default());

    for i in 1..=3 {
        let _ = session.check_spot(HidingSpotId::new(i));
    }
    assert_eq!(session.shutdown().await, GameStatus::InProgress);
    assert_eq!(store.game().turns_remaining(), 6);
}
