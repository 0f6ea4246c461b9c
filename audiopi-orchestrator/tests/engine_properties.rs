//! Property-based tests for concurrent intent submission

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;

use proptest::prelude::*;

use audiopi_orchestrator::{Engine, EngineConfig, Intent};
use audiopi_state::{
    EntityId, EventBus, OrchestrationEvent, Source, SourceKind, SourceRegistry, ZoneRegistry,
};
use audiopi_supervisor::testing::ScriptedBackend;
use audiopi_supervisor::{RestartPolicy, Supervisor};

// ============================================================================
// Test Helpers
// ============================================================================

const SOURCE_IDS: [&str; 3] = ["airplay", "spotify", "dlna"];

#[derive(Debug, Clone)]
enum Op {
    Activate(usize),
    Deactivate(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..SOURCE_IDS.len()).prop_map(Op::Activate),
        1 => (0..SOURCE_IDS.len()).prop_map(Op::Deactivate),
    ]
}

/// Submit every op from its own task at once and return the event log
fn run_concurrently(ops: Vec<Op>) -> (Vec<OrchestrationEvent>, usize) {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .unwrap();

    runtime.block_on(async move {
        let bus = EventBus::default();
        let sources = Arc::new(SourceRegistry::new(
            vec![
                Source::new("airplay", SourceKind::Airplay, "AirPlay"),
                Source::new("spotify", SourceKind::Spotify, "Spotify"),
                Source::new("dlna", SourceKind::Dlna, "DLNA"),
            ],
            bus.clone(),
        ));
        let zones = Arc::new(ZoneRegistry::new(Vec::new(), bus.clone()));

        let (supervisor, observations) = Supervisor::new(
            RestartPolicy::default().with_health_interval(Duration::from_secs(60)),
        );
        let mut backends = HashMap::new();
        for id in SOURCE_IDS {
            let backend = Arc::new(ScriptedBackend::new(id));
            backend.set_start_delay(Duration::from_millis(1));
            supervisor.register(EntityId::Source(id.into()), backend.clone());
            backends.insert(id, backend);
        }

        let engine = Engine::spawn(
            EngineConfig::default().with_queue_capacity(4),
            sources.clone(),
            zones,
            supervisor,
            observations,
            HashMap::new(),
        );

        let tasks: Vec<_> = ops
            .into_iter()
            .map(|op| {
                let engine = engine.clone();
                tokio::spawn(async move {
                    let intent = match op {
                        Op::Activate(i) => Intent::ActivateSource {
                            source: SOURCE_IDS[i].into(),
                        },
                        Op::Deactivate(i) => Intent::DeactivateSource {
                            source: SOURCE_IDS[i].into(),
                        },
                    };
                    engine.submit(intent).await
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let running = backends.values().filter(|b| b.is_running()).count();
        let events = bus.since(0).events.into_iter().map(|e| e.event).collect();
        engine.shutdown().await;
        (events, running)
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Replaying the event log never finds two sources Active at once,
    /// and the processes agree with the final state.
    #[test]
    fn prop_concurrent_activations_keep_one_active(
        ops in prop::collection::vec(op_strategy(), 1..16)
    ) {
        let (events, running) = run_concurrently(ops);

        let mut active = BTreeSet::new();
        for event in &events {
            match event {
                OrchestrationEvent::SourceActivated { source } => {
                    prop_assert!(active.is_empty(), "{} activated while {:?} active", source, active);
                    active.insert(source.clone());
                }
                OrchestrationEvent::SourceDeactivated { source }
                | OrchestrationEvent::SourceFailed { source, .. } => {
                    active.remove(source);
                }
                other => prop_assert!(false, "unexpected event {:?}", other),
            }
        }
        prop_assert_eq!(running, active.len());
    }
}
