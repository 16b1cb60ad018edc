use mbt_engine::{EngineConfig, EngineError, RunCollection, Sandbox, SandboxError};
use mbt_model::Value;
use mbt_test_utils::{
    init_tracing, partition, sample_application, state_value, PRESS_AC, PRESS_AP, PRESS_PP,
    PRESS_RL,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn test_unconsumed_exchange_leaves_sandbox_unchanged() {
    init_tracing();
    let app = sample_application();
    let press_ac = app.model().block_by_name(PRESS_AC).unwrap().clone();

    let mut sandbox = Sandbox::new(&app);
    sandbox.apply_transition(&press_ac).unwrap();
    let before: Vec<_> = sandbox.application().state_list().into_iter().cloned().collect();

    // C1 is now off: a second AC has a destination but nothing enabled there
    let err = sandbox.apply_transition(&press_ac).unwrap_err();
    assert!(matches!(err, SandboxError::Unconsumed { ref destination, .. } if destination == "C1"));
    assert!(EngineError::from(err).is_recoverable());

    let after: Vec<_> = sandbox.application().state_list().into_iter().cloned().collect();
    assert_eq!(after, before);
}

#[test]
fn test_append_then_pop_roundtrip_in_sandbox() {
    let app = sample_application();
    let mut sandbox = Sandbox::new(&app);
    let ap = app.model().block_by_name(PRESS_AP).unwrap().clone();
    let pp = app.model().block_by_name(PRESS_PP).unwrap().clone();

    let run = sandbox.apply_transition(&ap).unwrap();
    let names: Vec<_> = run.walk().iter().map(|r| r.name()).collect();
    assert_eq!(names, vec![PRESS_AP, "Append element ok tran01", "Receive DA"]);
    assert!(run.nodes()[0].returned().is_empty());

    // no source for R: the press sends the first request
    let request = run.nodes()[0].exchanges()[0].attribute("R").unwrap();
    assert_eq!(request, &partition(&app, "ActionRequest", "AT1"));
    let queued = Some(Value::List(vec![Value::from("AT1")]));
    assert_eq!(state_value(sandbox.application(), "C1", "AnotherState"), queued);

    sandbox.apply_transition(&ap).unwrap();
    assert_eq!(
        state_value(sandbox.application(), "C1", "AnotherState"),
        Some(Value::List(vec![Value::from("AT1"), Value::from("AT1")]))
    );

    sandbox.apply_transition(&pp).unwrap();
    assert_eq!(state_value(sandbox.application(), "C1", "AnotherState"), queued);
    sandbox.apply_transition(&pp).unwrap();
    assert_eq!(
        state_value(sandbox.application(), "C1", "AnotherState"),
        Some(Value::List(Vec::new()))
    );
}

#[test]
fn test_toggle_back_and_forth() {
    let app = sample_application();
    let mut sandbox = Sandbox::new(&app);
    let ac = app.model().block_by_name(PRESS_AC).unwrap().clone();
    let rl = app.model().block_by_name(PRESS_RL).unwrap().clone();

    for _ in 0..3 {
        sandbox.apply_transition(&ac).unwrap();
        assert!(sandbox.apply_transition(&ac).is_err());
        sandbox.apply_transition(&rl).unwrap();
    }
    assert_eq!(
        state_value(sandbox.application(), "C3", "Acknowledge"),
        Some(Value::Bool(false))
    );
}

#[test]
fn test_run_dumps_match_collected_runs() {
    let app = sample_application();
    let runs = RunCollection::from_model(std::sync::Arc::clone(app.model()));
    let ac = runs.get(runs.by_name(PRESS_AC).unwrap()).unwrap();

    let initial = ac.dump_initial();
    assert_eq!(initial["C1"]["State"]["value"], serde_json::json!(true));
    assert_eq!(initial["C3"]["Acknowledge"]["value"], serde_json::json!(false));

    let final_ = ac.dump_final();
    assert_eq!(final_["C1"]["State"]["value"], serde_json::json!(false));
    assert_eq!(final_["C3"]["Acknowledge"]["value"], serde_json::json!(true));
    assert!(ac.compare_initial(&app));
}

#[test]
fn test_sandbox_from_validated_config() {
    let app = sample_application();
    let config = EngineConfig::from_yaml_str("sandbox:\n  max_cascade_depth: 1\n").unwrap();
    let mut sandbox = Sandbox::from_config(&app, &config).unwrap();
    assert_eq!(sandbox.config().max_cascade_depth, 1);

    let ac = app.model().block_by_name(PRESS_AC).unwrap().clone();
    let err = sandbox.apply_transition(&ac).unwrap_err();
    assert_eq!(err, SandboxError::CascadeTooDeep(1));

    let mut invalid = EngineConfig::new();
    invalid.sandbox.max_cascade_depth = 0;
    let err = Sandbox::from_config(&app, &invalid).unwrap_err();
    assert!(matches!(err, EngineError::Config(_)));
    assert!(!err.is_recoverable());
}

#[test]
fn test_collected_run_triggered_by_exchange() {
    let app = sample_application();
    let toggle = app.model().block_by_name("Toggle State tran01").unwrap();
    let runs = RunCollection::from_transition(&app, toggle);
    assert_eq!(runs.len(), 1);
    let run = runs.get(runs.by_name(PRESS_AC).unwrap()).unwrap();
    assert_eq!(run.nodes()[0].exchanges(), &[partition(&app, "Action", "AC")]);
}

proptest! {
    #[test]
    fn prop_sandbox_never_touches_live_application(
        presses in proptest::collection::vec(
            prop_oneof![Just(PRESS_AC), Just(PRESS_RL), Just(PRESS_AP), Just(PRESS_PP)],
            0..8,
        )
    ) {
        let app = sample_application();
        let live: Vec<_> = app.state_list().into_iter().cloned().collect();
        let mut sandbox = Sandbox::new(&app);
        for name in presses {
            let t = app.model().block_by_name(name).unwrap().clone();
            let _ = sandbox.apply_transition(&t);
        }
        let after: Vec<_> = app.state_list().into_iter().cloned().collect();
        prop_assert_eq!(after, live);
    }
}
