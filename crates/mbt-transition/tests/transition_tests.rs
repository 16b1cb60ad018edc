use indexmap::IndexMap;
use mbt_model::{Argument, PartitionClass, Value};
use mbt_test_utils::{init_tracing, partition, sample_application, sample_model_spec, state_value};
use mbt_transition::{Model, Role, Transition, TransitionSpec};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

#[test]
fn test_apply_without_state_effect_yields_single_outgoing() {
    init_tracing();
    let app = sample_application();
    let registry = app.registry();
    let x = Transition::build(
        &TransitionSpec::new("X")
            .with_incoming("Action", "AP(R)")
            .with_outgoing("Done", "DA"),
        registry,
    )
    .unwrap();

    let request = partition(&app, "ActionRequest", "AT2");
    let ap = registry
        .make("Action", "AP(R)", &[Argument::Partition(request)], &IndexMap::new())
        .unwrap();
    let mut states = app.component("C1").unwrap().states().to_vec();
    let before = states.clone();

    let out = x.apply(&mut states, &[ap]);

    assert_eq!(out, vec![partition(&app, "Done", "DA")]);
    assert_eq!(states, before);
}

#[test]
fn test_initial_matches_only_equal_state() {
    let app = sample_application();
    let y = app
        .component("C1")
        .unwrap()
        .block_by_name("Toggle State tran01")
        .unwrap();

    let on = partition(&app, "State", "State(True)");
    let off = partition(&app, "State", "State(False)");
    let any = app.registry().catalog("State").unwrap().unconstrained();

    assert!(y.is_matching_initial(&[on]));
    assert!(!y.is_matching_initial(&[off]));
    assert!(y.is_matching_initial(&[any]));
    assert!(!y.is_matching_initial(&[]));
}

#[test]
fn test_process_sequence_on_c1() {
    let mut app = sample_application();
    let ap = {
        let request = partition(&app, "ActionRequest", "AT1");
        let mut kwargs = IndexMap::new();
        kwargs.insert("R".to_string(), Argument::Partition(request));
        app.registry().make("Action", "AP(R)", &[], &kwargs).unwrap()
    };
    let ac = partition(&app, "Action", "AC");
    let pp = partition(&app, "Action", "PP");

    let c1 = app.component_mut("C1").unwrap();
    let out = c1.process(&[ap]).unwrap();
    assert_eq!(out[0].kind(), "Done");
    let out = c1.process(&[ac.clone()]).unwrap();
    assert_eq!(out.len(), 2);
    assert!(c1.process(&[ac]).is_none());
    c1.process(&[pp]).unwrap();

    assert_eq!(state_value(&app, "C1", "State"), Some(Value::Bool(false)));
    assert_eq!(
        state_value(&app, "C1", "AnotherState"),
        Some(Value::List(Vec::new()))
    );
}

#[test]
fn test_description_of_live_state() {
    let app = sample_application();
    let catalog = app.registry().catalog("State").unwrap();
    let live = app.component("C1").unwrap().state("State").unwrap();
    assert_eq!(catalog.resolve_description(live).unwrap().id, "S-STATE-01");
}

#[test]
fn test_append_binding_reads_incoming_attribute() {
    let app = sample_application();
    let t = app
        .model()
        .block_by_name("Append element ok tran01")
        .unwrap();
    let binding = &t.final_()[0].bindings()["R"];
    assert_eq!(binding.role, Role::Incoming);
    assert_eq!(binding.source, "Action");
    assert_eq!(binding.attribute.as_deref(), Some("R"));
}

proptest! {
    #[test]
    fn prop_bindings_are_deterministic(
        final_code in prop_oneof![Just("append(R)"), Just("pop()")],
        with_outgoing in any::<bool>(),
    ) {
        let spec = {
            let t = TransitionSpec::new("t")
                .with_incoming("Action", "AP(R)")
                .with_final("AnotherState", final_code);
            if with_outgoing { t.with_outgoing("Action", "AP(R)") } else { t }
        };
        let model = Model::build(sample_model_spec()).unwrap();
        let first = Transition::build(&spec, model.registry()).unwrap();
        let second = Transition::build(&spec, model.registry()).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn prop_is_matching_initial_is_idempotent(value in proptest::option::of(any::<bool>())) {
        let app = sample_application();
        let t = app.model().block_by_name("Toggle State tran02").unwrap();
        let states = vec![mbt_model::Partition::new(
            "State",
            PartitionClass::State,
            value.map(Value::Bool),
        )];
        let first = t.is_matching_initial(&states);
        prop_assert_eq!(first, t.is_matching_initial(&states));
        prop_assert_eq!(first, value != Some(true));
    }
}
