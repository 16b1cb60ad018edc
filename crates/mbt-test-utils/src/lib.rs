//! Testing utilities for MBT workspace
//!
//! Shared sample model, fixtures and tracing setup.
//!
//! The sample model has three components:
//! - `C1` toggles `State` on `AC`/`RL` and queues requests in `AnotherState`
//!   on `AP(R)`/`PP`
//! - `C2` is the user: button presses with no trigger, plus sinks for the
//!   replies it gets back
//! - `C3` mirrors `C1`'s toggle in `Acknowledge`

#![allow(missing_docs)]

use indexmap::IndexMap;
use mbt_model::{CodeSpec, Constructor, Partition, TypeSpec, Value};
use mbt_transition::{Application, ComponentSpec, Model, ModelSpec, TransitionSpec};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

pub const PRESS_AC: &str = "Press C2's Button AC";
pub const PRESS_RL: &str = "Press C2's Button RL";
pub const PRESS_AP: &str = "Press C2's Button AP";
pub const PRESS_PP: &str = "Press C2's Button PP";

/// Install a test subscriber honouring `RUST_LOG`; later calls are no-ops
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn sample_types() -> Vec<TypeSpec> {
    vec![
        TypeSpec::data("ActionRequest")
            .value_code("AT1")
            .value_code("AT2"),
        TypeSpec::state("State")
            .code(CodeSpec::new("State(True)").value(true).describe(
                "S-STATE-01",
                "State is true",
                "The toggle state of C1 is true",
            ))
            .code(CodeSpec::new("State(False)").value(false).describe(
                "S-STATE-02",
                "State is false",
                "The toggle state of C1 is false",
            )),
        TypeSpec::state("AnotherState")
            .constructor("append", Constructor::Append)
            .constructor("pop", Constructor::Pop)
            .code(CodeSpec::new("AnotherState([])").value(Value::List(Vec::new())))
            .code(CodeSpec::new("append(R)").argument("R"))
            .code(CodeSpec::new("pop()")),
        TypeSpec::state("Acknowledge")
            .code(CodeSpec::new("Acknowledge(False)").value(false))
            .code(CodeSpec::new("Acknowledge(True)").value(true)),
        TypeSpec::exchange("Action")
            .attribute("R", "ActionRequest")
            .value_code("AC")
            .constructor("AP", Constructor::Value(Value::from("AP")))
            .code(CodeSpec::new("AP(R)").argument("R").describe(
                "X-ACTION-AP",
                "Append request",
                "Ask C1 to queue request R",
            ))
            .value_code("PP")
            .value_code("RL"),
        TypeSpec::exchange("Reaction")
            .value_code("RE")
            .value_code("ARE")
            .value_code("AL")
            .value_code("PA"),
        TypeSpec::exchange("Done").value_code("DA"),
    ]
}

fn c1() -> ComponentSpec {
    ComponentSpec::new("C1")
        .with_state("State")
        .with_state("AnotherState")
        .with_transition(
            TransitionSpec::new("Toggle State tran01")
                .with_initial("State", "State(True)")
                .with_incoming("Action", "AC")
                .with_final("State", "State(False)")
                .with_outgoing("Reaction", "RE")
                .with_outgoing("Reaction", "ARE"),
        )
        .with_transition(
            TransitionSpec::new("Toggle State tran02")
                .with_initial("State", "State(False)")
                .with_incoming("Action", "RL")
                .with_final("State", "State(True)")
                .with_outgoing("Reaction", "AL"),
        )
        .with_transition(
            TransitionSpec::new("Append element ok tran01")
                .with_incoming("Action", "AP(R)")
                .with_final("AnotherState", "append(R)")
                .with_outgoing("Done", "DA"),
        )
        .with_transition(
            TransitionSpec::new("Pop element ok tran01")
                .with_incoming("Action", "PP")
                .with_final("AnotherState", "pop()")
                .with_outgoing("Reaction", "PA"),
        )
}

fn c2() -> ComponentSpec {
    let press = |name: &str, code: &str| TransitionSpec::new(name).with_outgoing("Action", code);
    let sink = |name: &str, kind: &str, code: &str| {
        TransitionSpec::new(name).with_incoming(kind, code)
    };
    ComponentSpec::new("C2")
        .with_transition(press(PRESS_AC, "AC"))
        .with_transition(press(PRESS_RL, "RL"))
        .with_transition(press(PRESS_AP, "AP(R)"))
        .with_transition(press(PRESS_PP, "PP"))
        .with_transition(sink("Receive ARE", "Reaction", "ARE"))
        .with_transition(sink("Receive DA", "Done", "DA"))
        .with_transition(sink("Receive PA", "Reaction", "PA"))
}

fn c3() -> ComponentSpec {
    ComponentSpec::new("C3")
        .with_state("Acknowledge")
        .with_transition(
            TransitionSpec::new("Receive RE")
                .with_initial("Acknowledge", "Acknowledge(False)")
                .with_incoming("Reaction", "RE")
                .with_final("Acknowledge", "Acknowledge(True)"),
        )
        .with_transition(
            TransitionSpec::new("Receive AL")
                .with_initial("Acknowledge", "Acknowledge(True)")
                .with_incoming("Reaction", "AL")
                .with_final("Acknowledge", "Acknowledge(False)"),
        )
}

pub fn sample_model_spec() -> ModelSpec {
    ModelSpec {
        types: sample_types(),
        components: vec![c1(), c2(), c3()],
    }
}

pub fn sample_model() -> Arc<Model> {
    Arc::new(Model::build(sample_model_spec()).unwrap())
}

/// Started sample application
pub fn sample_application() -> Application {
    Application::new(sample_model())
}

/// Partition built from a code with no arguments
pub fn partition(app: &Application, kind: &str, code: &str) -> Partition {
    app.registry()
        .make(kind, code, &[], &IndexMap::new())
        .unwrap()
}

pub fn state_value(app: &Application, component: &str, kind: &str) -> Option<Value> {
    app.component(component)?.state(kind)?.value().cloned()
}
