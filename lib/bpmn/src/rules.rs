//! Namespaces and element rules of the BPMN encoding.

use amber_lantern_mapping::{BpmnElementName, BpmnGuard, TypeRegistryBuilder};
use amber_lantern_workflow::activity::{
    Activity, BoundaryEvent, Call, EmailTask, EmbeddedSubprocess, EndEvent, ExclusiveGateway,
    HttpServiceTask, InclusiveGateway, JavaServiceTask, NoneEvent, NoneTask, ParallelGateway,
    ReceiveTask, ScriptTask, StartEvent, UserTask,
};
use amber_lantern_workflow::timer::{CycleTimer, DateTimer, DurationTimer, Timer};
use amber_lantern_xml::XmlNamespace;

/// BPMN 2.0 model namespace.
pub const BPMN_NS: &str = "http://www.omg.org/spec/BPMN/20100524/MODEL";
/// Extension namespace for everything BPMN has no element for.
pub const EFFEKTIF_NS: &str = "http://effektif.com/bpmn20";
pub const BPMNDI_NS: &str = "http://www.omg.org/spec/BPMN/20100524/DI";
pub const DC_NS: &str = "http://www.omg.org/spec/DD/20100524/DC";
pub const DI_NS: &str = "http://www.omg.org/spec/DD/20100524/DI";

/// Prefix bindings declared on documents written from scratch.
#[must_use]
pub fn default_namespaces() -> Vec<XmlNamespace> {
    vec![
        XmlNamespace::prefixed("bpmn", BPMN_NS),
        XmlNamespace::prefixed("e", EFFEKTIF_NS),
        XmlNamespace::prefixed("bpmndi", BPMNDI_NS),
        XmlNamespace::prefixed("dc", DC_NS),
        XmlNamespace::prefixed("di", DI_NS),
    ]
}

fn bpmn(local: &str) -> BpmnElementName {
    BpmnElementName::new(BPMN_NS, local)
}

fn type_guard(value: &str) -> Option<BpmnGuard> {
    Some(BpmnGuard::Attribute {
        namespace: EFFEKTIF_NS.to_string(),
        local: "type".to_string(),
        value: value.to_string(),
    })
}

fn child_guard(local: &str) -> Option<BpmnGuard> {
    Some(BpmnGuard::Child {
        namespace: BPMN_NS.to_string(),
        local: local.to_string(),
    })
}

/// Registers the BPMN element of every activity and timer type.
///
/// Service tasks are told apart by an `e:type` attribute, timer
/// definitions by which time child they carry.
pub fn register_bpmn_rules(builder: &mut TypeRegistryBuilder) -> &mut TypeRegistryBuilder {
    builder
        .register_bpmn_element::<Activity, StartEvent>(bpmn("startEvent"), None)
        .register_bpmn_element::<Activity, EndEvent>(bpmn("endEvent"), None)
        .register_bpmn_element::<Activity, NoneEvent>(bpmn("intermediateThrowEvent"), None)
        .register_bpmn_element::<Activity, NoneTask>(bpmn("task"), None)
        .register_bpmn_element::<Activity, UserTask>(bpmn("userTask"), None)
        .register_bpmn_element::<Activity, ScriptTask>(bpmn("scriptTask"), None)
        .register_bpmn_element::<Activity, JavaServiceTask>(bpmn("serviceTask"), type_guard("java"))
        .register_bpmn_element::<Activity, HttpServiceTask>(bpmn("serviceTask"), type_guard("http"))
        .register_bpmn_element::<Activity, EmailTask>(bpmn("sendTask"), None)
        .register_bpmn_element::<Activity, ReceiveTask>(bpmn("receiveTask"), None)
        .register_bpmn_element::<Activity, ExclusiveGateway>(bpmn("exclusiveGateway"), None)
        .register_bpmn_element::<Activity, InclusiveGateway>(bpmn("inclusiveGateway"), None)
        .register_bpmn_element::<Activity, ParallelGateway>(bpmn("parallelGateway"), None)
        .register_bpmn_element::<Activity, EmbeddedSubprocess>(bpmn("subProcess"), None)
        .register_bpmn_element::<Activity, Call>(bpmn("callActivity"), None)
        .register_bpmn_element::<Activity, BoundaryEvent>(bpmn("boundaryEvent"), None);

    builder
        .register_bpmn_element::<Timer, DurationTimer>(
            bpmn("timerEventDefinition"),
            child_guard("timeDuration"),
        )
        .register_bpmn_element::<Timer, DateTimer>(
            bpmn("timerEventDefinition"),
            child_guard("timeDate"),
        )
        .register_bpmn_element::<Timer, CycleTimer>(
            bpmn("timerEventDefinition"),
            child_guard("timeCycle"),
        )
}
