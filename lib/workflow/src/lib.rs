//! Process model for amber-lantern workflows.
//!
//! This crate provides the in-memory workflow model shared by the JSON and
//! BPMN mappers:
//!
//! - **Workflow**: the root, holding metadata, a trigger, a diagram and the
//!   root [`Scope`]
//! - **Activities**: the closed [`Activity`] union of events, tasks,
//!   gateways, subprocesses and calls
//! - **Transitions, Variables, Conditions, Timers**: the rest of a scope
//! - **Diagram**: shapes and edges correlated with model elements
//!
//! Every type describes its JSON fields through
//! [`amber_lantern_mapping::BeanType`]; [`register_types`] adds the unions to
//! a registry builder.

pub mod activity;
pub mod binding;
pub mod condition;
pub mod data_type;
pub mod diagram;
pub mod register;
pub mod scope;
pub mod timer;
pub mod transition;
pub mod trigger;
pub mod variable;
pub mod workflow;

pub use activity::{Activity, ActivityBase, HttpMethod, MultiInstance};
pub use binding::Binding;
pub use condition::Condition;
pub use data_type::DataType;
pub use diagram::{Bounds, Diagram, Edge, Node, Point};
pub use register::{register_types, registry_builder};
pub use scope::Scope;
pub use timer::{Timer, TimerBase};
pub use transition::Transition;
pub use trigger::{Form, FormField, Trigger};
pub use variable::Variable;
pub use workflow::Workflow;
