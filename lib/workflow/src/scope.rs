//! Scopes: containers of activities, transitions, variables and timers.

use crate::activity::Activity;
use crate::timer::Timer;
use crate::transition::Transition;
use crate::variable::Variable;
use amber_lantern_mapping::{BeanType, TypeMappingBuilder, json_bean};
use amber_lantern_xml::XmlElement;
use std::collections::HashSet;

/// The body of a workflow or embedded subprocess.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scope {
    pub activities: Vec<Activity>,
    pub transitions: Vec<Transition>,
    pub variables: Vec<Variable>,
    /// Timers not (yet) attached to an activity.
    pub timers: Vec<Timer>,
    /// BPMN content of the scope element that was not understood.
    pub bpmn: Option<XmlElement>,
}

impl Scope {
    #[must_use]
    pub fn with_activity(mut self, activity: impl Into<Activity>) -> Self {
        self.activities.push(activity.into());
        self
    }

    #[must_use]
    pub fn with_transition(mut self, transition: Transition) -> Self {
        self.transitions.push(transition);
        self
    }

    #[must_use]
    pub fn with_variable(mut self, variable: Variable) -> Self {
        self.variables.push(variable);
        self
    }

    /// The activity with `id` directly in this scope.
    #[must_use]
    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id() == Some(id))
    }

    pub fn activity_mut(&mut self, id: &str) -> Option<&mut Activity> {
        self.activities.iter_mut().find(|a| a.id() == Some(id))
    }

    #[must_use]
    pub fn transition(&self, id: &str) -> Option<&Transition> {
        self.transitions.iter().find(|t| t.id.as_deref() == Some(id))
    }

    /// Ids of the activities in this scope and all nested scopes.
    #[must_use]
    pub fn all_activity_ids(&self) -> HashSet<String> {
        let mut ids = HashSet::new();
        self.collect_activity_ids(&mut ids);
        ids
    }

    fn collect_activity_ids(&self, ids: &mut HashSet<String>) {
        for activity in &self.activities {
            if let Some(id) = activity.id() {
                ids.insert(id.to_string());
            }
            if let Some(scope) = activity.scope() {
                scope.collect_activity_ids(ids);
            }
        }
    }

    /// Visits this scope and every nested scope, outermost first.
    pub fn visit_scopes<'a>(&'a self, visit: &mut dyn FnMut(&'a Scope)) {
        visit(self);
        for activity in &self.activities {
            if let Some(scope) = activity.scope() {
                scope.visit_scopes(visit);
            }
        }
    }

    /// Like [`Scope::visit_scopes`], with mutable access.
    pub fn visit_scopes_mut(&mut self, visit: &mut dyn FnMut(&mut Scope)) {
        visit(self);
        for activity in &mut self.activities {
            if let Some(scope) = activity.scope_mut() {
                scope.visit_scopes_mut(visit);
            }
        }
    }
}

impl BeanType for Scope {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("activities", |s| &s.activities, |s| &mut s.activities)
            .field("transitions", |s| &s.transitions, |s| &mut s.transitions)
            .field("variables", |s| &s.variables, |s| &mut s.variables)
            .field("timers", |s| &s.timers, |s| &mut s.timers);
    }
}

json_bean!(Scope);
