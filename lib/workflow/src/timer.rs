//! Timers attached to activities through boundary events.

use amber_lantern_mapping::{BeanType, TypeMappingBuilder, json_bean, polymorphic};

/// Identity and attachment shared by all timers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimerBase {
    pub id: Option<String>,
    /// The boundary event the timer was declared on.
    pub boundary_event_id: Option<String>,
    /// The activity whose boundary carries the timer.
    pub attached_activity_id: Option<String>,
}

impl BeanType for TimerBase {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .field("id", |t| &t.id, |t| &mut t.id)
            .field_as(
                "boundary_event_id",
                "boundaryEventId",
                |t| &t.boundary_event_id,
                |t| &mut t.boundary_event_id,
            )
            .field_as(
                "attached_activity_id",
                "attachedActivityId",
                |t| &t.attached_activity_id,
                |t| &mut t.attached_activity_id,
            );
    }
}

/// Fires once after an ISO-8601 duration, e.g. `PT5M`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DurationTimer {
    pub base: TimerBase,
    pub duration: Option<String>,
}

/// Fires once at an ISO-8601 date and time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DateTimer {
    pub base: TimerBase,
    pub date: Option<String>,
}

/// Fires repeatedly on an ISO-8601 repeating interval, e.g. `R3/PT10H`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleTimer {
    pub base: TimerBase,
    pub cycle: Option<String>,
}

impl BeanType for DurationTimer {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|t| &t.base, |t| &mut t.base)
            .field("duration", |t| &t.duration, |t| &mut t.duration);
    }
}

impl BeanType for DateTimer {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|t| &t.base, |t| &mut t.base)
            .field("date", |t| &t.date, |t| &mut t.date);
    }
}

impl BeanType for CycleTimer {
    fn describe(fields: &mut TypeMappingBuilder<Self>) {
        fields
            .flatten(|t| &t.base, |t| &mut t.base)
            .field("cycle", |t| &t.cycle, |t| &mut t.cycle);
    }
}

json_bean!(DurationTimer, DateTimer, CycleTimer);

polymorphic! {
    /// A timer definition.
    #[derive(Debug, Clone, PartialEq)]
    pub enum Timer {
        Duration(DurationTimer) = "duration",
        Date(DateTimer) = "date",
        Cycle(CycleTimer) = "cycle",
    }
}

impl Timer {
    #[must_use]
    pub fn base(&self) -> &TimerBase {
        match self {
            Self::Duration(t) => &t.base,
            Self::Date(t) => &t.base,
            Self::Cycle(t) => &t.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut TimerBase {
        match self {
            Self::Duration(t) => &mut t.base,
            Self::Date(t) => &mut t.base,
            Self::Cycle(t) => &mut t.base,
        }
    }
}
