//! Unsaved conditions.
//!
//! A field may carry any number of conditions; when one of them matches the
//! field's current value the field is left out of the flattened record.
//! Conditions are attached by *class* ([`ConditionClass`]) and instantiated
//! once per field when the owning type is registered.

use crate::error::{CoreError, CoreResult};
use crate::types::ValueKind;
use entimap_codec::Value;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

/// What a condition gets to look at.
#[derive(Debug, Clone, Copy)]
pub enum Probe<'a> {
    /// An atomic or list field's current value.
    Value(&'a Value),
    /// An embedded object field; `true` when it is present.
    Object(bool),
    /// An embedded collection field; `None` when the collection is null.
    Elements(Option<usize>),
}

impl Probe<'_> {
    /// Returns true if the probed field is null.
    #[must_use]
    pub fn is_null(&self) -> bool {
        match self {
            Probe::Value(value) => value.is_null(),
            Probe::Object(present) => !present,
            Probe::Elements(len) => len.is_none(),
        }
    }
}

/// A predicate deciding whether a field is left unsaved.
pub trait Condition: Send + Sync + fmt::Debug {
    /// Returns true if the field should be skipped.
    fn matches(&self, probe: &Probe<'_>) -> bool;
}

/// What a contextual condition constructor learns about its field.
#[derive(Debug, Clone)]
pub struct ConditionContext {
    /// Rust type declaring the field.
    pub type_name: &'static str,
    /// Declared field name.
    pub field: String,
    /// Kind of the field's value.
    pub kind: ValueKind,
    /// The value a freshly constructed instance holds in this field, when
    /// the field is atomic and the enclosing type can be constructed.
    pub default: Option<Value>,
}

/// A kind of condition that can be attached to fields.
///
/// A class offers a contextual constructor, a zero-argument constructor, or
/// both. The contextual one is preferred. A class offering neither cannot be
/// used and fails registration.
pub trait ConditionClass: 'static {
    /// Name used in error messages.
    const NAME: &'static str;

    /// Value kind this condition can test. [`ValueKind::Any`] accepts all.
    const APPLIES_TO: ValueKind;

    /// Builds the condition for a specific field.
    fn with_context(_context: &ConditionContext) -> Option<CoreResult<Box<dyn Condition>>> {
        None
    }

    /// Builds the condition without context.
    fn create() -> Option<Box<dyn Condition>> {
        None
    }
}

/// A condition class attached to a field, not yet instantiated.
#[derive(Clone, Copy)]
pub(crate) struct ConditionSpec {
    pub(crate) name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) applies_to: ValueKind,
    with_context: fn(&ConditionContext) -> Option<CoreResult<Box<dyn Condition>>>,
    create: fn() -> Option<Box<dyn Condition>>,
}

impl ConditionSpec {
    pub(crate) fn of<C: ConditionClass>() -> Self {
        Self {
            name: C::NAME,
            type_id: TypeId::of::<C>(),
            applies_to: C::APPLIES_TO,
            with_context: C::with_context,
            create: C::create,
        }
    }

    /// Checks the kind and instantiates the condition for one field.
    pub(crate) fn resolve(&self, context: &ConditionContext) -> CoreResult<ResolvedCondition> {
        if !self.applies_to.accepts(context.kind) {
            return Err(CoreError::ConditionType {
                condition: self.name,
                field: format!("{}.{}", context.type_name, context.field),
                expected: self.applies_to,
                found: context.kind,
            });
        }

        let condition = match (self.with_context)(context) {
            Some(built) => built?,
            None => (self.create)().ok_or_else(|| CoreError::ConditionConstructor {
                condition: self.name,
                field: format!("{}.{}", context.type_name, context.field),
            })?,
        };

        Ok(ResolvedCondition {
            name: self.name,
            type_id: self.type_id,
            condition: Arc::from(condition),
        })
    }
}

impl fmt::Debug for ConditionSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionSpec")
            .field("name", &self.name)
            .field("applies_to", &self.applies_to)
            .finish()
    }
}

/// An instantiated condition on a field.
#[derive(Debug, Clone)]
pub struct ResolvedCondition {
    /// Condition class name.
    pub name: &'static str,
    pub(crate) type_id: TypeId,
    pub(crate) condition: Arc<dyn Condition>,
}

impl ResolvedCondition {
    /// Returns true if the condition matches.
    #[must_use]
    pub fn matches(&self, probe: &Probe<'_>) -> bool {
        self.condition.matches(probe)
    }

    /// Returns true if this is [`Always`].
    #[must_use]
    pub fn is_always(&self) -> bool {
        self.type_id == TypeId::of::<Always>()
    }
}

// Built-in conditions. Each is both the class and the condition itself.
macro_rules! simple_condition {
    ($(#[$doc:meta])* $name:ident, $applies:expr, |$probe:ident| $body:expr) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Condition for $name {
            fn matches(&self, $probe: &Probe<'_>) -> bool {
                $body
            }
        }

        impl ConditionClass for $name {
            const NAME: &'static str = stringify!($name);
            const APPLIES_TO: ValueKind = $applies;

            fn create() -> Option<Box<dyn Condition>> {
                Some(Box::new($name))
            }
        }
    };
}

simple_condition!(
    /// Never saves the field. The field is still loaded when present.
    Always,
    ValueKind::Any,
    |_probe| true
);

simple_condition!(
    /// Skips null values.
    IfNull,
    ValueKind::Any,
    |probe| probe.is_null()
);

simple_condition!(
    /// Skips anything that is not null.
    IfNotNull,
    ValueKind::Any,
    |probe| !probe.is_null()
);

simple_condition!(
    /// Skips `false`.
    IfFalse,
    ValueKind::Bool,
    |probe| matches!(probe, Probe::Value(Value::Bool(false)))
);

simple_condition!(
    /// Skips `true`.
    IfTrue,
    ValueKind::Bool,
    |probe| matches!(probe, Probe::Value(Value::Bool(true)))
);

simple_condition!(
    /// Skips zero.
    IfZero,
    ValueKind::Integer,
    |probe| matches!(probe, Probe::Value(Value::Integer(0)))
);

simple_condition!(
    /// Skips `0.0` and `-0.0`.
    IfZeroFloat,
    ValueKind::Float,
    |probe| matches!(probe, Probe::Value(Value::Float(n)) if *n == 0.0)
);

simple_condition!(
    /// Skips present but empty collections.
    IfEmpty,
    ValueKind::List,
    |probe| match probe {
        Probe::Value(Value::Array(items)) => items.is_empty(),
        Probe::Elements(len) => *len == Some(0),
        _ => false,
    }
);

simple_condition!(
    /// Skips the empty string.
    IfEmptyString,
    ValueKind::Text,
    |probe| matches!(probe, Probe::Value(Value::Text(s)) if s.is_empty())
);

/// Skips the value a freshly constructed instance holds in the field.
#[derive(Debug, Clone)]
pub struct IfDefault {
    default: Value,
}

impl Condition for IfDefault {
    fn matches(&self, probe: &Probe<'_>) -> bool {
        matches!(probe, Probe::Value(value) if **value == self.default)
    }
}

impl ConditionClass for IfDefault {
    const NAME: &'static str = "IfDefault";
    const APPLIES_TO: ValueKind = ValueKind::Any;

    fn with_context(context: &ConditionContext) -> Option<CoreResult<Box<dyn Condition>>> {
        let default = context.default.clone()?;
        Some(Ok(Box::new(IfDefault { default })))
    }
}
