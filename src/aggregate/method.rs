use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::{AggregateInstance, AggregateRoot};
use crate::error::{DispatchError, Result};
use crate::message::{Payload, PayloadType};

/// What an aggregate method produced.
#[derive(Debug)]
pub enum Invocation {
    /// Nothing; the message continues unchanged.
    Void,
    /// A value that becomes the new payload.
    Value(Payload),
    /// A new aggregate instance from a factory.
    Created(AggregateInstance),
}

impl Invocation {
    pub fn value<T: PayloadType + Serialize>(value: &T) -> Result<Self> {
        Ok(Invocation::Value(Payload::encode(value)?))
    }

    pub fn created<A: AggregateRoot>(aggregate: A) -> Self {
        Invocation::Created(AggregateInstance::new(aggregate))
    }
}

/// A callable aggregate method, static or on an instance.
pub trait AggregateMethod: Send + Sync {
    fn invoke(
        &self,
        instance: Option<&mut AggregateInstance>,
        arguments: Vec<Value>,
    ) -> Result<Invocation>;
}

/// Deserialize the argument at `index`.
pub fn decode_argument<T: DeserializeOwned>(arguments: &[Value], index: usize) -> Result<T> {
    let argument = arguments.get(index).cloned().unwrap_or(Value::Null);
    Ok(serde_json::from_value(argument)?)
}

/// A method called on a loaded instance of `A`.
pub struct InstanceMethod<A, F> {
    call: F,
    _aggregate: PhantomData<fn() -> A>,
}

impl<A, F> InstanceMethod<A, F>
where
    A: AggregateRoot,
    F: Fn(&mut A, Vec<Value>) -> Result<Invocation> + Send + Sync,
{
    pub fn new(call: F) -> Self {
        Self {
            call,
            _aggregate: PhantomData,
        }
    }
}

impl<A, F> AggregateMethod for InstanceMethod<A, F>
where
    A: AggregateRoot,
    F: Fn(&mut A, Vec<Value>) -> Result<Invocation> + Send + Sync,
{
    fn invoke(
        &self,
        instance: Option<&mut AggregateInstance>,
        arguments: Vec<Value>,
    ) -> Result<Invocation> {
        let aggregate = instance
            .and_then(AggregateInstance::downcast_mut::<A>)
            .ok_or_else(|| {
                DispatchError::Rejected(format!("no {} instance to call", A::AGGREGATE_TYPE))
            })?;
        (self.call)(aggregate, arguments)
    }
}

/// A method that creates `A`.
///
/// When the descriptor loads before calling the factory and an instance
/// exists, `on_existing` is applied to it instead.
pub struct FactoryMethod<A, F> {
    create: F,
    on_existing: Option<Box<dyn Fn(&mut A, Vec<Value>) -> Result<()> + Send + Sync>>,
}

impl<A, F> FactoryMethod<A, F>
where
    A: AggregateRoot,
    F: Fn(Vec<Value>) -> Result<A> + Send + Sync,
{
    pub fn new(create: F) -> Self {
        Self {
            create,
            on_existing: None,
        }
    }

    pub fn on_existing<U>(mut self, update: U) -> Self
    where
        U: Fn(&mut A, Vec<Value>) -> Result<()> + Send + Sync + 'static,
    {
        self.on_existing = Some(Box::new(update));
        self
    }
}

impl<A, F> AggregateMethod for FactoryMethod<A, F>
where
    A: AggregateRoot,
    F: Fn(Vec<Value>) -> Result<A> + Send + Sync,
{
    fn invoke(
        &self,
        instance: Option<&mut AggregateInstance>,
        arguments: Vec<Value>,
    ) -> Result<Invocation> {
        let Some(instance) = instance else {
            return Ok(Invocation::created((self.create)(arguments)?));
        };
        let update = self.on_existing.as_ref().ok_or_else(|| {
            DispatchError::Rejected(format!("{} already exists", A::AGGREGATE_TYPE))
        })?;
        let aggregate = instance.downcast_mut::<A>().ok_or_else(|| {
            DispatchError::Rejected(format!("loaded instance is not a {}", A::AGGREGATE_TYPE))
        })?;
        update(aggregate, arguments)?;
        Ok(Invocation::Void)
    }
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;
    use serde_json::json;

    use super::*;
    use crate::aggregate::Identifiers;

    #[derive(Clone, Debug, Deserialize)]
    struct Lamp {
        id: String,
        on: bool,
    }

    impl AggregateRoot for Lamp {
        const AGGREGATE_TYPE: &'static str = "Lamp";
        const IDENTIFIERS: &'static [&'static str] = &["id"];

        fn identifiers(&self) -> Identifiers {
            Identifiers::new().with("id", json!(self.id))
        }
    }

    fn factory() -> FactoryMethod<Lamp, impl Fn(Vec<Value>) -> Result<Lamp> + Send + Sync> {
        FactoryMethod::new(|args: Vec<Value>| decode_argument::<Lamp>(&args, 0))
    }

    #[test]
    fn instance_method_mutates_loaded_aggregate() {
        let method = InstanceMethod::new(|lamp: &mut Lamp, _args| {
            lamp.on = !lamp.on;
            Ok(Invocation::Void)
        });
        let mut instance = AggregateInstance::new(Lamp {
            id: "l".into(),
            on: false,
        });
        method.invoke(Some(&mut instance), vec![]).unwrap();
        assert!(instance.downcast_ref::<Lamp>().unwrap().on);
    }

    #[test]
    fn instance_method_without_instance_is_rejected() {
        let method = InstanceMethod::new(|_lamp: &mut Lamp, _args| Ok(Invocation::Void));
        let err = method.invoke(None, vec![]).unwrap_err();
        assert!(matches!(err, DispatchError::Rejected(_)));
    }

    #[test]
    fn factory_creates_from_arguments() {
        let invocation = factory()
            .invoke(None, vec![json!({ "id": "l-1", "on": true })])
            .unwrap();
        let Invocation::Created(instance) = invocation else {
            panic!("expected a created instance");
        };
        assert_eq!(instance.identifiers().get("id"), Some(&json!("l-1")));
    }

    #[test]
    fn factory_on_existing_updates_in_place() {
        let method = factory().on_existing(|lamp: &mut Lamp, _args| {
            lamp.on = true;
            Ok(())
        });
        let mut existing = AggregateInstance::new(Lamp {
            id: "l-1".into(),
            on: false,
        });
        let invocation = method.invoke(Some(&mut existing), vec![]).unwrap();
        assert!(matches!(invocation, Invocation::Void));
        assert!(existing.downcast_ref::<Lamp>().unwrap().on);
    }

    #[test]
    fn factory_without_update_rejects_existing() {
        let mut existing = AggregateInstance::new(Lamp {
            id: "l-1".into(),
            on: false,
        });
        assert!(factory().invoke(Some(&mut existing), vec![]).is_err());
    }

    #[test]
    fn decode_argument_reports_bad_shapes() {
        let err = decode_argument::<Lamp>(&[json!("nope")], 0).unwrap_err();
        assert!(matches!(err, DispatchError::Decode(_)));
    }
}
