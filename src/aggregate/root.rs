use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A domain aggregate the dispatch pipeline can load, call and save.
///
/// `IDENTIFIERS` names the identifier properties; each one needs a payload
/// mapping on every non-factory descriptor.
pub trait AggregateRoot: Any + Clone + fmt::Debug + Send + Sync {
    const AGGREGATE_TYPE: &'static str;
    const IDENTIFIERS: &'static [&'static str];

    fn identifiers(&self) -> Identifiers;
}

trait ErasedAggregate: Send + Sync {
    fn clone_box(&self) -> Box<dyn ErasedAggregate>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
    fn aggregate_type(&self) -> &'static str;
    fn identifiers(&self) -> Identifiers;
    fn debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result;
}

impl<A: AggregateRoot> ErasedAggregate for A {
    fn clone_box(&self) -> Box<dyn ErasedAggregate> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn aggregate_type(&self) -> &'static str {
        A::AGGREGATE_TYPE
    }

    fn identifiers(&self) -> Identifiers {
        AggregateRoot::identifiers(self)
    }

    fn debug(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A type-erased aggregate plus its optimistic version token.
///
/// `version` is `None` until the instance has been stored once.
pub struct AggregateInstance {
    inner: Box<dyn ErasedAggregate>,
    version: Option<u64>,
}

impl AggregateInstance {
    pub fn new<A: AggregateRoot>(aggregate: A) -> Self {
        Self {
            inner: Box::new(aggregate),
            version: None,
        }
    }

    /// The same instance carrying a different version token.
    pub fn with_version(mut self, version: u64) -> Self {
        self.version = Some(version);
        self
    }

    pub fn aggregate_type(&self) -> &'static str {
        self.inner.aggregate_type()
    }

    pub fn identifiers(&self) -> Identifiers {
        self.inner.identifiers()
    }

    pub fn version(&self) -> Option<u64> {
        self.version
    }

    pub fn is<A: AggregateRoot>(&self) -> bool {
        self.inner.as_any().is::<A>()
    }

    pub fn downcast_ref<A: AggregateRoot>(&self) -> Option<&A> {
        self.inner.as_any().downcast_ref()
    }

    pub fn downcast_mut<A: AggregateRoot>(&mut self) -> Option<&mut A> {
        self.inner.as_any_mut().downcast_mut()
    }
}

impl Clone for AggregateInstance {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone_box(),
            version: self.version,
        }
    }
}

impl fmt::Debug for AggregateInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AggregateInstance {{ version: {:?}, aggregate: ", self.version)?;
        self.inner.debug(f)?;
        f.write_str(" }")
    }
}

/// Identifier name to value, ordered by name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifiers(BTreeMap<String, Value>);

impl Identifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.0.clone().into_iter().collect())
    }
}

/// Renders as a JSON object, e.g. `{"orderId":"42"}`.
impl fmt::Display for Identifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Clone, Debug, PartialEq)]
    struct Ticket {
        id: String,
        open: bool,
    }

    impl AggregateRoot for Ticket {
        const AGGREGATE_TYPE: &'static str = "Ticket";
        const IDENTIFIERS: &'static [&'static str] = &["ticketId"];

        fn identifiers(&self) -> Identifiers {
            Identifiers::new().with("ticketId", json!(self.id))
        }
    }

    #[test]
    fn instance_exposes_type_and_identifiers() {
        let instance = AggregateInstance::new(Ticket {
            id: "t-1".into(),
            open: true,
        });
        assert_eq!(instance.aggregate_type(), "Ticket");
        assert_eq!(instance.identifiers().to_string(), r#"{"ticketId":"t-1"}"#);
        assert_eq!(instance.version(), None);
        assert!(instance.is::<Ticket>());
    }

    #[test]
    fn downcast_mut_changes_the_instance() {
        let mut instance = AggregateInstance::new(Ticket {
            id: "t-1".into(),
            open: true,
        })
        .with_version(3);
        instance.downcast_mut::<Ticket>().unwrap().open = false;

        let copy = instance.clone();
        assert!(!copy.downcast_ref::<Ticket>().unwrap().open);
        assert_eq!(copy.version(), Some(3));
    }

    #[test]
    fn identifiers_display_is_sorted_json() {
        let ids = Identifiers::new()
            .with("b", json!(2))
            .with("a", json!("x"));
        assert_eq!(ids.to_string(), r#"{"a":"x","b":2}"#);
    }
}
