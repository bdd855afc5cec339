use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::{
    AggregateDescriptor, AggregateRepository, Identifiers, AGGREGATE_IDENTIFIERS,
    AGGREGATE_INSTANCE, AGGREGATE_METHOD, AGGREGATE_TYPE, CALLING_MESSAGE, EXPECTED_VERSION,
    IS_FACTORY,
};
use crate::channel::{ChannelRef, NullChannel};
use crate::error::{DispatchError, NotFoundReason, Result};
use crate::message::headers::REPLY_DESTINATION;
use crate::message::{HeaderValue, Message};

/// Resolves identifiers from the payload and loads the aggregate.
#[derive(Clone)]
pub struct LoadStage {
    descriptor: AggregateDescriptor,
    repository: Arc<dyn AggregateRepository>,
}

impl LoadStage {
    pub fn new(descriptor: AggregateDescriptor, repository: Arc<dyn AggregateRepository>) -> Self {
        Self {
            descriptor,
            repository,
        }
    }

    /// Returns `None` when a miss is filtered out.
    pub fn load(&self, message: Message) -> Result<Option<Message>> {
        let descriptor = &self.descriptor;
        let mut identifiers = Identifiers::new();
        let mut expected_version = None;
        let mut instance = None;

        if !descriptor.is_pure_factory() {
            identifiers = self.resolve_identifiers(&message)?;
            expected_version = self.resolve_expected_version(&message)?;

            instance = match expected_version {
                Some(version) => self.repository.find_with_locking_by(
                    descriptor.aggregate_type,
                    &identifiers,
                    version,
                )?,
                None => self
                    .repository
                    .find_by(descriptor.aggregate_type, &identifiers)?,
            };

            if instance.is_none() {
                if descriptor.filter_out_on_not_found {
                    debug!(
                        aggregate = descriptor.aggregate_type,
                        method = %descriptor.method_name,
                        %identifiers,
                        "aggregate not found, message filtered out"
                    );
                    return Ok(None);
                }
                if !descriptor.load_for_factory_method {
                    return Err(DispatchError::AggregateNotFound {
                        aggregate_type: descriptor.aggregate_type.to_string(),
                        method: descriptor.method_name.clone(),
                        reason: NotFoundReason::NoInstance { identifiers },
                    });
                }
            }
            debug!(
                aggregate = descriptor.aggregate_type,
                %identifiers,
                found = instance.is_some(),
                "aggregate loaded"
            );
        }

        let calling = message.clone();
        let mut message = message
            .with_header(AGGREGATE_TYPE, descriptor.aggregate_type)
            .with_header(AGGREGATE_METHOD, descriptor.method_name.as_str())
            .with_header(AGGREGATE_IDENTIFIERS, identifiers.to_value())
            .with_header(IS_FACTORY, descriptor.is_factory)
            .with_header(CALLING_MESSAGE, calling);
        if let Some(instance) = instance {
            message = message.with_header(AGGREGATE_INSTANCE, instance);
        }
        if let Some(version) = expected_version {
            message = message.with_header(EXPECTED_VERSION, version);
        }

        let sink: ChannelRef = Arc::new(NullChannel);
        Ok(Some(message.with_header_if_absent(
            REPLY_DESTINATION,
            HeaderValue::Channel(sink),
        )))
    }

    fn resolve_identifiers(&self, message: &Message) -> Result<Identifiers> {
        let mut identifiers = Identifiers::new();
        for (name, path) in &self.descriptor.identifier_mapping {
            let value = message.payload().property(path).ok_or_else(|| {
                DispatchError::AggregateNotFound {
                    aggregate_type: self.descriptor.aggregate_type.to_string(),
                    method: self.descriptor.method_name.clone(),
                    reason: NotFoundReason::MissingIdentifier {
                        identifier: name.clone(),
                        payload_type: message.payload().payload_type().to_string(),
                    },
                }
            })?;
            identifiers = identifiers.with(name.clone(), value.clone());
        }
        Ok(identifiers)
    }

    fn resolve_expected_version(&self, message: &Message) -> Result<Option<u64>> {
        let Some(path) = &self.descriptor.expected_version_property else {
            return Ok(None);
        };
        let endpoint = format!(
            "{}:{}",
            self.descriptor.aggregate_type, self.descriptor.method_name
        );
        let Some(value) = message.payload().property(path) else {
            return Err(DispatchError::Validation(format!(
                "aggregate {} has version locking, but no version was supplied in {}",
                endpoint, path
            )));
        };
        value.as_u64().map(Some).ok_or_else(|| {
            DispatchError::Validation(format!(
                "aggregate {} has version locking, but {} holds {}, which is not a version",
                endpoint, path, value
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    use super::*;
    use crate::aggregate::{
        AggregateDescriptorBuilder, AggregateInstance, AggregateRoot, FactoryMethod,
        InMemoryAggregateRepository, InstanceMethod, Invocation,
    };
    use crate::channel::QueueChannel;
    use crate::message::{MessageBuilder, Payload};

    #[derive(Clone, Debug, Serialize, Deserialize)]
    struct Ticket {
        code: String,
    }

    impl AggregateRoot for Ticket {
        const AGGREGATE_TYPE: &'static str = "Ticket";
        const IDENTIFIERS: &'static [&'static str] = &["code"];

        fn identifiers(&self) -> Identifiers {
            Identifiers::new().with("code", json!(self.code))
        }
    }

    fn stored(code: &str) -> Arc<InMemoryAggregateRepository> {
        let repository = InMemoryAggregateRepository::new();
        repository
            .save(&AggregateInstance::new(Ticket { code: code.into() }))
            .unwrap();
        Arc::new(repository)
    }

    fn stage(
        builder: AggregateDescriptorBuilder,
        repository: Arc<InMemoryAggregateRepository>,
    ) -> LoadStage {
        LoadStage::new(builder.build().unwrap(), repository)
    }

    fn punch() -> AggregateDescriptorBuilder {
        AggregateDescriptor::command::<Ticket, _>(
            "punch",
            InstanceMethod::new(|_t: &mut Ticket, _args| Ok(Invocation::Void)),
        )
        .with_identifier("code", "code")
    }

    fn inbound(body: Value) -> Message {
        MessageBuilder::with_payload(Payload::new("PunchTicket", body)).build()
    }

    #[test]
    fn attaches_internal_headers_for_invoke() {
        let message = inbound(json!({ "code": "T1", "version": 1 }));
        let loaded = stage(punch().with_expected_version("version"), stored("T1"))
            .load(message.clone())
            .unwrap()
            .unwrap();
        let headers = loaded.headers();

        let instance = headers.find(AGGREGATE_INSTANCE).and_then(HeaderValue::as_aggregate).unwrap();
        assert_eq!(instance.downcast_ref::<Ticket>().unwrap().code, "T1");
        assert_eq!(instance.version(), Some(1));
        assert_eq!(headers.find(EXPECTED_VERSION).and_then(HeaderValue::as_value), Some(&json!(1)));
        assert_eq!(headers.find(IS_FACTORY).and_then(HeaderValue::as_value), Some(&json!(false)));
        assert_eq!(
            headers.find(AGGREGATE_IDENTIFIERS).and_then(HeaderValue::as_value),
            Some(&json!({ "code": "T1" }))
        );
        assert_eq!(headers.get_str(AGGREGATE_TYPE).unwrap(), "Ticket");
        assert_eq!(headers.get_str(AGGREGATE_METHOD).unwrap(), "punch");
        let calling = headers.find(CALLING_MESSAGE).and_then(HeaderValue::as_message).unwrap();
        assert_eq!(calling.id(), message.id());
        assert!(!calling.headers().contains(AGGREGATE_INSTANCE));
    }

    #[test]
    fn installs_null_reply_destination_when_absent() {
        let loaded = stage(punch(), stored("T1"))
            .load(inbound(json!({ "code": "T1" })))
            .unwrap()
            .unwrap();
        let reply = loaded.reply_destination().and_then(HeaderValue::as_channel).unwrap();
        assert!(reply.send(inbound(json!({}))).is_ok());
        assert!(!loaded.headers().contains(EXPECTED_VERSION));
    }

    #[test]
    fn keeps_explicit_reply_destination() {
        let replies = QueueChannel::new();
        let message = MessageBuilder::with_payload(Payload::new("PunchTicket", json!({ "code": "T1" })))
            .with_reply_channel(Arc::new(replies.clone()))
            .build();
        let loaded = stage(punch(), stored("T1")).load(message).unwrap().unwrap();

        let reply = loaded.reply_destination().and_then(HeaderValue::as_channel).unwrap();
        reply.send(inbound(json!({}))).unwrap();
        assert_eq!(replies.len(), 1);
    }

    #[test]
    fn keeps_reply_destination_by_name() {
        let message = MessageBuilder::with_payload(Payload::new("PunchTicket", json!({ "code": "T1" })))
            .with_reply_destination("ticket-replies")
            .build();
        let loaded = stage(punch(), stored("T1")).load(message).unwrap().unwrap();
        assert_eq!(
            loaded.reply_destination().and_then(HeaderValue::as_str),
            Some("ticket-replies")
        );
    }

    #[test]
    fn pure_factory_skips_repository() {
        let issue = FactoryMethod::new(|_args: Vec<Value>| Ok(Ticket { code: "new".into() }));
        let loaded = stage(
            AggregateDescriptor::command::<Ticket, _>("issue", issue).factory(),
            Arc::new(InMemoryAggregateRepository::new()),
        )
        .load(inbound(json!({})))
        .unwrap()
        .unwrap();

        assert!(!loaded.headers().contains(AGGREGATE_INSTANCE));
        assert_eq!(loaded.headers().find(IS_FACTORY).and_then(HeaderValue::as_value), Some(&json!(true)));
        assert_eq!(
            loaded.headers().find(AGGREGATE_IDENTIFIERS).and_then(HeaderValue::as_value),
            Some(&json!({}))
        );
    }

    #[test]
    fn absent_version_is_reported_as_missing() {
        let err = stage(punch().with_expected_version("version"), stored("T1"))
            .load(inbound(json!({ "code": "T1" })))
            .unwrap_err();
        assert!(
            matches!(err, DispatchError::Validation(ref m) if m.contains("no version was supplied")),
            "{err}"
        );
    }

    #[test]
    fn malformed_versions_are_reported_as_such() {
        let load = stage(punch().with_expected_version("version"), stored("T1"));
        for version in [json!("3"), json!(-1), json!(1.5)] {
            let err = load
                .load(inbound(json!({ "code": "T1", "version": version })))
                .unwrap_err();
            assert!(
                matches!(err, DispatchError::Validation(ref m) if m.contains("is not a version")),
                "{err}"
            );
        }
    }
}
