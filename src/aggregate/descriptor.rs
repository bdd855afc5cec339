use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::{AggregateMethod, AggregateRoot, RepositorySelector};
use crate::error::{DispatchError, Result};
use crate::message::PayloadType;

/// Commands load, invoke and save. Queries only load and invoke.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DescriptorKind {
    Command,
    Query,
}

/// A validated description of one aggregate method endpoint.
#[derive(Clone)]
pub struct AggregateDescriptor {
    pub(crate) kind: DescriptorKind,
    pub(crate) aggregate_type: &'static str,
    pub(crate) method_name: String,
    pub(crate) method: Arc<dyn AggregateMethod>,
    pub(crate) is_factory: bool,
    pub(crate) is_void_return: bool,
    pub(crate) identifier_mapping: BTreeMap<String, String>,
    pub(crate) expected_version_property: Option<String>,
    pub(crate) filter_out_on_not_found: bool,
    pub(crate) load_for_factory_method: bool,
    pub(crate) repository_selector: RepositorySelector,
    pub(crate) input_channel: String,
    pub(crate) output_channel: Option<String>,
    pub(crate) endpoint_id: Option<String>,
    pub(crate) handles: Option<String>,
}

impl AggregateDescriptor {
    /// Start a command descriptor for `A::method_name`.
    pub fn command<A, M>(method_name: impl Into<String>, method: M) -> AggregateDescriptorBuilder
    where
        A: AggregateRoot,
        M: AggregateMethod + 'static,
    {
        AggregateDescriptorBuilder::new::<A>(DescriptorKind::Command, method_name.into(), Arc::new(method))
    }

    /// Start a query descriptor for `A::method_name`.
    pub fn query<A, M>(method_name: impl Into<String>, method: M) -> AggregateDescriptorBuilder
    where
        A: AggregateRoot,
        M: AggregateMethod + 'static,
    {
        AggregateDescriptorBuilder::new::<A>(DescriptorKind::Query, method_name.into(), Arc::new(method))
    }

    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    pub fn aggregate_type(&self) -> &'static str {
        self.aggregate_type
    }

    pub fn method_name(&self) -> &str {
        &self.method_name
    }

    pub fn is_factory(&self) -> bool {
        self.is_factory
    }

    pub fn is_void_return(&self) -> bool {
        self.is_void_return
    }

    /// A factory call that never loads an existing instance.
    pub fn is_pure_factory(&self) -> bool {
        self.is_factory && !self.load_for_factory_method
    }

    pub fn identifier_mapping(&self) -> &BTreeMap<String, String> {
        &self.identifier_mapping
    }

    pub fn expected_version_property(&self) -> Option<&str> {
        self.expected_version_property.as_deref()
    }

    pub fn filter_out_on_not_found(&self) -> bool {
        self.filter_out_on_not_found
    }

    pub fn load_for_factory_method(&self) -> bool {
        self.load_for_factory_method
    }

    pub fn repository_selector(&self) -> &RepositorySelector {
        &self.repository_selector
    }

    pub fn input_channel(&self) -> &str {
        &self.input_channel
    }

    pub fn output_channel(&self) -> Option<&str> {
        self.output_channel.as_deref()
    }

    /// Endpoint id, defaulting to the input channel.
    pub fn endpoint_id(&self) -> &str {
        self.endpoint_id.as_deref().unwrap_or(&self.input_channel)
    }

    /// The endpoint id set with `with_endpoint_id`, if any.
    pub fn explicit_endpoint_id(&self) -> Option<&str> {
        self.endpoint_id.as_deref()
    }

    /// Payload type this descriptor is routed for on the by-object bus.
    pub fn handles(&self) -> Option<&str> {
        self.handles.as_deref()
    }
}

impl fmt::Debug for AggregateDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AggregateDescriptor")
            .field("kind", &self.kind)
            .field("aggregate_type", &self.aggregate_type)
            .field("method_name", &self.method_name)
            .field("is_factory", &self.is_factory)
            .field("input_channel", &self.input_channel)
            .finish_non_exhaustive()
    }
}

/// Persistent builder for [`AggregateDescriptor`].
#[derive(Clone)]
pub struct AggregateDescriptorBuilder {
    declared_identifiers: &'static [&'static str],
    descriptor: AggregateDescriptor,
}

impl AggregateDescriptorBuilder {
    fn new<A: AggregateRoot>(
        kind: DescriptorKind,
        method_name: String,
        method: Arc<dyn AggregateMethod>,
    ) -> Self {
        let input_channel = format!("{}.{}", A::AGGREGATE_TYPE, method_name);
        Self {
            declared_identifiers: A::IDENTIFIERS,
            descriptor: AggregateDescriptor {
                kind,
                aggregate_type: A::AGGREGATE_TYPE,
                method_name,
                method,
                is_factory: false,
                is_void_return: false,
                identifier_mapping: BTreeMap::new(),
                expected_version_property: None,
                filter_out_on_not_found: false,
                load_for_factory_method: false,
                repository_selector: RepositorySelector::Any,
                input_channel,
                output_channel: None,
                endpoint_id: None,
                handles: None,
            },
        }
    }

    pub fn factory(mut self) -> Self {
        self.descriptor.is_factory = true;
        self
    }

    pub fn void_return(mut self) -> Self {
        self.descriptor.is_void_return = true;
        self
    }

    /// Read identifier `name` from the payload property at `path`.
    pub fn with_identifier(mut self, name: impl Into<String>, path: impl Into<String>) -> Self {
        self.descriptor
            .identifier_mapping
            .insert(name.into(), path.into());
        self
    }

    /// Require an expected version at payload property `path`.
    pub fn with_expected_version(mut self, path: impl Into<String>) -> Self {
        self.descriptor.expected_version_property = Some(path.into());
        self
    }

    pub fn filter_out_on_not_found(mut self) -> Self {
        self.descriptor.filter_out_on_not_found = true;
        self
    }

    pub fn load_for_factory_method(mut self) -> Self {
        self.descriptor.load_for_factory_method = true;
        self
    }

    pub fn with_repository_selector(mut self, selector: RepositorySelector) -> Self {
        self.descriptor.repository_selector = selector;
        self
    }

    pub fn with_input_channel(mut self, name: impl Into<String>) -> Self {
        self.descriptor.input_channel = name.into();
        self
    }

    pub fn with_output_channel(mut self, name: impl Into<String>) -> Self {
        self.descriptor.output_channel = Some(name.into());
        self
    }

    pub fn with_endpoint_id(mut self, id: impl Into<String>) -> Self {
        self.descriptor.endpoint_id = Some(id.into());
        self
    }

    /// Route payloads of type `P` here on the by-object bus.
    pub fn handles<P: PayloadType>(self) -> Self {
        self.handles_type(P::PAYLOAD_TYPE)
    }

    pub fn handles_type(mut self, payload_type: impl Into<String>) -> Self {
        self.descriptor.handles = Some(payload_type.into());
        self
    }

    /// Validate and freeze.
    ///
    /// Every declared identifier needs exactly one payload mapping unless the
    /// call is a pure factory, and no mapping may name an undeclared
    /// identifier.
    pub fn build(&self) -> Result<AggregateDescriptor> {
        let descriptor = &self.descriptor;
        let endpoint = format!("{}::{}", descriptor.aggregate_type, descriptor.method_name);

        if let Some(unknown) = descriptor
            .identifier_mapping
            .keys()
            .find(|name| !self.declared_identifiers.contains(&name.as_str()))
        {
            return Err(DispatchError::configuration(format!(
                "{} maps {}, which is not an identifier of {}",
                endpoint, unknown, descriptor.aggregate_type
            )));
        }

        if !descriptor.is_pure_factory() {
            if let Some(missing) = self
                .declared_identifiers
                .iter()
                .find(|name| !descriptor.identifier_mapping.contains_key(**name))
            {
                return Err(DispatchError::configuration(format!(
                    "{} has no mapping for identifier {}",
                    endpoint, missing
                )));
            }
        }

        if descriptor.kind == DescriptorKind::Query && descriptor.is_factory {
            return Err(DispatchError::configuration(format!(
                "{} is a query and can't be a factory",
                endpoint
            )));
        }

        if descriptor.kind == DescriptorKind::Query && descriptor.is_void_return {
            return Err(DispatchError::configuration(format!(
                "{} is a query and must return a value",
                endpoint
            )));
        }

        if descriptor.input_channel.is_empty() {
            return Err(DispatchError::configuration(format!(
                "{} has an empty input channel",
                endpoint
            )));
        }

        Ok(descriptor.clone())
    }
}
