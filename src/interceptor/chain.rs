use std::sync::Arc;

use tracing::trace;

use super::Interceptor;
use crate::error::Result;
use crate::message::Message;

/// The remainder of a chain, handed to each interceptor.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Interceptor>],
    target: &'a dyn Fn(Message) -> Result<Option<Message>>,
}

impl<'a> Next<'a> {
    /// Run the next interceptor, or the target once the chain is exhausted.
    pub fn proceed(self, message: Message) -> Result<Option<Message>> {
        match self.remaining.split_first() {
            Some((interceptor, rest)) => {
                trace!(remaining = rest.len(), "entering interceptor");
                interceptor.around(
                    message,
                    Next {
                        remaining: rest,
                        target: self.target,
                    },
                )
            }
            None => (self.target)(message),
        }
    }
}

/// Interceptors for one target, already sorted.
#[derive(Clone, Default)]
pub struct InterceptorChain {
    interceptors: Arc<[Arc<dyn Interceptor>]>,
}

impl InterceptorChain {
    pub(crate) fn new(interceptors: Vec<Arc<dyn Interceptor>>) -> Self {
        Self {
            interceptors: interceptors.into(),
        }
    }

    /// Wrap `target` with every interceptor, first-registered outermost.
    pub fn run(
        &self,
        message: Message,
        target: &dyn Fn(Message) -> Result<Option<Message>>,
    ) -> Result<Option<Message>> {
        Next {
            remaining: &self.interceptors,
            target,
        }
        .proceed(message)
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }
}
