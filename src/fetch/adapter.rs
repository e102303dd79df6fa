use std::sync::Arc;

use serde_json::Value;
use tokio::runtime::Handle;

use crate::fetch::error::FetchError;
use crate::fetch::transport::{RequestOptions, Transport};
use crate::flow::Dispatcher;
use crate::lifecycle::Lifecycle;
use crate::merge::MergeError;
use crate::state::State;

/// Fetch wired into the lifecycle of one namespace.
///
/// [`SimpleFetch::fetch`] returns the loading state immediately and runs
/// the request on the captured runtime. The outcome comes back through
/// the dispatcher: the parsed body via the success transition, any error
/// via the errored one. Exactly one of the two fires per request.
#[derive(Clone)]
pub struct SimpleFetch {
    lifecycle: Lifecycle,
    dispatcher: Dispatcher,
    transport: Arc<dyn Transport>,
    runtime: Handle,
}

/// Configure a [`SimpleFetch`] for `namespace` on the current tokio runtime.
///
/// # Errors
/// Returns [`FetchError::NoRuntime`] when called outside a tokio runtime.
pub fn configure_simple_fetch(
    namespace: impl Into<String>,
    dispatcher: Dispatcher,
    transport: Arc<dyn Transport>,
) -> Result<SimpleFetch, FetchError> {
    let runtime = Handle::try_current().map_err(|e| FetchError::NoRuntime(e.to_string()))?;
    Ok(SimpleFetch::new(
        Lifecycle::new(namespace),
        dispatcher,
        transport,
        runtime,
    ))
}

impl SimpleFetch {
    pub fn new(
        lifecycle: Lifecycle,
        dispatcher: Dispatcher,
        transport: Arc<dyn Transport>,
        runtime: Handle,
    ) -> Self {
        Self {
            lifecycle,
            dispatcher,
            transport,
            runtime,
        }
    }

    pub fn namespace(&self) -> &str {
        self.lifecycle.namespace()
    }

    /// Start a request and return `state` switched to loading.
    ///
    /// Meant to be called from inside a source or update function so the
    /// loading state commits before the outcome is dispatched. Nothing is
    /// sent if the loading transition fails.
    pub fn fetch(
        &self,
        state: &State,
        url: impl Into<String>,
        options: RequestOptions,
    ) -> Result<State, MergeError> {
        let loading = self.lifecycle.loading(state)?;
        self.spawn(url.into(), options);
        Ok(loading)
    }

    /// Dispatch an update that performs [`SimpleFetch::fetch`] on its turn.
    pub fn dispatch_fetch(&self, url: impl Into<String>, options: RequestOptions) -> bool {
        let this = self.clone();
        let url = url.into();
        self.dispatcher.update(move |state, _| {
            Ok(Some(this.fetch(state, url, options)?.into()))
        })
    }

    fn spawn(&self, url: String, options: RequestOptions) {
        let on_success = self.lifecycle.on_success(self.dispatcher.clone());
        let on_failure = self.lifecycle.on_failure::<Value>(self.dispatcher.clone());
        let transport = Arc::clone(&self.transport);
        let namespace = self.namespace().to_string();

        tracing::debug!(namespace = %namespace, url = %url, method = %options.method, "Fetch started");
        self.runtime.spawn(async move {
            match transport.request(&url, &options).await {
                Ok(result) => {
                    tracing::info!(namespace = %namespace, url = %url, "Fetch succeeded");
                    on_success(result);
                }
                Err(err) => {
                    tracing::warn!(
                        namespace = %namespace,
                        url = %url,
                        error = %err,
                        "Fetch failed"
                    );
                    on_failure(Value::from(&err));
                }
            }
        });
    }
}
