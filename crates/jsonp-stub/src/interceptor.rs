//! Script source interception.
//!
//! [`SourceInterceptor`] owns the interception context (install state plus
//! stub registry) and the synthesizer. Installing it hands a
//! [`SourceAccessor`] to the host; from then on every `script.src = ...`
//! assignment runs [`SourceInterceptor::resolve`].
//!
//! ```rust
//! use jsonp_stub::{SourceInterceptor, UrlPattern};
//! use jsonp_stub::mock::MockDocument;
//! use serde_json::json;
//!
//! let mut document = MockDocument::new();
//! let interceptor = SourceInterceptor::new();
//! interceptor.install(&mut document);
//! interceptor.register(UrlPattern::contains("ads.example").shared(), json!({"slot": "top"}));
//!
//! let script = document.create_script();
//! document.set_src(script, "https://ads.example/ad.js?cbfn=showAd");
//! assert!(document.src(script).starts_with("blob:"));
//! ```

use crate::config::{StubConfig, StubFile};
use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::dom::{AccessorHost, SourceAccessor};
use crate::params::UrlParams;
use crate::pattern::SharedPattern;
use crate::registry::{ConsumedRule, StubRegistry, StubRule};
use crate::result::{StubError, StubResult};
use crate::synth::{
    MemoryResourceStore, PayloadFormatter, ResourceStore, SubstituteResource, Synthesizer,
};
use serde_json::Value;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Where an interceptor is in its install lifecycle
///
/// `Installed` and `Refused` are terminal: there is no uninstall and no retry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum InstallState {
    /// No install attempted yet
    #[default]
    Pending,
    /// The accessor override is in place
    Installed,
    /// The host refused the override
    Refused,
}

/// Install state and rules shared between the interceptor and its accessor
#[derive(Debug, Default)]
pub struct InterceptionContext {
    /// Install lifecycle
    pub state: InstallState,
    /// Registered stubs
    pub registry: StubRegistry,
}

/// Outcome of resolving one assigned source
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No live rule matched
    Unmatched,
    /// A rule matched (and was spent) but the URL had no callback name
    MissingCallback {
        /// Parameter that was looked up
        callback_key: String,
    },
    /// The source was replaced by a synthesized script
    Substituted(SubstituteResource),
}

impl Resolution {
    /// The value the element should end up with
    #[must_use]
    pub fn effective_src(&self, original: &str) -> String {
        match self {
            Self::Substituted(resource) => resource.url.clone(),
            Self::Unmatched | Self::MissingCallback { .. } => original.to_string(),
        }
    }

    /// Check if the source was replaced
    #[must_use]
    pub const fn is_substituted(&self) -> bool {
        matches!(self, Self::Substituted(_))
    }
}

struct Dispatcher {
    context: RefCell<InterceptionContext>,
    synthesizer: Synthesizer,
    diagnostics: Rc<dyn DiagnosticSink>,
}

impl Dispatcher {
    fn try_resolve(&self, src: &str) -> StubResult<Resolution> {
        let Some(rule) = self.consume(src) else {
            tracing::trace!(src, "no stub matched");
            return Ok(Resolution::Unmatched);
        };

        let params = UrlParams::parse(src)?;
        let Some(callback) = params.non_empty(&rule.callback_key) else {
            tracing::debug!(
                src,
                callback_key = %rule.callback_key,
                "stub matched but URL has no callback; passing through"
            );
            return Ok(Resolution::MissingCallback {
                callback_key: rule.callback_key,
            });
        };

        let resource = self.synthesizer.synthesize(callback, &rule.payload)?;
        tracing::debug!(
            src,
            callback,
            substitute = %resource.url,
            remaining_uses = rule.remaining_uses,
            "substituted script source"
        );
        Ok(Resolution::Substituted(resource))
    }

    /// Spend the first live rule matching `src`
    ///
    /// Patterns are evaluated on a snapshot with no borrow held, so a
    /// pattern may query the interceptor. Only the decrement borrows.
    fn consume(&self, src: &str) -> Option<ConsumedRule> {
        let candidates = self.context.borrow().registry.live_patterns();
        candidates
            .iter()
            .filter(|pattern| pattern.matches(src))
            .find_map(|pattern| self.context.borrow_mut().registry.consume_pattern(pattern))
    }

    fn resolve(&self, src: &str) -> String {
        match self.try_resolve(src) {
            Ok(resolution) => resolution.effective_src(src),
            Err(error) => {
                self.report(&error, Some(src));
                src.to_string()
            }
        }
    }

    fn report(&self, error: &StubError, src: Option<&str>) {
        self.diagnostics.report(Diagnostic::from_error(error, src));
    }
}

/// Intercepts script source assignments and substitutes stubbed responses
pub struct SourceInterceptor {
    dispatcher: Rc<Dispatcher>,
    config: StubConfig,
}

impl fmt::Debug for SourceInterceptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let context = self.dispatcher.context.borrow();
        f.debug_struct("SourceInterceptor")
            .field("state", &context.state)
            .field("rules", &context.registry.len())
            .field("config", &self.config)
            .finish()
    }
}

impl Default for SourceInterceptor {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceInterceptor {
    /// Create an interceptor with default config, in-memory store and tracing diagnostics
    #[must_use]
    pub fn new() -> Self {
        SourceInterceptorBuilder::new().build()
    }

    /// Start building a customized interceptor
    #[must_use]
    pub fn builder() -> SourceInterceptorBuilder {
        SourceInterceptorBuilder::new()
    }

    /// Defaults in effect
    #[must_use]
    pub const fn config(&self) -> &StubConfig {
        &self.config
    }

    /// Install the accessor override on `host`
    ///
    /// Never fails: a repeat call, or a host already carrying an override,
    /// reports a warning; a refusing host reports an error. Both go through
    /// the diagnostic sink.
    pub fn install(&self, host: &mut dyn AccessorHost) {
        if let Err(error) = self.try_install(host) {
            self.dispatcher.report(&error, None);
        }
    }

    /// Install the accessor override, returning what went wrong
    ///
    /// A refusal is final: every later attempt returns
    /// [`StubError::InstallRefused`] without touching the host.
    pub fn try_install(&self, host: &mut dyn AccessorHost) -> StubResult<()> {
        match self.install_state() {
            InstallState::Installed => return Err(StubError::AlreadyInstalled),
            InstallState::Refused => {
                return Err(StubError::InstallRefused {
                    message: "an earlier install was refused; installation is not retried"
                        .to_string(),
                })
            }
            InstallState::Pending => {}
        }

        let dispatcher = Rc::clone(&self.dispatcher);
        let defined = host.define_src_accessor(SourceAccessor::new(move |src: &str| {
            dispatcher.resolve(src)
        }));
        if let Err(error @ StubError::InstallRefused { .. }) = defined {
            self.dispatcher.context.borrow_mut().state = InstallState::Refused;
            return Err(error);
        }
        defined?;

        self.dispatcher.context.borrow_mut().state = InstallState::Installed;
        tracing::info!("script src interception installed");
        Ok(())
    }

    /// Check if the accessor override is in place
    #[must_use]
    pub fn is_installed(&self) -> bool {
        self.install_state() == InstallState::Installed
    }

    /// Current install lifecycle state
    #[must_use]
    pub fn install_state(&self) -> InstallState {
        self.dispatcher.context.borrow().state
    }

    /// Register a stub using the configured default uses and callback key
    pub fn register(&self, pattern: SharedPattern, payload: Value) {
        let rule = StubRule::new(pattern, payload)
            .uses(self.config.default_uses)
            .callback_key(&self.config.default_callback_key);
        self.add_rule(rule);
    }

    /// Register a stub with explicit uses and callback key
    pub fn register_with(
        &self,
        pattern: SharedPattern,
        payload: Value,
        uses: u32,
        callback_key: &str,
    ) {
        self.add_rule(StubRule::new(pattern, payload).uses(uses).callback_key(callback_key));
    }

    /// Register a prepared rule, replacing any rule keyed by the same pattern
    pub fn add_rule(&self, rule: StubRule) {
        self.dispatcher.context.borrow_mut().registry.register(rule);
    }

    /// Register every rule of a rule file, defaults taken from this interceptor
    ///
    /// Returns the pattern handles in file order. Nothing is registered if
    /// any rule is invalid.
    pub fn load_rules(&self, file: &StubFile) -> StubResult<Vec<SharedPattern>> {
        let rules = file
            .rules
            .iter()
            .map(|spec| spec.to_rule(&self.config))
            .collect::<StubResult<Vec<_>>>()?;
        let patterns = rules.iter().map(|r| Rc::clone(&r.pattern)).collect();
        let mut context = self.dispatcher.context.borrow_mut();
        for rule in rules {
            context.registry.register(rule);
        }
        Ok(patterns)
    }

    /// Remove the rule keyed by `pattern`
    pub fn unregister<P: ?Sized>(&self, pattern: &Rc<P>) -> bool {
        self.dispatcher
            .context
            .borrow_mut()
            .registry
            .unregister(pattern)
    }

    /// Remove every rule
    pub fn clear_all(&self) {
        self.dispatcher.context.borrow_mut().registry.clear();
    }

    /// Remaining uses of the rule keyed by `pattern`
    #[must_use]
    pub fn remaining_uses<P: ?Sized>(&self, pattern: &Rc<P>) -> Option<u32> {
        self.dispatcher
            .context
            .borrow()
            .registry
            .remaining_uses(pattern)
    }

    /// Number of registered rules
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.dispatcher.context.borrow().registry.len()
    }

    /// Resolve an assigned source, reporting failures and passing through
    pub fn resolve(&self, src: &str) -> String {
        self.dispatcher.resolve(src)
    }

    /// Resolve an assigned source, returning failures
    ///
    /// A matching rule is spent even when the result is an error or
    /// [`Resolution::MissingCallback`].
    pub fn try_resolve(&self, src: &str) -> StubResult<Resolution> {
        self.dispatcher.try_resolve(src)
    }

    /// Create a substitute URL directly, bypassing the registry
    pub fn source_url_for(&self, payload: &Value, callback: &str) -> StubResult<String> {
        self.dispatcher.synthesizer.source_url_for(payload, callback)
    }

    /// Release a substitute URL
    pub fn revoke(&self, url: &str) {
        self.dispatcher.synthesizer.revoke(url);
    }
}

/// Builder for [`SourceInterceptor`]
pub struct SourceInterceptorBuilder {
    config: StubConfig,
    store: Option<Rc<dyn ResourceStore>>,
    formatter: Option<Box<dyn PayloadFormatter>>,
    diagnostics: Option<Rc<dyn DiagnosticSink>>,
}

impl fmt::Debug for SourceInterceptorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceInterceptorBuilder")
            .field("config", &self.config)
            .field("custom_store", &self.store.is_some())
            .field("custom_formatter", &self.formatter.is_some())
            .field("custom_diagnostics", &self.diagnostics.is_some())
            .finish()
    }
}

impl Default for SourceInterceptorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SourceInterceptorBuilder {
    /// Create a new builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: StubConfig::default(),
            store: None,
            formatter: None,
            diagnostics: None,
        }
    }

    /// Set defaults
    #[must_use]
    pub fn config(mut self, config: StubConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the resource store (in-memory by default)
    #[must_use]
    pub fn store(mut self, store: Rc<dyn ResourceStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the payload formatter (JSONP call by default)
    #[must_use]
    pub fn formatter(mut self, formatter: impl PayloadFormatter + 'static) -> Self {
        self.formatter = Some(Box::new(formatter));
        self
    }

    /// Set the diagnostic sink (`tracing` by default)
    #[must_use]
    pub fn diagnostics(mut self, sink: Rc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(sink);
        self
    }

    /// Build the interceptor
    #[must_use]
    pub fn build(self) -> SourceInterceptor {
        let store: Rc<dyn ResourceStore> = match self.store {
            Some(store) => store,
            None => Rc::new(MemoryResourceStore::new(&self.config.blob_origin)),
        };
        let diagnostics: Rc<dyn DiagnosticSink> = match self.diagnostics {
            Some(sink) => sink,
            None => Rc::new(TracingSink),
        };
        let mut synthesizer =
            Synthesizer::new(store).with_content_type(&self.config.content_type);
        if let Some(formatter) = self.formatter {
            synthesizer = synthesizer.with_boxed_formatter(formatter);
        }

        SourceInterceptor {
            dispatcher: Rc::new(Dispatcher {
                context: RefCell::new(InterceptionContext::default()),
                synthesizer,
                diagnostics,
            }),
            config: self.config,
        }
    }
}
