//! UI-facing access to resolved microcopy.
//!
//! A [`Subscription`] starts in a loading state, resolves on a background
//! task and publishes the terminal state through a `watch` channel. Changing
//! the request starts a new generation; results from older generations and
//! results arriving after the subscription is dropped are discarded.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::watch;
use tracing::debug;

use crate::model::entry::Language;
use crate::services::resolver::{fallback_marker, Resolution, TextResolver};
use crate::services::template::Variables;

/// Shown by [`MicrocopyElement`] until resolution completes.
pub const LOADING_TEXT: &str = "Laden...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextState {
    Loading { key: String },
    Resolved(String),
    Fallback { key: String },
}

impl TextState {
    pub fn is_loading(&self) -> bool {
        matches!(self, TextState::Loading { .. })
    }

    pub fn text(&self) -> String {
        match self {
            TextState::Loading { key } | TextState::Fallback { key } => fallback_marker(key),
            TextState::Resolved(text) => text.clone(),
        }
    }
}

impl From<Resolution> for TextState {
    fn from(resolution: Resolution) -> Self {
        match resolution {
            Resolution::Found(text) => TextState::Resolved(text),
            Resolution::NotFound { key } => TextState::Fallback { key },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextView {
    pub text: String,
    pub is_loading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextsView {
    pub texts: BTreeMap<String, String>,
    pub is_loading: bool,
}

/// A request a [`Subscription`] can resolve. Equality decides whether an
/// update needs a new resolution.
#[async_trait]
pub trait Resolvable: Clone + PartialEq + Send + Sync + 'static {
    type State: Clone + Send + Sync + 'static;

    fn loading_state(&self) -> Self::State;

    fn is_loading(state: &Self::State) -> bool;

    async fn resolve_state(&self, resolver: &TextResolver) -> Self::State;
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextRequest {
    pub key: String,
    pub variables: Variables,
    pub language: Language,
}

impl TextRequest {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            variables: Variables::new(),
            language: Language::default(),
        }
    }
}

#[async_trait]
impl Resolvable for TextRequest {
    type State = TextState;

    fn loading_state(&self) -> TextState {
        TextState::Loading {
            key: self.key.clone(),
        }
    }

    fn is_loading(state: &TextState) -> bool {
        state.is_loading()
    }

    async fn resolve_state(&self, resolver: &TextResolver) -> TextState {
        resolver
            .resolve(&self.key, &self.variables, self.language)
            .await
            .into()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub keys: Vec<String>,
    pub variables: Variables,
    pub language: Language,
}

#[async_trait]
impl Resolvable for BatchRequest {
    type State = TextsView;

    fn loading_state(&self) -> TextsView {
        TextsView {
            texts: self
                .keys
                .iter()
                .map(|key| (key.clone(), fallback_marker(key)))
                .collect(),
            is_loading: true,
        }
    }

    fn is_loading(state: &TextsView) -> bool {
        state.is_loading
    }

    async fn resolve_state(&self, resolver: &TextResolver) -> TextsView {
        TextsView {
            texts: resolver
                .resolve_texts(&self.keys, &self.variables, self.language)
                .await,
            is_loading: false,
        }
    }
}

// `alive` and `generation` are only written, and only checked before
// publishing, while the channel's value lock is held.
struct Shared<S> {
    tx: watch::Sender<S>,
    alive: AtomicBool,
    generation: AtomicU64,
}

/// Live view of one request. Must be created inside a Tokio runtime.
pub struct Subscription<R: Resolvable> {
    resolver: TextResolver,
    request: R,
    shared: Arc<Shared<R::State>>,
    rx: watch::Receiver<R::State>,
}

impl<R: Resolvable> Subscription<R> {
    fn start(resolver: TextResolver, request: R) -> Self {
        let (tx, rx) = watch::channel(request.loading_state());
        let sub = Self {
            resolver,
            request,
            shared: Arc::new(Shared {
                tx,
                alive: AtomicBool::new(true),
                generation: AtomicU64::new(0),
            }),
            rx,
        };
        sub.spawn_resolution(0);
        sub
    }

    fn spawn_resolution(&self, generation: u64) {
        let resolver = self.resolver.clone();
        let request = self.request.clone();
        let shared = Arc::clone(&self.shared);

        tokio::spawn(async move {
            let state = request.resolve_state(&resolver).await;

            shared.tx.send_if_modified(|current| {
                if !shared.alive.load(Ordering::Acquire) {
                    debug!("subscription dropped, discarding microcopy result");
                    return false;
                }
                if shared.generation.load(Ordering::Acquire) != generation {
                    debug!(generation, "discarding superseded microcopy result");
                    return false;
                }
                *current = state;
                true
            });
        });
    }

    pub fn request(&self) -> &R {
        &self.request
    }

    pub fn state(&self) -> R::State {
        self.rx.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        R::is_loading(&self.rx.borrow())
    }

    /// A receiver for the published states.
    pub fn watch(&self) -> watch::Receiver<R::State> {
        self.rx.clone()
    }

    /// Waits until the current generation reaches a terminal state.
    pub async fn settled(&mut self) -> R::State {
        loop {
            {
                let state = self.rx.borrow_and_update();
                if !R::is_loading(&state) {
                    return state.clone();
                }
            }
            if self.rx.changed().await.is_err() {
                return self.state();
            }
        }
    }

    /// Switches to a new request. Returns `false` and keeps the current
    /// state when the request is structurally equal to the current one.
    pub fn update(&mut self, request: R) -> bool {
        if request == self.request {
            return false;
        }

        self.request = request;
        let loading = self.request.loading_state();
        let shared = &self.shared;
        let mut generation = 0;
        shared.tx.send_modify(|current| {
            generation = shared.generation.fetch_add(1, Ordering::AcqRel) + 1;
            *current = loading;
        });
        self.spawn_resolution(generation);
        true
    }
}

impl Subscription<TextRequest> {
    pub fn view(&self) -> TextView {
        let state = self.rx.borrow();
        TextView {
            text: state.text(),
            is_loading: state.is_loading(),
        }
    }
}

impl<R: Resolvable> Drop for Subscription<R> {
    fn drop(&mut self) {
        let shared = &self.shared;
        shared.tx.send_if_modified(|_| {
            shared.alive.store(false, Ordering::Release);
            false
        });
    }
}

#[derive(Clone)]
pub struct Presenter {
    resolver: TextResolver,
}

impl Presenter {
    pub fn new(resolver: TextResolver) -> Self {
        Self { resolver }
    }

    pub fn resolver(&self) -> &TextResolver {
        &self.resolver
    }

    pub fn subscribe(
        &self,
        key: impl Into<String>,
        variables: Variables,
        language: Language,
    ) -> Subscription<TextRequest> {
        Subscription::start(
            self.resolver.clone(),
            TextRequest {
                key: key.into(),
                variables,
                language,
            },
        )
    }

    pub fn subscribe_many<I, S>(
        &self,
        keys: I,
        variables: Variables,
        language: Language,
    ) -> Subscription<BatchRequest>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Subscription::start(
            self.resolver.clone(),
            BatchRequest {
                keys: keys.into_iter().map(Into::into).collect(),
                variables,
                language,
            },
        )
    }
}

/// Renderable form: a `<span>` holding the resolved text.
#[derive(Debug, Clone, PartialEq)]
pub struct MicrocopyElement {
    request: TextRequest,
    fallback: Option<String>,
    class_name: Option<String>,
}

impl MicrocopyElement {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            request: TextRequest::new(key),
            fallback: None,
            class_name: None,
        }
    }

    pub fn variables(mut self, variables: Variables) -> Self {
        self.request.variables = variables;
        self
    }

    pub fn language(mut self, language: Language) -> Self {
        self.request.language = language;
        self
    }

    pub fn fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }

    pub fn class_name(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    pub fn request(&self) -> &TextRequest {
        &self.request
    }

    pub fn render(&self, state: &TextState) -> String {
        let text = match state {
            TextState::Resolved(text) => text.clone(),
            TextState::Loading { .. } => self
                .fallback
                .clone()
                .unwrap_or_else(|| LOADING_TEXT.to_string()),
            TextState::Fallback { key } => {
                self.fallback.clone().unwrap_or_else(|| fallback_marker(key))
            }
        };

        match &self.class_name {
            Some(class) => format!(
                "<span class=\"{}\">{}</span>",
                escape_html(class),
                escape_html(&text)
            ),
            None => format!("<span>{}</span>", escape_html(&text)),
        }
    }

    pub async fn render_with(&self, resolver: &TextResolver) -> String {
        let state = self.request.resolve_state(resolver).await;
        self.render(&state)
    }
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
