//! The dispatcher.
//!
//! For every inbound event the dispatcher decides which handler methods run,
//! in what order and how many, sends what they return and keeps their timers
//! armed. A groupchat message runs through commentators, then commands, then
//! listeners; a direct message runs through the private commands.
//!
//! Handler calls are synchronous. The only suspension points belong to the
//! [`Transport`], which the dispatcher reaches through plain method calls.
//!
//! A failing or panicking handler never escapes [`Dispatcher::invoke`]: it is
//! logged and treated as having returned nothing.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Weak};

use jibber_core::{
    InboundEvent, Match, Message, OutboundMessage, Reply, ScheduledTask, SendDefaults, Transport,
};
use parking_lot::{Mutex, RwLock};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::{debug, error, info, trace, warn};

use crate::descriptor::ClientConfig;
use crate::error::SetupResult;
use crate::normalizer::normalize;
use crate::registry::HandlerCatalog;
use crate::state::DispatcherState;
use crate::timer::TimerKey;
use crate::trigger::TriggerEntry;

/// The outcome of one handler invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Invocation {
    /// The method ran, whether or not it succeeded.
    pub invoked: bool,
    /// The method returned a non-empty reply.
    pub responded: bool,
    /// Messages the transport accepted.
    pub sent: Vec<OutboundMessage>,
}

impl Invocation {
    fn failed() -> Self {
        Self {
            invoked: true,
            ..Default::default()
        }
    }
}

// ============================================================================
// Builder
// ============================================================================

/// Builder for [`Dispatcher`].
pub struct DispatcherBuilder {
    transport: Arc<dyn Transport>,
    catalog: HandlerCatalog,
    nickname: String,
    rng: Option<StdRng>,
}

impl DispatcherBuilder {
    /// Sets the handler classes configuration may instantiate.
    pub fn catalog(mut self, catalog: HandlerCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Sets the initial nickname.
    pub fn nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = nickname.into();
        self
    }

    /// Sets the random source used for timer jitter.
    pub fn rng(mut self, rng: StdRng) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Seeds the random source used for timer jitter.
    pub fn seed(self, seed: u64) -> Self {
        self.rng(StdRng::seed_from_u64(seed))
    }

    /// Builds the dispatcher with an empty state.
    pub fn build(self) -> Arc<Dispatcher> {
        let rng = self.rng.unwrap_or_else(StdRng::from_entropy);
        Arc::new_cyclic(|this| Dispatcher {
            transport: self.transport,
            catalog: self.catalog,
            nickname: RwLock::new(self.nickname),
            state: RwLock::new(Arc::new(DispatcherState::empty())),
            rng: Mutex::new(rng),
            this: this.clone(),
        })
    }
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes inbound events to handler methods.
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    catalog: HandlerCatalog,
    nickname: RwLock<String>,
    state: RwLock<Arc<DispatcherState>>,
    rng: Mutex<StdRng>,
    this: Weak<Dispatcher>,
}

impl Dispatcher {
    /// Starts building a dispatcher that talks to `transport`.
    pub fn builder(transport: Arc<dyn Transport>) -> DispatcherBuilder {
        DispatcherBuilder {
            transport,
            catalog: HandlerCatalog::new(),
            nickname: "bot".to_string(),
            rng: None,
        }
    }

    /// The bot's current display name.
    pub fn nickname(&self) -> String {
        self.nickname.read().clone()
    }

    /// Changes the display name triggers are rendered against.
    pub fn set_nickname(&self, nickname: impl Into<String>) {
        let nickname = nickname.into();
        info!(nickname = %nickname, "Nickname changed");
        *self.nickname.write() = nickname;
    }

    /// The transport replies go to.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The handler classes this dispatcher can instantiate.
    pub fn catalog(&self) -> &HandlerCatalog {
        &self.catalog
    }

    /// A snapshot of the current state.
    pub fn state(&self) -> Arc<DispatcherState> {
        self.state.read().clone()
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    /// Adopts the nickname of `config` and wires its packages.
    pub fn setup(&self, config: &ClientConfig) -> SetupResult<()> {
        let state = DispatcherState::build(config, &self.catalog, &config.nickname)?;
        self.set_nickname(config.nickname.clone());
        self.install(state);
        Ok(())
    }

    /// Replaces every handler, trigger and timer with those of `config`.
    ///
    /// The new state is built before anything is torn down, so a fatal
    /// configuration error leaves the running state untouched. Calling this
    /// twice with the same configuration leaves one occurrence per timer.
    pub fn setup_packages(&self, config: &ClientConfig) -> SetupResult<()> {
        let state = DispatcherState::build(config, &self.catalog, &self.nickname())?;
        self.install(state);
        Ok(())
    }

    fn install(&self, state: DispatcherState) {
        let new_state = Arc::new(state);
        let old_state = self.state();
        self.cancel_timers(&old_state);
        *self.state.write() = new_state.clone();

        for key in new_state.timers().keys() {
            self.arm_timer(&new_state, key);
        }
    }

    /// Cancels every pending timer and forgets the timer declarations.
    pub fn clear_timers(&self) {
        let mut state = self.state.write();
        self.cancel_timers(&state);
        *state = Arc::new(state.without_timers());
    }

    fn cancel_timers(&self, state: &DispatcherState) {
        for key in state.timers().keys() {
            if !self.transport.cancel_schedule(&key.schedule_key()) {
                debug!(key = %key, "Timer was not scheduled");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Inbound events
    // ------------------------------------------------------------------------

    /// Routes an event from the transport.
    pub fn handle(&self, event: &InboundEvent) {
        trace!(event = event.event_name(), "Handling event");
        match event {
            InboundEvent::Message(message) => self.on_message(message),
            InboundEvent::Raw { name, message } => self.on_raw_event(name, message),
            InboundEvent::NicknameChanged(nickname) => self.set_nickname(nickname.clone()),
        }
    }

    /// Dispatches a chat message.
    pub fn on_message(&self, message: &Message) {
        let state = self.state();
        if message.is_chat() {
            self.run_private_commands(&state, message);
        } else if message.is_groupchat() {
            self.run_commentators(&state, message);
            self.run_commands(&state, message);
            self.run_listeners(&state, message);
        } else {
            trace!(kind = %message.kind, "Ignoring message");
        }
    }

    /// Calls every method subscribed to the transport event `name`.
    pub fn on_raw_event(&self, name: &str, message: &Message) {
        let state = self.state();
        let target = if message.room.is_empty() {
            &message.from
        } else {
            &message.room
        };
        let defaults = SendDefaults {
            target: (!target.is_empty()).then(|| target.clone()),
            kind: Some(message.kind),
            extra: Default::default(),
        };
        for subscriber in state.triggers().raw_subscribers(name) {
            self.invoke(&state, &subscriber.alias, &subscriber.method, message, None, &defaults);
        }
    }

    /// Runs commentators until one of them says something.
    ///
    /// Skipped entirely when the message is the bot's own recent commentary.
    /// The window holds bodies, not senders.
    pub fn run_commentators(&self, state: &DispatcherState, message: &Message) {
        let nickname = self.nickname();
        if message.nick == nickname && state.commentary().lock().contains(&message.body) {
            trace!(body = %message.body, "Not commenting on own commentary");
            return;
        }

        let defaults = SendDefaults::groupchat(&message.room);
        for entry in &state.triggers().commentators {
            let Some(matched) = entry.trigger.search(&nickname, &message.body) else {
                continue;
            };
            let outcome = self.invoke_entry(state, entry, message, &matched, &defaults);
            if outcome.responded {
                let mut window = state.commentary().lock();
                for sent in outcome.sent {
                    window.push(sent.body);
                }
                break;
            }
        }
    }

    /// Runs commands, stopping once `commands_max_match` of them replied.
    pub fn run_commands(&self, state: &DispatcherState, message: &Message) {
        let nickname = self.nickname();
        if message.nick == nickname {
            return;
        }

        let defaults = SendDefaults::groupchat(&message.room);
        let mut matched = 0;
        for entry in &state.triggers().commands {
            if matched >= state.commands_max_match() {
                break;
            }
            let Some(found) = entry.trigger.search(&nickname, &message.body) else {
                continue;
            };
            if self.invoke_entry(state, entry, message, &found, &defaults).responded {
                matched += 1;
            }
        }
        trace!(matched, "Commands done");
    }

    /// Calls every listener with the message. Return values are ignored.
    pub fn run_listeners(&self, state: &DispatcherState, message: &Message) {
        if message.nick == self.nickname() {
            return;
        }

        for listener in &state.triggers().listeners {
            let Some(handler) = state.handlers().get(&listener.alias) else {
                error!(alias = %listener.alias, "Listener handler is not registered");
                continue;
            };
            let result = catch_unwind(AssertUnwindSafe(|| {
                handler.call(&listener.method, message, None, self)
            }));
            match result {
                Ok(Some(Ok(_))) => {}
                Ok(Some(Err(e))) => {
                    error!(alias = %listener.alias, method = %listener.method, error = ?e, "Error calling listener");
                }
                Ok(None) => {
                    error!(alias = %listener.alias, method = %listener.method, "Listener method is not declared");
                }
                Err(panic) => {
                    error!(
                        alias = %listener.alias,
                        method = %listener.method,
                        panic = %panic_message(&*panic),
                        "Listener panicked"
                    );
                }
            }
        }
    }

    /// Runs every private command that matches a direct message.
    pub fn run_private_commands(&self, state: &DispatcherState, message: &Message) {
        if !message.is_chat() {
            return;
        }

        let nickname = self.nickname();
        let defaults = SendDefaults::chat(&message.from);
        for entry in &state.triggers().private_commands {
            if let Some(matched) = entry.trigger.search(&nickname, &message.body) {
                self.invoke_entry(state, entry, message, &matched, &defaults);
            }
        }
    }

    fn invoke_entry(
        &self,
        state: &DispatcherState,
        entry: &TriggerEntry,
        message: &Message,
        matched: &Match,
        defaults: &SendDefaults,
    ) -> Invocation {
        debug!(alias = %entry.alias, method = %entry.method, pattern = entry.trigger.pattern(), "Trigger matched");
        self.invoke(state, &entry.alias, &entry.method, message, Some(matched), defaults)
    }

    // ------------------------------------------------------------------------
    // Invocation
    // ------------------------------------------------------------------------

    /// Calls a handler method, sends its reply and re-arms its timer.
    ///
    /// Never fails: a missing handler or method, an error and a panic are
    /// all logged and reported as an [`Invocation`] that did not respond.
    /// A timer whose method errors or panics is not re-armed.
    pub fn invoke(
        &self,
        state: &DispatcherState,
        alias: &str,
        method: &str,
        message: &Message,
        matched: Option<&Match>,
        defaults: &SendDefaults,
    ) -> Invocation {
        let Some(handler) = state.handlers().get(alias) else {
            error!(alias, method, "Handler is not registered");
            return Invocation::default();
        };

        let result = catch_unwind(AssertUnwindSafe(|| handler.call(method, message, matched, self)));
        let reply = match result {
            Ok(Some(Ok(reply))) => reply,
            Ok(Some(Err(e))) => {
                error!(alias, method, error = ?e, "Handler method failed");
                return Invocation::failed();
            }
            Ok(None) => {
                error!(alias, method, "Handler has no such method");
                return Invocation::default();
            }
            Err(panic) => {
                error!(alias, method, panic = %panic_message(&*panic), "Handler method panicked");
                return Invocation::failed();
            }
        };

        let responded = !reply.is_empty();
        let sent = self.send_reply(reply, defaults);

        let key = TimerKey::new(alias, method);
        if state.timers().contains(&key) {
            self.arm_timer(state, &key);
        }

        Invocation {
            invoked: true,
            responded,
            sent,
        }
    }

    // ------------------------------------------------------------------------
    // Timers
    // ------------------------------------------------------------------------

    /// Schedules the next occurrence of `key`, replacing any pending one.
    pub fn arm_timer(&self, state: &DispatcherState, key: &TimerKey) {
        let Some(entry) = state.timers().get(key) else {
            warn!(key = %key, "Timer is not declared");
            return;
        };
        let schedule_key = key.schedule_key();
        if !self.transport.cancel_schedule(&schedule_key) {
            debug!(key = %schedule_key, "No pending occurrence to cancel");
        }

        let delay = entry.delay.resolve(&mut *self.rng.lock());
        let this = self.this.clone();
        let fired = key.clone();
        let task: ScheduledTask = Box::new(move || {
            if let Some(dispatcher) = this.upgrade() {
                dispatcher.fire_timer(&fired);
            }
        });

        match self.transport.schedule(&schedule_key, delay, task) {
            Ok(()) => debug!(key = %schedule_key, delay_secs = delay.as_secs(), "Timer armed"),
            Err(e) => warn!(key = %schedule_key, error = %e, "Failed to arm timer"),
        }
    }

    /// Runs a timer occurrence against the current state.
    pub fn fire_timer(&self, key: &TimerKey) {
        let state = self.state();
        let Some(defaults) = state.timer_defaults(key).cloned() else {
            debug!(key = %key, "Timer no longer declared; not firing");
            return;
        };
        trace!(key = %key, "Timer fired");
        self.invoke(&state, &key.alias, &key.method, &Message::default(), None, &defaults);
    }

    // ------------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------------

    /// Sends one message. Transport errors are logged and reported as `false`.
    pub fn send(&self, message: OutboundMessage) -> bool {
        match self.transport.send(message.clone()) {
            Ok(()) => true,
            Err(e) => {
                error!(message = ?message, error = %e, "Failed to send message");
                false
            }
        }
    }

    /// Normalizes `reply` against `defaults` and sends the result.
    ///
    /// Returns the messages the transport accepted.
    pub fn send_reply(&self, reply: Reply, defaults: &SendDefaults) -> Vec<OutboundMessage> {
        normalize(reply, defaults)
            .into_iter()
            .filter(|message| self.send(message.clone()))
            .collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{HandlerDescriptor, TimerGroup};
    use crate::handler::{Handler, HandlerResult, Methods};
    use crate::testing::RecordingTransport;
    use jibber_core::MessageKind;
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Probe {
        heard: Arc<AtomicUsize>,
    }

    impl Probe {
        fn hello(&self, msg: &Message, _: Option<&Match>, _: &Dispatcher) -> HandlerResult {
            Ok(Reply::text(format!("hello {}", msg.nick)))
        }

        fn quiet(&self, _: &Message, _: Option<&Match>) -> HandlerResult {
            Ok(Reply::None)
        }

        fn fail(&self, _: &Message, _: Option<&Match>, _: &Dispatcher) -> HandlerResult {
            anyhow::bail!("broken")
        }

        fn explode(&self, _: &Message, _: Option<&Match>, _: &Dispatcher) -> HandlerResult {
            panic!("boom")
        }

        fn listen(&self, _: &Message, _: Option<&Match>, _: &Dispatcher) -> HandlerResult {
            self.heard.fetch_add(1, Ordering::SeqCst);
            Ok(Reply::text("ignored"))
        }

        fn whoami(&self, _: &Message, _: Option<&Match>, bot: &Dispatcher) -> HandlerResult {
            Ok(Reply::text(bot.nickname()))
        }

        fn first(&self, _: &Message, _: Option<&Match>, _: &Dispatcher) -> HandlerResult {
            Ok(Reply::text("first"))
        }

        fn second(&self, _: &Message, _: Option<&Match>, _: &Dispatcher) -> HandlerResult {
            Ok(Reply::text("second"))
        }
    }

    impl Handler for Probe {
        fn methods() -> Methods<Self> {
            Methods::new()
                .method("hello", Self::hello)
                .legacy("quiet", Self::quiet)
                .method("fail", Self::fail)
                .method("explode", Self::explode)
                .method("listen", Self::listen)
                .method("whoami", Self::whoami)
                .method("first", Self::first)
                .method("second", Self::second)
        }
    }

    const ROOM: &str = "room@chat.example.com";

    fn dispatcher(transport: &Arc<RecordingTransport>) -> Arc<Dispatcher> {
        counting_dispatcher(transport, Arc::default())
    }

    fn counting_dispatcher(
        transport: &Arc<RecordingTransport>,
        heard: Arc<AtomicUsize>,
    ) -> Arc<Dispatcher> {
        let catalog = HandlerCatalog::new().with("test.Probe", move |_: &Value| {
            Ok(Probe {
                heard: heard.clone(),
            })
        });
        Dispatcher::builder(transport.clone())
            .catalog(catalog)
            .seed(1)
            .build()
    }

    fn config(descriptor: HandlerDescriptor) -> ClientConfig {
        ClientConfig {
            packages: vec![descriptor],
            ..Default::default()
        }
    }

    #[test]
    fn test_failures_do_not_stop_later_commands() {
        let transport = Arc::new(RecordingTransport::new());
        let bot = dispatcher(&transport);
        bot.setup(&config(
            HandlerDescriptor::new("test.Probe")
                .with_alias("probe")
                .command("^hi", "fail")
                .command("^hi", "explode")
                .command("^hi", "quiet")
                .command("^hi", "hello"),
        ))
        .unwrap();

        bot.on_message(&Message::groupchat(ROOM, "alice", "hi"));

        let sent = transport.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body, "hello alice");
        assert_eq!(sent[0].kind, MessageKind::Groupchat);
    }

    #[test]
    fn test_ignores_own_messages() {
        let transport = Arc::new(RecordingTransport::new());
        let bot = dispatcher(&transport);
        bot.setup(&config(
            HandlerDescriptor::new("test.Probe")
                .command("^hi", "hello")
                .listener("listen"),
        ))
        .unwrap();

        bot.on_message(&Message::groupchat(ROOM, "bot", "hi"));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_listeners_run_and_their_replies_are_dropped() {
        let transport = Arc::new(RecordingTransport::new());
        let heard = Arc::new(AtomicUsize::new(0));
        let bot = counting_dispatcher(&transport, heard.clone());
        bot.setup(&config(
            HandlerDescriptor::new("test.Probe")
                .listener("fail")
                .listener("explode")
                .listener("listen"),
        ))
        .unwrap();

        bot.on_message(&Message::groupchat(ROOM, "alice", "anything"));
        bot.on_message(&Message::groupchat(ROOM, "alice", "more"));
        assert!(transport.sent().is_empty());
        assert_eq!(heard.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_one_commentary_per_event_before_commands() {
        let transport = Arc::new(RecordingTransport::new());
        let bot = dispatcher(&transport);
        bot.setup(&config(
            HandlerDescriptor::new("test.Probe")
                .command("^tea", "hello")
                .commentator("^tea", "first")
                .commentator("^tea", "second"),
        ))
        .unwrap();

        bot.on_message(&Message::groupchat(ROOM, "alice", "tea time"));

        let bodies: Vec<_> = transport.take_sent().into_iter().map(|m| m.body).collect();
        assert_eq!(bodies, vec!["first".to_string(), "hello alice".to_string()]);
    }

    #[test]
    fn test_failing_timer_is_not_rearmed() {
        let transport = Arc::new(RecordingTransport::new());
        let bot = dispatcher(&transport);
        bot.setup(&config(
            HandlerDescriptor::new("test.Probe")
                .with_alias("probe")
                .timer_group(
                    TimerGroup::new(SendDefaults::groupchat(ROOM))
                        .every(5, "fail")
                        .every(7, "explode")
                        .every(9, "hello"),
                ),
        ))
        .unwrap();
        assert_eq!(transport.scheduled_keys().len(), 3);

        assert!(transport.fire("('probe', 'fail')"));
        assert!(transport.fire("('probe', 'explode')"));
        assert!(transport.fire("('probe', 'hello')"));

        assert_eq!(transport.scheduled_keys(), vec!["('probe', 'hello')".to_string()]);
        assert_eq!(transport.schedule_history().len(), 4);
    }

    #[test]
    fn test_private_commands_reply_to_sender() {
        let transport = Arc::new(RecordingTransport::new());
        let bot = dispatcher(&transport);
        bot.setup(&config(
            HandlerDescriptor::new("test.Probe")
                .private_command("^who", "whoami")
                .private_command("^who", "whoami"),
        ))
        .unwrap();

        bot.on_message(&Message::chat("alice@example.com/home", "who are you"));
        bot.on_message(&Message::groupchat(ROOM, "alice", "who are you"));

        let sent = transport.take_sent();
        assert_eq!(sent.len(), 2);
        assert!(sent.iter().all(|m| m.target == "alice@example.com/home"));
        assert!(sent.iter().all(|m| m.kind == MessageKind::Chat));
        assert_eq!(sent[0].body, "bot");
    }

    #[test]
    fn test_trigger_follows_nickname_change() {
        let transport = Arc::new(RecordingTransport::new());
        let bot = dispatcher(&transport);
        bot.setup(&config(
            HandlerDescriptor::new("test.Probe").command("^%(nickname)s: hi", "hello"),
        ))
        .unwrap();

        bot.handle(&InboundEvent::NicknameChanged("jibber".into()));
        bot.on_message(&Message::groupchat(ROOM, "alice", "bot: hi"));
        assert!(transport.sent().is_empty());

        bot.on_message(&Message::groupchat(ROOM, "alice", "Jibber: hi"));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn test_raw_event_subscribers() {
        let transport = Arc::new(RecordingTransport::new());
        let bot = dispatcher(&transport);
        bot.setup(&config(
            HandlerDescriptor::new("test.Probe").raw_handler("presence_unavailable", "hello"),
        ))
        .unwrap();

        bot.handle(&InboundEvent::Raw {
            name: "presence_unavailable".into(),
            message: Message::groupchat(ROOM, "alice", ""),
        });
        bot.on_raw_event("session_start", &Message::default());

        let sent = transport.take_sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].target, ROOM);
    }

    #[test]
    fn test_send_failures_are_swallowed() {
        let transport = Arc::new(RecordingTransport::new());
        let bot = dispatcher(&transport);
        bot.setup(&config(HandlerDescriptor::new("test.Probe").command("^hi", "hello")))
            .unwrap();

        transport.set_fail_sends(true);
        bot.on_message(&Message::groupchat(ROOM, "alice", "hi"));
        assert!(transport.sent().is_empty());

        transport.set_fail_sends(false);
        bot.on_message(&Message::groupchat(ROOM, "alice", "hi"));
        assert_eq!(transport.sent().len(), 1);
    }

    #[test]
    fn test_fatal_setup_keeps_previous_state() {
        let transport = Arc::new(RecordingTransport::new());
        let bot = dispatcher(&transport);
        bot.setup(&config(
            HandlerDescriptor::new("test.Probe")
                .with_alias("probe")
                .timer_group(TimerGroup::new(SendDefaults::groupchat(ROOM)).every(30, "hello")),
        ))
        .unwrap();

        let broken = ClientConfig {
            nickname: "other".into(),
            commentary_qsize: 0,
            ..Default::default()
        };
        assert!(bot.setup_packages(&broken).is_err());
        assert!(bot.setup(&broken).is_err());
        assert_eq!(bot.nickname(), "bot");
        assert_eq!(bot.state().handlers().len(), 1);
        assert_eq!(transport.scheduled_keys(), vec!["('probe', 'hello')".to_string()]);
    }

    #[test]
    fn test_clear_timers() {
        let transport = Arc::new(RecordingTransport::new());
        let bot = dispatcher(&transport);
        bot.setup(&config(
            HandlerDescriptor::new("test.Probe")
                .with_alias("probe")
                .command("^hi", "hello")
                .timer_group(TimerGroup::new(SendDefaults::groupchat(ROOM)).every(30, "hello")),
        ))
        .unwrap();

        bot.clear_timers();
        assert!(transport.scheduled_keys().is_empty());
        assert!(bot.state().timers().is_empty());

        bot.on_message(&Message::groupchat(ROOM, "alice", "hi"));
        assert_eq!(transport.sent().len(), 1);
        assert!(transport.scheduled_keys().is_empty());
    }
}
