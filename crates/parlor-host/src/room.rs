// parlor-host/src/room.rs
// ============================================================================
// Module: Room Host
// Description: Binds one definition to one live room.
// Purpose: Own the state graph, interpreter, roster, and logical clock.
// Dependencies: crate::audit (none), parlor-config, parlor-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! A room is one independent instance of the host bound to a single
//! definition. Creation loads and validates the definition, builds the
//! replicated-state classes, instantiates the root with defaults, compiles
//! the statechart, and starts it. Thereafter the embedding framework
//! forwards client messages (which the room attributes with the sender's
//! session id), reports joins and leaves, and advances the logical clock to
//! fire scheduled work. All methods take `&mut self`: one room equals one
//! serialized execution stream, and concurrency across rooms is the
//! embedding framework's concern.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;

use parlor_config::DefinitionLoader;
use parlor_config::LoaderError;
use parlor_config::RoomOptions;
use parlor_core::Broadcaster;
use parlor_core::ClassName;
use parlor_core::ClassTable;
use parlor_core::DefinitionError;
use parlor_core::Environment;
use parlor_core::EventName;
use parlor_core::GameDefinition;
use parlor_core::HashDigest;
use parlor_core::HashError;
use parlor_core::Interpreter;
use parlor_core::LogicalTime;
use parlor_core::MachineCompileError;
use parlor_core::NoopAuditSink;
use parlor_core::NoopBroadcaster;
use parlor_core::RoomAuditEvent;
use parlor_core::RoomAuditSink;
use parlor_core::Scheduler;
use parlor_core::SchemaError;
use parlor_core::SessionId;
use parlor_core::StateName;
use parlor_core::StateValue;
use parlor_core::compile_machine;
use parlor_core::path_get;
use serde_json::Map;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Room creation and lifecycle errors.
#[derive(Debug, Error)]
pub enum RoomError {
    /// Definition resolution failed.
    #[error(transparent)]
    Loader(#[from] LoaderError),
    /// Definition failed validation.
    #[error(transparent)]
    Definition(#[from] DefinitionError),
    /// Schema could not be built into a class table.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Statechart failed to compile.
    #[error(transparent)]
    Machine(#[from] MachineCompileError),
    /// Definition hashing failed.
    #[error(transparent)]
    Hash(#[from] HashError),
}

// ============================================================================
// SECTION: Dependencies
// ============================================================================

/// Injected collaborators for one room.
pub struct RoomDeps {
    /// Outbound broadcast surface.
    pub broadcaster: Box<dyn Broadcaster>,
    /// Structured audit sink.
    pub audit: Box<dyn RoomAuditSink>,
}

impl Default for RoomDeps {
    fn default() -> Self {
        Self {
            broadcaster: Box::new(NoopBroadcaster),
            audit: Box::new(NoopAuditSink),
        }
    }
}

impl std::fmt::Debug for RoomDeps {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomDeps").finish_non_exhaustive()
    }
}

// ============================================================================
// SECTION: Room
// ============================================================================

/// One live room bound to a definition.
pub struct Room {
    /// Loaded definition (read-only after bind).
    definition: GameDefinition,
    /// Canonical definition digest.
    definition_hash: HashDigest,
    /// Class table built from the definition schema.
    classes: ClassTable,
    /// Statechart interpreter.
    interpreter: Interpreter,
    /// Scheduled-work queue.
    scheduler: Scheduler,
    /// Replicated state root.
    state: StateValue,
    /// Server-only context object (`machine.context ∪ data ∪ {config}`).
    context: Value,
    /// Static definition data object.
    data: Value,
    /// Union of event names handled anywhere in the machine.
    registered_events: BTreeSet<EventName>,
    /// Outbound broadcast surface.
    broadcaster: Box<dyn Broadcaster>,
    /// Structured audit sink.
    audit: Box<dyn RoomAuditSink>,
    /// Current logical time.
    clock: LogicalTime,
    /// Disposal flag; a disposed room drops all inputs.
    disposed: bool,
}

impl std::fmt::Debug for Room {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Room")
            .field("definition", &self.definition.id)
            .field("clock", &self.clock)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

impl Room {
    /// Creates a room from options, resolving the definition via the loader.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError`] when resolution, validation, or binding fails.
    pub fn create(
        options: &RoomOptions,
        loader: &DefinitionLoader,
        deps: RoomDeps,
    ) -> Result<Self, RoomError> {
        let definition = loader.resolve(options)?;
        Self::bind(definition, options.config.clone(), deps)
    }

    /// Binds an already-loaded definition to a new room.
    ///
    /// # Errors
    ///
    /// Returns [`RoomError`] when validation, schema building, machine
    /// compilation, or hashing fails.
    pub fn bind(
        definition: GameDefinition,
        config: Option<Value>,
        deps: RoomDeps,
    ) -> Result<Self, RoomError> {
        definition.validate()?;
        let definition_hash = definition.canonical_hash()?;
        let classes = ClassTable::build(&definition.schema)?;
        let root = classes.instantiate_with_defaults()?;
        let machine = compile_machine(&definition.machine)?;

        let context = build_context(&definition, config);
        let data = Value::Object(definition.data.clone());
        let registered_events: BTreeSet<EventName> = definition
            .machine
            .states
            .values()
            .flat_map(|state| state.on.keys().cloned())
            .collect();

        let mut room = Self {
            definition_hash: definition_hash.clone(),
            definition,
            classes,
            interpreter: Interpreter::new(machine),
            scheduler: Scheduler::new(),
            state: StateValue::Instance(root),
            context,
            data,
            registered_events,
            broadcaster: deps.broadcaster,
            audit: deps.audit,
            clock: LogicalTime::ZERO,
            disposed: false,
        };

        room.audit.emit(&RoomAuditEvent::RoomCreated {
            definition_id: room.definition.id.clone(),
            definition_hash: definition_hash.value,
        });

        let mut env = make_env(
            &mut room.state,
            &room.classes,
            &room.data,
            &room.context,
            &mut room.scheduler,
            room.broadcaster.as_ref(),
            room.audit.as_ref(),
            room.clock,
        );
        room.interpreter.start(&mut env);
        Ok(room)
    }

    // ------------------------------------------------------------------
    // Inbound surface
    // ------------------------------------------------------------------

    /// Forwards one client message as a statechart event.
    ///
    /// The sender's session id is attached to the payload, so actions can
    /// template per-player paths. Non-record payloads and unregistered event
    /// types are dropped with an audit record.
    pub fn handle_message(&mut self, session_id: &SessionId, event_type: &str, payload: &Value) {
        if self.disposed {
            return;
        }
        let Some(fields) = payload.as_object() else {
            self.audit.emit(&RoomAuditEvent::EventDropped {
                event: event_type.to_string(),
                reason: "payload is not a record".to_string(),
            });
            return;
        };
        let event_name = EventName::new(event_type);
        if !self.registered_events.contains(&event_name) {
            self.audit.emit(&RoomAuditEvent::EventDropped {
                event: event_type.to_string(),
                reason: "event type is not registered".to_string(),
            });
            return;
        }

        let mut attributed = fields.clone();
        attributed.insert("sessionId".to_string(), Value::String(session_id.to_string()));
        self.audit.emit(&RoomAuditEvent::EventDispatched {
            session_id: Some(session_id.clone()),
            event: event_name.clone(),
        });

        let mut env = make_env(
            &mut self.state,
            &self.classes,
            &self.data,
            &self.context,
            &mut self.scheduler,
            self.broadcaster.as_ref(),
            self.audit.as_ref(),
            self.clock,
        );
        self.interpreter.send(&mut env, &event_name, &attributed);
    }

    /// Inserts a player for a newly connected session.
    ///
    /// Joins are idempotent: a session already present in `players` keeps
    /// its entry untouched (reconnect semantics).
    pub fn handle_join(&mut self, session_id: &SessionId, name: Option<&str>) {
        if self.disposed {
            return;
        }
        match roster_probe(&self.state, session_id) {
            RosterProbe::Missing => {
                self.audit.emit(&RoomAuditEvent::PathFailed {
                    path: "players".to_string(),
                    reason: "root state declares no players collection".to_string(),
                });
            }
            RosterProbe::Present => {
                self.audit.emit(&RoomAuditEvent::PlayerJoined {
                    session_id: session_id.clone(),
                    rejoined: true,
                });
            }
            RosterProbe::Absent => {
                let player = build_player(&self.classes, name);
                if let Some(players) = roster_mut(&mut self.state) {
                    players.insert(session_id.to_string(), player);
                }
                self.audit.emit(&RoomAuditEvent::PlayerJoined {
                    session_id: session_id.clone(),
                    rejoined: false,
                });
            }
        }
    }

    /// Removes the player entry for a departed session.
    pub fn handle_leave(&mut self, session_id: &SessionId) {
        if self.disposed {
            return;
        }
        let Some(players) = roster_mut(&mut self.state) else {
            return;
        };
        if players.remove(session_id.as_str()).is_some() {
            self.audit.emit(&RoomAuditEvent::PlayerLeft {
                session_id: session_id.clone(),
            });
        }
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Advances the logical clock, firing due scheduled work in order.
    ///
    /// Entries fire in non-decreasing fire-time order with insertion order
    /// breaking ties; each fires at its own timestamp so nested scheduling
    /// observes a consistent `now`.
    pub fn advance_clock(&mut self, to: LogicalTime) {
        if self.disposed {
            self.clock = self.clock.max(to);
            return;
        }
        while let Some(entry) = self.scheduler.pop_due(to) {
            self.clock = self.clock.max(entry.fire_at);
            self.audit.emit(&RoomAuditEvent::BatchFired {
                fire_at: entry.fire_at,
            });
            let mut env = make_env(
                &mut self.state,
                &self.classes,
                &self.data,
                &self.context,
                &mut self.scheduler,
                self.broadcaster.as_ref(),
                self.audit.as_ref(),
                self.clock,
            );
            self.interpreter.handle_scheduled(&mut env, entry.work);
        }
        self.clock = self.clock.max(to);
    }

    /// Stops the room and cancels all pending scheduled work.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        let cancelled = self.scheduler.clear();
        self.disposed = true;
        self.audit.emit(&RoomAuditEvent::RoomDisposed {
            cancelled,
        });
    }

    // ------------------------------------------------------------------
    // Observation surface
    // ------------------------------------------------------------------

    /// Returns the plain-JSON snapshot of the replicated state.
    #[must_use]
    pub fn state_snapshot(&self) -> Value {
        self.state.to_json()
    }

    /// Reads a dotted path out of the replicated state as plain JSON.
    #[must_use]
    pub fn state_at(&self, path: &str) -> Option<Value> {
        path_get(&self.state, path).map(StateValue::to_json)
    }

    /// Returns the current statechart state.
    #[must_use]
    pub fn current_state(&self) -> &StateName {
        self.interpreter.current_state()
    }

    /// Returns the event names the current state accepts.
    #[must_use]
    pub fn acceptable_events(&self) -> Vec<EventName> {
        self.interpreter.acceptable_events()
    }

    /// Returns the union of event names registered from the definition.
    #[must_use]
    pub const fn registered_events(&self) -> &BTreeSet<EventName> {
        &self.registered_events
    }

    /// Returns the canonical definition digest.
    #[must_use]
    pub const fn definition_hash(&self) -> &HashDigest {
        &self.definition_hash
    }

    /// Returns the bound definition.
    #[must_use]
    pub const fn definition(&self) -> &GameDefinition {
        &self.definition
    }

    /// Returns the current logical time.
    #[must_use]
    pub const fn clock(&self) -> LogicalTime {
        self.clock
    }

    /// Returns the number of pending scheduled entries.
    #[must_use]
    pub fn pending_scheduled(&self) -> usize {
        self.scheduler.pending()
    }

    /// Returns true once the room is disposed.
    #[must_use]
    pub const fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Returns the session ids present in the roster.
    #[must_use]
    pub fn sessions(&self) -> Vec<SessionId> {
        match &self.state {
            StateValue::Instance(root) => match root.field("players") {
                Some(StateValue::Map(players)) => {
                    players.keys().map(|key| SessionId::new(key.clone())).collect()
                }
                _ => Vec::new(),
            },
            _ => Vec::new(),
        }
    }
}

// ============================================================================
// SECTION: Binding Helpers
// ============================================================================

/// Builds the server-only context object: `machine.context ∪ data`, with
/// per-room config surfaced at `context.config`.
fn build_context(definition: &GameDefinition, config: Option<Value>) -> Value {
    let mut context = definition.machine.context.clone();
    for (key, value) in &definition.data {
        context.entry(key.clone()).or_insert_with(|| value.clone());
    }
    if let Some(config) = config {
        context.insert("config".to_string(), config);
    }
    Value::Object(context)
}

/// Constructs the environment for one dispatch from disjoint room fields.
#[allow(
    clippy::too_many_arguments,
    reason = "Field-precise borrows of the room cannot go through a method."
)]
fn make_env<'a>(
    state: &'a mut StateValue,
    classes: &'a ClassTable,
    data: &'a Value,
    context: &'a Value,
    scheduler: &'a mut Scheduler,
    broadcaster: &'a dyn Broadcaster,
    audit: &'a dyn RoomAuditSink,
    now: LogicalTime,
) -> Environment<'a> {
    Environment {
        state,
        classes,
        data,
        context,
        scheduler,
        broadcaster,
        audit,
        now,
    }
}

/// Roster lookup outcome for a joining session.
enum RosterProbe {
    /// The root state declares no `players` keyed collection.
    Missing,
    /// The session already has a roster entry.
    Present,
    /// The roster exists and the session is new.
    Absent,
}

/// Probes the roster for a session without taking a mutable borrow.
fn roster_probe(state: &StateValue, session_id: &SessionId) -> RosterProbe {
    match state {
        StateValue::Instance(root) => match root.field("players") {
            Some(StateValue::Map(players)) => {
                if players.contains_key(session_id.as_str()) {
                    RosterProbe::Present
                } else {
                    RosterProbe::Absent
                }
            }
            _ => RosterProbe::Missing,
        },
        _ => RosterProbe::Missing,
    }
}

/// Returns the root `players` keyed collection, when declared.
fn roster_mut(
    state: &mut StateValue,
) -> Option<&mut std::collections::BTreeMap<String, StateValue>> {
    match state {
        StateValue::Instance(root) => match root.field_mut("players") {
            Some(StateValue::Map(players)) => Some(players),
            _ => None,
        },
        _ => None,
    }
}

/// Builds a player value: the definition's `Player` class when declared,
/// otherwise the built-in minimal `{name, score}` record.
fn build_player(classes: &ClassTable, name: Option<&str>) -> StateValue {
    let player_class = ClassName::new("Player");
    if let Ok(mut instance) = classes.new_instance(&player_class) {
        if let Some(name) = name
            && instance.has_field("name")
        {
            let _ = instance.assign("name", StateValue::String(name.to_string()));
        }
        return StateValue::Instance(instance);
    }
    minimal_player(name)
}

/// Built-in fallback player record.
fn minimal_player(name: Option<&str>) -> StateValue {
    let mut fields = std::collections::BTreeMap::new();
    fields.insert(
        "name".to_string(),
        StateValue::String(name.unwrap_or_default().to_string()),
    );
    fields.insert("score".to_string(), StateValue::Number(0.0));
    StateValue::Map(fields)
}

// ============================================================================
// SECTION: Payload Helpers
// ============================================================================

/// Convenience constructor for message payload records.
#[must_use]
pub fn payload(entries: &[(&str, Value)]) -> Value {
    let mut map = Map::with_capacity(entries.len());
    for (key, value) in entries {
        map.insert((*key).to_string(), value.clone());
    }
    Value::Object(map)
}
