// SPDX-License-Identifier: GPL-3.0-or-later

//! The IPC connection loop: a `calloop` `Generic` source accepts
//! connections off a `UnixListener`, and each accepted stream gets its own
//! `Generic` read source keyed by raw fd, looked up in shared state on each
//! readiness callback rather than owning a per-source future.

use super::codec::{Decoder, Frame, PayloadReader, PayloadWriter};
use super::opcodes::{RequestOpcode, ResponseOpcode};
use crate::affordance::Registry;
use crate::agent::{vars, Agent, SpawnParams};
use crate::config::Config;
use crate::environment::{Environment, PointerArbiter};
use crate::error::IpcError;
use crate::interpreter::AgentEvent;
use crate::prototype::store::Store;
use calloop::generic::Generic;
use calloop::{Interest, LoopHandle, Mode, PostAction};
use std::collections::{HashMap, HashSet};
use std::io::{Read, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

const READ_CHUNK: usize = 4096;

struct SelectionRequest {
    client_fd: RawFd,
    event_id: u32,
}

/// Everything the IPC layer needs from the running daemon: the Store, the
/// live agent table, and the pointer/affordance state agents and the tick
/// loop also touch. Shared by `Arc` between the tick source and every
/// connection's dispatch call.
pub struct Runtime {
    pub store: Arc<Store>,
    pub agents: Mutex<HashMap<u32, Arc<Mutex<Agent>>>>,
    pub affordances: Registry,
    pub config: Mutex<Config>,
    pub pointer: Mutex<PointerArbiter>,
    pub environment: Mutex<Box<dyn Environment + Send>>,
    next_agent_id: AtomicU32,
    tick_counter: AtomicU64,
    stop_requested: AtomicBool,
    subscriptions: Mutex<HashMap<RawFd, HashSet<String>>>,
    selection_requests: Mutex<Vec<SelectionRequest>>,
}

impl Runtime {
    pub fn new(store: Arc<Store>, environment: Box<dyn Environment + Send>, config: Config) -> Self {
        Runtime {
            store,
            agents: Mutex::new(HashMap::new()),
            affordances: Registry::new(256),
            config: Mutex::new(config),
            pointer: Mutex::new(PointerArbiter::new()),
            environment: Mutex::new(environment),
            next_agent_id: AtomicU32::new(1),
            tick_counter: AtomicU64::new(0),
            stop_requested: AtomicBool::new(false),
            subscriptions: Mutex::new(HashMap::new()),
            selection_requests: Mutex::new(Vec::new()),
        }
    }

    pub fn should_stop(&self) -> bool {
        self.stop_requested.load(Ordering::Relaxed)
    }

    fn on_client_gone(&self, fd: RawFd) {
        self.subscriptions.lock().unwrap().remove(&fd);
        self.selection_requests.lock().unwrap().retain(|r| r.client_fd != fd);
    }

    /// Drive every live agent through one tick of the Action Interpreter,
    /// then apply the clone/transform/dispose events it deferred as data
    ///.
    /// Called by the daemon's tick timer source.
    pub fn run_tick(&self) {
        let tick = self.tick_counter.fetch_add(1, Ordering::Relaxed);
        let mut env = self.environment.lock().unwrap();
        let ids: Vec<u32> = self.agents.lock().unwrap().keys().copied().collect();

        let mut pending = Vec::new();
        for id in ids {
            let handle = self.agents.lock().unwrap().get(&id).cloned();
            let Some(handle) = handle else { continue };
            let weak = Arc::downgrade(&handle);
            let mut agent = handle.lock().expect("agent mutex poisoned");
            let events = agent.tick(tick, &mut **env, &self.affordances, weak);
            drop(agent);
            pending.push((id, events));
        }
        drop(env);

        for (id, events) in pending {
            for event in events {
                self.apply_event(id, event);
            }
        }
    }

    fn apply_event(&self, source_id: u32, event: AgentEvent) {
        match event {
            AgentEvent::Dispose => {
                self.agents.lock().unwrap().remove(&source_id);
            }
            AgentEvent::Transform { prototype_name, behaviour_name } => {
                let Some(handle) = self.agents.lock().unwrap().get(&source_id).cloned() else {
                    return;
                };
                let mut agent = handle.lock().expect("agent mutex poisoned");
                let proto = prototype_name
                    .as_deref()
                    .and_then(|n| self.store.get_by_name(n))
                    .unwrap_or_else(|| agent.prototype.clone());
                let x = agent.local(vars::slot::X) as i32;
                let y = agent.local(vars::slot::Y) as i32;
                let looking_right = agent.local(vars::slot::LookingRight) != 0.0;
                let surface = agent.surface;
                *agent = Agent::spawn(
                    source_id,
                    proto,
                    surface,
                    SpawnParams {
                        initial_behaviour: behaviour_name,
                        vx: 0.0,
                        vy: 0.0,
                        x,
                        y,
                        gravity: 1.0,
                        drag_x: 0.9,
                        drag_y: 0.9,
                        looking_right,
                    },
                );
            }
            AgentEvent::Clone { prototype_name, behaviour_name, x, y, looking_right } => {
                let proto = match prototype_name.as_deref().and_then(|n| self.store.get_by_name(n)) {
                    Some(p) => Some(p),
                    None => self.agents.lock().unwrap().get(&source_id).map(|a| a.lock().unwrap().prototype.clone()),
                };
                let Some(proto) = proto else { return };
                let id = self.next_agent_id.fetch_add(1, Ordering::Relaxed);
                let agent = Agent::spawn(
                    id,
                    proto,
                    id,
                    SpawnParams {
                        initial_behaviour: behaviour_name,
                        vx: 0.0,
                        vy: 0.0,
                        x,
                        y,
                        gravity: 1.0,
                        drag_x: 0.9,
                        drag_y: 0.9,
                        looking_right,
                    },
                );
                self.agents.lock().unwrap().insert(id, Arc::new(Mutex::new(agent)));
            }
        }
    }

    /// Deliver a picked screen coordinate to every pending selection request
    ///. Called from wherever pointer press events are dispatched.
    pub fn fulfil_selection(&self, x: i32, y: i32) -> Vec<(RawFd, Frame)> {
        let requests = std::mem::take(&mut *self.selection_requests.lock().unwrap());
        self.pointer.lock().unwrap().set_selection_mode(false);
        requests
            .into_iter()
            .map(|r| {
                let mut w = PayloadWriter::new();
                w.write_i32(x).write_i32(y);
                (r.client_fd, Frame::new(ResponseOpcode::SelectionResult.as_byte(), r.event_id, w.into_bytes()))
            })
            .collect()
    }

    fn request_result(event_id: u32, ok: bool, reason: Option<&str>) -> Frame {
        let mut w = PayloadWriter::new();
        w.write_u8(ok as u8).write_str(reason.unwrap_or(""));
        Frame::new(ResponseOpcode::RequestResult.as_byte(), event_id, w.into_bytes())
    }

    fn protocol_error(event_id: u32, err: &IpcError) -> Frame {
        let mut w = PayloadWriter::new();
        w.write_str(err.reason());
        Frame::new(ResponseOpcode::ProtocolError.as_byte(), event_id, w.into_bytes())
    }

    /// Handle one decoded frame from `client_fd`, returning every response
    /// frame it produces addressed by recipient fd (usually just the
    /// sender, but selection results and subscribed events may fan out).
    pub fn dispatch(&self, client_fd: RawFd, frame: Frame) -> Vec<(RawFd, Frame)> {
        let event_id = frame.event_id;
        let Some(opcode) = RequestOpcode::from_byte(frame.packet_id) else {
            return vec![(
                client_fd,
                Self::protocol_error(event_id, &IpcError::UnknownOpcode(frame.packet_id)),
            )];
        };
        let mut reader = PayloadReader::new(&frame.payload);

        let result = match opcode {
            RequestOpcode::ClientHello => Ok(self.handle_hello(event_id)),
            RequestOpcode::DescribePrototype => self.handle_describe_prototype(&mut reader, event_id),
            RequestOpcode::ListMascotsByEnv => self.handle_list_mascots(&mut reader, event_id),
            RequestOpcode::DescribeMascot => self.handle_describe_mascot(&mut reader, event_id),
            RequestOpcode::Summon => self.handle_summon(&mut reader, event_id),
            RequestOpcode::Dismiss => self.handle_dismiss(&mut reader, event_id),
            RequestOpcode::SetBehaviour => self.handle_set_behaviour(&mut reader, event_id),
            RequestOpcode::ReloadPrototype => self.handle_reload(&mut reader, event_id),
            RequestOpcode::Stop => {
                self.stop_requested.store(true, Ordering::Relaxed);
                Ok(vec![Frame::empty(ResponseOpcode::Done.as_byte(), event_id)])
            }
            RequestOpcode::Config => self.handle_config(&mut reader, event_id),
            RequestOpcode::SubscribeEvent => self.handle_subscription(client_fd, &mut reader, event_id, true),
            RequestOpcode::UnsubscribeEvent => self.handle_subscription(client_fd, &mut reader, event_id, false),
            RequestOpcode::BeginSelection => {
                self.selection_requests.lock().unwrap().push(SelectionRequest { client_fd, event_id });
                self.pointer.lock().unwrap().set_selection_mode(true);
                Ok(vec![])
            }
            RequestOpcode::CancelSelection => {
                self.selection_requests.lock().unwrap().retain(|r| r.client_fd != client_fd);
                if self.selection_requests.lock().unwrap().is_empty() {
                    self.pointer.lock().unwrap().set_selection_mode(false);
                }
                Ok(vec![Self::request_result(event_id, true, None)])
            }
        };

        match result {
            Ok(frames) => frames.into_iter().map(|f| (client_fd, f)).collect(),
            Err(err) => vec![(client_fd, Self::protocol_error(event_id, &err))],
        }
    }

    fn handle_hello(&self, event_id: u32) -> Vec<Frame> {
        let mut frames = vec![Frame::empty(ResponseOpcode::ServerHello.as_byte(), event_id)];

        let mut init = PayloadWriter::new();
        init.write_u8(1); // initialisation always complete by the time the socket accepts
        frames.push(Frame::new(ResponseOpcode::InitStatus.as_byte(), event_id, init.into_bytes()));

        for name in self.store.names() {
            let mut w = PayloadWriter::new();
            w.write_str(&name);
            frames.push(Frame::new(ResponseOpcode::PrototypeAnnouncement.as_byte(), event_id, w.into_bytes()));
        }

        let env = self.environment.lock().unwrap();
        let mut envw = PayloadWriter::new();
        envw.write_u32(0).write_i32(env.screen_width()).write_i32(env.screen_height());
        drop(env);
        frames.push(Frame::new(ResponseOpcode::Environment.as_byte(), event_id, envw.into_bytes()));

        let mut info = PayloadWriter::new();
        info.write_u32(self.agents.lock().unwrap().len() as u32);
        info.write_u32(self.store.count() as u32);
        frames.push(Frame::new(ResponseOpcode::Info.as_byte(), event_id, info.into_bytes()));

        frames.push(Frame::empty(ResponseOpcode::Done.as_byte(), event_id));
        frames
    }

    fn handle_describe_prototype(&self, r: &mut PayloadReader, event_id: u32) -> Result<Vec<Frame>, IpcError> {
        let name = r.read_str()?;
        let Some(proto) = self.store.get_by_name(&name) else {
            return Err(IpcError::UnknownPrototype(name));
        };
        let mut part = PayloadWriter::new();
        part.write_str(&proto.display_name).write_u32(proto.actions.len() as u32).write_u32(proto.behaviours.len() as u32);
        Ok(vec![
            Frame::new(ResponseOpcode::DescriptionPart.as_byte(), event_id, part.into_bytes()),
            Frame::empty(ResponseOpcode::DescriptionEnd.as_byte(), event_id),
        ])
    }

    fn handle_list_mascots(&self, r: &mut PayloadReader, event_id: u32) -> Result<Vec<Frame>, IpcError> {
        let _env_id = r.read_u32()?;
        let agents = self.agents.lock().unwrap();
        let mut frames: Vec<Frame> = agents
            .keys()
            .map(|id| {
                let mut w = PayloadWriter::new();
                w.write_u32(*id);
                Frame::new(ResponseOpcode::MascotAnnouncement.as_byte(), event_id, w.into_bytes())
            })
            .collect();
        let mut list = PayloadWriter::new();
        list.write_u32(agents.len() as u32);
        for id in agents.keys() {
            list.write_u32(*id);
        }
        frames.push(Frame::new(ResponseOpcode::MascotIdList.as_byte(), event_id, list.into_bytes()));
        frames.push(Frame::empty(ResponseOpcode::Done.as_byte(), event_id));
        Ok(frames)
    }

    fn handle_describe_mascot(&self, r: &mut PayloadReader, event_id: u32) -> Result<Vec<Frame>, IpcError> {
        let id = r.read_u32()?;
        let agents = self.agents.lock().unwrap();
        let Some(agent) = agents.get(&id) else {
            return Err(IpcError::UnknownMascotId(id));
        };
        let agent = agent.lock().expect("agent mutex poisoned");
        let mut w = PayloadWriter::new();
        w.write_str(&agent.prototype.name);
        w.write_i32(agent.local(crate::agent::vars::slot::X) as i32);
        w.write_i32(agent.local(crate::agent::vars::slot::Y) as i32);
        w.write_str(agent.current_behaviour.as_ref().map(|b| b.name.as_str()).unwrap_or(""));
        Ok(vec![Frame::new(ResponseOpcode::MascotInfo.as_byte(), event_id, w.into_bytes())])
    }

    fn handle_summon(&self, r: &mut PayloadReader, event_id: u32) -> Result<Vec<Frame>, IpcError> {
        let name = r.read_str()?;
        let x = r.read_i32()?;
        let y = r.read_i32()?;
        let Some(proto) = self.store.get_by_name(&name) else {
            return Ok(vec![Self::request_result(event_id, false, Some(IpcError::SummonFailureNoProto.reason()))]);
        };
        let id = self.next_agent_id.fetch_add(1, Ordering::Relaxed);
        let agent = Agent::spawn(
            id,
            proto,
            id,
            SpawnParams {
                initial_behaviour: None,
                vx: 0.0,
                vy: 0.0,
                x,
                y,
                gravity: 1.0,
                drag_x: 0.9,
                drag_y: 0.9,
                looking_right: true,
            },
        );
        self.agents.lock().unwrap().insert(id, Arc::new(Mutex::new(agent)));
        let mut w = PayloadWriter::new();
        w.write_u8(1).write_str("").write_u32(id);
        Ok(vec![Frame::new(ResponseOpcode::RequestResult.as_byte(), event_id, w.into_bytes())])
    }

    fn handle_dismiss(&self, r: &mut PayloadReader, event_id: u32) -> Result<Vec<Frame>, IpcError> {
        let id = r.read_u32()?;
        let removed = self.agents.lock().unwrap().remove(&id).is_some();
        Ok(vec![Self::request_result(
            event_id,
            removed,
            (!removed).then(|| IpcError::UnknownMascotId(id).reason()),
        )])
    }

    fn handle_set_behaviour(&self, r: &mut PayloadReader, event_id: u32) -> Result<Vec<Frame>, IpcError> {
        let id = r.read_u32()?;
        let name = r.read_str()?;
        let agents = self.agents.lock().unwrap();
        let Some(agent) = agents.get(&id) else {
            return Err(IpcError::UnknownMascotId(id));
        };
        let mut agent = agent.lock().expect("agent mutex poisoned");
        let Some(behaviour) = agent.prototype.behaviour_by_name(&name) else {
            return Ok(vec![Self::request_result(event_id, false, Some(IpcError::BehaviourFailureNoBehaviour.reason()))]);
        };
        agent.set_behaviour(behaviour);
        Ok(vec![Self::request_result(event_id, true, None)])
    }

    fn handle_reload(&self, r: &mut PayloadReader, event_id: u32) -> Result<Vec<Frame>, IpcError> {
        let name = r.read_str()?;
        let Some(existing) = self.store.get_by_name(&name) else {
            return Ok(vec![Self::request_result(event_id, false, Some(IpcError::ReloadFailureLoadFailed.reason()))]);
        };
        match crate::prototype::load::load_from_dir(&existing.path) {
            Ok(proto) => {
                self.store.replace(proto);
                let mut w = PayloadWriter::new();
                w.write_u8(1).write_str("");
                Ok(vec![Frame::new(ResponseOpcode::ReloadResult.as_byte(), event_id, w.into_bytes())])
            }
            Err(_) => {
                let mut w = PayloadWriter::new();
                w.write_u8(0).write_str(IpcError::ReloadFailureLoadFailed.reason());
                Ok(vec![Frame::new(ResponseOpcode::ReloadResult.as_byte(), event_id, w.into_bytes())])
            }
        }
    }

    fn handle_config(&self, r: &mut PayloadReader, event_id: u32) -> Result<Vec<Frame>, IpcError> {
        let key = r.read_str()?;
        let has_value = r.read_u8()? != 0;
        let mut config = self.config.lock().unwrap();
        if has_value {
            let value = r.read_str()?;
            config.set(&key, &value).map_err(|e| IpcError::PayloadMalformed(e.to_string()))?;
        }
        let current = config.get(&key).unwrap_or_default();
        let mut w = PayloadWriter::new();
        w.write_str(&key).write_str(&current);
        Ok(vec![Frame::new(ResponseOpcode::ConfigResponse.as_byte(), event_id, w.into_bytes())])
    }

    fn handle_subscription(
        &self,
        client_fd: RawFd,
        r: &mut PayloadReader,
        event_id: u32,
        subscribe: bool,
    ) -> Result<Vec<Frame>, IpcError> {
        let event_name = r.read_str()?;
        let mut subs = self.subscriptions.lock().unwrap();
        let entry = subs.entry(client_fd).or_default();
        if subscribe {
            entry.insert(event_name);
        } else {
            entry.remove(&event_name);
        }
        Ok(vec![Self::request_result(event_id, true, None)])
    }
}

struct ClientConn {
    stream: UnixStream,
    decoder: Decoder,
}

/// Shared calloop data: the daemon-wide [`Runtime`] plus the live connection
/// table, kept as a single struct so every event source can mutate both
/// through its `&mut Shared` callback argument.
pub struct Shared {
    pub runtime: Arc<Runtime>,
    pub loop_handle: LoopHandle<'static, Shared>,
    clients: HashMap<RawFd, ClientConn>,
}

impl Shared {
    pub fn new(runtime: Arc<Runtime>, loop_handle: LoopHandle<'static, Shared>) -> Self {
        Shared {
            runtime,
            loop_handle,
            clients: HashMap::new(),
        }
    }
}

/// Register the read source for one freshly accepted connection.
fn register_client(shared: &mut Shared, stream: UnixStream) -> anyhow::Result<()> {
    stream.set_nonblocking(true).ok();
    let fd = stream.as_raw_fd();
    shared.clients.insert(fd, ClientConn { stream, decoder: Decoder::new() });

    shared
        .loop_handle
        .clone()
        .insert_source(
            Generic::new(fd, Interest::READ, Mode::Level),
            move |_readiness, _token, shared: &mut Shared| -> std::io::Result<PostAction> {
                let mut buf = [0u8; READ_CHUNK];
                loop {
                    let read = match shared.clients.get_mut(&fd) {
                        Some(conn) => conn.stream.read(&mut buf),
                        None => return Ok(PostAction::Remove),
                    };
                    match read {
                        Ok(0) => {
                            shared.clients.remove(&fd);
                            shared.runtime.on_client_gone(fd);
                            return Ok(PostAction::Remove);
                        }
                        Ok(n) => {
                            let conn = shared.clients.get_mut(&fd).expect("just checked above");
                            conn.decoder.feed(&buf[..n]);
                            loop {
                                match conn.decoder.next_frame() {
                                    Ok(Some(frame)) => {
                                        let responses = shared.runtime.dispatch(fd, frame);
                                        for (dest_fd, out) in &responses {
                                            if let Some(dest) = shared.clients.get_mut(dest_fd) {
                                                let _ = dest.stream.write_all(&out.encode());
                                            }
                                        }
                                    }
                                    Ok(None) => break,
                                    Err(err) => {
                                        let mut w = PayloadWriter::new();
                                        w.write_str(err.error.reason());
                                        let reply =
                                            Frame::new(ResponseOpcode::ProtocolError.as_byte(), err.event_id, w.into_bytes());
                                        let conn = shared.clients.get_mut(&fd).expect("just checked above");
                                        let _ = conn.stream.write_all(&reply.encode());
                                    }
                                }
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => return Ok(PostAction::Continue),
                        Err(_) => {
                            shared.clients.remove(&fd);
                            shared.runtime.on_client_gone(fd);
                            return Ok(PostAction::Remove);
                        }
                    }
                }
            },
        )
        .map_err(|err| anyhow::anyhow!("failed to register ipc client read source: {err}"))?;
    Ok(())
}

/// Insert the listening socket into the event loop; each accepted
/// connection gets its own read source via [`register_client`].
pub fn install(handle: &LoopHandle<'static, Shared>, listener: UnixListener) -> anyhow::Result<()> {
    listener.set_nonblocking(true).ok();
    let fd = listener.as_raw_fd();
    let listener = Mutex::new(listener);
    handle
        .insert_source(
            Generic::new(fd, Interest::READ, Mode::Level),
            move |_readiness, _token, shared: &mut Shared| -> std::io::Result<PostAction> {
                loop {
                    let accepted = listener.lock().unwrap().accept();
                    match accepted {
                        Ok((stream, _addr)) => {
                            if let Err(err) = register_client(shared, stream) {
                                tracing::warn!("failed to register ipc client: {err}");
                            }
                        }
                        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                        Err(e) => {
                            tracing::warn!("ipc accept failed: {e}");
                            break;
                        }
                    }
                }
                Ok(PostAction::Continue)
            },
        )
        .map_err(|err| anyhow::anyhow!("failed to register ipc listener: {err}"))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::environment::HeadlessEnvironment;
    use crate::prototype::{Prototype, SpriteAtlas};

    fn empty_prototype(name: &str) -> Prototype {
        Prototype {
            id: 0,
            name: name.to_string(),
            display_name: name.to_string(),
            path: std::path::PathBuf::new(),
            actions: Vec::new(),
            behaviours: Vec::new(),
            local_variables: Vec::new(),
            expressions: Vec::new(),
            root_behaviours: Vec::new(),
            atlas: SpriteAtlas::default(),
            drag_behaviour: None,
            thrown_behaviour: None,
            fall_behaviour: None,
            dismiss_action: None,
        }
    }

    fn test_runtime() -> Runtime {
        Runtime::new(Arc::new(Store::new()), Box::new(HeadlessEnvironment::new(1920, 1080)), Config::default())
    }

    #[test]
    fn hello_streams_announcements_then_done() {
        let runtime = test_runtime();
        runtime.store.add(empty_prototype("Penguin")).ok();
        let frames = runtime.handle_hello(1);
        assert_eq!(frames.first().unwrap().packet_id, ResponseOpcode::ServerHello.as_byte());
        assert_eq!(frames.last().unwrap().packet_id, ResponseOpcode::Done.as_byte());
    }

    #[test]
    fn summon_then_dismiss_round_trips_through_dispatch() {
        let runtime = test_runtime();
        runtime.store.add(empty_prototype("Penguin")).unwrap();

        let mut w = PayloadWriter::new();
        w.write_str("Penguin").write_i32(10).write_i32(20);
        let summon = Frame::new(RequestOpcode::Summon.as_byte(), 5, w.into_bytes());
        let responses = runtime.dispatch(1, summon);
        assert_eq!(responses.len(), 1);
        assert_eq!(runtime.agents.lock().unwrap().len(), 1);

        let id = *runtime.agents.lock().unwrap().keys().next().unwrap();
        let mut dw = PayloadWriter::new();
        dw.write_u32(id);
        let dismiss = Frame::new(RequestOpcode::Dismiss.as_byte(), 6, dw.into_bytes());
        runtime.dispatch(1, dismiss);
        assert!(runtime.agents.lock().unwrap().is_empty());
    }

    #[test]
    fn unknown_opcode_reports_protocol_error_without_panicking() {
        let runtime = test_runtime();
        let frame = Frame::new(0xEE, 9, vec![]);
        let responses = runtime.dispatch(1, frame);
        assert_eq!(responses[0].1.packet_id, ResponseOpcode::ProtocolError.as_byte());
        assert_eq!(responses[0].1.event_id, 9);
    }

    #[test]
    fn selection_request_is_fulfilled_by_the_first_click() {
        let runtime = test_runtime();
        let begin = Frame::empty(RequestOpcode::BeginSelection.as_byte(), 3);
        runtime.dispatch(1, begin);
        let fulfilled = runtime.fulfil_selection(100, 200);
        assert_eq!(fulfilled.len(), 1);
        assert_eq!(fulfilled[0].0, 1);
    }
}
