// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v0.7
// Date Modified: 2026-08-29
// Author: Lukas Bower

//! Shared harness: an in-process duplex stream and an emulated host.
//!
//! The host runs on its own thread, speaks the real wire protocol, and keeps
//! an in-memory entry tree, blob store, and label state. It is deliberately
//! small; label checks are prefix-delegation checks, enough to exercise the
//! client's contracts.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::io::{self, Read, Write};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use labeldoor::{Buckle, Clause, Component, GateSpec, ServiceSpec};
use labeldoor_wire::{
    decode_request, encode_bootstrap, encode_response, recv_frame, send_frame, BlobResult,
    Bootstrap, DentCreateKind, DentInvokeResult, DentKind, DentListResult, DentLsFacetedResult,
    DentLsGateResult, DentOpenEntry, DentOpenResult, DentResult, DentUpdateKind, HttpResult,
    Request, Response, ValueResult, WriteResult,
};
use sha2::{Digest, Sha256};

/// In-process byte stream over crossbeam channels.
pub struct InProcessStream {
    rx: Receiver<Vec<u8>>,
    tx: Sender<Vec<u8>>,
    buffer: Vec<u8>,
}

impl InProcessStream {
    /// Create paired streams for bidirectional communication.
    pub fn pair() -> (Self, Self) {
        let (a_tx, a_rx) = unbounded();
        let (b_tx, b_rx) = unbounded();
        (
            Self {
                rx: a_rx,
                tx: b_tx,
                buffer: Vec::new(),
            },
            Self {
                rx: b_rx,
                tx: a_tx,
                buffer: Vec::new(),
            },
        )
    }
}

impl Read for InProcessStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.buffer.is_empty() {
            match self.rx.recv() {
                Ok(data) => self.buffer = data,
                Err(_) => return Ok(0),
            }
        }
        let n = buf.len().min(self.buffer.len());
        buf[..n].copy_from_slice(&self.buffer[..n]);
        self.buffer.drain(..n);
        Ok(n)
    }
}

impl Write for InProcessStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.tx
            .send(buf.to_vec())
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "closed"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Host-side counters the tests assert on.
#[derive(Default)]
pub struct Stats {
    pub dent_opens: u64,
    pub dent_closes: u64,
    pub blob_opens: u64,
    pub blob_closes: u64,
    pub root_close_attempts: u64,
}

enum Node {
    Dir(BTreeMap<String, usize>),
    File(Vec<u8>),
    Faceted(BTreeMap<String, usize>),
    Gate(GateSpec),
    Service(ServiceSpec),
    Blob(String),
}

impl Node {
    fn kind(&self) -> DentKind {
        match self {
            Node::Dir(_) => DentKind::Directory,
            Node::File(_) => DentKind::File,
            Node::Faceted(_) => DentKind::FacetedDirectory,
            Node::Gate(_) => DentKind::Gate,
            Node::Service(_) => DentKind::Service,
            Node::Blob(_) => DentKind::Blob,
        }
    }
}

/// Everything the emulated host tracks.
pub struct HostState {
    nodes: Vec<Node>,
    dents: BTreeMap<u64, usize>,
    next_fd: u64,
    staging: BTreeMap<u64, Vec<u8>>,
    open_blobs: BTreeMap<u64, String>,
    cursors: BTreeMap<u64, u64>,
    store: BTreeMap<String, Vec<u8>>,
    kv: BTreeMap<Vec<u8>, Vec<u8>>,
    pub current_label: Buckle,
    pub privilege: Component,
    pub stats: Stats,
    pub finished: Option<Vec<u8>>,
    pub last_invoke_params: BTreeMap<String, String>,
}

const READ_CHUNK: u64 = 4096;

enum Step {
    Found(usize),
    MakeFacet(String),
    Fail,
}

impl Step {
    fn from_child(child: Option<&usize>) -> Self {
        match child {
            Some(&id) => Step::Found(id),
            None => Step::Fail,
        }
    }
}

impl HostState {
    fn new(privilege: Component) -> Self {
        let mut dents = BTreeMap::new();
        dents.insert(0, 0);
        HostState {
            nodes: vec![Node::Dir(BTreeMap::new())],
            dents,
            next_fd: 1,
            staging: BTreeMap::new(),
            open_blobs: BTreeMap::new(),
            cursors: BTreeMap::new(),
            store: BTreeMap::new(),
            kv: BTreeMap::new(),
            current_label: Buckle::public(),
            privilege,
            stats: Stats::default(),
            finished: None,
            last_invoke_params: BTreeMap::new(),
        }
    }

    fn alloc_dent(&mut self, node: usize) -> u64 {
        let fd = self.next_fd;
        self.next_fd += 1;
        self.dents.insert(fd, node);
        self.stats.dent_opens += 1;
        fd
    }

    fn alloc_blob(&mut self, name: String) -> u64 {
        let fd = self.next_fd;
        self.next_fd += 1;
        self.open_blobs.insert(fd, name);
        self.cursors.insert(fd, 0);
        self.stats.blob_opens += 1;
        fd
    }

    fn new_node(&mut self, node: Node) -> usize {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    fn step(&mut self, base: usize, entry: &DentOpenEntry) -> Option<usize> {
        let found = match (&self.nodes[base], entry) {
            (Node::Dir(children), DentOpenEntry::Name(name)) => Step::from_child(children.get(name)),
            (Node::Faceted(facets), DentOpenEntry::Facet(label)) => {
                let key = label.to_string();
                match facets.get(&key) {
                    Some(&id) => Step::Found(id),
                    None => Step::MakeFacet(key),
                }
            }
            _ => Step::Fail,
        };
        match found {
            Step::Found(id) => Some(id),
            Step::MakeFacet(key) => {
                // First open of a facet allocates its directory.
                let id = self.new_node(Node::Dir(BTreeMap::new()));
                if let Node::Faceted(facets) = &mut self.nodes[base] {
                    facets.insert(key, id);
                }
                Some(id)
            }
            Step::Fail => None,
        }
    }

    fn resolve(&mut self, path: &[labeldoor::PathComponent]) -> Option<usize> {
        let mut cur = 0usize;
        for component in path {
            let entry = match component {
                labeldoor::PathComponent::Name(name) => DentOpenEntry::Name(name.clone()),
                labeldoor::PathComponent::Facet(label) => DentOpenEntry::Facet(label.clone()),
            };
            cur = self.step(cur, &entry)?;
        }
        Some(cur)
    }

    // Delegation: vector v speaks for any vector it prefixes.
    fn implies_clause(&self, clause: &Clause) -> bool {
        let Component::Formula(priv_clauses) = &self.privilege else {
            return true;
        };
        priv_clauses.iter().any(|pc| {
            pc.0.iter()
                .any(|pv| clause.0.iter().any(|cv| cv.starts_with(pv)))
        })
    }

    fn can_declassify(&self, target: &Component) -> bool {
        let Component::Formula(current) = &self.current_label.secrecy else {
            return false;
        };
        let kept: std::collections::BTreeSet<&Clause> = match target {
            Component::False => return true,
            Component::Formula(clauses) => clauses.iter().collect(),
        };
        current
            .iter()
            .filter(|clause| !kept.contains(clause))
            .all(|clause| self.implies_clause(clause))
    }
}

fn join_secrecy(a: &Component, b: &Component) -> Component {
    match (a, b) {
        (Component::False, _) | (_, Component::False) => Component::False,
        (Component::Formula(x), Component::Formula(y)) => {
            Component::formula(x.iter().chain(y.iter()).cloned())
        }
    }
}

fn meet_integrity(a: &Component, b: &Component) -> Component {
    match (a, b) {
        (Component::False, other) | (other, Component::False) => other.clone(),
        (Component::Formula(x), Component::Formula(y)) => {
            Component::formula(x.intersection(y).cloned())
        }
    }
}

fn handle(state: &mut HostState, request: Request) -> Option<Response> {
    let response = match request {
        Request::ReadKey { key } => Response::Value(ValueResult {
            value: state.kv.get(&key).cloned(),
        }),
        Request::WriteKey { key, value } => {
            state.kv.insert(key, value);
            Response::Write(WriteResult { success: true })
        }

        Request::FsRead { path } => {
            let value = state.resolve(&path).and_then(|id| match &state.nodes[id] {
                Node::File(data) => Some(data.clone()),
                _ => None,
            });
            Response::Value(ValueResult { value })
        }
        Request::FsWrite { path, data } => {
            let success = match state.resolve(&path) {
                Some(id) => match &mut state.nodes[id] {
                    Node::File(contents) => {
                        *contents = data;
                        true
                    }
                    _ => false,
                },
                None => false,
            };
            Response::Write(WriteResult { success })
        }
        Request::FsCreateDir { base, name, .. } => {
            let node = state.new_node(Node::Dir(BTreeMap::new()));
            Response::Write(WriteResult {
                success: insert_child(state, &base, name, node),
            })
        }
        Request::FsCreateFile { base, name, .. } => {
            let node = state.new_node(Node::File(Vec::new()));
            Response::Write(WriteResult {
                success: insert_child(state, &base, name, node),
            })
        }
        Request::FsCreateFacetedDir { base, name } => {
            let node = state.new_node(Node::Faceted(BTreeMap::new()));
            Response::Write(WriteResult {
                success: insert_child(state, &base, name, node),
            })
        }

        Request::GetCurrentLabel => Response::Label(state.current_label.clone()),
        Request::TaintWithLabel { label } => {
            state.current_label = Buckle::new(
                join_secrecy(&state.current_label.secrecy, &label.secrecy),
                meet_integrity(&state.current_label.integrity, &label.integrity),
            );
            Response::Label(state.current_label.clone())
        }
        Request::Declassify { secrecy } => {
            if state.can_declassify(&secrecy) {
                state.current_label = Buckle::new(secrecy, state.current_label.integrity.clone());
                Response::MaybeLabel(Some(state.current_label.clone()))
            } else {
                Response::MaybeLabel(None)
            }
        }
        Request::Endorse { with_privilege } => {
            let privilege = with_privilege.unwrap_or_else(|| state.privilege.clone());
            state.current_label = Buckle::new(
                state.current_label.secrecy.clone(),
                join_secrecy(&state.current_label.integrity, &privilege),
            );
            Response::MaybeLabel(Some(state.current_label.clone()))
        }
        Request::SubPrivilege { suffix } => {
            let narrowed = match &state.privilege {
                Component::False => Component::False,
                Component::Formula(clauses) => {
                    let base = clauses
                        .iter()
                        .next()
                        .and_then(|c| c.0.iter().next())
                        .cloned()
                        .unwrap_or_default();
                    let mut vector = base;
                    vector.extend(suffix);
                    Component::formula([Clause::new_from_vec(vec![vector])])
                }
            };
            state.privilege = narrowed.clone();
            Response::Privilege(narrowed)
        }
        Request::BuckleParse { text } => Response::MaybeLabel(Buckle::parse(&text).ok()),

        Request::DentOpen { fd, entry } => {
            let base = state.dents.get(&fd).copied();
            let opened = match base {
                Some(base) => state.step(base, &entry),
                None => None,
            };
            match opened {
                Some(node) => {
                    let kind = state.nodes[node].kind();
                    let fd = state.alloc_dent(node);
                    Response::DentOpen(DentOpenResult {
                        success: true,
                        fd,
                        kind,
                    })
                }
                None => Response::DentOpen(DentOpenResult {
                    success: false,
                    fd: 0,
                    kind: DentKind::Directory,
                }),
            }
        }
        Request::DentClose { fd } => {
            let success = if fd == 0 {
                state.stats.root_close_attempts += 1;
                false
            } else if state.dents.remove(&fd).is_some() {
                state.stats.dent_closes += 1;
                true
            } else {
                false
            };
            Response::Dent(DentResult {
                success,
                fd: None,
                data: None,
            })
        }
        Request::DentCreate { kind, .. } => {
            let node = match kind {
                DentCreateKind::Directory => Some(Node::Dir(BTreeMap::new())),
                DentCreateKind::File => Some(Node::File(Vec::new())),
                DentCreateKind::FacetedDirectory => Some(Node::Faceted(BTreeMap::new())),
                DentCreateKind::Gate(spec) => Some(Node::Gate(spec)),
                DentCreateKind::Service(spec) => Some(Node::Service(spec)),
                DentCreateKind::Blob(blob_fd) => state
                    .open_blobs
                    .get(&blob_fd)
                    .cloned()
                    .map(Node::Blob),
            };
            match node {
                Some(node) => {
                    let id = state.new_node(node);
                    let fd = state.alloc_dent(id);
                    Response::Dent(DentResult {
                        success: true,
                        fd: Some(fd),
                        data: None,
                    })
                }
                None => Response::Dent(DentResult {
                    success: false,
                    fd: None,
                    data: None,
                }),
            }
        }
        Request::DentUpdate { fd, kind } => {
            let rebind = match &kind {
                DentUpdateKind::Blob(blob_fd) => state.open_blobs.get(blob_fd).cloned(),
                _ => None,
            };
            let success = match state.dents.get(&fd).copied() {
                Some(id) => match (&mut state.nodes[id], kind) {
                    (Node::File(contents), DentUpdateKind::File(data)) => {
                        *contents = data;
                        true
                    }
                    (node @ Node::Gate(_), DentUpdateKind::Gate(spec)) => {
                        *node = Node::Gate(spec);
                        true
                    }
                    (node @ Node::Service(_), DentUpdateKind::Service(spec)) => {
                        *node = Node::Service(spec);
                        true
                    }
                    (node @ Node::Blob(_), DentUpdateKind::Blob(_)) => match rebind {
                        Some(name) => {
                            *node = Node::Blob(name);
                            true
                        }
                        None => false,
                    },
                    _ => false,
                },
                None => false,
            };
            Response::Dent(DentResult {
                success,
                fd: None,
                data: None,
            })
        }
        Request::DentRead { fd } => {
            let value = state
                .dents
                .get(&fd)
                .and_then(|&id| match &state.nodes[id] {
                    Node::File(data) => Some(data.clone()),
                    _ => None,
                });
            Response::Value(ValueResult { value })
        }
        Request::DentLink {
            dir_fd,
            name,
            target_fd,
        } => {
            let success = match (
                state.dents.get(&dir_fd).copied(),
                state.dents.get(&target_fd).copied(),
            ) {
                (Some(dir), Some(target)) => match &mut state.nodes[dir] {
                    Node::Dir(children) => {
                        if children.contains_key(&name) {
                            false
                        } else {
                            children.insert(name, target);
                            true
                        }
                    }
                    _ => false,
                },
                _ => false,
            };
            Response::Dent(DentResult {
                success,
                fd: None,
                data: None,
            })
        }
        Request::DentUnlink { dir_fd, name } => {
            let removed = state.dents.get(&dir_fd).copied().and_then(|dir| {
                match &mut state.nodes[dir] {
                    Node::Dir(children) => children.remove(&name),
                    _ => None,
                }
            });
            match removed {
                Some(node) => {
                    let fd = state.alloc_dent(node);
                    Response::Dent(DentResult {
                        success: true,
                        fd: Some(fd),
                        data: None,
                    })
                }
                None => Response::Dent(DentResult {
                    success: false,
                    fd: None,
                    data: None,
                }),
            }
        }
        Request::DentList { fd } => match state.dents.get(&fd).map(|&id| &state.nodes[id]) {
            Some(Node::Dir(children)) => Response::DentList(DentListResult {
                success: true,
                entries: children
                    .iter()
                    .map(|(name, &id)| (name.clone(), state.nodes[id].kind()))
                    .collect(),
            }),
            _ => Response::DentList(DentListResult {
                success: false,
                entries: BTreeMap::new(),
            }),
        },
        Request::DentLsFaceted { fd, .. } => {
            match state.dents.get(&fd).map(|&id| &state.nodes[id]) {
                Some(Node::Faceted(facets)) => Response::DentLsFaceted(DentLsFacetedResult {
                    success: true,
                    facets: facets
                        .keys()
                        .filter_map(|key| Buckle::parse(key).ok())
                        .collect(),
                }),
                _ => Response::DentLsFaceted(DentLsFacetedResult {
                    success: false,
                    facets: Vec::new(),
                }),
            }
        }
        Request::DentLsGate { fd } => match state.dents.get(&fd).map(|&id| &state.nodes[id]) {
            Some(Node::Gate(spec)) => Response::DentLsGate(DentLsGateResult {
                success: true,
                gate: Some(spec.clone()),
            }),
            _ => Response::DentLsGate(DentLsGateResult {
                success: false,
                gate: None,
            }),
        },
        Request::DentInvoke {
            fd,
            payload,
            sync,
            toblob,
            params,
        } => {
            let target = state
                .dents
                .get(&fd)
                .map(|&id| state.nodes[id].kind());
            // Invocation params come back as headers so callers can
            // observe what the host received.
            state.last_invoke_params = params.clone();
            let mut headers: BTreeMap<String, Vec<u8>> = params
                .into_iter()
                .map(|(k, v)| (k, v.into_bytes()))
                .collect();
            match target {
                Some(DentKind::Gate) => {
                    let mut data = b"gate:".to_vec();
                    data.extend_from_slice(&payload);
                    if toblob {
                        let len = data.len() as u64;
                        let name = hex::encode(Sha256::digest(&data));
                        state.store.insert(name.clone(), data);
                        let blob_fd = state.alloc_blob(name);
                        Response::DentInvoke(DentInvokeResult {
                            success: true,
                            fd: Some(blob_fd),
                            len,
                            data: None,
                            headers,
                        })
                    } else {
                        Response::DentInvoke(DentInvokeResult {
                            success: true,
                            fd: None,
                            len: 0,
                            data: sync.then_some(data),
                            headers,
                        })
                    }
                }
                Some(DentKind::Service) => {
                    let mut data = b"svc:".to_vec();
                    data.extend_from_slice(&payload);
                    headers.insert("status".to_string(), b"200".to_vec());
                    Response::DentInvoke(DentInvokeResult {
                        success: true,
                        fd: None,
                        len: 0,
                        data: sync.then_some(data),
                        headers,
                    })
                }
                _ => Response::DentInvoke(DentInvokeResult {
                    success: false,
                    fd: None,
                    len: 0,
                    data: None,
                    headers: BTreeMap::new(),
                }),
            }
        }
        Request::DentGetBlob { fd } => {
            let name = state
                .dents
                .get(&fd)
                .and_then(|&id| match &state.nodes[id] {
                    Node::Blob(name) => Some(name.clone()),
                    _ => None,
                });
            match name {
                Some(name) => {
                    let len = state.store.get(&name).map_or(0, |d| d.len() as u64);
                    let blob_fd = state.alloc_blob(name);
                    Response::Blob(BlobResult {
                        success: true,
                        fd: blob_fd,
                        len,
                        data: None,
                    })
                }
                None => Response::Blob(BlobResult {
                    success: false,
                    fd: 0,
                    len: 0,
                    data: None,
                }),
            }
        }

        Request::BlobCreate { .. } => {
            let fd = state.next_fd;
            state.next_fd += 1;
            state.staging.insert(fd, Vec::new());
            state.stats.blob_opens += 1;
            Response::Blob(BlobResult {
                success: true,
                fd,
                len: 0,
                data: None,
            })
        }
        Request::BlobWrite { fd, data } => match state.staging.get_mut(&fd) {
            Some(buf) => {
                buf.extend_from_slice(&data);
                Response::Blob(BlobResult {
                    success: true,
                    fd,
                    len: data.len() as u64,
                    data: None,
                })
            }
            None => Response::Blob(BlobResult {
                success: false,
                fd,
                len: 0,
                data: None,
            }),
        },
        Request::BlobFinalize { fd, data } => match state.staging.remove(&fd) {
            Some(mut buf) => {
                buf.extend_from_slice(&data);
                let name = hex::encode(Sha256::digest(&buf));
                let len = buf.len() as u64;
                state.store.insert(name.clone(), buf);
                state.open_blobs.insert(fd, name.clone());
                state.cursors.insert(fd, 0);
                Response::Blob(BlobResult {
                    success: true,
                    fd,
                    len,
                    data: Some(name.into_bytes()),
                })
            }
            None => Response::Blob(BlobResult {
                success: false,
                fd,
                len: 0,
                data: None,
            }),
        },
        Request::BlobOpen { name } => match state.store.get(&name) {
            Some(content) => {
                let len = content.len() as u64;
                let blob_fd = state.alloc_blob(name);
                Response::Blob(BlobResult {
                    success: true,
                    fd: blob_fd,
                    len,
                    data: None,
                })
            }
            None => Response::Blob(BlobResult {
                success: false,
                fd: 0,
                len: 0,
                data: None,
            }),
        },
        Request::BlobRead { fd, offset, length } => {
            let bytes = state
                .open_blobs
                .get(&fd)
                .and_then(|name| state.store.get(name))
                .cloned();
            match bytes {
                Some(bytes) => {
                    let offset =
                        offset.unwrap_or_else(|| state.cursors.get(&fd).copied().unwrap_or(0));
                    let length = length.unwrap_or(READ_CHUNK);
                    let start = (offset as usize).min(bytes.len());
                    let end = (start + length as usize).min(bytes.len());
                    state.cursors.insert(fd, end as u64);
                    Response::Blob(BlobResult {
                        success: true,
                        fd,
                        len: (end - start) as u64,
                        data: Some(bytes[start..end].to_vec()),
                    })
                }
                None => Response::Blob(BlobResult {
                    success: false,
                    fd,
                    len: 0,
                    data: None,
                }),
            }
        }
        Request::BlobClose { fd } => {
            let success =
                state.staging.remove(&fd).is_some() || state.open_blobs.remove(&fd).is_some();
            if success {
                state.cursors.remove(&fd);
                state.stats.blob_closes += 1;
            }
            Response::Blob(BlobResult {
                success,
                fd,
                len: 0,
                data: None,
            })
        }

        Request::GithubRest { route, .. } => Response::Http(HttpResult {
            status: 200,
            data: route.into_bytes(),
        }),
        Request::Invoke { gate, .. } => {
            let success = matches!(
                state.resolve(&gate).map(|id| &state.nodes[id]),
                Some(Node::Gate(_))
            );
            Response::Write(WriteResult { success })
        }
        Request::InvokeService { service, body } => {
            match state.resolve(&service).map(|id| &state.nodes[id]) {
                Some(Node::Service(_)) => {
                    let mut data = b"svc:".to_vec();
                    data.extend_from_slice(&body);
                    Response::Service(HttpResult { status: 200, data })
                }
                _ => Response::Service(HttpResult {
                    status: 0,
                    data: Vec::new(),
                }),
            }
        }

        Request::Finish { payload } => {
            state.finished = Some(payload);
            return None;
        }
    };
    Some(response)
}

fn insert_child(
    state: &mut HostState,
    base: &[labeldoor::PathComponent],
    name: String,
    node: usize,
) -> bool {
    match state.resolve(base) {
        Some(id) => match &mut state.nodes[id] {
            Node::Dir(children) => {
                if children.contains_key(&name) {
                    false
                } else {
                    children.insert(name, node);
                    true
                }
            }
            _ => false,
        },
        None => false,
    }
}

/// An emulated host running on its own thread.
pub struct TestHost {
    pub state: Arc<Mutex<HostState>>,
    handle: JoinHandle<()>,
}

impl TestHost {
    /// Spawn a host with the given ambient privilege and bootstrap payload.
    /// The client end of the stream comes back alongside.
    pub fn spawn(privilege: Component, bootstrap: Bootstrap) -> (Self, InProcessStream) {
        let _ = env_logger::builder().is_test(true).try_init();
        let (host_stream, client_stream) = InProcessStream::pair();
        let state = Arc::new(Mutex::new(HostState::new(privilege)));
        let shared = Arc::clone(&state);
        let handle = std::thread::spawn(move || {
            let mut stream = host_stream;
            let envelope = encode_bootstrap(&bootstrap).expect("encode bootstrap");
            send_frame(&mut stream, &envelope).expect("send bootstrap");
            loop {
                let payload = match recv_frame(&mut stream) {
                    Ok(payload) => payload,
                    Err(_) => break,
                };
                let request = decode_request(&payload).expect("decode request");
                let response = {
                    let mut state = shared.lock().expect("host state");
                    handle(&mut state, request)
                };
                match response {
                    Some(response) => {
                        let out = encode_response(&response).expect("encode response");
                        if send_frame(&mut stream, &out).is_err() {
                            break;
                        }
                    }
                    None => break,
                }
            }
        });
        (TestHost { state, handle }, client_stream)
    }

    /// Spawn with an empty bootstrap and no privilege.
    pub fn spawn_default() -> (Self, InProcessStream) {
        TestHost::spawn(
            Component::dc_true(),
            Bootstrap {
                payload: Vec::new(),
                blobs: BTreeMap::new(),
                headers: BTreeMap::new(),
            },
        )
    }

    /// Wait for the host thread; call after dropping the client stream or
    /// sending `Finish`.
    pub fn join(self) -> HostState {
        self.handle.join().expect("host thread");
        Arc::try_unwrap(self.state)
            .unwrap_or_else(|_| panic!("state still shared"))
            .into_inner()
            .expect("state lock")
    }
}
