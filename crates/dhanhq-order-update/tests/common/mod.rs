/*
[INPUT]:  Scripted connection attempts and frame sequences
[OUTPUT]: In-memory transport recording sends, deliveries and closes
[POS]:    Test infrastructure - shared across all test modules
[UPDATE]: When the Transport or Connection traits change
*/

//! Common test utilities for dhanhq-order-update tests

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use dhanhq_order_update::{Connection, Frame, OrderUpdateError, Result, Transport};

/// One step a scripted connection plays back
#[derive(Debug, Clone)]
pub enum Step {
    Text(String),
    Binary(Vec<u8>),
    Close,
    Fail(String),
    /// Never yields a frame
    Hang,
}

pub fn text(frame: &str) -> Step {
    Step::Text(frame.to_string())
}

/// Outcome of one connect call
#[derive(Debug, Clone)]
pub enum Attempt {
    Refuse(String),
    Accept(Vec<Step>),
    /// Accept, but fail every send
    AcceptBrokenSend,
    /// Accept, but never finish a send
    AcceptStalledSend,
}

/// Everything the client did to the transport, in order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Connect(String),
    Sent(String),
    Delivered(Frame),
    Closed,
}

#[derive(Debug, Clone, Default)]
pub struct TransportLog {
    events: Arc<Mutex<Vec<Event>>>,
}

impl TransportLog {
    fn push(&self, event: Event) {
        self.events.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn sent(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Sent(text) => Some(text),
                _ => None,
            })
            .collect()
    }

    pub fn count(&self, matches: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|event| matches(event)).count()
    }

    pub fn connects(&self) -> usize {
        self.count(|event| matches!(event, Event::Connect(_)))
    }

    pub fn closes(&self) -> usize {
        self.count(|event| matches!(event, Event::Closed))
    }
}

/// Transport that plays back one scripted attempt per connect call
pub struct ScriptedTransport {
    attempts: Mutex<VecDeque<Attempt>>,
    log: TransportLog,
}

impl ScriptedTransport {
    pub fn new(attempts: Vec<Attempt>) -> (Self, TransportLog) {
        let log = TransportLog::default();
        let transport = Self {
            attempts: Mutex::new(attempts.into()),
            log: log.clone(),
        };
        (transport, log)
    }

    pub fn single(steps: Vec<Step>) -> (Self, TransportLog) {
        Self::new(vec![Attempt::Accept(steps)])
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    type Connection = ScriptedConnection;

    async fn connect(&self, url: &str) -> Result<Self::Connection> {
        self.log.push(Event::Connect(url.to_string()));
        let attempt = self
            .attempts
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Attempt::Refuse("no scripted attempt left".to_string()));

        match attempt {
            Attempt::Refuse(reason) => Err(OrderUpdateError::ConnectionFailed(reason)),
            Attempt::Accept(steps) => Ok(ScriptedConnection {
                steps: steps.into(),
                send: SendMode::Normal,
                log: self.log.clone(),
            }),
            Attempt::AcceptBrokenSend => Ok(ScriptedConnection {
                steps: VecDeque::new(),
                send: SendMode::Broken,
                log: self.log.clone(),
            }),
            Attempt::AcceptStalledSend => Ok(ScriptedConnection {
                steps: VecDeque::new(),
                send: SendMode::Stalled,
                log: self.log.clone(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum SendMode {
    Normal,
    Broken,
    Stalled,
}

pub struct ScriptedConnection {
    steps: VecDeque<Step>,
    send: SendMode,
    log: TransportLog,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send_text(&mut self, text: String) -> Result<()> {
        match self.send {
            SendMode::Normal => {
                self.log.push(Event::Sent(text));
                Ok(())
            }
            SendMode::Broken => Err(OrderUpdateError::Transport("broken pipe".to_string())),
            SendMode::Stalled => std::future::pending().await,
        }
    }

    async fn next_frame(&mut self) -> Option<Result<Frame>> {
        let frame = match self.steps.pop_front()? {
            Step::Text(text) => Frame::Text(text),
            Step::Binary(bytes) => Frame::Binary(bytes),
            Step::Close => Frame::Close,
            Step::Fail(reason) => return Some(Err(OrderUpdateError::Transport(reason))),
            Step::Hang => std::future::pending().await,
        };
        self.log.push(Event::Delivered(frame.clone()));
        Some(Ok(frame))
    }

    async fn close(&mut self) -> Result<()> {
        self.log.push(Event::Closed);
        Ok(())
    }
}

pub const LOGIN_FRAME: &str = r#"{"LoginReq":{"MsgCode":42,"ClientId":"1100003626","Token":"eyJhbGc..."},"UserType":"SELF"}"#;

pub fn test_credentials() -> dhanhq_order_update::Credentials {
    dhanhq_order_update::Credentials::new("1100003626", "eyJhbGc...")
}
