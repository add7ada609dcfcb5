//! In-process table: one relay room and a session per peer, wired together
//! with a single global message queue so every peer observes the same order.

#![allow(dead_code)]

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use singular::{
    Card, Color, Game, Phase, PlayerId, RulesEngine, Session, SessionConfig,
    messages::{ClientMessage, ServerMessage},
    present::{Anchor, Face, Notice, Stage, StageError, TableView, TokenId},
    room::Room,
    session::{Command, Connection},
};
use tokio::sync::mpsc;

#[derive(Clone, Debug, PartialEq)]
pub enum StageCall {
    Render(Box<TableView>),
    Spawn(TokenId, Face, Anchor),
    Move(TokenId, Anchor),
    Remove(TokenId),
    Chat(String, String),
    Notice(Notice),
}

/// Stage that records every call for later inspection.
#[derive(Clone, Default)]
pub struct Recorder(Arc<Mutex<Vec<StageCall>>>);

impl Recorder {
    pub fn calls(&self) -> Vec<StageCall> {
        self.0.lock().unwrap().clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StageCall::Notice(notice) => Some(notice),
                _ => None,
            })
            .collect()
    }

    pub fn spawned(&self) -> Vec<(Face, Anchor)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StageCall::Spawn(_, face, at) => Some((face, at)),
                _ => None,
            })
            .collect()
    }

    pub fn renders(&self) -> Vec<TableView> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                StageCall::Render(view) => Some(*view),
                _ => None,
            })
            .collect()
    }

    fn push(&self, call: StageCall) {
        self.0.lock().unwrap().push(call);
    }
}

impl Stage for Recorder {
    fn render(&mut self, view: &TableView) {
        self.push(StageCall::Render(Box::new(view.clone())));
    }

    fn spawn_token(&mut self, token: TokenId, face: Face, at: Anchor) {
        self.push(StageCall::Spawn(token, face, at));
    }

    fn move_token(&mut self, token: TokenId, to: Anchor) -> Result<(), StageError> {
        self.push(StageCall::Move(token, to));
        Ok(())
    }

    fn remove_token(&mut self, token: TokenId) -> Result<(), StageError> {
        self.push(StageCall::Remove(token));
        Ok(())
    }

    fn chat(&mut self, from: &str, msg: &str) {
        self.push(StageCall::Chat(from.to_string(), msg.to_string()));
    }

    fn notice(&mut self, notice: &Notice) {
        self.push(StageCall::Notice(notice.clone()));
    }
}

pub struct Peer {
    pub session: Session<Game>,
    pub stage: Recorder,
    pub id: Option<PlayerId>,
    outbox: mpsc::UnboundedReceiver<ClientMessage>,
}

impl Peer {
    pub fn engine(&self) -> &Game {
        self.session.engine().expect("peer has joined")
    }
}

pub struct Table {
    pub room: Room,
    pub peers: Vec<Peer>,
    /// Every relayed message in delivery order, with its sender.
    pub log: Vec<(PlayerId, ServerMessage)>,
    config: SessionConfig,
    seed: u64,
    queue: VecDeque<(usize, ClientMessage)>,
    now: Duration,
}

impl Table {
    pub fn new(seed: u64) -> Self {
        Self::with_config(seed, SessionConfig::default())
    }

    pub fn with_config(seed: u64, config: SessionConfig) -> Self {
        Self {
            room: Room::new("test"),
            peers: Vec::new(),
            log: Vec::new(),
            config,
            seed,
            queue: VecDeque::new(),
            now: Duration::ZERO,
        }
    }

    /// Adds a peer, sends its join request and delivers everything that
    /// follows. Returns the peer index.
    pub fn join(&mut self, name: &str) -> usize {
        let (conn, outbox) = Connection::channel();
        let stage = Recorder::default();
        let seed = self.seed.wrapping_add(self.peers.len() as u64);
        let mut session = Session::with_factory(
            name,
            conn,
            Box::new(stage.clone()),
            self.config.clone(),
            Box::new(move |id: PlayerId, name: &str, is_host: bool| {
                Game::seeded(id, name, is_host, seed)
            }),
        );
        session.advance(self.now).unwrap();
        session.join().unwrap();
        self.peers.push(Peer {
            session,
            stage,
            id: None,
            outbox,
        });
        self.pump();
        self.peers.len() - 1
    }

    pub fn peer(&self, id: PlayerId) -> &Peer {
        self.peers
            .iter()
            .find(|p| p.id == Some(id))
            .expect("known peer")
    }

    pub fn host(&self) -> &Peer {
        &self.peers[0]
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    /// Applies a local command on peer `index` and delivers the fallout.
    pub fn apply(&mut self, index: usize, command: Command) -> Result<(), singular::SessionError> {
        let result = self.peers[index].session.apply(command);
        self.pump();
        result
    }

    /// Sends a raw message as peer `index`, bypassing its session.
    pub fn inject(&mut self, index: usize, msg: ClientMessage) {
        self.queue.push_back((index, msg));
        self.pump();
    }

    /// Delivers queued messages until every outbox is empty.
    pub fn pump(&mut self) {
        loop {
            self.collect();
            let Some((index, msg)) = self.queue.pop_front() else {
                break;
            };
            self.route(index, msg);
        }
    }

    fn collect(&mut self) {
        for (index, peer) in self.peers.iter_mut().enumerate() {
            while let Ok(msg) = peer.outbox.try_recv() {
                self.queue.push_back((index, msg));
            }
        }
    }

    fn route(&mut self, index: usize, msg: ClientMessage) {
        let deliveries = match (self.peers[index].id, msg) {
            (None, ClientMessage::PlayerJoined { name }) => match self.room.join(&name) {
                Ok((id, deliveries)) => {
                    self.peers[index].id = Some(id);
                    deliveries
                }
                Err(rejected) => {
                    let _ = self.peers[index].session.handle(rejected.message());
                    return;
                }
            },
            (None, _) => return,
            (Some(id), msg) => self.room.relay(id, msg),
        };

        for delivery in deliveries {
            if let Some(sender) = self.peers[index].id {
                self.log.push((sender, delivery.message().clone()));
            }
            for peer in &mut self.peers {
                let Some(id) = peer.id else { continue };
                if delivery.reaches(id) {
                    peer.session.handle(delivery.message().clone()).unwrap();
                }
            }
        }
    }

    /// Moves every peer's clock to `to`, firing deadlines in order and
    /// delivering whatever they send.
    pub fn advance_to(&mut self, to: Duration) {
        loop {
            let next = self
                .peers
                .iter()
                .filter_map(|p| p.session.next_deadline())
                .filter(|at| *at <= to)
                .min();
            let Some(at) = next else { break };
            self.now = self.now.max(at);
            for peer in &mut self.peers {
                peer.session.advance(self.now).unwrap();
            }
            self.pump();
        }
        self.now = self.now.max(to);
        for peer in &mut self.peers {
            peer.session.advance(self.now).unwrap();
        }
    }

    /// Runs until no peer has anything scheduled.
    pub fn settle(&mut self) {
        while let Some(at) = self
            .peers
            .iter()
            .filter_map(|p| p.session.next_deadline())
            .min()
        {
            self.advance_to(at);
        }
    }

    /// Host starts the game and the opening deal runs to completion.
    pub fn start(&mut self) {
        self.apply(0, Command::Start).unwrap();
        self.settle();
    }

    pub fn current_player(&self) -> PlayerId {
        self.host().engine().current_player()
    }

    fn current_index(&self) -> usize {
        let current = self.current_player();
        self.peers
            .iter()
            .position(|p| p.id == Some(current))
            .expect("current player is seated")
    }

    /// Current player draws until it holds a playable number card, then
    /// plays it. Number cards never skip or reverse, so the turn passes to
    /// the next seat.
    pub fn play_number(&mut self) -> Card {
        let index = self.current_index();
        for _ in 0..500 {
            let engine = self.peers[index].engine();
            let choice = engine
                .own_hand()
                .iter()
                .enumerate()
                .find(|(_, card)| card.ty().is_number() && engine.is_playable(**card))
                .map(|(i, card)| (i, *card));
            match choice {
                Some((i, card)) => {
                    self.apply(index, Command::Play(i)).unwrap();
                    self.settle();
                    return card;
                }
                None => {
                    self.apply(index, Command::Draw).unwrap();
                    self.settle();
                }
            }
        }
        panic!("no playable number card after 500 draws");
    }

    /// One move of a simple policy for the current player: play the
    /// `choice`-th playable card, or draw if `choice` points past them.
    pub fn step(&mut self, choice: usize) {
        self.step_unsettled(choice);
        self.settle();
    }

    /// Like [`Table::step`], but leaves scheduled animations pending.
    pub fn step_unsettled(&mut self, choice: usize) {
        let index = self.current_index();
        let engine = self.peers[index].engine();
        let hand = engine.own_hand();
        let playable: Vec<usize> = (0..hand.len())
            .filter(|i| engine.is_playable(hand[*i]))
            .collect();
        let command = match playable.get(choice % (playable.len() + 1)) {
            Some(&i) if hand[i].is_wild() => Command::PlayWild(i, Color::ALL[choice % 4]),
            Some(&i) => Command::Play(i),
            None => Command::Draw,
        };
        self.apply(index, command).unwrap();
    }

    /// Disconnects peer `index`: it leaves the room and the table, and the
    /// others are told. Returns the departed player's id.
    pub fn leave(&mut self, index: usize) -> PlayerId {
        let peer = self.peers.remove(index);
        let id = peer.id.expect("departing peer had joined");
        for delivery in self.room.leave(id) {
            self.log.push((id, delivery.message().clone()));
            for peer in &mut self.peers {
                let Some(other) = peer.id else { continue };
                if delivery.reaches(other) {
                    peer.session.handle(delivery.message().clone()).unwrap();
                }
            }
        }
        self.pump();
        id
    }

    pub fn game_over(&self) -> bool {
        self.host().session.phase() == Phase::GameOver
    }

    /// Host-originated messages in the log, in order.
    pub fn host_traffic(&self) -> Vec<&ServerMessage> {
        self.log
            .iter()
            .filter(|(sender, _)| *sender == 1)
            .map(|(_, msg)| msg)
            .filter(|msg| matches!(msg, ServerMessage::HostEvent(_) | ServerMessage::FromHost(_)))
            .collect()
    }
}

/// Convenience for the common two-peer table.
pub fn two_players(seed: u64) -> Table {
    let mut table = Table::new(seed);
    table.join("alice");
    table.join("bob");
    table
}
