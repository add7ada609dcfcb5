//! Session state machine.
//!
//! One [`Session`] value holds everything a peer knows about one game:
//! identity, role, roster, the engine replica and presentation state.
//! It is driven by two inputs only. Inbound relay messages go through
//! [`Session::handle`], local player intents through [`Session::apply`].
//! Time is virtual: [`Session::advance`] moves the clock and fires whatever
//! became due.
//!
//! Phases move `Connecting → AwaitingInit → Lobby → InProgress → GameOver`
//! and back to `Lobby` on `Reset`. Apart from the join request, a phase
//! only changes when a relayed message arrives. Messages that make no sense
//! in the current phase are logged and ignored; they never correct state.

use serde::Serialize;
use std::{fmt, time::Duration};
use thiserror::Error;
use tokio::sync::mpsc;

use crate::{
    config::SessionConfig,
    game::{
        PlayerId,
        card::{Card, Color},
        event::{Event, PlayResult},
        facade::RulesEngine,
    },
    net::messages::{Addressed, ClientMessage, PlayerInfo, Role, ServerMessage},
    present::{Anchor, Controls, Cue, Notice, Sequencer, Stage, TableView},
};

pub mod driver;
pub mod relay;

use relay::OpeningDeal;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
pub enum Phase {
    Connecting,
    AwaitingInit,
    Lobby,
    InProgress,
    GameOver,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Connecting => "connecting",
            Self::AwaitingInit => "awaiting init",
            Self::Lobby => "in the lobby",
            Self::InProgress => "in progress",
            Self::GameOver => "game over",
        };
        write!(f, "{repr}")
    }
}

/// Errors surfaced to the local player. Protocol desynchronization is not
/// one of them; it is only logged.
#[derive(Debug, Eq, Error, PartialEq)]
pub enum SessionError {
    #[error("game is already in progress")]
    GameInProgress,
    #[error("already joined")]
    AlreadyJoined,
    #[error("not joined yet")]
    NotJoined,
    #[error("only the host can do that")]
    NotHost,
    #[error("need {min}+ players")]
    NotEnoughPlayers { min: usize },
    #[error("can't do that while {phase}")]
    WrongPhase { phase: Phase },
    #[error("the opening deal is still running")]
    DealInProgress,
    #[error("not your turn")]
    OutOfTurn,
    #[error("no card at index {0}")]
    InvalidCardIndex(usize),
    #[error("that card can't be played now")]
    IllegalCard,
    #[error("choose a color for the wild card")]
    ColorRequired,
    #[error("card at index {0} is not wild")]
    NotWild(usize),
    #[error("connection closed")]
    Disconnected,
}

/// A local player intent.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command {
    Join,
    Chat(String),
    Start,
    Draw,
    Play(usize),
    PlayWild(usize, Color),
    Reset,
    SetPublic(bool),
}

/// Outbound half of the connection. Sends never wait for anything.
#[derive(Clone, Debug)]
pub struct Connection {
    tx: mpsc::UnboundedSender<ClientMessage>,
}

impl Connection {
    pub fn new(tx: mpsc::UnboundedSender<ClientMessage>) -> Self {
        Self { tx }
    }

    /// A connection and the queue its messages land in.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ClientMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    pub fn send(&self, msg: ClientMessage) -> Result<(), SessionError> {
        self.tx.send(msg).map_err(|_| SessionError::Disconnected)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GameOutcome {
    pub winner: PlayerId,
    pub name: String,
}

type EngineFactory<E> = Box<dyn Fn(PlayerId, &str, bool) -> E + Send>;

pub struct Session<E: RulesEngine> {
    name: String,
    conn: Connection,
    stage: Box<dyn Stage>,
    config: SessionConfig,
    factory: EngineFactory<E>,
    phase: Phase,
    own_id: Option<PlayerId>,
    role: Option<Role>,
    /// Join order.
    roster: Vec<PlayerInfo>,
    engine: Option<E>,
    /// Set once the opening deal has completed on this peer.
    started: bool,
    outcome: Option<GameOutcome>,
    public_lobby: bool,
    sequencer: Sequencer,
    /// Host only.
    deal: Option<OpeningDeal>,
    /// Guest only: opening replies seen so far and how many to expect.
    deal_replies: usize,
    deal_target: usize,
    /// Announced deal whose `FromHost` reply has not arrived yet.
    pending_reply: Option<(PlayerId, u32)>,
    now: Duration,
}

impl<E: RulesEngine + 'static> Session<E> {
    pub fn new(name: &str, conn: Connection, stage: Box<dyn Stage>, config: SessionConfig) -> Self {
        Self::with_factory(
            name,
            conn,
            stage,
            config,
            Box::new(|id: PlayerId, name: &str, is_host: bool| E::new(id, name, is_host)),
        )
    }
}

impl<E: RulesEngine> Session<E> {
    /// Like [`Session::new`], but engines are built by `factory` once the
    /// relay has assigned an id and a role.
    pub fn with_factory(
        name: &str,
        conn: Connection,
        stage: Box<dyn Stage>,
        config: SessionConfig,
        factory: EngineFactory<E>,
    ) -> Self {
        let sequencer = Sequencer::new(config.pacing.clone());
        Self {
            name: name.to_string(),
            conn,
            stage,
            config,
            factory,
            phase: Phase::Connecting,
            own_id: None,
            role: None,
            roster: Vec::new(),
            engine: None,
            started: false,
            outcome: None,
            public_lobby: false,
            sequencer,
            deal: None,
            deal_replies: 0,
            deal_target: 0,
            pending_reply: None,
            now: Duration::ZERO,
        }
    }

    // === Accessors ===

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn own_id(&self) -> Option<PlayerId> {
        self.own_id
    }

    pub fn role(&self) -> Option<Role> {
        self.role
    }

    pub fn is_host(&self) -> bool {
        self.role.is_some_and(|role| role.is_host())
    }

    pub fn roster(&self) -> &[PlayerInfo] {
        &self.roster
    }

    pub fn engine(&self) -> Option<&E> {
        self.engine.as_ref()
    }

    pub fn started(&self) -> bool {
        self.started
    }

    pub fn outcome(&self) -> Option<&GameOutcome> {
        self.outcome.as_ref()
    }

    pub fn now(&self) -> Duration {
        self.now
    }

    fn player_name(&self, id: PlayerId) -> String {
        self.roster
            .iter()
            .find(|p| p.id == id)
            .map_or_else(|| format!("player {id}"), |p| p.name.clone())
    }

    fn send(&self, msg: ClientMessage) -> Result<(), SessionError> {
        log::trace!("{} -> {msg}", self.name);
        self.conn.send(msg)
    }

    // === Clock ===

    /// Earliest instant at which [`Session::advance`] has work to do.
    pub fn next_deadline(&self) -> Option<Duration> {
        let deal = self.deal.as_ref().map(OpeningDeal::next_at);
        match (deal, self.sequencer.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Moves the virtual clock to `now`, firing every deal step and cue that
    /// became due on the way, in deadline order.
    pub fn advance(&mut self, now: Duration) -> Result<(), SessionError> {
        self.run_due(now.max(self.now))
    }

    fn run_due(&mut self, now: Duration) -> Result<(), SessionError> {
        loop {
            let deal_at = self
                .deal
                .as_ref()
                .map(OpeningDeal::next_at)
                .filter(|at| *at <= now);
            let cue_at = self.sequencer.next_deadline().filter(|at| *at <= now);
            match (deal_at, cue_at) {
                (None, None) => break,
                (Some(deal), Some(cue)) if cue < deal => self.fire_cues(cue),
                (Some(deal), _) => {
                    self.now = self.now.max(deal);
                    self.deal_step()?;
                }
                (None, Some(cue)) => self.fire_cues(cue),
            }
        }
        self.now = now;
        Ok(())
    }

    fn fire_cues(&mut self, at: Duration) {
        self.now = self.now.max(at);
        while let Some(cue) = self.sequencer.pop_due(at) {
            self.perform(cue);
        }
    }

    fn perform(&mut self, cue: Cue) {
        let result = match cue {
            Cue::Spawn {
                token, face, at, ..
            } => {
                self.stage.spawn_token(token, face, at);
                Ok(())
            }
            Cue::Move { token, to, .. } => self.stage.move_token(token, to),
            Cue::Remove(token) => self.stage.remove_token(token),
            Cue::Render => {
                let view = self.table_view();
                self.stage.render(&view);
                Ok(())
            }
            Cue::Notice(notice) => {
                self.stage.notice(&notice);
                Ok(())
            }
        };
        if let Err(error) = result {
            log::trace!("{}: {error}", self.name);
        }
    }

    /// Shows a failed local command to the player.
    pub fn report(&mut self, error: &SessionError) {
        self.stage.notice(&Notice::CommandFailed(error.to_string()));
    }

    fn render(&mut self) {
        if self.sequencer.request_render() {
            let view = self.table_view();
            self.stage.render(&view);
        }
    }

    // === View ===

    fn is_own_turn(&self) -> bool {
        match (&self.engine, self.own_id) {
            (Some(engine), Some(own)) => engine.current_player() == own,
            _ => false,
        }
    }

    fn can_act(&self) -> bool {
        self.phase == Phase::InProgress && self.started && self.is_own_turn()
    }

    pub fn controls(&self) -> Controls {
        let can_act = self.can_act();
        Controls {
            join: self.phase == Phase::Connecting,
            start: self.is_host()
                && self.phase == Phase::Lobby
                && self.roster.len() >= self.config.min_players,
            reset: self.is_host() && self.phase == Phase::GameOver,
            draw: can_act,
            play: can_act,
        }
    }

    /// Snapshot for rendering. Other players' hands appear as sizes only.
    pub fn table_view(&self) -> TableView {
        let in_game = matches!(self.phase, Phase::InProgress | Phase::GameOver);
        let engine = self.engine.as_ref().filter(|_| in_game);
        let hand = engine.map(|e| e.own_hand()).unwrap_or_default();
        let playable = match engine {
            Some(engine) if self.can_act() => hand
                .iter()
                .enumerate()
                .filter(|(_, card)| engine.is_playable(**card))
                .map(|(i, _)| i)
                .collect(),
            _ => Vec::new(),
        };
        TableView {
            phase: self.phase,
            own_id: self.own_id,
            own_name: self.name.clone(),
            role: self.role,
            roster: self.roster.clone(),
            table: engine.map(|e| e.public_state()),
            hand,
            playable,
            started: self.started,
            winner: self.outcome.as_ref().map(|o| o.name.clone()),
            public_lobby: self.public_lobby,
            controls: self.controls(),
        }
    }

    // === Local Commands ===

    /// Sends the join request.
    pub fn join(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Connecting {
            return Err(SessionError::AlreadyJoined);
        }
        self.send(ClientMessage::PlayerJoined {
            name: self.name.clone(),
        })?;
        self.phase = Phase::AwaitingInit;
        Ok(())
    }

    /// Applies a local intent. Nothing is sent if a precondition fails.
    pub fn apply(&mut self, command: Command) -> Result<(), SessionError> {
        match command {
            Command::Join => self.join(),
            Command::Chat(msg) => {
                self.require_joined()?;
                self.send(ClientMessage::ChatMessage { msg })
            }
            Command::Start => {
                self.require_host()?;
                self.require_phase(Phase::Lobby)?;
                let min = self.config.min_players;
                if self.roster.len() < min {
                    return Err(SessionError::NotEnoughPlayers { min });
                }
                let engine = self.engine.as_ref().ok_or(SessionError::NotJoined)?;
                self.send(ClientMessage::GameStart(engine.init_event()))
            }
            Command::Draw => {
                self.require_turn()?;
                let engine = self.engine.as_ref().ok_or(SessionError::NotJoined)?;
                self.send(ClientMessage::ToHost(engine.draw_request()))
            }
            Command::Play(index) => self.play(index, None),
            Command::PlayWild(index, color) => self.play(index, Some(color)),
            Command::Reset => {
                self.require_host()?;
                self.require_phase(Phase::GameOver)?;
                self.send(ClientMessage::Reset)
            }
            Command::SetPublic(public) => {
                self.require_host()?;
                self.send(ClientMessage::SetPublic(public))?;
                self.public_lobby = public;
                self.render();
                Ok(())
            }
        }
    }

    fn require_joined(&self) -> Result<(), SessionError> {
        match self.own_id {
            Some(_) => Ok(()),
            None => Err(SessionError::NotJoined),
        }
    }

    fn require_host(&self) -> Result<(), SessionError> {
        self.require_joined()?;
        if self.is_host() {
            Ok(())
        } else {
            Err(SessionError::NotHost)
        }
    }

    fn require_phase(&self, phase: Phase) -> Result<(), SessionError> {
        if self.phase == phase {
            Ok(())
        } else {
            Err(SessionError::WrongPhase { phase: self.phase })
        }
    }

    fn require_turn(&self) -> Result<(), SessionError> {
        self.require_phase(Phase::InProgress)?;
        if !self.started {
            return Err(SessionError::DealInProgress);
        }
        if !self.is_own_turn() {
            return Err(SessionError::OutOfTurn);
        }
        Ok(())
    }

    fn play(&mut self, index: usize, color: Option<Color>) -> Result<(), SessionError> {
        self.require_turn()?;
        let engine = self.engine.as_mut().ok_or(SessionError::NotJoined)?;
        let card = *engine
            .own_hand()
            .get(index)
            .ok_or(SessionError::InvalidCardIndex(index))?;
        if !engine.is_playable(card) {
            return Err(SessionError::IllegalCard);
        }
        match color {
            Some(color) if !engine.set_wild_color(index, color) => {
                return Err(SessionError::NotWild(index));
            }
            None if card.is_wild() => return Err(SessionError::ColorRequired),
            _ => {}
        }
        let event = engine
            .play_card_event(index)
            .ok_or(SessionError::InvalidCardIndex(index))?;
        let shown = match &event {
            Event::PlayCard { card, .. } => *card,
            _ => card,
        };
        self.sequencer
            .fly_to_discard(self.now, shown, Anchor::HandSlot(index));
        self.send(ClientMessage::GameEvent(event))
    }

    // === Inbound Messages ===

    /// Applies one relayed message. The only error surfaced from here is
    /// a join rejection (or a dead connection).
    pub fn handle(&mut self, msg: ServerMessage) -> Result<(), SessionError> {
        log::trace!("{} <- {msg}", self.name);
        match msg {
            ServerMessage::GameInProgress => self.on_game_in_progress(),
            ServerMessage::InitData { id, role, players } => {
                self.on_init(id, role, players);
                Ok(())
            }
            ServerMessage::PlayerJoined(info) => {
                self.on_player_joined(info);
                Ok(())
            }
            ServerMessage::PlayerLeft { id } => {
                self.on_player_left(id);
                Ok(())
            }
            ServerMessage::ChatMessage { id, msg } => {
                self.on_chat(id, &msg);
                Ok(())
            }
            ServerMessage::GameStart(event) => self.on_game_start(&event),
            ServerMessage::Reset => {
                self.on_reset();
                Ok(())
            }
            ServerMessage::ToHost(event) => self.on_to_host(&event),
            ServerMessage::HostEvent(event) => {
                self.on_host_event(&event);
                Ok(())
            }
            ServerMessage::FromHost(reply) => {
                self.on_from_host(reply);
                Ok(())
            }
            ServerMessage::GameEvent(event) => {
                self.on_game_event(&event);
                Ok(())
            }
        }
    }

    fn ignore(&self, kind: &str) {
        log::warn!("{}: ignoring {kind} while {}", self.name, self.phase);
    }

    fn on_game_in_progress(&mut self) -> Result<(), SessionError> {
        if !matches!(self.phase, Phase::Connecting | Phase::AwaitingInit) {
            self.ignore("GameInProgress");
            return Ok(());
        }
        log::info!("{}: join rejected, game in progress", self.name);
        self.phase = Phase::Connecting;
        self.stage.notice(&Notice::JoinRejected);
        self.render();
        Err(SessionError::GameInProgress)
    }

    fn on_init(&mut self, id: PlayerId, role: Role, players: Vec<PlayerInfo>) {
        if !matches!(self.phase, Phase::Connecting | Phase::AwaitingInit) {
            self.ignore("InitData");
            return;
        }
        log::info!("{}: joined as {id} ({role})", self.name);
        let mut engine = (self.factory)(id, &self.name, role.is_host());
        for player in &players {
            engine.add_player(player.id, &player.name);
        }
        self.roster = players;
        if self.roster.iter().all(|p| p.id != id) {
            self.roster.push(PlayerInfo {
                name: self.name.clone(),
                id,
            });
        }
        self.engine = Some(engine);
        self.own_id = Some(id);
        self.role = Some(role);
        self.phase = Phase::Lobby;

        self.stage.notice(&Notice::Joined { id, role });
        if !role.is_host() {
            self.stage.notice(&Notice::WaitingForHost);
        }
        self.render();
    }

    fn on_player_joined(&mut self, info: PlayerInfo) {
        if !matches!(self.phase, Phase::Lobby | Phase::InProgress) {
            self.ignore("PlayerJoined");
            return;
        }
        if self.roster.iter().any(|p| p.id == info.id) {
            log::debug!("{}: player {} already known", self.name, info.id);
            return;
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.add_player(info.id, &info.name);
        }
        self.stage.notice(&Notice::PlayerJoined(info.name.clone()));
        self.roster.push(info);
        self.render();
    }

    fn on_player_left(&mut self, id: PlayerId) {
        if !matches!(
            self.phase,
            Phase::Lobby | Phase::InProgress | Phase::GameOver
        ) {
            self.ignore("PlayerLeft");
            return;
        }
        if Some(id) == self.own_id {
            return;
        }
        let Some(index) = self.roster.iter().position(|p| p.id == id) else {
            return;
        };
        let info = self.roster.remove(index);
        if let Some(engine) = self.engine.as_mut() {
            engine.remove_player(id);
        }
        self.stage.notice(&Notice::PlayerLeft(info.name));
        self.render();
    }

    fn on_chat(&mut self, id: PlayerId, msg: &str) {
        if self.own_id.is_none() {
            self.ignore("ChatMessage");
            return;
        }
        let from = self.player_name(id);
        self.stage.chat(&from, msg);
    }

    fn on_game_start(&mut self, event: &Event) -> Result<(), SessionError> {
        if self.phase != Phase::Lobby {
            self.ignore("GameStart");
            return Ok(());
        }
        let Some(engine) = self.engine.as_mut() else {
            return Ok(());
        };
        engine.handle_event(event);
        self.phase = Phase::InProgress;
        self.started = false;
        self.outcome = None;
        self.deal_replies = 0;
        self.deal_target = self.config.opening_hand_size * self.roster.len();
        self.pending_reply = None;
        log::info!("{}: game started with {} players", self.name, self.roster.len());
        self.stage.notice(&Notice::GameStarted);
        self.render();

        if self.is_host() {
            self.begin_opening_deal()?;
        }
        Ok(())
    }

    fn on_reset(&mut self) {
        if !matches!(
            self.phase,
            Phase::Lobby | Phase::InProgress | Phase::GameOver
        ) {
            self.ignore("Reset");
            return;
        }
        // The lobby is already a clean table.
        if self.phase == Phase::Lobby {
            return;
        }
        if let Some(engine) = self.engine.as_mut() {
            engine.reset();
        }
        self.phase = Phase::Lobby;
        self.started = false;
        self.outcome = None;
        self.deal = None;
        self.deal_replies = 0;
        self.deal_target = 0;
        self.pending_reply = None;
        for token in self.sequencer.clear() {
            if let Err(error) = self.stage.remove_token(token) {
                log::trace!("{}: {error}", self.name);
            }
        }
        log::info!("{}: game reset", self.name);
        self.stage.notice(&Notice::GameReset);
        if !self.is_host() {
            self.stage.notice(&Notice::WaitingForHost);
        }
        self.render();
    }

    fn on_to_host(&mut self, event: &Event) -> Result<(), SessionError> {
        if !self.is_host() {
            log::trace!("{}: not the host, dropping request", self.name);
            return Ok(());
        }
        if self.phase != Phase::InProgress {
            self.ignore("ToHost");
            return Ok(());
        }
        match event {
            Event::DrawRequest => {
                let Some(target) = self.engine.as_ref().map(|e| e.current_player()) else {
                    return Ok(());
                };
                self.host_draw(target)
            }
            other => {
                log::warn!("{}: unsupported host request {other}", self.name);
                Ok(())
            }
        }
    }

    fn on_host_event(&mut self, event: &Event) {
        if self.phase != Phase::InProgress {
            self.ignore("HostEvent");
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        engine.handle_host_event(None, event);
        if let Event::Deal { player, count } = event {
            if let Some((stale, _)) = self.pending_reply {
                log::warn!("{}: deal to {stale} was never answered", self.name);
            }
            self.pending_reply = Some((*player, *count));
            if Some(*player) != self.own_id {
                self.sequencer.deal_face_down(self.now, *player, *count);
            }
        }
        self.render();
    }

    fn on_from_host(&mut self, reply: Addressed) {
        if self.phase != Phase::InProgress {
            self.ignore("FromHost");
            return;
        }
        let answers_deal = match &reply.msg {
            Event::DrawResponse(cards) => {
                self.pending_reply.map(|(id, count)| (id, count as usize))
                    == Some((reply.id, cards.len()))
            }
            _ => false,
        };
        if !answers_deal {
            log::warn!(
                "{}: ignoring FromHost for {} without a matching deal",
                self.name,
                reply.id
            );
            return;
        }
        self.pending_reply = None;
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let before = engine.own_hand().len();
        engine.handle_host_event(Some(reply.id), &reply.msg);
        let drawn: Vec<(usize, Card)> = engine
            .own_hand()
            .into_iter()
            .enumerate()
            .skip(before)
            .collect();

        if !self.started && !self.is_host() {
            self.deal_replies += 1;
            if self.deal_replies >= self.deal_target {
                self.started = true;
                log::info!("{}: opening deal complete", self.name);
                self.stage.notice(&Notice::DealComplete);
            }
        }

        self.render();
        if Some(reply.id) == self.own_id {
            self.sequencer.fly_to_hand(self.now, &drawn);
        }
    }

    fn on_game_event(&mut self, event: &Event) {
        if self.phase != Phase::InProgress {
            self.ignore("GameEvent");
            return;
        }
        let Some(engine) = self.engine.as_mut() else {
            return;
        };
        let result = engine.handle_event(event);
        let winner = engine.current_player();

        let Event::PlayCard { card, player, .. } = event else {
            self.render();
            return;
        };
        if result == PlayResult::InvalidCard {
            log::warn!("{}: rejected play by {player}: {card:#}", self.name);
        }
        if Some(*player) != self.own_id {
            self.sequencer
                .fly_to_discard(self.now, *card, Anchor::Seat(*player));
        }
        let settle = self.config.pacing.play_settle;
        self.sequencer.after(self.now, settle, Cue::Render);

        if result.is_game_over() {
            let name = self.player_name(winner);
            log::info!("{}: {name} wins", self.name);
            self.phase = Phase::GameOver;
            self.outcome = Some(GameOutcome {
                winner,
                name: name.clone(),
            });
            self.sequencer
                .after(self.now, settle, Cue::Notice(Notice::Winner(name)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        game::{
            DECK_SIZE,
            card::CardType,
            engine::Game,
        },
        present::NullStage,
    };

    type Outbox = mpsc::UnboundedReceiver<ClientMessage>;

    fn session(name: &str) -> (Session<Game>, Outbox) {
        let (conn, outbox) = Connection::channel();
        let session = Session::with_factory(
            name,
            conn,
            Box::new(NullStage),
            SessionConfig::default(),
            Box::new(|id: PlayerId, name: &str, is_host: bool| {
                Game::seeded(id, name, is_host, 42)
            }),
        );
        (session, outbox)
    }

    fn drain(outbox: &mut Outbox) -> Vec<ClientMessage> {
        std::iter::from_fn(|| outbox.try_recv().ok()).collect()
    }

    fn info(name: &str, id: PlayerId) -> PlayerInfo {
        PlayerInfo {
            name: name.to_string(),
            id,
        }
    }

    fn host_in_lobby() -> (Session<Game>, Outbox) {
        let (mut host, mut outbox) = session("alice");
        host.join().unwrap();
        host.handle(ServerMessage::InitData {
            id: 1,
            role: Role::Host,
            players: vec![info("alice", 1)],
        })
        .unwrap();
        drain(&mut outbox);
        (host, outbox)
    }

    fn guest_in_lobby() -> (Session<Game>, Outbox) {
        let (mut guest, mut outbox) = session("bob");
        guest.join().unwrap();
        guest
            .handle(ServerMessage::InitData {
                id: 2,
                role: Role::Guest,
                players: vec![info("alice", 1), info("bob", 2)],
            })
            .unwrap();
        drain(&mut outbox);
        (guest, outbox)
    }

    // === Join Tests ===

    #[test]
    fn test_join_sends_name() {
        let (mut session, mut outbox) = session("alice");
        assert!(session.controls().join);
        session.join().unwrap();
        assert_eq!(session.phase(), Phase::AwaitingInit);
        assert_eq!(
            drain(&mut outbox),
            vec![ClientMessage::PlayerJoined {
                name: "alice".to_string()
            }]
        );
        assert_eq!(session.join(), Err(SessionError::AlreadyJoined));
    }

    #[test]
    fn test_game_in_progress_rejects_join() {
        let (mut session, _outbox) = session("carol");
        session.join().unwrap();
        assert_eq!(
            session.handle(ServerMessage::GameInProgress),
            Err(SessionError::GameInProgress)
        );
        assert_eq!(session.phase(), Phase::Connecting);
        assert!(session.controls().join);
        // Retry allowed.
        assert!(session.join().is_ok());
    }

    #[test]
    fn test_init_data_establishes_identity() {
        let (guest, _outbox) = guest_in_lobby();
        assert_eq!(guest.phase(), Phase::Lobby);
        assert_eq!(guest.own_id(), Some(2));
        assert_eq!(guest.role(), Some(Role::Guest));
        assert_eq!(guest.roster().len(), 2);
        assert_eq!(guest.engine().map(|e| e.seats().len()), Some(2));
        assert!(!guest.controls().start);
    }

    #[test]
    fn test_second_init_data_is_ignored() {
        let (mut guest, _outbox) = guest_in_lobby();
        guest
            .handle(ServerMessage::InitData {
                id: 7,
                role: Role::Host,
                players: vec![],
            })
            .unwrap();
        assert_eq!(guest.own_id(), Some(2));
        assert_eq!(guest.role(), Some(Role::Guest));
    }

    // === Lobby Tests ===

    #[test]
    fn test_second_player_enables_start() {
        let (mut host, _outbox) = host_in_lobby();
        assert!(!host.controls().start);
        assert_eq!(
            host.apply(Command::Start),
            Err(SessionError::NotEnoughPlayers { min: 2 })
        );
        host.handle(ServerMessage::PlayerJoined(info("bob", 2)))
            .unwrap();
        assert!(host.controls().start);
    }

    #[test]
    fn test_duplicate_player_joined_ignored() {
        let (mut host, _outbox) = host_in_lobby();
        host.handle(ServerMessage::PlayerJoined(info("bob", 2)))
            .unwrap();
        host.handle(ServerMessage::PlayerJoined(info("bob", 2)))
            .unwrap();
        assert_eq!(host.roster().len(), 2);
    }

    #[test]
    fn test_player_left_removes_from_roster() {
        let (mut host, _outbox) = host_in_lobby();
        host.handle(ServerMessage::PlayerJoined(info("bob", 2)))
            .unwrap();
        host.handle(ServerMessage::PlayerLeft { id: 2 }).unwrap();
        host.handle(ServerMessage::PlayerLeft { id: 1 }).unwrap();
        assert_eq!(host.roster(), &[info("alice", 1)]);
    }

    #[test]
    fn test_guest_cannot_start() {
        let (mut guest, mut outbox) = guest_in_lobby();
        assert_eq!(guest.apply(Command::Start), Err(SessionError::NotHost));
        assert!(drain(&mut outbox).is_empty());
    }

    #[test]
    fn test_set_public_is_host_only() {
        let (mut host, mut outbox) = host_in_lobby();
        host.apply(Command::SetPublic(true)).unwrap();
        assert_eq!(drain(&mut outbox), vec![ClientMessage::SetPublic(true)]);
        assert!(host.table_view().public_lobby);

        let (mut guest, _outbox) = guest_in_lobby();
        assert_eq!(
            guest.apply(Command::SetPublic(true)),
            Err(SessionError::NotHost)
        );
    }

    #[test]
    fn test_chat_requires_join() {
        let (mut session, _outbox) = session("alice");
        assert_eq!(
            session.apply(Command::Chat("hi".to_string())),
            Err(SessionError::NotJoined)
        );
    }

    // === Game Start Tests ===

    #[test]
    fn test_host_start_sends_init_event() {
        let (mut host, mut outbox) = host_in_lobby();
        host.handle(ServerMessage::PlayerJoined(info("bob", 2)))
            .unwrap();
        host.apply(Command::Start).unwrap();
        let sent = drain(&mut outbox);
        assert!(matches!(
            sent.as_slice(),
            [ClientMessage::GameStart(Event::Init { .. })]
        ));
        // Nothing changes until the start is relayed back.
        assert_eq!(host.phase(), Phase::Lobby);
    }

    #[test]
    fn test_host_deals_first_pair_immediately() {
        let (mut host, mut outbox) = host_in_lobby();
        host.handle(ServerMessage::PlayerJoined(info("bob", 2)))
            .unwrap();
        let init = host.engine().unwrap().init_event();
        host.handle(ServerMessage::GameStart(init)).unwrap();

        assert_eq!(host.phase(), Phase::InProgress);
        assert!(!host.started());
        let sent = drain(&mut outbox);
        assert_eq!(sent.len(), 2);
        assert!(matches!(
            sent[0],
            ClientMessage::HostEvent(Event::Deal {
                player: 1,
                count: 1
            })
        ));
        assert!(matches!(sent[1], ClientMessage::FromHost(Addressed { id: 1, .. })));
        assert_eq!(host.pending_deal_steps(), Some(13));
        assert_eq!(host.next_deadline(), Some(Duration::from_millis(100)));
    }

    #[test]
    fn test_host_opening_deal_completes_after_last_step() {
        let (mut host, mut outbox) = host_in_lobby();
        host.handle(ServerMessage::PlayerJoined(info("bob", 2)))
            .unwrap();
        let init = host.engine().unwrap().init_event();
        host.handle(ServerMessage::GameStart(init)).unwrap();

        host.advance(Duration::from_millis(1300)).unwrap();
        assert_eq!(drain(&mut outbox).len(), 28);
        assert!(!host.started());
        host.advance(Duration::from_millis(1400)).unwrap();
        assert!(host.started());
        assert!(drain(&mut outbox).is_empty());
        assert_eq!(host.pending_deal_steps(), None);
    }

    fn deal_pair(guest: &mut Session<Game>, player: PlayerId) {
        guest
            .handle(ServerMessage::HostEvent(Event::Deal { player, count: 1 }))
            .unwrap();
        let cards = vec![Card::new(CardType::N1, Color::Blue)];
        guest
            .handle(ServerMessage::FromHost(Addressed {
                id: player,
                msg: Event::DrawResponse(cards),
            }))
            .unwrap();
    }

    fn dealt_guest() -> (Session<Game>, Outbox) {
        let (mut guest, outbox) = guest_in_lobby();
        let init = Event::Init {
            last: Card::new(CardType::N5, Color::Red),
        };
        guest.handle(ServerMessage::GameStart(init)).unwrap();
        for i in 0..14 {
            assert!(!guest.started());
            deal_pair(&mut guest, if i % 2 == 0 { 1 } else { 2 });
        }
        (guest, outbox)
    }

    #[test]
    fn test_guest_counts_opening_replies() {
        let (guest, _outbox) = dealt_guest();
        assert!(guest.started());
        let engine = guest.engine().unwrap();
        assert_eq!(engine.hand_size(1), Some(7));
        assert_eq!(engine.own_hand().len(), 7);
        assert_eq!(engine.public_state().cards_in_play(), DECK_SIZE);
    }

    #[test]
    fn test_from_host_without_deal_is_ignored() {
        let (mut guest, _outbox) = dealt_guest();
        let before = guest.engine().unwrap().public_state();
        let reply = ServerMessage::FromHost(Addressed {
            id: 2,
            msg: Event::DrawResponse(vec![Card::new(CardType::N9, Color::Red)]),
        });
        guest.handle(reply.clone()).unwrap();
        assert_eq!(guest.engine().unwrap().own_hand().len(), 7);
        assert_eq!(guest.engine().unwrap().public_state(), before);

        // Paired once, the same reply is accepted exactly once.
        guest
            .handle(ServerMessage::HostEvent(Event::Deal { player: 2, count: 1 }))
            .unwrap();
        guest.handle(reply.clone()).unwrap();
        guest.handle(reply).unwrap();
        assert_eq!(guest.engine().unwrap().own_hand().len(), 8);
    }

    #[test]
    fn test_from_host_for_another_player_is_ignored() {
        let (mut guest, _outbox) = dealt_guest();
        guest
            .handle(ServerMessage::HostEvent(Event::Deal { player: 1, count: 1 }))
            .unwrap();
        let before = guest.engine().unwrap().public_state();
        guest
            .handle(ServerMessage::FromHost(Addressed {
                id: 2,
                msg: Event::DrawResponse(vec![Card::new(CardType::N9, Color::Red)]),
            }))
            .unwrap();
        assert_eq!(guest.engine().unwrap().public_state(), before);
        assert_eq!(guest.engine().unwrap().own_hand().len(), 7);
    }

    // === Host Relay Tests ===

    #[test]
    fn test_guest_ignores_to_host() {
        let (mut guest, mut outbox) = guest_in_lobby();
        let init = guest.engine().unwrap().init_event();
        guest.handle(ServerMessage::GameStart(init)).unwrap();
        guest
            .handle(ServerMessage::ToHost(Event::DrawRequest))
            .unwrap();
        assert!(drain(&mut outbox).is_empty());
    }

    #[test]
    fn test_draw_requires_started_turn() {
        let (mut guest, mut outbox) = guest_in_lobby();
        assert_eq!(
            guest.apply(Command::Draw),
            Err(SessionError::WrongPhase {
                phase: Phase::Lobby
            })
        );
        let init = guest.engine().unwrap().init_event();
        guest.handle(ServerMessage::GameStart(init)).unwrap();
        assert_eq!(guest.apply(Command::Draw), Err(SessionError::DealInProgress));
        assert!(drain(&mut outbox).is_empty());
    }

    // === Reset Tests ===

    #[test]
    fn test_reset_returns_to_lobby() {
        let (mut guest, _outbox) = guest_in_lobby();
        let init = guest.engine().unwrap().init_event();
        guest.handle(ServerMessage::GameStart(init)).unwrap();
        guest.handle(ServerMessage::Reset).unwrap();
        assert_eq!(guest.phase(), Phase::Lobby);
        assert!(!guest.started());
        let view = guest.table_view();
        guest.handle(ServerMessage::Reset).unwrap();
        assert_eq!(guest.table_view(), view);
    }

    #[test]
    fn test_reset_drops_scheduled_animations() {
        let (mut guest, _outbox) = dealt_guest();
        guest
            .handle(ServerMessage::HostEvent(Event::Deal { player: 1, count: 3 }))
            .unwrap();
        assert!(guest.next_deadline().is_some());
        guest.handle(ServerMessage::Reset).unwrap();
        assert_eq!(guest.next_deadline(), None);
    }

    #[test]
    fn test_reset_requires_game_over() {
        let (mut host, mut outbox) = host_in_lobby();
        assert_eq!(
            host.apply(Command::Reset),
            Err(SessionError::WrongPhase {
                phase: Phase::Lobby
            })
        );
        assert!(drain(&mut outbox).is_empty());
    }

    // === Message Gate Tests ===

    #[test]
    fn test_game_messages_ignored_in_lobby() {
        let (mut guest, _outbox) = guest_in_lobby();
        let before = guest.engine().unwrap().public_state();
        guest
            .handle(ServerMessage::HostEvent(Event::Deal { player: 1, count: 3 }))
            .unwrap();
        guest.handle(ServerMessage::GameEvent(Event::EndTurn)).unwrap();
        assert_eq!(guest.engine().unwrap().public_state(), before);
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(Phase::InProgress.to_string(), "in progress");
        assert_eq!(
            SessionError::WrongPhase {
                phase: Phase::Lobby
            }
            .to_string(),
            "can't do that while in the lobby"
        );
    }
}
