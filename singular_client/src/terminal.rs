//! Line-oriented terminal rendering.
//!
//! A terminal cannot animate, so card tokens are tracked only to keep the
//! stage contract (stale tokens are refused) and to print one line when a
//! face-down card lands at another seat. The table itself is printed on
//! every render that changes what is visible.

use singular::{
    Direction,
    present::{Anchor, Face, Notice, Stage, StageError, TableView, TokenId},
};
use std::{
    collections::HashMap,
    io::{self, Write},
};

pub struct TerminalStage<W: Write + Send> {
    out: W,
    tokens: HashMap<TokenId, Face>,
    last: Option<TableView>,
}

impl TerminalStage<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> TerminalStage<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            tokens: HashMap::new(),
            last: None,
        }
    }

    /// Number of tokens currently on stage.
    pub fn live_tokens(&self) -> usize {
        self.tokens.len()
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            log::warn!("terminal write failed: {e}");
        }
    }
}

/// Renders a table view as text lines.
pub fn describe(view: &TableView) -> Vec<String> {
    let mut lines = Vec::new();
    let who = match view.role {
        Some(role) => format!("{} ({role})", view.own_name),
        None => view.own_name.clone(),
    };
    let visibility = if view.public_lobby { ", public" } else { "" };
    lines.push(format!("--- {who} | {}{visibility} ---", view.phase));

    match &view.table {
        Some(table) => {
            let direction = match table.direction {
                Direction::Clockwise => "clockwise",
                Direction::CounterClockwise => "counter-clockwise",
            };
            let mut top = format!(
                "top: {:#}  draw pile: {}  discard: {}  {direction}",
                table.top_card, table.draw_len, table.discard_len
            );
            if table.pending_draw > 0 {
                top.push_str(&format!("  pending +{}", table.pending_draw));
            }
            lines.push(top);

            let seats: Vec<String> = table
                .seats
                .iter()
                .map(|seat| {
                    let marker = if seat.id == table.current_player { " <" } else { "" };
                    format!("{} {}{marker}", seat.name, seat.hand_size)
                })
                .collect();
            lines.push(format!("seats: {}", seats.join(", ")));
        }
        None => {
            let names: Vec<&str> = view.roster.iter().map(|p| p.name.as_str()).collect();
            lines.push(format!("players: {}", names.join(", ")));
        }
    }

    if !view.hand.is_empty() {
        let cards: Vec<String> = view
            .hand
            .iter()
            .enumerate()
            .map(|(i, card)| {
                let mark = if view.playable.contains(&i) { "*" } else { "" };
                format!("[{}]{mark} {card}", i + 1)
            })
            .collect();
        lines.push(format!("hand: {}", cards.join("  ")));
    }

    let controls = view.controls;
    let mut actions = Vec::new();
    if controls.join {
        actions.push("join");
    }
    if controls.start {
        actions.push("start");
    }
    if controls.draw {
        actions.push("draw");
    }
    if controls.play {
        actions.push("play N");
    }
    if controls.reset {
        actions.push("reset");
    }
    if !actions.is_empty() {
        lines.push(format!("you can: {}", actions.join(", ")));
    }
    lines
}

impl<W: Write + Send> Stage for TerminalStage<W> {
    fn render(&mut self, view: &TableView) {
        if self.last.as_ref() == Some(view) {
            return;
        }
        for line in describe(view) {
            self.line(&line);
        }
        self.last = Some(view.clone());
    }

    fn spawn_token(&mut self, token: TokenId, face: Face, _at: Anchor) {
        self.tokens.insert(token, face);
    }

    fn move_token(&mut self, token: TokenId, to: Anchor) -> Result<(), StageError> {
        let face = *self.tokens.get(&token).ok_or(StageError::StaleToken(token))?;
        if let (Face::Back, Anchor::Seat(id)) = (face, to) {
            let name = self
                .last
                .as_ref()
                .and_then(|view| view.name_of(id))
                .map_or_else(|| format!("player {id}"), str::to_string);
            self.line(&format!("  {name} takes a card"));
        }
        Ok(())
    }

    fn remove_token(&mut self, token: TokenId) -> Result<(), StageError> {
        self.tokens
            .remove(&token)
            .map(|_| ())
            .ok_or(StageError::StaleToken(token))
    }

    fn chat(&mut self, from: &str, msg: &str) {
        let stamp = chrono::Local::now().format("%H:%M:%S");
        self.line(&format!("[{stamp}] {from}: {msg}"));
    }

    fn notice(&mut self, notice: &Notice) {
        self.line(&format!("* {notice}"));
    }
}
