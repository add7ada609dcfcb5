use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;

use super::DECK_SIZE;

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Color {
    Red,
    Green,
    Yellow,
    Blue,
}

impl Color {
    pub const ALL: [Color; 4] = [Self::Red, Self::Green, Self::Yellow, Self::Blue];

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Red => "red",
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Blue => "blue",
        };
        write!(f, "{repr}")
    }
}

#[derive(Debug, Eq, Error, PartialEq)]
#[error("unknown color '{0}'")]
pub struct UnknownColor(pub String);

impl FromStr for Color {
    type Err = UnknownColor;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "red" | "r" => Ok(Self::Red),
            "green" | "g" => Ok(Self::Green),
            "yellow" | "y" => Ok(Self::Yellow),
            "blue" | "b" => Ok(Self::Blue),
            _ => Err(UnknownColor(s.to_string())),
        }
    }
}

/// Card faces. Numbers keep their face value as the discriminant.
#[repr(u8)]
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum CardType {
    N0 = 0,
    N1 = 1,
    N2 = 2,
    N3 = 3,
    N4 = 4,
    N5 = 5,
    N6 = 6,
    N7 = 7,
    N8 = 8,
    N9 = 9,
    PlusTwo = 10,
    Skip = 11,
    Reverse = 12,
    Wild = 13,
    PlusFour = 14,
}

impl CardType {
    const NUMBERS: [CardType; 10] = [
        Self::N0,
        Self::N1,
        Self::N2,
        Self::N3,
        Self::N4,
        Self::N5,
        Self::N6,
        Self::N7,
        Self::N8,
        Self::N9,
    ];

    pub fn is_wild(&self) -> bool {
        matches!(self, Self::Wild | Self::PlusFour)
    }

    pub fn is_number(&self) -> bool {
        (*self as u8) <= 9
    }

    /// Whether this card may be played on top of a pending draw penalty.
    pub fn can_be_stacked(&self) -> bool {
        matches!(
            self,
            Self::PlusTwo | Self::PlusFour | Self::Reverse | Self::Skip
        )
    }

    /// Cards a player must draw when this card is played.
    pub fn penalty(&self) -> u32 {
        match self {
            Self::PlusTwo => 2,
            Self::PlusFour => 4,
            _ => 0,
        }
    }

    /// Weighted random face, roughly following deck frequencies.
    pub fn random<R: Rng>(rng: &mut R) -> Self {
        let n: f32 = rng.random_range(0.0..12.0);
        if n < 10.0 {
            return Self::NUMBERS[n as usize];
        }
        match n {
            n if n < 10.5 => Self::PlusTwo,
            n if n < 11.0 => Self::Skip,
            n if n < 11.5 => Self::Reverse,
            n if n < 11.75 => Self::Wild,
            _ => Self::PlusFour,
        }
    }

    /// Short face label shown on a card.
    pub fn label(&self) -> String {
        match self {
            ty if ty.is_number() => (*ty as u8).to_string(),
            Self::PlusTwo => "+2".to_string(),
            Self::PlusFour => "+4".to_string(),
            Self::Wild => "*".to_string(),
            Self::Skip => "skip".to_string(),
            _ => "reverse".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Card {
    ty: CardType,
    color: Color,
}

impl Card {
    pub const fn new(ty: CardType, color: Color) -> Self {
        Self { ty, color }
    }

    pub fn random<R: Rng>(rng: &mut R) -> Self {
        Self {
            ty: CardType::random(rng),
            color: Color::random(rng),
        }
    }

    pub fn ty(&self) -> CardType {
        self.ty
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn is_wild(&self) -> bool {
        self.ty.is_wild()
    }

    /// Wild cards take the color chosen by the player who plays them.
    /// Other cards keep their printed color.
    pub fn set_color(&mut self, color: Color) -> bool {
        if self.is_wild() {
            self.color = color;
        }
        self.is_wild()
    }

    /// Whether this card can be played on `top`, ignoring draw penalties.
    pub fn compatible_with(&self, top: Card) -> bool {
        self.is_wild() || self.ty == top.ty || self.color == top.color
    }

    pub fn label(&self) -> String {
        self.ty.label()
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.ty {
            CardType::Wild => write!(f, "wild")?,
            CardType::PlusFour => write!(f, "+4")?,
            ty => write!(f, "{} {}", self.color, ty.label())?,
        }
        if f.alternate() && self.is_wild() {
            write!(f, " ({})", self.color)?;
        }
        Ok(())
    }
}

/// Builds an unshuffled deck: per color one 0 and two of every other colored
/// face, then four wilds and four +4s.
pub fn build_deck() -> Vec<Card> {
    let mut deck = Vec::with_capacity(DECK_SIZE);
    for color in Color::ALL {
        deck.push(Card::new(CardType::N0, color));
        for ty in CardType::NUMBERS.iter().skip(1).chain(&[
            CardType::PlusTwo,
            CardType::Skip,
            CardType::Reverse,
        ]) {
            deck.push(Card::new(*ty, color));
            deck.push(Card::new(*ty, color));
        }
    }
    for _ in 0..4 {
        // Wild colors are chosen at play time; red is a placeholder.
        deck.push(Card::new(CardType::Wild, Color::Red));
        deck.push(Card::new(CardType::PlusFour, Color::Red));
    }
    deck
}
