//! Cards and the blackjack shoe

use super::rng::fisher_yates;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Suit {
    Spades,
    Hearts,
    Diamonds,
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];

    pub fn symbol(&self) -> char {
        match self {
            Suit::Spades => '♠',
            Suit::Hearts => '♥',
            Suit::Diamonds => '♦',
            Suit::Clubs => '♣',
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Rank {
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Blackjack value with the ace counted high
    pub fn value(&self) -> u8 {
        match self {
            Rank::Ace => 11,
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Rank::Ace => "A",
            Rank::Two => "2",
            Rank::Three => "3",
            Rank::Four => "4",
            Rank::Five => "5",
            Rank::Six => "6",
            Rank::Seven => "7",
            Rank::Eight => "8",
            Rank::Nine => "9",
            Rank::Ten => "10",
            Rank::Jack => "J",
            Rank::Queen => "Q",
            Rank::King => "K",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub const fn new(rank: Rank, suit: Suit) -> Self {
        Self { suit, rank }
    }

    pub fn value(&self) -> u8 {
        self.rank.value()
    }

    pub fn is_ace(&self) -> bool {
        self.rank == Rank::Ace
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank.label(), self.suit.symbol())
    }
}

/// All 52 cards, suit-major, unshuffled
pub fn ordered_cards() -> Vec<Card> {
    Suit::ALL
        .iter()
        .flat_map(|&suit| Rank::ALL.iter().map(move |&rank| Card::new(rank, suit)))
        .collect()
}

/// A freshly shuffled 52-card deck
pub fn create_deck<R: Rng + ?Sized>(rng: &mut R) -> Vec<Card> {
    let mut cards = ordered_cards();
    fisher_yates(&mut cards, rng);
    cards
}

/// Cards consumed front-to-back. Dealing from an empty deck substitutes a new
/// shuffled deck instead of failing.
#[derive(Debug, Clone, Default)]
pub struct Deck {
    cards: VecDeque<Card>,
    reshuffles: u32,
}

impl Deck {
    pub fn shuffled<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            cards: create_deck(rng).into(),
            reshuffles: 0,
        }
    }

    /// A deck dealt in exactly the given order
    pub fn from_cards(cards: impl IntoIterator<Item = Card>) -> Self {
        Self {
            cards: cards.into_iter().collect(),
            reshuffles: 0,
        }
    }

    pub fn deal<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Card {
        loop {
            if let Some(card) = self.cards.pop_front() {
                return card;
            }
            self.cards = create_deck(rng).into();
            self.reshuffles += 1;
        }
    }

    pub fn remaining(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Times the deck ran dry and was replaced
    pub fn reshuffles(&self) -> u32 {
        self.reshuffles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::rng::seeded;
    use std::collections::HashSet;

    #[test]
    fn test_deck_has_52_unique_cards() {
        for seed in 0..20 {
            let deck = create_deck(&mut seeded(seed));
            assert_eq!(deck.len(), 52);
            let unique: HashSet<Card> = deck.iter().copied().collect();
            let ordered: HashSet<Card> = ordered_cards().into_iter().collect();
            assert_eq!(unique.len(), 52);
            assert_eq!(unique, ordered);
        }
    }

    #[test]
    fn test_card_values() {
        assert_eq!(Card::new(Rank::Ace, Suit::Spades).value(), 11);
        assert_eq!(Card::new(Rank::King, Suit::Hearts).value(), 10);
        assert_eq!(Card::new(Rank::Ten, Suit::Clubs).value(), 10);
        assert_eq!(Card::new(Rank::Seven, Suit::Diamonds).value(), 7);
        let total: u32 = ordered_cards().iter().map(|c| c.value() as u32).sum();
        assert_eq!(total, 4 * (11 + 2 + 3 + 4 + 5 + 6 + 7 + 8 + 9 + 10 * 4));
    }

    #[test]
    fn test_deal_consumes_front_to_back() {
        let mut rng = seeded(3);
        let first = Card::new(Rank::Two, Suit::Clubs);
        let second = Card::new(Rank::Queen, Suit::Hearts);
        let mut deck = Deck::from_cards([first, second]);

        assert_eq!(deck.deal(&mut rng), first);
        assert_eq!(deck.deal(&mut rng), second);
        assert!(deck.is_empty());
    }

    #[test]
    fn test_empty_deck_reshuffles_silently() {
        let mut rng = seeded(11);
        let mut deck = Deck::from_cards([]);

        let _ = deck.deal(&mut rng);
        assert_eq!(deck.reshuffles(), 1);
        assert_eq!(deck.remaining(), 51);

        for _ in 0..51 {
            deck.deal(&mut rng);
        }
        assert_eq!(deck.reshuffles(), 1);
        deck.deal(&mut rng);
        assert_eq!(deck.reshuffles(), 2);
    }

    #[test]
    fn test_card_display() {
        assert_eq!(Card::new(Rank::Ten, Suit::Hearts).to_string(), "10♥");
        assert_eq!(Card::new(Rank::Ace, Suit::Spades).to_string(), "A♠");
    }
}
