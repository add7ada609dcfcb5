/// Property-based tests for replica agreement.
///
/// Random tables play random move sequences through an in-process relay.
/// After every move, every replica must report the same public state and
/// account for the whole deck.
mod common;

use common::Table;
use proptest::prelude::*;
use singular::{RulesEngine, SessionConfig, game::DECK_SIZE};

fn table_with(seed: u64, players: usize, opening_hand_size: usize) -> Table {
    let config = SessionConfig {
        opening_hand_size,
        ..SessionConfig::default()
    };
    let mut table = Table::with_config(seed, config);
    for i in 0..players {
        table.join(&format!("player{i}"));
    }
    table.start();
    table
}

fn check_agreement(table: &Table) -> Result<(), TestCaseError> {
    let reference = table.host().engine().public_state();
    prop_assert_eq!(reference.cards_in_play(), DECK_SIZE);
    for peer in &table.peers {
        prop_assert_eq!(&peer.engine().public_state(), &reference);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_replicas_agree_after_every_move(
        seed in any::<u64>(),
        players in 2usize..=4,
        choices in prop::collection::vec(0usize..8, 1..60),
    ) {
        let mut table = table_with(seed, players, 3);
        check_agreement(&table)?;
        for choice in choices {
            if table.game_over() {
                break;
            }
            table.step(choice);
            check_agreement(&table)?;
        }
    }

    #[test]
    fn test_opening_deal_fills_every_hand(
        seed in any::<u64>(),
        players in 2usize..=4,
        hand in 1usize..=7,
    ) {
        let table = table_with(seed, players, hand);
        for peer in &table.peers {
            prop_assert!(peer.session.started());
            for seat in peer.engine().seats() {
                prop_assert_eq!(seat.hand_size, hand);
            }
            prop_assert_eq!(peer.engine().own_hand().len(), hand);
        }
        prop_assert_eq!(table.current_player(), 1);
        check_agreement(&table)?;
    }

    #[test]
    fn test_only_winner_has_empty_hand(
        seed in any::<u64>(),
        choices in prop::collection::vec(0usize..4, 200),
    ) {
        let mut table = table_with(seed, 2, 1);
        for choice in choices {
            if table.game_over() {
                break;
            }
            table.step(choice);
        }
        if table.game_over() {
            let winner = table.current_player();
            for peer in &table.peers {
                let outcome = peer.session.outcome();
                prop_assert_eq!(outcome.map(|o| o.winner), Some(winner));
                for seat in peer.engine().seats() {
                    prop_assert_eq!(seat.hand_size == 0, seat.id == winner);
                }
            }
        }
    }
}
