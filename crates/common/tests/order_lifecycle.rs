//! Table driven tests for how a participant reads an order

use ::common::order::{
    bond_state, cancellation, BondState, CancellationClass, OrderStatus, RoleFlags,
};

use BondState::{Hidden as H, Locked as L, Settled as S, Unlocked as U};
use CancellationClass::{Collaborative as Co, Free as F, UnilateralWithRisk as R};

// columns: maker buyer, maker seller, taker buyer, taker seller
const BOND_TABLE: [(u8, [BondState; 4]); 19] = [
    (0, [H, H, H, H]),
    (1, [L, L, H, H]),
    (2, [L, L, H, H]),
    (3, [L, L, H, H]),
    (4, [H, H, H, H]),
    (5, [H, H, H, H]),
    (6, [L, L, L, L]),
    (7, [L, L, L, L]),
    (8, [L, L, L, L]),
    (9, [L, L, L, L]),
    (10, [L, L, L, L]),
    (11, [S, S, S, S]),
    (12, [H, H, H, H]),
    (13, [U, H, U, H]),
    (14, [H, H, H, H]),
    (15, [U, H, U, H]),
    (16, [S, S, S, S]),
    (17, [S, S, U, U]),
    (18, [U, U, S, S]),
];

const CANCEL_TABLE: [(u8, [Option<CancellationClass>; 4]); 19] = [
    (0, [Some(F), Some(F), None, None]),
    (1, [Some(F), Some(F), None, None]),
    (2, [Some(F), Some(F), None, None]),
    (3, [Some(R), Some(R), Some(F), Some(F)]),
    (4, [None, None, None, None]),
    (5, [None, None, None, None]),
    (6, [Some(R), Some(R), Some(R), Some(R)]),
    (7, [Some(R), Some(R), Some(R), Some(R)]),
    (8, [Some(Co), Some(Co), Some(Co), Some(Co)]),
    (9, [Some(Co), Some(Co), Some(Co), Some(Co)]),
    (10, [None, None, None, None]),
    (11, [None, None, None, None]),
    (12, [None, None, None, None]),
    (13, [None, None, None, None]),
    (14, [None, None, None, None]),
    (15, [None, None, None, None]),
    (16, [None, None, None, None]),
    (17, [None, None, None, None]),
    (18, [None, None, None, None]),
];

#[test]
fn test_bond_state_table() {
    for (code, expected) in BOND_TABLE {
        let status = OrderStatus::try_from(code).unwrap();
        for (role, want) in RoleFlags::all().into_iter().zip(expected) {
            assert_eq!(
                bond_state(status, role),
                want,
                "status {} role {:?}",
                code,
                role
            );
        }
    }
}

#[test]
fn test_cancellation_table() {
    for (code, expected) in CANCEL_TABLE {
        let status = OrderStatus::try_from(code).unwrap();
        for (role, want) in RoleFlags::all().into_iter().zip(expected) {
            assert_eq!(
                cancellation(status, role),
                want,
                "status {} role {:?}",
                code,
                role
            );
        }
    }
}

#[test]
fn test_tables_cover_every_status() {
    let codes: Vec<u8> = OrderStatus::ALL.iter().map(|s| s.code()).collect();
    let bond_codes: Vec<u8> = BOND_TABLE.iter().map(|(code, _)| *code).collect();
    assert_eq!(codes, bond_codes);
    assert!(OrderStatus::try_from(19u8).is_err());
}

#[test]
fn test_renewable_statuses() {
    let renewable: Vec<u8> = OrderStatus::ALL
        .iter()
        .filter(|s| s.renewable())
        .map(|s| s.code())
        .collect();
    assert_eq!(renewable, vec![5, 13, 14, 15]);
}
