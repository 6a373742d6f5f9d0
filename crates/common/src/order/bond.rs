use serde::{Deserialize, Serialize};

use super::OrderStatus;

/// Which side of the order the local robot is on.
///
/// The coordinator reports all four flags on every order; a robot that is
/// merely browsing someone else's order has both `is_maker` and `is_taker`
/// unset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct RoleFlags {
    pub is_maker: bool,
    pub is_taker: bool,
    pub is_buyer: bool,
    pub is_seller: bool,
}

impl RoleFlags {
    pub fn new(is_maker: bool, is_buyer: bool) -> Self {
        Self {
            is_maker,
            is_taker: !is_maker,
            is_buyer,
            is_seller: !is_buyer,
        }
    }

    pub fn maker_buyer() -> Self {
        Self::new(true, true)
    }

    pub fn maker_seller() -> Self {
        Self::new(true, false)
    }

    pub fn taker_buyer() -> Self {
        Self::new(false, true)
    }

    pub fn taker_seller() -> Self {
        Self::new(false, false)
    }

    /// The four roles a participant can hold
    pub fn all() -> [RoleFlags; 4] {
        [
            Self::maker_buyer(),
            Self::maker_seller(),
            Self::taker_buyer(),
            Self::taker_seller(),
        ]
    }
}

/// What the client shows about the robot's fidelity bond
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BondState {
    /// No bond to talk about
    Hidden,
    /// Bond hold invoice is locked
    Locked,
    /// Bond was charged
    Settled,
    /// Bond was returned
    Unlocked,
}

/// Bond state for a robot with `role` looking at an order in `status`
pub fn bond_state(status: OrderStatus, role: RoleFlags) -> BondState {
    use BondState::*;
    use OrderStatus::*;

    match status {
        WaitingForMakerBond => Hidden,
        Public | Paused | WaitingForTakerBond => {
            if role.is_maker {
                Locked
            } else {
                Hidden
            }
        }
        Cancelled | Expired => Hidden,
        WaitingForCollateralAndInvoice | WaitingForCollateral | WaitingForInvoice => Locked,
        SendingFiat | FiatSent => Locked,
        InDispute => Settled,
        CollaborativelyCancelled => Hidden,
        SendingSats | RoutingFailed => {
            if role.is_buyer {
                Unlocked
            } else {
                Hidden
            }
        }
        Successful => Hidden,
        WaitingForDisputeResolution => Settled,
        MakerLostDispute => {
            if role.is_maker {
                Settled
            } else {
                Unlocked
            }
        }
        TakerLostDispute => {
            if role.is_maker {
                Unlocked
            } else {
                Settled
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_role_constructors() {
        let role = RoleFlags::taker_seller();
        assert!(role.is_taker && role.is_seller);
        assert!(!role.is_maker && !role.is_buyer);
    }

    #[test]
    fn test_chatroom_bonds_locked() {
        for role in RoleFlags::all() {
            assert_eq!(bond_state(OrderStatus::SendingFiat, role), BondState::Locked);
            assert_eq!(bond_state(OrderStatus::FiatSent, role), BondState::Locked);
        }
    }

    #[test]
    fn test_browsing_robot_sees_no_bond() {
        let observer = RoleFlags::default();
        assert_eq!(bond_state(OrderStatus::Public, observer), BondState::Hidden);
    }
}
