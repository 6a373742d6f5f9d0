use serde::{Deserialize, Serialize};

use super::{OrderError, OrderStatus, RoleFlags};

/// What cancelling an order right now would cost
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancellationClass {
    /// Nothing at stake yet
    Free,
    /// Our bond is locked and cancelling alone forfeits it
    UnilateralWithRisk,
    /// Trade collateral is locked, both robots have to agree
    Collaborative,
}

/// How the local robot may cancel, or `None` if it cannot cancel at all
pub fn cancellation(status: OrderStatus, role: RoleFlags) -> Option<CancellationClass> {
    use OrderStatus::*;

    match status {
        WaitingForMakerBond | Public | Paused if role.is_maker => Some(CancellationClass::Free),
        WaitingForTakerBond if role.is_taker => Some(CancellationClass::Free),
        WaitingForTakerBond | WaitingForCollateralAndInvoice | WaitingForCollateral => {
            Some(CancellationClass::UnilateralWithRisk)
        }
        WaitingForInvoice | SendingFiat => Some(CancellationClass::Collaborative),
        _ => None,
    }
}

/// Collaborative cancel handshake.
///
/// Either robot may ask first; the order is cancelled once the other one
/// asks as well. Requests are idempotent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollaborativeCancel {
    #[default]
    NotRequested,
    RequestedByMe,
    RequestedByPeer,
    Agreed,
}

impl CollaborativeCancel {
    /// Rebuild the handshake from the coordinator's order flags.
    ///
    /// `asked_for_cancel` is set once we asked, `pending_cancel` once the
    /// peer did.
    pub fn from_flags(asked_for_cancel: bool, pending_cancel: bool) -> Self {
        match (asked_for_cancel, pending_cancel) {
            (false, false) => CollaborativeCancel::NotRequested,
            (true, false) => CollaborativeCancel::RequestedByMe,
            (false, true) => CollaborativeCancel::RequestedByPeer,
            (true, true) => CollaborativeCancel::Agreed,
        }
    }

    /// We ask to cancel
    pub fn request(self, status: OrderStatus, role: RoleFlags) -> Result<Self, OrderError> {
        if cancellation(status, role) != Some(CancellationClass::Collaborative) {
            return Err(OrderError::CancelNotAllowed(status));
        }
        Ok(match self {
            CollaborativeCancel::NotRequested => CollaborativeCancel::RequestedByMe,
            CollaborativeCancel::RequestedByPeer => CollaborativeCancel::Agreed,
            other => other,
        })
    }

    /// The peer asked to cancel
    pub fn peer_requested(self) -> Self {
        match self {
            CollaborativeCancel::NotRequested => CollaborativeCancel::RequestedByPeer,
            CollaborativeCancel::RequestedByMe => CollaborativeCancel::Agreed,
            other => other,
        }
    }

    /// Whether a "collaborative cancel" action should still be offered
    pub fn can_request(self) -> bool {
        matches!(
            self,
            CollaborativeCancel::NotRequested | CollaborativeCancel::RequestedByPeer
        )
    }

    pub fn is_agreed(self) -> bool {
        self == CollaborativeCancel::Agreed
    }

    /// The peer asked and we have not answered yet
    pub fn is_peer_requested(self) -> bool {
        self == CollaborativeCancel::RequestedByPeer
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_maker_cancels_public_order_for_free() {
        assert_eq!(
            cancellation(OrderStatus::Public, RoleFlags::maker_seller()),
            Some(CancellationClass::Free)
        );
        assert_eq!(cancellation(OrderStatus::Public, RoleFlags::taker_buyer()), None);
    }

    #[test]
    fn test_taker_bond_wait() {
        let status = OrderStatus::WaitingForTakerBond;
        assert_eq!(
            cancellation(status, RoleFlags::taker_buyer()),
            Some(CancellationClass::Free)
        );
        assert_eq!(
            cancellation(status, RoleFlags::maker_buyer()),
            Some(CancellationClass::UnilateralWithRisk)
        );
    }

    #[test]
    fn test_collateral_locked_needs_both() {
        for role in RoleFlags::all() {
            assert_eq!(
                cancellation(OrderStatus::SendingFiat, role),
                Some(CancellationClass::Collaborative)
            );
            assert_eq!(cancellation(OrderStatus::Successful, role), None);
        }
    }

    #[test]
    fn test_handshake() {
        let status = OrderStatus::SendingFiat;
        let role = RoleFlags::maker_buyer();

        let state = CollaborativeCancel::default().request(status, role).unwrap();
        assert_eq!(state, CollaborativeCancel::RequestedByMe);
        assert!(!state.can_request());
        // asking twice changes nothing
        assert_eq!(state.request(status, role).unwrap(), state);
        assert!(state.peer_requested().is_agreed());

        let state = CollaborativeCancel::default().peer_requested();
        assert_eq!(state, CollaborativeCancel::RequestedByPeer);
        assert!(state.can_request());
        assert!(state.request(status, role).unwrap().is_agreed());
    }

    #[test]
    fn test_handshake_rejected_outside_chat() {
        let result = CollaborativeCancel::default()
            .request(OrderStatus::Public, RoleFlags::maker_buyer());
        assert!(matches!(result, Err(OrderError::CancelNotAllowed(_))));
    }

    #[test]
    fn test_from_flags() {
        assert_eq!(
            CollaborativeCancel::from_flags(false, true),
            CollaborativeCancel::RequestedByPeer
        );
        assert!(CollaborativeCancel::from_flags(true, true).is_agreed());
    }

    #[test]
    fn test_peer_requested_predicate() {
        assert!(CollaborativeCancel::from_flags(false, true).is_peer_requested());
        assert!(!CollaborativeCancel::from_flags(true, true).is_peer_requested());
        assert!(!CollaborativeCancel::from_flags(true, false).is_peer_requested());
        assert!(!CollaborativeCancel::default().is_peer_requested());
    }
}
