use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::OrderError;

/// Order status as reported by the coordinator.
///
/// The coordinator sends a bare integer; anything outside `0..=18` is
/// rejected at the boundary by [`TryFrom<u8>`] so the rest of the client
/// can match exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
#[repr(u8)]
pub enum OrderStatus {
    WaitingForMakerBond = 0,
    Public = 1,
    Paused = 2,
    WaitingForTakerBond = 3,
    Cancelled = 4,
    Expired = 5,
    WaitingForCollateralAndInvoice = 6,
    WaitingForCollateral = 7,
    WaitingForInvoice = 8,
    SendingFiat = 9,
    FiatSent = 10,
    InDispute = 11,
    CollaborativelyCancelled = 12,
    SendingSats = 13,
    Successful = 14,
    RoutingFailed = 15,
    WaitingForDisputeResolution = 16,
    MakerLostDispute = 17,
    TakerLostDispute = 18,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 19] = [
        OrderStatus::WaitingForMakerBond,
        OrderStatus::Public,
        OrderStatus::Paused,
        OrderStatus::WaitingForTakerBond,
        OrderStatus::Cancelled,
        OrderStatus::Expired,
        OrderStatus::WaitingForCollateralAndInvoice,
        OrderStatus::WaitingForCollateral,
        OrderStatus::WaitingForInvoice,
        OrderStatus::SendingFiat,
        OrderStatus::FiatSent,
        OrderStatus::InDispute,
        OrderStatus::CollaborativelyCancelled,
        OrderStatus::SendingSats,
        OrderStatus::Successful,
        OrderStatus::RoutingFailed,
        OrderStatus::WaitingForDisputeResolution,
        OrderStatus::MakerLostDispute,
        OrderStatus::TakerLostDispute,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    /// Human readable description, as the coordinator labels it
    pub fn description(self) -> &'static str {
        match self {
            OrderStatus::WaitingForMakerBond => "Waiting for maker bond",
            OrderStatus::Public => "Public",
            OrderStatus::Paused => "Paused",
            OrderStatus::WaitingForTakerBond => "Waiting for taker bond",
            OrderStatus::Cancelled => "Cancelled",
            OrderStatus::Expired => "Expired",
            OrderStatus::WaitingForCollateralAndInvoice => {
                "Waiting for trade collateral and buyer invoice"
            }
            OrderStatus::WaitingForCollateral => "Waiting only for seller trade collateral",
            OrderStatus::WaitingForInvoice => "Waiting only for buyer invoice",
            OrderStatus::SendingFiat => "Sending fiat - In chatroom",
            OrderStatus::FiatSent => "Fiat sent - In chatroom",
            OrderStatus::InDispute => "In dispute",
            OrderStatus::CollaborativelyCancelled => "Collaboratively cancelled",
            OrderStatus::SendingSats => "Sending satoshis to buyer",
            OrderStatus::Successful => "Successful trade",
            OrderStatus::RoutingFailed => "Failed lightning network routing",
            OrderStatus::WaitingForDisputeResolution => "Wait for dispute resolution",
            OrderStatus::MakerLostDispute => "Maker lost dispute",
            OrderStatus::TakerLostDispute => "Taker lost dispute",
        }
    }

    /// How long to wait before polling the coordinator again.
    ///
    /// Short while someone is expected to pay a bond, long for states that
    /// only change through a human (disputes) or never change again.
    pub fn refresh_delay(self) -> Duration {
        let millis = match self {
            OrderStatus::WaitingForMakerBond => 3_000,
            OrderStatus::Public => 35_000,
            OrderStatus::Paused => 180_000,
            OrderStatus::WaitingForTakerBond => 3_000,
            OrderStatus::Cancelled => 999_999,
            OrderStatus::Expired => 999_999,
            OrderStatus::WaitingForCollateralAndInvoice => 8_000,
            OrderStatus::WaitingForCollateral => 8_000,
            OrderStatus::WaitingForInvoice => 8_000,
            OrderStatus::SendingFiat => 10_000,
            OrderStatus::FiatSent => 10_000,
            OrderStatus::InDispute => 100_000,
            OrderStatus::CollaborativelyCancelled => 999_999,
            OrderStatus::SendingSats => 10_000,
            OrderStatus::Successful => 60_000,
            OrderStatus::RoutingFailed => 30_000,
            OrderStatus::WaitingForDisputeResolution => 300_000,
            OrderStatus::MakerLostDispute => 300_000,
            OrderStatus::TakerLostDispute => 300_000,
        };
        Duration::from_millis(millis)
    }

    /// Chat and attachments are only allowed in the two chatroom states
    pub fn chat_permitted(self) -> bool {
        matches!(self, OrderStatus::SendingFiat | OrderStatus::FiatSent)
    }

    /// Whether the coordinator exposes renewal data for this status
    pub fn renewable(self) -> bool {
        matches!(
            self,
            OrderStatus::Expired
                | OrderStatus::SendingSats
                | OrderStatus::Successful
                | OrderStatus::RoutingFailed
        )
    }

    /// No further transitions are expected
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Cancelled
                | OrderStatus::Expired
                | OrderStatus::CollaborativelyCancelled
                | OrderStatus::Successful
                | OrderStatus::MakerLostDispute
                | OrderStatus::TakerLostDispute
        )
    }
}

impl TryFrom<u8> for OrderStatus {
    type Error = OrderError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        OrderStatus::ALL
            .get(code as usize)
            .copied()
            .ok_or(OrderError::UnknownStatus(code as i64))
    }
}

impl TryFrom<i64> for OrderStatus {
    type Error = OrderError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        u8::try_from(code)
            .map_err(|_| OrderError::UnknownStatus(code))
            .and_then(OrderStatus::try_from)
    }
}

impl From<OrderStatus> for u8 {
    fn from(status: OrderStatus) -> Self {
        status.code()
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.description(), self.code())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for (code, status) in OrderStatus::ALL.iter().enumerate() {
            assert_eq!(status.code() as usize, code);
            assert_eq!(OrderStatus::try_from(code as u8).unwrap(), *status);
        }
    }

    #[test]
    fn test_unknown_status() {
        assert!(matches!(
            OrderStatus::try_from(19u8),
            Err(OrderError::UnknownStatus(19))
        ));
        assert!(matches!(
            OrderStatus::try_from(-1i64),
            Err(OrderError::UnknownStatus(-1))
        ));
    }

    #[test]
    fn test_serde_as_integer() {
        let status: OrderStatus = serde_json::from_str("9").unwrap();
        assert_eq!(status, OrderStatus::SendingFiat);
        assert_eq!(serde_json::to_string(&status).unwrap(), "9");
        assert!(serde_json::from_str::<OrderStatus>("42").is_err());
    }

    #[test]
    fn test_chat_permitted() {
        let permitted: Vec<u8> = OrderStatus::ALL
            .iter()
            .filter(|s| s.chat_permitted())
            .map(|s| s.code())
            .collect();
        assert_eq!(permitted, vec![9, 10]);
    }

    #[test]
    fn test_refresh_delay() {
        assert_eq!(
            OrderStatus::WaitingForMakerBond.refresh_delay(),
            Duration::from_secs(3)
        );
        assert_eq!(OrderStatus::SendingFiat.refresh_delay(), Duration::from_secs(10));
        assert_eq!(OrderStatus::InDispute.refresh_delay(), Duration::from_secs(100));
    }
}
