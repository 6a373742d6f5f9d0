//! Order lifecycle as seen from one participant
//!
//! The coordinator owns every transition. The client only interprets the
//! current [`OrderStatus`] together with the robot's [`RoleFlags`] to decide
//! what to show (bond state, polling cadence) and which actions to offer
//! (cancel, chat, renew).

mod bond;
mod cancel;
mod renewal;
mod status;

pub use bond::{bond_state, BondState, RoleFlags};
pub use cancel::{cancellation, CancellationClass, CollaborativeCancel};
pub use renewal::{GetOrderRequest, OrderDetails, OrderRequest};
pub use status::OrderStatus;

#[derive(Debug, thiserror::Error)]
pub enum OrderError {
    #[error("unknown order status: {0}")]
    UnknownStatus(i64),
    #[error("order in status {0} cannot be renewed")]
    NotRenewable(OrderStatus),
    #[error("only the maker can renew an order")]
    NotMaker,
    #[error("order in status {0} cannot be cancelled collaboratively")]
    CancelNotAllowed(OrderStatus),
}
