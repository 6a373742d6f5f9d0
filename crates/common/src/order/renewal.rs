use reqwest::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::api::{ApiError, ApiRequest};

use super::{
    bond_state, cancellation, BondState, CancellationClass, CollaborativeCancel, OrderError,
    OrderStatus, RoleFlags,
};

/// Order as the coordinator reports it to one of its participants.
///
/// Decimal amounts stay strings, the coordinator formats them and we only
/// ever hand them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderDetails {
    pub id: u64,
    pub status: OrderStatus,
    #[serde(rename = "type")]
    pub order_type: u8,
    pub currency: u32,
    #[serde(default)]
    pub amount: Option<String>,
    #[serde(default)]
    pub has_range: bool,
    #[serde(default)]
    pub min_amount: Option<String>,
    #[serde(default)]
    pub max_amount: Option<String>,
    pub payment_method: String,
    #[serde(default)]
    pub premium: Option<String>,
    pub public_duration: u64,
    pub escrow_duration: u64,
    pub bond_size: String,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub is_maker: bool,
    #[serde(default)]
    pub is_taker: bool,
    #[serde(default)]
    pub is_buyer: bool,
    #[serde(default)]
    pub is_seller: bool,
    #[serde(default)]
    pub asked_for_cancel: bool,
    #[serde(default)]
    pub pending_cancel: bool,
}

impl OrderDetails {
    pub fn role(&self) -> RoleFlags {
        RoleFlags {
            is_maker: self.is_maker,
            is_taker: self.is_taker,
            is_buyer: self.is_buyer,
            is_seller: self.is_seller,
        }
    }

    pub fn bond_state(&self) -> BondState {
        bond_state(self.status, self.role())
    }

    pub fn cancellation(&self) -> Option<CancellationClass> {
        cancellation(self.status, self.role())
    }

    pub fn collaborative_cancel(&self) -> CollaborativeCancel {
        CollaborativeCancel::from_flags(self.asked_for_cancel, self.pending_cancel)
    }

    pub fn chat_permitted(&self) -> bool {
        self.status.chat_permitted()
    }

    /// Copy the economic parameters into a fresh order request.
    ///
    /// Nothing about this order changes; the coordinator treats the result
    /// as a brand new order.
    pub fn renewal(&self) -> Result<OrderRequest, OrderError> {
        if !self.status.renewable() {
            return Err(OrderError::NotRenewable(self.status));
        }
        if !self.is_maker {
            return Err(OrderError::NotMaker);
        }
        Ok(OrderRequest {
            order_type: self.order_type,
            currency: self.currency,
            amount: if self.has_range {
                None
            } else {
                self.amount.clone()
            },
            has_range: self.has_range,
            min_amount: self.min_amount.clone(),
            max_amount: self.max_amount.clone(),
            payment_method: self.payment_method.clone(),
            premium: self.premium.clone(),
            public_duration: self.public_duration,
            escrow_duration: self.escrow_duration,
            bond_size: self.bond_size.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
        })
    }
}

/// Parameters of a new maker order, `POST /api/make/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    #[serde(rename = "type")]
    pub order_type: u8,
    pub currency: u32,
    pub amount: Option<String>,
    pub has_range: bool,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
    pub payment_method: String,
    pub premium: Option<String>,
    pub public_duration: u64,
    pub escrow_duration: u64,
    pub bond_size: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ApiRequest for OrderRequest {
    type Response = OrderDetails;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("api/make/")?;
        Ok(client.post(full_url).json(&self))
    }
}

/// `GET /api/order/?order_id=`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GetOrderRequest {
    pub order_id: u64,
}

impl ApiRequest for GetOrderRequest {
    type Response = OrderDetails;

    fn build_request(self, base_url: &Url, client: &Client) -> Result<RequestBuilder, ApiError> {
        let full_url = base_url.join("api/order/")?;
        Ok(client.get(full_url).query(&self))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn details(status: u8) -> OrderDetails {
        serde_json::from_value(serde_json::json!({
            "id": 7,
            "status": status,
            "type": 1,
            "currency": 2,
            "amount": "150.00000000",
            "has_range": false,
            "payment_method": "SEPA",
            "premium": "1.50",
            "public_duration": 86340,
            "escrow_duration": 10800,
            "bond_size": "3.00",
            "latitude": null,
            "longitude": null,
            "is_maker": true,
            "is_taker": false,
            "is_buyer": false,
            "is_seller": true
        }))
        .unwrap()
    }

    #[test]
    fn test_renewal_copies_parameters() {
        let order = details(5);
        let request = order.renewal().unwrap();
        assert_eq!(request.order_type, 1);
        assert_eq!(request.currency, 2);
        assert_eq!(request.amount.as_deref(), Some("150.00000000"));
        assert_eq!(request.payment_method, "SEPA");
        assert_eq!(request.premium.as_deref(), Some("1.50"));
        assert_eq!(request.public_duration, 86340);
        assert_eq!(request.escrow_duration, 10800);
        assert_eq!(request.bond_size, "3.00");
        // the old order is untouched
        assert_eq!(order.status, OrderStatus::Expired);
    }

    #[test]
    fn test_renewal_rejected() {
        assert!(matches!(
            details(9).renewal(),
            Err(OrderError::NotRenewable(OrderStatus::SendingFiat))
        ));

        let mut order = details(14);
        order.is_maker = false;
        order.is_taker = true;
        assert!(matches!(order.renewal(), Err(OrderError::NotMaker)));
    }

    #[test]
    fn test_range_order_drops_amount() {
        let mut order = details(14);
        order.has_range = true;
        order.min_amount = Some("100".into());
        order.max_amount = Some("500".into());
        let request = order.renewal().unwrap();
        assert!(request.amount.is_none());
        assert_eq!(request.min_amount.as_deref(), Some("100"));
    }

    #[test]
    fn test_derived_views() {
        let order = details(9);
        assert_eq!(order.role(), RoleFlags::maker_seller());
        assert_eq!(order.bond_state(), BondState::Locked);
        assert!(order.chat_permitted());
        assert_eq!(order.collaborative_cancel(), CollaborativeCancel::NotRequested);
    }

    #[test]
    fn test_make_request() {
        let base = Url::parse("http://coordinator.onion").unwrap();
        let request = details(5)
            .renewal()
            .unwrap()
            .build_request(&base, &Client::new())
            .unwrap()
            .build()
            .unwrap();
        assert_eq!(request.method(), reqwest::Method::POST);
        assert_eq!(request.url().path(), "/api/make/");
    }
}
