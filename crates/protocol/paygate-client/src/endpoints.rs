//! Gateway endpoint paths, relative to the gateway URL.
//!
//! Every business endpoint takes a signed `ClientRequest` via POST and answers
//! with a signed `ServerResponse`. Use them with
//! [`GatewayClient::call`](crate::GatewayClient::call).

pub const AUTHORIZE: &str = "Auth";
pub const ISSUERS: &str = "Issuer";

pub const COMMERCES: &str = "Commerce";
pub const COMMERCE_ADD: &str = "Commerce/Add";
pub const COMMERCE_MODIFY: &str = "Commerce/Modify";
pub const COMMERCE_DELETE: &str = "Commerce/Delete";
pub const COMMERCE_SET_DEFAULT: &str = "Commerce/SetDefault";
pub const COMMERCE_ISSUERS: &str = "Commerce/Issuer";
pub const COMMERCE_ISSUER_ADD: &str = "Commerce/Issuer/Add";
pub const COMMERCE_ISSUER_DELETE: &str = "Commerce/Issuer/Delete";

pub const TRANSACTIONS: &str = "Transactions";
pub const TRANSACTIONS_CSV: &str = "Transactions/CSV";
pub const CODE: &str = "Code";

pub const PURCHASE: &str = "Operation/Purchase";
pub const CANCEL: &str = "Operation/Cancel";
pub const REFUND: &str = "Operation/Refund";
pub const START_RESERVE: &str = "Operation/StartReserve";
pub const END_RESERVE: &str = "Operation/EndReserve";
pub const STATUS: &str = "Operation/Status";

pub const INSTRUMENTS: &str = "Instruments";
pub const INSTRUMENTS_DELETE: &str = "Instruments/Delete";
pub const INSTRUMENTS_BANK: &str = "Instruments/Bank";

pub const EXPRESS_CHECKOUT: &str = "ExpressCheckout";

/// Key lookup prefix; the fingerprint is appended as the last segment (GET).
pub const KEY: &str = "Key";

/// Path of the key lookup for `fingerprint`.
pub fn key_path(fingerprint: &str) -> String {
    format!("{KEY}/{fingerprint}")
}
