//! Payload field names shared by the provider, background and popup.

/// Origin of the requesting page, added by the background when forwarding.
pub const ORIGIN: &str = "origin";

/// Account a request acts for.
pub const ACCOUNT_ADDRESS: &str = "accountAddress";

/// The dApp's original payload, nested when the background forwards it.
pub const REQUEST: &str = "request";

/// Transaction kind of a `SendTransaction` request.
pub const TRANSACTION_TYPE: &str = "type";

/// Transaction body of a `SendTransaction` request.
pub const TRANSACTION: &str = "payload";

/// Optional smart contract parameters of a transaction.
pub const PARAMETERS: &str = "parameters";

/// Message to sign.
pub const MESSAGE: &str = "message";

/// Contract of an `AddCis2Tokens` request.
pub const CONTRACT_ADDRESS: &str = "contractAddress";

/// Token ids of an `AddCis2Tokens` request.
pub const TOKEN_IDS: &str = "tokenIds";
