//! # Typed Requests
//!
//! One builder per operation a page may ask the wallet for. Each returns the
//! concrete envelope type and payload sent to the background.

use shared_types::{keys, ContractAddress, DomainValue, MessageType};

/// A request ready to be sent to the background.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundRequest {
    pub message_type: MessageType,
    pub payload: Option<DomainValue>,
}

/// A transaction for the wallet to build, sign and submit.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// Transaction type, e.g. `"Transfer"` or `"Update"`.
    pub kind: String,
    /// Type-specific fields.
    pub payload: DomainValue,
    /// Smart contract parameters, if any.
    pub parameters: Option<DomainValue>,
}

impl Transaction {
    pub fn new(kind: impl Into<String>, payload: DomainValue) -> Self {
        Self {
            kind: kind.into(),
            payload,
            parameters: None,
        }
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: DomainValue) -> Self {
        self.parameters = Some(parameters);
        self
    }
}

/// Ask for access to the selected account.
#[must_use]
pub fn connect() -> OutboundRequest {
    OutboundRequest {
        message_type: MessageType::Connect,
        payload: None,
    }
}

/// Ask for the selected account without prompting.
#[must_use]
pub fn get_most_recently_selected_account() -> OutboundRequest {
    OutboundRequest {
        message_type: MessageType::GetMostRecentlySelectedAccount,
        payload: None,
    }
}

#[must_use]
pub fn send_transaction(account: &str, transaction: Transaction) -> OutboundRequest {
    let mut fields = vec![
        (keys::ACCOUNT_ADDRESS, DomainValue::from(account)),
        (keys::TRANSACTION_TYPE, DomainValue::from(transaction.kind)),
        (keys::TRANSACTION, transaction.payload),
    ];
    if let Some(parameters) = transaction.parameters {
        fields.push((keys::PARAMETERS, parameters));
    }
    OutboundRequest {
        message_type: MessageType::SendTransaction,
        payload: Some(DomainValue::object(fields)),
    }
}

/// Ask the wallet to sign `message` with `account`.
#[must_use]
pub fn sign_message(account: &str, message: DomainValue) -> OutboundRequest {
    OutboundRequest {
        message_type: MessageType::SignMessage,
        payload: Some(DomainValue::object([
            (keys::ACCOUNT_ADDRESS, DomainValue::from(account)),
            (keys::MESSAGE, message),
        ])),
    }
}

/// Ask the wallet to track CIS-2 tokens of a contract.
#[must_use]
pub fn add_cis2_tokens(
    account: &str,
    contract: ContractAddress,
    token_ids: Vec<String>,
) -> OutboundRequest {
    OutboundRequest {
        message_type: MessageType::AddCis2Tokens,
        payload: Some(DomainValue::object([
            (keys::ACCOUNT_ADDRESS, DomainValue::from(account)),
            (keys::CONTRACT_ADDRESS, DomainValue::from(contract)),
            (keys::TOKEN_IDS, DomainValue::from(token_ids)),
        ])),
    }
}
