//! Chain subsystem.
//!
//! # Data Flow
//! ```text
//! TransferRequest (raw CLI strings)
//!     → transaction.rs (parse, build message, state machine)
//!     → params.rs (method id → JSON params)
//!     → wallet.rs (encode params, balance check, sign + push through the node)
//!     → client.rs (typed node methods over the RPC session)
//!     → StateWaitMsg → Receipt
//! ```
//!
//! # Security Constraints
//! - Keys never leave the node; signing is delegated to its wallet
//! - Auth tokens are never logged

pub mod client;
pub mod message;
pub mod params;
pub mod transaction;
pub mod types;
pub mod wallet;

pub use client::{CommonApi, FullNodeApi, StorageMinerApi};
pub use message::{Message, MessageReceipt, MsgLookup, NodeVersion, SignedMessage};
pub use params::{ParamRegistry, ParamStrategy, WithdrawBalance};
pub use transaction::{
    build_message, execute, DispatchState, FailureReason, Receipt, SendError, TransferDispatcher, TransferMessage,
    TransferRequest,
};
pub use types::{Address, Cid, EncodedParams, MethodNum, TokenAmount, ValueError};
pub use wallet::{NodeServices, SubmitError};
