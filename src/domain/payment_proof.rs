use uuid::Uuid;

use crate::domain::models::{PaymentProof, PaymentRequest};
use crate::domain::session_progress::TimestampMs;

const SIGNATURE_HEX_LEN: usize = 130;

/// `0x` followed by `hex_len` pseudo-random hex digits.
pub fn random_hex(hex_len: usize) -> String {
    let mut hex = String::with_capacity(hex_len + 2);
    hex.push_str("0x");
    while hex.len() < hex_len + 2 {
        hex.push_str(&Uuid::new_v4().simple().to_string());
    }
    hex.truncate(hex_len + 2);
    hex
}

pub fn random_tx_hash() -> String {
    random_hex(64)
}

/// Builds the placeholder proof the client posts for a payment request.
/// Nothing here is signed; the values only have the right shape.
pub fn fabricate_proof(request: &PaymentRequest, now: TimestampMs) -> PaymentProof {
    PaymentProof {
        signature: random_hex(SIGNATURE_HEX_LEN),
        tx_hash: random_tx_hash(),
        amount: request.amount,
        currency: request.currency.clone(),
        recipient: request.recipient_address.clone(),
        chain: request.chain.clone(),
        timestamp: now.unix_seconds(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SimulatedVerification {
    Verified { tx_hash: String },
    Rejected { reason: String },
}

/// Stand-in for the payment SDK: any proof that carries a signature passes.
pub fn verify_simulated(proof: &PaymentProof) -> SimulatedVerification {
    if proof.signature.trim().is_empty() {
        return SimulatedVerification::Rejected {
            reason: "payment proof is missing a signature".to_string(),
        };
    }

    let tx_hash = if proof.tx_hash.trim().is_empty() {
        random_tx_hash()
    } else {
        proof.tx_hash.clone()
    };

    SimulatedVerification::Verified { tx_hash }
}
