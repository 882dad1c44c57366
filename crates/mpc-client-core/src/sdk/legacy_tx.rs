//! EIP-155 legacy transfer encoding used by the local wallet

use alloy_primitives::{Address, Bytes, U256};
use alloy_rlp::Encodable;
use tiny_keccak::{Hasher, Keccak};

/// Gas limit of a plain value transfer
pub(crate) const TRANSFER_GAS: u64 = 21_000;

/// Recoverable ECDSA signature (r, s, recovery id)
#[derive(Debug, Clone, Copy)]
pub(crate) struct RecoverableSignature {
    pub r: [u8; 32],
    pub s: [u8; 32],
    pub recovery_id: u8,
}

/// Legacy transaction for a native transfer
#[derive(Debug, Clone)]
pub(crate) struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

impl LegacyTransaction {
    /// Plain transfer with no calldata
    pub fn transfer(nonce: u64, gas_price: u128, to: Address, value: U256) -> Self {
        Self {
            nonce,
            gas_price,
            gas_limit: TRANSFER_GAS,
            to,
            value,
            data: Bytes::new(),
        }
    }

    /// Signing hash: keccak(rlp([nonce, gasprice, gas, to, value, data, chainId, 0, 0]))
    pub fn signing_hash(&self, chain_id: u64) -> [u8; 32] {
        let mut stream = Vec::new();

        alloy_rlp::Header {
            list: true,
            payload_length: self.rlp_payload_length()
                + chain_id.length()
                + 0u8.length()
                + 0u8.length(),
        }
        .encode(&mut stream);

        self.encode_fields(&mut stream);
        chain_id.encode(&mut stream);
        0u8.encode(&mut stream);
        0u8.encode(&mut stream);

        keccak256(&stream)
    }

    /// Encode the transaction with its signature, v = recovery_id + 35 + chain_id * 2
    pub fn encode_signed(&self, signature: &RecoverableSignature, chain_id: u64) -> Vec<u8> {
        let v = signature.recovery_id as u64 + 35 + chain_id * 2;
        let r = U256::from_be_slice(&signature.r);
        let s = U256::from_be_slice(&signature.s);

        let mut stream = Vec::new();

        alloy_rlp::Header {
            list: true,
            payload_length: self.rlp_payload_length() + v.length() + r.length() + s.length(),
        }
        .encode(&mut stream);

        self.encode_fields(&mut stream);
        v.encode(&mut stream);
        r.encode(&mut stream);
        s.encode(&mut stream);

        stream
    }

    fn encode_fields(&self, out: &mut dyn alloy_rlp::BufMut) {
        self.nonce.encode(out);
        self.gas_price.encode(out);
        self.gas_limit.encode(out);
        self.to.encode(out);
        self.value.encode(out);
        self.data.encode(out);
    }

    fn rlp_payload_length(&self) -> usize {
        self.nonce.length()
            + self.gas_price.length()
            + self.gas_limit.length()
            + self.to.length()
            + self.value.length()
            + self.data.length()
    }
}

/// Compute Keccak256 hash of data
pub(crate) fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);
    hash
}
