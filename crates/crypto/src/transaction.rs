use crate::ecdsa::{KeyError, KeyPair};
use gas_common::types::{Address, TxHash, Wei};
use rlp::RlpStream;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TxError {
    #[error("Signing failed: {0}")]
    Signing(#[from] KeyError),
    #[error("Chain id {0} does not fit an EIP-155 v value")]
    ChainIdOverflow(u64),
}

/// Pre-EIP-2718 transaction carrying a native value transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: Wei,
    pub data: Vec<u8>,
    pub chain_id: u64,
}

/// RLP-encoded signed transaction ready for `eth_sendRawTransaction`
#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw: Vec<u8>,
    pub hash: TxHash,
    pub v: u64,
    pub r: [u8; 32],
    pub s: [u8; 32],
}

impl SignedTransaction {
    pub fn raw_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.raw))
    }
}

impl LegacyTransaction {
    /// Plain value transfer with empty calldata.
    pub fn transfer(
        nonce: u64,
        gas_price: u128,
        gas_limit: u64,
        to: Address,
        value: Wei,
        chain_id: u64,
    ) -> Self {
        Self {
            nonce,
            gas_price,
            gas_limit,
            to,
            value,
            data: Vec::new(),
            chain_id,
        }
    }

    fn append_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        append_uint(stream, self.gas_price);
        stream.append(&self.gas_limit);
        stream.append(&self.to.0.to_vec());
        append_uint(stream, self.value.0);
        stream.append(&self.data);
    }

    /// EIP-155 signing payload: the six body fields followed by `(chain_id, 0, 0)`.
    pub fn signing_payload(&self) -> Vec<u8> {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        stream.out().to_vec()
    }

    pub fn signing_hash(&self) -> [u8; 32] {
        keccak_hash::keccak(self.signing_payload()).0
    }

    pub fn sign(&self, key: &KeyPair) -> Result<SignedTransaction, TxError> {
        let (signature, recovery_id) = key.sign_prehash(&self.signing_hash())?;

        let v = self
            .chain_id
            .checked_mul(2)
            .and_then(|c| c.checked_add(35 + recovery_id.to_byte() as u64))
            .ok_or(TxError::ChainIdOverflow(self.chain_id))?;

        let r: [u8; 32] = signature.r().to_bytes().into();
        let s: [u8; 32] = signature.s().to_bytes().into();

        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&v);
        stream.append(&trim_leading_zeros(&r).to_vec());
        stream.append(&trim_leading_zeros(&s).to_vec());
        let raw = stream.out().to_vec();

        let hash = TxHash(keccak_hash::keccak(&raw).0);
        tracing::debug!(nonce = self.nonce, chain_id = self.chain_id, %hash, "signed legacy transfer");

        Ok(SignedTransaction { raw, hash, v, r, s })
    }
}

/// RLP integers are big-endian with no leading zero bytes; zero is the empty string.
fn append_uint(stream: &mut RlpStream, value: u128) {
    stream.append(&trim_leading_zeros(&value.to_be_bytes()).to_vec());
}

fn trim_leading_zeros(bytes: &[u8]) -> &[u8] {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    &bytes[start..]
}
