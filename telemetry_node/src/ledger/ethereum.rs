//! Reading registry access over Ethereum JSON-RPC using ethers-rs
//!
//! The registry contract exposes `totalReadings()` and `getReading(index)`;
//! both are `view` calls issued as `eth_call` against the latest block.

use super::{LedgerError, LedgerReader, RawRecord};
use async_trait::async_trait;
use ethers::abi::Abi;
use ethers::contract::{Contract, ContractError};
use ethers::providers::{Http, Provider};
use ethers::types::{Address, Bytes, U256};
use log::debug;
use std::convert::TryFrom;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// ABI of the two view functions the reader calls
const READING_REGISTRY_ABI: &str = r#"[
  {
    "type": "function",
    "name": "totalReadings",
    "stateMutability": "view",
    "inputs": [],
    "outputs": [{ "name": "", "type": "uint256" }]
  },
  {
    "type": "function",
    "name": "getReading",
    "stateMutability": "view",
    "inputs": [{ "name": "index", "type": "uint256" }],
    "outputs": [
      {
        "name": "",
        "type": "tuple",
        "components": [
          { "name": "deviceId", "type": "string" },
          { "name": "ciphertext", "type": "bytes" },
          { "name": "nonce", "type": "bytes" },
          { "name": "signature", "type": "bytes" },
          { "name": "timestamp", "type": "uint256" },
          { "name": "blockNumber", "type": "uint256" }
        ]
      }
    ]
  }
]"#;

/// `getReading` return tuple: deviceId, ciphertext, nonce, signature, timestamp, blockNumber
type ReadingTuple = (String, Bytes, Bytes, Bytes, U256, U256);

/// Ledger reader backed by the reading registry contract
pub struct EvmLedgerReader {
    contract: Contract<Provider<Http>>,
    /// Deadline applied to every RPC round trip
    timeout: Duration,
}

impl EvmLedgerReader {
    pub fn new(rpc_url: &str, contract_address: &str, timeout: Duration) -> Result<Self, LedgerError> {
        let provider = Provider::<Http>::try_from(rpc_url)
            .map_err(|e| LedgerError::Unavailable(format!("Failed to create HTTP provider: {}", e)))?;

        let address = contract_address
            .parse::<Address>()
            .map_err(|e| LedgerError::Unavailable(format!("Invalid contract address: {}", e)))?;

        let abi: Abi = serde_json::from_str(READING_REGISTRY_ABI)
            .map_err(|e| LedgerError::Unavailable(format!("Invalid registry ABI: {}", e)))?;

        Ok(Self {
            contract: Contract::new(address, abi, Arc::new(provider)),
            timeout,
        })
    }

    pub fn address(&self) -> Address {
        self.contract.address()
    }

    async fn bounded<T, F>(&self, call: &str, fut: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, ContractError<Provider<Http>>>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(LedgerError::Unavailable(format!("{} call failed: {}", call, e))),
            Err(_) => Err(LedgerError::Unavailable(format!(
                "{} call timed out after {}s",
                call,
                self.timeout.as_secs()
            ))),
        }
    }
}

#[async_trait]
impl LedgerReader for EvmLedgerReader {
    async fn total_count(&self) -> Result<u64, LedgerError> {
        let call = self
            .contract
            .method::<_, U256>("totalReadings", ())
            .map_err(|e| LedgerError::Unavailable(format!("Failed to encode totalReadings: {}", e)))?;

        let total = self.bounded("totalReadings", call.call()).await?;
        u256_to_u64(total, "totalReadings")
    }

    async fn get_record(&self, index: u64) -> Result<RawRecord, LedgerError> {
        let call = self
            .contract
            .method::<_, ReadingTuple>("getReading", U256::from(index))
            .map_err(|e| LedgerError::Unavailable(format!("Failed to encode getReading: {}", e)))?;

        let tuple = self.bounded("getReading", call.call()).await?;
        debug!("Fetched reading {} from {:?}", index, self.address());
        record_from_tuple(tuple)
    }
}

fn record_from_tuple(tuple: ReadingTuple) -> Result<RawRecord, LedgerError> {
    let (device_id, ciphertext, nonce, signature, timestamp, block_number) = tuple;
    Ok(RawRecord {
        device_id,
        ciphertext: ciphertext.to_vec(),
        nonce: nonce.to_vec(),
        signature: signature.to_vec(),
        timestamp: u256_to_u64(timestamp, "timestamp")?,
        block_number: u256_to_u64(block_number, "blockNumber")?,
    })
}

/// Narrow a uint256 the ledger returned; values past u64 are treated as a corrupt response
fn u256_to_u64(value: U256, field: &str) -> Result<u64, LedgerError> {
    if value > U256::from(u64::MAX) {
        return Err(LedgerError::Unavailable(format!(
            "{} value {} does not fit in 64 bits",
            field, value
        )));
    }
    Ok(value.low_u64())
}

#[cfg(test)]
mod tests {
    use super::*;

    const REGISTRY: &str = "0x5FbDB2315678afecb367f032d93F642f64180aa3";

    #[test]
    fn test_abi_declares_both_calls() {
        let abi: Abi = serde_json::from_str(READING_REGISTRY_ABI).unwrap();
        assert!(abi.function("totalReadings").is_ok());

        let get_reading = abi.function("getReading").unwrap();
        assert_eq!(get_reading.inputs.len(), 1);
        assert_eq!(get_reading.outputs.len(), 1);
    }

    #[test]
    fn test_reader_construction() {
        let reader =
            EvmLedgerReader::new("http://127.0.0.1:8545", REGISTRY, Duration::from_secs(5)).unwrap();
        assert_eq!(reader.address(), REGISTRY.parse::<Address>().unwrap());
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        assert!(EvmLedgerReader::new("not a url", REGISTRY, Duration::from_secs(5)).is_err());
        assert!(EvmLedgerReader::new("http://127.0.0.1:8545", "0x1234", Duration::from_secs(5)).is_err());
    }

    #[test]
    fn test_record_from_tuple() {
        let record = record_from_tuple((
            "bae-001".to_string(),
            Bytes::from(vec![1u8, 2, 3]),
            Bytes::from(vec![4u8; 12]),
            Bytes::from(vec![5u8; 32]),
            U256::from(1_700_000_000u64),
            U256::from(42u64),
        ))
        .unwrap();

        assert_eq!(record.device_id, "bae-001");
        assert_eq!(record.ciphertext, vec![1, 2, 3]);
        assert_eq!(record.nonce, vec![4u8; 12]);
        assert_eq!(record.signature, vec![5u8; 32]);
        assert_eq!(record.timestamp, 1_700_000_000);
        assert_eq!(record.block_number, 42);
    }

    #[test]
    fn test_wide_integers_rejected() {
        assert_eq!(u256_to_u64(U256::from(u64::MAX), "x").unwrap(), u64::MAX);
        assert!(u256_to_u64(U256::from(u64::MAX) + U256::from(1u64), "blockNumber").is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_past_deadline_times_out() {
        let reader =
            EvmLedgerReader::new("http://127.0.0.1:8545", REGISTRY, Duration::from_secs(1)).unwrap();

        let stalled = std::future::pending::<Result<U256, ContractError<Provider<Http>>>>();
        match reader.bounded("totalReadings", stalled).await {
            Err(LedgerError::Unavailable(msg)) => {
                assert!(msg.contains("timed out"), "{msg}");
                assert!(msg.starts_with("totalReadings"), "{msg}");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_call_within_deadline_succeeds() {
        let reader =
            EvmLedgerReader::new("http://127.0.0.1:8545", REGISTRY, Duration::from_secs(1)).unwrap();

        let slow = async {
            tokio::time::sleep(Duration::from_millis(900)).await;
            Ok::<_, ContractError<Provider<Http>>>(U256::from(7u64))
        };
        assert_eq!(reader.bounded("totalReadings", slow).await.unwrap(), U256::from(7u64));
    }

    #[tokio::test]
    async fn test_unreachable_node_is_unavailable() {
        // Port 9 (discard) on localhost refuses connections in test environments
        let reader =
            EvmLedgerReader::new("http://127.0.0.1:9", REGISTRY, Duration::from_secs(2)).unwrap();
        let err = reader.total_count().await.unwrap_err();
        assert!(matches!(err, LedgerError::Unavailable(_)));
    }
}
