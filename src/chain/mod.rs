use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use ethers::{
    providers::{JsonRpcClient, Middleware, Provider},
    types::{Address, Filter, Log, H256},
};
use log::{debug, error, info, warn};
use std::sync::Arc;

use crate::abi::transfer_topic;

pub mod seaport;

use seaport::OrderFulfilled;

/// How many sales are kept per collection.
pub const TOP_SALES: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct SaleRecord {
    pub token_id: String,
    /// In ether.
    pub price: f64,
    pub transaction_hash: H256,
}

/// Highest prices first, at most `n` of them. Equal prices keep their order.
pub fn rank_sales(mut sales: Vec<SaleRecord>, n: usize) -> Vec<SaleRecord> {
    sales.sort_by(|a, b| b.price.total_cmp(&a.price));
    sales.truncate(n);
    sales
}

/// Recent top sales of a collection. Never fails: errors are logged and
/// whatever was gathered before the error is returned.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SaleSource {
    async fn recent_top_sales(&self, address: &str) -> Vec<SaleRecord>;
}

/// Finds Seaport sales by walking the Transfer events of a contract over the
/// last `lookback_blocks` blocks and decoding each transaction's settlement log.
pub struct ChainSaleExtractor<P> {
    provider: Arc<Provider<P>>,
    lookback_blocks: u64,
}

impl<P: JsonRpcClient + 'static> ChainSaleExtractor<P> {
    pub fn new(provider: Arc<Provider<P>>, lookback_blocks: u64) -> Self {
        Self {
            provider,
            lookback_blocks,
        }
    }

    pub async fn transfer_logs(&self, contract: Address) -> Result<Vec<Log>> {
        let head = self
            .provider
            .get_block_number()
            .await
            .context("Failed to read block number")?
            .as_u64();
        let from = head.saturating_sub(self.lookback_blocks);

        let filter = Filter::new()
            .address(contract)
            .topic0(transfer_topic())
            .from_block(from)
            .to_block(head);

        self.provider
            .get_logs(&filter)
            .await
            .with_context(|| format!("Failed to query transfers of {:?} in [{}, {}]", contract, from, head))
    }

    /// `Ok(None)` when the transaction did not settle through Seaport, or when
    /// the chosen Seaport log is some other event (`OrdersMatched` for example).
    /// Those logs are skipped without decoding, so they never abort the
    /// collection's loop the way a failed `OrderFulfilled` decode does.
    pub async fn sale_from_transaction(&self, tx_hash: H256) -> Result<Option<SaleRecord>> {
        let receipt = self
            .provider
            .get_transaction_receipt(tx_hash)
            .await
            .with_context(|| format!("Failed to fetch receipt {:?}", tx_hash))?
            .ok_or_else(|| anyhow!("No receipt for {:?}", tx_hash))?;

        let log = match seaport::settlement_log(&receipt.logs) {
            Some(log) => log,
            None => {
                debug!("{:?} is not a Seaport sale", tx_hash);
                return Ok(None);
            }
        };
        if !seaport::is_order_fulfilled(log) {
            debug!("{:?} settled through Seaport without OrderFulfilled", tx_hash);
            return Ok(None);
        }

        let order = OrderFulfilled::decode(&log.data)
            .with_context(|| format!("Failed to decode OrderFulfilled in {:?}", tx_hash))?;
        Ok(Some(seaport::derive_sale(&order, receipt.transaction_hash)?))
    }

    async fn collect_sales(&self, transfers: &[Log], sales: &mut Vec<SaleRecord>) -> Result<()> {
        for transfer in transfers {
            let tx_hash = match transfer.transaction_hash {
                Some(hash) => hash,
                None => {
                    warn!("Transfer log without transaction hash, skipping");
                    continue;
                }
            };
            if let Some(sale) = self.sale_from_transaction(tx_hash).await? {
                sales.push(sale);
            }
        }
        Ok(())
    }

    pub async fn extract(&self, contract: Address) -> Vec<SaleRecord> {
        let transfers = match self.transfer_logs(contract).await {
            Ok(logs) => logs,
            Err(e) => {
                error!("{:?}", e);
                return Vec::new();
            }
        };
        info!("{} transfers of {:?} in the last {} blocks", transfers.len(), contract, self.lookback_blocks);

        let mut sales = Vec::new();
        if let Err(e) = self.collect_sales(&transfers, &mut sales).await {
            error!(
                "Sale extraction for {:?} stopped after {} sales: {:?}",
                contract,
                sales.len(),
                e
            );
        }
        rank_sales(sales, TOP_SALES)
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> SaleSource for ChainSaleExtractor<P> {
    async fn recent_top_sales(&self, address: &str) -> Vec<SaleRecord> {
        match address.trim().parse::<Address>() {
            Ok(contract) => self.extract(contract).await,
            Err(e) => {
                error!("Invalid contract address {}: {}", address, e);
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::seaport::tests::{encode_order, eth, seaport_log};
    use super::*;
    use ethers::{
        providers::MockProvider,
        types::{TransactionReceipt, U256, U64},
    };

    fn sale(price: f64) -> SaleRecord {
        SaleRecord {
            token_id: format!("{}", price as u64),
            price,
            transaction_hash: H256::zero(),
        }
    }

    fn transfer(hash: H256) -> Log {
        Log {
            transaction_hash: Some(hash),
            ..Default::default()
        }
    }

    fn receipt(hash: H256, logs: Vec<Log>) -> TransactionReceipt {
        TransactionReceipt {
            transaction_hash: hash,
            logs,
            ..Default::default()
        }
    }

    fn sale_receipt(hash: H256, token_id: u64, price: f64) -> TransactionReceipt {
        let data = encode_order(&[(2, token_id, U256::one())], &[(0, 0, eth(price))]);
        let noise = Log {
            address: Address::repeat_byte(0x44),
            ..Default::default()
        };
        receipt(hash, vec![noise, seaport_log(data)])
    }

    fn extractor() -> (ChainSaleExtractor<MockProvider>, MockProvider) {
        let (provider, mock) = Provider::mocked();
        (ChainSaleExtractor::new(Arc::new(provider), 6500), mock)
    }

    #[test]
    fn test_rank_sales_keeps_top_three() {
        let ranked = rank_sales(vec![sale(5.0), sale(12.5), sale(3.25), sale(9.0)], TOP_SALES);
        let prices: Vec<f64> = ranked.iter().map(|s| s.price).collect();
        assert_eq!(prices, vec![12.5, 9.0, 5.0]);
    }

    #[test]
    fn test_rank_sales_short_list() {
        assert_eq!(rank_sales(vec![sale(1.0)], TOP_SALES).len(), 1);
        assert!(rank_sales(Vec::new(), TOP_SALES).is_empty());
    }

    #[tokio::test]
    async fn test_extract_sales() {
        let (extractor, mock) = extractor();
        let (h1, h2, h3) = (H256::repeat_byte(1), H256::repeat_byte(2), H256::repeat_byte(3));

        // MockProvider answers the most recently pushed response first.
        mock.push::<TransactionReceipt, _>(sale_receipt(h3, 77, 5.0)).unwrap();
        mock.push::<TransactionReceipt, _>(receipt(h2, vec![Log::default()])).unwrap();
        mock.push::<TransactionReceipt, _>(sale_receipt(h1, 42, 3.0)).unwrap();
        mock.push::<Vec<Log>, _>(vec![transfer(h1), transfer(h2), transfer(h3)]).unwrap();
        mock.push::<U64, _>(U64::from(17_000_000u64)).unwrap();

        let sales = extractor.extract(Address::repeat_byte(0x11)).await;

        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].token_id, "77");
        assert_eq!(sales[0].price, 5.0);
        assert_eq!(sales[0].transaction_hash, h3);
        assert_eq!(sales[1].token_id, "42");
    }

    #[tokio::test]
    async fn test_missing_receipt_keeps_partial_sales() {
        let (extractor, mock) = extractor();
        let (h1, h2, h3) = (H256::repeat_byte(1), H256::repeat_byte(2), H256::repeat_byte(3));

        mock.push::<TransactionReceipt, _>(sale_receipt(h3, 9, 50.0)).unwrap();
        mock.push::<Option<TransactionReceipt>, _>(None).unwrap();
        mock.push::<TransactionReceipt, _>(sale_receipt(h1, 1, 1.5)).unwrap();
        mock.push::<Vec<Log>, _>(vec![transfer(h1), transfer(h2), transfer(h3)]).unwrap();
        mock.push::<U64, _>(U64::from(100u64)).unwrap();

        let sales = extractor.extract(Address::repeat_byte(0x11)).await;

        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].token_id, "1");
    }

    #[tokio::test]
    async fn test_other_seaport_event_is_skipped() {
        let (extractor, mock) = extractor();
        let (h1, h2) = (H256::repeat_byte(1), H256::repeat_byte(2));
        let orders_matched = Log {
            address: crate::abi::SEAPORT_ADDRESS,
            topics: vec![H256::repeat_byte(0x4b)],
            data: vec![0u8; 7].into(),
            ..Default::default()
        };

        mock.push::<TransactionReceipt, _>(sale_receipt(h2, 8, 2.0)).unwrap();
        mock.push::<TransactionReceipt, _>(receipt(h1, vec![orders_matched])).unwrap();
        mock.push::<Vec<Log>, _>(vec![transfer(h1), transfer(h2)]).unwrap();
        mock.push::<U64, _>(U64::from(100u64)).unwrap();

        let sales = extractor.extract(Address::repeat_byte(0x11)).await;

        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].token_id, "8");
    }

    #[tokio::test]
    async fn test_undecodable_order_stops_collection() {
        let (extractor, mock) = extractor();
        let (h1, h2, h3) = (H256::repeat_byte(1), H256::repeat_byte(2), H256::repeat_byte(3));

        mock.push::<TransactionReceipt, _>(sale_receipt(h3, 9, 50.0)).unwrap();
        mock.push::<TransactionReceipt, _>(receipt(h2, vec![seaport_log(vec![0u8; 7].into())]))
            .unwrap();
        mock.push::<TransactionReceipt, _>(sale_receipt(h1, 1, 1.5)).unwrap();
        mock.push::<Vec<Log>, _>(vec![transfer(h1), transfer(h2), transfer(h3)]).unwrap();
        mock.push::<U64, _>(U64::from(100u64)).unwrap();

        let sales = extractor.extract(Address::repeat_byte(0x11)).await;

        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].token_id, "1");
    }

    #[tokio::test]
    async fn test_rpc_failure_yields_no_sales() {
        let (extractor, _mock) = extractor();
        assert!(extractor.extract(Address::repeat_byte(0x11)).await.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_address_yields_no_sales() {
        let (extractor, _mock) = extractor();
        assert!(extractor.recent_top_sales("not-an-address").await.is_empty());
    }
}
