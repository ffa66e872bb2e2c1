use ethers::{
    abi::{self, Token},
    types::{Address, Log, H256, U256},
};
use thiserror::Error;

use super::SaleRecord;
use crate::abi::{order_fulfilled_data, order_fulfilled_topic, ItemType, SEAPORT_ADDRESS};
use crate::utils::wei_to_ether;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("log data does not match the OrderFulfilled layout: {0}")]
    Abi(#[from] abi::Error),
    #[error("unexpected token in OrderFulfilled: {0}")]
    Layout(&'static str),
    #[error("order has no {0} items")]
    Empty(&'static str),
    #[error("amount {0} cannot be converted to ether")]
    Amount(U256),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpentItem {
    pub item_type: u8,
    pub token: Address,
    pub identifier: U256,
    pub amount: U256,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedItem {
    pub item_type: u8,
    pub token: Address,
    pub identifier: U256,
    pub amount: U256,
    pub recipient: Address,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFulfilled {
    pub order_hash: H256,
    pub recipient: Address,
    pub offer: Vec<SpentItem>,
    pub consideration: Vec<ReceivedItem>,
}

impl OrderFulfilled {
    /// Decodes the data section of an `OrderFulfilled` log.
    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut tokens = abi::decode(&order_fulfilled_data(), data)?.into_iter();

        let order_hash = tokens
            .next()
            .and_then(Token::into_fixed_bytes)
            .map(|b| H256::from_slice(&b))
            .ok_or(DecodeError::Layout("orderHash"))?;
        let recipient = tokens
            .next()
            .and_then(Token::into_address)
            .ok_or(DecodeError::Layout("recipient"))?;
        let offer = tokens
            .next()
            .and_then(Token::into_array)
            .ok_or(DecodeError::Layout("offer"))?
            .into_iter()
            .map(spent_item)
            .collect::<Result<Vec<_>, _>>()?;
        let consideration = tokens
            .next()
            .and_then(Token::into_array)
            .ok_or(DecodeError::Layout("consideration"))?
            .into_iter()
            .map(received_item)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            order_hash,
            recipient,
            offer,
            consideration,
        })
    }
}

fn item_fields(token: Token, expected: usize) -> Result<Vec<Token>, DecodeError> {
    let fields = token.into_tuple().ok_or(DecodeError::Layout("item"))?;
    if fields.len() != expected {
        return Err(DecodeError::Layout("item arity"));
    }
    Ok(fields)
}

fn item_type(token: Token) -> Result<u8, DecodeError> {
    let tag = token.into_uint().ok_or(DecodeError::Layout("itemType"))?;
    if tag > U256::from(u8::MAX) {
        return Err(DecodeError::Layout("itemType"));
    }
    Ok(tag.low_u32() as u8)
}

fn spent_item(token: Token) -> Result<SpentItem, DecodeError> {
    let mut fields = item_fields(token, 4)?.into_iter();
    let mut next = || fields.next().ok_or(DecodeError::Layout("item"));
    Ok(SpentItem {
        item_type: item_type(next()?)?,
        token: next()?.into_address().ok_or(DecodeError::Layout("token"))?,
        identifier: next()?.into_uint().ok_or(DecodeError::Layout("identifier"))?,
        amount: next()?.into_uint().ok_or(DecodeError::Layout("amount"))?,
    })
}

fn received_item(token: Token) -> Result<ReceivedItem, DecodeError> {
    let mut fields = item_fields(token, 5)?.into_iter();
    let mut next = || fields.next().ok_or(DecodeError::Layout("item"));
    Ok(ReceivedItem {
        item_type: item_type(next()?)?,
        token: next()?.into_address().ok_or(DecodeError::Layout("token"))?,
        identifier: next()?.into_uint().ok_or(DecodeError::Layout("identifier"))?,
        amount: next()?.into_uint().ok_or(DecodeError::Layout("amount"))?,
        recipient: next()?.into_address().ok_or(DecodeError::Layout("recipient"))?,
    })
}

/// Picks the Seaport log of a receipt: the last log if Seaport emitted it,
/// otherwise the first one if Seaport emitted that. `None` means the
/// transaction did not settle through Seaport.
pub fn settlement_log(logs: &[Log]) -> Option<&Log> {
    let last = logs.last()?;
    if last.address == SEAPORT_ADDRESS {
        return Some(last);
    }
    logs.first().filter(|log| log.address == SEAPORT_ADDRESS)
}

pub fn is_order_fulfilled(log: &Log) -> bool {
    log.topics.first() == Some(&order_fulfilled_topic())
}

fn ether(amount: U256) -> Result<f64, DecodeError> {
    wei_to_ether(amount).map_err(|_| DecodeError::Amount(amount))
}

/// Price and token id of a fulfilled order.
///
/// When the first consideration item is an ERC-721 the order was an accepted
/// bid, the offerer gave currency and received the NFT: the price is the first
/// offer amount and the token is the first consideration identifier.
/// Otherwise the seller offered the NFT and the price is the sum of all
/// consideration legs (seller proceeds, fees, royalties).
///
/// This is a heuristic for single-NFT orders; bundles and criteria orders
/// are priced as a whole and attributed to the first offered token.
pub fn derive_sale(order: &OrderFulfilled, transaction_hash: H256) -> Result<SaleRecord, DecodeError> {
    let first_consideration = order
        .consideration
        .first()
        .ok_or(DecodeError::Empty("consideration"))?;
    let first_offer = order.offer.first().ok_or(DecodeError::Empty("offer"))?;

    let bid_accepted = ItemType::from_u8(first_consideration.item_type) == Some(ItemType::Erc721);
    let (price, token_id) = if bid_accepted {
        (ether(first_offer.amount)?, first_consideration.identifier)
    } else {
        let mut total = 0.0;
        for item in &order.consideration {
            total += ether(item.amount)?;
        }
        (total, first_offer.identifier)
    };

    Ok(SaleRecord {
        token_id: token_id.to_string(),
        price,
        transaction_hash,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use ethers::types::Bytes;

    pub fn eth(amount: f64) -> U256 {
        U256::from((amount * 1e6).round() as u64) * U256::exp10(12)
    }

    pub fn encode_order(offer: &[(u8, u64, U256)], consideration: &[(u8, u64, U256)]) -> Bytes {
        let token = Address::repeat_byte(0x11);
        let seller = Address::repeat_byte(0x22);
        let offer = offer
            .iter()
            .map(|(kind, id, amount)| {
                Token::Tuple(vec![
                    Token::Uint(U256::from(*kind)),
                    Token::Address(token),
                    Token::Uint(U256::from(*id)),
                    Token::Uint(*amount),
                ])
            })
            .collect();
        let consideration = consideration
            .iter()
            .map(|(kind, id, amount)| {
                Token::Tuple(vec![
                    Token::Uint(U256::from(*kind)),
                    Token::Address(token),
                    Token::Uint(U256::from(*id)),
                    Token::Uint(*amount),
                    Token::Address(seller),
                ])
            })
            .collect();
        abi::encode(&[
            Token::FixedBytes(vec![0xab; 32]),
            Token::Address(Address::repeat_byte(0x33)),
            Token::Array(offer),
            Token::Array(consideration),
        ])
        .into()
    }

    pub fn seaport_log(data: Bytes) -> Log {
        Log {
            address: SEAPORT_ADDRESS,
            topics: vec![order_fulfilled_topic()],
            data,
            ..Default::default()
        }
    }

    fn other_log(byte: u8) -> Log {
        Log {
            address: Address::repeat_byte(byte),
            ..Default::default()
        }
    }

    #[test]
    fn test_decode_order() {
        let data = encode_order(
            &[(2, 42, U256::one())],
            &[(0, 0, eth(2.85)), (0, 0, eth(0.15))],
        );
        let order = OrderFulfilled::decode(&data).unwrap();

        assert_eq!(order.order_hash, H256::repeat_byte(0xab));
        assert_eq!(order.offer.len(), 1);
        assert_eq!(order.offer[0].item_type, 2);
        assert_eq!(order.offer[0].identifier, U256::from(42));
        assert_eq!(order.consideration.len(), 2);
        assert_eq!(order.consideration[1].recipient, Address::repeat_byte(0x22));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(OrderFulfilled::decode(&[0u8; 7]).is_err());
    }

    #[test]
    fn test_listing_sale_sums_consideration() {
        // NFT offered by the seller, paid in ETH split across seller, fee and royalty.
        let data = encode_order(
            &[(2, 7, U256::one())],
            &[(0, 0, eth(2.7)), (0, 0, eth(0.075)), (0, 0, eth(0.225))],
        );
        let order = OrderFulfilled::decode(&data).unwrap();
        let sale = derive_sale(&order, H256::repeat_byte(1)).unwrap();

        assert_eq!(sale.token_id, "7");
        assert_eq!(format!("{:.2}", sale.price), "3.00");
        assert_eq!(sale.transaction_hash, H256::repeat_byte(1));
    }

    #[test]
    fn test_accepted_offer_uses_offer_amount() {
        // WETH offered by the buyer, NFT received first in the consideration.
        let data = encode_order(
            &[(1, 0, eth(4.5))],
            &[(2, 1234, U256::one()), (1, 0, eth(0.1125))],
        );
        let order = OrderFulfilled::decode(&data).unwrap();
        let sale = derive_sale(&order, H256::zero()).unwrap();

        assert_eq!(sale.token_id, "1234");
        assert_eq!(sale.price, 4.5);
    }

    #[test]
    fn test_erc1155_consideration_takes_sum_branch() {
        let data = encode_order(&[(1, 0, eth(1.0))], &[(3, 5, eth(0.5)), (1, 0, eth(0.25))]);
        let order = OrderFulfilled::decode(&data).unwrap();
        let sale = derive_sale(&order, H256::zero()).unwrap();

        assert_eq!(sale.token_id, "0");
        assert_eq!(sale.price, 0.75);
    }

    #[test]
    fn test_empty_order_is_error() {
        let data = encode_order(&[], &[(0, 0, eth(1.0))]);
        let order = OrderFulfilled::decode(&data).unwrap();
        assert!(matches!(
            derive_sale(&order, H256::zero()),
            Err(DecodeError::Empty("offer"))
        ));
    }

    #[test]
    fn test_settlement_log_prefers_last() {
        let first = seaport_log(Bytes::from(vec![1]));
        let last = seaport_log(Bytes::from(vec![2]));
        let logs = vec![first, other_log(0x01), last.clone()];
        assert_eq!(settlement_log(&logs), Some(&last));
    }

    #[test]
    fn test_settlement_log_falls_back_to_first() {
        let first = seaport_log(Bytes::from(vec![1]));
        let logs = vec![first.clone(), other_log(0x01), other_log(0x02)];
        assert_eq!(settlement_log(&logs), Some(&first));
    }

    #[test]
    fn test_settlement_log_none_without_seaport() {
        let logs = vec![other_log(0x01), other_log(0x02)];
        assert_eq!(settlement_log(&logs), None);
        assert_eq!(settlement_log(&[]), None);
    }
}
