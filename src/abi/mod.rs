use ethers::{
    abi::ParamType,
    types::{Address, H160, H256},
    utils::keccak256,
};

/// Seaport 1.1 (`0x00000000006c3852cbEf3e08E8dF289169EdE581`), the settlement
/// contract behind OpenSea sales.
pub const SEAPORT_ADDRESS: Address = H160([
    0x00, 0x00, 0x00, 0x00, 0x00, 0x6c, 0x38, 0x52, 0xcb, 0xef, 0x3e, 0x08, 0xe8, 0xdf, 0x28, 0x91,
    0x69, 0xed, 0xe5, 0x81,
]);

pub const TRANSFER_EVENT: &str = "Transfer(address,address,uint256)";

pub const ORDER_FULFILLED_EVENT: &str = "OrderFulfilled(bytes32,address,address,address,(uint8,address,uint256,uint256)[],(uint8,address,uint256,uint256,address)[])";

/// Seaport item type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ItemType {
    Native = 0,
    Erc20 = 1,
    Erc721 = 2,
    Erc1155 = 3,
    Erc721WithCriteria = 4,
    Erc1155WithCriteria = 5,
}

impl ItemType {
    pub fn from_u8(tag: u8) -> Option<Self> {
        match tag {
            0 => Some(Self::Native),
            1 => Some(Self::Erc20),
            2 => Some(Self::Erc721),
            3 => Some(Self::Erc1155),
            4 => Some(Self::Erc721WithCriteria),
            5 => Some(Self::Erc1155WithCriteria),
            _ => None,
        }
    }
}

pub fn transfer_topic() -> H256 {
    H256::from(keccak256(TRANSFER_EVENT))
}

pub fn order_fulfilled_topic() -> H256 {
    H256::from(keccak256(ORDER_FULFILLED_EVENT))
}

/// `SpentItem(uint8 itemType, address token, uint256 identifier, uint256 amount)`
pub fn spent_item() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Uint(8),
        ParamType::Address,
        ParamType::Uint(256),
        ParamType::Uint(256),
    ])
}

/// `ReceivedItem`: a `SpentItem` plus `address recipient`.
pub fn received_item() -> ParamType {
    ParamType::Tuple(vec![
        ParamType::Uint(8),
        ParamType::Address,
        ParamType::Uint(256),
        ParamType::Uint(256),
        ParamType::Address,
    ])
}

/// Non-indexed part of `OrderFulfilled`: orderHash, recipient, offer, consideration.
/// offerer and zone are indexed and live in the topics.
pub fn order_fulfilled_data() -> Vec<ParamType> {
    vec![
        ParamType::FixedBytes(32),
        ParamType::Address,
        ParamType::Array(Box::new(spent_item())),
        ParamType::Array(Box::new(received_item())),
    ]
}
