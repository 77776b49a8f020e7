use alloy::primitives::Address;
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::BlockNumberOrTag;
use alloy::sol;
use num_bigint::BigUint;

use crate::retry::{with_retry, RetryError, RetryPolicy};

use super::decoder::u256_to_biguint;
use super::types::{Block, BlockSelector};
use super::{LedgerError, LedgerResult};

sol! {
    #[sol(rpc)]
    interface IMinter {
        function rate() external view returns (uint256);
    }

    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
    }
}

/// JSON-RPC reads against the node: block headers and contract state.
pub struct ChainClient {
    provider: DynProvider,
    retry: RetryPolicy,
}

impl ChainClient {
    pub fn connect(rpc_url: &str, retry: RetryPolicy) -> eyre::Result<Self> {
        let provider = ProviderBuilder::new()
            .connect_http(rpc_url.parse().map_err(|e| eyre::eyre!("Invalid RPC URL: {}", e))?);
        let provider = DynProvider::new(provider);
        Ok(Self { provider, retry })
    }

    pub async fn get_block(&self, selector: BlockSelector) -> LedgerResult<Block> {
        let tag = match selector {
            BlockSelector::Latest => BlockNumberOrTag::Latest,
            BlockSelector::Number(n) => BlockNumberOrTag::Number(n),
        };
        let operation = format!("eth_getBlockByNumber({})", selector);
        let provider = &self.provider;

        let block = with_retry(&self.retry, &operation, || async move {
            provider
                .get_block_by_number(tag)
                .await
                .map_err(LedgerError::rpc)
        })
        .await?;

        let block = block.ok_or_else(|| RetryError::Permanent {
            operation,
            error: LedgerError::BlockNotFound(selector.to_string()),
        })?;

        Ok(Block {
            number: block.header.number,
            timestamp: block.header.timestamp,
        })
    }

    /// Current emission rate of the Minter, tokens per second.
    pub async fn read_rate(&self, minter: Address) -> LedgerResult<BigUint> {
        let contract = IMinter::new(minter, &self.provider);
        let contract = &contract;

        let rate = with_retry(&self.retry, "Minter.rate()", || async move {
            contract.rate().call().await.map_err(LedgerError::rpc)
        })
        .await?;

        Ok(u256_to_biguint(rate))
    }

    /// ERC-20 balance of `holder`.
    pub async fn read_balance(&self, token: Address, holder: Address) -> LedgerResult<BigUint> {
        let contract = IERC20::new(token, &self.provider);
        let contract = &contract;

        let balance = with_retry(&self.retry, "ERC20.balanceOf()", || async move {
            contract
                .balanceOf(holder)
                .call()
                .await
                .map_err(LedgerError::rpc)
        })
        .await?;

        Ok(u256_to_biguint(balance))
    }
}
