//! Address and block-height lookup over the store's maps.

use std::collections::{BTreeMap, HashMap};

use super::ParticipantEntry;
use crate::types::{BlockRecord, SearchResult};

/// Prefix that marks a token as an address.
const ADDRESS_PREFIX: &str = "0x";

pub(super) fn run(
    token: &str,
    participants: &HashMap<String, ParticipantEntry>,
    blocks: &BTreeMap<u64, BlockRecord>,
    limit: usize,
) -> Vec<SearchResult> {
    let lowered = token.to_lowercase();
    let mut results = Vec::new();

    if lowered.starts_with(ADDRESS_PREFIX) {
        if let Some(entry) = participants.get(token) {
            results.push(SearchResult::Miner(entry.snapshot()));
        }

        let mut partial: Vec<&ParticipantEntry> = participants
            .values()
            .filter(|entry| {
                entry.record.address != token
                    && entry.record.address.to_lowercase().contains(&lowered)
            })
            .collect();
        partial.sort_by(|a, b| a.record.address.cmp(&b.record.address));

        results.extend(
            partial
                .into_iter()
                .map(|entry| SearchResult::Miner(entry.snapshot())),
        );
    } else if let Ok(number) = token.parse::<u64>() {
        if let Some(block) = blocks.get(&number) {
            results.push(SearchResult::Block(block.clone()));
        }
    }

    results.truncate(limit);
    results
}

#[cfg(test)]
mod tests {
    use crate::config::StoreConfig;
    use crate::store::NetworkStore;
    use crate::store::tests::{participant, sample_stats};
    use crate::types::{NewBlock, SearchResult};

    fn populated_store() -> NetworkStore {
        let store = NetworkStore::new(StoreConfig::default(), sample_stats());
        for address in ["0xabc123", "0xABC999", "0xdef000", "0xabc"] {
            store.insert_participant(participant(address, 1.0)).unwrap();
        }
        store.append_block(NewBlock {
            hash: "0x00".to_string(),
            timestamp: 1,
            difficulty: 1.0,
            reward: 50.0,
            miner_address: "0xabc".to_string(),
            confirmations: 0,
            size: 1,
            transactions: 1,
        });
        store
    }

    fn addresses(results: &[SearchResult]) -> Vec<String> {
        results
            .iter()
            .map(|result| match result {
                SearchResult::Miner(p) => p.address.clone(),
                SearchResult::Block(b) => b.number.to_string(),
            })
            .collect()
    }

    #[test]
    fn test_exact_address_comes_first() {
        let store = populated_store();

        let results = store.search("0xabc");

        assert_eq!(
            addresses(&results),
            vec!["0xabc", "0xABC999", "0xabc123"]
        );
    }

    #[test]
    fn test_substring_is_case_insensitive() {
        let store = populated_store();
        let results = store.search("0XDEF");
        assert_eq!(addresses(&results), vec!["0xdef000"]);
    }

    #[test]
    fn test_exact_block_height() {
        let store = populated_store();
        let results = store.search("11");
        assert_eq!(results.len(), 1);
        assert!(matches!(&results[0], SearchResult::Block(b) if b.number == 11));
    }

    #[test]
    fn test_unknown_tokens_yield_empty() {
        let store = populated_store();
        assert!(store.search("0x999999").is_empty());
        assert!(store.search("12345").is_empty());
        assert!(store.search("hello").is_empty());
        assert!(store.search("-3").is_empty());
    }

    #[test]
    fn test_results_are_capped() {
        let config = StoreConfig {
            search_result_limit: 10,
            ..Default::default()
        };
        let store = NetworkStore::new(config, sample_stats());
        for index in 0..25 {
            store
                .insert_participant(participant(&format!("0x{index:04}"), 1.0))
                .unwrap();
        }

        assert_eq!(store.search("0x").len(), 10);
    }
}
