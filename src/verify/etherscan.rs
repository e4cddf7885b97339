//! Etherscan-shaped `getsourcecode` fetcher. Same request/response shape is reused by every
//! Etherscan-family block explorer (Polygonscan, BscScan, ...); only the base URL differs, so
//! this is keyed by chain name rather than hardcoding `api.etherscan.io`.

use super::{CompilerSettings, FetchResult, FetchedSource, Fetcher};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

/// Known Etherscan-family API hosts. Unrecognized chain names fall back to `api.etherscan.io`
/// with the chain name passed through as a `chainid` query hint, matching how Etherscan's
/// unified v2 API multiplexes chains through one host.
fn api_base(chain: &str) -> String {
    match chain {
        "mainnet" | "ethereum" => "https://api.etherscan.io/api".to_string(),
        "polygon" => "https://api.polygonscan.com/api".to_string(),
        "bsc" => "https://api.bscscan.com/api".to_string(),
        "arbitrum" => "https://api.arbiscan.io/api".to_string(),
        "optimism" => "https://api-optimistic.etherscan.io/api".to_string(),
        other => format!("https://api.etherscan.io/api?chainid={other}"),
    }
}

#[derive(Debug, Deserialize)]
struct EtherscanEnvelope {
    status: String,
    message: String,
    result: Value,
}

#[derive(Debug, Deserialize)]
struct SourceItem {
    #[serde(rename = "SourceCode")]
    source_code: String,
    #[serde(rename = "ContractName")]
    contract_name: String,
    #[serde(rename = "CompilerVersion")]
    compiler_version: String,
    #[serde(rename = "OptimizationUsed")]
    optimization_used: String,
    #[serde(rename = "Runs")]
    runs: String,
    #[serde(rename = "EVMVersion")]
    evm_version: String,
}

pub struct EtherscanFetcher;

impl Fetcher for EtherscanFetcher {
    fn name(&self) -> &'static str {
        "etherscan"
    }

    fn fetch(&self, chain: &str, address: &str, api_key: Option<&str>) -> crate::error::Result<FetchResult> {
        let client = match reqwest::blocking::Client::builder().timeout(Duration::from_secs(30)).build() {
            Ok(client) => client,
            Err(err) => return Ok(FetchResult::Network(err.to_string())),
        };

        let mut request = client
            .get(api_base(chain))
            .query(&[("module", "contract"), ("action", "getsourcecode"), ("address", address)]);
        if let Some(key) = api_key {
            request = request.query(&[("apikey", key)]);
        }

        let response = match request.send() {
            Ok(response) => response,
            Err(err) => return Ok(FetchResult::Network(err.to_string())),
        };

        if response.status().as_u16() == 429 {
            return Ok(FetchResult::RateLimited);
        }
        if !response.status().is_success() {
            return Ok(FetchResult::Network(format!("http {}", response.status())));
        }

        let envelope: EtherscanEnvelope = match response.json() {
            Ok(envelope) => envelope,
            Err(err) => return Ok(FetchResult::Network(err.to_string())),
        };

        if envelope.status != "1" || envelope.message.to_lowercase().contains("rate limit") {
            if envelope.message.to_lowercase().contains("rate limit") {
                return Ok(FetchResult::RateLimited);
            }
            return Ok(FetchResult::NotVerified);
        }

        let items: Vec<SourceItem> = match serde_json::from_value(envelope.result) {
            Ok(items) => items,
            Err(err) => return Ok(FetchResult::Network(err.to_string())),
        };

        let Some(item) = items.into_iter().find(|i| !i.source_code.is_empty()) else {
            return Ok(FetchResult::NotVerified);
        };

        Ok(FetchResult::Ok(parse_source_item(item)))
    }
}

/// `SourceCode` comes in three shapes: a flattened single-file string, a standard-JSON input
/// wrapped in one extra pair of braces (`{{...}}`), or (rarely) an unwrapped JSON object of the
/// same shape.
fn parse_source_item(item: SourceItem) -> FetchedSource {
    let mut files = BTreeMap::new();

    let trimmed = item.source_code.trim();
    let unwrapped = trimmed.strip_prefix('{').and_then(|s| s.strip_suffix('}')).unwrap_or(trimmed);

    if let Ok(parsed) = serde_json::from_str::<Value>(unwrapped) {
        if let Some(sources) = parsed.get("sources").and_then(Value::as_object) {
            for (path, entry) in sources {
                if let Some(content) = entry.get("content").and_then(Value::as_str) {
                    files.insert(path.clone(), content.to_string());
                }
            }
        } else if let Some(map) = parsed.as_object() {
            // unwrapped multi-file shape: {"Path.sol": {"content": "..."}}
            for (path, entry) in map {
                if let Some(content) = entry.get("content").and_then(Value::as_str) {
                    files.insert(path.clone(), content.to_string());
                }
            }
        }
    }

    if files.is_empty() {
        files.insert(format!("{}.sol", item.contract_name), item.source_code.clone());
    }

    let optimizer_enabled = item.optimization_used == "1";
    let optimizer_runs = item.runs.parse().unwrap_or(200);
    let evm_version =
        (!item.evm_version.is_empty() && item.evm_version.to_lowercase() != "default").then(|| item.evm_version);

    let compiler = CompilerSettings {
        version: Some(item.compiler_version.trim_start_matches('v').to_string()),
        optimizer_enabled,
        optimizer_runs,
        evm_version,
        via_ir: unwrapped.contains("\"viaIR\":true") || unwrapped.contains("\"viaIR\": true"),
        remappings: Vec::new(),
    };

    FetchedSource { contract_name: item.contract_name, files, compiler: Some(compiler) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_flattened_single_file_source() {
        let item = SourceItem {
            source_code: "contract Dai {}".to_string(),
            contract_name: "Dai".to_string(),
            compiler_version: "v0.5.12+commit.7709ece9".to_string(),
            optimization_used: "1".to_string(),
            runs: "200".to_string(),
            evm_version: "Default".to_string(),
        };
        let fetched = parse_source_item(item);
        assert_eq!(fetched.files.get("Dai.sol").map(String::as_str), Some("contract Dai {}"));
        assert_eq!(fetched.compiler.unwrap().version.as_deref(), Some("0.5.12+commit.7709ece9"));
    }

    #[test]
    fn parses_double_brace_wrapped_standard_json() {
        let wrapped = r#"{{"language":"Solidity","sources":{"A.sol":{"content":"contract A {}"}},"settings":{}}}"#;
        let item = SourceItem {
            source_code: wrapped.to_string(),
            contract_name: "A".to_string(),
            compiler_version: "v0.8.19+commit.7dd6d404".to_string(),
            optimization_used: "0".to_string(),
            runs: "0".to_string(),
            evm_version: "paris".to_string(),
        };
        let fetched = parse_source_item(item);
        assert_eq!(fetched.files.get("A.sol").map(String::as_str), Some("contract A {}"));
        assert!(!fetched.compiler.unwrap().optimizer_enabled);
    }
}
