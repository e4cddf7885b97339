//! Sourcify fetcher: pulls a full-match source bundle from the public repo API
//! (`repo.sourcify.dev/contracts/full_match/<chainId>/<address>/`), which serves the original
//! sources plus a `metadata.json` describing the exact compiler settings used.

use super::{CompilerSettings, FetchResult, FetchedSource, Fetcher};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

fn repo_base(chain_id: &str, address: &str) -> String {
    format!("https://repo.sourcify.dev/contracts/full_match/{chain_id}/{address}")
}

#[derive(Debug, Deserialize)]
struct RepoFile {
    name: String,
    path: String,
}

#[derive(Debug, Deserialize, Default)]
struct OptimizerSettings {
    #[serde(default)]
    enabled: bool,
    #[serde(default)]
    runs: u32,
}

#[derive(Debug, Deserialize, Default)]
struct MetadataSettings {
    #[serde(default)]
    optimizer: OptimizerSettings,
    #[serde(rename = "evmVersion")]
    evm_version: Option<String>,
    #[serde(default)]
    remappings: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct SourcifyMetadata {
    compiler: CompilerField,
    settings: MetadataSettings,
}

#[derive(Debug, Deserialize)]
struct CompilerField {
    version: String,
}

pub struct SourcifyFetcher;

impl Fetcher for SourcifyFetcher {
    fn name(&self) -> &'static str {
        "sourcify"
    }

    fn fetch(&self, chain: &str, address: &str, _api_key: Option<&str>) -> crate::error::Result<FetchResult> {
        let client = match reqwest::blocking::Client::builder().timeout(Duration::from_secs(30)).build() {
            Ok(client) => client,
            Err(err) => return Ok(FetchResult::Network(err.to_string())),
        };

        let listing_url = format!("{}/", repo_base(chain, address));
        let listing = match client.get(format!("{listing_url}?api-response=json")).send() {
            Ok(response) if response.status().as_u16() == 404 => return Ok(FetchResult::NotVerified),
            Ok(response) if response.status().as_u16() == 429 => return Ok(FetchResult::RateLimited),
            Ok(response) if !response.status().is_success() => {
                return Ok(FetchResult::Network(format!("http {}", response.status())))
            }
            Ok(response) => response,
            Err(err) => return Ok(FetchResult::Network(err.to_string())),
        };

        let files: Vec<RepoFile> = match listing.json() {
            Ok(files) => files,
            Err(err) => return Ok(FetchResult::Network(err.to_string())),
        };
        if files.is_empty() {
            return Ok(FetchResult::NotVerified);
        }

        let mut sources = BTreeMap::new();
        let mut metadata: Option<SourcifyMetadata> = None;

        for entry in &files {
            let file_url = format!("{}/{}", repo_base(chain, address), entry.path);
            let body = match client.get(&file_url).send().and_then(|r| r.text()) {
                Ok(body) => body,
                Err(err) => return Ok(FetchResult::Network(err.to_string())),
            };

            if entry.name == "metadata.json" {
                metadata = serde_json::from_str(&body).ok();
            } else if entry.path.contains("/sources/") {
                let source_path = entry.path.splitn(2, "/sources/").nth(1).unwrap_or(&entry.name);
                sources.insert(source_path.to_string(), body);
            }
        }

        if sources.is_empty() {
            return Ok(FetchResult::NotVerified);
        }

        let contract_name = sources
            .keys()
            .next()
            .and_then(|p| p.rsplit('/').next())
            .and_then(|f| f.strip_suffix(".sol"))
            .unwrap_or("Contract")
            .to_string();

        let compiler = metadata.map(|meta| CompilerSettings {
            version: Some(meta.compiler.version),
            optimizer_enabled: meta.settings.optimizer.enabled,
            optimizer_runs: meta.settings.optimizer.runs,
            evm_version: meta.settings.evm_version,
            via_ir: false,
            remappings: meta.settings.remappings,
        });

        Ok(FetchResult::Ok(FetchedSource { contract_name, files: sources, compiler }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repo_base_uses_chain_id_and_address() {
        let url = repo_base("1", "0xabc");
        assert_eq!(url, "https://repo.sourcify.dev/contracts/full_match/1/0xabc");
    }

    #[test]
    fn parses_metadata_settings() {
        let raw = r#"{
            "compiler": {"version": "0.8.19+commit.7dd6d404"},
            "settings": {
                "optimizer": {"enabled": true, "runs": 1000},
                "evmVersion": "paris",
                "remappings": ["@oz/=lib/openzeppelin/"]
            },
            "output": {"abi": []}
        }"#;
        let meta: SourcifyMetadata = serde_json::from_str(raw).unwrap();
        assert_eq!(meta.compiler.version, "0.8.19+commit.7dd6d404");
        assert!(meta.settings.optimizer.enabled);
        assert_eq!(meta.settings.optimizer.runs, 1000);
        assert_eq!(meta.settings.remappings, vec!["@oz/=lib/openzeppelin/".to_string()]);
    }
}
