//! Folds the compiler's separate user-facing and developer-facing documentation JSON into one
//! per-contract record, indexed by 4-byte function selector.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Sentinel key under which free-standing contract-level docs (the `notice`/`details` that
/// aren't attached to any particular function) are stored.
pub const CONTRACT_LEVEL_KEY: &str = "@contract";

/// One function's (or the contract's, under [`CONTRACT_LEVEL_KEY`]) folded documentation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Doc {
    /// `userdoc.notice` — end-user-facing explanation.
    pub notice: Option<String>,
    /// `devdoc.details` — implementation notes for developers.
    pub details: Option<String>,
    /// `devdoc.params`, parameter name to description.
    pub params: BTreeMap<String, String>,
    /// `devdoc.returns`, return-value name (or position) to description.
    pub returns: BTreeMap<String, String>,
    /// Any other key present in either document, retained verbatim.
    pub extra: Map<String, Value>,
}

/// The folded documentation for one contract: per-selector entries plus the contract-level doc.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NatSpec {
    pub by_selector: BTreeMap<String, Doc>,
}

impl NatSpec {
    pub fn contract_doc(&self) -> Option<&Doc> {
        self.by_selector.get(CONTRACT_LEVEL_KEY)
    }
}

/// Merges a contract's `userdoc` and `devdoc` compiler output (both raw JSON, since their shape
/// varies slightly across compiler versions) into one [`NatSpec`]. Missing fields default empty;
/// unrecognized keys on either document are retained on [`Doc::extra`] for forward compatibility.
pub fn fold(userdoc: &Value, devdoc: &Value) -> NatSpec {
    let mut by_selector: BTreeMap<String, Doc> = BTreeMap::new();

    if let Some(notice) = userdoc.get("notice").and_then(Value::as_str) {
        by_selector.entry(CONTRACT_LEVEL_KEY.to_string()).or_default().notice = Some(notice.to_string());
    }
    if let Some(details) = devdoc.get("details").and_then(Value::as_str) {
        by_selector.entry(CONTRACT_LEVEL_KEY.to_string()).or_default().details = Some(details.to_string());
    }
    if let Some(title) = devdoc.get("title").and_then(Value::as_str) {
        by_selector
            .entry(CONTRACT_LEVEL_KEY.to_string())
            .or_default()
            .extra
            .insert("title".to_string(), Value::String(title.to_string()));
    }
    if let Some(author) = devdoc.get("author").and_then(Value::as_str) {
        by_selector
            .entry(CONTRACT_LEVEL_KEY.to_string())
            .or_default()
            .extra
            .insert("author".to_string(), Value::String(author.to_string()));
    }

    if let Some(methods) = userdoc.get("methods").and_then(Value::as_object) {
        for (signature, entry) in methods {
            let doc = by_selector.entry(crate::utils::function_selector(signature)).or_default();
            if let Some(notice) = entry.get("notice").and_then(Value::as_str) {
                doc.notice = Some(notice.to_string());
            }
        }
    }

    if let Some(methods) = devdoc.get("methods").and_then(Value::as_object) {
        for (signature, entry) in methods {
            let doc = by_selector.entry(crate::utils::function_selector(signature)).or_default();
            if let Some(details) = entry.get("details").and_then(Value::as_str) {
                doc.details = Some(details.to_string());
            }
            if let Some(params) = entry.get("params").and_then(Value::as_object) {
                for (name, desc) in params {
                    if let Some(desc) = desc.as_str() {
                        doc.params.insert(name.clone(), desc.to_string());
                    }
                }
            }
            if let Some(returns) = entry.get("returns").and_then(Value::as_object) {
                for (name, desc) in returns {
                    if let Some(desc) = desc.as_str() {
                        doc.returns.insert(name.clone(), desc.to_string());
                    }
                }
            }
            for (key, value) in entry {
                if !matches!(key.as_str(), "details" | "params" | "returns") {
                    doc.extra.insert(key.clone(), value.clone());
                }
            }
        }
    }

    NatSpec { by_selector }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn folds_contract_and_method_docs() {
        let userdoc = json!({
            "notice": "A simple vault",
            "methods": {
                "withdraw(uint256)": { "notice": "Withdraw funds" }
            }
        });
        let devdoc = json!({
            "details": "Holds ERC20 balances",
            "methods": {
                "withdraw(uint256)": {
                    "details": "Reverts if balance is insufficient",
                    "params": { "amount": "the amount to withdraw" }
                }
            }
        });

        let doc = fold(&userdoc, &devdoc);
        let contract = doc.contract_doc().unwrap();
        assert_eq!(contract.notice.as_deref(), Some("A simple vault"));
        assert_eq!(contract.details.as_deref(), Some("Holds ERC20 balances"));

        let selector = crate::utils::function_selector("withdraw(uint256)");
        let withdraw = doc.by_selector.get(&selector).unwrap();
        assert_eq!(withdraw.notice.as_deref(), Some("Withdraw funds"));
        assert_eq!(withdraw.params.get("amount").map(String::as_str), Some("the amount to withdraw"));
    }

    #[test]
    fn missing_documents_yield_empty_record() {
        let doc = fold(&Value::Null, &Value::Null);
        assert!(doc.by_selector.is_empty());
    }
}
