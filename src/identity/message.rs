//! Login Typed Data
//!
//! SNIP-12 (revision 0) message the wallet signs to prove control of the
//! account. The payload is fixed so the same account always yields the same
//! signature, and therefore the same derived key, on a given chain.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Domain name bound into the login message
pub const LOGIN_DOMAIN_NAME: &str = "Arcana Tongo Identity";
/// Domain version
pub const LOGIN_DOMAIN_VERSION: &str = "1";
/// Constant action field
pub const LOGIN_ACTION: &str = "login";

/// One member of a typed struct definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeMember {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypeMember {
    fn felt(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: "felt".to_string(),
        }
    }
}

/// Domain separator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDomain {
    pub name: String,
    pub version: String,
    #[serde(rename = "chainId")]
    pub chain_id: String,
}

/// SNIP-12 typed data as handed to the wallet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypedData {
    pub types: BTreeMap<String, Vec<TypeMember>>,
    #[serde(rename = "primaryType")]
    pub primary_type: String,
    pub domain: TypedDomain,
    pub message: serde_json::Value,
}

impl TypedData {
    /// The fixed login payload for `chain_id`
    pub fn login(chain_id: &str) -> Self {
        let mut types = BTreeMap::new();
        types.insert(
            "StarkNetDomain".to_string(),
            vec![
                TypeMember::felt("name"),
                TypeMember::felt("version"),
                TypeMember::felt("chainId"),
            ],
        );
        types.insert("Message".to_string(), vec![TypeMember::felt("action")]);

        Self {
            types,
            primary_type: "Message".to_string(),
            domain: TypedDomain {
                name: LOGIN_DOMAIN_NAME.to_string(),
                version: LOGIN_DOMAIN_VERSION.to_string(),
                chain_id: chain_id.to_string(),
            },
            message: serde_json::json!({ "action": LOGIN_ACTION }),
        }
    }
}
