//! Genesis import / export

use crate::error::{Result, SpecialValidatorError};
use crate::keeper::Keeper;
use crate::types::SpecialValidator;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    #[serde(default)]
    pub special_validators: Vec<SpecialValidator>,
}

impl GenesisState {
    pub fn new(special_validators: Vec<SpecialValidator>) -> Self {
        Self { special_validators }
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s).map_err(|e| SpecialValidatorError::InvalidGenesis(e.to_string()))
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let s = std::fs::read_to_string(path).map_err(|e| {
            SpecialValidatorError::InvalidGenesis(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&s)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| SpecialValidatorError::InvalidGenesis(e.to_string()))
    }

    /// Addresses are checked on decode; here only uniqueness remains
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.special_validators.len());
        for v in &self.special_validators {
            if !seen.insert(v.address) {
                return Err(SpecialValidatorError::InvalidGenesis(format!(
                    "duplicate special validator {}",
                    v.address
                )));
            }
        }
        Ok(())
    }
}

impl<S, D> Keeper<S, D> {
    /// Insert genesis records as-is
    pub fn init_genesis(&self, genesis: &GenesisState) -> Result<()> {
        genesis.validate()?;
        for v in &genesis.special_validators {
            self.store.set(v)?;
        }
        tracing::info!(
            count = genesis.special_validators.len(),
            "special validators imported from genesis"
        );
        Ok(())
    }

    pub fn export_genesis(&self) -> Result<GenesisState> {
        Ok(GenesisState::new(self.store.all()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SpecialValidatorConfig;
    use crate::store::SpecialValidatorStore;
    use crate::types::{ValAddress, ADDRESS_LEN};

    fn record(id: u8, power: u64, is_deleting: bool) -> SpecialValidator {
        SpecialValidator {
            address: ValAddress::new([id; ADDRESS_LEN]),
            power,
            is_deleting,
        }
    }

    fn keeper() -> Keeper<(), ()> {
        Keeper::new(
            SpecialValidatorStore::in_memory(),
            (),
            (),
            SpecialValidatorConfig::default(),
        )
    }

    #[test]
    fn test_default_genesis_is_valid() {
        let genesis = GenesisState::default();
        assert!(genesis.special_validators.is_empty());
        assert!(genesis.validate().is_ok());
    }

    #[test]
    fn test_duplicate_rejected() {
        let genesis = GenesisState::new(vec![record(1, 0, false), record(1, 5, true)]);
        assert!(matches!(
            genesis.validate(),
            Err(SpecialValidatorError::InvalidGenesis(_))
        ));
        assert!(keeper().init_genesis(&genesis).is_err());
    }

    #[test]
    fn test_init_then_export() {
        let keeper = keeper();
        let genesis = GenesisState::new(vec![record(2, 10, true), record(1, 0, false)]);
        keeper.init_genesis(&genesis).unwrap();

        let exported = keeper.export_genesis().unwrap();
        assert_eq!(
            exported.special_validators,
            vec![record(1, 0, false), record(2, 10, true)]
        );
    }

    #[test]
    fn test_json_rejects_bad_address() {
        let json = r#"{"special_validators":[{"address":"0x12","power":0,"is_deleting":false}]}"#;
        assert!(matches!(
            GenesisState::from_json_str(json),
            Err(SpecialValidatorError::InvalidGenesis(_))
        ));

        let empty: GenesisState = GenesisState::from_json_str("{}").unwrap();
        assert_eq!(empty, GenesisState::default());
    }

    #[test]
    fn test_json_bech32_operator_addresses() {
        let json = r#"{
            "special_validators": [
                {
                    "address": "xplavaloper1qyqszqgpqyqszqgpqyqszqgpqyqszqgpaf6cfj",
                    "power": 10,
                    "is_deleting": true
                }
            ]
        }"#;
        let genesis = GenesisState::from_json_str(json).unwrap();
        assert_eq!(genesis.special_validators, vec![record(1, 10, true)]);

        let exported = genesis.to_json_pretty().unwrap();
        assert!(exported.contains("xplavaloper1qyqszqgpqyqszqgpqyqszqgpqyqszqgpaf6cfj"));

        // account prefix is not an operator address
        let json = r#"{"special_validators":[{"address":"xpla1qyqszqgpqyqszqgpqyqszqgpqyqszqgpv5ezx0","power":0,"is_deleting":false}]}"#;
        assert!(matches!(
            GenesisState::from_json_str(json),
            Err(SpecialValidatorError::InvalidGenesis(_))
        ));
    }
}
