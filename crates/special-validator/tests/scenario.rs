//! End-to-end scenario replay through the public API

use special_validator::scenario::{self, Scenario};
use special_validator::sim::{Chain, SimDistribution, SimStaking};
use special_validator::staking::{Description, StakingKeeper};
use special_validator::{
    AccAddress, Coin, GenesisState, PublicKey, RegisterSpecialValidatorProposal,
    SpecialValidatorConfig, SpecialValidatorProposal, ValAddress, ADDRESS_LEN,
};

const EVICTION: &str = r#"
staking:
  power_reduction: 1000
  max_validators: 1
accounts:
  - address: "0x0101010101010101010101010101010101010101"
    balance: 10000000
  - address: "0x0202020202020202020202020202020202020202"
    balance: 10000000
blocks:
  # special validator is the only one, staking elects it
  - actions:
      - action: register
        address: "0x0101010101010101010101010101010101010101"
        pubkey: { algorithm: ed25519, bytes: "0101010101010101010101010101010101010101010101010101010101010101" }
        amount: 400000
        moniker: foundation
  # a bigger ordinary validator takes the only seat
  - actions:
      - action: create_validator
        address: "0x0202020202020202020202020202020202020202"
        pubkey: { algorithm: ed25519, bytes: "0202020202020202020202020202020202020202020202020202020202020202" }
        amount: 900000
        moniker: whale
  - actions:
      - action: unregister
        address: "0x0101010101010101010101010101010101010101"
  - actions:
      - action: unregister
        address: "0x0101010101010101010101010101010101010101"
"#;

#[test]
fn eviction_then_unregister() {
    let scenario = Scenario::from_yaml_str(EVICTION).unwrap();
    let report = scenario::run(&scenario, SpecialValidatorConfig::default()).unwrap();
    assert_eq!(report.blocks.len(), 4);

    let b1 = &report.blocks[0];
    assert_eq!(b1.staking.len(), 1);
    assert_eq!(b1.staking[0].power, 400);
    assert!(b1.special.is_empty());

    // evicted by staking, re-emitted by reconciliation
    let b2 = &report.blocks[1];
    let powers: Vec<u64> = b2.staking.iter().map(|u| u.power).collect();
    assert_eq!(powers, vec![900, 0]);
    assert_eq!(b2.special.len(), 1);
    assert_eq!(b2.special[0].power, 400);

    // power is nonzero: deferred, then removed by the same block's reconciliation
    let b3 = &report.blocks[2];
    assert!(b3.rejected.is_empty());
    assert_eq!(b3.special.len(), 1);
    assert_eq!(b3.special[0].power, 0);

    // already gone
    let b4 = &report.blocks[3];
    assert_eq!(b4.rejected.len(), 1);
    assert!(b4.rejected[0].1.contains("not found"));

    assert_eq!(report.genesis, GenesisState::default());
}

#[test]
fn genesis_export_reimports() {
    let addr = ValAddress::new([7; ADDRESS_LEN]);
    let mut staking = SimStaking::default();
    staking.fund_account(&AccAddress::from(addr), 1_000_000_000);

    let mut chain = Chain::new(
        SpecialValidatorConfig::default(),
        staking,
        SimDistribution::new(),
    );
    let proposal = RegisterSpecialValidatorProposal {
        title: "Register".into(),
        description: "Admit validator seven".into(),
        delegator_address: AccAddress::from(addr).to_string(),
        validator_address: addr.to_string(),
        pubkey: Some(PublicKey::ed25519([7; 32])),
        amount: Coin::new("uzt", 5_000_000),
        validator_description: Description::new("seven"),
    };
    chain
        .submit_proposal(&SpecialValidatorProposal::Register(proposal))
        .unwrap();
    chain.end_block().unwrap();

    let exported = chain.keeper().export_genesis().unwrap();
    assert_eq!(exported.special_validators.len(), 1);
    assert_eq!(exported.special_validators[0].power, 5);
    assert_eq!(chain.staking().last_validator_power(&addr), 5);

    let json = exported.to_json_pretty().unwrap();
    let imported = GenesisState::from_json_str(&json).unwrap();
    assert_eq!(imported, exported);

    let fresh = Chain::with_genesis(
        SpecialValidatorConfig::default(),
        SimStaking::default(),
        SimDistribution::new(),
        &imported,
    )
    .unwrap();
    assert_eq!(fresh.keeper().special_validators().unwrap(), vec![addr]);
}

#[test]
fn bundled_lifecycle_scenario() {
    let dir = concat!(env!("CARGO_MANIFEST_DIR"), "/scenarios");
    let scenario = Scenario::load(format!("{}/lifecycle.yaml", dir)).unwrap();
    let config = SpecialValidatorConfig::load(format!("{}/config.yaml", dir)).unwrap();
    assert!(!config.reject_user_delegations);

    let report = scenario::run(&scenario, config).unwrap();
    let special: Vec<Vec<u64>> = report
        .blocks
        .iter()
        .map(|b| b.special.iter().map(|u| u.power).collect())
        .collect();
    assert_eq!(special, vec![vec![], vec![50], vec![], vec![0], vec![]]);
    assert!(report.blocks.iter().all(|b| b.rejected.is_empty()));

    assert!(report.genesis.special_validators.is_empty());
    assert_eq!(report.community_pool.amount_of("uzt"), 1_500);
}
