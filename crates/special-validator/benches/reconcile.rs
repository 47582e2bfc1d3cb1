//! Reconciliation pass benchmarks
//!
//! Usage:
//!   cargo bench -p special-validator              # all
//!   cargo bench -p special-validator -- steady    # no-change passes only

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use rand::Rng;
use special_validator::sim::{Chain, SimDistribution, SimStaking};
use special_validator::staking::Description;
use special_validator::{
    AccAddress, Coin, PublicKey, RegisterSpecialValidatorProposal, SpecialValidatorConfig,
    SpecialValidatorProposal, ValAddress, ADDRESS_LEN,
};

const REDUCTION: u128 = 1_000_000;

fn address(id: u16) -> ValAddress {
    let mut bytes = [0u8; ADDRESS_LEN];
    bytes[..2].copy_from_slice(&id.to_be_bytes());
    ValAddress::new(bytes)
}

fn pubkey(id: u16) -> PublicKey {
    let mut bytes = [0xaa; 32];
    bytes[..2].copy_from_slice(&id.to_be_bytes());
    PublicKey::ed25519(bytes)
}

/// Chain with `n` special validators, none of them elected by staking
fn build_chain(n: u16) -> Chain {
    let mut rng = rand::thread_rng();
    let mut staking = SimStaking::new("uzt", REDUCTION, 0);
    for id in 1..=n {
        staking.fund_account(&AccAddress::from(address(id)), 1_000 * REDUCTION);
    }

    let mut chain = Chain::new(
        SpecialValidatorConfig::default(),
        staking,
        SimDistribution::new(),
    );
    for id in 1..=n {
        let stake = rng.gen_range(1..1_000u128) * REDUCTION;
        let proposal = RegisterSpecialValidatorProposal {
            title: format!("Register {}", id),
            description: "bench".into(),
            delegator_address: AccAddress::from(address(id)).to_string(),
            validator_address: address(id).to_string(),
            pubkey: Some(pubkey(id)),
            amount: Coin::new("uzt", stake),
            validator_description: Description::new(format!("v{}", id)),
        };
        chain
            .submit_proposal(&SpecialValidatorProposal::Register(proposal))
            .unwrap();
    }
    chain
}

fn bench_first_pass(c: &mut Criterion) {
    let mut group = c.benchmark_group("first_pass");
    group.sample_size(20);

    for n in [100u16, 1_000] {
        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter_batched(
                || build_chain(n),
                |mut chain| {
                    let updates = chain.keeper_mut().special_validator_updates().unwrap();
                    black_box(updates)
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

fn bench_steady(c: &mut Criterion) {
    let mut group = c.benchmark_group("steady");

    for n in [100u16, 1_000] {
        let mut chain = build_chain(n);
        chain.end_block().unwrap();

        group.bench_function(BenchmarkId::from_parameter(n), |b| {
            b.iter(|| {
                let updates = chain.keeper_mut().special_validator_updates().unwrap();
                black_box(updates)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_first_pass, bench_steady);
criterion_main!(benches);
