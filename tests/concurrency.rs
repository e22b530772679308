mod util;

use revx::prelude::cks09::Element;
use revx::prelude::*;
use std::thread;
use util::*;

#[test]
fn holders_recompute_in_parallel() {
    init_logger();
    let cached = CachedTails::new(&*TAILS);
    let mut issuer = RegistryIssuer::<Element>::new(RegistryConfig::new(CAPACITY), &cached).unwrap();
    for i in 1..=8 {
        issuer.issue(i, &cached).unwrap();
    }
    let holders: Vec<_> = [1, 6]
        .into_iter()
        .map(|i| issuer.witness_for(i, &cached).unwrap())
        .collect();
    issuer.revoke(&[2, 7], &cached).unwrap();
    issuer.issue(11, &cached).unwrap();
    issuer.revoke(&[4], &cached).unwrap();

    let head = *issuer.accumulator();
    let history = issuer.history();
    let updated: Vec<_> = thread::scope(|s| {
        let handles: Vec<_> = holders
            .iter()
            .map(|state| {
                let cached = &cached;
                s.spawn(move || state.update_to(history, &head, cached))
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap().unwrap())
            .collect()
    });

    for state in &updated {
        assert_eq!(state.accumulator, head);
        assert!(state.verify(&*PUBLIC_KEY));
        assert_eq!(*state, issuer.witness_for(state.index, &*TAILS).unwrap());
    }
    assert!(cached.cached() > 0);
}

#[test]
fn shared_history_serves_many_readers() {
    init_logger();
    let mut issuer = RegistryIssuer::<Element>::new(RegistryConfig::new(CAPACITY), &*TAILS).unwrap();
    let states: Vec<_> = (1..=CAPACITY)
        .map(|i| issuer.issue(i, &*TAILS).unwrap().0)
        .collect();
    issuer.revoke(&[3, 9, 12], &*TAILS).unwrap();
    let head = *issuer.accumulator();

    thread::scope(|s| {
        for state in &states {
            let issuer = &issuer;
            s.spawn(move || {
                let result = state.update_to(issuer, &head, &*IN_MEMORY_TAILS);
                match state.index {
                    3 | 9 | 12 => {
                        assert_eq!(result, Err(Error::RevokedCredential(state.index)))
                    }
                    _ => assert!(result.unwrap().verify(&*PUBLIC_KEY)),
                }
            });
        }
    });
}
