#![allow(dead_code)]

use lazy_static::lazy_static;
use revx::prelude::cks09::{Element, PublicKey, SecretKey, TailsGenerator};
use revx::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const CAPACITY: u32 = 16;

lazy_static! {
    pub static ref TAILS: TailsGenerator =
        TailsGenerator::new(SecretKey::new(Some(b"integration-tests")), CAPACITY).unwrap();
    pub static ref PUBLIC_KEY: PublicKey = TAILS.public_key();
    pub static ref IN_MEMORY_TAILS: InMemoryTails<Element> = TAILS.generate();
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Tails source that fails transiently a given number of times
pub struct FlakyTails<S> {
    pub inner: S,
    pub failures: AtomicUsize,
    pub calls: AtomicUsize,
}

impl<S> FlakyTails<S> {
    pub fn new(inner: S, failures: usize) -> Self {
        Self {
            inner,
            failures: AtomicUsize::new(failures),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn fail(&self, failures: usize) {
        self.failures.store(failures, Ordering::SeqCst);
    }
}

impl<S: TailsSource<Element>> TailsSource<Element> for FlakyTails<S> {
    fn fetch(&self, position: u32) -> Result<TailsEntry<Element>, TailsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let left = self.failures.load(Ordering::SeqCst);
        if left > 0 {
            self.failures.store(left - 1, Ordering::SeqCst);
            return Err(TailsError::Unavailable(position));
        }
        self.inner.fetch(position)
    }

    fn max_cred_num(&self) -> u32 {
        self.inner.max_cred_num()
    }
}

/// Tails source missing one position
pub struct HoleyTails<S> {
    pub inner: S,
    pub hole: u32,
}

impl<S: TailsSource<Element>> TailsSource<Element> for HoleyTails<S> {
    fn fetch(&self, position: u32) -> Result<TailsEntry<Element>, TailsError> {
        if position == self.hole {
            return Err(TailsError::NotFound(position));
        }
        self.inner.fetch(position)
    }

    fn max_cred_num(&self) -> u32 {
        self.inner.max_cred_num()
    }
}
