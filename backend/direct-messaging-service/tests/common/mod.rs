#![allow(dead_code)]

pub mod faulty;

use chrono::{DateTime, TimeZone, Utc};
use direct_messaging_service::{
    clock::{Clock, ManualClock},
    models::{Principal, UserRole},
    repository::{ChatStore, InMemoryChatStore},
    services::{ChatServices, LedgerSettings},
};
use faulty::{FaultyStore, Faults};
use std::sync::Arc;
use uuid::Uuid;

pub struct Harness {
    pub services: ChatServices,
    pub store: Arc<InMemoryChatStore>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(LedgerSettings::default())
    }

    pub fn with_settings(settings: LedgerSettings) -> Self {
        let store = Arc::new(InMemoryChatStore::new());
        let clock = start_clock();
        let services = ChatServices::new(
            store.clone() as Arc<dyn ChatStore>,
            clock.clone(),
            settings,
        );
        Self {
            services,
            store,
            clock,
        }
    }

    pub fn clock_now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}

/// Same wiring as `Harness`, over a store that injects races and failures
pub struct FaultyHarness {
    pub services: ChatServices,
    pub store: Arc<FaultyStore>,
    pub clock: Arc<ManualClock>,
}

impl FaultyHarness {
    pub fn new(faults: Faults) -> Self {
        let store = Arc::new(FaultyStore::new(faults));
        let clock = start_clock();
        let services = ChatServices::new(
            store.clone() as Arc<dyn ChatStore>,
            clock.clone(),
            LedgerSettings::default(),
        );
        Self {
            services,
            store,
            clock,
        }
    }
}

fn start_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 9, 2, 8, 0, 0).unwrap(),
    ))
}

pub fn user(role: UserRole) -> Principal {
    Principal::new(Uuid::new_v4(), role)
}

pub fn student() -> Principal {
    user(UserRole::Student)
}

pub fn teacher() -> Principal {
    user(UserRole::Teacher)
}
