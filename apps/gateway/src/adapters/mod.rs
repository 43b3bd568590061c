//! SeaORM adapters. Functions here return `DbErr`; the repos layer maps to
//! `DomainError`.

pub mod refresh_tokens_sea;
pub mod users_sea;
