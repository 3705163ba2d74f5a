use thiserror::Error;

use crate::models::{agent::PhaseError, factory::FactoryError, iads::IadsError};
use crate::scenario::ScenarioError;

/// シミュレーション全体のエラー
#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error(transparent)]
    Factory(#[from] FactoryError),
    #[error(transparent)]
    Iads(#[from] IadsError),
    #[error(transparent)]
    Phase(#[from] PhaseError),
}
