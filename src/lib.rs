//! # swarmsim
//!
//! 群対群のミサイル交戦シミュレーションカーネル。
//!
//! 迎撃体（Hydra-70 母機とマイクロミサイル）と脅威（ドローン、対艦ミサイル）を
//! 固定時間刻みで飛翔させ、比例航法による誘導、脅威レジストリ（IADS）を介した
//! 目標割り当て、近接時の撃破判定を行います。

pub mod error;
pub mod events;
pub mod logging;
pub mod models;
pub mod scenario;
pub mod simulation;

pub use error::SimError;
pub use scenario::ScenarioConfig;
pub use simulation::{RunSummary, SimulationEngine, StopReason};
