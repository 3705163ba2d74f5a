// 基本的なデータ型と数学ユーティリティ
pub mod common;

// エージェントの基本インターフェース（trait）定義
pub mod traits;

// エージェントとフェーズ遷移
pub mod agent;
pub mod interceptor;
pub mod threat;

// センサー・誘導・運動学
pub mod sensor;
pub mod guidance;
pub mod kinematics;

// 生成と管理
pub mod factory;
pub mod roster;

// 割り当てと脅威レジストリ
pub mod assignment;
pub mod iads;

// 便利な re-export
pub use common::{BodyFrame, KinematicState, Vector3};
pub use traits::*;
pub use agent::{Agent, AgentAction, AgentCore, AgentId, AgentKind, FlightPhase, PhaseError, TickContext};
pub use interceptor::{Interceptor, InterceptorVariant};
pub use threat::{NavigationStrategy, Threat, ThreatVariant};
pub use sensor::{IdealSensor, SampledSensor, SensorModel, SensorOutput};
pub use guidance::ProportionalNavigation;
pub use kinematics::EulerKinematics;
pub use factory::{AgentFactory, FactoryError};
pub use roster::Roster;
pub use assignment::{AssignmentItem, RoundRobinAssignment, ThreatLevelAssignment};
pub use iads::{Iads, IadsError, ThreatData, ThreatStatus};
