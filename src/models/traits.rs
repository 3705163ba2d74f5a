use crate::events::EngagementEvent;
use crate::models::agent::{AgentAction, AgentCore, TickContext};
use crate::models::assignment::{AssignableInterceptor, AssignmentItem, ThreatSnapshot};
use crate::models::common::{KinematicState, Vector3};
use crate::models::sensor::SensorOutput;

/// フェーズごとの振る舞いを提供するインターフェース
///
/// 状態機械（`Agent::tick`）が現在のフライトフェーズに応じて呼び出します。
/// 各ハンドラは `core.acceleration` に今ティックの要求加速度を書き込み、
/// 追加の処理要求（ミス宣言・子弾放出）を `actions` に積みます。
pub trait IPhaseBehavior {
    /// READY フェーズの処理
    fn update_ready(&mut self, core: &mut AgentCore, ctx: &TickContext, actions: &mut Vec<AgentAction>);

    /// BOOST フェーズの処理
    fn update_boost(&mut self, core: &mut AgentCore, ctx: &TickContext, actions: &mut Vec<AgentAction>);

    /// MIDCOURSE / TERMINAL フェーズの処理
    fn update_midcourse(&mut self, core: &mut AgentCore, ctx: &TickContext, actions: &mut Vec<AgentAction>);
}

/// センサーのインターフェース
pub trait ISensor {
    /// 観測者から見た目標の相対位置・相対速度を極座標で観測
    fn sense(&self, observer: &KinematicState, target: &KinematicState) -> SensorOutput;
}

/// 運動学プロバイダのインターフェース
///
/// 要求加速度を受け取り、位置・速度・姿勢を1ステップ進めます。
pub trait IKinematics {
    fn integrate(&self, state: &mut KinematicState, acceleration: Vector3, dt: f64);
}

/// 割り当てポリシーのインターフェース
pub trait IAssignment {
    /// 割り当て可能な迎撃体と脅威の一覧から、迎撃体→脅威のペアを生成
    ///
    /// # 引数
    ///
    /// * `interceptors` - 割り当て可能な迎撃体
    /// * `threats` - 登録済みの脅威（DESTROYED を含む）
    ///
    /// # 戻り値
    ///
    /// 割り当て結果。1つの迎撃体は高々1回しか現れません。
    fn assign(&mut self, interceptors: &[AssignableInterceptor], threats: &[ThreatSnapshot]) -> Vec<AssignmentItem>;

    /// ポリシー名（ログ出力用）
    fn name(&self) -> &'static str;
}

/// 交戦イベントの購読者インターフェース
pub trait IEngagementObserver {
    fn on_event(&mut self, event: &EngagementEvent);
}

/// センサー出力を受け取って誘導指令を生成するインターフェース
pub trait IGuidanceLaw {
    /// 機体座標系での加速度指令（クリップ前）
    fn command(&self, output: &SensorOutput, state: &KinematicState) -> Vector3;
}
