//! # Events モジュール
//!
//! 交戦結果（命中・ミス・脅威の地表到達）をイベントとして配信します。
//!
//! イベントはティック内で収集され、エージェント走査が終わった後にまとめて
//! 脅威レジストリ → エージェント → 購読者の順で処理されます。
//! 購読は `EventBus::subscribe` で登録し、返された `SubscriptionId` で解除します。

use tracing::info;

use crate::models::{agent::AgentId, common::Vector3, traits::IEngagementObserver};

/// ミスの理由
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MissReason {
    /// 近接したが撃破判定に失敗
    KillRoll,
    /// 目標がミス判定距離の外に出た
    RangeExceeded,
    /// 地表に到達
    GroundImpact,
}

/// 交戦イベント
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngagementEvent {
    /// 迎撃成功
    InterceptHit {
        interceptor: AgentId,
        threat: AgentId,
        time: f64,
        position: Vector3,
    },
    /// 迎撃失敗（迎撃体のみ終了）
    InterceptMiss {
        interceptor: AgentId,
        /// 迎撃体に割り当てられていた脅威
        threat: Option<AgentId>,
        time: f64,
        position: Vector3,
        reason: MissReason,
    },
    /// 脅威が命中せずに地表へ到達
    ThreatImpact {
        threat: AgentId,
        time: f64,
        position: Vector3,
    },
}

impl EngagementEvent {
    pub fn time(&self) -> f64 {
        match *self {
            EngagementEvent::InterceptHit { time, .. }
            | EngagementEvent::InterceptMiss { time, .. }
            | EngagementEvent::ThreatImpact { time, .. } => time,
        }
    }
}

/// 購読ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

/// イベントバス
#[derive(Default)]
pub struct EventBus {
    observers: Vec<(SubscriptionId, Box<dyn IEngagementObserver>)>,
    next_id: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// 購読者の登録
    pub fn subscribe(&mut self, observer: Box<dyn IEngagementObserver>) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.observers.push((id, observer));
        id
    }

    /// 購読の解除
    ///
    /// # 戻り値
    ///
    /// 解除された購読者（未登録IDなら None）
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> Option<Box<dyn IEngagementObserver>> {
        let slot = self.observers.iter().position(|(sub, _)| *sub == id)?;
        Some(self.observers.remove(slot).1)
    }

    pub fn subscriber_count(&self) -> usize {
        self.observers.len()
    }

    /// 登録順に全購読者へ配信
    pub fn publish(&mut self, event: &EngagementEvent) {
        for (_, observer) in &mut self.observers {
            observer.on_event(event);
        }
    }
}

/// 交戦イベントを構造化ログとして出力する購読者
#[derive(Debug, Default)]
pub struct TelemetryObserver;

impl IEngagementObserver for TelemetryObserver {
    fn on_event(&mut self, event: &EngagementEvent) {
        match *event {
            EngagementEvent::InterceptHit { interceptor, threat, time, position } => info!(
                interceptor_id = %interceptor,
                threat_id = %threat,
                time,
                position = %position,
                "INTERCEPT_HIT: 迎撃体が脅威に命中しました"
            ),
            EngagementEvent::InterceptMiss { interceptor, threat, time, position, reason } => info!(
                interceptor_id = %interceptor,
                threat_id = ?threat,
                time,
                position = %position,
                reason = ?reason,
                "INTERCEPT_MISS: 迎撃体がミスしました"
            ),
            EngagementEvent::ThreatImpact { threat, time, position } => info!(
                threat_id = %threat,
                time,
                position = %position,
                "THREAT_IMPACT: 脅威が地表に到達しました"
            ),
        }
    }
}

/// 交戦結果の集計
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngagementTally {
    pub hits: u32,
    pub misses: u32,
    pub kill_roll_failures: u32,
    pub ground_impacts: u32,
    pub out_of_range: u32,
    /// 命中せずに地表へ到達した脅威
    pub threats_leaked: u32,
    pub first_hit_time: Option<f64>,
    pub last_hit_time: Option<f64>,
}

impl EngagementTally {
    pub fn threats_destroyed(&self) -> u32 {
        self.hits
    }

    /// 迎撃体1発あたりの命中率
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { f64::from(self.hits) / f64::from(total) }
    }
}

impl IEngagementObserver for EngagementTally {
    fn on_event(&mut self, event: &EngagementEvent) {
        match *event {
            EngagementEvent::InterceptHit { time, .. } => {
                self.hits += 1;
                self.first_hit_time.get_or_insert(time);
                self.last_hit_time = Some(time);
            }
            EngagementEvent::InterceptMiss { reason, .. } => {
                self.misses += 1;
                match reason {
                    MissReason::KillRoll => self.kill_roll_failures += 1,
                    MissReason::RangeExceeded => self.out_of_range += 1,
                    MissReason::GroundImpact => self.ground_impacts += 1,
                }
            }
            EngagementEvent::ThreatImpact { .. } => self.threats_leaked += 1,
        }
    }
}
