use std::collections::{BTreeSet, HashMap};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::EngagementEvent;
use crate::models::{
    agent::AgentId,
    assignment::{AssignableInterceptor, AssignmentItem, ThreatSnapshot},
    roster::Roster,
    traits::{IAssignment, IEngagementObserver},
};

/// 脅威の割り当て状態
///
/// DESTROYED は吸収状態で、以後変化しません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreatStatus {
    Unassigned,
    Assigned,
    Destroyed,
}

/// 防空システムのエラー
#[derive(Debug, Clone, Error, PartialEq)]
pub enum IadsError {
    #[error("未登録の脅威です: {0}")]
    UnknownThreat(AgentId),
    #[error("脅威 {threat} は撃破済みのため迎撃体 {interceptor} を割り当てられません")]
    ThreatDestroyed { threat: AgentId, interceptor: AgentId },
    #[error("未登録の迎撃体です: {0}")]
    UnknownInterceptor(AgentId),
}

/// 脅威ごとの管理レコード
#[derive(Debug, Clone)]
pub struct ThreatData {
    pub threat_id: AgentId,
    pub name: String,
    status: ThreatStatus,
    assigned_interceptors: BTreeSet<AgentId>,
}

impl ThreatData {
    pub fn new(threat_id: AgentId, name: impl Into<String>) -> Self {
        Self {
            threat_id,
            name: name.into(),
            status: ThreatStatus::Unassigned,
            assigned_interceptors: BTreeSet::new(),
        }
    }

    pub fn status(&self) -> ThreatStatus {
        self.status
    }

    pub fn is_destroyed(&self) -> bool {
        self.status == ThreatStatus::Destroyed
    }

    pub fn assigned_interceptors(&self) -> &BTreeSet<AgentId> {
        &self.assigned_interceptors
    }

    /// 迎撃体を追加して ASSIGNED にする
    ///
    /// # 戻り値
    ///
    /// 撃破済みの脅威には割り当てられず `IadsError::ThreatDestroyed`
    pub fn assign_interceptor(&mut self, interceptor: AgentId) -> Result<(), IadsError> {
        if self.is_destroyed() {
            return Err(IadsError::ThreatDestroyed {
                threat: self.threat_id,
                interceptor,
            });
        }
        self.assigned_interceptors.insert(interceptor);
        self.status = ThreatStatus::Assigned;
        Ok(())
    }

    /// 迎撃体を外す。空になれば UNASSIGNED に戻る（撃破済みを除く）。
    pub fn remove_interceptor(&mut self, interceptor: AgentId) -> bool {
        let removed = self.assigned_interceptors.remove(&interceptor);
        if self.assigned_interceptors.is_empty() && self.status == ThreatStatus::Assigned {
            self.status = ThreatStatus::Unassigned;
        }
        removed
    }

    pub fn mark_destroyed(&mut self) {
        self.status = ThreatStatus::Destroyed;
    }
}

/// 統合防空システム（脅威レジストリ）
///
/// 脅威表と割り当て待ちキューを保持し、ティック末尾の `flush` で
/// 割り当てポリシーを実行して迎撃体に目標を設定します。
pub struct Iads {
    threat_table: Vec<ThreatData>,
    index: HashMap<AgentId, usize>,
    assignment_queue: Vec<AgentId>,
    last_unassigned: Vec<AgentId>,
    policy: Box<dyn IAssignment>,
}

impl std::fmt::Debug for Iads {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Iads")
            .field("threat_table", &self.threat_table)
            .field("assignment_queue", &self.assignment_queue)
            .field("policy", &self.policy.name())
            .finish()
    }
}

impl Iads {
    pub fn new(policy: Box<dyn IAssignment>) -> Self {
        Self {
            threat_table: Vec::new(),
            index: HashMap::new(),
            assignment_queue: Vec::new(),
            last_unassigned: Vec::new(),
            policy,
        }
    }

    pub fn set_policy(&mut self, policy: Box<dyn IAssignment>) {
        self.policy = policy;
    }

    pub fn policy_name(&self) -> &'static str {
        self.policy.name()
    }

    /// 脅威の登録（登録済みなら何もしない）
    pub fn register_threat(&mut self, threat_id: AgentId, name: impl Into<String>) {
        if self.index.contains_key(&threat_id) {
            return;
        }
        let data = ThreatData::new(threat_id, name);
        debug!(threat_id = %threat_id, threat_name = %data.name, "THREAT_REGISTERED: 脅威を登録しました");
        self.index.insert(threat_id, self.threat_table.len());
        self.threat_table.push(data);
    }

    /// 割り当て要求をキューに積む（次の `flush` で処理）
    pub fn request_assignment(&mut self, interceptor: AgentId) {
        if !self.assignment_queue.contains(&interceptor) {
            self.assignment_queue.push(interceptor);
        }
    }

    pub fn request_assignments(&mut self, interceptors: impl IntoIterator<Item = AgentId>) {
        for interceptor in interceptors {
            self.request_assignment(interceptor);
        }
    }

    pub fn queued(&self) -> &[AgentId] {
        &self.assignment_queue
    }

    pub fn threat_table(&self) -> &[ThreatData] {
        &self.threat_table
    }

    pub fn threat_data(&self, threat_id: AgentId) -> Option<&ThreatData> {
        self.index.get(&threat_id).map(|&slot| &self.threat_table[slot])
    }

    fn threat_data_mut(&mut self, threat_id: AgentId) -> Option<&mut ThreatData> {
        match self.index.get(&threat_id) {
            Some(&slot) => self.threat_table.get_mut(slot),
            None => None,
        }
    }

    /// 割り当て待ちキューの処理
    ///
    /// キュー内の割り当て可能な迎撃体と登録済み脅威からポリシーで割り当てを決め、
    /// 迎撃体の目標と脅威表を更新します。割り当てられなかった迎撃体は
    /// 割り当て可能な限りキューに残ります。
    ///
    /// # 戻り値
    ///
    /// 適用された割り当て
    pub fn flush(&mut self, roster: &mut Roster) -> Vec<AssignmentItem> {
        if self.assignment_queue.is_empty() {
            return Vec::new();
        }

        let queue = std::mem::take(&mut self.assignment_queue);
        let candidates: Vec<AssignableInterceptor> = queue
            .iter()
            .filter_map(|&id| roster.get(id))
            .filter(|agent| agent.is_assignable())
            .map(|agent| AssignableInterceptor {
                id: agent.id(),
                position: agent.core.state.position,
            })
            .collect();

        let mut snapshots = Vec::with_capacity(self.threat_table.len());
        for data in &self.threat_table {
            match roster.get(data.threat_id) {
                Some(agent) => snapshots.push(ThreatSnapshot {
                    id: data.threat_id,
                    status: data.status,
                    position: agent.core.state.position,
                    velocity: agent.core.state.velocity,
                }),
                None => warn!(
                    threat_id = %data.threat_id,
                    threat_name = %data.name,
                    "THREAT_TABLE_MISMATCH: 脅威表のエントリに対応するエージェントがありません"
                ),
            }
        }

        let proposed = if candidates.is_empty() {
            Vec::new()
        } else {
            self.policy.assign(&candidates, &snapshots)
        };

        let mut applied = Vec::with_capacity(proposed.len());
        for item in proposed {
            match self.apply_assignment(item, roster) {
                Ok(()) => applied.push(item),
                Err(err) => warn!(
                    interceptor_id = %item.interceptor,
                    threat_id = %item.threat,
                    error = %err,
                    "ASSIGNMENT_REFUSED: 割り当てが拒否されました"
                ),
            }
        }

        let remaining: Vec<AgentId> = queue
            .into_iter()
            .filter(|&id| roster.get(id).is_some_and(|agent| agent.is_assignable()))
            .collect();
        if !remaining.is_empty() && remaining != self.last_unassigned {
            warn!(
                count = remaining.len(),
                interceptors = ?remaining,
                policy = self.policy.name(),
                "UNASSIGNED_INTERCEPTORS: 割り当てられなかった迎撃体があります"
            );
        }
        self.last_unassigned = remaining.clone();
        self.assignment_queue = remaining;

        applied
    }

    /// 1件の割り当てを適用
    pub fn apply_assignment(&mut self, item: AssignmentItem, roster: &mut Roster) -> Result<(), IadsError> {
        let interceptor = roster
            .get_mut(item.interceptor)
            .ok_or(IadsError::UnknownInterceptor(item.interceptor))?;
        let data = match self.index.get(&item.threat) {
            Some(&slot) => &mut self.threat_table[slot],
            None => return Err(IadsError::UnknownThreat(item.threat)),
        };
        data.assign_interceptor(item.interceptor)?;
        interceptor.core.assign_target(item.threat);

        info!(
            interceptor_id = %item.interceptor,
            interceptor_name = %interceptor.core.name,
            threat_id = %item.threat,
            threat_name = %data.name,
            policy = self.policy.name(),
            "ASSIGNMENT: 迎撃体を脅威に割り当てました"
        );
        Ok(())
    }

    /// 迎撃体をすべての脅威レコードから外す
    fn release_interceptor(&mut self, interceptor: AgentId) {
        for data in &mut self.threat_table {
            data.remove_interceptor(interceptor);
        }
    }

    /// 命中時の処理：脅威を撃破済みにする
    pub fn on_interceptor_hit(&mut self, interceptor: AgentId, threat: AgentId) -> Result<(), IadsError> {
        self.release_interceptor(interceptor);
        let data = self.threat_data_mut(threat).ok_or(IadsError::UnknownThreat(threat))?;
        data.mark_destroyed();
        info!(
            interceptor_id = %interceptor,
            threat_id = %threat,
            threat_name = %data.name,
            "THREAT_DESTROYED: 脅威を撃破済みにしました"
        );
        Ok(())
    }

    /// ミス時の処理：迎撃体を外し、追尾者がいなくなれば UNASSIGNED に戻す
    pub fn on_interceptor_miss(&mut self, interceptor: AgentId, threat: Option<AgentId>) {
        self.release_interceptor(interceptor);
        if let Some(data) = threat.and_then(|id| self.threat_data(id)) {
            debug!(
                interceptor_id = %interceptor,
                threat_id = %data.threat_id,
                status = ?data.status(),
                remaining = data.assigned_interceptors().len(),
                "INTERCEPTOR_RELEASED: 迎撃体の割り当てを解除しました"
            );
        }
    }

    /// 脅威が命中以外で消失した場合（地表到達など）
    pub fn on_threat_terminated(&mut self, threat: AgentId) {
        let released: Vec<AgentId> = match self.threat_data_mut(threat) {
            Some(data) => {
                data.mark_destroyed();
                let released: Vec<AgentId> = data.assigned_interceptors.iter().copied().collect();
                data.assigned_interceptors.clear();
                released
            }
            None => return,
        };
        debug!(threat_id = %threat, released = ?released, "THREAT_REMOVED: 脅威を脅威表から除外しました");
    }

    /// 状態のリセット（実行終了時）
    pub fn reset(&mut self) {
        self.threat_table.clear();
        self.index.clear();
        self.assignment_queue.clear();
        self.last_unassigned.clear();
    }
}

impl IEngagementObserver for Iads {
    fn on_event(&mut self, event: &EngagementEvent) {
        match *event {
            EngagementEvent::InterceptHit { interceptor, threat, .. } => {
                if let Err(err) = self.on_interceptor_hit(interceptor, threat) {
                    warn!(interceptor_id = %interceptor, error = %err, "HIT_UNREGISTERED: 命中した脅威が未登録です");
                }
            }
            EngagementEvent::InterceptMiss { interceptor, threat, .. } => {
                self.on_interceptor_miss(interceptor, threat);
            }
            EngagementEvent::ThreatImpact { threat, .. } => {
                self.on_threat_terminated(threat);
            }
        }
    }
}
