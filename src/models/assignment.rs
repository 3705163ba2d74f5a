use std::cmp::Ordering;

use tracing::trace;

use crate::models::{
    agent::AgentId,
    common::{Vector3, constants},
    iads::ThreatStatus,
    traits::IAssignment,
};
use crate::scenario::AssignmentPolicyKind;

/// 迎撃体→脅威の割り当て結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignmentItem {
    pub interceptor: AgentId,
    pub threat: AgentId,
}

/// 割り当て候補の迎撃体
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AssignableInterceptor {
    pub id: AgentId,
    pub position: Vector3,
}

/// 割り当て判断用の脅威情報
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreatSnapshot {
    pub id: AgentId,
    pub status: ThreatStatus,
    pub position: Vector3,
    pub velocity: Vector3,
}

impl ThreatSnapshot {
    pub fn is_destroyed(&self) -> bool {
        self.status == ThreatStatus::Destroyed
    }
}

/// 撃破されていない脅威
fn live_threats(threats: &[ThreatSnapshot]) -> Vec<&ThreatSnapshot> {
    threats.iter().filter(|threat| !threat.is_destroyed()).collect()
}

/// 巡回割り当て
///
/// 前回の位置から1つずつ進めながら脅威を割り当てます。
/// カーソルは呼び出しをまたいで保持されます。
#[derive(Debug, Clone, Default)]
pub struct RoundRobinAssignment {
    prev_index: Option<usize>,
}

impl RoundRobinAssignment {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IAssignment for RoundRobinAssignment {
    fn assign(&mut self, interceptors: &[AssignableInterceptor], threats: &[ThreatSnapshot]) -> Vec<AssignmentItem> {
        let live = live_threats(threats);
        if interceptors.is_empty() || live.is_empty() {
            return Vec::new();
        }

        let mut items = Vec::with_capacity(interceptors.len());
        for interceptor in interceptors {
            let next = self.prev_index.map_or(0, |prev| (prev + 1) % live.len());
            items.push(AssignmentItem {
                interceptor: interceptor.id,
                threat: live[next].id,
            });
            self.prev_index = Some(next);
        }
        items
    }

    fn name(&self) -> &'static str {
        "round_robin"
    }
}

/// 脅威度に基づく割り当て
///
/// 脅威度 = 速度 / 防護地点までの距離。未割り当ての脅威を優先し、
/// 同じ区分内では脅威度の高い順に1対1で割り当てます。
#[derive(Debug, Clone)]
pub struct ThreatLevelAssignment {
    defended_point: Vector3,
}

impl ThreatLevelAssignment {
    pub fn new(defended_point: Vector3) -> Self {
        Self { defended_point }
    }

    /// 脅威度の計算
    ///
    /// 距離0は最優先（無限大）、速度0は0。
    pub fn threat_level(&self, threat: &ThreatSnapshot) -> f64 {
        let speed = threat.velocity.magnitude();
        if speed <= constants::EPSILON {
            return 0.0;
        }
        let distance = threat.position.distance(&self.defended_point);
        if distance <= constants::EPSILON {
            return f64::INFINITY;
        }
        speed / distance
    }
}

impl IAssignment for ThreatLevelAssignment {
    fn assign(&mut self, interceptors: &[AssignableInterceptor], threats: &[ThreatSnapshot]) -> Vec<AssignmentItem> {
        let live = live_threats(threats);
        if interceptors.is_empty() || live.is_empty() {
            return Vec::new();
        }

        let mut ranked: Vec<(&ThreatSnapshot, f64)> = live
            .into_iter()
            .map(|threat| (threat, self.threat_level(threat)))
            .collect();
        ranked.sort_by(|(a, level_a), (b, level_b)| {
            let unassigned_a = a.status == ThreatStatus::Unassigned;
            let unassigned_b = b.status == ThreatStatus::Unassigned;
            match unassigned_b.cmp(&unassigned_a) {
                Ordering::Equal => level_b.total_cmp(level_a),
                ordering => ordering,
            }
        });

        for (threat, level) in &ranked {
            trace!(threat_id = %threat.id, status = ?threat.status, level, "THREAT_RANKED: 脅威度を計算しました");
        }

        interceptors
            .iter()
            .zip(ranked.iter())
            .map(|(interceptor, (threat, _))| AssignmentItem {
                interceptor: interceptor.id,
                threat: threat.id,
            })
            .collect()
    }

    fn name(&self) -> &'static str {
        "threat_level"
    }
}

impl AssignmentPolicyKind {
    /// ポリシーの生成
    pub fn build(self, defended_point: Vector3) -> Box<dyn IAssignment> {
        match self {
            AssignmentPolicyKind::RoundRobin => Box::new(RoundRobinAssignment::new()),
            AssignmentPolicyKind::ThreatLevel => Box::new(ThreatLevelAssignment::new(defended_point)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn interceptors(n: u32) -> Vec<AssignableInterceptor> {
        (1..=n)
            .map(|i| AssignableInterceptor { id: AgentId(i), position: Vector3::ZERO })
            .collect()
    }

    fn threat(id: u32, status: ThreatStatus, position: Vector3, speed: f64) -> ThreatSnapshot {
        ThreatSnapshot {
            id: AgentId(id),
            status,
            position,
            velocity: Vector3::new(0.0, 0.0, -speed),
        }
    }

    #[test]
    fn test_round_robin_cycles_through_threats() {
        let threats = vec![
            threat(101, ThreatStatus::Unassigned, Vector3::new(0.0, 0.0, 100.0), 10.0),
            threat(102, ThreatStatus::Unassigned, Vector3::new(0.0, 0.0, 200.0), 10.0),
        ];
        let mut policy = RoundRobinAssignment::new();
        let items = policy.assign(&interceptors(5), &threats);
        let targets: Vec<u32> = items.iter().map(|item| item.threat.0).collect();
        assert_eq!(targets, vec![101, 102, 101, 102, 101]);
    }

    #[test]
    fn test_round_robin_cursor_persists_between_calls() {
        let threats = vec![
            threat(101, ThreatStatus::Unassigned, Vector3::new(0.0, 0.0, 100.0), 10.0),
            threat(102, ThreatStatus::Unassigned, Vector3::new(0.0, 0.0, 200.0), 10.0),
            threat(103, ThreatStatus::Unassigned, Vector3::new(0.0, 0.0, 300.0), 10.0),
        ];
        let mut policy = RoundRobinAssignment::new();
        let targets: Vec<u32> = (0..4)
            .map(|_| policy.assign(&interceptors(1), &threats)[0].threat.0)
            .collect();
        assert_eq!(targets, vec![101, 102, 103, 101]);
    }

    #[test]
    fn test_round_robin_skips_destroyed() {
        let threats = vec![
            threat(101, ThreatStatus::Destroyed, Vector3::new(0.0, 0.0, 100.0), 10.0),
            threat(102, ThreatStatus::Assigned, Vector3::new(0.0, 0.0, 200.0), 10.0),
        ];
        let mut policy = RoundRobinAssignment::new();
        let items = policy.assign(&interceptors(2), &threats);
        assert!(items.iter().all(|item| item.threat == AgentId(102)));
    }

    #[test]
    fn test_empty_inputs_produce_nothing() {
        let mut rr = RoundRobinAssignment::new();
        let mut tl = ThreatLevelAssignment::new(Vector3::ZERO);
        let destroyed = vec![threat(1, ThreatStatus::Destroyed, Vector3::new(0.0, 0.0, 10.0), 1.0)];
        assert!(rr.assign(&interceptors(3), &[]).is_empty());
        assert!(rr.assign(&[], &destroyed).is_empty());
        assert!(tl.assign(&interceptors(3), &destroyed).is_empty());
    }

    #[test]
    fn test_threat_level_prefers_fastest_threat() {
        // 同一距離で速度5/10/15の脅威
        let position = Vector3::new(0.0, 0.0, 20.0);
        let threats = vec![
            threat(1, ThreatStatus::Unassigned, position, 5.0),
            threat(2, ThreatStatus::Unassigned, position, 10.0),
            threat(3, ThreatStatus::Unassigned, position, 15.0),
        ];
        let mut policy = ThreatLevelAssignment::new(Vector3::ZERO);
        let items = policy.assign(&interceptors(1), &threats);
        assert_eq!(items, vec![AssignmentItem { interceptor: AgentId(1), threat: AgentId(3) }]);

        let items = policy.assign(&interceptors(3), &threats);
        let targets: Vec<u32> = items.iter().map(|item| item.threat.0).collect();
        assert_eq!(targets, vec![3, 2, 1]);
    }

    #[test]
    fn test_threat_level_ties_keep_input_order() {
        let position = Vector3::new(0.0, 0.0, 50.0);
        let threats = vec![
            threat(5, ThreatStatus::Unassigned, position, 10.0),
            threat(3, ThreatStatus::Unassigned, position, 10.0),
            threat(4, ThreatStatus::Unassigned, position, 5.0),
        ];
        let mut policy = ThreatLevelAssignment::new(Vector3::ZERO);
        let first = policy.assign(&interceptors(3), &threats);
        let second = policy.assign(&interceptors(3), &threats);
        let targets: Vec<u32> = first.iter().map(|item| item.threat.0).collect();
        assert_eq!(targets, vec![5, 3, 4]);
        assert_eq!(first, second);
    }

    #[test]
    fn test_threat_level_prefers_unassigned_over_level() {
        let threats = vec![
            threat(1, ThreatStatus::Assigned, Vector3::new(0.0, 0.0, 10.0), 100.0),
            threat(2, ThreatStatus::Unassigned, Vector3::new(0.0, 0.0, 1000.0), 10.0),
        ];
        let mut policy = ThreatLevelAssignment::new(Vector3::ZERO);
        let items = policy.assign(&interceptors(2), &threats);
        assert_eq!(items[0].threat, AgentId(2));
        assert_eq!(items[1].threat, AgentId(1));
    }

    #[test]
    fn test_more_interceptors_than_threats_leaves_extras_unassigned() {
        let threats = vec![threat(1, ThreatStatus::Unassigned, Vector3::new(0.0, 0.0, 10.0), 10.0)];
        let mut policy = ThreatLevelAssignment::new(Vector3::ZERO);
        let items = policy.assign(&interceptors(3), &threats);
        assert_eq!(items.len(), 1);
    }

    #[test]
    fn test_threat_level_degenerate_cases() {
        let policy = ThreatLevelAssignment::new(Vector3::ZERO);
        let at_point = threat(1, ThreatStatus::Unassigned, Vector3::ZERO, 10.0);
        let stopped = threat(2, ThreatStatus::Unassigned, Vector3::new(0.0, 0.0, 10.0), 0.0);
        let normal = threat(3, ThreatStatus::Unassigned, Vector3::new(0.0, 0.0, 40.0), 20.0);
        assert!(policy.threat_level(&at_point).is_infinite());
        assert_eq!(policy.threat_level(&stopped), 0.0);
        assert_relative_eq!(policy.threat_level(&normal), 0.5);
    }

    #[test]
    fn test_policy_kind_builds_named_policy() {
        assert_eq!(AssignmentPolicyKind::RoundRobin.build(Vector3::ZERO).name(), "round_robin");
        assert_eq!(AssignmentPolicyKind::ThreatLevel.build(Vector3::ZERO).name(), "threat_level");
    }
}
